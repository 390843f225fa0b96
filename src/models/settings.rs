//! Account settings groups
//!
//! Each group is stored as a JSON column on the user row. A group is either
//! absent or a complete record; there is no partially filled state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw form fields for one settings group, as submitted by the browser
pub type FormFields = HashMap<String, String>;

/// List page options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationSettings {
    pub models: bool,
    pub creators: bool,
    pub collections: bool,
    pub per_page: i64,
}

/// Tag cloud options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCloudSettings {
    pub threshold: i64,
    pub heatmap: bool,
    pub keypair: bool,
    /// Sort key, stored as submitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorting: Option<String>,
}

/// File list options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListSettings {
    pub hide_presupported_versions: bool,
}

/// 3D preview renderer options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererSettings {
    pub grid_width: i64,
    /// Always equal to `grid_width` until the renderer supports non-square grids
    pub grid_depth: i64,
    pub show_grid: bool,
    pub enable_pan_zoom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_colour: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_colour: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_style: Option<String>,
    pub auto_load_max_size: i64,
}
