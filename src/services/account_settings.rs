//! Account settings normalization
//!
//! Turns the flat form mappings submitted for each settings group into typed
//! records. An absent mapping normalizes to `None`; a present one always
//! produces a complete record.
//!
//! Coercion rules:
//! - booleans are true only for the exact value `"1"`
//! - integers take the leading integer of the value (`"12px"` is 12), else 0
//! - colours, styles and sort keys are copied verbatim

use crate::models::{
    FileListSettings, FormFields, PaginationSettings, RendererSettings, TagCloudSettings,
};

/// Checkbox value: only the literal "1" is on.
pub fn flag(fields: &FormFields, key: &str) -> bool {
    fields.get(key).map(String::as_str) == Some("1")
}

/// Leading integer of a form value, 0 when there is none.
pub fn integer(fields: &FormFields, key: &str) -> i64 {
    fields.get(key).map(|v| leading_integer(v)).unwrap_or(0)
}

fn text(fields: &FormFields, key: &str) -> Option<String> {
    fields.get(key).cloned()
}

/// Parse an optional sign followed by digits at the start of `raw`.
///
/// Leading whitespace is skipped and parsing stops at the first non-digit.
/// A single `_` between two digits is a separator (`"1_000"` is 1000).
/// Values beyond the `i64` range saturate.
pub fn leading_integer(raw: &str) -> i64 {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s.as_bytes()[1..]),
        Some(b'+') => (false, &s.as_bytes()[1..]),
        _ => (false, s.as_bytes()),
    };

    let mut value: i64 = 0;
    for (i, &b) in digits.iter().enumerate() {
        if b == b'_' {
            let between_digits = i > 0
                && digits[i - 1].is_ascii_digit()
                && digits.get(i + 1).is_some_and(u8::is_ascii_digit);
            if between_digits {
                continue;
            }
            break;
        }
        if !b.is_ascii_digit() {
            break;
        }
        let digit = i64::from(b - b'0');
        value = value
            .saturating_mul(10)
            .saturating_add(if negative { -digit } else { digit });
    }
    value
}

pub fn normalize_pagination(fields: Option<&FormFields>) -> Option<PaginationSettings> {
    let fields = fields?;
    Some(PaginationSettings {
        models: flag(fields, "models"),
        creators: flag(fields, "creators"),
        collections: flag(fields, "collections"),
        per_page: integer(fields, "per_page"),
    })
}

pub fn normalize_tag_cloud(fields: Option<&FormFields>) -> Option<TagCloudSettings> {
    let fields = fields?;
    Some(TagCloudSettings {
        threshold: integer(fields, "threshold"),
        heatmap: flag(fields, "heatmap"),
        keypair: flag(fields, "keypair"),
        sorting: text(fields, "sorting"),
    })
}

pub fn normalize_file_list(fields: Option<&FormFields>) -> Option<FileListSettings> {
    let fields = fields?;
    Some(FileListSettings {
        hide_presupported_versions: flag(fields, "hide_presupported_versions"),
    })
}

/// Renderer settings. The grid is square: depth is taken from `grid_width`
/// and any submitted `grid_depth` is ignored.
pub fn normalize_renderer(fields: Option<&FormFields>) -> Option<RendererSettings> {
    let fields = fields?;
    let grid_width = integer(fields, "grid_width");
    Some(RendererSettings {
        grid_width,
        grid_depth: grid_width,
        show_grid: flag(fields, "show_grid"),
        enable_pan_zoom: flag(fields, "enable_pan_zoom"),
        background_colour: text(fields, "background_colour"),
        object_colour: text(fields, "object_colour"),
        render_style: text(fields, "render_style"),
        auto_load_max_size: integer(fields, "auto_load_max_size"),
    })
}
