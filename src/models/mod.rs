//! Data models
//!
//! Plain data structures shared by the repositories, services and API:
//! accounts and their settings groups, sessions, library models and files,
//! federation actors and activities.

mod actor;
mod model;
mod session;
mod settings;
mod user;

pub use actor::{Activity, Actor, CreateActivityInput, CreateActorInput, FederatedObject};
pub use model::{CreateModelInput, Link, Model, ModelFile};
pub use session::Session;
pub use settings::{
    FileListSettings, FormFields, PaginationSettings, RendererSettings, TagCloudSettings,
};
pub use user::{User, UserRole, FIRST_USE_TOKEN};
