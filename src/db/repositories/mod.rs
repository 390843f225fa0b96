//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles one aggregate and branches on the pool's driver.

pub mod actor;
pub mod model;
pub mod session;
pub mod settings;
pub mod user;

pub use actor::{ActorRepository, SqlxActorRepository};
pub use model::{ModelFileRepository, ModelRepository, SqlxModelFileRepository, SqlxModelRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use settings::{SettingsRepository, SqlxSettingsRepository};
pub use user::{SqlxUserRepository, UserRepository};
