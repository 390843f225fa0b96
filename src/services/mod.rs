//! Services layer - Business logic
//!
//! Services own the rules: authorization, normalization and validation run
//! here before anything reaches a repository.

pub mod account_settings;
pub mod activity;
pub mod backfill;
pub mod delay;
pub mod federation;
pub mod languages;
pub mod password;
pub mod registration;
pub mod settings;
pub mod user;
pub mod validation;

pub use activity::{ActivityError, ActivityService};
pub use backfill::{BackfillOutcome, BackfillReport, BackfillService};
pub use federation::{FederationError, FederationService};
pub use password::{hash_password, verify_password};
pub use registration::{RegistrationError, RegistrationService};
pub use settings::{SettingsService, SettingsServiceError, SiteSettings};
pub use user::{LoginInput, UserService, UserServiceError};
pub use validation::ValidationErrors;
