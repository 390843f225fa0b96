//! Site settings service
//!
//! Typed view over the site-wide key/value switches.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::SettingsRepository;

/// Known setting keys
pub mod keys {
    pub const SITE_NAME: &str = "site_name";
    pub const REGISTRATION_ENABLED: &str = "registration_enabled";
    pub const APPROVE_SIGNUPS: &str = "approve_signups";
}

/// Site-wide switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub site_name: String,
    /// Whether visitors may create accounts
    pub registration_enabled: bool,
    /// New accounts start unapproved until an administrator approves them
    pub approve_signups: bool,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Filament".to_string(),
            registration_enabled: false,
            approve_signups: true,
        }
    }
}

/// Settings service errors
#[derive(Debug, Error)]
pub enum SettingsServiceError {
    #[error("Failed to load settings: {0}")]
    LoadError(String),

    #[error("Failed to save settings: {0}")]
    SaveError(String),
}

/// Settings service for managing site configuration
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self { repo }
    }

    /// Read all switches, falling back to defaults for missing or malformed values
    pub async fn get_site_settings(&self) -> Result<SiteSettings, SettingsServiceError> {
        let stored = self
            .repo
            .get_all()
            .await
            .map_err(|e| SettingsServiceError::LoadError(e.to_string()))?;
        let defaults = SiteSettings::default();

        Ok(SiteSettings {
            site_name: stored
                .get(keys::SITE_NAME)
                .cloned()
                .unwrap_or(defaults.site_name),
            registration_enabled: stored
                .get(keys::REGISTRATION_ENABLED)
                .and_then(|v| parse_flag(v))
                .unwrap_or(defaults.registration_enabled),
            approve_signups: stored
                .get(keys::APPROVE_SIGNUPS)
                .and_then(|v| parse_flag(v))
                .unwrap_or(defaults.approve_signups),
        })
    }

    pub async fn update_site_settings(
        &self,
        settings: &SiteSettings,
    ) -> Result<(), SettingsServiceError> {
        self.set(keys::SITE_NAME, &settings.site_name).await?;
        self.set(
            keys::REGISTRATION_ENABLED,
            &settings.registration_enabled.to_string(),
        )
        .await?;
        self.set(keys::APPROVE_SIGNUPS, &settings.approve_signups.to_string())
            .await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), SettingsServiceError> {
        self.repo
            .set(key, value)
            .await
            .map_err(|e| SettingsServiceError::SaveError(e.to_string()))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
