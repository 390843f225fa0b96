//! Configuration management
//!
//! Configuration is read from `config.yml` and may be overridden by
//! `FILAMENT_*` environment variables. Missing values fall back to defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Security-related knobs (request delay, sessions)
    #[serde(default)]
    pub security: SecurityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin allowed to call the API with credentials
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3214
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/filament.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Security configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Lower bound of the random delay applied to sign-up and cancel requests
    #[serde(default = "default_delay_min_ms")]
    pub delay_min_ms: u64,
    /// Upper bound of the random delay applied to sign-up and cancel requests
    #[serde(default = "default_delay_max_ms")]
    pub delay_max_ms: u64,
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            delay_min_ms: default_delay_min_ms(),
            delay_max_ms: default_delay_max_ms(),
            session_days: default_session_days(),
        }
    }
}

impl SecurityConfig {
    /// A configuration without any request delay, for tests and tooling
    pub fn without_delay() -> Self {
        Self {
            delay_min_ms: 0,
            delay_max_ms: 0,
            ..Self::default()
        }
    }
}

fn default_delay_min_ms() -> u64 {
    100
}

fn default_delay_max_ms() -> u64 {
    500
}

fn default_session_days() -> i64 {
    7
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration. Invalid YAML
    /// is reported with its location.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file, then apply environment overrides
    ///
    /// Recognised variables:
    /// - FILAMENT_SERVER_HOST
    /// - FILAMENT_SERVER_PORT
    /// - FILAMENT_SERVER_CORS_ORIGIN
    /// - FILAMENT_DATABASE_DRIVER
    /// - FILAMENT_DATABASE_URL
    /// - FILAMENT_SECURITY_DELAY_MIN_MS
    /// - FILAMENT_SECURITY_DELAY_MAX_MS
    /// - FILAMENT_SECURITY_SESSION_DAYS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.security.delay_min_ms > self.security.delay_max_ms {
            return Err(ConfigError::ValidationError(format!(
                "security.delay_min_ms ({}) is greater than security.delay_max_ms ({})",
                self.security.delay_min_ms, self.security.delay_max_ms
            )));
        }
        if self.security.session_days <= 0 {
            return Err(ConfigError::ValidationError(
                "security.session_days must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("FILAMENT_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("FILAMENT_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("FILAMENT_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("FILAMENT_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("FILAMENT_DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(ms) = env_parse::<u64>("FILAMENT_SECURITY_DELAY_MIN_MS") {
            self.security.delay_min_ms = ms;
        }
        if let Some(ms) = env_parse::<u64>("FILAMENT_SECURITY_DELAY_MAX_MS") {
            self.security.delay_max_ms = ms;
        }
        if let Some(days) = env_parse::<i64>("FILAMENT_SECURITY_SESSION_DAYS") {
            self.security.session_days = days;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Config tests touching environment variables share this lock.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "FILAMENT_SERVER_HOST",
    "FILAMENT_SERVER_PORT",
    "FILAMENT_SERVER_CORS_ORIGIN",
    "FILAMENT_DATABASE_DRIVER",
    "FILAMENT_DATABASE_URL",
    "FILAMENT_SECURITY_DELAY_MIN_MS",
    "FILAMENT_SECURITY_DELAY_MAX_MS",
    "FILAMENT_SECURITY_SESSION_DAYS",
];


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn security_strategy() -> impl Strategy<Value = SecurityConfig> {
        (0u64..1000, 0u64..1000, 1i64..365).prop_map(|(a, b, days)| SecurityConfig {
            delay_min_ms: a.min(b),
            delay_max_ms: a.max(b),
            session_days: days,
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn valid_security_config_roundtrips_through_yaml(security in security_strategy(), port in 1u16..) {
            let config = Config {
                server: ServerConfig { host: "127.0.0.1".to_string(), port, ..ServerConfig::default() },
                database: DatabaseConfig::default(),
                security,
            };
            let yaml = serde_yaml::to_string(&config).unwrap();

            let mut file = NamedTempFile::new().unwrap();
            write!(file, "{}", yaml).unwrap();

            let loaded = Config::load(file.path()).unwrap();
            prop_assert_eq!(loaded.security, security);
            prop_assert_eq!(loaded.server.port, port);
        }
    }
}
