//! Account field validation
//!
//! Field checks return a message; `ValidationErrors` collects them per field
//! for the form to display next to each input.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use crate::services::password::MIN_PASSWORD_LENGTH;

/// Field name → messages, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors with a single message on one field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Record the error of a field check, if any
    pub fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{} {}", field, m)))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// 3 to 32 characters of letters, digits and underscores
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("can't be blank".to_string());
    }
    if username.len() < 3 {
        return Err("is too short (minimum is 3 characters)".to_string());
    }
    if username.len() > 32 {
        return Err("is too long (maximum is 32 characters)".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));
    if !regex.is_match(username) {
        return Err("can only contain letters, numbers and underscores".to_string());
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("can't be blank".to_string());
    }
    if email.len() > 254 {
        return Err("is too long (maximum is 254 characters)".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });
    if !regex.is_match(email) {
        return Err("is invalid".to_string());
    }

    Ok(())
}

/// Length check on a new password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("can't be blank".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "is too short (minimum is {} characters)",
            MIN_PASSWORD_LENGTH
        ));
    }
    Ok(())
}

/// Confirmation must match when one was supplied
pub fn validate_confirmation(password: &str, confirmation: Option<&str>) -> Result<(), String> {
    match confirmation {
        Some(confirmation) if confirmation != password => {
            Err("doesn't match password".to_string())
        }
        _ => Ok(()),
    }
}
