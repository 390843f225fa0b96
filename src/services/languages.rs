//! Interface language list
//!
//! The choices offered on the account forms: "Autodetect" (no stored
//! preference) followed by every shipped locale under its own name.

use serde::Serialize;

/// Locales with translations shipped, paired with their native names
pub const AVAILABLE_LOCALES: &[(&str, &str)] = &[
    ("en", "english"),
    ("de", "deutsch"),
    ("fr", "français"),
    ("es", "español"),
    ("nl", "nederlands"),
    ("pl", "polski"),
    ("cs", "čeština"),
    ("pt", "português"),
    ("ja", "日本語"),
    ("zh-CN", "简体中文"),
];

/// One entry of the language selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageOption {
    pub label: String,
    /// Locale code; `None` means autodetect
    pub code: Option<String>,
}

/// The selector entries, autodetect first.
pub fn language_options() -> Vec<LanguageOption> {
    std::iter::once(LanguageOption {
        label: "Autodetect".to_string(),
        code: None,
    })
    .chain(AVAILABLE_LOCALES.iter().map(|(code, name)| LanguageOption {
        label: capitalize(name),
        code: Some((*code).to_string()),
    }))
    .collect()
}

/// Whether `code` is a shipped locale
pub fn is_available(code: &str) -> bool {
    AVAILABLE_LOCALES.iter().any(|(c, _)| *c == code)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autodetect_comes_first() {
        let options = language_options();
        assert_eq!(options.len(), AVAILABLE_LOCALES.len() + 1);
        assert_eq!(options[0].label, "Autodetect");
        assert_eq!(options[0].code, None);
    }

    #[test]
    fn test_native_names_are_capitalized() {
        let options = language_options();
        let de = options
            .iter()
            .find(|o| o.code.as_deref() == Some("de"))
            .unwrap();
        assert_eq!(de.label, "Deutsch");
        let cs = options
            .iter()
            .find(|o| o.code.as_deref() == Some("cs"))
            .unwrap();
        assert_eq!(cs.label, "Čeština");
    }

    #[test]
    fn test_is_available() {
        assert!(is_available("zh-CN"));
        assert!(!is_available("xx"));
    }
}
