//! Languages available for point labels.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{BridgeError, Result};

/// A language with a full set of point labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    It,
}

impl Language {
    /// All supported languages.
    pub const ALL: [Language; 2] = [Language::En, Language::It];

    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::It => "it",
        }
    }

    /// Strict lookup by code (case-insensitive, region suffix ignored: "it_IT" -> It).
    pub fn from_code(code: &str) -> Result<Self> {
        let base = code
            .split(['_', '-'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == base)
            .ok_or_else(|| BridgeError::UnsupportedLanguage(code.to_string()))
    }

    /// Lookup that falls back to English for unsupported codes.
    pub fn resolve(code: &str) -> Self {
        Self::from_code(code).unwrap_or_else(|e| {
            warn!(
                error = %e,
                fallback = Language::default().code(),
                "No point labels for this language, contributions welcome"
            );
            Language::default()
        })
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(Language::from_code("en").unwrap(), Language::En);
        assert_eq!(Language::from_code("IT").unwrap(), Language::It);
        assert_eq!(Language::from_code("it_IT").unwrap(), Language::It);
        assert_eq!(Language::from_code("en-GB").unwrap(), Language::En);
    }

    #[test]
    fn test_unsupported_language() {
        let err = Language::from_code("de").unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedLanguage(code) if code == "de"));
        assert!(Language::from_code("").is_err());
    }

    #[test]
    fn test_resolve_falls_back_to_english() {
        assert_eq!(Language::resolve("fr"), Language::En);
        assert_eq!(Language::resolve("it"), Language::It);
    }
}
