//! The API credential.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MASK: &str = "••••••••••••••••••••";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiKeyError {
    #[error("Please enter a valid API key.")]
    TooShort,
    #[error("API key looks masked; paste the full key.")]
    Masked,
}

/// Opaque API key. Never printed in full.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Validate and wrap a key.
    pub fn parse(raw: &str) -> Result<Self, ApiKeyError> {
        let key = raw.trim();
        if key.contains('•') {
            return Err(ApiKeyError::Masked);
        }
        if key.chars().count() <= 10 {
            return Err(ApiKeyError::TooShort);
        }
        Ok(Self(key.to_string()))
    }

    /// Raw key for request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Bullets followed by the last four characters.
    pub fn masked(&self) -> String {
        let tail: String = {
            let chars: Vec<char> = self.0.chars().collect();
            chars[chars.len().saturating_sub(4)..].iter().collect()
        };
        format!("{MASK}{tail}")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.masked()).finish()
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.masked())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_short_and_masked() {
        assert_eq!(ApiKey::parse("short").unwrap_err(), ApiKeyError::TooShort);
        assert_eq!(ApiKey::parse("0123456789").unwrap_err(), ApiKeyError::TooShort);
        assert_eq!(
            ApiKey::parse("••••••••••••abcd").unwrap_err(),
            ApiKeyError::Masked
        );
        assert!(ApiKey::parse("  AIzaSyExampleKey1234  ").is_ok());
    }

    #[test]
    fn test_never_printed_in_full() {
        let key = ApiKey::parse("AIzaSyExampleKey1234").unwrap();
        assert_eq!(key.expose(), "AIzaSyExampleKey1234");
        assert!(key.to_string().ends_with("1234"));
        assert!(!key.to_string().contains("AIza"));
        assert!(!format!("{:?}", key).contains("AIza"));
    }
}
