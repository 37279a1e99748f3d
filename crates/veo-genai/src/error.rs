//! Generation client error types.

use thiserror::Error;

pub type GenAiResult<T> = Result<T, GenAiError>;

#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("API key not valid: {0}")]
    InvalidCredential(String),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenAiError {
    pub fn invalid_credential(msg: impl Into<String>) -> Self {
        Self::InvalidCredential(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map a non-success HTTP response to an error, recognising rejected keys.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 401 || status == 403 || body.contains("API key not valid") {
            return Self::InvalidCredential(body);
        }
        Self::Api {
            status,
            message: body,
        }
    }

    /// The service rejected the credential.
    pub fn is_invalid_credential(&self) -> bool {
        matches!(self, GenAiError::InvalidCredential(_))
    }
}
