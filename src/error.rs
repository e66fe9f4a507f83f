use std::fmt;

use reqwest::StatusCode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A review mutation was attempted without a credential. Raised before
    /// any request is sent.
    #[error("authentication required")]
    AuthRequired,

    #[error("{message}")]
    Transport { status: StatusCode, message: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid review: {0}")]
    InvalidReview(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    pub(crate) fn transport(status: StatusCode, body: &str) -> Self {
        Self::Transport {
            status,
            message: transport_message(status, body),
        }
    }
}

/// Every step of the characteristics fallback chain failed.
///
/// The alternate-route failure is the reported cause. The subcategory lookup,
/// when it was attempted, is kept alongside for diagnostics only.
#[derive(Debug)]
pub struct ResolutionError {
    cause: Box<Error>,
    subcategory_attempt: Option<Box<Error>>,
}

impl ResolutionError {
    pub(crate) fn new(cause: Error, subcategory_attempt: Option<Error>) -> Self {
        Self {
            cause: Box::new(cause),
            subcategory_attempt: subcategory_attempt.map(Box::new),
        }
    }

    pub fn cause(&self) -> &Error {
        &self.cause
    }

    pub fn subcategory_attempt(&self) -> Option<&Error> {
        self.subcategory_attempt.as_deref()
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "characteristics could not be resolved: {}", self.cause)
    }
}

impl std::error::Error for ResolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

// Backends answer either with `{"message": "..."}` or with plain text.
fn transport_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(serde_json::Value::as_str) {
            if !message.trim().is_empty() {
                return message.trim().to_string();
            }
        }
    }
    if body.is_empty() || body.starts_with('{') {
        format!("request failed with status {status}")
    } else {
        body.to_string()
    }
}
