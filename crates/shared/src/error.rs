use serde::{Deserialize, Serialize};

/// Coarse classification of everything that can end up in an error status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad title or file, caught before any network call.
    Validation,
    /// Unreachable store, timeout, or a body that is not the expected JSON.
    Transport,
    /// Well-formed store reply that explicitly signals failure.
    Application,
}

/// Failure envelope the store sends alongside non-2xx statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub success: bool,
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
