use shared::error::ErrorKind;
use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("store answered {status_line}")]
    Status {
        status_line: String,
        message: Option<String>,
    },
    #[error("malformed store response: {0}")]
    Malformed(String),
    #[error("store reported failure: {}", .message.as_deref().unwrap_or("no reason given"))]
    Rejected { message: Option<String> },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Malformed(_) => ErrorKind::Transport,
            Self::Status { .. } | Self::Rejected { .. } => ErrorKind::Application,
        }
    }

    /// Most specific reason available: the store's own message, then the HTTP
    /// status line, then `fallback` alone.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            }
            | Self::Rejected {
                message: Some(message),
            } => message.clone(),
            Self::Status { status_line, .. } => format!("{fallback}: {status_line}"),
            Self::Transport(_) | Self::Malformed(_) | Self::Rejected { message: None } => {
                fallback.to_string()
            }
        }
    }
}
