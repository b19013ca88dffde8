use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ERROR_MESSAGE: &str = "Unexpected error";

/// Body of a non-2xx backend response. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// The server message, or the generic fallback when it is missing or blank.
    pub fn message_or_default(&self) -> String {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .unwrap_or(DEFAULT_ERROR_MESSAGE)
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("record id must not be empty")]
    EmptyId,
    #[error("unknown status '{0}' (expected pendiente, proceso or hecho)")]
    UnknownStatus(String),
    #[error("unknown owner '{0}' (expected sergio or isaac)")]
    UnknownOwner(String),
}
