use thiserror::Error;

pub const UNREACHABLE_MESSAGE: &str = "Unable to reach the server";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected response from {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("local storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl ClientError {
    /// Text for the single error banner.
    pub fn banner_message(&self) -> String {
        match self {
            Self::Transport(_) => UNREACHABLE_MESSAGE.to_string(),
            Self::Api { message, .. } => message.clone(),
            Self::Validation(message) => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
