use thiserror::Error;

use super::types::SessionStatus;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("IO error {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("Json decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: status code {status_code}, message: {message}")]
    ServerError {
        status_code: u16,
        message: String,
    },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Incorrect Password")]
    IncorrectPassword,

    #[error("Param error: {0}")]
    ParamError(String),

    #[error("Push channel error: {0}")]
    Push(String),

    #[error("Invalid session transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl CloudError {
    pub fn server_error(status_code: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status_code,
            message: message.into(),
        }
    }

    pub fn push(message: impl Into<String>) -> Self {
        Self::Push(message.into())
    }

    pub fn param(message: impl Into<String>) -> Self {
        Self::ParamError(message.into())
    }
}

/// Error alias
pub type Result<T, E = CloudError> = std::result::Result<T, E>;
