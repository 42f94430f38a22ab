//! Gateway error type

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The client could not be constructed
    #[error("gateway config error: {0}")]
    Config(String),

    /// A request did not produce the declared result. `status` is `None` when
    /// no HTTP response was received at all.
    #[error("{message}")]
    RequestFailed {
        message: String,
        status: Option<StatusCode>,
    },
}

impl GatewayError {
    pub fn request_failed(message: impl Into<String>, status: Option<StatusCode>) -> Self {
        GatewayError::RequestFailed {
            message: message.into(),
            status,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::RequestFailed { status, .. } => *status,
            GatewayError::Config(_) => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::RequestFailed {
            status: err.status(),
            message: err.to_string(),
        }
    }
}
