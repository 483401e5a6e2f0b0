//! Error types for the Sentinel console

use thiserror::Error;

/// Console error type
#[derive(Error, Debug, Clone)]
pub enum ConsoleError {
    /// Transport failure (connect, timeout, broken stream)
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Bearer token missing, invalid or expired
    #[error("unauthorized: admin authentication required")]
    Unauthorized,

    /// Response body did not match the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid configuration or request parameters
    #[error("config error: {0}")]
    Config(String),

    /// Local storage failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl ConsoleError {
    /// Whether the error means the stored session is no longer usable
    pub fn is_auth(&self) -> bool {
        matches!(self, ConsoleError::Unauthorized)
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ConsoleError::Decode(err.to_string())
        } else {
            ConsoleError::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for ConsoleError {
    fn from(err: std::io::Error) -> Self {
        ConsoleError::Storage(err.to_string())
    }
}

/// Result type for the Sentinel console
pub type ConsoleResult<T> = Result<T, ConsoleError>;
