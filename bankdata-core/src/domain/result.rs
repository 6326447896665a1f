//! Result and error types for the core library

use thiserror::Error;

/// Upstream messages that mean the end-user consent is no longer valid.
///
/// The API reports these with a 400 (requisition) or 401 (account access).
const EXPIRY_MESSAGES: &[&str] = &[
    "Requisition ID has expired",
    "Access has expired or it has been revoked.",
    "EUA has expired",
];

/// Failure of a single authenticated GET against the aggregator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {status} {status_text}")]
    Status {
        status: u16,
        status_text: String,
        /// `error` / `summary` field of the upstream error body, if any
        upstream_error: Option<String>,
    },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("invalid JSON response: {0}")]
    Decode(String),
}

impl FetchError {
    /// HTTP status, when the upstream answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this failure means the bank has to be re-authorized
    pub fn is_credential_expired(&self) -> bool {
        match self {
            FetchError::Status {
                status: 400 | 401,
                upstream_error: Some(message),
                ..
            } => EXPIRY_MESSAGES.contains(&message.trim()),
            _ => false,
        }
    }
}

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown bank: {0}")]
    UnknownBank(String),

    #[error("Token request failed: {0}")]
    Auth(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
