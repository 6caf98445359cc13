//! Core error types for itdesk-core.
//!
//! Every fallible operation in the library returns one of these enums.
//! The calendar view collapses them into a user-facing notice; the CLI
//! prints them and exits non-zero.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for itdesk-core.
///
/// Returned by operations that span several concerns, such as opening a
/// backend connection from the saved configuration.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Backend request errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Form and model validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Session and credential errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Errors talking to the REST backend.
///
/// Only two kinds matter to callers: the request never completed, or the
/// server answered with a non-success status.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection, timeout, or body decoding failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The backend URL could not be joined with an endpoint path
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status code, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Home/config directory could not be determined or created
    #[error("Configuration directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end ({end}) must not be before start ({start})")]
    InvalidTimeRange {
        start: chrono::NaiveDateTime,
        end: chrono::NaiveDateTime,
    },

    /// Required field left empty
    #[error("Missing required field '{0}'")]
    MissingField(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Session and credential errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Login rejected by the backend
    #[error("Login failed: {0}")]
    LoginRejected(String),

    /// Operation needs a logged-in session
    #[error("Not logged in")]
    NotAuthenticated,

    /// Destructive action attempted while the action gate is closed
    #[error("Action requires password confirmation")]
    ConfirmationRequired,

    /// OS keyring failure
    #[error("Credential store error: {0}")]
    CredentialStore(String),

    /// Backend unreachable during a session operation
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<keyring::Error> for SessionError {
    fn from(err: keyring::Error) -> Self {
        SessionError::CredentialStore(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
