//! Error types for the probe core

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a `BrowserSession` implementation.
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    /// The page or its browser context has already been torn down.
    #[error("session closed")]
    SessionClosed,

    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("'{operation}' timed out after {duration:?}")]
    Timeout { operation: String, duration: Duration },

    /// The page raised while evaluating an expression.
    #[error("script error: {0}")]
    Script(String),

    #[error("driver protocol error: {0}")]
    Protocol(String),
}

impl DriverError {
    /// Whether this error means the page is gone for good.
    pub fn is_session_closed(&self) -> bool {
        matches!(self, DriverError::SessionClosed)
    }
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("session closed")]
    SessionClosed,

    #[error("Driver error: {0}")]
    Driver(DriverError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Artifact '{name}' could not be attached: {reason}")]
    Artifact { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl From<DriverError> for ProbeError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::SessionClosed => ProbeError::SessionClosed,
            other => ProbeError::Driver(other),
        }
    }
}

pub type ProbeResult<T> = Result<T, ProbeError>;
