//! Error types for the heat-pump bridge.

use thiserror::Error;

/// Result type alias using [`BridgeError`].
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors raised outside the bus exchange path.
///
/// Bus failures have their own types ([`crate::transport::TransportError`],
/// [`crate::retry::AggregateError`]) and never surface as a `BridgeError`.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration file not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parse error.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration validation error.
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// Requested UI language has no point labels.
    #[error("Unsupported language '{0}'")]
    UnsupportedLanguage(String),

    /// Zenoh session error.
    #[error("Zenoh session error: {0}")]
    ZenohSession(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Publishing error.
    #[error("Failed to publish to {key}: {message}")]
    Publish { key: String, message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Create a configuration validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ConfigValidation(msg.into())
    }
}

impl From<zenoh::Error> for BridgeError {
    fn from(err: zenoh::Error) -> Self {
        Self::ZenohSession(err.to_string())
    }
}

impl From<heatsight_common::Error> for BridgeError {
    fn from(err: heatsight_common::Error) -> Self {
        use heatsight_common::Error as Common;

        match err {
            Common::Config(msg) => Self::ConfigValidation(msg),
            Common::Zenoh(e) => Self::ZenohSession(e.to_string()),
            Common::Json(e) => Self::Serialization(e.to_string()),
            Common::Cbor(msg) => Self::Serialization(msg),
            Common::Io(e) => Self::Io(e),
        }
    }
}

impl From<json5::Error> for BridgeError {
    fn from(err: json5::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}
