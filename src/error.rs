//! Error types for usrp-clock

use thiserror::Error;

/// Main error type for clock device operations
#[derive(Debug, Error)]
pub enum ClockError {
    /// Nothing is stored at the given property tree path
    #[error("Path not found in property tree: {0}")]
    PathNotFound(String),

    /// Stored value could not be read as the requested type
    #[error("Type mismatch at {path}: expected {expected}: {reason}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        reason: String,
    },

    /// Sensor reading could not be converted
    #[error("Cannot convert sensor {name} value {value:?}: {reason}")]
    SensorConversion {
        name: String,
        value: String,
        reason: String,
    },

    /// Malformed connection parameters
    #[error("Invalid device address: {0}")]
    InvalidDeviceAddr(String),

    /// No backend could satisfy the device hint
    #[error("No devices found for ----->\n{0}")]
    NoDeviceFound(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CBOR decoding error
    #[error("CBOR decode error: {0}")]
    CborDecode(String),
}

impl ClockError {
    /// True for failures caused by a missing tree node
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClockError::PathNotFound(_))
    }
}

/// Result type alias for clock device operations
pub type Result<T> = std::result::Result<T, ClockError>;
