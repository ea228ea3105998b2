//! Error handling for delimited-ingest
//!
//! This module defines the error type shared by the sampler, the row parser,
//! the chunked uploader and the background worker.

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, IngestError>;

/// Broad classification of an [`IngestError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Local file or byte-range read failure
    Read,
    /// Network send or response failure
    Transport,
    /// Malformed or missing caller-supplied configuration
    Validation,
    /// Misuse of a session or a stopped worker
    Session,
    Other,
}

/// Error types that can occur while sampling, parsing or uploading
#[derive(Error, Debug)]
pub enum IngestError {
    /// Reading from the file handle failed
    #[error("Read error: {message}")]
    ReadError { message: String },

    /// Sending a request to the receiver, or decoding its reply, failed
    #[error("Transport error: {message}")]
    TransportError { message: String },

    /// Invalid parameter supplied by the caller
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Session or worker misuse
    #[error("Session error: {message}")]
    SessionError { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IngestError {
    /// Create a new read error
    pub fn read_error(message: impl Into<String>) -> Self {
        IngestError::ReadError {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport_error(message: impl Into<String>) -> Self {
        IngestError::TransportError {
            message: message.into(),
        }
    }

    /// Create a new invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        IngestError::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        IngestError::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new session error
    pub fn session_error(message: impl Into<String>) -> Self {
        IngestError::SessionError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            IngestError::ReadError { .. } | IngestError::Io(_) => ErrorCategory::Read,
            IngestError::TransportError { .. } => ErrorCategory::Transport,
            IngestError::InvalidParameter { .. } | IngestError::ConfigError { .. } => {
                ErrorCategory::Validation
            }
            IngestError::SessionError { .. } => ErrorCategory::Session,
            IngestError::Json(_) => ErrorCategory::Other,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        IngestError::transport_error(err.to_string())
    }
}
