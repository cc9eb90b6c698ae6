// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for bagframes.
//!
//! One error enum covers the whole extraction pipeline:
//! - Input resolution (missing paths, non-bag files)
//! - Container parsing
//! - Message and image decoding
//! - Argument validation
//! - File system and subprocess failures

use thiserror::Error;

/// Errors that can occur while reading bags and extracting images.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// Input path does not exist or is not a bag file
    #[error("Not found: {path}: {reason}")]
    NotFound {
        /// Offending path
        path: String,
        /// Why the path was rejected
        reason: String,
    },

    /// The bag exists but its record stream cannot be read
    #[error("Corrupt container {path}: {message}")]
    CorruptContainer {
        /// Bag path
        path: String,
        /// Parser message
        message: String,
    },

    /// Message type has no decoder
    #[error("Unsupported schema: '{schema}'")]
    UnsupportedSchema {
        /// Declared message type of the connection
        schema: String,
    },

    /// Image encoding string is not in the supported set
    #[error("Unsupported image encoding: '{encoding}'")]
    UnsupportedEncoding {
        /// Encoding string from the message
        encoding: String,
    },

    /// Payload could not be decoded into a message or image
    #[error("Decode error in {context}: {message}")]
    DecodeError {
        /// What was being decoded
        context: String,
        /// Error message
        message: String,
    },

    /// User supplied argument is malformed
    #[error("Invalid {field}: {message}")]
    ValidationError {
        /// Argument name
        field: String,
        /// What is wrong with it
        message: String,
    },

    /// File system error
    #[error("I/O error in {context}: {message}")]
    Io {
        /// Operation that failed
        context: String,
        /// Error message
        message: String,
    },

    /// External tool exited unsuccessfully or could not be spawned
    #[error("Subprocess '{program}' failed: {message}")]
    Subprocess {
        /// Program name
        program: String,
        /// Exit status or spawn error
        message: String,
    },
}

impl ExtractError {
    /// Create a "not found" error.
    pub fn not_found(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ExtractError::NotFound {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a corrupt container error.
    pub fn corrupt(path: impl Into<String>, message: impl Into<String>) -> Self {
        ExtractError::CorruptContainer {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported schema error.
    pub fn unsupported_schema(schema: impl Into<String>) -> Self {
        ExtractError::UnsupportedSchema {
            schema: schema.into(),
        }
    }

    /// Create an unsupported encoding error.
    pub fn unsupported_encoding(encoding: impl Into<String>) -> Self {
        ExtractError::UnsupportedEncoding {
            encoding: encoding.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(context: impl Into<String>, message: impl Into<String>) -> Self {
        ExtractError::DecodeError {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ExtractError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, message: impl Into<String>) -> Self {
        ExtractError::Io {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a subprocess error.
    pub fn subprocess(program: impl Into<String>, message: impl Into<String>) -> Self {
        ExtractError::Subprocess {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Whether a batch should treat this error as "empty bag" and move on.
    pub fn is_corrupt_container(&self) -> bool {
        matches!(self, ExtractError::CorruptContainer { .. })
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            ExtractError::NotFound { path, reason } => {
                vec![("path", path.clone()), ("reason", reason.clone())]
            }
            ExtractError::CorruptContainer { path, message } => {
                vec![("path", path.clone()), ("message", message.clone())]
            }
            ExtractError::UnsupportedSchema { schema } => vec![("schema", schema.clone())],
            ExtractError::UnsupportedEncoding { encoding } => {
                vec![("encoding", encoding.clone())]
            }
            ExtractError::DecodeError { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            ExtractError::ValidationError { field, message } => {
                vec![("field", field.clone()), ("message", message.clone())]
            }
            ExtractError::Io { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            ExtractError::Subprocess { program, message } => {
                vec![("program", program.clone()), ("message", message.clone())]
            }
        }
    }
}

impl From<std::io::Error> for ExtractError {
    fn from(err: std::io::Error) -> Self {
        ExtractError::io("IO", err.to_string())
    }
}

impl From<image::ImageError> for ExtractError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => ExtractError::io("image", e.to_string()),
            other => ExtractError::decode("image", other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(err: serde_json::Error) -> Self {
        ExtractError::io("json", err.to_string())
    }
}

/// Result type for bagframes operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
