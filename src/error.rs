// src/error.rs

use thiserror::Error;

/// Core error types for AppNest
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O failure with path context (stat, chmod, rename, copy, read, write)
    #[error("I/O error: {0}")]
    IoError(String),

    /// Launcher document, configuration or digest section could not be parsed
    #[error("Format error: {0}")]
    FormatError(String),

    /// Requested capability does not apply to this image type
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// The user declined at a confirmation point
    #[error("Operation aborted by user")]
    UserAborted,

    /// Terminal failure after relocation or entry synthesis
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// Invalid or unresolvable configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias using AppNest's Error type
pub type Result<T> = std::result::Result<T, Error>;
