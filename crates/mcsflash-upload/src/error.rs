//! Error types for upload operations

use thiserror::Error;

/// Upload-specific errors
#[derive(Debug, Error)]
pub enum UploadError {
    /// Board or project configuration is missing or malformed
    #[error(transparent)]
    Config(#[from] mcsflash_core::Error),

    /// Protocol name not known to the dispatcher
    #[error("Unknown upload protocol {0}")]
    UnsupportedProtocol(String),

    /// No serial port was supplied or detected
    #[error("Upload port not found: {0}")]
    PortResolution(String),

    /// Converter or uploader exited with a failure status
    #[error("{label} failed: {program} exited with code {}", code.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    ExternalTool {
        /// Label of the failing action
        label: String,
        /// Program that was invoked
        program: String,
        /// Exit code, if any
        code: Option<i32>,
    },

    /// Program could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Result type for upload operations
pub type Result<T> = core::result::Result<T, UploadError>;
