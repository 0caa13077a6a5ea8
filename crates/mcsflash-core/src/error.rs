//! Error types for mcsflash-core

use thiserror::Error;

/// Core errors raised while configuring or invoking the toolchain
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed board/project parameter with no default
    #[error("Configuration error: {0}")]
    Config(String),

    /// Empty or malformed argument passed to a parser
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// External tool exited with a failure status
    #[error("{tool} failed with exit code {}", status.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    ExternalTool {
        /// Program that was invoked
        tool: String,
        /// Exit code, if the process was not killed by a signal
        status: Option<i32>,
    },

    /// I/O error reading configuration or spawning a process
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Board or project file is not valid TOML
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for core operations
pub type Result<T> = core::result::Result<T, Error>;
