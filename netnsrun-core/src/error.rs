//! Error types for netnsrun

use thiserror::Error;

use crate::ProcessId;

/// netnsrun error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// System error from nix
    #[error("System error: {0}")]
    System(#[from] nix::Error),

    /// The process list itself could not be read
    #[error("Failed to list processes in {path}: {source}")]
    ProcessList {
        /// Directory that was scanned
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A scanned process' network namespace could not be resolved
    #[error("Failed to resolve network namespace of pid {pid}: {message}")]
    NamespaceResolution {
        /// Offending process
        pid: ProcessId,
        /// Error message
        message: String,
    },

    /// A namespace reference could not be opened for execution
    #[error("Failed to open namespace of pid {pid} at {path}: {source}")]
    NamespaceOpen {
        /// Representative process
        pid: ProcessId,
        /// Path that was opened
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Operator supplied an unusable command
    #[error("Invalid command: {message}")]
    InvalidCommand {
        /// Error message
        message: String,
    },

    /// Worker payload could not be framed or unframed
    #[error("Protocol error: {message}")]
    Protocol {
        /// Error message
        message: String,
    },

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Worker could not be launched or waited on
    #[error("Worker error: {message}")]
    Worker {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Whether this error aborts the whole run rather than a single namespace
    #[must_use]
    pub const fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            Self::ProcessList { .. } | Self::NamespaceResolution { .. }
        )
    }
}

/// Result type alias for netnsrun operations
pub type Result<T> = std::result::Result<T, Error>;
