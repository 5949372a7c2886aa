//! Error types for the thermald sensor library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while discovering or reading sensors.
#[derive(Error, Debug)]
pub enum Error {
    /// Sensor backend file could not be read.
    #[error("failed to read temperature from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// External diagnostics tool missing or exited unsuccessfully.
    #[error("failed to execute {tool} for {path}: {detail}")]
    Command {
        tool: String,
        path: String,
        detail: String,
    },

    /// Tool output did not contain the expected marker.
    #[error("failed to find {marker} for {path}")]
    NotFound { path: String, marker: String },

    /// Marker found but its value is not numeric.
    #[error("failed to parse temperature for {path}: {value:?}")]
    Parse { path: String, value: String },

    /// Blocking sensor task panicked or was cancelled.
    #[error("sensor task for {path} aborted: {detail}")]
    Aborted { path: String, detail: String },

    /// No CPU, HDD or NVMe device exists on the host.
    #[error("failed to discover CPU, HDD, or NVMe devices")]
    Discovery,
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Read,
    Command,
    NotFound,
    Parse,
    Aborted,
    Discovery,
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Read { .. } => ErrorKind::Read,
            Error::Command { .. } => ErrorKind::Command,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::Aborted { .. } => ErrorKind::Aborted,
            Error::Discovery => ErrorKind::Discovery,
        }
    }

    pub(crate) fn parse(path: &str, value: impl Into<String>) -> Self {
        Error::Parse {
            path: path.to_string(),
            value: value.into(),
        }
    }

    pub(crate) fn aborted(path: &str, err: tokio::task::JoinError) -> Self {
        Error::Aborted {
            path: path.to_string(),
            detail: err.to_string(),
        }
    }

    pub(crate) fn not_found(path: &str, marker: impl Into<String>) -> Self {
        Error::NotFound {
            path: path.to_string(),
            marker: marker.into(),
        }
    }
}
