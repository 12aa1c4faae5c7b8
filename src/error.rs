//! Error handling for the ETL run.
//!
//! Every fallible library operation returns [`Result`], whose error type is
//! [`EtlError`]. The variants follow the collaborators a run talks to: the
//! dataframe engine, the object store, the local filesystem and the
//! configuration file. Nothing is retried; errors travel up to the binary,
//! which logs them and exits non-zero.
//!
//! ```
//! use playlake::error::{EtlError, Result, ResultExt as _};
//!
//! fn read_config(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).context("Failed to read configuration")
//! }
//!
//! assert!(matches!(read_config("/definitely/not/here"), Err(EtlError::Other(_))));
//! ```

use std::fmt;

/// Main error type for ETL operations.
#[derive(Debug)]
pub enum EtlError {
    /// Local filesystem errors
    Io(std::io::Error),

    /// Dataframe engine errors (projection, join, parquet encoding)
    DataProcessing(String),

    /// Object store errors (listing, reading, writing, deleting objects)
    Storage(String),

    /// Configuration file or CLI override problems
    Config(String),

    /// A source or output location that cannot be understood
    InvalidLocation(String),

    /// A source dataset prefix that holds no readable objects
    MissingSource(String),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Storage(msg) => write!(f, "Storage error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::InvalidLocation(msg) => write!(f, "Invalid location: {msg}"),
            Self::MissingSource(msg) => write!(f, "Source path does not exist: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EtlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for EtlError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for EtlError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<object_store::Error> for EtlError {
    fn from(err: object_store::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<object_store::path::Error> for EtlError {
    fn from(err: object_store::path::Error) -> Self {
        Self::InvalidLocation(err.to_string())
    }
}

/// Result type alias for ETL operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<EtlError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: EtlError = e.into();
            EtlError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: EtlError = e.into();
            EtlError::Other(format!("{}: {}", f(), err))
        })
    }
}
