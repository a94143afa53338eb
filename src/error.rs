//! Error taxonomy for the ingest pipeline.
//!
//! Every fallible operation in the library returns [`Result<T>`], whose error
//! side is [`SluiceError`]. The variants follow the order in which a request
//! can fail:
//!
//! ```text
//! extension check ─> UnsupportedFormat
//! size check      ─> UploadTooLarge
//! parsing         ─> Parse
//! schema building ─> Schema
//! connecting      ─> Connection
//! create / insert ─> Load
//! ```
//!
//! Parse and schema failures happen before the database is touched. Load
//! failures always come with a rollback of the insert transaction.
//!
//! ## Context
//!
//! The [`ResultExt`] trait adds `.context()` to any result whose error
//! converts into [`SluiceError`]. Unlike `anyhow`, the category survives:
//!
//! ```
//! use sluice::error::{ResultExt as _, SluiceError};
//!
//! let res: Result<(), SluiceError> = Err(SluiceError::Parse("bad row".to_owned()));
//! let err = res.context("Reading orders.csv").unwrap_err();
//! assert!(matches!(err, SluiceError::Parse(_)));
//! assert_eq!(err.to_string(), "Parse error: Reading orders.csv: bad row");
//! ```

use thiserror::Error;

/// Main error type for sluice operations.
#[derive(Debug, Error)]
pub enum SluiceError {
    /// Extension outside the allow-list, or content no parser can interpret.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Malformed file content (bad rows, encoding, empty file).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Input larger than the configured upload bound.
    #[error("Upload too large: {size} bytes exceeds the {limit} byte limit")]
    UploadTooLarge { size: u64, limit: u64 },

    /// Cannot reach or authenticate to the database.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid identifier or inconsistent column mapping.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Failure during create-table or insert.
    #[error("Load error: {0}")]
    Load(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SluiceError {
    /// Prefixes the message with `msg`, keeping the category.
    #[must_use]
    pub fn with_prefix(self, msg: &str) -> Self {
        match self {
            Self::UnsupportedFormat(m) => Self::UnsupportedFormat(format!("{msg}: {m}")),
            Self::Parse(m) => Self::Parse(format!("{msg}: {m}")),
            Self::Connection(m) => Self::Connection(format!("{msg}: {m}")),
            Self::Schema(m) => Self::Schema(format!("{msg}: {m}")),
            Self::Load(m) => Self::Load(format!("{msg}: {m}")),
            Self::Config(m) => Self::Config(format!("{msg}: {m}")),
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), format!("{msg}: {e}"))),
            other @ Self::UploadTooLarge { .. } => other,
        }
    }

    /// Whether the error was raised before any database work started.
    pub fn is_pre_database(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_)
                | Self::Parse(_)
                | Self::UploadTooLarge { .. }
                | Self::Schema(_)
                | Self::Config(_)
                | Self::Io(_)
        )
    }
}

impl From<polars::error::PolarsError> for SluiceError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<calamine::Error> for SluiceError {
    fn from(err: calamine::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for SluiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<sqlx::Error> for SluiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(_)
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => Self::Connection(err.to_string()),
            other => Self::Load(other.to_string()),
        }
    }
}

impl From<url::ParseError> for SluiceError {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("Invalid database URL: {err}"))
    }
}

/// Result type alias for sluice operations.
pub type Result<T> = std::result::Result<T, SluiceError>;

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
    E: Into<SluiceError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_prefix(&msg.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_prefix(&f()))
    }
}
