//! Error types for commercetxt-core operations.
//!
//! This module covers failures of the pipeline *machinery* — a missing
//! file, a corrupt config, a loader that can't reach a URL. It is
//! deliberately separate from the document-level diagnostics produced by
//! parsing and validation: a malformed `CommerceTXT` document is never a
//! panic or an `Err`, it's an entry in [`crate::types::ParseResult::errors`]
//! or `.warnings`. Only failures that stop the pipeline from running at
//! all belong here.
//!
//! ## Error Categories
//!
//! - **I/O**: reading a source file from disk
//! - **Parse**: loader-level parse failure (not document validation)
//! - **Config**: malformed or inaccessible configuration
//! - **NotFound**: a referenced path or resource does not exist
//! - **Validation**: strict-mode termination on the first critical error
//! - **Serialization**: JSON/TOML encode/decode failure

use thiserror::Error;

/// The error type for `commercetxt-core` operations.
///
/// Every fallible public function in this crate returns
/// `Result<T, Error>`. Document-level parsing never produces an `Err` —
/// see the module docs for the distinction.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading or writing a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The loader or resolver could not parse what it fetched.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration is malformed or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A referenced path or resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Strict-mode pipeline termination on the first critical error.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A URL failed the `is_safe_url` gate or could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Returns `true` if the failure might succeed on retry.
    ///
    /// Only I/O errors carry enough information to guess at this; every
    /// other variant represents a permanent, content-dependent failure.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Returns a static category string, useful for logging and CLI exit-code mapping.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Parse(_) => "parse",
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Convenience alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
