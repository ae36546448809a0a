//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the vault seal/open protocol.
///
/// The `Display` strings are the messages shown to the user. None of them
/// carry key material, passphrases or cipher internals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// The backup's format version is not one this build understands
    #[error("Unsupported backup format (version {0})")]
    UnsupportedVersion(serde_json::Number),

    /// Bad encoding, wrong field lengths, or a payload that does not deserialize
    #[error("Backup file is invalid or corrupted")]
    MalformedBackup { reason: String },

    /// Authentication tag mismatch: wrong passphrase or tampered data, never told apart
    #[error("Wrong passphrase or corrupted file")]
    DecryptError,

    #[error("Failed to encrypt backup")]
    SealFailed,

    #[error("Backup operation was cancelled")]
    Cancelled,
}

impl VaultError {
    /// Create a malformed-backup error with a diagnostic reason
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedBackup {
            reason: reason.into(),
        }
    }

    /// Diagnostic detail for malformed backups (not part of the user message)
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::MalformedBackup { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output and FFI serialization)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Attach a context entry
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}
