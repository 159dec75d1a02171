//! Error types for ledger state

use thiserror::Error;

/// Result type for ledger state operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger state errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (state accessor failed)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Malformed value (currency id, keys, address, ...)
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Create-once state merged on top of an existing value
    #[error("Conflicting state: {key} already exists")]
    MergeConflict {
        /// State key
        key: String,
    },

    /// Merge value kind does not match the stored value kind
    #[error("State kind mismatch at {key}: stored {stored}, merging {merging}")]
    KindMismatch {
        /// State key
        key: String,
        /// Kind of the stored value
        stored: &'static str,
        /// Kind of the merge value
        merging: &'static str,
    },

    /// Amounts of different currencies combined
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        /// Expected currency
        expected: String,
        /// Actual currency
        actual: String,
    },

    /// Arithmetic overflow
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// Signature verification failed
    #[error("Signature verification failed: {0}")]
    SignatureError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
