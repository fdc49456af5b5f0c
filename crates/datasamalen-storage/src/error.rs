//! Error types for the storage crate.

use thiserror::Error;

pub use datasamalen_core::StoreError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Storage error types.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Storage/Database error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Registry entry not found.
    #[error("Registry entry not found: {0}")]
    NotFound(String),

    /// Registry entry already present.
    #[error("Registry entry already exists: {0}")]
    Conflict(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl From<Error> for StoreError {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => StoreError::Io(e),
            Error::Serialization(s) => StoreError::Serialization(s),
            Error::Storage(s) => StoreError::Backend(s),
            Error::NotFound(s) => StoreError::NotFound(s),
            Error::Conflict(s) => StoreError::Conflict(s),
            Error::Configuration(s) => StoreError::Backend(s),
        }
    }
}

// External error conversions
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<redb::Error> for Error {
    fn from(e: redb::Error) -> Self {
        Error::Storage(format!("Redb error: {}", e))
    }
}

// Each redb operation has its own error type; all of them fold into redb::Error.
macro_rules! from_redb_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Error {
                fn from(e: $ty) -> Self {
                    redb::Error::from(e).into()
                }
            }
        )*
    };
}

from_redb_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
