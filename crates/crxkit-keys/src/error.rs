//! Error types for key storage.

use crxkit_core::CoreError;
use thiserror::Error;

/// Errors that can occur while reading or writing private keys.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No key at the given location.
    #[error("private key not found: {0}")]
    NotFound(String),

    /// The text is not a PKCS#8 `PRIVATE KEY` document.
    #[error("unsupported private key format: {0}")]
    UnsupportedFormat(String),

    /// The document parsed but does not hold a usable key.
    #[error("invalid private key: {0}")]
    InvalidKey(#[from] CoreError),

    /// A writer panicked while holding the store's lock.
    #[error("key store lock poisoned: {0}")]
    Poisoned(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for key store operations.
pub type Result<T> = std::result::Result<T, KeyError>;
