//! Error types for crxkit core.

use thiserror::Error;

/// Core errors raised by primitives, the container codec and the proof crypto.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Any structural problem with a container preamble or header.
    ///
    /// Deliberately carries no detail.
    #[error("header invalid")]
    HeaderInvalid,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("unsupported key: {0}")]
    UnsupportedKey(String),

    #[error("crypto provider error: {0}")]
    Crypto(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
