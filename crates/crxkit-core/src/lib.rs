//! # crxkit core
//!
//! Pure primitives for CRX3 packages: identifiers, the container format,
//! and streaming proof crypto.
//!
//! This crate does no file handling of its own. The format readers and
//! writers work over any `std::io::Read` / `std::io::Write`.
//!
//! ## Key Types
//!
//! - [`CrxId`] - 32-character `a..p` package identifier
//! - [`CrxFileHeader`] - the protobuf header with its proof lists
//! - [`PrivateKey`] - RSA or ECDSA P-256 signing key
//! - [`ProofSigner`] / [`ProofVerifier`] - streaming signature contexts

pub mod binary;
pub mod crypto;
pub mod error;
pub mod format;
pub mod id;

pub use crypto::{PrivateKey, ProofAlgorithm, ProofSigner, ProofVerifier, Sha256Digest};
pub use error::{CoreError, Result};
pub use format::{
    read_preamble, signed_data_for, signed_message_prefix, write_preamble, AsymmetricKeyProof,
    CrxFileHeader, PackageKind, Preamble, SignedData,
};
pub use id::CrxId;
