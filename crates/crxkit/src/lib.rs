//! # crxkit
//!
//! Create and verify CRX3 packages: a signed protobuf header in front of a
//! zip archive.
//!
//! ## Overview
//!
//! [`Creator`] signs an archive with an RSA key and writes the package.
//! [`Verifier`] checks a package against a [`VerifierPolicy`] and reports
//! the package identifier and developer key, or exactly one
//! [`VerifyError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use crxkit::{Creator, PrivateKey, Verifier, VerifierPolicy};
//!
//! let key = PrivateKey::generate_rsa(2048).unwrap();
//! let id = Creator::default()
//!     .create(Path::new("ext.crx"), Path::new("ext.zip"), &key)
//!     .unwrap();
//!
//! let verified = Verifier::new(VerifierPolicy::default())
//!     .verify_path("ext.crx")
//!     .unwrap();
//! assert_eq!(verified.crx_id, id);
//! ```

pub mod config;
pub mod creator;
pub mod error;
pub mod verifier;

pub use config::{CreatorConfig, VerifierFormat, VerifierPolicy};
pub use creator::{ArchiveSource, Creator};
pub use error::{CreateError, VerifierResult, VerifyError};
pub use verifier::{Verified, Verifier};

pub use crxkit_core::{CrxId, PackageKind, PrivateKey};
