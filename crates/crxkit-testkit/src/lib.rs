//! # crxkit testkit
//!
//! Testing utilities for crxkit.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: cached deterministic keys and a [`ContainerBuilder`] for
//!   hand-assembling packages the creator would never write (extra proofs,
//!   corrupted signatures, delta magic, odd headers)
//! - **Generators**: Proptest strategies for property-based testing
//! - **Golden vectors**: Known identifier derivations
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use crxkit::Verifier;
//! use crxkit_testkit::fixtures::{ecdsa_key, rsa_key, ContainerBuilder};
//!
//! let package = ContainerBuilder::for_key(rsa_key(), b"archive".to_vec())
//!     .proof(ecdsa_key())
//!     .delta()
//!     .build();
//! let verified = Verifier::default().verify(&package[..]).unwrap();
//! assert!(verified.is_delta());
//! ```
//!
//! ## Golden Vectors
//!
//! ```rust
//! use crxkit_testkit::vectors::verify_all_vectors;
//!
//! verify_all_vectors().unwrap();
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{ecdsa_key, other_ecdsa_key, other_rsa_key, rsa_key, ContainerBuilder};
pub use vectors::{all_vectors, verify_all_vectors, IdVector};
