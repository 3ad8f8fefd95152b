//! # crxkit keys
//!
//! Storage for the developer signing key, behind the [`KeyStore`] trait.
//!
//! ## Key Types
//!
//! - [`KeyStore`] - read and write one private key
//! - [`KeyStoreExt`] - load-or-generate helpers
//! - [`PemFile`] - PKCS#8 PEM file on disk
//! - [`MemoryKeyStore`] - in-memory slot for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use crxkit_keys::{KeyStore, KeyStoreExt, PemFile};
//!
//! let store = PemFile::new("extension.pem");
//! let (key, generated) = store.read_or_generate().unwrap();
//! if generated {
//!     println!("new key written to {}", store.path().display());
//! }
//! # let _ = key;
//! ```

pub mod error;
pub mod file;
pub mod memory;
pub mod pem;
pub mod traits;

pub use error::{KeyError, Result};
pub use file::PemFile;
pub use memory::MemoryKeyStore;
pub use pem::{decode_private_key_pem, encode_private_key_pem};
pub use traits::{KeyStore, KeyStoreExt};
