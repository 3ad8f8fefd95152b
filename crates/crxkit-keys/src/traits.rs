//! KeyStore trait: where the creator's signing key lives.
//!
//! Implementations include a PKCS#8 PEM file (primary) and an in-memory
//! slot (for tests).

use crxkit_core::crypto::DEFAULT_RSA_BITS;
use crxkit_core::PrivateKey;
use tracing::debug;

use crate::error::{KeyError, Result};

/// A single private key slot.
///
/// # Design Notes
///
/// - **One key per store**: a store holds the developer key of one package.
/// - **Overwrite on write**: writing replaces any existing key.
/// - **Missing is distinct**: reading an empty store is `KeyError::NotFound`,
///   so callers can tell "no key yet" from "unreadable key".
pub trait KeyStore: Send + Sync {
    /// Load the stored key.
    fn read_private_key(&self) -> Result<PrivateKey>;

    /// Store `key`, replacing whatever was there.
    fn write_private_key(&self, key: &PrivateKey) -> Result<()>;
}

/// Convenience methods layered on [`KeyStore`].
pub trait KeyStoreExt: KeyStore {
    /// Load the stored key, or generate and store a fresh RSA key when the
    /// store is empty.
    ///
    /// Returns the key and whether it was freshly generated.
    fn read_or_generate_rsa(&self, bits: usize) -> Result<(PrivateKey, bool)> {
        match self.read_private_key() {
            Ok(key) => Ok((key, false)),
            Err(KeyError::NotFound(location)) => {
                debug!(%location, bits, "no key stored, generating RSA key");
                let key = PrivateKey::generate_rsa(bits)?;
                self.write_private_key(&key)?;
                Ok((key, true))
            }
            Err(e) => Err(e),
        }
    }

    /// [`read_or_generate_rsa`](Self::read_or_generate_rsa) with the default
    /// modulus size.
    fn read_or_generate(&self) -> Result<(PrivateKey, bool)> {
        self.read_or_generate_rsa(DEFAULT_RSA_BITS)
    }
}

impl<T: KeyStore + ?Sized> KeyStoreExt for T {}
