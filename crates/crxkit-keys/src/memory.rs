//! In-memory implementation of the KeyStore trait.
//!
//! This is primarily for testing. Nothing is persisted.

use std::sync::RwLock;

use crxkit_core::PrivateKey;

use crate::error::{KeyError, Result};
use crate::traits::KeyStore;

/// In-memory key slot. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    slot: RwLock<Option<PrivateKey>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `key`.
    pub fn with_key(key: PrivateKey) -> Self {
        Self {
            slot: RwLock::new(Some(key)),
        }
    }

    /// Whether a key is held.
    pub fn is_empty(&self) -> bool {
        match self.slot.read() {
            Ok(slot) => slot.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn read_private_key(&self) -> Result<PrivateKey> {
        let slot = self
            .slot
            .read()
            .map_err(|e| KeyError::Poisoned(e.to_string()))?;
        slot.clone().ok_or_else(|| KeyError::NotFound("memory".into()))
    }

    fn write_private_key(&self, key: &PrivateKey) -> Result<()> {
        let mut slot = self
            .slot
            .write()
            .map_err(|e| KeyError::Poisoned(e.to_string()))?;
        *slot = Some(key.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::KeyStoreExt;
    use crxkit_core::ProofAlgorithm;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_store() {
        let store = MemoryKeyStore::new();
        assert!(store.is_empty());
        assert!(matches!(store.read_private_key(), Err(KeyError::NotFound(_))));
    }

    #[test]
    fn test_write_then_read() {
        let store = MemoryKeyStore::new();
        let key = PrivateKey::generate_ecdsa();
        store.write_private_key(&key).unwrap();
        assert!(!store.is_empty());

        let loaded = store.read_private_key().unwrap();
        assert_eq!(loaded.public_key_der().unwrap(), key.public_key_der().unwrap());
    }

    #[test]
    fn test_read_or_generate_fills_empty_store() {
        let store = MemoryKeyStore::new();
        let (key, generated) = store.read_or_generate_rsa(1024).unwrap();
        assert!(generated);
        assert_eq!(key.algorithm(), ProofAlgorithm::RsaSha256);

        let (again, generated) = store.read_or_generate_rsa(1024).unwrap();
        assert!(!generated);
        assert_eq!(again.public_key_der().unwrap(), key.public_key_der().unwrap());
    }

    #[test]
    fn test_poisoned_lock_is_not_reported_as_missing() {
        let store = Arc::new(MemoryKeyStore::with_key(PrivateKey::generate_ecdsa()));
        let writer = Arc::clone(&store);
        let panicked = thread::spawn(move || {
            let _guard = writer.slot.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(panicked.is_err());

        assert!(matches!(store.read_private_key(), Err(KeyError::Poisoned(_))));
        assert!(matches!(
            store.write_private_key(&PrivateKey::generate_ecdsa()),
            Err(KeyError::Poisoned(_))
        ));
        assert!(!store.is_empty());
    }
}
