//! PEM file implementation of the KeyStore trait.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crxkit_core::PrivateKey;
use tracing::debug;

use crate::error::{KeyError, Result};
use crate::pem::{decode_private_key_pem, encode_private_key_pem};
use crate::traits::KeyStore;

/// A private key kept as a PKCS#8 PEM file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemFile {
    path: PathBuf,
}

impl PemFile {
    /// Point at `path`. Nothing is touched until a read or write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file currently exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

impl KeyStore for PemFile {
    fn read_private_key(&self) -> Result<PrivateKey> {
        let text = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => KeyError::NotFound(self.path.display().to_string()),
            _ => KeyError::Io(e),
        })?;
        let key = decode_private_key_pem(&text)?;
        debug!(path = %self.path.display(), algorithm = %key.algorithm(), "read private key");
        Ok(key)
    }

    fn write_private_key(&self, key: &PrivateKey) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let pem = encode_private_key_pem(key)?;
        fs::write(&self.path, pem.as_bytes())?;
        debug!(path = %self.path.display(), algorithm = %key.algorithm(), "wrote private key");
        Ok(())
    }
}
