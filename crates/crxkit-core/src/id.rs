//! Package identifiers.
//!
//! A [`CrxId`] is the first 16 bytes of a SHA-256 digest, rendered as 32
//! characters over `a..=p`: hex digit `v` becomes the letter `'a' + v`.

use std::fmt;
use std::str::FromStr;

use crate::crypto::Sha256Digest;
use crate::error::{CoreError, Result};

/// Number of digest bytes kept in an identifier.
pub const ID_SIZE: usize = 16;

/// Length of the rendered identifier.
pub const ID_LEN: usize = ID_SIZE * 2;

/// A 16-byte package identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CrxId(pub [u8; ID_SIZE]);

impl CrxId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    /// Derive the identifier of a public key (or any byte string).
    pub fn from_public_key(bytes: &[u8]) -> Self {
        let digest = Sha256Digest::compute(bytes);
        let mut arr = [0u8; ID_SIZE];
        arr.copy_from_slice(&digest.as_bytes()[..ID_SIZE]);
        Self(arr)
    }

    /// Build from a precomputed hash. Only the first 16 bytes are used.
    pub fn from_hash(hash: &[u8]) -> Result<Self> {
        if hash.len() < ID_SIZE {
            return Err(CoreError::InvalidInput(format!(
                "hash must be at least {} bytes, got {}",
                ID_SIZE,
                hash.len()
            )));
        }
        let mut arr = [0u8; ID_SIZE];
        arr.copy_from_slice(&hash[..ID_SIZE]);
        Ok(Self(arr))
    }

    /// Build from exactly 32 hex characters.
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.len() != ID_LEN {
            return Err(CoreError::InvalidInput(format!(
                "expected {} hex characters, got {}",
                ID_LEN,
                s.len()
            )));
        }
        let bytes = crate::binary::from_hex(s)?;
        Self::from_hash(&bytes)
    }

    /// Lowercase hex form of the identifier bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Check that `s` looks like an identifier: 32 characters in `a..=p`,
    /// either case. Not tied to any key.
    pub fn is_valid(s: &str) -> bool {
        s.len() == ID_LEN
            && s
                .bytes()
                .all(|b| matches!(b.to_ascii_lowercase(), b'a'..=b'p'))
    }
}

impl fmt::Display for CrxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::with_capacity(ID_LEN);
        for byte in self.0 {
            out.push(char::from(b'a' + (byte >> 4)));
            out.push(char::from(b'a' + (byte & 0x0f)));
        }
        f.write_str(&out)
    }
}

impl fmt::Debug for CrxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CrxId({})", self)
    }
}

impl FromStr for CrxId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        if !Self::is_valid(s) {
            return Err(CoreError::InvalidInput(format!("not a package id: {:?}", s)));
        }
        let letters = s.as_bytes();
        let mut arr = [0u8; ID_SIZE];
        for (i, byte) in arr.iter_mut().enumerate() {
            let hi = letters[2 * i].to_ascii_lowercase() - b'a';
            let lo = letters[2 * i + 1].to_ascii_lowercase() - b'a';
            *byte = (hi << 4) | lo;
        }
        Ok(Self(arr))
    }
}

impl AsRef<[u8]> for CrxId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ID_SIZE]> for CrxId {
    fn from(bytes: [u8; ID_SIZE]) -> Self {
        Self(bytes)
    }
}
