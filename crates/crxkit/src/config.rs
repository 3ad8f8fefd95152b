//! Creator and verifier configuration.

use std::fmt;
use std::str::FromStr;

use crxkit_core::format::DEFAULT_BUFFER_SIZE;

/// Configuration for [`Creator`](crate::Creator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorConfig {
    /// Chunk size for streaming the archive.
    pub buffer_size: usize,
}

impl Default for CreatorConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Which publisher proof a package must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerifierFormat {
    /// Any validly signed package.
    #[default]
    Crx3,
    /// A publisher proof is required; the test publisher key also counts.
    Crx3WithTestPublisherProof,
    /// A proof from the production publisher key is required.
    Crx3WithPublisherProof,
}

impl VerifierFormat {
    pub const fn requires_publisher_proof(self) -> bool {
        !matches!(self, Self::Crx3)
    }

    pub const fn accepts_test_publisher_key(self) -> bool {
        matches!(self, Self::Crx3WithTestPublisherProof)
    }

    /// Canonical command line name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Crx3 => "crx3",
            Self::Crx3WithTestPublisherProof => "crx3-with-test-proof",
            Self::Crx3WithPublisherProof => "crx3-with-proof",
        }
    }
}

impl fmt::Display for VerifierFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VerifierFormat {
    type Err = String;

    /// Accepts the canonical names plus the short aliases `crx3-test` and
    /// `crx3-prod`, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crx3" => Ok(Self::Crx3),
            "crx3-with-test-proof" | "crx3-test" => Ok(Self::Crx3WithTestPublisherProof),
            "crx3-with-proof" | "crx3-prod" => Ok(Self::Crx3WithPublisherProof),
            other => Err(format!("unknown format: {}", other)),
        }
    }
}

/// What a package must satisfy to verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierPolicy {
    pub format: VerifierFormat,
    /// SHA-256 hashes of public keys that must each have a proof.
    pub required_key_hashes: Vec<Vec<u8>>,
    /// Expected SHA-256 of the whole file. Empty means unchecked.
    pub required_file_hash: Option<Vec<u8>>,
    /// Chunk size for streaming the payload.
    pub buffer_size: usize,
}

impl Default for VerifierPolicy {
    fn default() -> Self {
        Self {
            format: VerifierFormat::Crx3,
            required_key_hashes: Vec::new(),
            required_file_hash: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl VerifierPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: VerifierFormat) -> Self {
        self.format = format;
        self
    }

    /// Require a proof from the key whose SHA-256 is `hash`.
    pub fn require_key_hash(mut self, hash: impl Into<Vec<u8>>) -> Self {
        self.required_key_hashes.push(hash.into());
        self
    }

    pub fn require_file_hash(mut self, hash: impl Into<Vec<u8>>) -> Self {
        self.required_file_hash = Some(hash.into());
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// The expected file hash, if one was given and is non-empty.
    pub fn expected_file_hash(&self) -> Option<&[u8]> {
        self.required_file_hash
            .as_deref()
            .filter(|hash| !hash.is_empty())
    }
}
