//! Cryptographic primitives for crxkit.
//!
//! Wraps SHA-256, RSA PKCS#1 v1.5 and ECDSA P-256 behind strong types. Both
//! signing and verification are streaming: callers feed bytes with
//! `update` and only pay for the archive once.

use p256::ecdsa::{
    Signature as EcdsaSignature, SigningKey as EcdsaSigningKey,
    VerifyingKey as EcdsaVerifyingKey,
};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, SecretDocument};
use rand::{CryptoRng, RngCore};
use rsa::pkcs1v15::{
    Signature as RsaSignature, SigningKey as RsaSigningKey, VerifyingKey as RsaVerifyingKey,
};
use rsa::signature::{DigestSigner, DigestVerifier, SignatureEncoding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{CoreError, Result};

/// Default RSA modulus size for generated keys.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Digest(pub [u8; 32]);

impl Sha256Digest {
    /// Hash the given data.
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Finish a running hasher.
    pub fn finish(hasher: Sha256) -> Self {
        Self(hasher.finalize().into())
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Sha256Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Sha256Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// The two proof algorithms a container may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofAlgorithm {
    /// RSA PKCS#1 v1.5 over SHA-256.
    RsaSha256,
    /// ECDSA P-256 over SHA-256, DER-encoded signatures.
    EcdsaSha256,
}

impl fmt::Display for ProofAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RsaSha256 => f.write_str("sha256_with_rsa"),
            Self::EcdsaSha256 => f.write_str("sha256_with_ecdsa"),
        }
    }
}

/// A private signing key.
#[derive(Clone)]
pub enum PrivateKey {
    Rsa(RsaPrivateKey),
    Ecdsa(EcdsaSigningKey),
}

impl PrivateKey {
    /// Generate a new RSA key with the system RNG.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        Self::generate_rsa_with_rng(&mut rand::thread_rng(), bits)
    }

    /// Generate a new RSA key from the given RNG.
    pub fn generate_rsa_with_rng<R: CryptoRng + RngCore>(rng: &mut R, bits: usize) -> Result<Self> {
        RsaPrivateKey::new(rng, bits)
            .map(Self::Rsa)
            .map_err(|e| CoreError::Crypto(e.to_string()))
    }

    /// Generate a new ECDSA P-256 key with the system RNG.
    pub fn generate_ecdsa() -> Self {
        Self::generate_ecdsa_with_rng(&mut rand::thread_rng())
    }

    /// Generate a new ECDSA P-256 key from the given RNG.
    pub fn generate_ecdsa_with_rng<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        Self::Ecdsa(EcdsaSigningKey::random(rng))
    }

    /// The proof list this key signs for.
    pub fn algorithm(&self) -> ProofAlgorithm {
        match self {
            Self::Rsa(_) => ProofAlgorithm::RsaSha256,
            Self::Ecdsa(_) => ProofAlgorithm::EcdsaSha256,
        }
    }

    /// SubjectPublicKeyInfo DER encoding of the public half.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        let doc = match self {
            Self::Rsa(key) => RsaPublicKey::from(key).to_public_key_der(),
            Self::Ecdsa(key) => key.verifying_key().to_public_key_der(),
        }
        .map_err(|e| CoreError::Crypto(e.to_string()))?;
        Ok(doc.as_bytes().to_vec())
    }

    /// PKCS#8 DER encoding of the private key.
    pub fn to_pkcs8_der(&self) -> Result<SecretDocument> {
        match self {
            Self::Rsa(key) => key.to_pkcs8_der(),
            Self::Ecdsa(key) => key.to_pkcs8_der(),
        }
        .map_err(|e| CoreError::Crypto(e.to_string()))
    }

    /// Parse a PKCS#8 DER private key, RSA first, then P-256.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        if let Ok(key) = RsaPrivateKey::from_pkcs8_der(der) {
            return Ok(Self::Rsa(key));
        }
        EcdsaSigningKey::from_pkcs8_der(der)
            .map(Self::Ecdsa)
            .map_err(|_| CoreError::UnsupportedKey("not an RSA or P-256 PKCS#8 key".into()))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key_hash = self
            .public_key_der()
            .map(|der| Sha256Digest::compute(&der).to_hex()[..16].to_string())
            .unwrap_or_default();
        write!(f, "PrivateKey({}, {})", self.algorithm(), key_hash)
    }
}

/// Streaming signer over a single private key.
pub struct ProofSigner {
    key: SignerKey,
    hasher: Sha256,
}

enum SignerKey {
    Rsa(RsaSigningKey<Sha256>),
    Ecdsa(EcdsaSigningKey),
}

impl ProofSigner {
    /// Start a signing context.
    pub fn new(key: &PrivateKey) -> Self {
        let key = match key {
            PrivateKey::Rsa(k) => SignerKey::Rsa(RsaSigningKey::<Sha256>::new(k.clone())),
            PrivateKey::Ecdsa(k) => SignerKey::Ecdsa(k.clone()),
        };
        Self {
            key,
            hasher: Sha256::new(),
        }
    }

    /// Feed more message bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Produce the signature over everything fed so far.
    pub fn finalize(self) -> Result<Vec<u8>> {
        match self.key {
            SignerKey::Rsa(key) => {
                let signature: RsaSignature = key
                    .try_sign_digest(self.hasher)
                    .map_err(|e| CoreError::Crypto(e.to_string()))?;
                Ok(signature.to_vec())
            }
            SignerKey::Ecdsa(key) => {
                let signature: EcdsaSignature = key
                    .try_sign_digest(self.hasher)
                    .map_err(|e| CoreError::Crypto(e.to_string()))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
        }
    }
}

/// Streaming verifier for one proof: a public key, a running digest, and
/// the signature the proof claims.
pub struct ProofVerifier {
    algorithm: ProofAlgorithm,
    key: VerifierKey,
    hasher: Sha256,
    expected: Vec<u8>,
}

enum VerifierKey {
    Rsa(RsaVerifyingKey<Sha256>),
    Ecdsa(EcdsaVerifyingKey),
}

impl ProofVerifier {
    /// Parse `public_key_der` for `algorithm` and start a context.
    pub fn new(
        algorithm: ProofAlgorithm,
        public_key_der: &[u8],
        expected_signature: Vec<u8>,
    ) -> Result<Self> {
        let key = match algorithm {
            ProofAlgorithm::RsaSha256 => {
                let public = RsaPublicKey::from_public_key_der(public_key_der)
                    .map_err(|_| CoreError::InvalidPublicKey)?;
                VerifierKey::Rsa(RsaVerifyingKey::<Sha256>::new(public))
            }
            ProofAlgorithm::EcdsaSha256 => VerifierKey::Ecdsa(
                EcdsaVerifyingKey::from_public_key_der(public_key_der)
                    .map_err(|_| CoreError::InvalidPublicKey)?,
            ),
        };
        Ok(Self {
            algorithm,
            key,
            hasher: Sha256::new(),
            expected: expected_signature,
        })
    }

    /// The algorithm this verifier checks.
    pub fn algorithm(&self) -> ProofAlgorithm {
        self.algorithm
    }

    /// Feed more message bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Check the expected signature against everything fed so far.
    pub fn finalize(self) -> Result<()> {
        match self.key {
            VerifierKey::Rsa(key) => {
                let signature = RsaSignature::try_from(self.expected.as_slice())
                    .map_err(|_| CoreError::InvalidSignature)?;
                key.verify_digest(self.hasher, &signature)
                    .map_err(|_| CoreError::InvalidSignature)
            }
            VerifierKey::Ecdsa(key) => {
                let signature = EcdsaSignature::from_der(&self.expected)
                    .map_err(|_| CoreError::InvalidSignature)?;
                key.verify_digest(self.hasher, &signature)
                    .map_err(|_| CoreError::InvalidSignature)
            }
        }
    }
}

impl fmt::Debug for ProofVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofVerifier({})", self.algorithm)
    }
}
