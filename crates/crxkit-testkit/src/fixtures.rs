//! Test fixtures and helpers.
//!
//! Keys are generated from fixed seeds on first use and cached for the
//! life of the test binary.

use std::sync::OnceLock;

use crxkit_core::crypto::DEFAULT_RSA_BITS;
use crxkit_core::{
    signed_data_for, signed_message_prefix, write_preamble, AsymmetricKeyProof, CrxFileHeader,
    PackageKind, PrivateKey, ProofAlgorithm, ProofSigner,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn cached_rsa(cell: &'static OnceLock<PrivateKey>, seed: u64, bits: usize) -> &'static PrivateKey {
    cell.get_or_init(|| {
        PrivateKey::generate_rsa_with_rng(&mut StdRng::seed_from_u64(seed), bits)
            .expect("seeded RSA key generation")
    })
}

/// The default developer key: 2048-bit RSA.
pub fn rsa_key() -> &'static PrivateKey {
    static KEY: OnceLock<PrivateKey> = OnceLock::new();
    cached_rsa(&KEY, 0x5eed_0001, DEFAULT_RSA_BITS)
}

/// A second RSA key, smaller so it is cheap to make.
pub fn other_rsa_key() -> &'static PrivateKey {
    static KEY: OnceLock<PrivateKey> = OnceLock::new();
    cached_rsa(&KEY, 0x5eed_0002, 1024)
}

pub fn ecdsa_key() -> &'static PrivateKey {
    static KEY: OnceLock<PrivateKey> = OnceLock::new();
    KEY.get_or_init(|| PrivateKey::generate_ecdsa_with_rng(&mut StdRng::seed_from_u64(0x5eed_0003)))
}

pub fn other_ecdsa_key() -> &'static PrivateKey {
    static KEY: OnceLock<PrivateKey> = OnceLock::new();
    KEY.get_or_init(|| PrivateKey::generate_ecdsa_with_rng(&mut StdRng::seed_from_u64(0x5eed_0004)))
}

/// SHA-256 of a key's SubjectPublicKeyInfo DER.
pub fn key_hash(key: &PrivateKey) -> [u8; 32] {
    let der = key.public_key_der().expect("public key encoding");
    crxkit_core::Sha256Digest::compute(&der).0
}

#[derive(Debug, Clone)]
enum PlannedProof {
    Signed(PrivateKey),
    Corrupted(PrivateKey),
    Raw {
        algorithm: ProofAlgorithm,
        public_key: Vec<u8>,
        signature: Vec<u8>,
    },
}

/// Assembles CRX3 packages proof by proof.
///
/// Unlike the creator, the builder accepts any mix of RSA and ECDSA proofs,
/// either magic, and arbitrary signed header data.
#[derive(Debug, Clone)]
pub struct ContainerBuilder {
    kind: PackageKind,
    payload: Vec<u8>,
    signed_header_data: Option<Vec<u8>>,
    verified_contents: Option<Vec<u8>>,
    proofs: Vec<PlannedProof>,
}

impl ContainerBuilder {
    /// An empty full package around `payload`: no proofs, no signed data.
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            kind: PackageKind::Full,
            payload,
            signed_header_data: None,
            verified_contents: None,
            proofs: Vec::new(),
        }
    }

    /// A package declaring `key` as developer key and carrying its proof.
    pub fn for_key(key: &PrivateKey, payload: Vec<u8>) -> Self {
        Self::new(payload).declare(key).proof(key)
    }

    /// Use the delta magic.
    pub fn delta(mut self) -> Self {
        self.kind = PackageKind::Delta;
        self
    }

    /// Declare the id of `key` in the signed header data.
    pub fn declare(mut self, key: &PrivateKey) -> Self {
        let der = key.public_key_der().expect("public key encoding");
        self.signed_header_data = Some(signed_data_for(&der));
        self
    }

    /// Set the serialized signed header data directly.
    pub fn signed_header_data(mut self, bytes: Vec<u8>) -> Self {
        self.signed_header_data = Some(bytes);
        self
    }

    pub fn verified_contents(mut self, bytes: Vec<u8>) -> Self {
        self.verified_contents = Some(bytes);
        self
    }

    /// Add a valid proof by `key`, in the list for its algorithm.
    pub fn proof(mut self, key: &PrivateKey) -> Self {
        self.proofs.push(PlannedProof::Signed(key.clone()));
        self
    }

    /// Add a proof by `key` whose signature has one bit flipped.
    pub fn corrupted_proof(mut self, key: &PrivateKey) -> Self {
        self.proofs.push(PlannedProof::Corrupted(key.clone()));
        self
    }

    /// Add a proof with arbitrary key and signature bytes.
    pub fn raw_proof(
        mut self,
        algorithm: ProofAlgorithm,
        public_key: Vec<u8>,
        signature: Vec<u8>,
    ) -> Self {
        self.proofs.push(PlannedProof::Raw {
            algorithm,
            public_key,
            signature,
        });
        self
    }

    /// The header as it will be written.
    pub fn header(&self) -> CrxFileHeader {
        let signed_data = self.signed_header_data.clone().unwrap_or_default();
        let mut header = CrxFileHeader {
            sha256_with_rsa: Vec::new(),
            sha256_with_ecdsa: Vec::new(),
            verified_contents: self.verified_contents.clone(),
            signed_header_data: self.signed_header_data.clone(),
        };
        for planned in &self.proofs {
            let (algorithm, proof) = match planned {
                PlannedProof::Signed(key) => {
                    (key.algorithm(), self.sign(key, &signed_data, false))
                }
                PlannedProof::Corrupted(key) => {
                    (key.algorithm(), self.sign(key, &signed_data, true))
                }
                PlannedProof::Raw {
                    algorithm,
                    public_key,
                    signature,
                } => (
                    *algorithm,
                    AsymmetricKeyProof::new(public_key.clone(), signature.clone()),
                ),
            };
            match algorithm {
                ProofAlgorithm::RsaSha256 => header.sha256_with_rsa.push(proof),
                ProofAlgorithm::EcdsaSha256 => header.sha256_with_ecdsa.push(proof),
            }
        }
        header
    }

    /// Serialize the whole package.
    pub fn build(&self) -> Vec<u8> {
        self.build_with_header_bytes(&self.header().encode_to_bytes())
    }

    /// Serialize with the given header bytes in place of the real header.
    pub fn build_with_header_bytes(&self, header_bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + header_bytes.len() + self.payload.len());
        write_preamble(&mut out, self.kind, header_bytes).expect("write to Vec");
        out.extend_from_slice(&self.payload);
        out
    }

    fn sign(&self, key: &PrivateKey, signed_data: &[u8], corrupt: bool) -> AsymmetricKeyProof {
        let mut signer = ProofSigner::new(key);
        signer.update(&signed_message_prefix(signed_data));
        signer.update(&self.payload);
        let mut signature = signer.finalize().expect("signing");
        if corrupt {
            let last = signature.len() - 1;
            signature[last] ^= 0x01;
        }
        AsymmetricKeyProof::new(key.public_key_der().expect("public key encoding"), signature)
    }
}
