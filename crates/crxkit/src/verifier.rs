//! Package verification.
//!
//! One pass over the input. The preamble and header are read and checked,
//! a verifier is started for every proof, and then the payload is streamed
//! through the file digest and all verifiers together.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use crxkit_core::format::{contains_zip_marker, PUBLISHER_KEY_HASH, PUBLISHER_TEST_KEY_HASH};
use crxkit_core::id::ID_SIZE;
use crxkit_core::{
    read_preamble, signed_message_prefix, CoreError, CrxFileHeader, CrxId, PackageKind,
    ProofAlgorithm, ProofVerifier, Sha256Digest, SignedData,
};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::VerifierPolicy;
use crate::error::{VerifierResult, VerifyError};

/// A successfully verified package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub kind: PackageKind,
    /// Base64 of [`Verified::public_key_der`].
    pub public_key: String,
    /// The developer key's SubjectPublicKeyInfo DER.
    pub public_key_der: Vec<u8>,
    pub crx_id: CrxId,
    pub verified_contents: Option<Vec<u8>>,
}

impl Verified {
    pub fn is_delta(&self) -> bool {
        self.kind.is_delta()
    }

    /// `OkFull` or `OkDelta`.
    pub fn result(&self) -> VerifierResult {
        match self.kind {
            PackageKind::Full => VerifierResult::OkFull,
            PackageKind::Delta => VerifierResult::OkDelta,
        }
    }
}

/// Checks CRX3 packages against a [`VerifierPolicy`].
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    policy: VerifierPolicy,
}

/// Proofs registered from the header, before the payload is read.
struct Proofs {
    active: Vec<ProofVerifier>,
    developer_key: Option<Vec<u8>>,
    found_publisher_key: bool,
    unmatched_required: BTreeSet<String>,
}

impl Verifier {
    pub fn new(policy: VerifierPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &VerifierPolicy {
        &self.policy
    }

    /// Open and verify the package at `path`.
    pub fn verify_path(&self, path: impl AsRef<Path>) -> Result<Verified, VerifyError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "cannot open package");
            VerifyError::FileNotReadable(e)
        })?;
        self.verify(BufReader::new(file))
    }

    /// Verify a package read from `reader`, consuming it to the end.
    pub fn verify<R: Read>(&self, reader: R) -> Result<Verified, VerifyError> {
        self.verify_inner(reader).map_err(|e| {
            warn!(error = %e, result = %VerifierResult::from(&e), "verification failed");
            e
        })
    }

    fn verify_inner<R: Read>(&self, mut reader: R) -> Result<Verified, VerifyError> {
        let mut file_hash = Sha256::new();
        let preamble = read_preamble(&mut reader, &mut file_hash).map_err(|e| match e {
            CoreError::Io(io) => VerifyError::FileNotReadable(io),
            _ => VerifyError::HeaderInvalid,
        })?;
        if contains_zip_marker(&preamble.header_bytes) {
            return Err(VerifyError::HeaderInvalid);
        }

        let header = CrxFileHeader::decode_from(&preamble.header_bytes)
            .map_err(|_| VerifyError::HeaderInvalid)?;
        let signed_header_data = header
            .signed_header_data
            .as_deref()
            .ok_or(VerifyError::HeaderInvalid)?;
        let signed_data =
            SignedData::decode_from(signed_header_data).map_err(|_| VerifyError::HeaderInvalid)?;
        if signed_data.crx_id_bytes().len() != ID_SIZE {
            return Err(VerifyError::HeaderInvalid);
        }
        let declared_id =
            CrxId::from_hash(signed_data.crx_id_bytes()).map_err(|_| VerifyError::HeaderInvalid)?;

        let proofs = self.register_proofs(&header, signed_header_data, &declared_id)?;
        let developer_key = match proofs.developer_key {
            Some(key) if proofs.unmatched_required.is_empty() => key,
            _ => return Err(VerifyError::RequiredProofMissing),
        };
        if self.policy.format.requires_publisher_proof() && !proofs.found_publisher_key {
            return Err(VerifyError::RequiredProofMissing);
        }

        let mut active = proofs.active;
        let payload_bytes = self.stream_payload(&mut reader, &mut file_hash, &mut active)?;
        debug!(payload_bytes, proofs = active.len(), "payload streamed");
        for verifier in active {
            verifier
                .finalize()
                .map_err(|_| VerifyError::SignatureVerificationFailed)?;
        }

        let digest = Sha256Digest::finish(file_hash);
        if let Some(expected) = self.policy.expected_file_hash() {
            if expected.len() != digest.as_bytes().len() {
                return Err(VerifyError::ExpectedHashInvalid);
            }
            if expected != digest.as_bytes() {
                return Err(VerifyError::FileHashFailed);
            }
        }

        debug!(crx_id = %declared_id, kind = ?preamble.kind, "package verified");
        Ok(Verified {
            kind: preamble.kind,
            public_key: BASE64.encode(&developer_key),
            public_key_der: developer_key,
            crx_id: declared_id,
            verified_contents: header.verified_contents,
        })
    }

    /// Start a verifier for every RSA proof, then every ECDSA proof, and
    /// record which policy requirements they satisfy.
    fn register_proofs(
        &self,
        header: &CrxFileHeader,
        signed_header_data: &[u8],
        declared_id: &CrxId,
    ) -> Result<Proofs, VerifyError> {
        let prefix = signed_message_prefix(signed_header_data);
        let accept_test_key = self.policy.format.accepts_test_publisher_key();

        let mut proofs = Proofs {
            active: Vec::with_capacity(
                header.sha256_with_rsa.len() + header.sha256_with_ecdsa.len(),
            ),
            developer_key: None,
            found_publisher_key: false,
            unmatched_required: self
                .policy
                .required_key_hashes
                .iter()
                .map(hex::encode)
                .collect(),
        };

        let all = header
            .sha256_with_rsa
            .iter()
            .map(|proof| (ProofAlgorithm::RsaSha256, proof))
            .chain(
                header
                    .sha256_with_ecdsa
                    .iter()
                    .map(|proof| (ProofAlgorithm::EcdsaSha256, proof)),
            );
        for (algorithm, proof) in all {
            let public_key = proof.public_key_bytes();
            let mut verifier =
                ProofVerifier::new(algorithm, public_key, proof.signature_bytes().to_vec())
                    .map_err(|_| VerifyError::SignatureInitializationFailed)?;
            verifier.update(&prefix);
            proofs.active.push(verifier);

            let key_hash = Sha256Digest::compute(public_key);
            proofs.unmatched_required.remove(&key_hash.to_hex());

            if is_publisher_key(key_hash.as_bytes(), accept_test_key) {
                proofs.found_publisher_key = true;
            }

            let is_developer = CrxId::from_public_key(public_key) == *declared_id;
            if is_developer && proofs.developer_key.is_none() {
                proofs.developer_key = Some(public_key.to_vec());
            }
            debug!(
                %algorithm,
                key_hash = &key_hash.to_hex()[..16],
                is_developer,
                "proof registered"
            );
        }
        Ok(proofs)
    }

    /// Feed the rest of the input to the file digest and every verifier,
    /// one chunk at a time.
    fn stream_payload<R: Read>(
        &self,
        reader: &mut R,
        file_hash: &mut Sha256,
        active: &mut [ProofVerifier],
    ) -> Result<u64, VerifyError> {
        let mut buf = vec![0u8; self.policy.buffer_size.max(1)];
        let mut total = 0u64;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => return Ok(total),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(VerifyError::FileNotReadable(e)),
            };
            let chunk = &buf[..n];
            file_hash.update(chunk);
            for verifier in active.iter_mut() {
                verifier.update(chunk);
            }
            total += n as u64;
        }
    }
}

/// Whether `key_hash` names the store's publisher key. The test publisher
/// key only counts when `accept_test` is set.
fn is_publisher_key(key_hash: &[u8; 32], accept_test: bool) -> bool {
    key_hash == &PUBLISHER_KEY_HASH || (accept_test && key_hash == &PUBLISHER_TEST_KEY_HASH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerifierFormat;
    use crate::creator::Creator;
    use crxkit_core::PrivateKey;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::{self, Cursor};
    use std::sync::OnceLock;

    fn rsa_key() -> &'static PrivateKey {
        static KEY: OnceLock<PrivateKey> = OnceLock::new();
        KEY.get_or_init(|| {
            PrivateKey::generate_rsa_with_rng(&mut StdRng::seed_from_u64(5), 1024).unwrap()
        })
    }

    fn package(archive: &[u8], verified_contents: Option<&[u8]>) -> Vec<u8> {
        let mut out = Vec::new();
        Creator::default()
            .create_to_writer(&mut out, archive, rsa_key(), verified_contents)
            .unwrap();
        out
    }

    fn verify(bytes: &[u8]) -> Result<Verified, VerifyError> {
        Verifier::default().verify(Cursor::new(bytes))
    }

    #[test]
    fn test_roundtrip() {
        let verified = verify(&package(b"archive bytes", None)).unwrap();
        let der = rsa_key().public_key_der().unwrap();
        assert_eq!(verified.result(), VerifierResult::OkFull);
        assert!(!verified.is_delta());
        assert_eq!(verified.crx_id, CrxId::from_public_key(&der));
        assert_eq!(verified.public_key_der, der);
        assert_eq!(verified.public_key, BASE64.encode(&der));
        assert_eq!(verified.verified_contents, None);
    }

    #[test]
    fn test_publisher_key_matching() {
        let unrelated = Sha256Digest::compute(b"some other key").0;
        for format in [
            VerifierFormat::Crx3,
            VerifierFormat::Crx3WithTestPublisherProof,
            VerifierFormat::Crx3WithPublisherProof,
        ] {
            let accept_test = format.accepts_test_publisher_key();
            assert!(is_publisher_key(&PUBLISHER_KEY_HASH, accept_test), "{}", format);
            assert!(!is_publisher_key(&unrelated, accept_test), "{}", format);
            assert_eq!(
                is_publisher_key(&PUBLISHER_TEST_KEY_HASH, accept_test),
                format == VerifierFormat::Crx3WithTestPublisherProof,
                "{}",
                format
            );
        }
    }

    #[test]
    fn test_verified_contents_returned() {
        let verified = verify(&package(b"zip", Some(b"vc"))).unwrap();
        assert_eq!(verified.verified_contents.as_deref(), Some(&b"vc"[..]));
    }

    #[test]
    fn test_payload_bit_flip() {
        let mut bytes = package(&[0u8; 5000], None);
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(matches!(verify(&bytes), Err(VerifyError::SignatureVerificationFailed)));
    }

    #[test]
    fn test_small_buffer_same_result() {
        let bytes = package(&[9u8; 3000], None);
        let verifier = Verifier::new(VerifierPolicy::new().with_buffer_size(7));
        assert!(verifier.verify(Cursor::new(&bytes)).is_ok());
    }

    #[test]
    fn test_truncated_preamble() {
        let bytes = package(b"zip", None);
        assert!(matches!(verify(&bytes[..11]), Err(VerifyError::HeaderInvalid)));
        assert!(matches!(verify(&[]), Err(VerifyError::HeaderInvalid)));
    }

    #[test]
    fn test_missing_signed_header_data() {
        let header = CrxFileHeader::default().encode_to_bytes();
        let mut bytes = Vec::new();
        crxkit_core::write_preamble(&mut bytes, PackageKind::Full, &header).unwrap();
        assert!(matches!(verify(&bytes), Err(VerifyError::HeaderInvalid)));
    }

    #[test]
    fn test_unmatched_required_key() {
        let bytes = package(b"zip", None);
        let verifier = Verifier::new(VerifierPolicy::new().require_key_hash([0u8; 32]));
        assert!(matches!(
            verifier.verify(Cursor::new(&bytes)),
            Err(VerifyError::RequiredProofMissing)
        ));

        let key_hash = Sha256Digest::compute(&rsa_key().public_key_der().unwrap());
        let verifier = Verifier::new(VerifierPolicy::new().require_key_hash(key_hash.0));
        assert!(verifier.verify(Cursor::new(&bytes)).is_ok());
    }

    #[test]
    fn test_publisher_proof_required() {
        let bytes = package(b"zip", None);
        for format in [
            VerifierFormat::Crx3WithPublisherProof,
            VerifierFormat::Crx3WithTestPublisherProof,
        ] {
            let verifier = Verifier::new(VerifierPolicy::new().with_format(format));
            assert!(matches!(
                verifier.verify(Cursor::new(&bytes)),
                Err(VerifyError::RequiredProofMissing)
            ));
        }
    }

    #[test]
    fn test_file_hash_gate() {
        let bytes = package(b"zip", None);
        let digest = Sha256Digest::compute(&bytes);

        let ok = Verifier::new(VerifierPolicy::new().require_file_hash(digest.0));
        assert!(ok.verify(Cursor::new(&bytes)).is_ok());

        let short = Verifier::new(VerifierPolicy::new().require_file_hash(vec![1u8; 31]));
        assert!(matches!(
            short.verify(Cursor::new(&bytes)),
            Err(VerifyError::ExpectedHashInvalid)
        ));

        let mut wrong = digest.0;
        wrong[0] ^= 0xff;
        let bad = Verifier::new(VerifierPolicy::new().require_file_hash(wrong));
        assert!(matches!(bad.verify(Cursor::new(&bytes)), Err(VerifyError::FileHashFailed)));
    }

    struct FailAfter {
        inner: Cursor<Vec<u8>>,
        limit: u64,
    }

    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.inner.position() >= self.limit {
                return Err(io::Error::new(ErrorKind::Other, "device gone"));
            }
            let room = (self.limit - self.inner.position()) as usize;
            let len = buf.len().min(room);
            self.inner.read(&mut buf[..len])
        }
    }

    #[test]
    fn test_payload_read_error_is_not_readable() {
        let bytes = package(&[1u8; 1000], None);
        let limit = (bytes.len() - 10) as u64;
        let reader = FailAfter {
            inner: Cursor::new(bytes),
            limit,
        };
        assert!(matches!(
            Verifier::default().verify(reader),
            Err(VerifyError::FileNotReadable(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = Verifier::default().verify_path("/definitely/not/here.crx");
        assert!(matches!(result, Err(VerifyError::FileNotReadable(_))));
        assert_eq!(VerifierResult::from(&result), VerifierResult::ErrorFileNotReadable);
    }
}
