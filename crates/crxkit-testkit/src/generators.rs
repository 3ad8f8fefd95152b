//! Proptest generators for property-based testing.

use proptest::prelude::*;

use crxkit::VerifierFormat;
use crxkit_core::{CrxId, PackageKind, PrivateKey};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Generate a random CrxId.
pub fn crx_id() -> impl Strategy<Value = CrxId> {
    any::<[u8; 16]>().prop_map(CrxId::from_bytes)
}

/// Generate a 32-character string over `a..=p` in mixed case.
pub fn crx_id_text() -> impl Strategy<Value = String> {
    "[a-pA-P]{32}"
}

/// Generate a SHA-256 sized hash.
pub fn hash() -> impl Strategy<Value = [u8; 32]> {
    any::<[u8; 32]>()
}

/// An ECDSA P-256 key drawn from a seeded RNG.
pub fn ecdsa_key() -> impl Strategy<Value = PrivateKey> {
    any::<u64>().prop_map(|seed| {
        PrivateKey::generate_ecdsa_with_rng(&mut StdRng::seed_from_u64(seed))
    })
}

/// Full or delta magic.
pub fn package_kind() -> impl Strategy<Value = PackageKind> {
    prop_oneof![Just(PackageKind::Full), Just(PackageKind::Delta)]
}

/// Any of the three verifier formats.
pub fn verifier_format() -> impl Strategy<Value = VerifierFormat> {
    prop_oneof![
        Just(VerifierFormat::Crx3),
        Just(VerifierFormat::Crx3WithTestPublisherProof),
        Just(VerifierFormat::Crx3WithPublisherProof),
    ]
}

/// Archive bytes of at most `max_len`, empty included.
pub fn archive(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}
