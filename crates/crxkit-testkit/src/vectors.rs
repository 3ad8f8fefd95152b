//! Golden identifier vectors.
//!
//! Each vector pins the identifier derived from a fixed input, so any change
//! to hashing, truncation or the letter mapping is caught.

use crxkit_core::CrxId;

/// A golden identifier vector.
#[derive(Debug, Clone)]
pub struct IdVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Bytes fed to the derivation (normally a public key).
    pub input: &'static [u8],
    /// Expected identifier.
    pub expected_id: &'static str,
}

const COUNTING: [u8; 32] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
    26, 27, 28, 29, 30, 31,
];

/// Get all golden vectors.
pub fn all_vectors() -> Vec<IdVector> {
    vec![
        IdVector {
            name: "empty input",
            input: b"",
            expected_id: "odlameecjipmbmbejkplpemijjgpljce",
        },
        IdVector {
            name: "abc",
            input: b"abc",
            expected_id: "lkhibglpipabmpokebebeanofnkocccd",
        },
        IdVector {
            name: "hello world",
            input: b"hello world",
            expected_id: "ljenchljjdendoaikfcofcnhnkhnklpk",
        },
        IdVector {
            name: "bytes 0..32",
            input: &COUNTING,
            expected_id: "gdanmncjggmeddggjbbcfeeilllcflep",
        },
        IdVector {
            name: "32 zero bytes",
            input: &[0u8; 32],
            expected_id: "gggihkknpigclnhhgmipmbiliojpioca",
        },
    ]
}

/// Check every vector, reporting the first mismatch.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in all_vectors() {
        let actual = CrxId::from_public_key(vector.input).to_string();
        if actual != vector.expected_id {
            return Err(format!(
                "{}: expected {}, got {}",
                vector.name, vector.expected_id, actual
            ));
        }
    }
    Ok(())
}
