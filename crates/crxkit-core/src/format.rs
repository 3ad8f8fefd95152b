//! The CRX3 container format.
//!
//! ```text
//! offset 0:  4 bytes   magic           "Cr24" (full) | "CrOD" (delta)
//! offset 4:  4 bytes   version         LE u32, always 3
//! offset 8:  4 bytes   header_length   LE u32, at most i32::MAX
//! offset 12: header_length bytes       CrxFileHeader (protobuf)
//! then:      archive payload
//! ```
//!
//! This module only encodes and decodes. Every structural failure while
//! reading a preamble is reported as [`CoreError::HeaderInvalid`] with no
//! further detail; callers must not be able to distinguish a bad magic from
//! a truncated header.

use prost::Message;
use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};

use crate::binary::{contains_subsequence, decode_le32, encode_le32};
use crate::crypto::Sha256Digest;
use crate::error::{CoreError, Result};
use crate::id::ID_SIZE;

/// Magic of a full package.
pub const MAGIC_FULL: [u8; 4] = *b"Cr24";

/// Magic of a delta (diff) package.
pub const MAGIC_DIFF: [u8; 4] = *b"CrOD";

/// The only supported format version.
pub const CRX3_VERSION: u32 = 3;

/// Size of magic, version, and header length.
pub const PREAMBLE_SIZE: usize = 12;

/// Prefix of every signed message. Keeps signatures from being replayed
/// into other protocols.
pub const SIGNATURE_CONTEXT: [u8; 16] = *b"CRX3 SignedData\0";

/// Zip end-of-central-directory record signature.
pub const ZIP_EOCD: [u8; 4] = [b'P', b'K', 0x05, 0x06];

/// Zip64 end-of-central-directory locator signature.
pub const ZIP_EOCD64: [u8; 4] = [b'P', b'K', 0x06, 0x07];

/// SHA-256 of the production publisher key.
pub const PUBLISHER_KEY_HASH: [u8; 32] = [
    0x61, 0xf7, 0xf2, 0xa6, 0xbf, 0xcf, 0x74, 0xcd, 0x0b, 0xc1, 0xfe, 0x24, 0x97, 0xcc, 0x9b, 0x04,
    0x25, 0x4c, 0x65, 0x8f, 0x79, 0xf2, 0x14, 0x53, 0x92, 0x86, 0x7e, 0xa8, 0x36, 0x63, 0x67, 0xcf,
];

/// SHA-256 of the test publisher key.
pub const PUBLISHER_TEST_KEY_HASH: [u8; 32] = [
    0x6c, 0x46, 0x41, 0x3b, 0x00, 0xd0, 0xfa, 0x0e, 0x72, 0xc8, 0xd2, 0x5f, 0x64, 0xf3, 0xa6, 0x17,
    0x03, 0x0d, 0xde, 0x21, 0x61, 0xbe, 0xb7, 0x95, 0x91, 0x95, 0x83, 0x68, 0x12, 0xe9, 0x78, 0x1e,
];

/// Chunk size used when streaming archives.
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 12;

/// Full package or delta package, as told by the magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    Full,
    Delta,
}

impl PackageKind {
    /// The magic bytes for this kind.
    pub const fn magic(self) -> [u8; 4] {
        match self {
            Self::Full => MAGIC_FULL,
            Self::Delta => MAGIC_DIFF,
        }
    }

    /// Recognise a magic.
    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        if magic == MAGIC_FULL {
            Some(Self::Full)
        } else if magic == MAGIC_DIFF {
            Some(Self::Delta)
        } else {
            None
        }
    }

    /// Whether this is a delta package.
    pub const fn is_delta(self) -> bool {
        matches!(self, Self::Delta)
    }
}

/// The container header.
///
/// Fields are declared in tag order so the encoding matches other CRX3
/// writers byte for byte.
#[derive(Clone, PartialEq, Message)]
pub struct CrxFileHeader {
    /// PSS is not supported; these are PKCS#1 v1.5 proofs.
    #[prost(message, repeated, tag = "2")]
    pub sha256_with_rsa: Vec<AsymmetricKeyProof>,

    #[prost(message, repeated, tag = "3")]
    pub sha256_with_ecdsa: Vec<AsymmetricKeyProof>,

    /// Opaque blob, carried through untouched.
    #[prost(bytes = "vec", optional, tag = "4")]
    pub verified_contents: Option<Vec<u8>>,

    /// Serialized [`SignedData`].
    #[prost(bytes = "vec", optional, tag = "10000")]
    pub signed_header_data: Option<Vec<u8>>,
}

/// One (public key, signature) pair.
#[derive(Clone, PartialEq, Message)]
pub struct AsymmetricKeyProof {
    /// SubjectPublicKeyInfo DER.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub public_key: Option<Vec<u8>>,

    #[prost(bytes = "vec", optional, tag = "2")]
    pub signature: Option<Vec<u8>>,
}

impl AsymmetricKeyProof {
    /// Create a proof.
    pub fn new(public_key: Vec<u8>, signature: Vec<u8>) -> Self {
        Self {
            public_key: Some(public_key),
            signature: Some(signature),
        }
    }

    /// Public key bytes, empty when absent.
    pub fn public_key_bytes(&self) -> &[u8] {
        self.public_key.as_deref().unwrap_or_default()
    }

    /// Signature bytes, empty when absent.
    pub fn signature_bytes(&self) -> &[u8] {
        self.signature.as_deref().unwrap_or_default()
    }
}

/// The signed region of the header.
#[derive(Clone, PartialEq, Message)]
pub struct SignedData {
    /// First 16 bytes of SHA-256 over the developer public key.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub crx_id: Option<Vec<u8>>,
}

impl CrxFileHeader {
    /// Serialize to protobuf bytes.
    pub fn encode_to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// Parse from protobuf bytes.
    pub fn decode_from(bytes: &[u8]) -> Result<Self> {
        Self::decode(bytes).map_err(|_| CoreError::HeaderInvalid)
    }
}

impl SignedData {
    /// Parse from protobuf bytes.
    pub fn decode_from(bytes: &[u8]) -> Result<Self> {
        Self::decode(bytes).map_err(|_| CoreError::HeaderInvalid)
    }

    /// Serialize to protobuf bytes.
    pub fn encode_to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// The declared id bytes, empty when absent.
    pub fn crx_id_bytes(&self) -> &[u8] {
        self.crx_id.as_deref().unwrap_or_default()
    }
}

/// Build the serialized signed region for a developer key.
pub fn signed_data_for(public_key_der: &[u8]) -> Vec<u8> {
    let digest = Sha256Digest::compute(public_key_der);
    SignedData {
        crx_id: Some(digest.as_bytes()[..ID_SIZE].to_vec()),
    }
    .encode_to_bytes()
}

/// Everything a signature covers before the archive:
/// `SIGNATURE_CONTEXT || LE32(len) || signed_header_data`.
pub fn signed_message_prefix(signed_header_data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SIGNATURE_CONTEXT.len() + 4 + signed_header_data.len());
    buf.extend_from_slice(&SIGNATURE_CONTEXT);
    buf.extend_from_slice(&encode_le32(signed_header_data.len() as u32));
    buf.extend_from_slice(signed_header_data);
    buf
}

/// Whether header bytes embed a zip end-of-central-directory marker.
pub fn contains_zip_marker(header_bytes: &[u8]) -> bool {
    contains_subsequence(header_bytes, &ZIP_EOCD) || contains_subsequence(header_bytes, &ZIP_EOCD64)
}

/// Write magic, version, header length and header.
pub fn write_preamble<W: Write>(
    writer: &mut W,
    kind: PackageKind,
    header_bytes: &[u8],
) -> io::Result<()> {
    let header_len = u32::try_from(header_bytes.len())
        .ok()
        .filter(|len| *len <= i32::MAX as u32)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "header too large"))?;
    writer.write_all(&kind.magic())?;
    writer.write_all(&encode_le32(CRX3_VERSION))?;
    writer.write_all(&encode_le32(header_len))?;
    writer.write_all(header_bytes)
}

/// A parsed container preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preamble {
    pub kind: PackageKind,
    pub header_bytes: Vec<u8>,
}

/// Read magic, version, header length and header bytes, feeding every byte
/// read into `file_hash`.
///
/// Leaves `reader` positioned at the first payload byte.
pub fn read_preamble<R: Read>(reader: &mut R, file_hash: &mut Sha256) -> Result<Preamble> {
    let magic = read_exact_hashed(reader, 4, file_hash)?;
    let kind = PackageKind::from_magic(&magic).ok_or(CoreError::HeaderInvalid)?;

    let version = decode_le32(&read_exact_hashed(reader, 4, file_hash)?)?;
    if version != CRX3_VERSION {
        return Err(CoreError::HeaderInvalid);
    }

    let header_len = decode_le32(&read_exact_hashed(reader, 4, file_hash)?)?;
    if header_len > i32::MAX as u32 {
        return Err(CoreError::HeaderInvalid);
    }

    let header_bytes = read_exact_hashed(reader, header_len as usize, file_hash)?;
    Ok(Preamble { kind, header_bytes })
}

/// Read exactly `len` bytes. EOF is a structural error; any other I/O
/// failure is passed through.
///
/// Grows the buffer as data arrives so a hostile length cannot force a
/// large allocation up front.
fn read_exact_hashed<R: Read>(reader: &mut R, len: usize, hash: &mut Sha256) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(DEFAULT_BUFFER_SIZE));
    let read = reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if read != len {
        return Err(CoreError::HeaderInvalid);
    }
    hash.update(&buf);
    Ok(buf)
}
