//! Package creation.
//!
//! The archive is read twice: once to sign it, once to copy it into the
//! output after the header. Nothing is buffered beyond one chunk.

use std::fs::File;
use std::io::{self, BufWriter, Cursor, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use crxkit_core::{
    signed_data_for, signed_message_prefix, write_preamble, AsymmetricKeyProof, CrxFileHeader,
    CrxId, PackageKind, PrivateKey, ProofAlgorithm, ProofSigner,
};
use tracing::{debug, warn};

use crate::config::CreatorConfig;
use crate::error::CreateError;

/// Something that can be opened for reading, more than once.
pub trait ArchiveSource {
    fn open(&self) -> io::Result<Box<dyn Read + '_>>;
}

impl ArchiveSource for Path {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(self)?))
    }
}

impl ArchiveSource for PathBuf {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        self.as_path().open()
    }
}

impl ArchiveSource for [u8] {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(Cursor::new(self)))
    }
}

impl ArchiveSource for Vec<u8> {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        self.as_slice().open()
    }
}

/// Writes signed CRX3 packages.
#[derive(Debug, Clone, Default)]
pub struct Creator {
    config: CreatorConfig,
}

/// Header bytes produced by the signing pass.
struct SignedHeader {
    crx_id: CrxId,
    header_bytes: Vec<u8>,
}

impl Creator {
    pub fn new(config: CreatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CreatorConfig {
        &self.config
    }

    /// Sign `archive` with `key` and write the package to `output_path`.
    ///
    /// Returns the package identifier.
    pub fn create<A>(
        &self,
        output_path: &Path,
        archive: &A,
        key: &PrivateKey,
    ) -> Result<CrxId, CreateError>
    where
        A: ArchiveSource + ?Sized,
    {
        self.create_file(output_path, archive, key, None)
    }

    /// Like [`create`](Self::create), also embedding `verified_contents`
    /// in the header. An empty blob is omitted.
    pub fn create_with_verified_contents<A>(
        &self,
        output_path: &Path,
        archive: &A,
        key: &PrivateKey,
        verified_contents: &[u8],
    ) -> Result<CrxId, CreateError>
    where
        A: ArchiveSource + ?Sized,
    {
        self.create_file(output_path, archive, key, Some(verified_contents))
    }

    /// Sign `archive` and write the package into `writer`.
    pub fn create_to_writer<W, A>(
        &self,
        writer: &mut W,
        archive: &A,
        key: &PrivateKey,
        verified_contents: Option<&[u8]>,
    ) -> Result<CrxId, CreateError>
    where
        W: Write,
        A: ArchiveSource + ?Sized,
    {
        let signed = self.sign(archive, key, verified_contents).map_err(log_failure)?;
        self.write_package(writer, archive, &signed.header_bytes)
            .map_err(log_failure)?;
        Ok(signed.crx_id)
    }

    fn create_file<A>(
        &self,
        output_path: &Path,
        archive: &A,
        key: &PrivateKey,
        verified_contents: Option<&[u8]>,
    ) -> Result<CrxId, CreateError>
    where
        A: ArchiveSource + ?Sized,
    {
        let signed = self.sign(archive, key, verified_contents).map_err(log_failure)?;

        let file = File::create(output_path)
            .map_err(CreateError::FileNotWritable)
            .map_err(log_failure)?;
        let mut writer = BufWriter::new(file);
        self.write_package(&mut writer, archive, &signed.header_bytes)
            .and_then(|()| writer.flush().map_err(CreateError::FileWriteFailure))
            .map_err(log_failure)?;

        debug!(path = %output_path.display(), crx_id = %signed.crx_id, "package written");
        Ok(signed.crx_id)
    }

    /// First pass: build the signed data, sign context, size, signed data and
    /// the archive, then serialize the header.
    fn sign<A>(
        &self,
        archive: &A,
        key: &PrivateKey,
        verified_contents: Option<&[u8]>,
    ) -> Result<SignedHeader, CreateError>
    where
        A: ArchiveSource + ?Sized,
    {
        if key.algorithm() != ProofAlgorithm::RsaSha256 {
            return Err(CreateError::SigningFailure(format!(
                "packages are signed with RSA keys, got {}",
                key.algorithm()
            )));
        }
        let public_key = key
            .public_key_der()
            .map_err(|e| CreateError::SigningFailure(e.to_string()))?;
        let signed_data = signed_data_for(&public_key);
        let crx_id = CrxId::from_public_key(&public_key);

        let mut signer = ProofSigner::new(key);
        signer.update(&signed_message_prefix(&signed_data));

        let mut reader = archive.open().map_err(CreateError::FileNotReadable)?;
        let mut buf = vec![0u8; self.config.buffer_size.max(1)];
        let mut total = 0u64;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(CreateError::FileNotReadable(e)),
            };
            signer.update(&buf[..n]);
            total += n as u64;
        }
        let signature = signer
            .finalize()
            .map_err(|e| CreateError::SigningFailure(e.to_string()))?;
        debug!(%crx_id, archive_bytes = total, "archive signed");

        let header = CrxFileHeader {
            sha256_with_rsa: vec![AsymmetricKeyProof::new(public_key, signature)],
            sha256_with_ecdsa: Vec::new(),
            verified_contents: verified_contents
                .filter(|contents| !contents.is_empty())
                .map(<[u8]>::to_vec),
            signed_header_data: Some(signed_data),
        };
        Ok(SignedHeader {
            crx_id,
            header_bytes: header.encode_to_bytes(),
        })
    }

    /// Second pass: preamble, header, then the archive again.
    fn write_package<W, A>(
        &self,
        writer: &mut W,
        archive: &A,
        header_bytes: &[u8],
    ) -> Result<(), CreateError>
    where
        W: Write,
        A: ArchiveSource + ?Sized,
    {
        write_preamble(writer, PackageKind::Full, header_bytes)
            .map_err(CreateError::FileWriteFailure)?;
        let mut reader = archive.open().map_err(CreateError::FileWriteFailure)?;
        io::copy(&mut reader, writer).map_err(CreateError::FileWriteFailure)?;
        Ok(())
    }
}

fn log_failure(err: CreateError) -> CreateError {
    warn!(error = %err, "package creation failed");
    err
}
