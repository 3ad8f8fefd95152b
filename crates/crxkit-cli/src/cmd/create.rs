//! `crxtool create`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use crxkit::{Creator, VerifierResult, Verifier};
use crxkit_keys::{KeyStore, KeyStoreExt, PemFile};
use tracing::debug;

use crate::pack::pack_directory;

/// Package `source` (a directory or a zip archive) into a CRX3 file.
///
/// Without `private_key`, the key at `<output stem>.pem` is used, generated
/// there first if it does not exist. Returns the output path.
pub fn create(
    source: &Path,
    output: Option<&Path>,
    private_key: Option<&Path>,
    verified_contents: Option<&Path>,
    verbose: bool,
    out: &mut dyn Write,
) -> Result<PathBuf> {
    if !source.exists() {
        bail!("Source path does not exist: {}", source.display());
    }
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(source));

    let (store, key, generated) = match private_key {
        Some(path) => {
            let store = PemFile::new(path);
            let key = store
                .read_private_key()
                .with_context(|| format!("Failed to read private key {}", path.display()))?;
            (store, key, false)
        }
        None => {
            let store = PemFile::new(default_key_path(&output));
            let (key, generated) = store
                .read_or_generate()
                .with_context(|| {
                    format!("Failed to prepare private key {}", store.path().display())
                })?;
            (store, key, generated)
        }
    };

    let verified_contents = verified_contents
        .map(|path| {
            fs::read(path).with_context(|| {
                format!("Failed to read verified contents file {}", path.display())
            })
        })
        .transpose()?;

    let packed = if source.is_dir() {
        Some(pack_directory(source)?)
    } else {
        None
    };
    let archive = packed.as_ref().map_or(source, |temp| temp.path());

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let creator = Creator::default();
    let crx_id = match &verified_contents {
        Some(contents) => creator.create_with_verified_contents(&output, archive, &key, contents),
        None => creator.create(&output, archive, &key),
    }
    .context("Failed to create CRX")?;
    debug!(%crx_id, output = %output.display(), "created");

    writeln!(out, "OK")?;
    writeln!(out, "CRX file written to: {}", output.display())?;
    writeln!(out, "Private key used: {}", store.path().display())?;
    if generated {
        writeln!(out, "A new private key was generated.")?;
    }

    if verbose {
        match Verifier::default().verify_path(&output) {
            Ok(verified) => {
                writeln!(out, "CRX ID: {}", verified.crx_id)?;
                writeln!(out, "Public key (base64): {}", verified.public_key)?;
            }
            Err(e) => writeln!(
                out,
                "Warning: immediate verification failed with status {}",
                VerifierResult::from(&e)
            )?,
        }
    }
    Ok(output)
}

/// `<source>.crx` next to the source, with a trailing `.zip` dropped.
pub fn default_output_path(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".zip").unwrap_or(&name);
    source.with_file_name(format!("{}.crx", stem))
}

/// `<output stem>.pem` next to the output.
pub fn default_key_path(output: &Path) -> PathBuf {
    output.with_extension("pem")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crxkit::{CrxId, PrivateKey};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn write_key(dir: &Path) -> (PathBuf, PrivateKey) {
        let key = PrivateKey::generate_rsa_with_rng(&mut StdRng::seed_from_u64(21), 1024).unwrap();
        let path = dir.join("dev.pem");
        PemFile::new(&path).write_private_key(&key).unwrap();
        (path, key)
    }

    #[test]
    fn test_default_paths() {
        assert_eq!(default_output_path(Path::new("a/ext.zip")), PathBuf::from("a/ext.crx"));
        assert_eq!(default_output_path(Path::new("a/ext")), PathBuf::from("a/ext.crx"));
        assert_eq!(default_key_path(Path::new("a/ext.crx")), PathBuf::from("a/ext.pem"));
        assert_eq!(default_key_path(Path::new("a/ext")), PathBuf::from("a/ext.pem"));
    }

    #[test]
    fn test_create_from_directory() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("ext");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("manifest.json"), b"{}").unwrap();
        let (key_path, key) = write_key(dir.path());

        let mut out = Vec::new();
        let output = create(&source, None, Some(key_path.as_path()), None, true, &mut out).unwrap();
        assert_eq!(output, dir.path().join("ext.crx"));

        let text = String::from_utf8(out).unwrap();
        let expected_id = CrxId::from_public_key(&key.public_key_der().unwrap());
        assert!(text.starts_with("OK\n"));
        assert!(text.contains(&format!("CRX ID: {}", expected_id)));
        assert!(!text.contains("A new private key was generated."));

        let verified = Verifier::default().verify_path(&output).unwrap();
        assert_eq!(verified.crx_id, expected_id);
    }

    #[test]
    fn test_create_with_verified_contents_and_nested_output() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("ext.zip");
        fs::write(&archive, b"PK\x05\x06 not really a zip").unwrap();
        let contents = dir.path().join("vc.bin");
        fs::write(&contents, b"verified").unwrap();
        let (key_path, _) = write_key(dir.path());
        let output = dir.path().join("out/nested/ext.crx");

        let mut out = Vec::new();
        create(
            &archive,
            Some(output.as_path()),
            Some(key_path.as_path()),
            Some(contents.as_path()),
            false,
            &mut out,
        )
        .unwrap();

        let verified = Verifier::default().verify_path(&output).unwrap();
        assert_eq!(verified.verified_contents.as_deref(), Some(&b"verified"[..]));
    }

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let mut out = Vec::new();
        let result = create(&dir.path().join("nope"), None, None, None, false, &mut out);
        assert!(result.is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_reuses_existing_default_key() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("ext.zip");
        fs::write(&archive, b"zip").unwrap();
        let key = PrivateKey::generate_rsa_with_rng(&mut StdRng::seed_from_u64(22), 1024).unwrap();
        PemFile::new(dir.path().join("ext.pem")).write_private_key(&key).unwrap();

        let mut out = Vec::new();
        let output = create(&archive, None, None, None, false, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("A new private key was generated."));

        let verified = Verifier::default().verify_path(&output).unwrap();
        assert_eq!(verified.public_key_der, key.public_key_der().unwrap());
    }
}
