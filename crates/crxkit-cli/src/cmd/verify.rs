//! `crxtool verify`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use crxkit::{Verified, VerifierFormat, VerifierPolicy, VerifierResult, Verifier};
use serde::Serialize;

/// How the report is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Output {
    #[default]
    Text,
    Json,
    Quiet,
}

#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    pub format: VerifierFormat,
    pub required_key_hashes: Vec<Vec<u8>>,
    pub required_file_hash: Option<Vec<u8>>,
    pub public_key_out: Option<PathBuf>,
    pub verified_contents_out: Option<PathBuf>,
    pub output: Output,
}

impl VerifyOptions {
    fn policy(&self) -> VerifierPolicy {
        let policy = self
            .required_key_hashes
            .iter()
            .fold(VerifierPolicy::new().with_format(self.format), |policy, hash| {
                policy.require_key_hash(hash.as_slice())
            });
        match &self.required_file_hash {
            Some(hash) => policy.require_file_hash(hash.as_slice()),
            None => policy,
        }
    }
}

/// Machine-readable verification report.
#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crx_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_contents_bytes: Option<usize>,
}

impl VerifyReport {
    fn new(result: VerifierResult, verified: Option<&Verified>) -> Self {
        Self {
            result: result.name(),
            crx_id: verified.map(|v| v.crx_id.to_string()),
            public_key: verified.map(|v| v.public_key.clone()),
            delta: verified.map(Verified::is_delta),
            verified_contents_bytes: verified
                .and_then(|v| v.verified_contents.as_ref().map(Vec::len)),
        }
    }
}

/// Verify the package at `crx` and print a report.
///
/// A failed verification is not an `Err`: its code is printed (to stderr in
/// text mode) and returned. `Err` is reserved for usage and output problems.
pub fn verify(crx: &Path, options: &VerifyOptions, out: &mut dyn Write) -> Result<VerifierResult> {
    if !crx.exists() {
        bail!("CRX file does not exist: {}", crx.display());
    }

    let outcome = Verifier::new(options.policy()).verify_path(crx);
    let result = VerifierResult::from(&outcome);
    let verified = match outcome {
        Ok(verified) => verified,
        Err(_) => {
            match options.output {
                Output::Json => print_json(out, &VerifyReport::new(result, None))?,
                _ => eprintln!("{}", result),
            }
            return Ok(result);
        }
    };

    match options.output {
        Output::Text => {
            writeln!(out, "{}", result)?;
            writeln!(out, "CRX ID: {}", verified.crx_id)?;
            writeln!(out, "Public key (base64): {}", verified.public_key)?;
            writeln!(out, "Delta update: {}", verified.is_delta())?;
            if let Some(contents) = &verified.verified_contents {
                writeln!(out, "Verified contents bytes: {}", contents.len())?;
            }
        }
        Output::Json => print_json(out, &VerifyReport::new(result, Some(&verified)))?,
        Output::Quiet => {}
    }

    if let Some(path) = &options.public_key_out {
        write_creating_parents(path, verified.public_key.as_bytes())?;
    }
    if let Some(path) = &options.verified_contents_out {
        match &verified.verified_contents {
            Some(contents) => write_creating_parents(path, contents)?,
            None => eprintln!("No verified contents were present in the CRX header"),
        }
    }
    Ok(result)
}

fn print_json(out: &mut dyn Write, report: &VerifyReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

fn write_creating_parents(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crxkit::{Creator, PrivateKey};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn package(dir: &Path, verified_contents: &[u8]) -> (PathBuf, PrivateKey) {
        let key = PrivateKey::generate_rsa_with_rng(&mut StdRng::seed_from_u64(31), 1024).unwrap();
        let output = dir.join("ext.crx");
        Creator::default()
            .create_with_verified_contents(&output, &b"payload".to_vec(), &key, verified_contents)
            .unwrap();
        (output, key)
    }

    #[test]
    fn test_text_report_and_outputs() {
        let dir = TempDir::new().unwrap();
        let (crx, key) = package(dir.path(), b"vc");
        let options = VerifyOptions {
            public_key_out: Some(dir.path().join("out/key.b64")),
            verified_contents_out: Some(dir.path().join("out/vc.bin")),
            ..Default::default()
        };

        let mut out = Vec::new();
        assert_eq!(verify(&crx, &options, &mut out).unwrap(), VerifierResult::OkFull);

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("OK_FULL\n"));
        assert!(text.contains("Delta update: false"));
        assert!(text.contains("Verified contents bytes: 2"));

        assert_eq!(fs::read(dir.path().join("out/vc.bin")).unwrap(), b"vc");
        let written = fs::read_to_string(dir.path().join("out/key.b64")).unwrap();
        let verified = Verifier::default().verify_path(&crx).unwrap();
        assert_eq!(written, verified.public_key);
        assert_eq!(verified.public_key_der, key.public_key_der().unwrap());
    }

    #[test]
    fn test_json_report() {
        let dir = TempDir::new().unwrap();
        let (crx, _) = package(dir.path(), b"");
        let options = VerifyOptions {
            output: Output::Json,
            ..Default::default()
        };

        let mut out = Vec::new();
        verify(&crx, &options, &mut out).unwrap();
        let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(report["result"], "OK_FULL");
        assert_eq!(report["delta"], false);
        assert!(report.get("verified_contents_bytes").is_none());
        assert_eq!(report["crx_id"].as_str().unwrap().len(), 32);
    }

    #[test]
    fn test_failure_is_a_result_code() {
        let dir = TempDir::new().unwrap();
        let (crx, _) = package(dir.path(), b"");
        let options = VerifyOptions {
            required_key_hashes: vec![vec![0u8; 32]],
            output: Output::Json,
            ..Default::default()
        };

        let mut out = Vec::new();
        let result = verify(&crx, &options, &mut out).unwrap();
        assert_eq!(result, VerifierResult::ErrorRequiredProofMissing);
        let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(report["result"], "ERROR_REQUIRED_PROOF_MISSING");
        assert!(report.get("crx_id").is_none());
    }

    #[test]
    fn test_quiet_prints_nothing() {
        let dir = TempDir::new().unwrap();
        let (crx, _) = package(dir.path(), b"");
        let options = VerifyOptions {
            output: Output::Quiet,
            ..Default::default()
        };
        let mut out = Vec::new();
        assert!(verify(&crx, &options, &mut out).unwrap().is_ok());
        assert!(out.is_empty());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut out = Vec::new();
        assert!(verify(&dir.path().join("nope.crx"), &VerifyOptions::default(), &mut out).is_err());
    }
}
