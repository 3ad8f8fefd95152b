//! Error types for package creation and verification.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::verifier::Verified;

/// Errors raised while creating a package.
#[derive(Debug, Error)]
pub enum CreateError {
    /// The key cannot sign packages, or the provider failed.
    #[error("signing failure: {0}")]
    SigningFailure(String),

    /// The archive could not be opened or read during the signing pass.
    #[error("archive not readable: {0}")]
    FileNotReadable(#[source] io::Error),

    /// The output could not be opened.
    #[error("output not writable: {0}")]
    FileNotWritable(#[source] io::Error),

    /// Writing the output failed part way. The partial file is left behind.
    #[error("failed writing output: {0}")]
    FileWriteFailure(#[source] io::Error),
}

/// Errors raised while verifying a package.
///
/// Exactly one is reported per verification: the first check that fails.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("package not readable: {0}")]
    FileNotReadable(#[source] io::Error),

    /// Any structural problem with the preamble or header.
    #[error("header invalid")]
    HeaderInvalid,

    /// A proof's public key could not be parsed for its algorithm.
    #[error("signature initialization failed")]
    SignatureInitializationFailed,

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// Developer key, a required key, or the publisher key is missing.
    #[error("required proof missing")]
    RequiredProofMissing,

    /// The expected file hash is not 32 bytes.
    #[error("expected hash invalid")]
    ExpectedHashInvalid,

    #[error("file hash mismatch")]
    FileHashFailed,
}

/// Flat result code covering both outcomes of a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifierResult {
    OkFull,
    OkDelta,
    ErrorFileNotReadable,
    ErrorHeaderInvalid,
    ErrorSignatureInitializationFailed,
    ErrorSignatureVerificationFailed,
    ErrorRequiredProofMissing,
    ErrorExpectedHashInvalid,
    ErrorFileHashFailed,
}

impl VerifierResult {
    /// Whether this is one of the success codes.
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::OkFull | Self::OkDelta)
    }

    /// Stable upper-case name, as printed by the command line tool.
    pub const fn name(self) -> &'static str {
        match self {
            Self::OkFull => "OK_FULL",
            Self::OkDelta => "OK_DELTA",
            Self::ErrorFileNotReadable => "ERROR_FILE_NOT_READABLE",
            Self::ErrorHeaderInvalid => "ERROR_HEADER_INVALID",
            Self::ErrorSignatureInitializationFailed => "ERROR_SIGNATURE_INITIALIZATION_FAILED",
            Self::ErrorSignatureVerificationFailed => "ERROR_SIGNATURE_VERIFICATION_FAILED",
            Self::ErrorRequiredProofMissing => "ERROR_REQUIRED_PROOF_MISSING",
            Self::ErrorExpectedHashInvalid => "ERROR_EXPECTED_HASH_INVALID",
            Self::ErrorFileHashFailed => "ERROR_FILE_HASH_FAILED",
        }
    }
}

impl fmt::Display for VerifierResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&VerifyError> for VerifierResult {
    fn from(err: &VerifyError) -> Self {
        match err {
            VerifyError::FileNotReadable(_) => Self::ErrorFileNotReadable,
            VerifyError::HeaderInvalid => Self::ErrorHeaderInvalid,
            VerifyError::SignatureInitializationFailed => Self::ErrorSignatureInitializationFailed,
            VerifyError::SignatureVerificationFailed => Self::ErrorSignatureVerificationFailed,
            VerifyError::RequiredProofMissing => Self::ErrorRequiredProofMissing,
            VerifyError::ExpectedHashInvalid => Self::ErrorExpectedHashInvalid,
            VerifyError::FileHashFailed => Self::ErrorFileHashFailed,
        }
    }
}

impl From<&Result<Verified, VerifyError>> for VerifierResult {
    fn from(result: &Result<Verified, VerifyError>) -> Self {
        match result {
            Ok(verified) => verified.result(),
            Err(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let cases = [
            (VerifyError::HeaderInvalid, VerifierResult::ErrorHeaderInvalid),
            (
                VerifyError::SignatureInitializationFailed,
                VerifierResult::ErrorSignatureInitializationFailed,
            ),
            (
                VerifyError::SignatureVerificationFailed,
                VerifierResult::ErrorSignatureVerificationFailed,
            ),
            (VerifyError::RequiredProofMissing, VerifierResult::ErrorRequiredProofMissing),
            (VerifyError::ExpectedHashInvalid, VerifierResult::ErrorExpectedHashInvalid),
            (VerifyError::FileHashFailed, VerifierResult::ErrorFileHashFailed),
            (
                VerifyError::FileNotReadable(io::Error::new(io::ErrorKind::Other, "gone")),
                VerifierResult::ErrorFileNotReadable,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(VerifierResult::from(&err), code);
            assert!(!code.is_ok());
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(VerifierResult::OkFull.to_string(), "OK_FULL");
        assert_eq!(VerifierResult::OkDelta.name(), "OK_DELTA");
        assert_eq!(
            VerifierResult::ErrorRequiredProofMissing.to_string(),
            "ERROR_REQUIRED_PROOF_MISSING"
        );
        assert!(VerifierResult::OkDelta.is_ok());
    }
}
