//! crxtool - create and verify CRX3 packages.
//!
//! # Overview
//!
//! `crxtool create` packages a directory or zip archive into a signed CRX3
//! file, generating a developer key when none is given. `crxtool verify`
//! checks a package against a verification policy and prints its
//! identifier and developer key.

pub mod cmd;
pub mod pack;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use crxkit::VerifierFormat;

#[derive(Debug, Parser)]
#[command(name = "crxtool")]
#[command(author, version, about = "Create and verify CRX3 packages")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Package a directory or zip archive into a CRX3 file
    Create {
        /// Directory or zip archive to package
        source: PathBuf,
        /// Output file (defaults to <source>.crx)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// PKCS#8 PEM encoded RSA private key
        #[arg(long, visible_alias = "pk", env = "CRXTOOL_PRIVATE_KEY")]
        private_key: Option<PathBuf>,
        /// Verified contents blob to embed in the header
        #[arg(long)]
        verified_contents: Option<PathBuf>,
        /// Re-verify the result and print its identifier and key
        #[arg(short, long)]
        verbose: bool,
    },
    /// Verify the integrity of a CRX3 file
    Verify {
        /// Path to the CRX file
        crx: PathBuf,
        /// Verification mode: crx3, crx3-with-test-proof (crx3-test) or
        /// crx3-with-proof (crx3-prod)
        #[arg(long, default_value_t = VerifierFormat::Crx3)]
        format: VerifierFormat,
        /// Require a proof from the key with this SHA-256 (hex); repeatable
        #[arg(long = "required-key-hash", value_name = "HEX")]
        required_key_hashes: Vec<HexBytes>,
        /// Require the SHA-256 of the whole file to match (hex)
        #[arg(long, value_name = "HEX")]
        required_file_hash: Option<HexBytes>,
        /// Write the developer public key (base64) to this file
        #[arg(long)]
        public_key_out: Option<PathBuf>,
        /// Write the verified contents blob to this file
        #[arg(long)]
        verified_contents_out: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long, conflicts_with = "quiet")]
        json: bool,
        /// Suppress informational output
        #[arg(short, long)]
        quiet: bool,
    },
}

impl Commands {
    /// Whether the user asked for extra output.
    pub fn verbose(&self) -> bool {
        matches!(self, Self::Create { verbose: true, .. })
    }
}

/// Bytes given on the command line as hex, either case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl FromStr for HexBytes {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s)
            .map(Self)
            .map_err(|e| format!("invalid hex: {}", e))
    }
}

impl fmt::Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}
