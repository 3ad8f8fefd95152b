//! crxtool - create and verify CRX3 packages

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crxkit_cli::cmd;
use crxkit_cli::cmd::verify::{Output, VerifyOptions};
use crxkit_cli::{Cli, Commands};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --verbose turns on debug events.
    let default_filter = if cli.command.verbose() { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut stdout = io::stdout().lock();
    match cli.command {
        Commands::Create {
            source,
            output,
            private_key,
            verified_contents,
            verbose,
        } => {
            cmd::create::create(
                &source,
                output.as_deref(),
                private_key.as_deref(),
                verified_contents.as_deref(),
                verbose,
                &mut stdout,
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Verify {
            crx,
            format,
            required_key_hashes,
            required_file_hash,
            public_key_out,
            verified_contents_out,
            json,
            quiet,
        } => {
            let options = VerifyOptions {
                format,
                required_key_hashes: required_key_hashes.into_iter().map(|h| h.0).collect(),
                required_file_hash: required_file_hash.map(|h| h.0),
                public_key_out,
                verified_contents_out,
                output: match (json, quiet) {
                    (true, _) => Output::Json,
                    (false, true) => Output::Quiet,
                    (false, false) => Output::Text,
                },
            };
            let result = cmd::verify::verify(&crx, &options, &mut stdout)?;
            Ok(if result.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
