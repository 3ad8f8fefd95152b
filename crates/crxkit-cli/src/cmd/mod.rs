//! Subcommand implementations. Each writes its report to the given writer.

pub mod create;
pub mod verify;
