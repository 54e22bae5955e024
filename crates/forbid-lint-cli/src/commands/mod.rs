//! Subcommand implementations.

pub mod check;
pub mod init;
pub mod list_patterns;
pub mod output;
