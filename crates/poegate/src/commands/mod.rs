//! Subcommand handlers.

pub mod check;
pub mod init;
pub mod serve;
