//! Subcommand implementations.

pub mod bits;
pub mod embed;
pub mod extract;
pub mod verify;
