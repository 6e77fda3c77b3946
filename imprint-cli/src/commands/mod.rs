//! Subcommand implementations.

pub mod classify;
pub mod compare;
pub mod embed;
pub mod extract;
pub mod hash;
pub mod inspect;
