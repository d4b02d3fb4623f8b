//! CLI subcommands.

pub mod builds;
pub mod cache;
pub mod common;
pub mod create;
pub mod servers;
