//! Tooling & Integration Layer
//!
//! Command-line front-end over the tree cache.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
