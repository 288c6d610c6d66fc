//! CLI commands.

pub mod env;
pub mod paths;
pub mod start;
