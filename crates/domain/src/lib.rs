//! Shared types for the tunnelgate worker crates: the common error type,
//! structured trace events, TOML configuration, and logging setup.

pub mod config;
pub mod error;
pub mod logging;
pub mod trace;

pub use error::{Error, Result};
