//! withnest core
//!
//! Configuration and error types shared by the rewriter and the CLI.
//! Never rename error codes - they are part of the public API.

pub mod config;
pub mod error;

pub use config::{Config, ConfigError, DEFAULT_MAX_CROSS_JOIN_PASSES, DEFAULT_OUTPUT_SUFFIX};
pub use error::NestError;
