//! lookout-utils: Common utilities shared across lookout crates
//!
//! This crate provides:
//! - Unified error types ([`LookoutError`], [`Result`])
//! - Logging infrastructure ([`init_logging`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

pub use error::{LookoutError, Result};
pub use logging::{init_logging, LogConfig, LogOutput};
pub use paths::{config_dir, config_file, log_dir, state_dir};
