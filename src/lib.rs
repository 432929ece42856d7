// clawtop library - public API

// Re-export error types
pub mod error;
pub use error::{DashError, Result};

// Module declarations
pub mod core;
pub mod platform;
pub mod ui;

// Re-export commonly used types
pub use core::config::DashboardConfig;

use std::fs::OpenOptions;
use std::path::PathBuf;

/// Where log records go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Append to a file; used while the TUI owns the terminal.
    File(PathBuf),
    Disabled,
}

// Initialize logging
//
// Defaults to `info` (`debug` when verbose); `RUST_LOG` still takes precedence.
pub fn init_logging(target: LogTarget, verbose: bool) -> Result<()> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();

    match target {
        LogTarget::Disabled => return Ok(()),
        LogTarget::Stderr => {
            builder.target(env_logger::Target::Stderr);
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
    }

    builder
        .try_init()
        .map_err(|e| DashError::other(format!("Failed to initialize logging: {}", e)))
}
