//! CLI command implementations

pub mod backup;
pub mod logs;
pub mod state;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use lifeos_core::services::{EntryPoint, LogEvent, LoggingService};
use lifeos_core::LifeOsContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let lifeos_dir = get_lifeos_dir();
    // Ensure directory exists
    std::fs::create_dir_all(&lifeos_dir).ok()?;
    LoggingService::new(&lifeos_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the lifeos directory from environment or default
pub fn get_lifeos_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LIFEOS_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".lifeos"))
        .unwrap_or_else(|| PathBuf::from(".lifeos"))
}

/// Get or create lifeos context
pub fn get_context() -> Result<LifeOsContext> {
    let lifeos_dir = get_lifeos_dir();
    LifeOsContext::new(&lifeos_dir)
        .with_context(|| format!("Failed to open LifeOS data in {}", lifeos_dir.display()))
}
