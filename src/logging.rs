//! Console and rolling-file logging for the `sluice` binary.
//!
//! Two files rotate daily under the platform data directory:
//!
//! - `sluice.<date>.log`: everything passing the `RUST_LOG` filter
//! - `error.<date>.log`: warnings and errors only, so a rolled-back load is
//!   easy to find
//!
//! ```no_run
//! sluice::logging::init().expect("Failed to initialize logging");
//! tracing::info!("Ready");
//! ```

use crate::error::{Result, SluiceError};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Files kept per appender before the oldest is deleted.
const MAX_LOG_FILES: usize = 10;

/// `<data dir>/sluice/logs`, created if missing.
///
/// # Errors
///
/// Returns [`SluiceError::Config`] when the platform has no data directory,
/// or an I/O error if the directory cannot be created.
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir()
        .ok_or_else(|| SluiceError::Config("Failed to determine data directory".to_owned()))?;
    let log_dir = base_dir.join("sluice").join("logs");

    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)?;
    }
    Ok(log_dir)
}

fn appender(log_dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|e| SluiceError::Config(format!("Failed to create {prefix} log appender: {e}")))
}

/// Installs the global subscriber. Call once, before any work starts.
///
/// # Errors
///
/// Returns an error if the log directory or an appender cannot be created.
pub fn init() -> Result<()> {
    let log_dir = get_log_dir()?;
    let all_logs_appender = appender(&log_dir, "sluice")?;
    let error_logs_appender = appender(&log_dir, "error")?;

    // default to INFO, override with RUST_LOG
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| SluiceError::Config(format!("Invalid log filter: {e}")))?;

    // stderr keeps stdout clean for `analyze` JSON
    let console_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(all_logs_appender);

    let error_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(error_logs_appender)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .init();

    tracing::debug!("Logging initialized, log directory: {}", log_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_dir() {
        let log_dir = get_log_dir().expect("Failed to get log dir");
        assert!(log_dir.ends_with("sluice/logs") || log_dir.ends_with("sluice\\logs"));
    }
}
