//! Logging setup for ETL runs.
//!
//! Console output for whoever launched the job, plus two daily-rotating files
//! that survive it:
//!
//! - `playlake.<date>.log`: everything allowed by the env filter
//! - `error.<date>.log`: warnings and errors only, e.g. malformed source lines
//!
//! ```no_run
//! playlake::logging::init(None).expect("Failed to initialize logging");
//! tracing::info!("Run started");
//! ```

use crate::error::{EtlError, Result, ResultExt as _};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

const LOG_FILES_KEPT: usize = 10;

/// Gets the default log directory, `<platform data dir>/playlake/logs`.
///
/// - Windows: `%APPDATA%/playlake/logs`
/// - macOS: `~/Library/Application Support/playlake/logs`
/// - Linux: `~/.local/share/playlake/logs`
pub fn default_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir()
        .ok_or_else(|| EtlError::Config("Failed to determine data directory".to_owned()))?;
    Ok(base_dir.join("playlake").join("logs"))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    }
    Ok(())
}

fn rolling_appender(dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(LOG_FILES_KEPT)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(dir)
        .map_err(|e| EtlError::Config(format!("Failed to create {prefix} log appender: {e}")))
}

/// Initializes console and file logging.
///
/// `log_dir` overrides [`default_log_dir`]. The filter defaults to `info` and
/// honours `RUST_LOG`. Must be called at most once per process.
pub fn init(log_dir: Option<PathBuf>) -> Result<PathBuf> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };
    ensure_dir(&log_dir)?;

    let all_logs_appender = rolling_appender(&log_dir, "playlake")?;
    let error_logs_appender = rolling_appender(&log_dir, "error")?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| EtlError::Config(format!("Failed to create env filter: {e}")))?;

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(false);

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
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
        .with(stdout_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .try_init()
        .map_err(|e| EtlError::Config(format!("Logging already initialized: {e}")))?;

    tracing::info!("Logging initialized, log directory: {}", log_dir.display());

    Ok(log_dir)
}
