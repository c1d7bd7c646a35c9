// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization
//!
//! Console output always goes to stderr. With the `file-logging` feature each process
//! additionally writes a JSON log file into a shared per-run folder:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       ├── orchestrator.log
//!       ├── agent-0.log
//!       └── observer.log
//! ```
//! The orchestrator creates the folder and exports it through `GRIDLOCK_LOG_RUN_DIR`,
//! which spawned children inherit.

use anyhow::{anyhow, Result};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

/// Environment variable carrying the per-run log folder to child processes
pub const RUN_DIR_ENV: &str = "GRIDLOCK_LOG_RUN_DIR";

/// Logging initialization result; keep it alive for the lifetime of the process
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Per-run log folder, when file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

fn build_filter(default_level: &str, debug_flags: &CrateDebugFlags) -> EnvFilter {
    // RUST_LOG wins over configuration when present
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(debug_flags.to_filter_string(default_level)))
}

/// Initialize logging for one process
///
/// # Arguments
/// * `process_name` - Role of this process, used for log file names (`orchestrator`, `agent-3`, ...)
/// * `default_level` - Filter level for crates without a debug flag
/// * `debug_flags` - Per-crate debug flags
/// * `log_dir` - Base directory for file logs (default: `./logs`, `file-logging` only)
pub fn init_logging(
    process_name: &str,
    default_level: &str,
    debug_flags: &CrateDebugFlags,
    log_dir: Option<PathBuf>,
) -> Result<LoggingGuard> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .with_filter(build_filter(default_level, debug_flags));
    layers.push(console_layer.boxed());

    #[cfg(feature = "file-logging")]
    let (file_guards, run_folder) = {
        let (layer, guard, run_folder) =
            file_layer(process_name, default_level, debug_flags, log_dir)?;
        layers.push(layer);
        (vec![guard], Some(run_folder))
    };
    #[cfg(not(feature = "file-logging"))]
    let run_folder = {
        let _ = (process_name, log_dir);
        None
    };

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        log_dir: run_folder,
    })
}

/// Initialize console-only logging at `info`, honouring debug flags and `RUST_LOG`
pub fn init_logging_default(process_name: &str) -> Result<LoggingGuard> {
    init_logging(process_name, "info", &crate::cli::parse_debug_flags(), None)
}

#[cfg(feature = "file-logging")]
fn file_layer(
    process_name: &str,
    default_level: &str,
    debug_flags: &CrateDebugFlags,
    log_dir: Option<PathBuf>,
) -> Result<(
    Box<dyn Layer<Registry> + Send + Sync>,
    tracing_appender::non_blocking::WorkerGuard,
    PathBuf,
)> {
    use anyhow::Context;

    let run_folder = match std::env::var_os(RUN_DIR_ENV) {
        Some(existing) => PathBuf::from(existing),
        None => {
            let base_log_dir = log_dir.unwrap_or_else(|| PathBuf::from("./logs"));
            let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
            let run_folder = base_log_dir.join(format!("run_{}", timestamp));
            cleanup_old_logs(&base_log_dir, 10)?;
            std::env::set_var(RUN_DIR_ENV, &run_folder);
            run_folder
        }
    };
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

    let file_appender =
        tracing_appender::rolling::never(&run_folder, format!("{}.log", process_name));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(build_filter(default_level, debug_flags))
        .boxed();

    Ok((layer, guard, run_folder))
}

/// Keep only the most recent `retention_runs` run folders
#[cfg(feature = "file-logging")]
fn cleanup_old_logs(base_log_dir: &Path, retention_runs: usize) -> Result<()> {
    if !base_log_dir.exists() {
        return Ok(());
    }

    let mut runs: Vec<PathBuf> = std::fs::read_dir(base_log_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("run_"))
                    .unwrap_or(false)
        })
        .collect();

    // run_YYYYmmdd_HHMMSS sorts chronologically
    runs.sort();

    if runs.len() >= retention_runs {
        let to_remove = runs.len() + 1 - retention_runs;
        for path in runs.iter().take(to_remove) {
            if let Err(e) = std::fs::remove_dir_all(path) {
                eprintln!(
                    "Warning: Failed to remove old log directory {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_flag_directives() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-gridlock-rules".to_string()]);
        // Must not panic on the generated directive string
        let _ = EnvFilter::new(flags.to_filter_string("info"));
    }

    #[test]
    fn test_second_init_reports_error_instead_of_panicking() {
        let flags = CrateDebugFlags::default();
        let first = init_logging("test", "warn", &flags, None);
        let second = init_logging("test", "warn", &flags, None);
        // Whichever test installed the global subscriber first, the second call fails cleanly
        assert!(first.is_ok() || second.is_err());
        assert!(second.is_err());
    }

    #[cfg(feature = "file-logging")]
    #[test]
    fn test_cleanup_keeps_recent_runs() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            std::fs::create_dir(dir.path().join(format!("run_2025010{}_000000", i))).unwrap();
        }
        cleanup_old_logs(dir.path(), 3).unwrap();
        let remaining = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(remaining, 2);
    }
}
