// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, GridlockConfig, CONFIG_FILE_NAME};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Find the gridlock configuration file
///
/// Search order:
/// 1. `GRIDLOCK_CONFIG_PATH` environment variable
/// 2. Current working directory: `./gridlock.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("GRIDLOCK_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by GRIDLOCK_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for and
///   built-in defaults are used when none exists.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if an explicitly given config file is missing, or the file contains
/// invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<GridlockConfig> {
    let config_file = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => match find_config_file() {
            Ok(path) => Some(path),
            // An explicitly configured path that is missing is an error; a missing
            // default file is not.
            Err(err) if env::var_os("GRIDLOCK_CONFIG_PATH").is_some() => return Err(err),
            Err(_) => None,
        },
    };

    let mut config = match config_file {
        Some(path) => {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        }
        None => GridlockConfig::default(),
    };

    apply_environment_overrides(&mut config)?;

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(format!("{} = {:?}", key, value)))
}

fn parse_flag(value: &str) -> bool {
    let value = value.to_lowercase();
    value == "true" || value == "1" || value == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `GRIDLOCK_WIDTH` -> `board.width`
/// - `GRIDLOCK_HEIGHT` -> `board.height`
/// - `GRIDLOCK_SEED` -> `board.seed`
/// - `GRIDLOCK_DELAY_MS` -> `schedule.delay_ms`
/// - `GRIDLOCK_TIMEOUT_SECS` -> `schedule.timeout_secs`
/// - `GRIDLOCK_SHM_DIR` -> `shm.dir`
/// - `GRIDLOCK_SHM_RECLAIM` -> `shm.reclaim_stale`
/// - `GRIDLOCK_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut GridlockConfig) -> ConfigResult<()> {
    if let Ok(value) = env::var("GRIDLOCK_WIDTH") {
        config.board.width = parse_value("GRIDLOCK_WIDTH", &value)?;
    }
    if let Ok(value) = env::var("GRIDLOCK_HEIGHT") {
        config.board.height = parse_value("GRIDLOCK_HEIGHT", &value)?;
    }
    if let Ok(value) = env::var("GRIDLOCK_SEED") {
        config.board.seed = Some(parse_value("GRIDLOCK_SEED", &value)?);
    }
    if let Ok(value) = env::var("GRIDLOCK_DELAY_MS") {
        config.schedule.delay_ms = parse_value("GRIDLOCK_DELAY_MS", &value)?;
    }
    if let Ok(value) = env::var("GRIDLOCK_TIMEOUT_SECS") {
        config.schedule.timeout_secs = parse_value("GRIDLOCK_TIMEOUT_SECS", &value)?;
    }
    if let Ok(value) = env::var("GRIDLOCK_SHM_DIR") {
        config.shm.dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("GRIDLOCK_SHM_RECLAIM") {
        config.shm.reclaim_stale = parse_flag(&value);
    }
    if let Ok(value) = env::var("GRIDLOCK_LOG_LEVEL") {
        config.logging.level = value;
    }
    Ok(())
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Map of CLI arguments (e.g., `{"width": "20", "timeout_secs": "5"}`).
///   `agents` is a comma-separated list of executables.
pub fn apply_cli_overrides(
    config: &mut GridlockConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    if let Some(value) = cli_args.get("width") {
        config.board.width = parse_value("width", value)?;
    }
    if let Some(value) = cli_args.get("height") {
        config.board.height = parse_value("height", value)?;
    }
    if let Some(value) = cli_args.get("seed") {
        config.board.seed = Some(parse_value("seed", value)?);
    }
    if let Some(value) = cli_args.get("delay_ms") {
        config.schedule.delay_ms = parse_value("delay_ms", value)?;
    }
    if let Some(value) = cli_args.get("timeout_secs") {
        config.schedule.timeout_secs = parse_value("timeout_secs", value)?;
    }
    if let Some(value) = cli_args.get("poll_interval_ms") {
        config.schedule.poll_interval_ms = parse_value("poll_interval_ms", value)?;
    }
    if let Some(value) = cli_args.get("shm_dir") {
        config.shm.dir = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("reclaim_stale") {
        config.shm.reclaim_stale = parse_flag(value);
    }
    if let Some(value) = cli_args.get("observer") {
        config.processes.observer = Some(PathBuf::from(value));
    }
    if let Some(value) = cli_args.get("agents") {
        config.processes.agents = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("report_json") {
        config.report.json_path = Some(PathBuf::from(value));
    }
    Ok(())
}
