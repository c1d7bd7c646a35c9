// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `gridlock.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GridlockConfig {
    pub board: BoardConfig,
    pub schedule: ScheduleConfig,
    pub shm: ShmConfig,
    pub processes: ProcessesConfig,
    pub logging: LoggingConfig,
    pub report: ReportConfig,
}

/// Board extents and reward generation
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardConfig {
    pub width: u16,
    pub height: u16,
    /// RNG seed for reward generation. `None` = seeded from the wall clock at startup.
    pub seed: Option<u64>,
    pub min_reward: i32,
    pub max_reward: i32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            seed: None,
            min_reward: 1,
            max_reward: 9,
        }
    }
}

/// Scheduling loop timing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Pause after each rendered frame (only applied when an observer is attached)
    pub delay_ms: u64,
    /// Game ends when no valid move happened for this long
    pub timeout_secs: u64,
    /// Upper bound of a single multiplexed channel wait
    pub poll_interval_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            delay_ms: 200,
            timeout_secs: 10,
            poll_interval_ms: 100,
        }
    }
}

impl ScheduleConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Shared memory segment placement
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShmConfig {
    pub dir: PathBuf,
    pub state_name: String,
    pub sync_name: String,
    /// Unlink segments left behind by a crashed run instead of refusing to start
    pub reclaim_stale: bool,
}

impl Default for ShmConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/dev/shm"),
            state_name: "game_state".to_string(),
            sync_name: "game_sync".to_string(),
            reclaim_stale: false,
        }
    }
}

impl ShmConfig {
    pub fn state_path(&self) -> PathBuf {
        self.dir.join(&self.state_name)
    }

    pub fn sync_path(&self) -> PathBuf {
        self.dir.join(&self.sync_name)
    }
}

/// Child process executables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessesConfig {
    /// One executable per agent slot, in slot order
    pub agents: Vec<PathBuf>,
    /// Optional observer executable
    pub observer: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level (trace, debug, info, warn, error)
    pub level: String,
    /// Base directory for file logs (only used with the `file-logging` feature)
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

/// Final report output
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Write the final report as JSON to this path
    pub json_path: Option<PathBuf>,
}
