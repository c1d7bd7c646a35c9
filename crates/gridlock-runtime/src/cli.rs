// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Command-line arguments of the three binaries

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use gridlock_config::{
    apply_cli_overrides, load_config, validate_config, ConfigResult, GridlockConfig,
};

use crate::spawn::{ENV_STATE_PATH, ENV_SYNC_PATH};

/// Drop `--debug-*` flags; they are read separately by the logging setup
pub fn without_debug_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .filter(|arg| {
            !arg.to_str()
                .map(|s| s.starts_with("--debug-"))
                .unwrap_or(false)
        })
        .collect()
}

/// gridlock orchestrator: runs one game between agent processes
#[derive(Parser, Debug)]
#[command(name = "gridlock", version, disable_help_flag = true, long_about = None)]
pub struct OrchestratorArgs {
    /// Board width
    #[arg(short = 'w', long)]
    pub width: Option<u16>,

    /// Board height
    #[arg(short = 'h', long)]
    pub height: Option<u16>,

    /// Pause after each rendered frame, in milliseconds
    #[arg(short = 'd', long = "delay")]
    pub delay_ms: Option<u64>,

    /// End the game after this many seconds without a valid move
    #[arg(short = 't', long = "timeout")]
    pub timeout_secs: Option<u64>,

    /// Seed for reward generation
    #[arg(short = 's', long)]
    pub seed: Option<u64>,

    /// Observer executable
    #[arg(short = 'v', long = "view")]
    pub view: Option<PathBuf>,

    /// Agent executables, one per slot (1 to 9)
    #[arg(short = 'p', long = "players", num_args = 1..=9)]
    pub players: Vec<PathBuf>,

    /// Configuration file (default: gridlock.toml discovery)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Write the final report as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Directory holding the shared memory segments
    #[arg(long)]
    pub shm_dir: Option<PathBuf>,

    /// Remove segments left over by a crashed run
    #[arg(long)]
    pub reclaim_stale: bool,

    /// Upper bound of one channel wait, in milliseconds
    #[arg(long = "poll-interval")]
    pub poll_interval_ms: Option<u64>,

    /// Default log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl OrchestratorArgs {
    /// Key/value overrides understood by `gridlock_config::apply_cli_overrides`
    pub fn overrides(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        };
        put("width", self.width.map(|v| v.to_string()));
        put("height", self.height.map(|v| v.to_string()));
        put("delay_ms", self.delay_ms.map(|v| v.to_string()));
        put("timeout_secs", self.timeout_secs.map(|v| v.to_string()));
        put("seed", self.seed.map(|v| v.to_string()));
        put("poll_interval_ms", self.poll_interval_ms.map(|v| v.to_string()));
        put("observer", self.view.as_ref().map(|p| p.display().to_string()));
        put("shm_dir", self.shm_dir.as_ref().map(|p| p.display().to_string()));
        put(
            "report_json",
            self.report_json.as_ref().map(|p| p.display().to_string()),
        );
        put("log_level", self.log_level.clone());
        if self.reclaim_stale {
            put("reclaim_stale", Some("true".to_string()));
        }
        map
    }

    /// Defaults < file < environment < command line, then validation
    pub fn load_config(&self) -> ConfigResult<GridlockConfig> {
        let mut config = load_config(self.config.as_deref(), None)?;
        apply_cli_overrides(&mut config, &self.overrides())?;
        // Paths may contain commas, so they bypass the string map
        if !self.players.is_empty() {
            config.processes.agents = self.players.clone();
        }
        validate_config(&config)?;
        Ok(config)
    }
}

/// gridlock agent: plays one slot
#[derive(Parser, Debug)]
#[command(name = "gridlock-agent", version, long_about = None)]
pub struct AgentArgs {
    /// Board width (checked against the arena)
    pub width: u16,

    /// Board height (checked against the arena)
    pub height: u16,

    /// Agent slot (default: GRIDLOCK_AGENT_SLOT, then lookup by pid)
    #[arg(long)]
    pub slot: Option<usize>,

    /// State segment path
    #[arg(long, env = ENV_STATE_PATH, default_value = "/dev/shm/game_state")]
    pub state: PathBuf,

    /// Sync segment path
    #[arg(long, env = ENV_SYNC_PATH, default_value = "/dev/shm/game_sync")]
    pub sync: PathBuf,

    /// Move policy
    #[arg(long, default_value = "greedy")]
    pub policy: String,

    /// Default log level
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// gridlock observer: renders every frame
#[derive(Parser, Debug)]
#[command(name = "gridlock-observer", version, long_about = None)]
pub struct ObserverArgs {
    /// Board width (checked against the arena)
    pub width: u16,

    /// Board height (checked against the arena)
    pub height: u16,

    /// State segment path
    #[arg(long, env = ENV_STATE_PATH, default_value = "/dev/shm/game_state")]
    pub state: PathBuf,

    /// Sync segment path
    #[arg(long, env = ENV_SYNC_PATH, default_value = "/dev/shm/game_sync")]
    pub sync: PathBuf,

    /// Plain output without colours or screen clearing
    #[arg(long)]
    pub no_color: bool,

    /// Default log level
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_short_flags() {
        let args = OrchestratorArgs::parse_from([
            "gridlock", "-w", "12", "-h", "8", "-d", "0", "-t", "3", "-s", "5", "-v", "./view",
            "-p", "./a", "./b",
        ]);
        assert_eq!(args.width, Some(12));
        assert_eq!(args.height, Some(8));
        assert_eq!(args.players, vec![PathBuf::from("./a"), PathBuf::from("./b")]);

        let map = args.overrides();
        assert_eq!(map["delay_ms"], "0");
        assert_eq!(map["timeout_secs"], "3");
        assert_eq!(map["seed"], "5");
        assert_eq!(map["observer"], "./view");
        assert!(!map.contains_key("reclaim_stale"));
    }

    #[test]
    fn test_too_many_players_rejected() {
        let mut argv = vec!["gridlock".to_string(), "-p".to_string()];
        argv.extend((0..10).map(|i| format!("./agent{}", i)));
        assert!(OrchestratorArgs::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_debug_flags_stripped() {
        let argv = without_debug_flags(["gridlock", "--debug-gridlock-rules", "-w", "4"]);
        assert_eq!(argv.len(), 3);
        let args = OrchestratorArgs::parse_from(argv);
        assert_eq!(args.width, Some(4));
    }

    #[test]
    fn test_agent_positional_contract() {
        let args = AgentArgs::parse_from([
            "gridlock-agent",
            "10",
            "10",
            "--slot",
            "2",
            "--state",
            "/tmp/s",
            "--sync",
            "/tmp/y",
        ]);
        assert_eq!((args.width, args.height), (10, 10));
        assert_eq!(args.slot, Some(2));
        assert_eq!(args.state, PathBuf::from("/tmp/s"));
    }
}
