// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Child process launch
//!
//! Agents and the observer are started as `<program> <width> <height>`. The segment
//! paths travel in the environment, together with the agent's slot.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use gridlock_state_manager::{ArenaDims, SegmentPaths};
use tracing::{info, warn};

use crate::channel::AgentChannel;
use crate::error::{RuntimeError, RuntimeResult};
use crate::report::ExitReport;

pub const ENV_STATE_PATH: &str = "GRIDLOCK_STATE_PATH";
pub const ENV_SYNC_PATH: &str = "GRIDLOCK_SYNC_PATH";
pub const ENV_AGENT_SLOT: &str = "GRIDLOCK_AGENT_SLOT";

/// A running agent and the read end of its stdout pipe
pub struct SpawnedAgent {
    pub child: Child,
    pub channel: AgentChannel,
}

fn base_command(program: &Path, paths: &SegmentPaths, dims: ArenaDims) -> Command {
    let mut command = Command::new(program);
    command
        .arg(dims.width.to_string())
        .arg(dims.height.to_string())
        .env(ENV_STATE_PATH, &paths.state)
        .env(ENV_SYNC_PATH, &paths.sync)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit());
    command
}

/// Start agent `slot` with its stdout as the move channel
pub fn spawn_agent(
    program: &Path,
    slot: usize,
    paths: &SegmentPaths,
    dims: ArenaDims,
) -> RuntimeResult<SpawnedAgent> {
    let mut child = base_command(program, paths, dims)
        .env(ENV_AGENT_SLOT, slot.to_string())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|source| RuntimeError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;

    let Some(stdout) = child.stdout.take() else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(RuntimeError::Spawn {
            program: program.to_path_buf(),
            source: std::io::Error::other("stdout pipe missing"),
        });
    };

    info!(slot, pid = child.id(), "Spawned agent {}", program.display());
    Ok(SpawnedAgent {
        child,
        channel: AgentChannel::new(stdout),
    })
}

/// Start the observer; it draws on the inherited stdout
pub fn spawn_observer(
    program: &Path,
    paths: &SegmentPaths,
    dims: ArenaDims,
) -> RuntimeResult<Child> {
    let child = base_command(program, paths, dims)
        .stdout(Stdio::inherit())
        .spawn()
        .map_err(|source| RuntimeError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;
    info!(pid = child.id(), "Spawned observer {}", program.display());
    Ok(child)
}

/// Wait for `child` to exit, killing it once `grace` has passed
pub fn wait_with_grace(child: &mut Child, grace: Duration) -> ExitReport {
    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return ExitReport::from_status(status),
            Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
            Ok(None) => {
                warn!(pid = child.id(), "Child did not exit within {:?}; killing", grace);
                let _ = child.kill();
                return match child.wait() {
                    Ok(status) => ExitReport::from_status(status).killed(),
                    Err(e) => ExitReport::from_error(&e),
                };
            }
            Err(e) => return ExitReport::from_error(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_reports_exit_code() {
        let mut child = Command::new("sh").args(["-c", "exit 4"]).spawn().unwrap();
        let report = wait_with_grace(&mut child, Duration::from_secs(5));
        assert_eq!(report.code, Some(4));
        assert!(!report.killed);
    }

    #[test]
    fn test_wait_kills_stragglers() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let report = wait_with_grace(&mut child, Duration::from_millis(50));
        assert!(report.killed);
        assert_eq!(report.signal, Some(libc::SIGKILL));
    }

    #[test]
    fn test_spawn_failure_names_program() {
        let paths = SegmentPaths {
            state: "/nonexistent/state".into(),
            sync: "/nonexistent/sync".into(),
        };
        let dims = ArenaDims {
            width: 2,
            height: 2,
            agent_count: 1,
        };
        match spawn_agent(Path::new("/nonexistent/agent"), 0, &paths, dims) {
            Err(RuntimeError::Spawn { program, .. }) => {
                assert_eq!(program, Path::new("/nonexistent/agent"))
            }
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("spawn must fail"),
        }
    }
}
