// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Final game report

use std::cmp::Ordering;
use std::fmt::{self, Write as _};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use gridlock_state_manager::ArenaSnapshot;
use serde::Serialize;

use crate::error::{RuntimeError, RuntimeResult};
use crate::orchestrator::EndReason;

/// How a child process ended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExitReport {
    pub code: Option<i32>,
    pub signal: Option<i32>,
    /// Killed by the orchestrator after the shutdown grace period
    pub killed: bool,
    /// Waiting for the process failed
    pub error: Option<String>,
}

impl ExitReport {
    pub fn from_status(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            signal: status.signal(),
            ..Self::default()
        }
    }

    pub fn from_error(error: &std::io::Error) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn not_started() -> Self {
        Self {
            error: Some("not started".to_string()),
            ..Self::default()
        }
    }

    pub fn killed(mut self) -> Self {
        self.killed = true;
        self
    }

    pub fn is_clean(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for ExitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            return write!(f, "error: {}", error);
        }
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit {}", code)?,
            (None, Some(signal)) => write!(f, "signal {}", signal)?,
            (None, None) => write!(f, "unknown")?,
        }
        if self.killed {
            write!(f, " (killed)")?;
        }
        Ok(())
    }
}

/// One agent's final state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentReport {
    pub slot: usize,
    pub name: String,
    pub program: PathBuf,
    pub score: u32,
    pub valid_moves: u32,
    pub invalid_moves: u32,
    pub x: u16,
    pub y: u16,
    pub blocked: bool,
    pub exit: ExitReport,
}

impl AgentReport {
    /// Higher score first, then fewer valid moves, then fewer invalid moves
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then(self.valid_moves.cmp(&other.valid_moves))
            .then(self.invalid_moves.cmp(&other.invalid_moves))
    }
}

/// Everything known once all children exited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameReport {
    pub end_reason: EndReason,
    pub exit_code: i32,
    pub width: u16,
    pub height: u16,
    pub seed: u64,
    pub agents: Vec<AgentReport>,
    pub observer: Option<ExitReport>,
}

impl GameReport {
    /// Combine the final arena snapshot with the child exit statuses
    pub fn build(
        end_reason: EndReason,
        seed: u64,
        snapshot: &ArenaSnapshot,
        programs: &[PathBuf],
        exits: Vec<ExitReport>,
        observer: Option<ExitReport>,
    ) -> Self {
        let mut exits = exits.into_iter();
        let agents = snapshot
            .agents
            .iter()
            .map(|agent| AgentReport {
                slot: agent.slot,
                name: agent.name.clone(),
                program: programs.get(agent.slot).cloned().unwrap_or_default(),
                score: agent.score,
                valid_moves: agent.valid_moves,
                invalid_moves: agent.invalid_moves,
                x: agent.x,
                y: agent.y,
                blocked: agent.blocked,
                exit: exits.next().unwrap_or_else(ExitReport::not_started),
            })
            .collect();

        Self {
            exit_code: end_reason.exit_code(),
            end_reason,
            width: snapshot.width,
            height: snapshot.height,
            seed,
            agents,
            observer,
        }
    }

    /// Agents best first
    pub fn ranking(&self) -> Vec<&AgentReport> {
        let mut ranked: Vec<&AgentReport> = self.agents.iter().collect();
        ranked.sort_by(|a, b| a.rank_cmp(b).then(a.slot.cmp(&b.slot)));
        ranked
    }

    /// Every agent tied for first place
    pub fn winners(&self) -> Vec<&AgentReport> {
        let ranked = self.ranking();
        let Some(best) = ranked.first().copied() else {
            return Vec::new();
        };
        ranked
            .into_iter()
            .take_while(|agent| agent.rank_cmp(best) == Ordering::Equal)
            .collect()
    }

    /// Human-readable ranking table
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Game over: {}", self.end_reason);
        let _ = writeln!(
            out,
            "{:<4} {:<16} {:>6} {:>6} {:>8} {:>9}  {}",
            "#", "name", "score", "valid", "invalid", "position", "exit"
        );
        for (rank, agent) in self.ranking().into_iter().enumerate() {
            let _ = writeln!(
                out,
                "{:<4} {:<16} {:>6} {:>6} {:>8} {:>9}  {}{}",
                rank + 1,
                agent.name,
                agent.score,
                agent.valid_moves,
                agent.invalid_moves,
                format!("({},{})", agent.x, agent.y),
                agent.exit,
                if agent.blocked { " [BLOCKED]" } else { "" }
            );
        }

        let winners = self.winners();
        match winners.as_slice() {
            [] => {}
            [winner] => {
                let _ = writeln!(out, "Winner: {} ({} points)", winner.name, winner.score);
            }
            tied => {
                let names: Vec<&str> = tied.iter().map(|a| a.name.as_str()).collect();
                let _ = writeln!(out, "Tie between: {}", names.join(", "));
            }
        }
        if let Some(observer) = &self.observer {
            let _ = writeln!(out, "Observer: {}", observer);
        }
        out
    }

    pub fn write_json(&self, path: &Path) -> RuntimeResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RuntimeError::Report(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| RuntimeError::Report(format!("{}: {}", path.display(), e)))
    }
}
