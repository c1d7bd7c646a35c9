// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Agent process loop
//!
//! Wait for the turn gate, read the board as a reader, send one byte. Repeat until the
//! orchestrator sets `game_over` or stops listening.

use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use gridlock_rules::MovePolicy;
use gridlock_state_manager::{Arena, Semaphore};
use tracing::{debug, info, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::spawn::ENV_AGENT_SLOT;

/// How long an agent searches the agent table for its own pid
const SLOT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);
/// Wait slice between orchestrator liveness checks
const PARENT_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// Why the agent loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentExit {
    GameOver,
    ChannelClosed,
    /// The orchestrator went away without ending the game
    Orphaned,
}

/// Detects that the process that spawned us has exited
pub(crate) struct ParentWatch {
    parent: u32,
}

impl ParentWatch {
    pub(crate) fn new() -> Self {
        Self {
            parent: std::os::unix::process::parent_id(),
        }
    }

    fn parent_alive(&self) -> bool {
        std::os::unix::process::parent_id() == self.parent
    }

    /// Wait on `sem`; `Ok(false)` if the parent exited in the meantime
    pub(crate) fn wait(&self, sem: &Semaphore) -> RuntimeResult<bool> {
        loop {
            if sem.wait_timeout(PARENT_CHECK_INTERVAL)? {
                return Ok(true);
            }
            if !self.parent_alive() {
                return Ok(false);
            }
        }
    }
}

/// Slot from the explicit value, `GRIDLOCK_AGENT_SLOT`, or the pid recorded in the
/// agent table, in that order
pub fn resolve_slot(arena: &Arena, explicit: Option<usize>) -> RuntimeResult<usize> {
    let agent_count = arena.dims().agent_count;
    let from_env = std::env::var(ENV_AGENT_SLOT)
        .ok()
        .map(|value| {
            value.trim().parse::<usize>().map_err(|_| {
                RuntimeError::AgentSlot(format!("{}={:?} is not a number", ENV_AGENT_SLOT, value))
            })
        })
        .transpose()?;

    if let Some(slot) = explicit.or(from_env) {
        if slot >= agent_count {
            return Err(RuntimeError::AgentSlot(format!(
                "slot {} out of range for {} agents",
                slot, agent_count
            )));
        }
        return Ok(slot);
    }

    // The orchestrator records pids right after spawning everyone
    let pid = std::process::id() as i32;
    let deadline = Instant::now() + SLOT_DISCOVERY_TIMEOUT;
    loop {
        let found = {
            let guard = arena.read()?;
            guard.find_slot_by_pid(pid)
        };
        if let Some(slot) = found {
            debug!(slot, pid, "Found own slot by pid");
            return Ok(slot);
        }
        if Instant::now() >= deadline {
            return Err(RuntimeError::AgentSlot(format!(
                "pid {} not in the agent table",
                pid
            )));
        }
        thread::sleep(Duration::from_millis(20));
    }
}

/// Run the agent protocol for `slot`, writing move bytes to `out`
pub fn run_agent(
    arena: &Arena,
    slot: usize,
    policy: &mut dyn MovePolicy,
    out: &mut dyn Write,
) -> RuntimeResult<AgentExit> {
    let gate = arena.turn_gate(slot)?;
    let watch = ParentWatch::new();
    let mut turns: u64 = 0;
    info!(slot, policy = policy.name(), "Agent ready");

    loop {
        if !watch.wait(gate)? {
            warn!(slot, "Orchestrator exited; stopping");
            return Ok(AgentExit::Orphaned);
        }

        let guard = arena.read()?;
        if guard.game_over() {
            guard.release()?;
            info!(slot, turns, "Game over");
            return Ok(AgentExit::GameOver);
        }
        let mv = policy.choose(&*guard, slot);
        guard.release()?;

        match out.write_all(&[mv.encode()]).and_then(|_| out.flush()) {
            Ok(()) => {
                turns += 1;
                debug!(slot, %mv, "sent move");
            }
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                info!(slot, turns, "Channel closed by orchestrator");
                return Ok(AgentExit::ChannelClosed);
            }
            Err(e) => return Err(RuntimeError::ChannelWrite(e)),
        }
    }
}
