// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Orchestrator scheduling loop
//!
//! ```text
//! RUNNING ──┬─ no valid move for `timeout` ──→ TIMEOUT ─────┐
//!           ├─ every agent blocked ─────────→ ALL_BLOCKED ──┤
//!           ├─ SIGINT / SIGTERM ────────────→ INTERRUPTED ──┼─→ shutdown()
//!           └─ semaphore or poll failure ───→ FAULT ────────┘
//! ```
//!
//! Per round: grant a turn to every schedulable agent without an outstanding one, wait
//! on all their channels at once, apply the bytes that arrived under the writer lock,
//! and hand a frame to the observer when anything changed.

use std::fmt;
use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use gridlock_config::ScheduleConfig;
use gridlock_rules::{apply_move, refresh_blocked, InvalidMove, Move, MoveOutcome};
use gridlock_state_manager::{Arena, StateResult};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::channel::{poll_ready, AgentChannel, ChannelRead};
use crate::error::{RuntimeError, RuntimeResult};

/// Why the game ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum EndReason {
    AllBlocked,
    Timeout,
    Interrupted,
    Fault(String),
}

impl EndReason {
    /// Orchestrator process exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            EndReason::AllBlocked => 0,
            EndReason::Timeout => 2,
            EndReason::Interrupted => 3,
            EndReason::Fault(_) => 1,
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::AllBlocked => write!(f, "all agents blocked"),
            EndReason::Timeout => write!(f, "timeout without valid moves"),
            EndReason::Interrupted => write!(f, "interrupted"),
            EndReason::Fault(detail) => write!(f, "fault: {}", detail),
        }
    }
}

/// Liveness probe for the observer process
pub trait ObserverProcess {
    fn is_alive(&mut self) -> bool;
}

impl ObserverProcess for Child {
    fn is_alive(&mut self) -> bool {
        matches!(self.try_wait(), Ok(None))
    }
}

/// Loop timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// End the game after this long without a valid move
    pub timeout: Duration,
    /// Upper bound of one multiplexed wait and of one observer wait slice
    pub poll_interval: Duration,
    /// Pause after each rendered frame
    pub delay: Duration,
}

impl From<&ScheduleConfig> for ScheduleSettings {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
            delay: config.delay(),
        }
    }
}

struct Seat {
    channel: Option<AgentChannel>,
    /// Gate posted, byte not yet read
    outstanding: bool,
    /// Disconnected or malformed; never scheduled again
    retired: bool,
}

/// Scheduling loop over one arena
pub struct Orchestrator<'a, O: ObserverProcess = Child> {
    arena: &'a Arena,
    seats: Vec<Seat>,
    observer: Option<O>,
    observer_lost: bool,
    settings: ScheduleSettings,
    interrupted: Arc<AtomicBool>,
    round: usize,
}

impl<'a, O: ObserverProcess> Orchestrator<'a, O> {
    /// `channels[i]` belongs to agent slot `i`
    pub fn new(
        arena: &'a Arena,
        channels: Vec<AgentChannel>,
        observer: Option<O>,
        settings: ScheduleSettings,
        interrupted: Arc<AtomicBool>,
    ) -> Self {
        let seats = channels
            .into_iter()
            .map(|channel| Seat {
                channel: Some(channel),
                outstanding: false,
                retired: false,
            })
            .collect();
        Self {
            arena,
            seats,
            observer,
            observer_lost: false,
            settings,
            interrupted,
            round: 0,
        }
    }

    pub fn is_retired(&self, slot: usize) -> bool {
        self.seats.get(slot).map_or(true, |seat| seat.retired)
    }

    fn observer_attached(&self) -> bool {
        self.observer.is_some() && !self.observer_lost
    }

    /// Give the observer process back, e.g. to wait for it
    pub fn into_observer(self) -> Option<O> {
        self.observer
    }

    /// Schedulable agents: neither retired nor blocked
    fn active_slots(&self) -> Vec<usize> {
        let view = self.arena.unguarded_view();
        (0..self.seats.len())
            .filter(|&slot| !self.seats[slot].retired && view.is_blocked(slot) == Some(false))
            .collect()
    }

    /// Hand one frame to the observer and wait until it is drawn.
    ///
    /// Without an observer this is a no-op. The wait is sliced by the poll interval so
    /// an observer that died is noticed and dropped instead of blocking the game.
    pub fn render_handshake(&mut self) -> StateResult<()> {
        if self.observer_lost {
            return Ok(());
        }
        let Some(observer) = self.observer.as_mut() else {
            return Ok(());
        };

        self.arena.render_needed().post()?;
        loop {
            if self
                .arena
                .render_done()
                .wait_timeout(self.settings.poll_interval)?
            {
                return Ok(());
            }
            if !observer.is_alive() {
                warn!("Observer exited; continuing without rendering");
                self.observer_lost = true;
                return Ok(());
            }
        }
    }

    /// Run until a terminal condition; the arena is left for [`Orchestrator::shutdown`]
    pub fn run(&mut self) -> EndReason {
        let mut last_valid = Instant::now();
        info!("Scheduling {} agents", self.seats.len());
        loop {
            match self.round_once(&mut last_valid) {
                Ok(None) => {}
                Ok(Some(reason)) => {
                    info!("Game ended: {}", reason);
                    return reason;
                }
                Err(e) => {
                    error!("Scheduling loop failed: {}", e);
                    return EndReason::Fault(e.to_string());
                }
            }
        }
    }

    fn round_once(&mut self, last_valid: &mut Instant) -> RuntimeResult<Option<EndReason>> {
        if self.interrupted.load(Ordering::Relaxed) {
            return Ok(Some(EndReason::Interrupted));
        }
        let elapsed = last_valid.elapsed();
        if elapsed >= self.settings.timeout {
            return Ok(Some(EndReason::Timeout));
        }
        let active = self.active_slots();
        if active.is_empty() {
            return Ok(Some(EndReason::AllBlocked));
        }

        // At most one grant in flight per agent
        for &slot in &active {
            if !self.seats[slot].outstanding {
                self.arena.turn_gate(slot)?.post()?;
                self.seats[slot].outstanding = true;
            }
        }

        let wait = self
            .settings
            .poll_interval
            .min(self.settings.timeout - elapsed);
        let polled: Vec<(usize, &AgentChannel)> = active
            .iter()
            .filter_map(|&slot| self.seats[slot].channel.as_ref().map(|c| (slot, c)))
            .collect();
        let mut ready = poll_ready(&polled, wait).map_err(RuntimeError::Poll)?;

        // Rotate the service order every round
        let seats = self.seats.len();
        let start = self.round % seats;
        self.round = self.round.wrapping_add(1);
        ready.sort_by_key(|&slot| (slot + seats - start) % seats);

        let mut any_valid = false;
        for slot in ready {
            any_valid |= self.serve(slot)?;
        }

        if any_valid {
            self.render_handshake()?;
            *last_valid = Instant::now();
            if self.observer_attached() && !self.settings.delay.is_zero() {
                thread::sleep(self.settings.delay);
            }
        }
        Ok(None)
    }

    /// Read and apply one byte from a ready channel; true if it was a valid move
    fn serve(&mut self, slot: usize) -> RuntimeResult<bool> {
        let seat = &mut self.seats[slot];
        let Some(channel) = seat.channel.as_mut() else {
            return Ok(false);
        };
        let read = channel.read_byte();
        seat.outstanding = false;

        match read {
            ChannelRead::Byte(byte) => self.apply(slot, Move::decode(byte)),
            ChannelRead::Closed => {
                warn!(slot, "Agent closed its channel; retiring");
                self.retire(slot)?;
                Ok(false)
            }
            ChannelRead::Failed(e) => {
                warn!(slot, "Agent channel read failed ({}); retiring", e);
                self.retire(slot)?;
                Ok(false)
            }
        }
    }

    fn apply(&mut self, slot: usize, mv: Move) -> RuntimeResult<bool> {
        let arena = self.arena;
        let mut guard = arena.write()?;
        let outcome = apply_move(&mut guard, slot, mv)?;

        match outcome {
            MoveOutcome::Valid { reward, x, y } => {
                debug!(slot, %mv, reward, x, y, "valid move");
                // A claimed cell can cut off a neighbour
                let others: Vec<usize> = (0..self.seats.len())
                    .filter(|&other| {
                        other != slot
                            && !self.seats[other].retired
                            && guard.is_blocked(other) == Some(false)
                    })
                    .collect();
                for blocked in refresh_blocked(&mut guard, others)? {
                    info!(slot = blocked, "Agent blocked");
                }
                if guard.is_blocked(slot) == Some(true) {
                    info!(slot, "Agent blocked");
                }
            }
            MoveOutcome::Invalid(InvalidMove::Pass(byte)) => {
                debug!(slot, byte, "pass or malformed byte; retiring");
                guard.set_blocked(slot, true)?;
                self.seats[slot].retired = true;
                self.seats[slot].channel = None;
            }
            MoveOutcome::Invalid(reason) => {
                debug!(slot, %mv, ?reason, "invalid move");
            }
        }

        guard.release()?;
        Ok(outcome.is_valid())
    }

    fn retire(&mut self, slot: usize) -> RuntimeResult<()> {
        let seat = &mut self.seats[slot];
        seat.retired = true;
        seat.channel = None;
        let mut guard = self.arena.write()?;
        guard.set_blocked(slot, true)?;
        guard.release()?;
        Ok(())
    }

    /// Termination sequence: flip `game_over`, render the final frame, then release
    /// every gate once so each waiting agent wakes up, sees the flag and exits.
    pub fn shutdown(&mut self) -> StateResult<()> {
        let mut guard = self.arena.write()?;
        guard.set_game_over();
        guard.release()?;

        let rendered = self.render_handshake();

        let mut released = Ok(());
        for slot in 0..self.seats.len() {
            if let Err(e) = self.arena.turn_gate(slot).and_then(|gate| gate.post()) {
                error!(slot, "Failed to release turn gate: {}", e);
                if released.is_ok() {
                    released = Err(e);
                }
            }
        }
        info!("Termination broadcast sent");
        rendered.and(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(EndReason::AllBlocked.exit_code(), 0);
        assert_eq!(EndReason::Timeout.exit_code(), 2);
        assert_eq!(EndReason::Interrupted.exit_code(), 3);
        assert_eq!(EndReason::Fault("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_end_reason_json_shape() {
        let json = serde_json::to_string(&EndReason::Fault("poll".into())).unwrap();
        assert_eq!(json, r#"{"kind":"fault","detail":"poll"}"#);
        let json = serde_json::to_string(&EndReason::AllBlocked).unwrap();
        assert_eq!(json, r#"{"kind":"all_blocked"}"#);
    }
}
