// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # gridlock
//!
//! A turn-gated grid game played by separate processes over POSIX shared memory.
//!
//! One orchestrator owns the board (a grid of rewards in a shared segment), grants
//! turns to up to nine agent processes through per-agent semaphores, reads one move
//! byte per grant from each agent's stdout, and validates every move under a
//! writer-preferring reader/writer lock that also lives in shared memory. An optional
//! observer process renders each change in lock-step with the orchestrator.
//!
//! ## Crates
//!
//! - [`config`]: TOML configuration with environment and command-line overrides
//! - [`observability`]: logging setup and per-crate debug flags
//! - [`state_manager`]: shared segments, semaphores, the reader/writer protocol
//! - [`rules`]: move validation, blocked detection, board setup, move policies
//! - [`runtime`]: the orchestrator, agent and observer processes
//!
//! ## Running a game
//!
//! ```text
//! gridlock -w 10 -h 10 -d 100 -t 10 -s 7 -v gridlock-observer -p gridlock-agent gridlock-agent
//! ```
//!
//! ## Embedding
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! use gridlock::prelude::*;
//!
//! let mut config = GridlockConfig::default();
//! config.processes.agents = vec!["./gridlock-agent".into(), "./gridlock-agent".into()];
//! validate_config(&config).unwrap();
//!
//! let report = run_game(&config, Arc::new(AtomicBool::new(false))).unwrap();
//! print!("{}", report.render_table());
//! ```

pub use gridlock_config as config;
pub use gridlock_observability as observability;
pub use gridlock_rules as rules;
pub use gridlock_runtime as runtime;
pub use gridlock_state_manager as state_manager;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{load_config, validate_config, GridlockConfig};
    pub use crate::rules::{apply_move, Board, BoardMut, Direction, Move, MoveOutcome, MovePolicy};
    pub use crate::runtime::{run_game, EndReason, GameReport, Orchestrator};
    pub use crate::state_manager::{Arena, ArenaDims, ArenaSnapshot, CellValue, MAX_AGENTS};
}
