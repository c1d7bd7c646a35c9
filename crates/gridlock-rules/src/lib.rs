// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # gridlock Rules
//!
//! Game rules over any [`Board`]: the shared arena (through its read and write guards)
//! or the in-process [`MemoryBoard`].
//!
//! - [`direction`]: channel byte codec (`Move::Step` / `Move::Pass`)
//! - [`moves`]: validation, scoring and blocked detection
//! - [`setup`]: seeded rewards and initial placement
//! - [`policy`]: agent move policies

pub mod board;
pub mod direction;
pub mod memory;
pub mod moves;
pub mod policy;
pub mod setup;

pub use board::{Board, BoardMut};
pub use direction::{Direction, Move, PASS_CODE};
pub use memory::{MemoryAgent, MemoryBoard};
pub use moves::{apply_move, claimable_neighbours, is_blocked, refresh_blocked, InvalidMove, MoveOutcome};
pub use policy::{policy_by_name, Greedy, MovePolicy};
pub use setup::{anchor, fill_rewards, place_agents};
