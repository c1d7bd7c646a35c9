// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # gridlock State Manager
//!
//! Shared game state for the orchestrator, agent and observer processes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   State segment (ArenaHeader+grid)  │  ← atomics, read-only for attached processes
//! └─────────────────────────────────────┘
//! ┌─────────────────────────────────────┐
//! │   Sync segment (SyncBlock)          │  ← pshared POSIX semaphores
//! │     render_needed / render_done     │
//! │     writer_admission / state_lock   │
//! │     reader_count_guard + count      │
//! │     turn_gates[9]                   │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gridlock_state_manager::{Arena, ArenaDims, CellValue};
//! use std::path::Path;
//!
//! let dims = ArenaDims { width: 10, height: 10, agent_count: 2 };
//! let arena = Arena::create(Path::new("/dev/shm/game_state"), Path::new("/dev/shm/game_sync"), dims, false)?;
//!
//! let mut guard = arena.write()?;
//! guard.set_cell(0, 0, CellValue::Occupied(0))?;
//! guard.release()?;
//!
//! let score = arena.read()?.agent(0).map(|a| a.score);
//! # Ok::<(), gridlock_state_manager::StateError>(())
//! ```

pub mod arena;
pub mod error;
pub mod layout;
mod rwlock;
pub mod segment;
pub mod semaphore;
pub mod snapshot;

/// Number of agent slots in the arena
pub const MAX_AGENTS: usize = 9;

pub use arena::{
    Arena, ArenaDims, ArenaRole, ReadGuard, SegmentPaths, SemaphoreCounts, StateView, WriteGuard,
};
pub use error::{StateError, StateResult};
pub use layout::CellValue;
pub use segment::Segment;
pub use semaphore::Semaphore;
pub use snapshot::{AgentSnapshot, ArenaSnapshot};
