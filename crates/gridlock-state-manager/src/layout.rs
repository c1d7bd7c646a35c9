// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared arena layout
//!
//! ```text
//! State segment:
//!   ArenaHeader (repr(C))
//!     [0:8]    Magic "GRIDLOCK"
//!     [8:12]   Layout version (u32)
//!     [12:16]  width (u16), height (u16)
//!     [16:20]  agent count (u32)
//!     [20]     game over flag
//!     [24:..]  9 x AgentRecord (40 bytes each)
//!   Grid at GRID_OFFSET: width*height x i32, row-major
//!
//! Sync segment:
//!   SyncBlock (repr(C)), size independent of the board
//! ```
//!
//! Every field other than the magic is an atomic. A zero-filled mapping is a valid
//! (uninitialised) instance of both blocks, so creation casts freshly sized files and
//! fills them in place.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU16, AtomicU32, AtomicU8, Ordering};

use crate::semaphore::Semaphore;
use crate::MAX_AGENTS;

/// State segment magic
pub const STATE_MAGIC: &[u8; 8] = b"GRIDLOCK";
/// Sync segment magic
pub const SYNC_MAGIC: &[u8; 8] = b"GRIDSYNC";
/// Layout version shared by both segments
pub const LAYOUT_VERSION: u32 = 1;
/// Agent name capacity, NUL padded
pub const NAME_LEN: usize = 16;

/// Byte offset of the grid within the state segment
pub const GRID_OFFSET: usize = (std::mem::size_of::<ArenaHeader>() + 7) & !7;

/// Total state segment size for a board
pub fn state_segment_size(width: u16, height: u16) -> usize {
    GRID_OFFSET + width as usize * height as usize * std::mem::size_of::<AtomicI32>()
}

/// Sync segment size
pub const SYNC_SEGMENT_SIZE: usize = std::mem::size_of::<SyncBlock>();

/// Per-agent record
#[repr(C)]
pub struct AgentRecord {
    pub name: [AtomicU8; NAME_LEN],
    pub score: AtomicU32,
    pub invalid_moves: AtomicU32,
    pub valid_moves: AtomicU32,
    pub x: AtomicU16,
    pub y: AtomicU16,
    pub pid: AtomicI32,
    pub blocked: AtomicBool,
    pub _padding: [u8; 3],
}

impl AgentRecord {
    pub fn name(&self) -> String {
        let bytes: Vec<u8> = self
            .name
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .take_while(|&b| b != 0)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Store a name truncated to `NAME_LEN - 1` bytes on a char boundary
    pub fn store_name(&self, name: &str) {
        let mut end = name.len().min(NAME_LEN - 1);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        let bytes = &name.as_bytes()[..end];
        for (i, cell) in self.name.iter().enumerate() {
            cell.store(bytes.get(i).copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    pub fn position(&self) -> (u16, u16) {
        (self.x.load(Ordering::Relaxed), self.y.load(Ordering::Relaxed))
    }
}

/// Fixed state segment header
#[repr(C)]
pub struct ArenaHeader {
    pub magic: [u8; 8],
    pub version: AtomicU32,
    pub width: AtomicU16,
    pub height: AtomicU16,
    pub agent_count: AtomicU32,
    pub game_over: AtomicBool,
    pub _padding: [u8; 3],
    pub agents: [AgentRecord; MAX_AGENTS],
}

/// Fixed synchronization block
#[repr(C)]
pub struct SyncBlock {
    pub(crate) magic: [u8; 8],
    pub(crate) version: AtomicU32,
    pub(crate) reader_count: AtomicU32,
    /// Orchestrator -> observer: a frame is ready
    pub(crate) render_needed: Semaphore,
    /// Observer -> orchestrator: the frame has been drawn
    pub(crate) render_done: Semaphore,
    pub(crate) writer_admission: Semaphore,
    pub(crate) state_lock: Semaphore,
    pub(crate) reader_count_guard: Semaphore,
    pub(crate) turn_gates: [Semaphore; MAX_AGENTS],
}

impl SyncBlock {
    /// Initialise every semaphore with its starting count.
    ///
    /// # Safety
    /// Must be called exactly once, by the creating process, before any other process
    /// attaches.
    pub(crate) unsafe fn init_semaphores(&self) -> crate::StateResult<()> {
        self.render_needed.init(0)?;
        self.render_done.init(0)?;
        self.writer_admission.init(1)?;
        self.state_lock.init(1)?;
        self.reader_count_guard.init(1)?;
        for gate in &self.turn_gates {
            gate.init(0)?;
        }
        self.reader_count.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// Destroy every semaphore; keeps going after a failure and reports the first one.
    ///
    /// # Safety
    /// No other process may still use the block.
    pub(crate) unsafe fn destroy_semaphores(&self) -> crate::StateResult<()> {
        let mut first_error = None;
        let all = [
            &self.render_needed,
            &self.render_done,
            &self.writer_admission,
            &self.state_lock,
            &self.reader_count_guard,
        ]
        .into_iter()
        .chain(self.turn_gates.iter());
        for sem in all {
            if let Err(e) = sem.destroy() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Decoded grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellValue {
    /// Unclaimed reward worth this many points
    Reward(i32),
    /// Occupied or claimed by the agent in this slot
    Occupied(usize),
    /// Claimed with no owner mark
    Empty,
}

impl CellValue {
    /// Encoded mark of agent `slot`
    pub const fn occupied_by(slot: usize) -> i32 {
        -(slot as i32 + 1)
    }

    pub fn decode(raw: i32) -> Self {
        match raw {
            v if v > 0 => CellValue::Reward(v),
            0 => CellValue::Empty,
            v => CellValue::Occupied((-(v as i64) - 1) as usize),
        }
    }

    pub fn encode(self) -> i32 {
        match self {
            CellValue::Reward(v) => v,
            CellValue::Occupied(slot) => Self::occupied_by(slot),
            CellValue::Empty => 0,
        }
    }

    /// Only strictly positive cells can be moved into
    pub fn is_claimable(self) -> bool {
        matches!(self, CellValue::Reward(v) if v > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_size() {
        assert_eq!(std::mem::size_of::<AgentRecord>(), 40);
    }

    #[test]
    fn test_grid_offset_aligned() {
        assert_eq!(GRID_OFFSET % std::mem::align_of::<AtomicI32>(), 0);
        assert!(GRID_OFFSET >= std::mem::size_of::<ArenaHeader>());
        assert_eq!(state_segment_size(2, 3), GRID_OFFSET + 24);
    }

    #[test]
    fn test_cell_encoding() {
        assert_eq!(CellValue::occupied_by(0), -1);
        assert_eq!(CellValue::occupied_by(8), -9);
        assert_eq!(CellValue::decode(-1), CellValue::Occupied(0));
        assert_eq!(CellValue::decode(-9), CellValue::Occupied(8));
        assert_eq!(CellValue::decode(5), CellValue::Reward(5));
        assert_eq!(CellValue::decode(0), CellValue::Empty);
        assert!(CellValue::decode(1).is_claimable());
        assert!(!CellValue::decode(0).is_claimable());
        assert!(!CellValue::decode(-3).is_claimable());
        assert_eq!(CellValue::Occupied(4).encode(), -5);
    }

    #[test]
    fn test_name_truncation() {
        let record: AgentRecord = unsafe { std::mem::zeroed() };
        record.store_name("a_rather_long_agent_name");
        assert_eq!(record.name(), "a_rather_long_a");
        record.store_name("Player_1");
        assert_eq!(record.name(), "Player_1");
    }
}
