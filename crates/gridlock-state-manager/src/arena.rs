// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The shared game arena
//!
//! An [`Arena`] pairs the state segment with the sync segment. The orchestrator creates
//! it as [`ArenaRole::Owner`]; agents and the observer attach as
//! [`ArenaRole::Attached`], with the state segment mapped read-only.
//!
//! State is read through a [`ReadGuard`] and mutated through a [`WriteGuard`], which
//! run the reader and writer protocols on entry and exit.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};

use tracing::{debug, error, info};

use crate::error::{StateError, StateResult};
use crate::layout::{
    state_segment_size, AgentRecord, ArenaHeader, CellValue, SyncBlock, GRID_OFFSET,
    LAYOUT_VERSION, STATE_MAGIC, SYNC_MAGIC, SYNC_SEGMENT_SIZE,
};
use crate::segment::Segment;
use crate::semaphore::Semaphore;
use crate::snapshot::{AgentSnapshot, ArenaSnapshot};
use crate::MAX_AGENTS;

/// How this process holds the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaRole {
    /// Created the segments; the only role that can write and destroy
    Owner,
    /// Attached to existing segments
    Attached,
}

/// Board extents and live agent count, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaDims {
    pub width: u16,
    pub height: u16,
    pub agent_count: usize,
}

impl ArenaDims {
    pub fn validate(&self) -> StateResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StateError::BoardExtents {
                width: self.width,
                height: self.height,
            });
        }
        if self.agent_count == 0 || self.agent_count > MAX_AGENTS {
            return Err(StateError::AgentCount {
                count: self.agent_count,
                max: MAX_AGENTS,
            });
        }
        Ok(())
    }
}

/// Snapshot of the protocol semaphore counts, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreCounts {
    pub render_needed: i32,
    pub render_done: i32,
    pub writer_admission: i32,
    pub state_lock: i32,
    pub reader_count_guard: i32,
}

/// Shared game arena
pub struct Arena {
    role: ArenaRole,
    state: Segment,
    sync: Segment,
    dims: ArenaDims,
}

fn header_of(segment: &Segment) -> &ArenaHeader {
    // Page-aligned mapping of at least GRID_OFFSET bytes; all-zero is a valid header
    unsafe { &*(segment.as_ptr() as *const ArenaHeader) }
}

fn sync_of(segment: &Segment) -> &SyncBlock {
    unsafe { &*(segment.as_ptr() as *const SyncBlock) }
}

fn write_magic(segment: &mut Segment, magic: &[u8; 8]) {
    if let Some(bytes) = segment.bytes_mut() {
        bytes[..8].copy_from_slice(magic);
    }
}

fn check_magic(segment: &Segment, magic: &[u8; 8], version: u32) -> StateResult<()> {
    if &segment.bytes()[..8] != magic {
        return Err(StateError::InvalidLayout {
            path: segment.path().to_path_buf(),
            reason: "bad magic".to_string(),
        });
    }
    if version != LAYOUT_VERSION {
        return Err(StateError::InvalidLayout {
            path: segment.path().to_path_buf(),
            reason: format!("version {} (expected {})", version, LAYOUT_VERSION),
        });
    }
    Ok(())
}

impl Arena {
    /// Create both segments, initialise the header and every semaphore.
    ///
    /// The grid starts zeroed and every agent is named `Player_<slot>`; the caller fills
    /// rewards and places agents through a [`WriteGuard`] before spawning anyone.
    pub fn create(
        state_path: &Path,
        sync_path: &Path,
        dims: ArenaDims,
        reclaim_stale: bool,
    ) -> StateResult<Self> {
        dims.validate()?;

        let mut state = Segment::create(
            state_path,
            state_segment_size(dims.width, dims.height),
            reclaim_stale,
        )?;
        let mut sync = match Segment::create(sync_path, SYNC_SEGMENT_SIZE, reclaim_stale) {
            Ok(sync) => sync,
            Err(e) => {
                let _ = state.unlink();
                return Err(e);
            }
        };
        write_magic(&mut state, STATE_MAGIC);
        write_magic(&mut sync, SYNC_MAGIC);

        let header = header_of(&state);
        header.version.store(LAYOUT_VERSION, Ordering::Relaxed);
        header.width.store(dims.width, Ordering::Relaxed);
        header.height.store(dims.height, Ordering::Relaxed);
        header.agent_count.store(dims.agent_count as u32, Ordering::Relaxed);
        header.game_over.store(false, Ordering::Relaxed);
        for (slot, record) in header.agents.iter().take(dims.agent_count).enumerate() {
            record.store_name(&format!("Player_{}", slot));
        }

        let block = sync_of(&sync);
        if let Err(e) = unsafe { block.init_semaphores() } {
            error!("Semaphore initialisation failed: {}", e);
            let _ = sync.unlink();
            let _ = state.unlink();
            return Err(e);
        }
        block.version.store(LAYOUT_VERSION, Ordering::Relaxed);

        info!(
            "Arena created: {}x{} board, {} agents",
            dims.width, dims.height, dims.agent_count
        );
        Ok(Self {
            role: ArenaRole::Owner,
            state,
            sync,
            dims,
        })
    }

    /// Attach to segments created by another process
    pub fn attach(state_path: &Path, sync_path: &Path) -> StateResult<Self> {
        let state = Segment::open(state_path, false, GRID_OFFSET)?;
        let header = header_of(&state);
        check_magic(&state, STATE_MAGIC, header.version.load(Ordering::Relaxed))?;

        let dims = ArenaDims {
            width: header.width.load(Ordering::Relaxed),
            height: header.height.load(Ordering::Relaxed),
            agent_count: header.agent_count.load(Ordering::Relaxed) as usize,
        };
        dims.validate()?;
        let expected = state_segment_size(dims.width, dims.height);
        if state.len() < expected {
            return Err(StateError::InvalidLayout {
                path: state_path.to_path_buf(),
                reason: format!("size {} smaller than {}", state.len(), expected),
            });
        }

        // Semaphore operations write into the sync block, so it is always mapped rw
        let sync = Segment::open(sync_path, true, SYNC_SEGMENT_SIZE)?;
        check_magic(
            &sync,
            SYNC_MAGIC,
            sync_of(&sync).version.load(Ordering::Relaxed),
        )?;

        debug!(
            "Attached to arena {}x{} with {} agents",
            dims.width, dims.height, dims.agent_count
        );
        Ok(Self {
            role: ArenaRole::Attached,
            state,
            sync,
            dims,
        })
    }

    pub fn role(&self) -> ArenaRole {
        self.role
    }

    pub fn dims(&self) -> ArenaDims {
        self.dims
    }

    pub fn state_path(&self) -> &Path {
        self.state.path()
    }

    pub fn sync_path(&self) -> &Path {
        self.sync.path()
    }

    pub(crate) fn sync(&self) -> &SyncBlock {
        sync_of(&self.sync)
    }

    /// Readers currently inside the reader protocol
    pub fn active_readers(&self) -> u32 {
        self.sync().active_readers()
    }

    /// Current counts of the protocol semaphores
    pub fn semaphore_counts(&self) -> StateResult<SemaphoreCounts> {
        let sync = self.sync();
        Ok(SemaphoreCounts {
            render_needed: sync.render_needed.value()?,
            render_done: sync.render_done.value()?,
            writer_admission: sync.writer_admission.value()?,
            state_lock: sync.state_lock.value()?,
            reader_count_guard: sync.reader_count_guard.value()?,
        })
    }

    pub fn turn_gate(&self, slot: usize) -> StateResult<&Semaphore> {
        if slot >= self.dims.agent_count {
            return Err(StateError::InvalidSlot {
                slot,
                agent_count: self.dims.agent_count,
            });
        }
        Ok(&self.sync().turn_gates[slot])
    }

    pub fn render_needed(&self) -> &Semaphore {
        &self.sync().render_needed
    }

    pub fn render_done(&self) -> &Semaphore {
        &self.sync().render_done
    }

    fn view(&self) -> StateView<'_> {
        let cells = self.dims.width as usize * self.dims.height as usize;
        let grid = unsafe {
            std::slice::from_raw_parts(
                self.state.as_ptr().add(GRID_OFFSET) as *const AtomicI32,
                cells,
            )
        };
        StateView {
            header: header_of(&self.state),
            grid,
            dims: self.dims,
        }
    }

    /// Enter as reader
    pub fn read(&self) -> StateResult<ReadGuard<'_>> {
        self.sync().reader_enter()?;
        Ok(ReadGuard {
            arena: self,
            view: self.view(),
            released: false,
        })
    }

    /// Enter as writer (owner only)
    pub fn write(&self) -> StateResult<WriteGuard<'_>> {
        if self.role != ArenaRole::Owner || !self.state.is_writable() {
            return Err(StateError::NotOwner);
        }
        self.sync().writer_enter()?;
        Ok(WriteGuard {
            arena: self,
            view: self.view(),
            released: false,
        })
    }

    /// View without entering the reader protocol.
    ///
    /// Only consistent while the writer is known to be parked, as the observer's is
    /// between `render_needed` and `render_done`.
    pub fn unguarded_view(&self) -> StateView<'_> {
        self.view()
    }

    /// Destroy every semaphore, unmap and unlink both segments (owner only).
    ///
    /// Every attached process must have exited.
    pub fn destroy(self) -> StateResult<()> {
        if self.role != ArenaRole::Owner {
            return Err(StateError::NotOwner);
        }
        let Arena { state, sync, .. } = self;

        let destroyed = unsafe { sync_of(&sync).destroy_semaphores() };
        let sync_unlinked = sync.unlink();
        let state_unlinked = state.unlink();
        info!("Arena destroyed");
        destroyed.and(sync_unlinked).and(state_unlinked)
    }
}

/// Read-only window on the arena
#[derive(Clone, Copy)]
pub struct StateView<'a> {
    header: &'a ArenaHeader,
    grid: &'a [AtomicI32],
    dims: ArenaDims,
}

impl<'a> StateView<'a> {
    pub fn width(&self) -> u16 {
        self.dims.width
    }

    pub fn height(&self) -> u16 {
        self.dims.height
    }

    pub fn agent_count(&self) -> usize {
        self.dims.agent_count
    }

    pub fn game_over(&self) -> bool {
        self.header.game_over.load(Ordering::Relaxed)
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.dims.width as i32 && y < self.dims.height as i32
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| y as usize * self.dims.width as usize + x as usize)
    }

    /// Raw cell value, `None` outside the board
    pub fn cell(&self, x: i32, y: i32) -> Option<i32> {
        self.index(x, y)
            .map(|i| self.grid[i].load(Ordering::Relaxed))
    }

    pub fn cell_value(&self, x: i32, y: i32) -> Option<CellValue> {
        self.cell(x, y).map(CellValue::decode)
    }

    fn record(&self, slot: usize) -> Option<&'a AgentRecord> {
        if slot < self.dims.agent_count {
            Some(&self.header.agents[slot])
        } else {
            None
        }
    }

    pub fn position(&self, slot: usize) -> Option<(u16, u16)> {
        self.record(slot).map(AgentRecord::position)
    }

    pub fn is_blocked(&self, slot: usize) -> Option<bool> {
        self.record(slot).map(|r| r.blocked.load(Ordering::Relaxed))
    }

    /// Slot whose record carries `pid`
    pub fn find_slot_by_pid(&self, pid: i32) -> Option<usize> {
        (0..self.dims.agent_count)
            .find(|&slot| self.header.agents[slot].pid.load(Ordering::Relaxed) == pid)
    }

    pub fn agent(&self, slot: usize) -> Option<AgentSnapshot> {
        self.record(slot).map(|r| {
            let (x, y) = r.position();
            AgentSnapshot {
                slot,
                name: r.name(),
                score: r.score.load(Ordering::Relaxed),
                valid_moves: r.valid_moves.load(Ordering::Relaxed),
                invalid_moves: r.invalid_moves.load(Ordering::Relaxed),
                x,
                y,
                pid: r.pid.load(Ordering::Relaxed),
                blocked: r.blocked.load(Ordering::Relaxed),
            }
        })
    }

    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            width: self.dims.width,
            height: self.dims.height,
            game_over: self.game_over(),
            cells: self
                .grid
                .iter()
                .map(|c| c.load(Ordering::Relaxed))
                .collect(),
            agents: (0..self.dims.agent_count)
                .filter_map(|slot| self.agent(slot))
                .collect(),
        }
    }
}

/// Held while inside the reader protocol
pub struct ReadGuard<'a> {
    arena: &'a Arena,
    view: StateView<'a>,
    released: bool,
}

impl<'a> ReadGuard<'a> {
    /// Leave the reader protocol, reporting failures
    pub fn release(mut self) -> StateResult<()> {
        self.released = true;
        self.arena.sync().reader_exit()
    }
}

impl<'a> Deref for ReadGuard<'a> {
    type Target = StateView<'a>;

    fn deref(&self) -> &Self::Target {
        &self.view
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.arena.sync().reader_exit() {
                error!("Reader exit failed: {}", e);
            }
        }
    }
}

/// Held while inside the writer protocol; the only way to mutate the arena
pub struct WriteGuard<'a> {
    arena: &'a Arena,
    view: StateView<'a>,
    released: bool,
}

impl<'a> WriteGuard<'a> {
    /// Leave the writer protocol, reporting failures
    pub fn release(mut self) -> StateResult<()> {
        self.released = true;
        self.arena.sync().writer_exit()
    }

    pub fn view(&self) -> StateView<'a> {
        self.view
    }

    fn record_mut(&self, slot: usize) -> StateResult<&'a AgentRecord> {
        self.view.record(slot).ok_or(StateError::InvalidSlot {
            slot,
            agent_count: self.view.dims.agent_count,
        })
    }

    pub fn set_cell(&mut self, x: i32, y: i32, value: CellValue) -> StateResult<()> {
        let index = self.view.index(x, y).ok_or(StateError::OutOfBounds {
            x,
            y,
            width: self.view.dims.width,
            height: self.view.dims.height,
        })?;
        self.view.grid[index].store(value.encode(), Ordering::Relaxed);
        Ok(())
    }

    pub fn set_name(&mut self, slot: usize, name: &str) -> StateResult<()> {
        self.record_mut(slot)?.store_name(name);
        Ok(())
    }

    pub fn set_pid(&mut self, slot: usize, pid: i32) -> StateResult<()> {
        self.record_mut(slot)?.pid.store(pid, Ordering::Relaxed);
        Ok(())
    }

    pub fn set_position(&mut self, slot: usize, x: u16, y: u16) -> StateResult<()> {
        let record = self.record_mut(slot)?;
        record.x.store(x, Ordering::Relaxed);
        record.y.store(y, Ordering::Relaxed);
        Ok(())
    }

    /// Add `reward` to the score and count one valid move
    pub fn credit_valid_move(&mut self, slot: usize, reward: u32) -> StateResult<()> {
        let record = self.record_mut(slot)?;
        record.score.fetch_add(reward, Ordering::Relaxed);
        record.valid_moves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_invalid_move(&mut self, slot: usize) -> StateResult<()> {
        self.record_mut(slot)?
            .invalid_moves
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn set_blocked(&mut self, slot: usize, blocked: bool) -> StateResult<()> {
        self.record_mut(slot)?
            .blocked
            .store(blocked, Ordering::Relaxed);
        Ok(())
    }

    /// Flip the termination flag; never reset
    pub fn set_game_over(&mut self) {
        self.view.header.game_over.store(true, Ordering::Relaxed);
    }
}

impl<'a> Deref for WriteGuard<'a> {
    type Target = StateView<'a>;

    fn deref(&self) -> &Self::Target {
        &self.view
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.arena.sync().writer_exit() {
                error!("Writer exit failed: {}", e);
            }
        }
    }
}

/// Segment paths handed to child processes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPaths {
    pub state: PathBuf,
    pub sync: PathBuf,
}

impl SegmentPaths {
    pub fn of(arena: &Arena) -> Self {
        Self {
            state: arena.state_path().to_path_buf(),
            sync: arena.sync_path().to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u16, height: u16, agent_count: usize) -> ArenaDims {
        ArenaDims {
            width,
            height,
            agent_count,
        }
    }

    #[test]
    fn test_dims_validation() {
        assert!(dims(1, 1, 1).validate().is_ok());
        assert!(matches!(
            dims(0, 4, 1).validate(),
            Err(StateError::BoardExtents { .. })
        ));
        assert!(matches!(
            dims(4, 4, 0).validate(),
            Err(StateError::AgentCount { .. })
        ));
        assert!(matches!(
            dims(4, 4, MAX_AGENTS + 1).validate(),
            Err(StateError::AgentCount { .. })
        ));
    }

    #[test]
    fn test_write_guard_bounds_and_slots() {
        let dir = tempfile::tempdir().unwrap();
        let arena = Arena::create(
            &dir.path().join("state"),
            &dir.path().join("sync"),
            dims(3, 2, 2),
            false,
        )
        .unwrap();

        let mut guard = arena.write().unwrap();
        guard.set_cell(2, 1, CellValue::Reward(7)).unwrap();
        assert!(matches!(
            guard.set_cell(3, 0, CellValue::Reward(1)),
            Err(StateError::OutOfBounds { .. })
        ));
        assert!(matches!(
            guard.set_pid(2, 10),
            Err(StateError::InvalidSlot { .. })
        ));
        guard.set_name(1, "walker").unwrap();
        assert_eq!(guard.cell(2, 1), Some(7));
        assert_eq!(guard.cell(-1, 0), None);
        guard.release().unwrap();

        let snapshot = arena.read().unwrap().snapshot();
        assert_eq!(snapshot.agents[0].name, "Player_0");
        assert_eq!(snapshot.agents[1].name, "walker");
        assert_eq!(snapshot.cells.len(), 6);

        arena.destroy().unwrap();
    }
}
