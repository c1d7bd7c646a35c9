// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Board abstraction shared by the arena guards and the in-memory board

use gridlock_state_manager::{CellValue, ReadGuard, StateError, StateResult, StateView, WriteGuard};

/// Read access to a board and its agents' positions
pub trait Board {
    fn width(&self) -> u16;
    fn height(&self) -> u16;
    fn agent_count(&self) -> usize;
    /// Raw cell, `None` outside the board
    fn cell(&self, x: i32, y: i32) -> Option<i32>;
    fn position(&self, slot: usize) -> Option<(u16, u16)>;

    fn cell_value(&self, x: i32, y: i32) -> Option<CellValue> {
        self.cell(x, y).map(CellValue::decode)
    }

    fn position_or_err(&self, slot: usize) -> StateResult<(u16, u16)> {
        self.position(slot).ok_or(StateError::InvalidSlot {
            slot,
            agent_count: self.agent_count(),
        })
    }
}

/// Mutations the rules perform
pub trait BoardMut: Board {
    fn set_cell(&mut self, x: i32, y: i32, value: CellValue) -> StateResult<()>;
    fn set_position(&mut self, slot: usize, x: u16, y: u16) -> StateResult<()>;
    fn credit_valid_move(&mut self, slot: usize, reward: u32) -> StateResult<()>;
    fn record_invalid_move(&mut self, slot: usize) -> StateResult<()>;
    fn set_blocked(&mut self, slot: usize, blocked: bool) -> StateResult<()>;
}

impl Board for StateView<'_> {
    fn width(&self) -> u16 {
        StateView::width(self)
    }

    fn height(&self) -> u16 {
        StateView::height(self)
    }

    fn agent_count(&self) -> usize {
        StateView::agent_count(self)
    }

    fn cell(&self, x: i32, y: i32) -> Option<i32> {
        StateView::cell(self, x, y)
    }

    fn position(&self, slot: usize) -> Option<(u16, u16)> {
        StateView::position(self, slot)
    }
}

macro_rules! board_via_view {
    ($guard:ident) => {
        impl Board for $guard<'_> {
            fn width(&self) -> u16 {
                StateView::width(self)
            }

            fn height(&self) -> u16 {
                StateView::height(self)
            }

            fn agent_count(&self) -> usize {
                StateView::agent_count(self)
            }

            fn cell(&self, x: i32, y: i32) -> Option<i32> {
                StateView::cell(self, x, y)
            }

            fn position(&self, slot: usize) -> Option<(u16, u16)> {
                StateView::position(self, slot)
            }
        }
    };
}

board_via_view!(ReadGuard);
board_via_view!(WriteGuard);

impl BoardMut for WriteGuard<'_> {
    fn set_cell(&mut self, x: i32, y: i32, value: CellValue) -> StateResult<()> {
        WriteGuard::set_cell(self, x, y, value)
    }

    fn set_position(&mut self, slot: usize, x: u16, y: u16) -> StateResult<()> {
        WriteGuard::set_position(self, slot, x, y)
    }

    fn credit_valid_move(&mut self, slot: usize, reward: u32) -> StateResult<()> {
        WriteGuard::credit_valid_move(self, slot, reward)
    }

    fn record_invalid_move(&mut self, slot: usize) -> StateResult<()> {
        WriteGuard::record_invalid_move(self, slot)
    }

    fn set_blocked(&mut self, slot: usize, blocked: bool) -> StateResult<()> {
        WriteGuard::set_blocked(self, slot, blocked)
    }
}
