// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-process board, for simulations and tests

use gridlock_state_manager::{CellValue, StateError, StateResult};

use crate::board::{Board, BoardMut};

/// Agent state held by a [`MemoryBoard`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryAgent {
    pub x: u16,
    pub y: u16,
    pub score: u32,
    pub valid_moves: u32,
    pub invalid_moves: u32,
    pub blocked: bool,
}

/// Board backed by plain vectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBoard {
    width: u16,
    height: u16,
    cells: Vec<i32>,
    agents: Vec<MemoryAgent>,
}

impl MemoryBoard {
    /// Board with every cell set to `value`
    pub fn filled(width: u16, height: u16, agent_count: usize, value: i32) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width as usize * height as usize],
            agents: vec![MemoryAgent::default(); agent_count],
        }
    }

    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    pub fn agent(&self, slot: usize) -> Option<&MemoryAgent> {
        self.agents.get(slot)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        (x >= 0 && y >= 0 && x < self.width as i32 && y < self.height as i32)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    fn agent_mut(&mut self, slot: usize) -> StateResult<&mut MemoryAgent> {
        let agent_count = self.agents.len();
        self.agents
            .get_mut(slot)
            .ok_or(StateError::InvalidSlot { slot, agent_count })
    }
}

impl Board for MemoryBoard {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn agent_count(&self) -> usize {
        self.agents.len()
    }

    fn cell(&self, x: i32, y: i32) -> Option<i32> {
        self.index(x, y).map(|i| self.cells[i])
    }

    fn position(&self, slot: usize) -> Option<(u16, u16)> {
        self.agents.get(slot).map(|a| (a.x, a.y))
    }
}

impl BoardMut for MemoryBoard {
    fn set_cell(&mut self, x: i32, y: i32, value: CellValue) -> StateResult<()> {
        let index = self.index(x, y).ok_or(StateError::OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        })?;
        self.cells[index] = value.encode();
        Ok(())
    }

    fn set_position(&mut self, slot: usize, x: u16, y: u16) -> StateResult<()> {
        let agent = self.agent_mut(slot)?;
        agent.x = x;
        agent.y = y;
        Ok(())
    }

    fn credit_valid_move(&mut self, slot: usize, reward: u32) -> StateResult<()> {
        let agent = self.agent_mut(slot)?;
        agent.score += reward;
        agent.valid_moves += 1;
        Ok(())
    }

    fn record_invalid_move(&mut self, slot: usize) -> StateResult<()> {
        self.agent_mut(slot)?.invalid_moves += 1;
        Ok(())
    }

    fn set_blocked(&mut self, slot: usize, blocked: bool) -> StateResult<()> {
        self.agent_mut(slot)?.blocked = blocked;
        Ok(())
    }
}
