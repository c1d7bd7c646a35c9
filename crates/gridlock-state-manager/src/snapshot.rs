// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Owned copies of the arena, for rendering and reporting

use serde::{Deserialize, Serialize};

use crate::layout::CellValue;

/// One agent record at snapshot time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub slot: usize,
    pub name: String,
    pub score: u32,
    pub valid_moves: u32,
    pub invalid_moves: u32,
    pub x: u16,
    pub y: u16,
    pub pid: i32,
    pub blocked: bool,
}

/// Full arena copy: grid, live agent records and the game-over flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaSnapshot {
    pub width: u16,
    pub height: u16,
    pub game_over: bool,
    /// Row-major raw cell values
    pub cells: Vec<i32>,
    pub agents: Vec<AgentSnapshot>,
}

impl ArenaSnapshot {
    pub fn cell(&self, x: u16, y: u16) -> Option<i32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn cell_value(&self, x: u16, y: u16) -> Option<CellValue> {
        self.cell(x, y).map(CellValue::decode)
    }

    /// Slot of the agent standing on `(x, y)`, if any
    pub fn agent_at(&self, x: u16, y: u16) -> Option<usize> {
        self.agents
            .iter()
            .find(|a| a.x == x && a.y == y)
            .map(|a| a.slot)
    }

    pub fn all_blocked(&self) -> bool {
        self.agents.iter().all(|a| a.blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_lookup() {
        let snapshot = ArenaSnapshot {
            width: 2,
            height: 2,
            game_over: false,
            cells: vec![-1, 4, 3, 0],
            agents: vec![AgentSnapshot {
                slot: 0,
                name: "Player_0".to_string(),
                score: 0,
                valid_moves: 0,
                invalid_moves: 0,
                x: 0,
                y: 0,
                pid: 0,
                blocked: false,
            }],
        };
        assert_eq!(snapshot.cell(1, 0), Some(4));
        assert_eq!(snapshot.cell(0, 1), Some(3));
        assert_eq!(snapshot.cell(2, 0), None);
        assert_eq!(snapshot.cell_value(0, 0), Some(CellValue::Occupied(0)));
        assert_eq!(snapshot.agent_at(0, 0), Some(0));
        assert_eq!(snapshot.agent_at(1, 1), None);
        assert!(!snapshot.all_blocked());

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"game_over\":false"));
    }
}
