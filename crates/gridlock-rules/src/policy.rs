// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Agent move policies
//!
//! The protocol only requires one byte per granted turn; how that byte is chosen is
//! up to the policy.

use crate::board::Board;
use crate::direction::Move;
use crate::moves::claimable_neighbours;

/// Chooses an agent's next move from a consistent view of the board
pub trait MovePolicy: Send {
    fn name(&self) -> &'static str;

    fn choose(&mut self, board: &dyn Board, slot: usize) -> Move;
}

/// Step onto the most valuable neighbour; first in scan order wins ties
#[derive(Debug, Clone, Copy, Default)]
pub struct Greedy;

impl MovePolicy for Greedy {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn choose(&mut self, board: &dyn Board, slot: usize) -> Move {
        let Some((x, y)) = board.position(slot) else {
            return Move::pass();
        };

        let mut best = None;
        for (direction, value) in claimable_neighbours(board, x, y) {
            // Strictly greater keeps the earliest of equal values
            if best.map_or(true, |(_, best_value)| value > best_value) {
                best = Some((direction, value));
            }
        }

        best.map_or_else(Move::pass, |(direction, _)| Move::Step(direction))
    }
}

/// Look up a policy by name
pub fn policy_by_name(name: &str) -> Option<Box<dyn MovePolicy>> {
    match name {
        "greedy" => Some(Box::new(Greedy)),
        _ => None,
    }
}
