// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Move validation and blocked detection

use gridlock_state_manager::{CellValue, StateResult};
use tracing::trace;

use crate::board::{Board, BoardMut};
use crate::direction::{Direction, Move};

/// Why a move was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidMove {
    OutOfBounds { x: i32, y: i32 },
    NotClaimable(CellValue),
    Pass(u8),
}

/// Result of applying one move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Valid { reward: u32, x: u16, y: u16 },
    Invalid(InvalidMove),
}

impl MoveOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, MoveOutcome::Valid { .. })
    }
}

/// Validate and apply `mv` for agent `slot`.
///
/// Valid iff the target is on the board and strictly positive. A valid move adds the
/// target's value to the score, marks the target with the agent, moves the agent and
/// recomputes its blocked flag. An invalid move only counts as invalid.
pub fn apply_move<B: BoardMut + ?Sized>(
    board: &mut B,
    slot: usize,
    mv: Move,
) -> StateResult<MoveOutcome> {
    let (x, y) = board.position_or_err(slot)?;

    let direction = match mv {
        Move::Step(direction) => direction,
        Move::Pass(byte) => {
            board.record_invalid_move(slot)?;
            return Ok(MoveOutcome::Invalid(InvalidMove::Pass(byte)));
        }
    };

    let (tx, ty) = direction.step_from(x, y);
    let reward = match board.cell_value(tx, ty) {
        None => {
            board.record_invalid_move(slot)?;
            return Ok(MoveOutcome::Invalid(InvalidMove::OutOfBounds { x: tx, y: ty }));
        }
        Some(CellValue::Reward(reward)) if reward > 0 => reward as u32,
        Some(other) => {
            board.record_invalid_move(slot)?;
            return Ok(MoveOutcome::Invalid(InvalidMove::NotClaimable(other)));
        }
    };

    board.credit_valid_move(slot, reward)?;
    board.set_cell(tx, ty, CellValue::Occupied(slot))?;
    // In bounds, so both fit in u16
    let (tx, ty) = (tx as u16, ty as u16);
    board.set_position(slot, tx, ty)?;
    let blocked = is_blocked(board, slot)?;
    board.set_blocked(slot, blocked)?;

    trace!(slot, reward, x = tx, y = ty, blocked, "valid move");
    Ok(MoveOutcome::Valid {
        reward,
        x: tx,
        y: ty,
    })
}

/// Claimable neighbours of `(x, y)` in scan order
pub fn claimable_neighbours<B: Board + ?Sized>(
    board: &B,
    x: u16,
    y: u16,
) -> impl Iterator<Item = (Direction, i32)> + '_ {
    Direction::ALL.into_iter().filter_map(move |direction| {
        let (tx, ty) = direction.step_from(x, y);
        match board.cell_value(tx, ty) {
            Some(CellValue::Reward(value)) if value > 0 => Some((direction, value)),
            _ => None,
        }
    })
}

/// True when no strictly positive cell neighbours the agent
pub fn is_blocked<B: Board + ?Sized>(board: &B, slot: usize) -> StateResult<bool> {
    let (x, y) = board.position_or_err(slot)?;
    Ok(claimable_neighbours(board, x, y).next().is_none())
}

/// Mark each listed agent without a claimable neighbour as blocked.
///
/// Flags are only ever set here, never cleared: claimed cells stay claimed, so an
/// agent that is blocked once stays blocked. Returns the newly blocked slots.
pub fn refresh_blocked<B, I>(board: &mut B, slots: I) -> StateResult<Vec<usize>>
where
    B: BoardMut + ?Sized,
    I: IntoIterator<Item = usize>,
{
    let mut newly_blocked = Vec::new();
    for slot in slots {
        if is_blocked(board, slot)? {
            board.set_blocked(slot, true)?;
            newly_blocked.push(slot);
        }
    }
    Ok(newly_blocked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBoard;

    fn board_with_agent(width: u16, height: u16, value: i32, at: (u16, u16)) -> MemoryBoard {
        let mut board = MemoryBoard::filled(width, height, 1, value);
        board
            .set_cell(at.0 as i32, at.1 as i32, CellValue::Occupied(0))
            .unwrap();
        board.set_position(0, at.0, at.1).unwrap();
        board
    }

    #[test]
    fn test_step_onto_reward() {
        let mut board = board_with_agent(3, 3, 4, (1, 1));
        let outcome = apply_move(&mut board, 0, Move::Step(Direction::UpLeft)).unwrap();
        assert_eq!(outcome, MoveOutcome::Valid { reward: 4, x: 0, y: 0 });
        assert_eq!(board.cell(0, 0), Some(-1));
        // Path trail keeps the owner mark
        assert_eq!(board.cell(1, 1), Some(-1));
        assert_eq!(board.agent(0).unwrap().score, 4);
        assert!(!board.agent(0).unwrap().blocked);
    }

    #[test]
    fn test_step_onto_claimed_cell() {
        let mut board = board_with_agent(3, 1, 2, (0, 0));
        board.set_cell(1, 0, CellValue::Empty).unwrap();
        let outcome = apply_move(&mut board, 0, Move::Step(Direction::Right)).unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Invalid(InvalidMove::NotClaimable(CellValue::Empty))
        );
        assert_eq!(board.agent(0).unwrap().invalid_moves, 1);
        assert_eq!(board.position(0), Some((0, 0)));
    }

    #[test]
    fn test_pass_counts_invalid() {
        let mut board = board_with_agent(2, 2, 1, (0, 0));
        let outcome = apply_move(&mut board, 0, Move::pass()).unwrap();
        assert_eq!(outcome, MoveOutcome::Invalid(InvalidMove::Pass(9)));
        assert_eq!(board.agent(0).unwrap().invalid_moves, 1);
        assert_eq!(board.agent(0).unwrap().score, 0);
    }

    #[test]
    fn test_last_claim_blocks_mover() {
        let mut board = board_with_agent(2, 1, 5, (0, 0));
        apply_move(&mut board, 0, Move::Step(Direction::Right)).unwrap();
        assert!(board.agent(0).unwrap().blocked);
    }

    #[test]
    fn test_refresh_only_sets() {
        let mut board = MemoryBoard::filled(3, 2, 2, 1);
        board.set_cell(0, 0, CellValue::Occupied(0)).unwrap();
        board.set_cell(2, 0, CellValue::Occupied(1)).unwrap();
        board.set_position(1, 2, 0).unwrap();

        assert_eq!(refresh_blocked(&mut board, [0, 1]).unwrap(), Vec::<usize>::new());

        // Agent 0 claims every free cell
        for (x, y) in [(1, 0), (0, 1), (1, 1), (2, 1)] {
            board.set_cell(x, y, CellValue::Occupied(0)).unwrap();
        }
        assert_eq!(refresh_blocked(&mut board, [0, 1]).unwrap(), vec![0, 1]);
        assert!(board.agent(0).unwrap().blocked);
        assert!(board.agent(1).unwrap().blocked);
    }

    #[test]
    fn test_unknown_slot_is_an_error() {
        let mut board = MemoryBoard::filled(2, 2, 1, 1);
        assert!(apply_move(&mut board, 3, Move::pass()).is_err());
        assert!(is_blocked(&board, 1).is_err());
    }
}
