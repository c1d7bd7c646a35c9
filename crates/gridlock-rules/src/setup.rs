// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Board setup: reward generation and initial placement

use gridlock_state_manager::{CellValue, StateResult};
use rand::Rng;
use tracing::debug;

use crate::board::BoardMut;

/// Fill every cell with a uniform reward in `min..=max`
pub fn fill_rewards<B, R>(board: &mut B, rng: &mut R, min: i32, max: i32) -> StateResult<()>
where
    B: BoardMut + ?Sized,
    R: Rng,
{
    let (min, max) = (min.max(1), max.max(min.max(1)));
    for y in 0..board.height() as i32 {
        for x in 0..board.width() as i32 {
            board.set_cell(x, y, CellValue::Reward(rng.gen_range(min..=max)))?;
        }
    }
    Ok(())
}

/// Preferred starting cell of `slot`: corners, edge centres, then the centre
pub fn anchor(slot: usize, width: u16, height: u16) -> (u16, u16) {
    let (right, bottom) = (width.saturating_sub(1), height.saturating_sub(1));
    let (mid_x, mid_y) = (width / 2, height / 2);
    match slot % 9 {
        0 => (0, 0),
        1 => (right, 0),
        2 => (0, bottom),
        3 => (right, bottom),
        4 => (mid_x, 0),
        5 => (mid_x, bottom),
        6 => (0, mid_y),
        7 => (right, mid_y),
        _ => (mid_x, mid_y),
    }
}

/// Place every agent on its anchor, or on the first unoccupied cell in row-major
/// order when the anchor is taken. Placement awards no points.
pub fn place_agents<B: BoardMut + ?Sized>(board: &mut B) -> StateResult<Vec<(u16, u16)>> {
    let (width, height) = (board.width(), board.height());
    let mut positions: Vec<(u16, u16)> = Vec::with_capacity(board.agent_count());

    for slot in 0..board.agent_count() {
        let preferred = anchor(slot, width, height);
        let position = if positions.contains(&preferred) {
            (0..height)
                .flat_map(|y| (0..width).map(move |x| (x, y)))
                .find(|cell| !positions.contains(cell))
                .unwrap_or(preferred)
        } else {
            preferred
        };

        board.set_cell(
            position.0 as i32,
            position.1 as i32,
            CellValue::Occupied(slot),
        )?;
        board.set_position(slot, position.0, position.1)?;
        debug!(slot, x = position.0, y = position.1, "placed agent");
        positions.push(position);
    }
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::memory::MemoryBoard;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_anchor_table_on_default_board() {
        let expected = [
            (0, 0),
            (9, 0),
            (0, 9),
            (9, 9),
            (5, 0),
            (5, 9),
            (0, 5),
            (9, 5),
            (5, 5),
        ];
        for (slot, cell) in expected.iter().enumerate() {
            assert_eq!(anchor(slot, 10, 10), *cell);
        }
    }

    #[test]
    fn test_colliding_anchors_fall_back_row_major() {
        let mut board = MemoryBoard::filled(2, 2, 4, 3);
        let placed = place_agents(&mut board).unwrap();
        assert_eq!(placed, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);

        let mut board = MemoryBoard::filled(1, 3, 3, 3);
        let placed = place_agents(&mut board).unwrap();
        // Anchors (0,0), (0,0), (0,2): the second agent takes (0,1)
        assert_eq!(placed, vec![(0, 0), (0, 1), (0, 2)]);
        assert_eq!(board.cell(0, 1), Some(CellValue::occupied_by(1)));
        assert_eq!(board.agent(1).unwrap().score, 0);
    }

    #[test]
    fn test_rewards_seeded_and_in_range() {
        let mut a = MemoryBoard::filled(6, 5, 1, 0);
        let mut b = MemoryBoard::filled(6, 5, 1, 0);
        fill_rewards(&mut a, &mut StdRng::seed_from_u64(7), 1, 9).unwrap();
        fill_rewards(&mut b, &mut StdRng::seed_from_u64(7), 1, 9).unwrap();
        assert_eq!(a.cells(), b.cells());
        assert!(a.cells().iter().all(|&v| (1..=9).contains(&v)));
    }
}
