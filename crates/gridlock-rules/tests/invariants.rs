// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Property tests: random games on the in-memory board

use gridlock_rules::{
    apply_move, fill_rewards, place_agents, refresh_blocked, Board, Move, MemoryBoard,
    MoveOutcome,
};
use gridlock_state_manager::CellValue;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn arb_game() -> impl Strategy<Value = (u16, u16, usize, u64, Vec<(usize, u8)>)> {
    (1u16..8, 1u16..8).prop_flat_map(|(width, height)| {
        let max_agents = (width as usize * height as usize).min(9);
        (
            Just(width),
            Just(height),
            1..=max_agents,
            any::<u64>(),
            prop::collection::vec((0usize..9, 0u8..12), 0..120),
        )
    })
}

fn setup(width: u16, height: u16, agents: usize, seed: u64) -> MemoryBoard {
    let mut board = MemoryBoard::filled(width, height, agents, 0);
    fill_rewards(&mut board, &mut StdRng::seed_from_u64(seed), 1, 9).unwrap();
    place_agents(&mut board).unwrap();
    refresh_blocked(&mut board, 0..agents).unwrap();
    board
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn no_two_agents_share_a_cell((width, height, agents, seed, moves) in arb_game()) {
        let mut board = setup(width, height, agents, seed);
        for (slot, byte) in moves {
            let slot = slot % agents;
            apply_move(&mut board, slot, Move::decode(byte)).unwrap();

            let mut positions: Vec<_> = (0..agents).map(|s| board.position(s).unwrap()).collect();
            positions.sort();
            positions.dedup();
            prop_assert_eq!(positions.len(), agents);

            // Every agent stands on its own mark
            for s in 0..agents {
                let (x, y) = board.position(s).unwrap();
                prop_assert_eq!(board.cell_value(x as i32, y as i32), Some(CellValue::Occupied(s)));
            }
        }
    }

    #[test]
    fn score_grows_by_consumed_reward((width, height, agents, seed, moves) in arb_game()) {
        let mut board = setup(width, height, agents, seed);
        for (slot, byte) in moves {
            let slot = slot % agents;
            let before = board.agent(slot).unwrap().clone();
            let mv = Move::decode(byte);

            let target = match mv {
                Move::Step(direction) => {
                    let (tx, ty) = direction.step_from(before.x, before.y);
                    board.cell(tx, ty)
                }
                Move::Pass(_) => None,
            };

            let outcome = apply_move(&mut board, slot, mv).unwrap();
            let after = board.agent(slot).unwrap();
            prop_assert!(after.score >= before.score);
            match outcome {
                MoveOutcome::Valid { reward, .. } => {
                    prop_assert_eq!(Some(reward as i32), target);
                    prop_assert_eq!(after.score, before.score + reward);
                    prop_assert_eq!(after.valid_moves, before.valid_moves + 1);
                    prop_assert_eq!(after.invalid_moves, before.invalid_moves);
                }
                MoveOutcome::Invalid(_) => {
                    prop_assert_eq!(after.score, before.score);
                    prop_assert_eq!(after.invalid_moves, before.invalid_moves + 1);
                    prop_assert_eq!((after.x, after.y), (before.x, before.y));
                }
            }
        }
    }

    #[test]
    fn total_score_matches_claimed_rewards((width, height, agents, seed, moves) in arb_game()) {
        let mut board = setup(width, height, agents, seed);
        let initial: i64 = board.cells().iter().filter(|&&v| v > 0).map(|&v| v as i64).sum();
        for (slot, byte) in moves {
            apply_move(&mut board, slot % agents, Move::decode(byte)).unwrap();
        }
        let remaining: i64 = board.cells().iter().filter(|&&v| v > 0).map(|&v| v as i64).sum();
        let scored: i64 = (0..agents).map(|s| board.agent(s).unwrap().score as i64).sum();
        prop_assert_eq!(initial - remaining, scored);
    }
}
