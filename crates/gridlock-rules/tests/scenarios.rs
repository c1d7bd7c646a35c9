// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Rules applied to the shared arena through its guards

use gridlock_rules::{
    apply_move, is_blocked, place_agents, refresh_blocked, Board, Direction, Greedy, InvalidMove,
    Move, MoveOutcome, MovePolicy,
};
use gridlock_state_manager::{Arena, ArenaDims, CellValue};

fn arena(dir: &tempfile::TempDir, width: u16, height: u16, agents: usize) -> Arena {
    Arena::create(
        &dir.path().join("state"),
        &dir.path().join("sync"),
        ArenaDims {
            width,
            height,
            agent_count: agents,
        },
        false,
    )
    .unwrap()
}

#[test]
fn test_two_by_two_walk_then_wall() {
    let dir = tempfile::tempdir().unwrap();
    let arena = arena(&dir, 2, 2, 1);
    {
        let mut guard = arena.write().unwrap();
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            guard.set_cell(x, y, CellValue::Reward(1)).unwrap();
        }
        place_agents(&mut guard).unwrap();

        let first = apply_move(&mut guard, 0, Move::Step(Direction::Right)).unwrap();
        assert_eq!(first, MoveOutcome::Valid { reward: 1, x: 1, y: 0 });
        assert_eq!(guard.cell_value(1, 0), Some(CellValue::Occupied(0)));

        let second = apply_move(&mut guard, 0, Move::Step(Direction::Right)).unwrap();
        assert_eq!(
            second,
            MoveOutcome::Invalid(InvalidMove::OutOfBounds { x: 2, y: 0 })
        );
    }

    let snapshot = arena.read().unwrap().snapshot();
    let agent = &snapshot.agents[0];
    assert_eq!(agent.score, 1);
    assert_eq!(agent.valid_moves, 1);
    assert_eq!(agent.invalid_moves, 1);
    assert_eq!((agent.x, agent.y), (1, 0));
    arena.destroy().unwrap();
}

#[test]
fn test_surrounded_agent_blocked_without_moving() {
    let dir = tempfile::tempdir().unwrap();
    let arena = arena(&dir, 3, 3, 2);
    {
        let mut guard = arena.write().unwrap();
        // Agent 1 owns the ring around the centre
        for y in 0..3 {
            for x in 0..3 {
                guard.set_cell(x, y, CellValue::Occupied(1)).unwrap();
            }
        }
        guard.set_cell(1, 1, CellValue::Occupied(0)).unwrap();
        guard.set_position(0, 1, 1).unwrap();
        guard.set_position(1, 0, 0).unwrap();

        let newly = refresh_blocked(&mut guard, 0..2).unwrap();
        assert_eq!(newly, vec![0, 1]);
        assert_eq!(guard.agent(0).unwrap().valid_moves, 0);
    }

    let reader = Arena::attach(&dir.path().join("state"), &dir.path().join("sync")).unwrap();
    let view = reader.read().unwrap();
    assert!(view.snapshot().all_blocked());
    assert!(is_blocked(&*view, 0).unwrap());
    drop(view);
    drop(reader);
    arena.destroy().unwrap();
}

#[test]
fn test_greedy_reads_through_reader_guard() {
    let dir = tempfile::tempdir().unwrap();
    let arena = arena(&dir, 3, 1, 1);
    {
        let mut guard = arena.write().unwrap();
        guard.set_cell(0, 0, CellValue::Reward(2)).unwrap();
        guard.set_cell(1, 0, CellValue::Occupied(0)).unwrap();
        guard.set_cell(2, 0, CellValue::Reward(8)).unwrap();
        guard.set_position(0, 1, 0).unwrap();
    }

    let reader = Arena::attach(&dir.path().join("state"), &dir.path().join("sync")).unwrap();
    let guard = reader.read().unwrap();
    assert_eq!(guard.width(), 3);
    let mv = Greedy.choose(&*guard, 0);
    guard.release().unwrap();
    assert_eq!(mv, Move::Step(Direction::Right));

    drop(reader);
    arena.destroy().unwrap();
}
