// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Create / attach / destroy lifecycle of the shared arena

use gridlock_state_manager::{
    Arena, ArenaDims, ArenaRole, CellValue, SemaphoreCounts, StateError, MAX_AGENTS,
};
use std::path::PathBuf;
use std::time::Duration;

struct Paths {
    _dir: tempfile::TempDir,
    state: PathBuf,
    sync: PathBuf,
}

fn paths() -> Paths {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("game_state");
    let sync = dir.path().join("game_sync");
    Paths {
        _dir: dir,
        state,
        sync,
    }
}

fn dims(width: u16, height: u16, agent_count: usize) -> ArenaDims {
    ArenaDims {
        width,
        height,
        agent_count,
    }
}

#[test]
fn test_attach_sees_owner_writes() {
    let p = paths();
    let owner = Arena::create(&p.state, &p.sync, dims(4, 3, 2), false).unwrap();
    assert_eq!(owner.role(), ArenaRole::Owner);

    {
        let mut guard = owner.write().unwrap();
        guard.set_cell(1, 2, CellValue::Reward(6)).unwrap();
        guard.set_cell(0, 0, CellValue::Occupied(1)).unwrap();
        guard.set_position(1, 0, 0).unwrap();
        guard.set_pid(1, 4242).unwrap();
        guard.credit_valid_move(1, 6).unwrap();
        guard.record_invalid_move(0).unwrap();
    }

    let attached = Arena::attach(&p.state, &p.sync).unwrap();
    assert_eq!(attached.role(), ArenaRole::Attached);
    assert_eq!(attached.dims(), dims(4, 3, 2));

    let view = attached.read().unwrap();
    assert_eq!(view.cell(1, 2), Some(6));
    assert_eq!(view.cell_value(0, 0), Some(CellValue::Occupied(1)));
    assert_eq!(view.position(1), Some((0, 0)));
    assert_eq!(view.find_slot_by_pid(4242), Some(1));
    assert_eq!(view.find_slot_by_pid(1), None);

    let agent = view.agent(1).unwrap();
    assert_eq!(agent.score, 6);
    assert_eq!(agent.valid_moves, 1);
    assert_eq!(view.agent(0).unwrap().invalid_moves, 1);
    assert!(view.agent(2).is_none());
    assert!(!view.game_over());
    view.release().unwrap();

    drop(attached);
    owner.destroy().unwrap();
    assert!(!p.state.exists());
    assert!(!p.sync.exists());
}

#[test]
fn test_attached_arena_cannot_write_or_destroy() {
    let p = paths();
    let owner = Arena::create(&p.state, &p.sync, dims(2, 2, 1), false).unwrap();
    let attached = Arena::attach(&p.state, &p.sync).unwrap();

    assert!(matches!(attached.write(), Err(StateError::NotOwner)));
    assert!(matches!(attached.destroy(), Err(StateError::NotOwner)));

    // A failed write attempt must not leave the writer lock held
    owner.write().unwrap().release().unwrap();
    owner.destroy().unwrap();
}

#[test]
fn test_stale_segments_refused_then_reclaimed() {
    let p = paths();
    let first = Arena::create(&p.state, &p.sync, dims(2, 2, 1), false).unwrap();
    // Simulate a crashed run: leave the files behind
    std::mem::forget(first);

    assert!(matches!(
        Arena::create(&p.state, &p.sync, dims(2, 2, 1), false),
        Err(StateError::StaleSegment { .. })
    ));

    let reclaimed = Arena::create(&p.state, &p.sync, dims(3, 3, 1), true).unwrap();
    assert_eq!(reclaimed.dims().width, 3);
    reclaimed.destroy().unwrap();
}

#[test]
fn test_attach_rejects_foreign_files() {
    let p = paths();
    std::fs::write(&p.state, vec![0u8; 4096]).unwrap();
    std::fs::write(&p.sync, vec![0u8; 4096]).unwrap();
    assert!(matches!(
        Arena::attach(&p.state, &p.sync),
        Err(StateError::InvalidLayout { .. })
    ));
}

#[test]
fn test_attach_missing_segment() {
    let p = paths();
    assert!(matches!(
        Arena::attach(&p.state, &p.sync),
        Err(StateError::Segment { .. })
    ));
}

#[test]
fn test_invalid_dims_create_nothing() {
    let p = paths();
    assert!(matches!(
        Arena::create(&p.state, &p.sync, dims(5, 5, MAX_AGENTS + 1), false),
        Err(StateError::AgentCount { .. })
    ));
    assert!(!p.state.exists());
    assert!(!p.sync.exists());
}

#[test]
fn test_semaphore_initial_counts() {
    let p = paths();
    let arena = Arena::create(&p.state, &p.sync, dims(2, 2, 3), false).unwrap();
    assert_eq!(
        arena.semaphore_counts().unwrap(),
        SemaphoreCounts {
            render_needed: 0,
            render_done: 0,
            writer_admission: 1,
            state_lock: 1,
            reader_count_guard: 1,
        }
    );
    for slot in 0..3 {
        assert_eq!(arena.turn_gate(slot).unwrap().value().unwrap(), 0);
    }
    assert!(arena.turn_gate(3).is_err());
    arena.destroy().unwrap();
}

#[test]
fn test_turn_gate_crosses_mappings() {
    let p = paths();
    let owner = Arena::create(&p.state, &p.sync, dims(2, 2, 2), false).unwrap();
    let attached = Arena::attach(&p.state, &p.sync).unwrap();

    let gate = attached.turn_gate(1).unwrap();
    assert!(!gate.try_wait().unwrap());
    owner.turn_gate(1).unwrap().post().unwrap();
    assert!(gate.wait_timeout(Duration::from_secs(1)).unwrap());
    assert!(!gate.try_wait().unwrap());

    drop(attached);
    owner.destroy().unwrap();
}

#[test]
fn test_game_over_is_visible_to_readers() {
    let p = paths();
    let owner = Arena::create(&p.state, &p.sync, dims(2, 2, 1), false).unwrap();
    let attached = Arena::attach(&p.state, &p.sync).unwrap();

    owner.write().unwrap().set_game_over();
    assert!(attached.read().unwrap().game_over());
    assert!(attached.unguarded_view().snapshot().game_over);

    drop(attached);
    owner.destroy().unwrap();
}
