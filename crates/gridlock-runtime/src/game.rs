// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! One complete game: setup, spawn, schedule, shut down, report, tear down

use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use gridlock_config::GridlockConfig;
use gridlock_rules::{fill_rewards, place_agents, refresh_blocked};
use gridlock_state_manager::{Arena, ArenaDims, SegmentPaths};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

use crate::channel::AgentChannel;
use crate::error::RuntimeResult;
use crate::orchestrator::{EndReason, Orchestrator, ScheduleSettings};
use crate::report::{ExitReport, GameReport};
use crate::spawn::{spawn_agent, spawn_observer, wait_with_grace};

/// Time children get to exit after the termination broadcast
const CHILD_EXIT_GRACE: Duration = Duration::from_secs(5);

/// Name shown for each agent: the program's file stem when unique, else `Player_<slot>`
pub fn agent_names(programs: &[PathBuf]) -> Vec<String> {
    let stems: Vec<Option<String>> = programs
        .iter()
        .map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    stems
        .iter()
        .enumerate()
        .map(|(slot, stem)| match stem {
            Some(stem) if stems.iter().filter(|s| s.as_deref() == Some(stem)).count() == 1 => {
                stem.clone()
            }
            _ => format!("Player_{}", slot),
        })
        .collect()
}

fn resolve_seed(config: &GridlockConfig) -> u64 {
    config.board.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    })
}

/// Rewards, names, placement and the initial blocked evaluation
fn prepare_board(arena: &Arena, config: &GridlockConfig, seed: u64) -> RuntimeResult<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut guard = arena.write()?;
    fill_rewards(
        &mut guard,
        &mut rng,
        config.board.min_reward,
        config.board.max_reward,
    )?;
    for (slot, name) in agent_names(&config.processes.agents).iter().enumerate() {
        guard.set_name(slot, name)?;
    }
    let positions = place_agents(&mut guard)?;
    let blocked = refresh_blocked(&mut guard, 0..positions.len())?;
    guard.release()?;

    info!(seed, ?positions, "Board prepared");
    if !blocked.is_empty() {
        info!(?blocked, "Agents blocked from the start");
    }
    Ok(())
}

/// Children spawned so far
struct Children {
    agents: Vec<Child>,
    channels: Vec<AgentChannel>,
    observer: Option<Child>,
}

fn spawn_children(
    arena: &Arena,
    config: &GridlockConfig,
    children: &mut Children,
) -> RuntimeResult<()> {
    let paths = SegmentPaths::of(arena);
    let dims = arena.dims();

    // The observer goes first so it is waiting for the initial frame
    if let Some(program) = &config.processes.observer {
        children.observer = Some(spawn_observer(program, &paths, dims)?);
    }

    for (slot, program) in config.processes.agents.iter().enumerate() {
        let spawned = spawn_agent(program, slot, &paths, dims)?;
        children.agents.push(spawned.child);
        children.channels.push(spawned.channel);
    }

    let mut guard = arena.write()?;
    for (slot, child) in children.agents.iter().enumerate() {
        guard.set_pid(slot, child.id() as i32)?;
    }
    guard.release()?;
    Ok(())
}

fn wait_children(
    agents: Vec<Child>,
    observer: Option<Child>,
) -> (Vec<ExitReport>, Option<ExitReport>) {
    let exits = agents
        .into_iter()
        .enumerate()
        .map(|(slot, mut child)| {
            let exit = wait_with_grace(&mut child, CHILD_EXIT_GRACE);
            if exit.is_clean() {
                info!(slot, "Agent exited: {}", exit);
            } else {
                warn!(slot, "Agent exited: {}", exit);
            }
            exit
        })
        .collect();
    let observer = observer.map(|mut child| {
        let exit = wait_with_grace(&mut child, CHILD_EXIT_GRACE);
        info!("Observer exited: {}", exit);
        exit
    });
    (exits, observer)
}

/// Play one game with the given configuration.
///
/// Fails only if the arena cannot be created or prepared. Once children exist, every
/// later fault ends the game with [`EndReason::Fault`] and still produces a report.
pub fn run_game(config: &GridlockConfig, interrupted: Arc<AtomicBool>) -> RuntimeResult<GameReport> {
    let dims = ArenaDims {
        width: config.board.width,
        height: config.board.height,
        agent_count: config.processes.agents.len(),
    };
    let seed = resolve_seed(config);

    let arena = Arena::create(
        &config.shm.state_path(),
        &config.shm.sync_path(),
        dims,
        config.shm.reclaim_stale,
    )?;
    if let Err(e) = prepare_board(&arena, config, seed) {
        let _ = arena.destroy();
        return Err(e);
    }

    let mut children = Children {
        agents: Vec::new(),
        channels: Vec::new(),
        observer: None,
    };
    let started = spawn_children(&arena, config, &mut children);

    let mut orchestrator = Orchestrator::new(
        &arena,
        std::mem::take(&mut children.channels),
        children.observer.take(),
        ScheduleSettings::from(&config.schedule),
        interrupted,
    );

    let end_reason = match started {
        Err(e) => {
            error!("Startup failed: {}", e);
            EndReason::Fault(e.to_string())
        }
        Ok(()) => match orchestrator.render_handshake() {
            Ok(()) => orchestrator.run(),
            Err(e) => {
                error!("Initial render failed: {}", e);
                EndReason::Fault(e.to_string())
            }
        },
    };

    if let Err(e) = orchestrator.shutdown() {
        error!("Termination sequence incomplete: {}", e);
    }
    let observer = orchestrator.into_observer();
    let (exits, observer_exit) = wait_children(children.agents, observer);

    let snapshot = match arena.read() {
        Ok(guard) => guard.snapshot(),
        Err(e) => {
            warn!("Final read failed ({}); using unguarded view", e);
            arena.unguarded_view().snapshot()
        }
    };
    let report = GameReport::build(
        end_reason,
        seed,
        &snapshot,
        &config.processes.agents,
        exits,
        observer_exit,
    );

    if let Err(e) = arena.destroy() {
        error!("Arena teardown failed: {}", e);
    }
    Ok(report)
}

/// Print the report and write the JSON copy if configured
pub fn publish_report(report: &GameReport, json_path: Option<&Path>) -> RuntimeResult<()> {
    info!(
        end_reason = %report.end_reason,
        exit_code = report.exit_code,
        "Final report"
    );
    for agent in &report.agents {
        info!(
            slot = agent.slot,
            name = %agent.name,
            score = agent.score,
            valid = agent.valid_moves,
            invalid = agent.invalid_moves,
            exit = %agent.exit,
            "agent result"
        );
    }
    print!("{}", report.render_table());

    if let Some(path) = json_path {
        report.write_json(path)?;
        info!("Report written to {}", path.display());
    }
    Ok(())
}
