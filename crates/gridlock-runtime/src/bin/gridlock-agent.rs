// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! gridlock agent: sends one move byte on stdout per granted turn

use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use gridlock_observability::{init_logging, parse_debug_flags};
use gridlock_rules::policy_by_name;
use gridlock_runtime::cli::{without_debug_flags, AgentArgs};
use gridlock_runtime::spawn::ENV_AGENT_SLOT;
use gridlock_runtime::{resolve_slot, run_agent};
use gridlock_state_manager::Arena;
use tracing::{info_span, warn};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gridlock-agent: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<()> {
    let args = AgentArgs::parse_from(without_debug_flags(std::env::args_os()));

    // Children share the orchestrator's stderr; stdout is the move channel
    let label = args
        .slot
        .map(|slot| slot.to_string())
        .or_else(|| std::env::var(ENV_AGENT_SLOT).ok())
        .unwrap_or_else(|| std::process::id().to_string());
    let _logging = init_logging(
        &format!("agent-{}", label),
        &args.log_level,
        &parse_debug_flags(),
        None,
    )?;

    let arena = Arena::attach(&args.state, &args.sync).context("Failed to attach to arena")?;
    let dims = arena.dims();
    if (dims.width, dims.height) != (args.width, args.height) {
        warn!(
            "Arguments say {}x{} but the arena is {}x{}; using the arena",
            args.width, args.height, dims.width, dims.height
        );
    }

    let slot = resolve_slot(&arena, args.slot)?;
    let _span = info_span!("agent", slot).entered();

    let Some(mut policy) = policy_by_name(&args.policy) else {
        bail!("Unknown policy {:?}", args.policy);
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_agent(&arena, slot, policy.as_mut(), &mut out)?;
    Ok(())
}
