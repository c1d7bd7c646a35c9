// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! gridlock observer: renders the board after every change

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use gridlock_observability::{init_logging, parse_debug_flags};
use gridlock_runtime::cli::{without_debug_flags, ObserverArgs};
use gridlock_runtime::{run_observer, TerminalRenderer};
use gridlock_state_manager::Arena;
use tracing::{info, info_span, warn};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gridlock-observer: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<()> {
    let args = ObserverArgs::parse_from(without_debug_flags(std::env::args_os()));
    let _logging = init_logging("observer", &args.log_level, &parse_debug_flags(), None)?;
    let _span = info_span!("observer").entered();

    let arena = Arena::attach(&args.state, &args.sync).context("Failed to attach to arena")?;
    let dims = arena.dims();
    if (dims.width, dims.height) != (args.width, args.height) {
        warn!(
            "Arguments say {}x{} but the arena is {}x{}; using the arena",
            args.width, args.height, dims.width, dims.height
        );
    }

    let stdout = std::io::stdout();
    let color = !args.no_color && stdout.is_terminal();
    let mut renderer = TerminalRenderer::new(stdout.lock(), color);
    let frames = run_observer(&arena, &mut renderer)?;
    info!(frames, "Observer done");
    Ok(())
}
