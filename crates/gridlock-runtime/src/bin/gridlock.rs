// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! gridlock orchestrator

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gridlock_observability::{init_logging, parse_debug_flags};
use gridlock_runtime::cli::{without_debug_flags, OrchestratorArgs};
use gridlock_runtime::{publish_report, run_game};
use tracing::{info, info_span, warn};

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("gridlock: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<u8> {
    let args = OrchestratorArgs::parse_from(without_debug_flags(std::env::args_os()));
    let config = args.load_config().context("Invalid configuration")?;

    let _logging = init_logging(
        "orchestrator",
        &config.logging.level,
        &parse_debug_flags(),
        config.logging.log_dir.clone(),
    )?;
    let _span = info_span!("orchestrator").entered();

    // SIGINT and SIGTERM end the game through the normal termination sequence
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        warn!("Shutdown signal received");
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install signal handler")?;

    info!(
        "Starting {}x{} game with {} agents (delay {}ms, timeout {}s)",
        config.board.width,
        config.board.height,
        config.processes.agents.len(),
        config.schedule.delay_ms,
        config.schedule.timeout_secs
    );

    let report = run_game(&config, interrupted).context("Game could not start")?;
    publish_report(&report, config.report.json_path.as_deref())
        .context("Failed to publish report")?;

    Ok(report.exit_code as u8)
}
