// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # gridlock-observability
//!
//! Unified logging initialisation for the orchestrator, agent and observer processes,
//! with per-crate debug flag support.
//!
//! Every process logs to **stderr**: an agent's stdout is its move channel and an
//! observer's stdout is the rendered board.
//!
//! ## Features
//! - `file-logging`: additional JSON log files with per-run folders and retention

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known gridlock crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "gridlock-config",
    "gridlock-state-manager",
    "gridlock-rules",
    "gridlock-runtime",
];
