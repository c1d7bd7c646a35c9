// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Runtime error types

use gridlock_config::ConfigError;
use gridlock_state_manager::StateError;
use std::io;
use std::path::PathBuf;

/// Runtime error types
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Channel wait failed: {0}")]
    Poll(#[source] io::Error),

    #[error("Agent channel write failed: {0}")]
    ChannelWrite(#[source] io::Error),

    #[error("Render failed: {0}")]
    Render(#[source] io::Error),

    #[error("Could not determine agent slot: {0}")]
    AgentSlot(String),

    #[error("Report output failed: {0}")]
    Report(String),
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;
