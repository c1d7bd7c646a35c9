// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! State manager error types

use std::io;
use std::path::PathBuf;

/// State manager error types
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Segment {path} already exists (stale run?); enable shm.reclaim_stale to remove it")]
    StaleSegment { path: PathBuf },

    #[error("Segment I/O on {path}: {source}")]
    Segment {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Segment {path} has invalid layout: {reason}")]
    InvalidLayout { path: PathBuf, reason: String },

    #[error("Semaphore {op} failed: {source}")]
    Semaphore {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Invalid agent count {count} (expected 1..={max})")]
    AgentCount { count: usize, max: usize },

    #[error("Invalid board extents {width}x{height}")]
    BoardExtents { width: u16, height: u16 },

    #[error("Agent slot {slot} out of range (agent count {agent_count})")]
    InvalidSlot { slot: usize, agent_count: usize },

    #[error("Cell ({x}, {y}) outside {width}x{height} board")]
    OutOfBounds { x: i32, y: i32, width: u16, height: u16 },

    #[error("Arena attached read-only; only the owner may write")]
    NotOwner,
}

impl StateError {
    pub(crate) fn segment(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StateError::Segment {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn semaphore(op: &'static str) -> Self {
        StateError::Semaphore {
            op,
            source: io::Error::last_os_error(),
        }
    }
}

/// Result type for state manager operations
pub type StateResult<T> = Result<T, StateError>;
