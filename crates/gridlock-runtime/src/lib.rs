// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # gridlock Runtime
//!
//! The three process roles of a game:
//!
//! - **orchestrator** ([`game::run_game`], [`orchestrator::Orchestrator`]): owns the
//!   arena, grants turns, validates moves, drives the observer
//! - **agent** ([`agent::run_agent`]): one byte per granted turn on its stdout
//! - **observer** ([`observer::run_observer`]): renders every frame
//!
//! Binaries: `gridlock`, `gridlock-agent`, `gridlock-observer`.

pub mod agent;
pub mod channel;
pub mod cli;
pub mod error;
pub mod game;
pub mod observer;
pub mod orchestrator;
pub mod renderer;
pub mod report;
pub mod spawn;

pub use agent::{resolve_slot, run_agent, AgentExit};
pub use channel::{poll_ready, AgentChannel, ChannelRead, MoveSource};
pub use error::{RuntimeError, RuntimeResult};
pub use game::{publish_report, run_game};
pub use observer::run_observer;
pub use orchestrator::{EndReason, ObserverProcess, Orchestrator, ScheduleSettings};
pub use renderer::{Renderer, TerminalRenderer};
pub use report::{AgentReport, ExitReport, GameReport};
