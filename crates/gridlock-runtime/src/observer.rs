// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Observer process loop

use gridlock_state_manager::Arena;
use tracing::{info, warn};

use crate::agent::ParentWatch;
use crate::error::{RuntimeError, RuntimeResult};
use crate::renderer::Renderer;

/// Render one frame per `render_needed` until a game-over frame has been drawn.
///
/// Reads without the reader protocol: the orchestrator is parked on `render_done` for
/// the whole time between the two posts. Returns the number of frames drawn.
pub fn run_observer(arena: &Arena, renderer: &mut dyn Renderer) -> RuntimeResult<u64> {
    let watch = ParentWatch::new();
    let mut frames: u64 = 0;

    loop {
        if !watch.wait(arena.render_needed())? {
            warn!(frames, "Orchestrator exited; stopping");
            return Ok(frames);
        }

        let snapshot = arena.unguarded_view().snapshot();
        let rendered = renderer.render(&snapshot);
        // Release the orchestrator even when drawing failed
        arena.render_done().post()?;
        rendered.map_err(RuntimeError::Render)?;
        frames += 1;

        if snapshot.game_over {
            info!(frames, "Final frame rendered");
            return Ok(frames);
        }
    }
}
