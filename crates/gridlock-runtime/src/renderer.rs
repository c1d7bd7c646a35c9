// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Board rendering for the observer

use std::io::{self, Write};

use gridlock_state_manager::{ArenaSnapshot, CellValue};

/// Draws one frame per snapshot
pub trait Renderer {
    fn render(&mut self, snapshot: &ArenaSnapshot) -> io::Result<()>;
}

const RESET: &str = "\x1b[0m";
const CLEAR: &str = "\x1b[2J\x1b[H";
const AGENT_COLORS: [&str; 9] = [
    "\x1b[31m", "\x1b[32m", "\x1b[33m", "\x1b[34m", "\x1b[35m", "\x1b[36m", "\x1b[91m",
    "\x1b[92m", "\x1b[93m",
];

/// Text renderer: board, agent table, game-over banner
///
/// Agent heads show as `P<n>`, claimed trail cells as `.<n>`. With colour enabled each
/// agent's cells use its own colour and the screen is cleared between frames.
pub struct TerminalRenderer<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, slot: usize, text: &str) -> String {
        if self.color {
            format!("{}{}{}", AGENT_COLORS[slot % AGENT_COLORS.len()], text, RESET)
        } else {
            text.to_string()
        }
    }

    fn cell_text(&self, snapshot: &ArenaSnapshot, x: u16, y: u16) -> String {
        if let Some(slot) = snapshot.agent_at(x, y) {
            return self.paint(slot, &format!("{:>3}", format!("P{}", slot)));
        }
        match snapshot.cell_value(x, y) {
            Some(CellValue::Reward(value)) => format!("{:>3}", value),
            Some(CellValue::Occupied(slot)) => {
                self.paint(slot, &format!("{:>3}", format!(".{}", slot)))
            }
            Some(CellValue::Empty) | None => format!("{:>3}", "."),
        }
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn render(&mut self, snapshot: &ArenaSnapshot) -> io::Result<()> {
        let mut frame = String::new();
        if self.color {
            frame.push_str(CLEAR);
        }

        for y in 0..snapshot.height {
            for x in 0..snapshot.width {
                frame.push_str(&self.cell_text(snapshot, x, y));
                frame.push(' ');
            }
            frame.push('\n');
        }
        frame.push('\n');

        for agent in &snapshot.agents {
            let line = format!(
                "{:<16} score {:>4}  valid {:>4}  invalid {:>4}  at ({},{}){}",
                agent.name,
                agent.score,
                agent.valid_moves,
                agent.invalid_moves,
                agent.x,
                agent.y,
                if agent.blocked { " [BLOCKED]" } else { "" }
            );
            frame.push_str(&self.paint(agent.slot, &line));
            frame.push('\n');
        }

        if snapshot.game_over {
            frame.push_str("\n=== GAME OVER ===\n");
        }

        self.out.write_all(frame.as_bytes())?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlock_state_manager::AgentSnapshot;

    fn snapshot(game_over: bool) -> ArenaSnapshot {
        ArenaSnapshot {
            width: 3,
            height: 1,
            game_over,
            cells: vec![-1, -1, 4],
            agents: vec![AgentSnapshot {
                slot: 0,
                name: "Player_0".to_string(),
                score: 5,
                valid_moves: 1,
                invalid_moves: 0,
                x: 1,
                y: 0,
                pid: 1,
                blocked: false,
            }],
        }
    }

    #[test]
    fn test_plain_frame() {
        let mut renderer = TerminalRenderer::new(Vec::new(), false);
        renderer.render(&snapshot(false)).unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        let first_line = text.lines().next().unwrap();
        assert_eq!(first_line, " .0  P0   4 ");
        assert!(text.contains("Player_0"));
        assert!(!text.contains("GAME OVER"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_game_over_banner_and_color() {
        let mut renderer = TerminalRenderer::new(Vec::new(), true);
        renderer.render(&snapshot(true)).unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(text.starts_with(CLEAR));
        assert!(text.contains(AGENT_COLORS[0]));
        assert!(text.contains("=== GAME OVER ==="));
    }
}
