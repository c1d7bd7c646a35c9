// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Move codes on the agent channel
//!
//! Bytes `0..=7` are the eight neighbour directions clockwise from up. Every other byte
//! is a pass; agents send [`PASS_CODE`] when they have nothing to claim.

use std::fmt;

/// Byte an agent sends when it has no move
pub const PASS_CODE: u8 = 9;

/// Neighbour direction, clockwise from up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    Up = 0,
    UpRight = 1,
    Right = 2,
    DownRight = 3,
    Down = 4,
    DownLeft = 5,
    Left = 6,
    UpLeft = 7,
}

impl Direction {
    /// Scan order used for tie-breaking
    pub const ALL: [Direction; 8] = [
        Direction::Up,
        Direction::UpRight,
        Direction::Right,
        Direction::DownRight,
        Direction::Down,
        Direction::DownLeft,
        Direction::Left,
        Direction::UpLeft,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// `(dx, dy)` with y growing downwards
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::UpRight => (1, -1),
            Direction::Right => (1, 0),
            Direction::DownRight => (1, 1),
            Direction::Down => (0, 1),
            Direction::DownLeft => (-1, 1),
            Direction::Left => (-1, 0),
            Direction::UpLeft => (-1, -1),
        }
    }

    /// Target of a step from `(x, y)`; may be off the board
    pub fn step_from(self, x: u16, y: u16) -> (i32, i32) {
        let (dx, dy) = self.delta();
        (x as i32 + dx, y as i32 + dy)
    }
}

/// One decoded channel byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Step(Direction),
    /// Pass or malformed byte, kept for logging
    Pass(u8),
}

impl Move {
    pub fn decode(byte: u8) -> Self {
        match Direction::from_code(byte) {
            Some(direction) => Move::Step(direction),
            None => Move::Pass(byte),
        }
    }

    pub fn encode(self) -> u8 {
        match self {
            Move::Step(direction) => direction.code(),
            Move::Pass(byte) => byte,
        }
    }

    pub fn pass() -> Self {
        Move::Pass(PASS_CODE)
    }
}

impl From<u8> for Move {
    fn from(byte: u8) -> Self {
        Move::decode(byte)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Step(direction) => write!(f, "{:?}", direction),
            Move::Pass(byte) => write!(f, "pass({})", byte),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_clockwise_from_up() {
        assert_eq!(Move::decode(0), Move::Step(Direction::Up));
        assert_eq!(Move::decode(2), Move::Step(Direction::Right));
        assert_eq!(Move::decode(4), Move::Step(Direction::Down));
        assert_eq!(Move::decode(7), Move::Step(Direction::UpLeft));
        assert_eq!(Direction::Right.step_from(0, 0), (1, 0));
        assert_eq!(Direction::UpLeft.step_from(0, 0), (-1, -1));
    }

    #[test]
    fn test_other_bytes_pass() {
        assert_eq!(Move::decode(PASS_CODE), Move::pass());
        assert_eq!(Move::decode(8), Move::Pass(8));
        assert_eq!(Move::decode(b'A'), Move::Pass(b'A'));
        assert_eq!(Move::Pass(200).encode(), 200);
        assert_eq!(Move::Step(Direction::DownLeft).encode(), 5);
    }

    #[test]
    fn test_deltas_cover_neighbourhood() {
        let mut seen: Vec<(i32, i32)> = Direction::ALL.iter().map(|d| d.delta()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 8);
        assert!(!seen.contains(&(0, 0)));
    }
}
