use core::fmt;
use serde::{Deserialize, Serialize};

/// Single-tick movement shared by the environment and the human key mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PrimitiveAction {
    Right = 0,
    Down = 1,
    Left = 2,
    Up = 3,
    Stay = 4,
}

impl PrimitiveAction {
    pub const ALL: [PrimitiveAction; 5] = [
        PrimitiveAction::Right,
        PrimitiveAction::Down,
        PrimitiveAction::Left,
        PrimitiveAction::Up,
        PrimitiveAction::Stay,
    ];

    /// Movement directions in the order the path planner expands neighbours.
    pub const MOVES: [PrimitiveAction; 4] = [
        PrimitiveAction::Right,
        PrimitiveAction::Down,
        PrimitiveAction::Left,
        PrimitiveAction::Up,
    ];

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PrimitiveAction::Right),
            1 => Some(PrimitiveAction::Down),
            2 => Some(PrimitiveAction::Left),
            3 => Some(PrimitiveAction::Up),
            4 => Some(PrimitiveAction::Stay),
            _ => None,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Grid offset as `(dx, dy)`; `y` grows downwards.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            PrimitiveAction::Right => (1, 0),
            PrimitiveAction::Down => (0, 1),
            PrimitiveAction::Left => (-1, 0),
            PrimitiveAction::Up => (0, -1),
            PrimitiveAction::Stay => (0, 0),
        }
    }

    /// Maps a browser key name to its primitive action. Only arrow keys move.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowRight" => Some(PrimitiveAction::Right),
            "ArrowDown" => Some(PrimitiveAction::Down),
            "ArrowLeft" => Some(PrimitiveAction::Left),
            "ArrowUp" => Some(PrimitiveAction::Up),
            _ => None,
        }
    }

    /// Inverse of [`PrimitiveAction::from_key`], with `"Stay"` for the idle action.
    pub const fn key_label(self) -> &'static str {
        match self {
            PrimitiveAction::Right => "ArrowRight",
            PrimitiveAction::Down => "ArrowDown",
            PrimitiveAction::Left => "ArrowLeft",
            PrimitiveAction::Up => "ArrowUp",
            PrimitiveAction::Stay => "Stay",
        }
    }
}

impl fmt::Display for PrimitiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PrimitiveAction::Right => "right",
            PrimitiveAction::Down => "down",
            PrimitiveAction::Left => "left",
            PrimitiveAction::Up => "up",
            PrimitiveAction::Stay => "stay",
        };
        f.write_str(label)
    }
}

/// High-level, possibly multi-tick action emitted by a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MacroAction {
    Stay = 0,
    GetLettuce = 1,
    GetPlate = 2,
    GoToKnife1 = 3,
    GoToKnife2 = 4,
    Deliver = 5,
    Right = 6,
    Down = 7,
    Left = 8,
    Up = 9,
}

impl MacroAction {
    pub const COUNT: usize = 10;

    pub const ALL: [MacroAction; MacroAction::COUNT] = [
        MacroAction::Stay,
        MacroAction::GetLettuce,
        MacroAction::GetPlate,
        MacroAction::GoToKnife1,
        MacroAction::GoToKnife2,
        MacroAction::Deliver,
        MacroAction::Right,
        MacroAction::Down,
        MacroAction::Left,
        MacroAction::Up,
    ];

    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Macro actions that resolve to one primitive step without navigation.
    pub const fn as_primitive(self) -> Option<PrimitiveAction> {
        match self {
            MacroAction::Stay => Some(PrimitiveAction::Stay),
            MacroAction::Right => Some(PrimitiveAction::Right),
            MacroAction::Down => Some(PrimitiveAction::Down),
            MacroAction::Left => Some(PrimitiveAction::Left),
            MacroAction::Up => Some(PrimitiveAction::Up),
            _ => None,
        }
    }
}

impl fmt::Display for MacroAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MacroAction::Stay => "stay",
            MacroAction::GetLettuce => "get lettuce",
            MacroAction::GetPlate => "get plate",
            MacroAction::GoToKnife1 => "go to knife 1",
            MacroAction::GoToKnife2 => "go to knife 2",
            MacroAction::Deliver => "deliver",
            MacroAction::Right => "right",
            MacroAction::Down => "down",
            MacroAction::Left => "left",
            MacroAction::Up => "up",
        };
        f.write_str(label)
    }
}
