use serde::{Deserialize, Serialize};

/// A screen position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

/// Column and row of a token in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub col: usize,
    pub row: usize,
}

/// Teaching role of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Plain,
    Yellow,
    Red,
    Blue,
}

impl TokenKind {
    /// Palette slot of the token's undimmed color.
    pub fn base_slot(self) -> usize {
        match self {
            TokenKind::Plain => 2,
            TokenKind::Red => 4,
            TokenKind::Yellow => 8,
            TokenKind::Blue => 12,
        }
    }

    /// Row used when docking tokens during the align phase.
    pub fn role(self) -> Option<i32> {
        match self {
            TokenKind::Plain => None,
            TokenKind::Yellow => Some(1),
            TokenKind::Red => Some(2),
            TokenKind::Blue => Some(3),
        }
    }

    pub fn is_active(self) -> bool {
        self != TokenKind::Plain
    }
}

/// Simulated physical motion applied to active tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionMode {
    None,
    Random,
    RandomStrong,
    Align,
    TiltLeft,
    TiltRight,
}

impl MotionMode {
    pub fn is_active(self) -> bool {
        self != MotionMode::None
    }
}

/// Background sheet currently in front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backdrop {
    Light,
    Dark,
}

/// One tilt reading, in sample units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}
