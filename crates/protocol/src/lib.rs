//! Shared protocol crate for the snake server.
//!
//! This crate contains:
//! - Newline framing (`LineReader` / `LineWriter`)
//! - Client command parsing and server message definitions
//! - Shared types (Direction, Point, Position)

mod error;
mod line;
pub mod packets;

pub use error::ProtocolError;
pub use line::{LineReader, LineWriter, MAX_LINE_LENGTH};
pub use packets::Direction;

use serde::{Deserialize, Serialize};

/// World position, in world units. The world is centered on the origin
/// and `y` grows downwards.
pub type Position = glam::DVec2;

/// A position as it appears on the wire: `{"x":..,"y":..}`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<Position> for Point {
    fn from(p: Position) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<Point> for Position {
    fn from(p: Point) -> Self {
        Position::new(p.x, p.y)
    }
}
