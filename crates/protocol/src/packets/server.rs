//! Server -> Client message building.

use serde::{Deserialize, Serialize};

use crate::{LineWriter, Point, ProtocolError};

/// A snake as broadcast every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnakeMessage {
    pub id: u32,
    pub name: String,
    /// Vertices from tail (first) to head (last).
    pub body: Vec<Point>,
    pub direction: Point,
    pub score: u32,
    /// True only in the frame of the tick the snake died.
    pub died: bool,
    pub alive: bool,
    pub disconnected: bool,
    /// True only in the first frame after the player joined.
    pub joined: bool,
}

/// A powerup as broadcast every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerupMessage {
    pub id: u32,
    pub location: Point,
    /// True in the single frame after it was consumed.
    pub died: bool,
}

/// A wall as sent once during the handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallMessage {
    pub id: u32,
    pub p1: Point,
    pub p2: Point,
}

/// Build the handshake reply: the player id, the world side length, then
/// one line per wall.
pub fn build_handshake(
    player_id: u32,
    world_size: f64,
    walls: &[WallMessage],
) -> Result<LineWriter, ProtocolError> {
    let mut w = LineWriter::with_capacity(32 + walls.len() * 64);
    w.put_line(&player_id.to_string());
    w.put_line(&world_size.to_string());
    for wall in walls {
        w.put_json(wall)?;
    }
    Ok(w)
}
