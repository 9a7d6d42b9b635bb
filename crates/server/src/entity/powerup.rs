use protocol::packets::PowerupMessage;

use crate::geometry::Vector2D;

/// A pickup that grows the snake that touches it.
#[derive(Debug, Clone, PartialEq)]
pub struct Powerup {
    pub id: u32,
    pub location: Vector2D,
    /// Set when consumed; the powerup is broadcast once more and then pruned.
    pub died: bool,
}

impl Powerup {
    pub fn new(id: u32, location: Vector2D) -> Self {
        Self {
            id,
            location,
            died: false,
        }
    }

    pub fn to_message(&self) -> PowerupMessage {
        PowerupMessage {
            id: self.id,
            location: self.location.into(),
            died: self.died,
        }
    }
}
