use protocol::packets::WallMessage;

use crate::config::WallConfig;
use crate::geometry::{Aabb, Vector2D};

/// Half the thickness of a wall.
pub const WALL_HALF_WIDTH: f64 = 30.0;

/// An immutable axis-aligned wall segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    pub id: u32,
    pub p1: Vector2D,
    pub p2: Vector2D,
}

impl Wall {
    pub fn new(id: u32, p1: Vector2D, p2: Vector2D) -> Self {
        Self { id, p1, p2 }
    }

    /// The solid region of the wall plus `extra` clearance.
    #[inline]
    pub fn bounds(&self, extra: f64) -> Aabb {
        Aabb::around_segment(self.p1, self.p2, WALL_HALF_WIDTH + extra)
    }

    pub fn to_message(&self) -> WallMessage {
        WallMessage {
            id: self.id,
            p1: self.p1.into(),
            p2: self.p2.into(),
        }
    }
}

impl From<&WallConfig> for Wall {
    fn from(config: &WallConfig) -> Self {
        Self::new(config.id, config.p1.into(), config.p2.into())
    }
}
