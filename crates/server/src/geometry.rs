//! Geometry primitives.
//!
//! Positions and directions are `glam::DVec2` (re-exported from the
//! protocol crate as `Position`). Normalizing uses `normalize_or_zero`, so a
//! zero-length segment yields a zero vector rather than NaN.

use glam::DVec2;

pub use protocol::Position as Vector2D;

/// An axis-aligned box, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector2D,
    pub max: Vector2D,
}

impl Aabb {
    /// The box spanned by the segment `a`..`b`, grown by `margin` on all sides.
    /// The endpoints may be given in either order.
    #[inline]
    pub fn around_segment(a: Vector2D, b: Vector2D, margin: f64) -> Self {
        let grow = DVec2::splat(margin);
        Self {
            min: a.min(b) - grow,
            max: a.max(b) + grow,
        }
    }

    /// The box `point ± margin`.
    #[inline]
    pub fn around_point(point: Vector2D, margin: f64) -> Self {
        Self::around_segment(point, point, margin)
    }

    #[inline]
    pub fn contains(&self, point: Vector2D) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

/// True if the segment runs purely horizontally or vertically.
#[inline]
pub fn is_axis_aligned(a: Vector2D, b: Vector2D) -> bool {
    a.x == b.x || a.y == b.y
}

/// True if the segment covers more than `limit` on either axis. Only the
/// jump left behind by a wraparound can do that.
#[inline]
pub fn spans_more_than(a: Vector2D, b: Vector2D, limit: f64) -> bool {
    (a - b).abs().max_element() > limit
}
