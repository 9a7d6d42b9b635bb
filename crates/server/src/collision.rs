//! Collision detection.
//!
//! All tests are axis-aligned boxes, inclusive on the edges:
//! - Head against walls (wall half-width plus an optional clearance)
//! - Head against powerups
//! - Head against its own body, past the most recent U-turn
//! - Head against the bodies of other living snakes

use protocol::Direction;

use crate::entity::{Powerup, Snake, Wall};
use crate::geometry::{Aabb, Vector2D, spans_more_than};
use crate::world::ENTITY_MARGIN;

/// True if `point` lies inside any wall grown by `extra`.
#[inline]
pub fn wall_collision<'a>(
    walls: impl IntoIterator<Item = &'a Wall>,
    point: Vector2D,
    extra: f64,
) -> bool {
    walls.into_iter().any(|w| w.bounds(extra).contains(point))
}

/// The live powerup the head is touching, if any. When several qualify the
/// lowest id wins.
pub fn powerup_collision<'a>(
    powerups: impl IntoIterator<Item = &'a Powerup>,
    head: Vector2D,
) -> Option<u32> {
    powerups
        .into_iter()
        .filter(|p| !p.died && Aabb::around_point(p.location, ENTITY_MARGIN).contains(head))
        .map(|p| p.id)
        .min()
}

/// True if the head touches its own body.
///
/// Only segments from the most recent one running against `dir` back to the
/// tail can be hit; anything newer is still ahead of or beside the head. A
/// body without such a segment cannot collide with itself.
pub fn self_collision(body: &[Vector2D], dir: Direction, world_size: f64) -> bool {
    let n = body.len();
    if n < 3 {
        return false;
    }
    let head = body[n - 1];
    let back = -dir.unit();

    let first = (1..n - 1).rev().find(|&i| {
        let seg = (body[i] - body[i - 1]).normalize_or_zero();
        (seg.x != 0.0 && seg.x == back.x) || (seg.y != 0.0 && seg.y == back.y)
    });
    let Some(first) = first else {
        return false;
    };

    (1..=first).rev().any(|i| segment_hit(body[i - 1], body[i], head, world_size))
}

/// True if `head` touches any living snake other than `id`.
pub fn snake_collision<'a>(
    snakes: impl IntoIterator<Item = &'a Snake>,
    id: u32,
    head: Vector2D,
    world_size: f64,
) -> bool {
    snakes
        .into_iter()
        .filter(|s| s.alive && s.id != id)
        .any(|s| {
            s.body
                .windows(2)
                .any(|w| segment_hit(w[0], w[1], head, world_size))
        })
}

/// A wraparound jump is never solid.
#[inline]
fn segment_hit(a: Vector2D, b: Vector2D, point: Vector2D, world_size: f64) -> bool {
    !spans_more_than(a, b, world_size) && Aabb::around_segment(a, b, ENTITY_MARGIN).contains(point)
}
