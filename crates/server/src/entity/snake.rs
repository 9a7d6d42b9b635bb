use protocol::Direction;
use protocol::packets::SnakeMessage;

use crate::geometry::{Vector2D, is_axis_aligned, spans_more_than};

/// A player-controlled snake.
///
/// `body` is the polyline from tail (first) to head (last) and always has at
/// least two vertices. A wraparound leaves a pair of vertices on opposite
/// borders; the jump between them is not part of the snake.
#[derive(Debug, Clone)]
pub struct Snake {
    pub id: u32,
    pub name: String,
    pub body: Vec<Vector2D>,
    pub dir: Direction,
    pub score: u32,

    pub alive: bool,
    /// True only for the tick the snake died.
    pub died: bool,
    pub disconnected: bool,
    /// True only for the first broadcast after joining.
    pub joined: bool,

    // Boost state
    pub can_boost: bool,
    pub boosting_frames: u32,
    pub boost_stall_frames: u32,

    // Growth state
    pub growing: bool,
    pub frames_growing: u32,

    pub frames_dead: u32,
}

impl Snake {
    /// A freshly joined snake. Its body is a placeholder until the first
    /// respawn places it in the world.
    pub fn new(id: u32, name: String, start_length: f64) -> Self {
        Self {
            id,
            name,
            body: vec![Vector2D::ZERO, Vector2D::new(start_length, 0.0)],
            dir: Direction::Right,
            score: 0,
            alive: true,
            died: false,
            disconnected: false,
            joined: true,
            can_boost: true,
            boosting_frames: 0,
            boost_stall_frames: 0,
            growing: false,
            frames_growing: 0,
            frames_dead: 0,
        }
    }

    #[inline]
    pub fn head(&self) -> Vector2D {
        self.body[self.body.len() - 1]
    }

    /// Vector from the vertex before the head to the head.
    #[inline]
    pub fn head_segment(&self) -> Vector2D {
        let n = self.body.len();
        self.body[n - 1] - self.body[n - 2]
    }

    /// Total length of the drawn body, skipping wraparound jumps.
    pub fn length(&self, world_size: f64) -> f64 {
        self.body
            .windows(2)
            .filter(|w| !spans_more_than(w[0], w[1], world_size))
            .map(|w| w[0].distance(w[1]))
            .sum()
    }

    /// True if every drawn segment is horizontal or vertical.
    pub fn is_orthogonal(&self, world_size: f64) -> bool {
        self.body
            .windows(2)
            .all(|w| spans_more_than(w[0], w[1], world_size) || is_axis_aligned(w[0], w[1]))
    }

    /// Pull the tail forward along the body by `amount`.
    ///
    /// Crosses as many pivots as needed. When the tail reaches a vertex left
    /// outside the world by a wraparound, that vertex is dropped together
    /// with the jump so the tail continues from the opposite border.
    pub fn contract_tail(&mut self, amount: f64, half_size: f64) {
        let mut remaining = amount;
        while remaining > 0.0 {
            let (tail, next) = (self.body[0], self.body[1]);
            let gap = tail.distance(next);
            if gap > remaining || self.body.len() == 2 {
                self.body[0] = tail + (next - tail).normalize_or_zero() * remaining.min(gap);
                break;
            }
            remaining -= gap;
            self.body.remove(0);
            if self.body.len() > 2 && is_outside(self.body[0], half_size) {
                self.body.remove(0);
            }
        }
        debug_assert!(self.body.len() >= 2);
    }

    /// If the head left the world, continue it from the opposite border.
    /// Returns true if the snake wrapped.
    pub fn wrap_around(&mut self, half_size: f64) -> bool {
        let head = self.head();
        let entry = if head.x > half_size {
            Vector2D::new(-half_size, head.y)
        } else if head.x < -half_size {
            Vector2D::new(half_size, head.y)
        } else if head.y > half_size {
            Vector2D::new(head.x, -half_size)
        } else if head.y < -half_size {
            Vector2D::new(head.x, half_size)
        } else {
            return false;
        };
        self.body.push(entry);
        self.body.push(entry);
        true
    }

    pub fn to_message(&self) -> SnakeMessage {
        SnakeMessage {
            id: self.id,
            name: self.name.clone(),
            body: self.body.iter().map(|&p| p.into()).collect(),
            direction: self.dir.unit().into(),
            score: self.score,
            died: self.died,
            alive: self.alive,
            disconnected: self.disconnected,
            joined: self.joined,
        }
    }
}

#[inline]
fn is_outside(point: Vector2D, half_size: f64) -> bool {
    point.x.abs() > half_size || point.y.abs() > half_size
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snake_with(body: &[(f64, f64)]) -> Snake {
        let mut snake = Snake::new(1, "s".into(), 120.0);
        snake.body = body.iter().map(|&(x, y)| Vector2D::new(x, y)).collect();
        snake
    }

    #[test]
    fn test_contract_straight() {
        let mut snake = snake_with(&[(0.0, 0.0), (120.0, 0.0)]);
        snake.contract_tail(6.0, 1000.0);
        assert_eq!(snake.body[0], Vector2D::new(6.0, 0.0));
        assert_eq!(snake.body.len(), 2);
    }

    #[test]
    fn test_orthogonal_body() {
        let turned = snake_with(&[(0.0, 0.0), (4.0, 0.0), (4.0, 100.0)]);
        assert!(turned.is_orthogonal(2000.0));
        let wrapped = snake_with(&[(998.0, 0.0), (1002.0, 5.0), (-1000.0, 0.0), (-900.0, 0.0)]);
        assert!(!wrapped.is_orthogonal(2000.0));
        let jump = snake_with(&[(998.0, 0.0), (1002.0, 0.0), (-1000.0, 3.0), (-1000.0, 90.0)]);
        assert!(jump.is_orthogonal(2000.0));
        let diagonal = snake_with(&[(0.0, 0.0), (10.0, 10.0)]);
        assert!(!diagonal.is_orthogonal(2000.0));
    }

    #[test]
    fn test_contract_across_pivot() {
        let mut snake = snake_with(&[(0.0, 0.0), (4.0, 0.0), (4.0, 100.0)]);
        snake.contract_tail(6.0, 1000.0);
        assert_eq!(snake.body, vec![Vector2D::new(4.0, 2.0), Vector2D::new(4.0, 100.0)]);
    }

    #[test]
    fn test_contract_drops_zero_length_tail() {
        let mut snake = snake_with(&[(4.0, 0.0), (4.0, 0.0), (4.0, 100.0)]);
        snake.contract_tail(6.0, 1000.0);
        assert_eq!(snake.body, vec![Vector2D::new(4.0, 6.0), Vector2D::new(4.0, 100.0)]);
    }

    #[test]
    fn test_contract_through_wrap_pair() {
        // Tail is 2 short of the vertex the head left the world at.
        let mut snake = snake_with(&[
            (998.0, 0.0),
            (1002.0, 0.0),
            (-1000.0, 0.0),
            (-900.0, 0.0),
        ]);
        snake.contract_tail(6.0, 1000.0);
        assert_eq!(
            snake.body,
            vec![Vector2D::new(-998.0, 0.0), Vector2D::new(-900.0, 0.0)]
        );
        assert!((snake.length(2000.0) - 98.0).abs() < 1e-9);
    }

    #[test]
    fn test_wrap_around_appends_entry_pair() {
        let mut snake = snake_with(&[(900.0, 5.0), (1003.0, 5.0)]);
        assert!(snake.wrap_around(1000.0));
        assert_eq!(snake.body.len(), 4);
        assert_eq!(snake.head(), Vector2D::new(-1000.0, 5.0));
        assert_eq!(snake.body[2], snake.head());
        // The jump is not counted as body length.
        assert!((snake.length(2000.0) - 103.0).abs() < 1e-9);

        let mut inside = snake_with(&[(0.0, 0.0), (1000.0, 0.0)]);
        assert!(!inside.wrap_around(1000.0));
    }

    #[test]
    fn test_message_direction_vector() {
        let mut snake = snake_with(&[(0.0, 0.0), (0.0, -50.0)]);
        snake.dir = Direction::Up;
        let msg = snake.to_message();
        assert_eq!(msg.direction, protocol::Point::new(0.0, -1.0));
        assert_eq!(msg.body.len(), 2);
        assert!(msg.joined);
    }
}
