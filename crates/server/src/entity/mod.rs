//! Game entities.
//!
//! Snakes, powerups and walls. Entities are plain data owned by the
//! [`World`](crate::world::World); the rules that move them live in
//! [`lifecycle`](crate::lifecycle) and [`collision`](crate::collision).

mod powerup;
mod snake;
mod wall;

pub use powerup::Powerup;
pub use snake::Snake;
pub use wall::Wall;
