//! World state management.
//!
//! Holds every snake, powerup and wall, the per-tick id sets and the
//! powerup spawner. The movement and lifecycle rules are in
//! [`crate::lifecycle`].

use protocol::packets::WallMessage;
use protocol::{LineWriter, ProtocolError};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::collision;
use crate::config::{Config, GameMode};
use crate::entity::{Powerup, Snake, Wall};
use crate::geometry::Vector2D;
use crate::lifecycle::SpawnError;

/// Clearance between a respawned head and the world border.
pub const RESPAWN_BAND: f64 = 100.0;
/// Extra wall clearance for a respawned head.
pub const RESPAWN_WALL_MARGIN: f64 = 150.0;
/// Extra wall clearance for a new powerup.
pub const POWERUP_WALL_MARGIN: f64 = 10.0;
/// Hit margin around powerups and body segments.
pub const ENTITY_MARGIN: f64 = 10.0;
/// A turn is only allowed once the head has moved this far from the last pivot.
pub const TURN_CADENCE: f64 = 10.0;
/// Random placement gives up after this many rejected positions.
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 1000;

/// Simulation tunables, copied out of the config once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Tunables {
    pub speed: f64,
    pub start_length: f64,
    /// Frames of growth per powerup.
    pub growth: u32,
    pub max_powerups: usize,
    pub powerup_delay: u32,
    pub respawn_rate: u32,
    pub boost_enabled: bool,
    pub boost_stall: u32,
    pub boosting_time: u32,
}

impl Tunables {
    pub fn from_config(config: &Config) -> Self {
        Self {
            speed: config.snake.speed,
            start_length: config.snake.start_length,
            growth: config.snake.growth,
            max_powerups: config.powerup.max,
            powerup_delay: config.powerup.delay,
            respawn_rate: config.world.respawn_rate,
            boost_enabled: config.world.mode == GameMode::Extra,
            boost_stall: config.snake.boost_stall,
            boosting_time: config.snake.boosting_time,
        }
    }
}

impl Default for Tunables {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// The square world, centered on the origin.
#[derive(Debug, Clone, Copy)]
pub struct WorldBorder {
    pub size: f64,
    pub half: f64,
}

impl WorldBorder {
    pub fn new(size: f64) -> Self {
        Self {
            size,
            half: size / 2.0,
        }
    }

    /// A random point with integer coordinates, at least `inset` away from
    /// the border on the low side and `inset` short of it on the high side.
    /// Fails without drawing if no integer coordinate fits.
    pub fn random_point<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        inset: f64,
    ) -> Result<Vector2D, SpawnError> {
        let lo = (-self.half + inset) as i64;
        let hi = (self.half - inset) as i64;
        if lo >= hi {
            return Err(SpawnError::PlacementFailed { attempts: 0 });
        }
        Ok(Vector2D::new(
            rng.random_range(lo..hi) as f64,
            rng.random_range(lo..hi) as f64,
        ))
    }
}

/// The game world.
#[derive(Debug)]
pub struct World {
    pub border: WorldBorder,
    pub tunables: Tunables,

    pub snakes: HashMap<u32, Snake>,
    pub powerups: HashMap<u32, Powerup>,
    pub walls: HashMap<u32, Wall>,

    /// Snakes currently growing.
    pub growing: HashSet<u32>,
    /// Snakes currently boosting.
    pub boosting: HashSet<u32>,
    /// Dead snakes waiting to respawn.
    pub dead: HashSet<u32>,

    /// Frames the powerup population has been short.
    powerup_spawn_frames: u32,
}

impl World {
    pub fn new(size: f64, tunables: Tunables) -> Self {
        Self {
            border: WorldBorder::new(size),
            tunables,
            snakes: HashMap::new(),
            powerups: HashMap::with_capacity(64),
            walls: HashMap::new(),
            growing: HashSet::new(),
            boosting: HashSet::new(),
            dead: HashSet::new(),
            powerup_spawn_frames: 0,
        }
    }

    /// Build the world described by `config`, walls included.
    pub fn from_config(config: &Config) -> Self {
        let mut world = Self::new(config.world.size, Tunables::from_config(config));
        for wall in &config.walls {
            world.add_wall(Wall::from(wall));
        }
        world
    }

    #[inline]
    pub fn size(&self) -> f64 {
        self.border.size
    }

    pub fn add_wall(&mut self, wall: Wall) {
        self.walls.insert(wall.id, wall);
    }

    pub fn add_snake(&mut self, snake: Snake) {
        self.snakes.insert(snake.id, snake);
    }

    /// Remove a snake and every id-set entry that refers to it.
    pub fn remove_snake(&mut self, id: u32) -> Option<Snake> {
        self.growing.remove(&id);
        self.boosting.remove(&id);
        self.dead.remove(&id);
        self.snakes.remove(&id)
    }

    /// Snake ids in ascending order. Every per-snake pass uses this order.
    pub fn snake_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.snakes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn wall_messages(&self) -> Vec<WallMessage> {
        let mut walls: Vec<&Wall> = self.walls.values().collect();
        walls.sort_unstable_by_key(|w| w.id);
        walls.iter().map(|w| w.to_message()).collect()
    }

    /// Find a powerup location clear of every wall.
    pub fn random_powerup_location<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Vector2D, SpawnError> {
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let location = self.border.random_point(rng, 0.0)?;
            if !collision::wall_collision(self.walls.values(), location, POWERUP_WALL_MARGIN) {
                return Ok(location);
            }
        }
        Err(SpawnError::PlacementFailed {
            attempts: MAX_PLACEMENT_ATTEMPTS,
        })
    }

    /// Create up to `count` powerups. Ids start at the current population
    /// size and skip ids still in use. Returns how many were created.
    pub fn spawn_powerups<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) -> usize {
        let mut next_id = self.powerups.len() as u32;
        let mut spawned = 0;
        for _ in 0..count {
            while self.powerups.contains_key(&next_id) {
                next_id += 1;
            }
            match self.random_powerup_location(rng) {
                Ok(location) => {
                    self.powerups.insert(next_id, Powerup::new(next_id, location));
                    next_id += 1;
                    spawned += 1;
                }
                Err(e) => {
                    warn!("Powerup spawn skipped: {}", e);
                    break;
                }
            }
        }
        spawned
    }

    /// Refill the powerup population once it has been short for
    /// `powerup_delay` frames.
    pub fn update_powerup_spawner<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let max = self.tunables.max_powerups;
        let count = self.powerups.len();
        if count >= max {
            return 0;
        }
        self.powerup_spawn_frames += 1;
        if self.powerup_spawn_frames < self.tunables.powerup_delay {
            return 0;
        }
        self.powerup_spawn_frames = 0;
        let spawned = self.spawn_powerups(max - count, rng);
        debug!("Spawned {} powerups", spawned);
        spawned
    }

    /// Append one JSON line per snake, then one per powerup, each in id order.
    pub fn write_frame(&self, out: &mut LineWriter) -> Result<(), ProtocolError> {
        for id in self.snake_ids() {
            if let Some(snake) = self.snakes.get(&id) {
                out.put_json(&snake.to_message())?;
            }
        }
        let mut powerups: Vec<&Powerup> = self.powerups.values().collect();
        powerups.sort_unstable_by_key(|p| p.id);
        for powerup in powerups {
            out.put_json(&powerup.to_message())?;
        }
        Ok(())
    }

    /// Close out a tick after its frame has been serialized: drop consumed
    /// powerups and snakes whose disconnect has now been broadcast, and clear
    /// the one-frame flags.
    pub fn end_tick(&mut self) {
        self.powerups.retain(|_, p| !p.died);

        let gone: Vec<u32> = self
            .snakes
            .values()
            .filter(|s| s.disconnected)
            .map(|s| s.id)
            .collect();
        for id in gone {
            self.remove_snake(id);
        }

        for snake in self.snakes.values_mut() {
            snake.died = false;
            snake.joined = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn test_world() -> World {
        World::from_config(&Config::default())
    }

    #[test]
    fn test_random_point_bounds() {
        let border = WorldBorder::new(2000.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let p = border.random_point(&mut rng, RESPAWN_BAND).unwrap();
            assert!(p.x >= -900.0 && p.x < 900.0);
            assert!(p.y >= -900.0 && p.y < 900.0);
            assert_eq!(p.x.fract(), 0.0);
        }
    }

    #[test]
    fn test_random_point_empty_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let narrow = WorldBorder::new(201.0);
        assert_eq!(
            narrow.random_point(&mut rng, RESPAWN_BAND),
            Err(SpawnError::PlacementFailed { attempts: 0 })
        );
        assert!(WorldBorder::new(f64::NAN).random_point(&mut rng, 0.0).is_err());
        let p = WorldBorder::new(202.0).random_point(&mut rng, RESPAWN_BAND).unwrap();
        assert!((-1.0..1.0).contains(&p.x) && (-1.0..1.0).contains(&p.y));
    }

    #[test]
    fn test_powerups_avoid_walls() {
        let mut world = test_world();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(world.spawn_powerups(200, &mut rng), 200);
        for p in world.powerups.values() {
            assert!(!collision::wall_collision(world.walls.values(), p.location, POWERUP_WALL_MARGIN));
        }
    }

    #[test]
    fn test_spawn_ids_skip_existing() {
        let mut world = test_world();
        let mut rng = StdRng::seed_from_u64(2);
        world.powerups.insert(1, Powerup::new(1, Vector2D::new(500.0, 500.0)));
        world.spawn_powerups(2, &mut rng);
        let mut ids: Vec<u32> = world.powerups.keys().copied().collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_spawner_waits_for_delay() {
        let mut world = test_world();
        world.tunables.max_powerups = 3;
        world.tunables.powerup_delay = 5;
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..4 {
            assert_eq!(world.update_powerup_spawner(&mut rng), 0);
        }
        assert_eq!(world.update_powerup_spawner(&mut rng), 3);
        assert_eq!(world.powerups.len(), 3);
        // Full population: the counter does not advance.
        assert_eq!(world.update_powerup_spawner(&mut rng), 0);
    }

    #[test]
    fn test_walled_in_world_fails_placement() {
        let mut world = World::new(400.0, Tunables::default());
        // Vertical walls every 50 units leave no clear point.
        for i in 0..9u32 {
            let x = -200.0 + 50.0 * i as f64;
            world.add_wall(Wall::new(i, Vector2D::new(x, -200.0), Vector2D::new(x, 200.0)));
        }
        let mut rng = StdRng::seed_from_u64(4);
        assert!(matches!(
            world.random_powerup_location(&mut rng),
            Err(SpawnError::PlacementFailed { attempts: MAX_PLACEMENT_ATTEMPTS })
        ));
        assert_eq!(world.spawn_powerups(2, &mut rng), 0);
    }

    #[test]
    fn test_frame_order_and_end_tick() {
        let mut world = test_world();
        world.add_snake(Snake::new(5, "b".into(), 120.0));
        world.add_snake(Snake::new(2, "a".into(), 120.0));
        world.powerups.insert(9, Powerup::new(9, Vector2D::new(500.0, 500.0)));
        world.powerups.insert(4, Powerup::new(4, Vector2D::new(-500.0, 500.0)));
        world.powerups.get_mut(&9).unwrap().died = true;
        world.snakes.get_mut(&5).unwrap().disconnected = true;

        let mut out = LineWriter::new();
        world.write_frame(&mut out).unwrap();
        let bytes = out.finish();
        let text = std::str::from_utf8(&bytes).unwrap();
        let ids: Vec<u64> = text
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![2, 5, 4, 9]);

        world.end_tick();
        assert!(!world.snakes.contains_key(&5));
        assert!(!world.powerups.contains_key(&9));
        assert!(world.powerups.contains_key(&4));
        assert!(!world.snakes[&2].joined);
    }
}
