//! Snake lifecycle: turning, movement, growth, boosting, death and respawn.
//!
//! Everything here runs under the world lock as part of a tick. Snakes are
//! always visited in ascending id order, so a tick is deterministic for a
//! given command set and random source.

use protocol::Direction;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

use crate::collision;
use crate::entity::Snake;
use crate::world::{MAX_PLACEMENT_ATTEMPTS, RESPAWN_BAND, RESPAWN_WALL_MARGIN, TURN_CADENCE, World};

/// Random placement could not find a clear spot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("no clear position found after {attempts} attempts")]
    PlacementFailed { attempts: u32 },
}

/// What a direction request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Turned,
    Boosted,
    Ignored,
}

/// Result of one movement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// The head crossed the border and continues from the opposite edge.
    Wrapped,
    /// A collision during a non-lethal step; the step stops early.
    Blocked,
    Died,
}

/// Counts from one simulation step, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepSummary {
    pub deaths: usize,
    pub respawns: usize,
    pub powerups_spawned: usize,
}

impl World {
    /// Add a new player's snake and place it. If placement fails the snake
    /// joins dead and is retried by the respawn pass.
    pub fn join_snake<R: Rng + ?Sized>(
        &mut self,
        id: u32,
        name: String,
        rng: &mut R,
    ) -> Result<(), SpawnError> {
        let start_length = self.tunables.start_length;
        self.add_snake(Snake::new(id, name, start_length));
        let placed = self.respawn_snake(id, rng);
        if placed.is_err() {
            if let Some(snake) = self.snakes.get_mut(&id) {
                snake.alive = false;
                snake.frames_dead = self.tunables.respawn_rate;
            }
            self.dead.insert(id);
        }
        placed
    }

    /// Flag a snake whose owner left. It is broadcast once more and removed
    /// at the end of the tick.
    pub fn disconnect_snake(&mut self, id: u32) {
        if let Some(snake) = self.snakes.get_mut(&id) {
            snake.disconnected = true;
            snake.alive = false;
        }
        self.dead.remove(&id);
        self.boosting.remove(&id);
    }

    /// Apply one direction request.
    ///
    /// Re-pressing the current direction starts a boost when boosting is
    /// enabled and recharged. A reverse request is ignored. A perpendicular
    /// request turns once the head has moved more than [`TURN_CADENCE`]
    /// along the current segment, or not at all; the turn appends a pivot at
    /// the head.
    pub fn apply_direction(&mut self, id: u32, requested: Direction) -> TurnOutcome {
        let boost_enabled = self.tunables.boost_enabled;
        let size = self.border.size;
        let Some(snake) = self.snakes.get_mut(&id) else {
            return TurnOutcome::Ignored;
        };
        if !snake.alive {
            return TurnOutcome::Ignored;
        }

        if requested == snake.dir {
            if boost_enabled && snake.can_boost {
                snake.can_boost = false;
                snake.boosting_frames = 0;
                self.boosting.insert(id);
                return TurnOutcome::Boosted;
            }
            return TurnOutcome::Ignored;
        }
        if requested == snake.dir.opposite() {
            return TurnOutcome::Ignored;
        }

        let moved = snake.head_segment().length();
        if moved != 0.0 && moved <= TURN_CADENCE {
            return TurnOutcome::Ignored;
        }
        let head = snake.head();
        snake.body.push(head);
        snake.dir = requested;
        debug_assert!(snake.is_orthogonal(size));
        TurnOutcome::Turned
    }

    /// Apply the pending commands, lowest client id first.
    pub fn apply_commands(&mut self, commands: &HashMap<u32, Direction>) {
        let mut pending: Vec<(u32, Direction)> = commands.iter().map(|(&id, &dir)| (id, dir)).collect();
        pending.sort_unstable_by_key(|&(id, _)| id);
        for (id, dir) in pending {
            if self.apply_direction(id, dir) == TurnOutcome::Boosted {
                debug!("Snake {} boosting", id);
            }
        }
    }

    /// Advance boost and stall counters for every living snake. Returns the
    /// snakes that take an extra boost step this tick.
    pub fn begin_tick(&mut self) -> HashSet<u32> {
        let boost_stall = self.tunables.boost_stall;
        let boosting_time = self.tunables.boosting_time;
        let mut extra_steps = HashSet::new();

        for id in self.snake_ids() {
            let Some(snake) = self.snakes.get_mut(&id) else {
                continue;
            };
            if !snake.alive {
                continue;
            }
            if self.boosting.contains(&id) {
                if snake.boosting_frames > boosting_time {
                    self.boosting.remove(&id);
                    snake.boosting_frames = 0;
                    snake.boost_stall_frames = 0;
                } else {
                    snake.boosting_frames += 1;
                    extra_steps.insert(id);
                }
            } else if !snake.can_boost {
                if snake.boost_stall_frames > boost_stall {
                    snake.can_boost = true;
                    snake.boost_stall_frames = 0;
                } else {
                    snake.boost_stall_frames += 1;
                }
            }
        }
        extra_steps
    }

    /// Move a snake one step of `speed`.
    ///
    /// Order: head, walls, powerups, tail, own body, other snakes, border.
    /// A collision ends the step; it kills the snake only when `lethal`.
    /// Returns `None` for an unknown id.
    pub fn move_snake(&mut self, id: u32, lethal: bool) -> Option<MoveOutcome> {
        let outcome = self.advance_snake(id, lethal);
        debug_assert!(
            self.snakes
                .get(&id)
                .is_none_or(|snake| snake.is_orthogonal(self.border.size))
        );
        outcome
    }

    fn advance_snake(&mut self, id: u32, lethal: bool) -> Option<MoveOutcome> {
        let speed = self.tunables.speed;
        let half = self.border.half;
        let size = self.border.size;

        let snake = self.snakes.get_mut(&id)?;
        let step = snake.dir.unit() * speed;
        let n = snake.body.len();
        snake.body[n - 1] += step;
        let head = snake.head();

        if collision::wall_collision(self.walls.values(), head, 0.0) {
            return Some(self.collide(id, lethal));
        }

        if let Some(powerup_id) = collision::powerup_collision(self.powerups.values(), head) {
            if let Some(powerup) = self.powerups.get_mut(&powerup_id) {
                powerup.died = true;
            }
            self.grow_snake(id);
        }

        let snake = self.snakes.get_mut(&id)?;
        if !snake.growing {
            snake.contract_tail(speed, half);
        }
        let hit_self = collision::self_collision(&snake.body, snake.dir, size);
        if hit_self || collision::snake_collision(self.snakes.values(), id, head, size) {
            return Some(self.collide(id, lethal));
        }

        let snake = self.snakes.get_mut(&id)?;
        if snake.wrap_around(half) {
            Some(MoveOutcome::Wrapped)
        } else {
            Some(MoveOutcome::Moved)
        }
    }

    fn collide(&mut self, id: u32, lethal: bool) -> MoveOutcome {
        if lethal {
            self.kill_snake(id);
            MoveOutcome::Died
        } else {
            MoveOutcome::Blocked
        }
    }

    pub fn kill_snake(&mut self, id: u32) {
        if let Some(snake) = self.snakes.get_mut(&id) {
            snake.alive = false;
            snake.died = true;
            snake.frames_dead = 0;
            self.dead.insert(id);
            debug!("Snake {} ({}) died with score {}", id, snake.name, snake.score);
        }
    }

    /// Credit a powerup: one point and `growth` more frames of growing.
    pub fn grow_snake(&mut self, id: u32) {
        if let Some(snake) = self.snakes.get_mut(&id) {
            snake.growing = true;
            snake.frames_growing += self.tunables.growth;
            snake.score += 1;
            self.growing.insert(id);
        }
    }

    /// Count down growth and drop snakes that finished growing from the set.
    pub fn update_growth(&mut self) {
        for id in &self.growing {
            if let Some(snake) = self.snakes.get_mut(id) {
                snake.frames_growing = snake.frames_growing.saturating_sub(1);
                if snake.frames_growing == 0 {
                    snake.growing = false;
                }
            }
        }
        let snakes = &self.snakes;
        self.growing
            .retain(|id| snakes.get(id).is_some_and(|s| s.growing));
    }

    /// Place a snake at a random clear spot with a fresh body and counters.
    pub fn respawn_snake<R: Rng + ?Sized>(&mut self, id: u32, rng: &mut R) -> Result<(), SpawnError> {
        if !self.snakes.contains_key(&id) {
            return Ok(());
        }
        let start_length = self.tunables.start_length;

        let mut placement = None;
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let dir = Direction::ALL[rng.random_range(0..Direction::ALL.len())];
            let head = self.border.random_point(rng, RESPAWN_BAND)?;
            if !collision::wall_collision(self.walls.values(), head, RESPAWN_WALL_MARGIN) {
                placement = Some((dir, head));
                break;
            }
        }
        let Some((dir, head)) = placement else {
            return Err(SpawnError::PlacementFailed {
                attempts: MAX_PLACEMENT_ATTEMPTS,
            });
        };

        if let Some(snake) = self.snakes.get_mut(&id) {
            snake.body = vec![head - dir.unit() * start_length, head];
            snake.dir = dir;
            snake.score = 0;
            snake.alive = true;
            snake.can_boost = true;
            snake.boosting_frames = 0;
            snake.boost_stall_frames = 0;
            snake.growing = false;
            snake.frames_growing = 0;
            snake.frames_dead = 0;
        }
        self.dead.remove(&id);
        self.boosting.remove(&id);
        self.growing.remove(&id);
        Ok(())
    }

    /// Respawn dead snakes whose delay has elapsed. Returns how many were
    /// placed; a failed placement is retried on the next call.
    pub fn respawn_due<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let respawn_rate = self.tunables.respawn_rate;
        let mut ids: Vec<u32> = self.dead.iter().copied().collect();
        ids.sort_unstable();

        let mut due = Vec::new();
        for id in ids {
            let Some(snake) = self.snakes.get_mut(&id) else {
                continue;
            };
            if snake.disconnected {
                continue;
            }
            snake.frames_dead += 1;
            if snake.frames_dead >= respawn_rate {
                due.push(id);
            }
        }

        let mut respawned = 0;
        for id in due {
            match self.respawn_snake(id, rng) {
                Ok(()) => {
                    debug!("Snake {} respawned", id);
                    respawned += 1;
                }
                Err(e) => warn!("Respawn of snake {} failed: {}", id, e),
            }
        }
        respawned
    }

    /// Advance the simulation one tick, up to but not including
    /// serialization: commands, movement, respawns, growth, powerups.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        commands: &HashMap<u32, Direction>,
        rng: &mut R,
    ) -> StepSummary {
        let mut summary = StepSummary::default();

        self.apply_commands(commands);
        let extra_steps = self.begin_tick();

        for id in self.snake_ids() {
            if !self.snakes.get(&id).is_some_and(|s| s.alive) {
                continue;
            }
            if extra_steps.contains(&id) {
                self.move_snake(id, false);
            }
            if self.move_snake(id, true) == Some(MoveOutcome::Died) {
                summary.deaths += 1;
            }
        }

        summary.respawns = self.respawn_due(rng);
        self.update_growth();
        summary.powerups_spawned = self.update_powerup_spawner(rng);
        summary
    }
}
