//! Game state and main loop.

use bytes::Bytes;
use protocol::packets::build_handshake;
use protocol::{Direction, LineWriter, ProtocolError};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::lifecycle::StepSummary;
use crate::world::World;

use super::ServerState;

/// Ticks between statistics log lines.
const STATS_INTERVAL: u64 = 400;

/// The simulation plus its bookkeeping. Guarded by the world lock.
#[derive(Debug)]
pub struct GameState {
    pub world: World,
    pub tick_count: u64,
    pub start_time: std::time::Instant,
    /// Average tick duration in milliseconds (exponential moving average).
    pub update_time_avg: f64,
}

impl GameState {
    pub fn new(config: &Config) -> Self {
        Self {
            world: World::from_config(config),
            tick_count: 0,
            start_time: std::time::Instant::now(),
            update_time_avg: 0.0,
        }
    }

    /// Fill the powerup population up to its maximum.
    pub fn populate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let missing = self
            .world
            .tunables
            .max_powerups
            .saturating_sub(self.world.powerups.len());
        self.world.spawn_powerups(missing, rng)
    }

    /// Add a player's snake and build the handshake reply for it.
    pub fn add_player<R: Rng + ?Sized>(
        &mut self,
        id: u32,
        name: String,
        rng: &mut R,
    ) -> Result<Bytes, ProtocolError> {
        let handshake = build_handshake(id, self.world.size(), &self.world.wall_messages())?;
        if let Err(e) = self.world.join_snake(id, name, rng) {
            warn!("Could not place snake {}: {}", id, e);
        }
        Ok(handshake.finish())
    }

    /// Flag a departed player's snake. It goes out once more in the next
    /// frame and is removed after it.
    pub fn remove_player(&mut self, id: u32) {
        self.world.disconnect_snake(id);
    }

    /// Run one tick and return the serialized frame.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        commands: &HashMap<u32, Direction>,
        rng: &mut R,
    ) -> Result<Bytes, ProtocolError> {
        self.tick_count += 1;

        let summary = self.world.step(commands, rng);
        if summary != StepSummary::default() {
            debug!(
                "Tick #{}: {} deaths, {} respawns, {} powerups spawned",
                self.tick_count, summary.deaths, summary.respawns, summary.powerups_spawned
            );
        }

        let entities = self.world.snakes.len() + self.world.powerups.len();
        let mut frame = LineWriter::with_capacity(entities * 192);
        let written = self.world.write_frame(&mut frame);
        // Clear one-frame state even if serialization failed.
        self.world.end_tick();
        written?;
        Ok(frame.finish())
    }

    /// Fold a tick duration into the moving average.
    pub fn record_tick_time(&mut self, tick_ms: f64) {
        self.update_time_avg = self.update_time_avg * 0.5 + tick_ms * 0.5;
    }
}

/// Run the fixed-interval tick loop until the process exits.
///
/// Locks the client registry, then the world. The world lock is released
/// before the frame is queued for clients; clients whose connection is gone
/// are disconnected after both locks are released.
pub async fn run_game_loop(state: Arc<ServerState>, tick_interval_ms: u64) {
    let start = Instant::now() + Duration::from_millis(tick_interval_ms);
    let mut ticker = interval_at(start, Duration::from_millis(tick_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let tick_budget = tick_interval_ms as f64 * 0.9;

    loop {
        ticker.tick().await;

        let closed = {
            let clients = state.clients.read().await;
            let mut game = state.game.write().await;
            let tick_start = std::time::Instant::now();

            let mut commands = state.commands.consume();
            commands.retain(|id, _| clients.contains(*id));
            let frame = game.tick(&commands, &mut rand::rng());

            let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;
            game.record_tick_time(tick_ms);
            if tick_ms > tick_budget {
                warn!(
                    "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players, {} powerups",
                    game.tick_count,
                    tick_ms,
                    tick_budget,
                    clients.len(),
                    game.world.powerups.len()
                );
            }
            if game.tick_count % STATS_INTERVAL == 0 {
                debug!(
                    "Tick #{}: avg {:.3}ms, {} snakes, {} powerups, uptime {:?}",
                    game.tick_count,
                    game.update_time_avg,
                    game.world.snakes.len(),
                    game.world.powerups.len(),
                    game.start_time.elapsed()
                );
            }
            drop(game);

            match frame {
                Ok(frame) => clients.broadcast(&frame),
                Err(e) => {
                    error!("Failed to serialize frame: {}", e);
                    Vec::new()
                }
            }
        };

        for id in closed {
            super::disconnect(&state, id).await;
        }
    }
}
