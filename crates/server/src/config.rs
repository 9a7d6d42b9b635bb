//! Server configuration.

use anyhow::{bail, Context};
use protocol::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::world::RESPAWN_BAND;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub snake: SnakeConfig,
    #[serde(default)]
    pub powerup: PowerupConfig,
    #[serde(default = "default_walls")]
    pub walls: Vec<WallConfig>,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        if path.exists() {
            Self::load_from(path)
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    /// Load and validate configuration from an explicit path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the simulation cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        // Respawns need at least one integer coordinate inside the band.
        let min_size = 2.0 * RESPAWN_BAND + 2.0;
        if !self.world.size.is_finite() || self.world.size < min_size {
            bail!(
                "world.size must be a number of at least {} (got {})",
                min_size,
                self.world.size
            );
        }
        if !(self.snake.speed.is_finite() && self.snake.speed > 0.0) {
            bail!("snake.speed must be positive");
        }
        if !(self.snake.start_length.is_finite() && self.snake.start_length > 0.0) {
            bail!("snake.start_length must be positive");
        }
        if self.server.tick_interval_ms == 0 {
            bail!("server.tick_interval_ms must be at least 1");
        }
        let mut ids = HashSet::new();
        for wall in &self.walls {
            if !ids.insert(wall.id) {
                bail!("duplicate wall id {}", wall.id);
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            world: WorldConfig::default(),
            snake: SnakeConfig::default(),
            powerup: PowerupConfig::default(),
            walls: default_walls(),
        }
    }
}

/// Server networking and timing settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Milliseconds per frame.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Longest accepted player name, in characters.
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_connections: default_max_connections(),
            tick_interval_ms: default_tick_interval(),
            max_name_length: default_max_name_length(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    11000
}
fn default_max_connections() -> usize {
    100
}
fn default_tick_interval() -> u64 {
    34
}
fn default_max_name_length() -> usize {
    16
}

/// Game mode. `Extra` enables boosting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Basic,
    Extra,
}

/// World settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    /// Side length of the square world, centered on the origin.
    #[serde(default = "default_world_size")]
    pub size: f64,
    /// Frames a snake stays dead before respawning.
    #[serde(default = "default_respawn_rate")]
    pub respawn_rate: u32,
    #[serde(default)]
    pub mode: GameMode,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            size: default_world_size(),
            respawn_rate: default_respawn_rate(),
            mode: GameMode::default(),
        }
    }
}

fn default_world_size() -> f64 {
    2000.0
}
fn default_respawn_rate() -> u32 {
    100
}

/// Snake movement tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnakeConfig {
    /// Units travelled per frame.
    #[serde(default = "default_snake_speed")]
    pub speed: f64,
    #[serde(default = "default_start_length")]
    pub start_length: f64,
    /// Frames of growth granted per powerup.
    #[serde(default = "default_growth")]
    pub growth: u32,
    /// Frames before a spent boost recharges.
    #[serde(default = "default_boost_stall")]
    pub boost_stall: u32,
    /// Frames a boost lasts.
    #[serde(default = "default_boosting_time")]
    pub boosting_time: u32,
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            speed: default_snake_speed(),
            start_length: default_start_length(),
            growth: default_growth(),
            boost_stall: default_boost_stall(),
            boosting_time: default_boosting_time(),
        }
    }
}

fn default_snake_speed() -> f64 {
    6.0
}
fn default_start_length() -> f64 {
    120.0
}
fn default_growth() -> u32 {
    24
}
fn default_boost_stall() -> u32 {
    50
}
fn default_boosting_time() -> u32 {
    15
}

/// Powerup population settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PowerupConfig {
    /// Live powerups kept in the world.
    #[serde(default = "default_max_powerups")]
    pub max: usize,
    /// Frames a shortfall must persist before refilling.
    #[serde(default = "default_powerup_delay")]
    pub delay: u32,
}

impl Default for PowerupConfig {
    fn default() -> Self {
        Self {
            max: default_max_powerups(),
            delay: default_powerup_delay(),
        }
    }
}

fn default_max_powerups() -> usize {
    20
}
fn default_powerup_delay() -> u32 {
    75
}

/// A wall segment. Walls are axis-aligned.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WallConfig {
    pub id: u32,
    pub p1: Point,
    pub p2: Point,
}

fn default_walls() -> Vec<WallConfig> {
    vec![
        WallConfig {
            id: 0,
            p1: Point::new(-300.0, 0.0),
            p2: Point::new(300.0, 0.0),
        },
        WallConfig {
            id: 1,
            p1: Point::new(0.0, -300.0),
            p2: Point::new(0.0, -60.0),
        },
        WallConfig {
            id: 2,
            p1: Point::new(0.0, 60.0),
            p2: Point::new(0.0, 300.0),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.server.port, 11000);
        assert_eq!(config.world.size, 2000.0);
        assert_eq!(config.world.mode, GameMode::Basic);
        assert_eq!(config.walls.len(), 3);
    }

    #[test]
    fn test_parse_sections_and_walls() {
        let config = Config::from_toml_str(
            r#"
            [server]
            tick_interval_ms = 20

            [world]
            size = 1000.0
            respawn_rate = 50
            mode = "extra"

            [[walls]]
            id = 7
            p1 = { x = 100.0, y = 100.0 }
            p2 = { x = 100.0, y = 200.0 }
            "#,
        )
        .unwrap();
        assert_eq!(config.server.tick_interval_ms, 20);
        assert_eq!(config.world.mode, GameMode::Extra);
        assert_eq!(config.world.respawn_rate, 50);
        assert_eq!(config.walls.len(), 1);
        assert_eq!(config.walls[0].p2, Point::new(100.0, 200.0));
    }

    #[test]
    fn test_validation() {
        assert!(Config::from_toml_str("[world]\nsize = 150.0").is_err());
        assert!(Config::from_toml_str("[world]\nsize = 201.0").is_err());
        assert!(Config::from_toml_str("[world]\nsize = nan").is_err());
        assert!(Config::from_toml_str("[world]\nsize = 202.0").is_ok());
        assert!(Config::from_toml_str("[snake]\nspeed = inf").is_err());
        assert!(Config::from_toml_str("[snake]\nspeed = 0.0").is_err());
        assert!(Config::from_toml_str("[server]\ntick_interval_ms = 0").is_err());
        let dup = r#"
            [[walls]]
            id = 1
            p1 = { x = 0.0, y = 0.0 }
            p2 = { x = 0.0, y = 10.0 }
            [[walls]]
            id = 1
            p1 = { x = 5.0, y = 0.0 }
            p2 = { x = 5.0, y = 10.0 }
        "#;
        assert!(Config::from_toml_str(dup).is_err());
    }

    #[test]
    fn test_default_roundtrips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();
        assert_eq!(parsed.walls, default_walls());
    }
}
