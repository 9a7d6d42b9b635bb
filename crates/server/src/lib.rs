//! Snake game server library.

pub mod collision;
pub mod config;
pub mod entity;
pub mod geometry;
pub mod lifecycle;
pub mod server;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use server::{GameState, ServerState, run, serve};
pub use world::World;
