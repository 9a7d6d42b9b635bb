//! Message definitions for the snake protocol.
//!
//! This module contains both client->server and server->client messages.

mod client;
mod server;

pub use client::*;
pub use server::*;
