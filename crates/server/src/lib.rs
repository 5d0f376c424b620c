//! Classic protocol (v7) block-game server.
//!
//! The binary in `main.rs` wires these pieces together: [`server::Server`]
//! owns the world and the player registry, [`net`] runs the listener and one
//! task per connection, and [`persistence`] saves the level.

pub mod block;
pub mod commands;
pub mod config;
pub mod event_bus;
pub mod generator;
pub mod level;
pub mod lists;
pub mod net;
pub mod persistence;
pub mod player_registry;
pub mod protocol;
pub mod rules;
pub mod server;
pub mod session;
pub mod world;
