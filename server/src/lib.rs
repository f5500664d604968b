//! # Dog Gather Server Library
//!
//! This library provides the authoritative server for the dog gathering game.
//! Players join a map, get a dog on its roads, steer it around, pick up loot
//! and bring it to offices for points. Dogs left idle for too long retire and
//! their final score is kept as a record.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Movement, loot pickup, office deposits and loot generation all run here.
//! Clients only send requests and read back the state of their session.
//!
//! ### Player Lifecycle
//! - Joining a map creates a dog and returns a secret bearer token
//! - Every later request is authorized with that token
//! - Idle dogs retire and their player entry is removed
//!
//! ### Persistence
//! The whole world can be written to a state file and restored on startup.
//! Saves happen periodically, after every manual tick, and on SIGINT or
//! SIGTERM.
//!
//! ## Architecture Design
//!
//! ### Single Writer
//! The [`world::World`] is owned by the server loop. Packets, ticks and save
//! timers are all handled from one `tokio::select!` loop, so every mutation
//! is applied in one total order without locks.
//!
//! ### UDP-Based Communication
//! Requests and replies are `bincode` encoded [`shared::Packet`] values sent
//! over UDP. Failed requests are answered with a `Rejected` packet carrying a
//! stable error code.
//!
//! ## Module Organization
//!
//! - `config`: game configuration file loading
//! - `map`: static map layout (roads, buildings, offices, loot types)
//! - `dog`: dogs, their bags and directions
//! - `movement`: road-constrained movement
//! - `session`: per-map dogs and loot, gathering and loot generation
//! - `players`: tokens and the player registry
//! - `records`: retired player records
//! - `snapshot`: state file encoding
//! - `world`: the application facade tying everything together
//! - `ticker`: periodic and one-shot timers
//! - `signals`: termination signals
//! - `network`: UDP server loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::load_game_config;
//! use server::network::Server;
//! use server::records::MemoryRecordSink;
//! use server::world::{World, WorldSettings};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = load_game_config(Path::new("config.json"))?;
//!     let settings = WorldSettings {
//!         tick_period: Some(Duration::from_millis(50)),
//!         ..WorldSettings::default()
//!     };
//!     let world = World::new(config, settings, Box::new(MemoryRecordSink::new()));
//!
//!     let mut server = Server::new("127.0.0.1:8080", world).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dog;
pub mod error;
pub mod ids;
pub mod map;
pub mod movement;
pub mod network;
pub mod players;
pub mod records;
pub mod session;
pub mod signals;
pub mod snapshot;
pub mod ticker;
pub mod world;
