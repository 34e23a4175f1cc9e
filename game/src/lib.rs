//! # Dog-Walking Game Simulation Core
//!
//! This library holds the authoritative world model and simulation for the
//! multiplayer dog-walking game. The server binary drives it, but nothing
//! here does networking, database access or async work: the core is plain
//! synchronous state plus a tick function, which keeps it deterministic
//! and easy to test.
//!
//! ## Core Responsibilities
//!
//! ### World Model
//! Maps (roads, buildings, delivery offices, loot-type catalogs), game
//! sessions of up to 100 dogs, loot on the ground, and the live-player
//! registry with its auth tokens.
//!
//! ### Simulation
//! `Game::tick` advances the world by a time delta: it retires idle
//! players, moves every dog along the road network, resolves pickups and
//! deliveries through the swept collision detector in event-time order,
//! garbage-collects taken loot and spawns new loot.
//!
//! ### Persistence
//! The snapshot module serializes the full live state to a byte stream
//! and writes it with an atomic temp-file-then-rename protocol, so a
//! restart can resume exactly where the previous process stopped.
//!
//! ## Module Organization
//!
//! - `geometry`: lattice points, continuous positions, directions
//! - `map`: static map data and the per-cell road index
//! - `movement`: road-constrained movement with boundary clipping
//! - `collision`: swept-circle gatherer/item crossing detection
//! - `loot_gen`: probabilistic loot spawn counts
//! - `session`: dogs, loot and the bounded game session
//! - `players`: player records, registry and token generation
//! - `game`: the world aggregate and the tick engine
//! - `config`: JSON world-config loading
//! - `snapshot`: save/restore of live state
//! - `error`: error types shared by the above

pub mod collision;
pub mod config;
pub mod error;
pub mod game;
pub mod geometry;
pub mod loot_gen;
pub mod map;
pub mod movement;
pub mod players;
pub mod session;
pub mod snapshot;

pub use error::{ConfigError, GameError, SnapshotError};
pub use game::{Game, RetiredPlayer};
pub use geometry::{Direction, Point, Vec2};
pub use map::{Map, MapId};
pub use players::{Player, Players, Token};
pub use session::{Dog, GameSession, Loot};
