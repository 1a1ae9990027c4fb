//! # Tilefront Core
//!
//! Deterministic match simulation for a tile-grid strategy game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (generation is seeded)
//! - No floating-point math (uses fixed-point)
//!
//! The same config and the same command sequence always produce the same
//! match, tick for tick.
//!
//! ## Crate Structure
//!
//! - [`map`] / [`map_generation`] - Tile grid and procedural terrain
//! - [`pathfinding`] - Navigation grid and A*
//! - [`visibility`] - Per-side fog of war
//! - [`economy`] / [`harvest`] - Ledgers, deposits and gathering
//! - [`catalog`] / [`production`] - Unit and building data, build queues
//! - [`simulation`] - The match aggregate and its tick loop
//! - [`snapshot`] - Fog-filtered views for a viewer

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod catalog;
pub mod components;
pub mod config;
pub mod economy;
pub mod error;
pub mod harvest;
pub mod map;
pub mod map_generation;
pub mod math;
pub mod pathfinding;
pub mod production;
pub mod simulation;
pub mod snapshot;
pub mod visibility;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{BuildingKind, UnitKind, COMMISSIONING_MS};
    pub use crate::components::*;
    pub use crate::config::{Difficulty, MatchConfig};
    pub use crate::economy::{DepositId, ResourceAmounts, ResourceKind, ResourceLedger};
    pub use crate::error::{GameError, Result};
    pub use crate::map::{Map, TerrainKind, TilePos};
    pub use crate::map_generation::{generate_map, MapConfig};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::pathfinding::{find_path, Connectivity, Mobility, NavGrid};
    pub use crate::simulation::{MatchState, Notification, TickEvents};
    pub use crate::snapshot::MatchSnapshot;
    pub use crate::visibility::TileVisibility;
}
