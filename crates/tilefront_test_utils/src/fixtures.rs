//! Test fixtures and helpers.
//!
//! Pre-built matches on hand-made maps so scenario tests do not depend on
//! what the terrain generator happens to produce.

use fixed::types::I32F32;
use tilefront_core::config::MatchConfig;
use tilefront_core::economy::{DepositId, ResourceAmounts, ResourceKind};
use tilefront_core::map::{Map, TerrainKind, TilePos};
use tilefront_core::simulation::MatchState;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Resources generous enough for any single order.
pub const RICH: ResourceAmounts = ResourceAmounts::new(10_000, 10_000, 10_000);

/// Match on an open grass map with default starting resources.
///
/// # Panics
///
/// Panics if the bases do not fit, which only happens below 16x16.
#[must_use]
pub fn open_match(width: u32, height: u32) -> MatchState {
    open_match_with(width, height, MatchConfig::default().starting_resources)
}

/// Match on an open grass map with the given starting resources.
///
/// # Panics
///
/// Panics if the bases do not fit.
#[must_use]
pub fn open_match_with(width: u32, height: u32, resources: ResourceAmounts) -> MatchState {
    let config = MatchConfig::default().with_starting_resources(resources);
    MatchState::from_map(config, Map::blank(width, height)).expect("bases fit on a blank map")
}

/// Match on a prepared map with the given starting resources.
///
/// # Panics
///
/// Panics if the bases do not fit.
#[must_use]
pub fn match_on(map: Map, resources: ResourceAmounts) -> MatchState {
    let config = MatchConfig::default().with_starting_resources(resources);
    MatchState::from_map(config, map).expect("bases fit on the prepared map")
}

/// Blank map with a single deposit. Returns the map and the deposit id.
///
/// # Panics
///
/// Panics if `pos` is off the map.
#[must_use]
pub fn map_with_deposit(
    width: u32,
    height: u32,
    kind: ResourceKind,
    pos: TilePos,
    amount: u32,
) -> (Map, DepositId) {
    let mut map = Map::blank(width, height);
    let id = map
        .add_deposit(kind, pos, amount)
        .expect("deposit position is on the map");
    (map, id)
}

/// Surround `center` with a ring of mountains at Chebyshev distance
/// `radius`.
pub fn wall_in(map: &mut Map, center: TilePos, radius: u32) {
    let r = radius as i32;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx.abs() != r && dy.abs() != r {
                continue;
            }
            if let Some(pos) = center.offset(dx, dy) {
                map.set_terrain(pos, TerrainKind::Mountain);
            }
        }
    }
}

/// Vertical mountain wall along column `x` from `y_from` to `y_to`
/// inclusive.
pub fn vertical_wall(map: &mut Map, x: u32, y_from: u32, y_to: u32) {
    for y in y_from..=y_to {
        map.set_terrain(TilePos::new(x, y), TerrainKind::Mountain);
    }
}
