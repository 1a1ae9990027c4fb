//! Procedural map generation.
//!
//! Output is a pure function of [`MapConfig`]: every random draw comes from
//! one `ChaCha8Rng` seeded with the config seed, and only integer math is
//! used.
//!
//! # Passes
//!
//! 1. Mountain ranges (branching random walks)
//! 2. Rivers (edge to opposite edge, never over mountains)
//! 3. Lakes (noisy blobs, never over mountains)
//! 4. Forests (noisy blobs plus sparse scatter, grass only)
//! 5. Resource deposits, some grown into clusters of half-size satellites
//!
//! After every pass the base disks are checked and any terrain that landed
//! in them is reset to grass. Finally a ground corridor is carved between
//! the two bases if terrain cut them off.

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::economy::ResourceKind;
use crate::error::{GameError, Result};
use crate::map::{Map, Passability, TerrainKind, Tile, TilePos, BASE_CLEAR_RADIUS};
use crate::pathfinding::{find_path, Connectivity, Mobility, NavGrid};

/// Smallest accepted width or height.
pub const MIN_MAP_DIMENSION: u32 = 24;

/// Tries per feature before it is skipped.
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 32;

/// Extra clearance kept between feature seed points and the base disks.
const SEED_CLEARANCE: u32 = 3;

/// Maximum branches spawned by one mountain range.
const MAX_MOUNTAIN_BRANCHES: u32 = 3;

/// Chance in percent that a placed deposit grows a cluster.
const CLUSTER_CHANCE_PERCENT: u32 = 30;

/// Satellite tries per cluster.
const CLUSTER_SIZE: std::ops::RangeInclusive<u32> = 2..=4;

/// Furthest a satellite sits from its parent (Chebyshev).
const CLUSTER_RADIUS: i32 = 3;

/// 8-way headings, clockwise from east.
const HEADINGS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Deposit layout per resource kind.
struct DepositRule {
    kind: ResourceKind,
    /// Deposits per 10 000 tiles at 100% resource scale.
    per_10k_tiles: u32,
    min_spacing: u32,
    amount: u32,
    terrain: TerrainKind,
}

const DEPOSIT_RULES: [DepositRule; 3] = [
    DepositRule {
        kind: ResourceKind::Metal,
        per_10k_tiles: 40,
        min_spacing: 3,
        amount: 75,
        terrain: TerrainKind::Grass,
    },
    DepositRule {
        kind: ResourceKind::Gold,
        per_10k_tiles: 20,
        min_spacing: 4,
        amount: 50,
        terrain: TerrainKind::Grass,
    },
    DepositRule {
        kind: ResourceKind::Wood,
        per_10k_tiles: 80,
        min_spacing: 2,
        amount: 100,
        terrain: TerrainKind::Forest,
    },
];

/// Map generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Random seed.
    pub seed: u64,
    /// Deposit count scale in percent.
    pub resource_percent: u32,
}

impl MapConfig {
    /// Config with seed 0 and baseline resources.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            seed: 0,
            resource_percent: 100,
        }
    }

    /// Set the seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the deposit count scale.
    #[must_use]
    pub const fn with_resource_percent(mut self, percent: u32) -> Self {
        self.resource_percent = percent;
        self
    }
}

/// Generate a map.
///
/// # Errors
///
/// [`GameError::InvalidConfig`] if either dimension is below
/// [`MIN_MAP_DIMENSION`].
pub fn generate_map(config: &MapConfig) -> Result<Map> {
    if config.width < MIN_MAP_DIMENSION || config.height < MIN_MAP_DIMENSION {
        return Err(GameError::InvalidConfig(format!(
            "map {}x{} is smaller than the {MIN_MAP_DIMENSION}x{MIN_MAP_DIMENSION} minimum",
            config.width, config.height
        )));
    }

    let mut generator = TerrainGenerator {
        map: Map::blank(config.width, config.height),
        rng: ChaCha8Rng::seed_from_u64(config.seed),
        resource_percent: config.resource_percent,
    };

    generator.place_mountains();
    enforce_base_reservation(&mut generator.map, "mountains");
    generator.place_rivers();
    enforce_base_reservation(&mut generator.map, "rivers");
    generator.place_lakes();
    enforce_base_reservation(&mut generator.map, "lakes");
    generator.place_forests();
    enforce_base_reservation(&mut generator.map, "forests");
    generator.place_deposits();
    enforce_base_reservation(&mut generator.map, "deposits");
    connect_anchors(&mut generator.map);

    tracing::debug!(
        width = config.width,
        height = config.height,
        seed = config.seed,
        deposits = generator.map.deposits().len(),
        "Generated map"
    );
    Ok(generator.map)
}

struct TerrainGenerator {
    map: Map,
    rng: ChaCha8Rng,
    resource_percent: u32,
}

impl TerrainGenerator {
    fn area(&self) -> u32 {
        self.map.width() * self.map.height()
    }

    /// Feature count for a density given per 10 000 tiles, at least one.
    fn count_for_density(&self, per_10k_tiles: u32) -> u32 {
        (self.area() * per_10k_tiles / 10_000).max(1)
    }

    fn random_tile(&mut self) -> TilePos {
        TilePos::new(
            self.rng.gen_range(0..self.map.width()),
            self.rng.gen_range(0..self.map.height()),
        )
    }

    /// Random tile outside the base zones that satisfies `accept`.
    fn pick_seed_point(&mut self, accept: impl Fn(&Tile) -> bool) -> Option<TilePos> {
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let pos = self.random_tile();
            if self.map.in_base_zone(pos, SEED_CLEARANCE) {
                continue;
            }
            if self.map.tile(pos).is_some_and(&accept) {
                return Some(pos);
            }
        }
        None
    }

    fn paint_disk(
        &mut self,
        center: TilePos,
        radius: u32,
        kind: TerrainKind,
        can_overwrite: impl Fn(TerrainKind) -> bool,
    ) {
        for pos in self.map.disk(center, radius) {
            if self.map.terrain(pos).is_some_and(&can_overwrite) {
                self.map.set_terrain(pos, kind);
            }
        }
    }

    /// Paint an irregular blob: eight angular sectors, each with its own
    /// radius jittered to 80-120% of `radius`.
    fn paint_blob(
        &mut self,
        center: TilePos,
        radius: u32,
        kind: TerrainKind,
        can_overwrite: impl Fn(TerrainKind) -> bool,
    ) {
        // Sector radii in tenths of a tile.
        let sector_radii: [u64; 8] =
            std::array::from_fn(|_| u64::from(radius * self.rng.gen_range(8..=12)));
        let reach = radius + radius / 5 + 1;

        for pos in self.map.disk(center, reach) {
            let dx = i64::from(pos.x) - i64::from(center.x);
            let dy = i64::from(pos.y) - i64::from(center.y);
            let r10 = sector_radii[octant(dx, dy)];
            let inside = ((dx * dx + dy * dy) as u64) * 100 <= r10 * r10;
            if inside && self.map.terrain(pos).is_some_and(&can_overwrite) {
                self.map.set_terrain(pos, kind);
            }
        }
    }

    fn place_mountains(&mut self) {
        let ranges = self.count_for_density(4);
        for range in 0..ranges {
            let Some(start) = self.pick_seed_point(|t| t.kind == TerrainKind::Grass) else {
                tracing::debug!(range, "Skipped mountain range: no seed point");
                continue;
            };
            let heading = self.rng.gen_range(0..HEADINGS.len());
            let length = self.rng.gen_range(12..=30);
            self.mountain_walk(start, heading, length);
        }
    }

    fn mountain_walk(&mut self, start: TilePos, heading: usize, length: u32) {
        let mut walkers = vec![(start, heading, length)];
        let mut branches = 0;

        while let Some((mut pos, mut heading, steps)) = walkers.pop() {
            for _ in 0..steps {
                let radius = self.rng.gen_range(0..=1);
                self.paint_disk(pos, radius, TerrainKind::Mountain, |_| true);

                if !self.rng.gen_ratio(3, 4) {
                    heading = if self.rng.gen_ratio(1, 2) {
                        (heading + 1) % 8
                    } else {
                        (heading + 7) % 8
                    };
                }
                if branches < MAX_MOUNTAIN_BRANCHES && self.rng.gen_ratio(1, 12) {
                    let side = if self.rng.gen_ratio(1, 2) { 2 } else { 6 };
                    walkers.push((pos, (heading + side) % 8, steps / 2));
                    branches += 1;
                }

                let (dx, dy) = HEADINGS[heading];
                match pos.offset(dx, dy).filter(|p| self.map.in_bounds(*p)) {
                    Some(next) => pos = next,
                    None => break,
                }
            }
        }
    }

    fn place_rivers(&mut self) {
        let rivers = self.count_for_density(2);
        for river in 0..rivers {
            let Some((start, target, crosses_rows)) = self.river_endpoints() else {
                tracing::debug!(river, "Skipped river: no start point");
                continue;
            };
            let width = self.rng.gen_range(0..=1);
            self.river_walk(start, target, crosses_rows, width);
        }
    }

    /// A start on a random edge and a target on the opposite edge. The flag
    /// is set when the river runs between the top and bottom edges.
    fn river_endpoints(&mut self) -> Option<(TilePos, TilePos, bool)> {
        let (w, h) = (self.map.width(), self.map.height());
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let along_x = self.rng.gen_range(0..w);
            let along_y = self.rng.gen_range(0..h);
            let target_x = self.rng.gen_range(0..w);
            let target_y = self.rng.gen_range(0..h);
            let (start, target, crosses_rows) = match self.rng.gen_range(0..4) {
                0 => (TilePos::new(along_x, 0), TilePos::new(target_x, h - 1), true),
                1 => (TilePos::new(along_x, h - 1), TilePos::new(target_x, 0), true),
                2 => (TilePos::new(0, along_y), TilePos::new(w - 1, target_y), false),
                _ => (TilePos::new(w - 1, along_y), TilePos::new(0, target_y), false),
            };
            if !self.map.in_base_zone(start, SEED_CLEARANCE)
                && self.map.terrain(start) != Some(TerrainKind::Mountain)
            {
                return Some((start, target, crosses_rows));
            }
        }
        None
    }

    fn river_walk(&mut self, start: TilePos, target: TilePos, crosses_rows: bool, width: u32) {
        let budget = (self.map.width() + self.map.height()) * 2;
        let reached_edge = |p: TilePos| {
            if crosses_rows {
                p.y == target.y
            } else {
                p.x == target.x
            }
        };

        let mut visited = HashSet::new();
        let mut pos = start;
        visited.insert(pos);

        for _ in 0..budget {
            self.paint_disk(pos, width, TerrainKind::Water, |k| {
                k != TerrainKind::Mountain
            });
            if reached_edge(pos) {
                break;
            }

            let (dx, dy) = if self.rng.gen_ratio(2, 3) {
                step_toward(pos, target)
            } else {
                HEADINGS[self.rng.gen_range(0..4) * 2]
            };
            let Some(next) = pos.offset(dx, dy).filter(|p| self.map.in_bounds(*p)) else {
                continue;
            };
            // Crossing our own course: sometimes the river pools and ends.
            if !visited.insert(next) && self.rng.gen_ratio(1, 2) {
                break;
            }
            pos = next;
        }
    }

    fn place_lakes(&mut self) {
        let lakes = self.count_for_density(10);
        for lake in 0..lakes {
            let Some(center) = self.pick_seed_point(|t| t.kind != TerrainKind::Mountain) else {
                tracing::debug!(lake, "Skipped lake: no seed point");
                continue;
            };
            let radius = self.rng.gen_range(2..=5);
            self.paint_blob(center, radius, TerrainKind::Water, |k| {
                k != TerrainKind::Mountain
            });
        }
    }

    fn place_forests(&mut self) {
        let grass_only = |k: TerrainKind| k == TerrainKind::Grass;

        let forests = self.count_for_density(12);
        for forest in 0..forests {
            let Some(center) = self.pick_seed_point(|t| t.kind == TerrainKind::Grass) else {
                tracing::debug!(forest, "Skipped forest: no seed point");
                continue;
            };
            let radius = self.rng.gen_range(2..=4);
            self.paint_blob(center, radius, TerrainKind::Forest, grass_only);
        }

        let scattered = self.count_for_density(40);
        for _ in 0..scattered {
            if let Some(pos) = self.pick_seed_point(|t| t.kind == TerrainKind::Grass) {
                self.map.set_terrain(pos, TerrainKind::Forest);
            }
        }
    }

    fn place_deposits(&mut self) {
        self.place_starter_deposits();

        for rule in &DEPOSIT_RULES {
            let target = (self.count_for_density(rule.per_10k_tiles) * self.resource_percent
                / 100)
                .max(1);
            let spacing2 = u64::from(rule.min_spacing) * u64::from(rule.min_spacing);
            let mut placed: Vec<TilePos> = self
                .map
                .deposits()
                .values()
                .filter(|d| d.kind == rule.kind)
                .map(|d| d.position)
                .collect();
            let mut parents = Vec::new();
            let mut new_deposits = 0;
            let mut attempts = 0;

            while new_deposits < target && attempts < target * MAX_PLACEMENT_ATTEMPTS {
                attempts += 1;
                let pos = self.random_tile();
                let fits = self.map.tile(pos).is_some_and(|t| {
                    t.kind == rule.terrain && t.deposit.is_none() && !t.reserved
                }) && !self.map.in_base_zone(pos, 0)
                    && placed.iter().all(|q| q.distance_squared(pos) >= spacing2);
                if fits && self.map.add_deposit(rule.kind, pos, rule.amount).is_some() {
                    placed.push(pos);
                    parents.push(pos);
                    new_deposits += 1;
                }
            }

            let satellites = self.place_clusters(rule, &parents, &mut placed);

            if new_deposits < target {
                tracing::debug!(
                    kind = rule.kind.name(),
                    placed = new_deposits,
                    target,
                    "Ran out of deposit placement attempts"
                );
            }
            tracing::debug!(
                kind = rule.kind.name(),
                placed = new_deposits,
                satellites,
                "Placed deposits"
            );
        }
    }

    /// Grow half-size satellites around some of `parents`.
    ///
    /// Satellites follow the kind's terrain and stay out of the base zones.
    /// They may crowd their own cluster but keep the kind's spacing from
    /// every other deposit. Returns the number placed.
    fn place_clusters(
        &mut self,
        rule: &DepositRule,
        parents: &[TilePos],
        placed: &mut Vec<TilePos>,
    ) -> u32 {
        let spacing2 = u64::from(rule.min_spacing) * u64::from(rule.min_spacing);
        let amount = rule.amount / 2;
        let mut satellites = 0;

        for &parent in parents {
            if self.rng.gen_range(0..100) >= CLUSTER_CHANCE_PERCENT {
                continue;
            }
            let size = self.rng.gen_range(CLUSTER_SIZE);
            let mut cluster = vec![parent];
            for _ in 0..size {
                let dx = self.rng.gen_range(-CLUSTER_RADIUS..=CLUSTER_RADIUS);
                let dy = self.rng.gen_range(-CLUSTER_RADIUS..=CLUSTER_RADIUS);
                let Some(pos) = parent.offset(dx, dy) else {
                    continue;
                };
                let fits = self.map.tile(pos).is_some_and(|t| {
                    t.kind == rule.terrain && t.deposit.is_none() && !t.reserved
                }) && !self.map.in_base_zone(pos, 0)
                    && placed
                        .iter()
                        .filter(|q| !cluster.contains(*q))
                        .all(|q| q.distance_squared(pos) >= spacing2);
                if fits && self.map.add_deposit(rule.kind, pos, amount).is_some() {
                    cluster.push(pos);
                    placed.push(pos);
                    satellites += 1;
                }
            }
        }
        satellites
    }

    /// One metal and one gold deposit just outside each base disk.
    fn place_starter_deposits(&mut self) {
        for anchor in self.map.anchors().both() {
            for rule in DEPOSIT_RULES.iter().filter(|r| r.terrain == TerrainKind::Grass) {
                let mut placed = false;
                for _ in 0..MAX_PLACEMENT_ATTEMPTS {
                    let dx = self.rng.gen_range(-6..=6);
                    let dy = self.rng.gen_range(-6..=6);
                    let Some(pos) = anchor.offset(dx, dy) else {
                        continue;
                    };
                    let fits = self.map.tile(pos).is_some_and(|t| {
                        t.kind == TerrainKind::Grass && t.deposit.is_none()
                    }) && !self.map.in_base_zone(pos, 0);
                    if fits && self.map.add_deposit(rule.kind, pos, rule.amount).is_some() {
                        placed = true;
                        break;
                    }
                }
                if !placed {
                    tracing::debug!(
                        kind = rule.kind.name(),
                        anchor_x = anchor.x,
                        anchor_y = anchor.y,
                        "Skipped starter deposit"
                    );
                }
            }
        }
    }
}

/// Octant index (0-7) of an offset, clockwise from east.
fn octant(dx: i64, dy: i64) -> usize {
    let steep = dy.abs() > dx.abs();
    match (dx >= 0, dy >= 0, steep) {
        (true, true, false) => 0,
        (true, true, true) => 1,
        (false, true, true) => 2,
        (false, true, false) => 3,
        (false, false, false) => 4,
        (false, false, true) => 5,
        (true, false, true) => 6,
        (true, false, false) => 7,
    }
}

/// Orthogonal unit step that closes the larger gap to `target`.
fn step_toward(from: TilePos, target: TilePos) -> (i32, i32) {
    let gap_x = i64::from(target.x) - i64::from(from.x);
    let gap_y = i64::from(target.y) - i64::from(from.y);
    if gap_x.abs() >= gap_y.abs() && gap_x != 0 {
        (gap_x.signum() as i32, 0)
    } else {
        (0, gap_y.signum() as i32)
    }
}

/// Reset every base disk tile to reserved open grass, dropping any deposit
/// on it. Returns the number of tiles that had to change.
pub(crate) fn enforce_base_reservation(map: &mut Map, pass: &str) -> u32 {
    let mut total = 0;
    for anchor in map.anchors().both() {
        let mut cleared = 0;
        for pos in map.disk(anchor, BASE_CLEAR_RADIUS) {
            let mut stray_deposit = None;
            if let Some(tile) = map.tile_mut(pos) {
                tile.reserved = true;
                if tile.kind != TerrainKind::Grass {
                    tile.kind = TerrainKind::Grass;
                    cleared += 1;
                }
                stray_deposit = tile.deposit;
            }
            if let Some(id) = stray_deposit {
                map.remove_deposit(id);
                cleared += 1;
            }
        }
        if cleared > 0 {
            tracing::warn!(
                pass,
                anchor_x = anchor.x,
                anchor_y = anchor.y,
                cleared,
                "Cleared terrain from base reservation"
            );
        }
        total += cleared;
    }
    total
}

/// Carve an L-shaped ground corridor between the anchors if terrain has cut
/// them off. Returns the number of tiles converted to grass.
pub(crate) fn connect_anchors(map: &mut Map) -> u32 {
    let anchors = map.anchors();
    let grid = NavGrid::from_map(map, Connectivity::FourWay);
    if find_path(&grid, anchors.player, anchors.enemy, Mobility::Ground).is_ok() {
        return 0;
    }

    let (a, b) = (anchors.player, anchors.enemy);
    let horizontal = (a.x.min(b.x)..=a.x.max(b.x)).map(|x| TilePos::new(x, a.y));
    let vertical = (a.y.min(b.y)..=a.y.max(b.y)).map(|y| TilePos::new(b.x, y));

    let mut carved = 0;
    for pos in horizontal.chain(vertical) {
        if map.passability(pos) == Some(Passability::Open) {
            continue;
        }
        if let Some(id) = map.tile(pos).and_then(|t| t.deposit) {
            map.remove_deposit(id);
        }
        map.set_terrain(pos, TerrainKind::Grass);
        carved += 1;
    }

    tracing::warn!(carved, "Carved ground corridor between bases");
    carved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::BaseAnchors;

    fn generate(width: u32, height: u32, seed: u64) -> Map {
        generate_map(&MapConfig::new(width, height).with_seed(seed)).unwrap()
    }

    fn count_terrain(map: &Map, kind: TerrainKind) -> usize {
        map.tiles().filter(|t| t.kind == kind).count()
    }

    #[test]
    fn test_rejects_tiny_maps() {
        let result = generate_map(&MapConfig::new(MIN_MAP_DIMENSION - 1, 40));
        assert!(matches!(result, Err(GameError::InvalidConfig(_))));
    }

    #[test]
    fn test_same_seed_same_map() {
        assert_eq!(generate(64, 48, 7), generate(64, 48, 7));
    }

    #[test]
    fn test_different_seeds_differ() {
        assert_ne!(generate(64, 64, 1), generate(64, 64, 2));
    }

    #[test]
    fn test_all_terrain_kinds_appear() {
        let map = generate(100, 100, 42);
        assert!(count_terrain(&map, TerrainKind::Mountain) > 0);
        assert!(count_terrain(&map, TerrainKind::Water) > 0);
        assert!(count_terrain(&map, TerrainKind::Forest) > 0);
        assert!(count_terrain(&map, TerrainKind::Grass) > 0);
    }

    #[test]
    fn test_base_disks_are_open_grass() {
        for seed in 0..12 {
            let map = generate(60, 60, seed);
            for anchor in map.anchors().both() {
                for pos in map.disk(anchor, BASE_CLEAR_RADIUS) {
                    let tile = map.tile(pos).unwrap();
                    assert_eq!(tile.kind, TerrainKind::Grass, "seed {seed} at {pos:?}");
                    assert_eq!(tile.passability(), Passability::Open);
                    assert!(tile.deposit.is_none());
                }
            }
        }
    }

    #[test]
    fn test_anchors_always_connected() {
        for seed in 0..12 {
            let map = generate(48, 48, seed);
            let grid = NavGrid::from_map(&map, Connectivity::FourWay);
            let anchors = map.anchors();
            assert!(
                find_path(&grid, anchors.player, anchors.enemy, Mobility::Ground).is_ok(),
                "seed {seed} left the bases disconnected"
            );
        }
    }

    #[test]
    fn test_anchors_match_proportions() {
        let map = generate(80, 60, 3);
        assert_eq!(map.anchors(), BaseAnchors::for_dimensions(80, 60));
    }

    #[test]
    fn test_deposits_sit_on_matching_terrain() {
        let map = generate(100, 100, 9);
        assert!(!map.deposits().is_empty());
        for deposit in map.deposits().values() {
            let tile = map.tile(deposit.position).unwrap();
            assert_eq!(tile.deposit, Some(deposit.id));
            let expected = match deposit.kind {
                ResourceKind::Wood => TerrainKind::Forest,
                ResourceKind::Metal | ResourceKind::Gold => TerrainKind::Grass,
            };
            assert_eq!(tile.kind, expected);
        }
    }

    #[test]
    fn test_gold_deposits_respect_spacing() {
        let map = generate(100, 100, 5);
        let gold: Vec<_> = map
            .deposits()
            .values()
            .filter(|d| d.kind == ResourceKind::Gold && d.remaining == 50)
            .map(|d| d.position)
            .collect();
        for (i, a) in gold.iter().enumerate() {
            for b in &gold[i + 1..] {
                assert!(a.distance_squared(*b) >= 16, "{a:?} and {b:?} too close");
            }
        }
    }

    #[test]
    fn test_clusters_surround_full_deposits() {
        let mut satellites = 0;
        for seed in 0..4 {
            let map = generate(100, 100, seed);
            let deposits: Vec<_> = map.deposits().values().collect();
            // Wood can be cut away by the corridor carve; grass deposits cannot.
            for rule in DEPOSIT_RULES.iter().filter(|r| r.terrain == TerrainKind::Grass) {
                for small in deposits
                    .iter()
                    .filter(|d| d.kind == rule.kind && d.remaining == rule.amount / 2)
                {
                    satellites += 1;
                    assert!(!map.in_base_zone(small.position, 0));
                    assert_eq!(map.terrain(small.position), Some(rule.terrain));
                    assert!(
                        deposits.iter().any(|d| d.kind == rule.kind
                            && d.remaining == rule.amount
                            && d.position.chebyshev_distance(small.position)
                                <= CLUSTER_RADIUS as u32),
                        "seed {seed}: satellite at {:?} has no parent",
                        small.position
                    );
                }
            }
        }
        assert!(satellites > 0);
    }

    #[test]
    fn test_resource_scale_changes_deposit_count() {
        let rich = generate_map(
            &MapConfig::new(100, 100)
                .with_seed(11)
                .with_resource_percent(125),
        )
        .unwrap();
        let poor = generate_map(
            &MapConfig::new(100, 100)
                .with_seed(11)
                .with_resource_percent(75),
        )
        .unwrap();
        let metal = |m: &Map| {
            m.deposits()
                .values()
                .filter(|d| d.kind == ResourceKind::Metal)
                .count()
        };
        assert!(metal(&rich) > metal(&poor));
    }

    #[test]
    fn test_enforcement_resets_base_disk() {
        let mut map = Map::blank(30, 30);
        let anchor = map.anchors().player;
        map.set_terrain(anchor, TerrainKind::Mountain);
        map.set_terrain(TilePos::new(anchor.x + 1, anchor.y), TerrainKind::Water);

        assert_eq!(enforce_base_reservation(&mut map, "test"), 2);
        assert_eq!(map.terrain(anchor), Some(TerrainKind::Grass));
        assert_eq!(enforce_base_reservation(&mut map, "test"), 0);
    }

    #[test]
    fn test_corridor_carved_through_wall() {
        let mut map = Map::blank(30, 30);
        for y in 0..30 {
            map.set_terrain(TilePos::new(15, y), TerrainKind::Mountain);
        }

        let carved = connect_anchors(&mut map);
        assert_eq!(carved, 1);

        let grid = NavGrid::from_map(&map, Connectivity::FourWay);
        let anchors = map.anchors();
        assert!(find_path(&grid, anchors.player, anchors.enemy, Mobility::Ground).is_ok());
        assert_eq!(connect_anchors(&mut map), 0);
    }

    #[test]
    fn test_octants_cover_all_directions() {
        let mut seen = [false; 8];
        for (dx, dy) in [(3, 1), (1, 3), (-1, 3), (-3, 1), (-3, -1), (-1, -3), (1, -3), (3, -1)] {
            seen[octant(dx, dy)] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
