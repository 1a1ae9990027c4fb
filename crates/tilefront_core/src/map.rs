//! The tile grid a match is played on.
//!
//! A [`Map`] owns every [`Tile`], every [`ResourceDeposit`] and the two
//! base anchors. Terrain decides passability; the pathfinder works on a
//! derived [`NavGrid`](crate::pathfinding::NavGrid) that is refreshed
//! whenever a tile changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::economy::{DepositId, ResourceDeposit, ResourceKind};
use crate::error::Result;
use crate::map_generation::{generate_map, MapConfig};

/// Radius of the disk around each base anchor that is kept free of blocking
/// terrain.
pub const BASE_CLEAR_RADIUS: u32 = 4;

/// Integer grid coordinate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct TilePos {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl TilePos {
    /// Create a tile position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Offset by a signed delta. Returns `None` when either axis would go
    /// negative.
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Some(Self::new(x, y))
    }

    /// Manhattan distance.
    #[must_use]
    pub const fn manhattan_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Chebyshev distance.
    #[must_use]
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Squared Euclidean distance.
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> u64 {
        let dx = self.x.abs_diff(other.x) as u64;
        let dy = self.y.abs_diff(other.y) as u64;
        dx * dx + dy * dy
    }
}

/// How a tile can be traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Passability {
    /// Any mover may enter.
    Open,
    /// Nothing may enter.
    Blocked,
    /// Only movers with a special capability (hover) may enter.
    SpecialOnly,
}

/// Terrain kind of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TerrainKind {
    /// Open ground.
    #[default]
    Grass,
    /// Rivers and lakes. Crossable by hover units only.
    Water,
    /// Impassable ridges.
    Mountain,
    /// Impassable woodland that yields wood and clears to grass.
    Forest,
}

impl TerrainKind {
    /// Passability implied by the terrain alone.
    #[must_use]
    pub const fn passability(self) -> Passability {
        match self {
            Self::Grass => Passability::Open,
            Self::Water => Passability::SpecialOnly,
            Self::Mountain | Self::Forest => Passability::Blocked,
        }
    }

    /// Single-character glyph used by text renderings.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Grass => '.',
            Self::Water => '~',
            Self::Mountain => '^',
            Self::Forest => 'T',
        }
    }
}

/// One cell of the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Grid coordinate of this tile.
    pub position: TilePos,
    /// Terrain kind.
    pub kind: TerrainKind,
    /// Deposit sitting on this tile, if any.
    pub deposit: Option<DepositId>,
    /// Part of a base footprint; forced open.
    pub reserved: bool,
    /// A structure stands here.
    pub occupied: bool,
}

impl Tile {
    /// Effective passability. Reserved tiles are always open.
    #[must_use]
    pub const fn passability(&self) -> Passability {
        if self.reserved {
            Passability::Open
        } else {
            self.kind.passability()
        }
    }
}

/// Fixed starting positions of the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseAnchors {
    /// Player base centre.
    pub player: TilePos,
    /// Enemy base centre.
    pub enemy: TilePos,
}

impl BaseAnchors {
    /// Anchors at opposite corners, inset proportionally to the map size.
    #[must_use]
    pub fn for_dimensions(width: u32, height: u32) -> Self {
        let margin_x = (width / 10).max(BASE_CLEAR_RADIUS + 2);
        let margin_y = (height / 10).max(BASE_CLEAR_RADIUS + 2);
        Self {
            player: TilePos::new(margin_x, margin_y),
            enemy: TilePos::new(
                width.saturating_sub(margin_x + 1),
                height.saturating_sub(margin_y + 1),
            ),
        }
    }

    /// Both anchors, player first.
    #[must_use]
    pub const fn both(&self) -> [TilePos; 2] {
        [self.player, self.enemy]
    }
}

/// The full match grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Map {
    width: u32,
    height: u32,
    /// Row-major tiles.
    tiles: Vec<Tile>,
    deposits: BTreeMap<DepositId, ResourceDeposit>,
    anchors: BaseAnchors,
    next_deposit_id: DepositId,
}

impl Map {
    /// All-grass map with base disks reserved and no deposits.
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        let tiles = (0..height)
            .flat_map(|y| (0..width).map(move |x| TilePos::new(x, y)))
            .map(|position| Tile {
                position,
                kind: TerrainKind::Grass,
                deposit: None,
                reserved: false,
                occupied: false,
            })
            .collect();

        let mut map = Self {
            width,
            height,
            tiles,
            deposits: BTreeMap::new(),
            anchors: BaseAnchors::for_dimensions(width, height),
            next_deposit_id: 1,
        };
        for anchor in map.anchors.both() {
            for pos in map.disk(anchor, BASE_CLEAR_RADIUS) {
                if let Some(tile) = map.tile_mut(pos) {
                    tile.reserved = true;
                }
            }
        }
        map
    }

    /// Generate a procedural map with default feature densities.
    pub fn generate(width: u32, height: u32, seed: u64) -> Result<Self> {
        generate_map(&MapConfig::new(width, height).with_seed(seed))
    }

    /// Width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Base anchors.
    #[must_use]
    pub const fn anchors(&self) -> BaseAnchors {
        self.anchors
    }

    /// Check if a position lies on the map.
    #[must_use]
    pub const fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Row-major index of an in-bounds position.
    #[must_use]
    pub fn index(&self, pos: TilePos) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| (pos.y as usize) * (self.width as usize) + (pos.x as usize))
    }

    /// Tile at a position.
    #[must_use]
    pub fn tile(&self, pos: TilePos) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    pub(crate) fn tile_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        self.index(pos).map(|i| &mut self.tiles[i])
    }

    /// All tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Effective passability at a position.
    #[must_use]
    pub fn passability(&self, pos: TilePos) -> Option<Passability> {
        self.tile(pos).map(Tile::passability)
    }

    /// Terrain at a position.
    #[must_use]
    pub fn terrain(&self, pos: TilePos) -> Option<TerrainKind> {
        self.tile(pos).map(|t| t.kind)
    }

    /// Overwrite terrain. Returns `false` when out of bounds.
    pub fn set_terrain(&mut self, pos: TilePos, kind: TerrainKind) -> bool {
        match self.tile_mut(pos) {
            Some(tile) => {
                tile.kind = kind;
                true
            }
            None => false,
        }
    }

    /// Mark a tile as covered by a structure.
    pub fn set_occupied(&mut self, pos: TilePos, occupied: bool) -> bool {
        match self.tile_mut(pos) {
            Some(tile) => {
                tile.occupied = occupied;
                true
            }
            None => false,
        }
    }

    /// All in-bounds positions within Euclidean `radius` of `center`.
    #[must_use]
    pub fn disk(&self, center: TilePos, radius: u32) -> Vec<TilePos> {
        let r2 = u64::from(radius) * u64::from(radius);
        let min_x = center.x.saturating_sub(radius);
        let min_y = center.y.saturating_sub(radius);
        let max_x = center.x.saturating_add(radius).min(self.width.saturating_sub(1));
        let max_y = center.y.saturating_add(radius).min(self.height.saturating_sub(1));

        (min_y..=max_y)
            .flat_map(|y| (min_x..=max_x).map(move |x| TilePos::new(x, y)))
            .filter(|p| self.in_bounds(*p) && p.distance_squared(center) <= r2)
            .collect()
    }

    /// Whether `pos` falls inside either base disk.
    #[must_use]
    pub fn in_base_zone(&self, pos: TilePos, extra: u32) -> bool {
        let r = u64::from(BASE_CLEAR_RADIUS + extra);
        self.anchors
            .both()
            .iter()
            .any(|a| a.distance_squared(pos) <= r * r)
    }

    /// All deposits keyed by id.
    #[must_use]
    pub const fn deposits(&self) -> &BTreeMap<DepositId, ResourceDeposit> {
        &self.deposits
    }

    /// Look up a deposit.
    #[must_use]
    pub fn deposit(&self, id: DepositId) -> Option<&ResourceDeposit> {
        self.deposits.get(&id)
    }

    pub(crate) fn deposit_mut(&mut self, id: DepositId) -> Option<&mut ResourceDeposit> {
        self.deposits.get_mut(&id)
    }

    /// Place a deposit on a tile. Returns `None` if the tile is off the map
    /// or already holds one.
    pub fn add_deposit(
        &mut self,
        kind: ResourceKind,
        pos: TilePos,
        amount: u32,
    ) -> Option<DepositId> {
        let id = self.next_deposit_id;
        let tile = self.tile_mut(pos)?;
        if tile.deposit.is_some() {
            return None;
        }
        tile.deposit = Some(id);
        self.next_deposit_id += 1;
        self.deposits
            .insert(id, ResourceDeposit::new(id, kind, pos, amount));
        Some(id)
    }

    /// Remove a deposit and clear the tile's reference to it.
    ///
    /// A wood deposit takes its forest with it: the tile becomes grass.
    pub fn remove_deposit(&mut self, id: DepositId) -> Option<ResourceDeposit> {
        let deposit = self.deposits.remove(&id)?;
        if let Some(tile) = self.tile_mut(deposit.position) {
            tile.deposit = None;
            if deposit.kind == ResourceKind::Wood && tile.kind == TerrainKind::Forest {
                tile.kind = TerrainKind::Grass;
            }
        }
        Some(deposit)
    }

    /// ASCII rendering, one row per line. Anchors are drawn as `P` and `E`,
    /// deposits as `m`, `g` or `w`.
    #[must_use]
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity(((self.width + 1) * self.height) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let pos = TilePos::new(x, y);
                let glyph = if pos == self.anchors.player {
                    'P'
                } else if pos == self.anchors.enemy {
                    'E'
                } else {
                    match self.tile(pos) {
                        Some(tile) => match tile.deposit.and_then(|d| self.deposit(d)) {
                            Some(d) => match d.kind {
                                ResourceKind::Metal => 'm',
                                ResourceKind::Gold => 'g',
                                ResourceKind::Wood => 'w',
                            },
                            None => tile.kind.glyph(),
                        },
                        None => ' ',
                    }
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}
