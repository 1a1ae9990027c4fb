//! Entity data.
//!
//! Entities are plain data; all behaviour lives in the match systems in
//! [`simulation`](crate::simulation).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::catalog::{BuildingKind, UnitKind};
use crate::economy::DepositId;
use crate::map::TilePos;
use crate::math::Vec2Fixed;
use crate::production::{ConstructionProgress, ProductionQueue};

/// Unique identifier for entities.
pub type EntityId = u64;

/// Which side an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Owner {
    /// Local player.
    Player,
    /// Opposing side.
    Enemy,
    /// Nobody.
    Neutral,
}

impl Owner {
    /// Sides that keep a ledger and a fog-of-war field.
    pub const SIDES: [Self; 2] = [Self::Player, Self::Enemy];
}

/// What an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A mobile unit.
    Unit(UnitKind),
    /// A structure occupying a footprint.
    Structure(BuildingKind),
}

impl EntityKind {
    /// Unit kind, if this is a unit.
    #[must_use]
    pub const fn unit(self) -> Option<UnitKind> {
        match self {
            Self::Unit(kind) => Some(kind),
            Self::Structure(_) => None,
        }
    }

    /// Building kind, if this is a structure.
    #[must_use]
    pub const fn building(self) -> Option<BuildingKind> {
        match self {
            Self::Structure(kind) => Some(kind),
            Self::Unit(_) => None,
        }
    }
}

/// Health component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health. Never exceeds `max`.
    pub current: u32,
    /// Maximum health.
    pub max: u32,
}

impl Health {
    /// Full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Apply damage, saturating at zero.
    pub fn apply_damage(&mut self, amount: u32) {
        self.current = self.current.saturating_sub(amount);
    }

    /// Restore health, capped at `max`.
    pub fn heal(&mut self, amount: u32) {
        self.current = self.current.saturating_add(amount).min(self.max);
    }

    /// Check if health has reached zero.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }
}

/// What an entity is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskState {
    /// Nothing.
    #[default]
    Idle,
    /// Following a path. `harvest` is set when the walk ends at a deposit.
    Moving {
        /// Final tile of the path.
        destination: TilePos,
        /// Deposit to start harvesting on arrival.
        harvest: Option<DepositId>,
    },
    /// Extracting from a deposit each tick.
    Harvesting {
        /// Deposit being worked.
        deposit: DepositId,
    },
    /// Structure under construction.
    Constructing,
}

impl TaskState {
    /// Deposit this task has claimed, if any.
    #[must_use]
    pub const fn claimed_deposit(self) -> Option<DepositId> {
        match self {
            Self::Moving { harvest, .. } => harvest,
            Self::Harvesting { deposit } => Some(deposit),
            Self::Idle | Self::Constructing => None,
        }
    }

    /// Short label for snapshots and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Moving { .. } => "moving",
            Self::Harvesting { .. } => "harvesting",
            Self::Constructing => "constructing",
        }
    }
}

/// A game entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: EntityId,
    /// Owning side.
    pub owner: Owner,
    /// Unit or structure kind.
    pub kind: EntityKind,
    /// Position in tile units. Tile centres sit at `n + 0.5`.
    pub position: Vec2Fixed,
    /// Health.
    pub health: Health,
    /// Remaining waypoints, consumed from the front.
    pub path: VecDeque<TilePos>,
    /// Current task.
    pub task: TaskState,
    /// Production queue for structures that build units.
    pub production: Option<ProductionQueue>,
    /// Construction countdown while a structure is being built.
    pub construction: Option<ConstructionProgress>,
    /// Milliseconds left before a new unit is commissioned.
    pub commissioning_ms: Option<u32>,
}

impl Entity {
    /// Create a unit at a tile centre.
    #[must_use]
    pub fn unit(owner: Owner, kind: UnitKind, tile: TilePos) -> Self {
        let stats = kind.stats();
        Self {
            id: 0,
            owner,
            kind: EntityKind::Unit(kind),
            position: Vec2Fixed::tile_center(tile),
            health: Health::new(stats.max_health),
            path: VecDeque::new(),
            task: TaskState::Idle,
            production: None,
            construction: None,
            commissioning_ms: None,
        }
    }

    /// Create an operational structure centred on a tile.
    #[must_use]
    pub fn structure(owner: Owner, kind: BuildingKind, center: TilePos) -> Self {
        let stats = kind.stats();
        Self {
            id: 0,
            owner,
            kind: EntityKind::Structure(kind),
            position: Vec2Fixed::tile_center(center),
            health: Health::new(stats.max_health),
            path: VecDeque::new(),
            task: TaskState::Idle,
            production: (!stats.produces.is_empty())
                .then(|| ProductionQueue::new(stats.queue_capacity)),
            construction: None,
            commissioning_ms: None,
        }
    }

    /// Tile the entity stands on (its centre tile for structures).
    #[must_use]
    pub fn tile(&self) -> TilePos {
        self.position.to_tile().unwrap_or_default()
    }

    /// Whether this is a mobile unit.
    #[must_use]
    pub const fn is_unit(&self) -> bool {
        matches!(self.kind, EntityKind::Unit(_))
    }

    /// Whether this is a structure still under construction.
    #[must_use]
    pub const fn is_under_construction(&self) -> bool {
        self.construction.is_some()
    }

    /// Whether the commissioning countdown has finished.
    #[must_use]
    pub const fn is_commissioned(&self) -> bool {
        self.commissioning_ms.is_none()
    }

    /// Vision radius in tiles. Structures under construction see one tile.
    #[must_use]
    pub const fn vision_radius(&self) -> u32 {
        match self.kind {
            EntityKind::Unit(kind) => kind.stats().vision_radius,
            EntityKind::Structure(_) if self.construction.is_some() => 1,
            EntityKind::Structure(kind) => kind.stats().vision_radius,
        }
    }

    /// Tiles covered by this entity: the footprint for structures, the
    /// current tile for units.
    #[must_use]
    pub fn footprint(&self) -> Vec<TilePos> {
        match self.kind {
            EntityKind::Unit(_) => vec![self.tile()],
            EntityKind::Structure(kind) => footprint(self.tile(), kind.stats().half_extent),
        }
    }
}

/// Square of side `2 * half_extent + 1` around `center`, clipped at zero.
#[must_use]
pub fn footprint(center: TilePos, half_extent: u32) -> Vec<TilePos> {
    let he = half_extent as i32;
    (-he..=he)
        .flat_map(|dy| (-he..=he).map(move |dx| (dx, dy)))
        .filter_map(|(dx, dy)| center.offset(dx, dy))
        .collect()
}
