//! The match aggregate and its clock.
//!
//! [`MatchState`] owns everything about a running match: the map, the
//! navigation grid, entities, ledgers and fog of war. Players and tools act
//! on it only through the `request_*` commands; time moves only through
//! [`MatchState::tick`].
//!
//! # Determinism
//!
//! - Positions and speeds are fixed-point, time is integer milliseconds
//! - Entities are processed in sorted id order
//! - Deposits and ledgers live in ordered maps
//!
//! # Example
//!
//! ```
//! use tilefront_core::prelude::*;
//!
//! let config = MatchConfig::new(40, 40).with_seed(3);
//! let mut state = MatchState::new(config).unwrap();
//!
//! let base = state.command_center(Owner::Player).unwrap();
//! state.request_spawn(base, UnitKind::Harvester).unwrap();
//!
//! for _ in 0..5 {
//!     state.tick(1_000);
//! }
//! assert_eq!(state.entities().len(), 3);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::catalog::{BuildingKind, UnitKind, COMMISSIONING_MS};
use crate::components::{footprint, Entity, EntityId, Owner, TaskState};
use crate::config::MatchConfig;
use crate::economy::{DepositId, ResourceKind, ResourceLedger};
use crate::error::{GameError, Result};
use crate::harvest::{harvest_tick, in_reach};
use crate::map::{Map, Passability, TilePos};
use crate::map_generation::generate_map;
use crate::math::{Fixed, Vec2Fixed};
use crate::pathfinding::{find_path, find_path_adjacent, Mobility, NavGrid};
use crate::production::{ConstructionProgress, ProductionQueue};
use crate::snapshot::MatchSnapshot;
use crate::visibility::{VisibilityField, VisionSource};

/// Rings searched around a structure when its spawn tile is blocked.
pub const SPAWN_SEARCH_RINGS: u32 = 4;

/// Storage for all entities in the match.
///
/// Uses a `HashMap` for O(1) entity lookup by ID, with deterministic
/// iteration via sorted keys when processing systems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStorage {
    entities: HashMap<EntityId, Entity>,
    next_id: EntityId,
}

impl Default for EntityStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStorage {
    /// Create empty entity storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new entity and return its ID.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        entity.id = id;
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity by ID.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get sorted entity IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Entities in ascending id order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &Entity> {
        self.sorted_ids()
            .into_iter()
            .filter_map(move |id| self.entities.get(&id))
    }

    /// Iterate over all entities (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Entity)> {
        self.entities.iter()
    }
}

/// A message for the player about a rejected or failed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Tick the notification was raised on.
    pub tick: u64,
    /// Side the message is for.
    pub owner: Owner,
    /// Entity involved, if any.
    pub entity: Option<EntityId>,
    /// Human-readable text.
    pub message: String,
}

/// Events generated during a tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Units spawned by production.
    pub spawned: Vec<EntityId>,
    /// Structures holding a finished job because no spawn tile was free.
    pub stalled: Vec<EntityId>,
    /// Structures that finished construction.
    pub constructed: Vec<EntityId>,
    /// Resources gathered: worker, resource, amount.
    pub harvested: Vec<(EntityId, ResourceKind, u32)>,
    /// Deposits that ran dry.
    pub depleted: Vec<DepositId>,
    /// Units that reached the end of their path.
    pub arrived: Vec<EntityId>,
    /// Units whose route was blocked and could not be replanned.
    pub stranded: Vec<EntityId>,
    /// Entities removed at zero health.
    pub deaths: Vec<EntityId>,
    /// Units whose commissioning countdown finished.
    pub commissioned: Vec<EntityId>,
}

/// A running match.
///
/// # System Execution Order
///
/// Each tick, systems run in this order:
/// 1. **Production** - Advance queues and spawn finished units
/// 2. **Construction** - Advance structures being built
/// 3. **Harvesting** - Extract from deposits into ledgers
/// 4. **Movement** - Move units along their paths
/// 5. **Health** - Remove entities at zero health
/// 6. **Countdowns** - Advance commissioning timers
/// 7. **Visibility** - Recompute each side's fog of war
#[derive(Debug, Clone)]
pub struct MatchState {
    config: MatchConfig,
    tick: u64,
    elapsed_ms: u64,
    map: Map,
    nav: NavGrid,
    entities: EntityStorage,
    ledgers: BTreeMap<Owner, ResourceLedger>,
    visibility: BTreeMap<Owner, VisibilityField>,
    notifications: Vec<Notification>,
}

impl MatchState {
    /// Generate a map from `config` and set up both bases.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidConfig`] for unusable dimensions.
    pub fn new(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        let map = generate_map(&config.map_config())?;
        tracing::info!(
            width = map.width(),
            height = map.height(),
            seed = config.seed,
            difficulty = ?config.difficulty,
            "Starting match"
        );
        Self::from_map(config, map)
    }

    /// Set up a match on a prepared map. The map size in `config` is
    /// ignored.
    ///
    /// # Errors
    ///
    /// [`GameError::PlacementRejected`] if a command centre does not fit on
    /// one of the base anchors.
    pub fn from_map(config: MatchConfig, map: Map) -> Result<Self> {
        let nav = NavGrid::from_map(&map, config.connectivity);
        let ledgers = Owner::SIDES
            .into_iter()
            .map(|owner| (owner, ResourceLedger::new(config.starting_resources)))
            .collect();
        let visibility = Owner::SIDES
            .into_iter()
            .map(|owner| (owner, VisibilityField::new(map.width(), map.height())))
            .collect();

        let mut state = Self {
            config,
            tick: 0,
            elapsed_ms: 0,
            map,
            nav,
            entities: EntityStorage::new(),
            ledgers,
            visibility,
            notifications: Vec::new(),
        };

        let anchors = state.map.anchors();
        for (owner, anchor) in [(Owner::Player, anchors.player), (Owner::Enemy, anchors.enemy)] {
            state.check_footprint(BuildingKind::CommandCenter, anchor)?;
            state.insert_structure(owner, BuildingKind::CommandCenter, anchor, false);
        }
        state.update_visibility();
        Ok(state)
    }

    /// Throw away all state and start over from the stored config.
    ///
    /// A fresh map is generated even if this match was built with
    /// [`from_map`](Self::from_map).
    pub fn reset(&mut self) -> Result<()> {
        *self = Self::new(self.config.clone())?;
        tracing::info!("Match reset");
        Ok(())
    }

    /// Configuration this match was created with.
    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Number of ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulated time in milliseconds.
    #[must_use]
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// The map.
    #[must_use]
    pub const fn map(&self) -> &Map {
        &self.map
    }

    /// The navigation grid.
    #[must_use]
    pub const fn nav_grid(&self) -> &NavGrid {
        &self.nav
    }

    /// All entities.
    #[must_use]
    pub const fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// One entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// A side's ledger. `None` for neutral.
    #[must_use]
    pub fn ledger(&self, owner: Owner) -> Option<&ResourceLedger> {
        self.ledgers.get(&owner)
    }

    /// A side's fog of war. `None` for neutral.
    #[must_use]
    pub fn visibility(&self, owner: Owner) -> Option<&VisibilityField> {
        self.visibility.get(&owner)
    }

    /// A structure's production queue.
    #[must_use]
    pub fn queue(&self, structure: EntityId) -> Option<&ProductionQueue> {
        self.entities
            .get(structure)
            .and_then(|e| e.production.as_ref())
    }

    /// Oldest command centre owned by `owner`.
    #[must_use]
    pub fn command_center(&self, owner: Owner) -> Option<EntityId> {
        self.entities
            .iter_sorted()
            .find(|e| {
                e.owner == owner && e.kind.building() == Some(BuildingKind::CommandCenter)
            })
            .map(|e| e.id)
    }

    /// Pending notifications, oldest first.
    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Take all pending notifications.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Capture what `viewer` can see. A neutral viewer sees everything.
    #[must_use]
    pub fn snapshot(&self, viewer: Owner) -> MatchSnapshot {
        MatchSnapshot::capture(self, viewer)
    }

    fn notify(&mut self, owner: Owner, entity: Option<EntityId>, message: String) {
        tracing::debug!(tick = self.tick, ?owner, ?entity, %message, "Notification");
        self.notifications.push(Notification {
            tick: self.tick,
            owner,
            entity,
            message,
        });
    }

    /// Record `error` as a notification and return it.
    fn reject<T>(&mut self, owner: Owner, entity: Option<EntityId>, error: GameError) -> Result<T> {
        self.notify(owner, entity, error.to_string());
        Err(error)
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Put a unit on the map immediately, free of charge.
    ///
    /// Used for scenario setup; units from production go through
    /// [`request_spawn`](Self::request_spawn).
    pub fn place_unit(&mut self, owner: Owner, kind: UnitKind, tile: TilePos) -> Result<EntityId> {
        if !self.nav.is_enterable(tile, kind.stats().mobility) {
            return Err(GameError::PlacementRejected(format!(
                "{} cannot stand on ({}, {})",
                kind.name(),
                tile.x,
                tile.y
            )));
        }
        Ok(self.entities.insert(Entity::unit(owner, kind, tile)))
    }

    /// Order a unit to walk to `goal`.
    ///
    /// Any current task is cancelled first. If no route exists the unit is
    /// left idle and a notification is raised.
    pub fn request_move(&mut self, id: EntityId, goal: TilePos) -> Result<()> {
        let (owner, kind, start, position) = self.unit_for_order(id)?;
        self.clear_task(id);

        let path = match find_path(&self.nav, start, goal, kind.stats().mobility) {
            Ok(path) => path,
            Err(err) => return self.reject(owner, Some(id), err.into_game_error(start, goal)),
        };
        self.begin_walk(id, start, position, path, None);
        tracing::debug!(entity = id, x = goal.x, y = goal.y, "Move ordered");
        Ok(())
    }

    /// Order a worker to harvest a deposit.
    ///
    /// The worker walks to any tile within reach of the deposit and starts
    /// harvesting on arrival, or immediately if already in reach.
    pub fn request_harvest(&mut self, id: EntityId, deposit: DepositId) -> Result<()> {
        let (owner, kind, start, position) = self.unit_for_order(id)?;
        let stats = kind.stats();
        if stats.harvest_yield == 0 {
            let err = GameError::InvalidOrder(format!("{} cannot harvest", kind.name()));
            return self.reject(owner, Some(id), err);
        }
        let Some(target) = self.map.deposit(deposit).map(|d| d.position) else {
            return self.reject(owner, Some(id), GameError::DepositNotFound(deposit));
        };

        self.clear_task(id);
        let path = match find_path_adjacent(&self.nav, start, target, stats.mobility) {
            Ok(path) => path,
            Err(err) => return self.reject(owner, Some(id), err.into_game_error(start, target)),
        };
        if let Some(d) = self.map.deposit_mut(deposit) {
            d.claimants.insert(id);
        }
        self.begin_walk(id, start, position, path, Some(deposit));
        tracing::debug!(entity = id, deposit, "Harvest ordered");
        Ok(())
    }

    /// Place a structure for the player.
    pub fn request_build(&mut self, kind: BuildingKind, center: TilePos) -> Result<EntityId> {
        self.request_build_for(Owner::Player, kind, center)
    }

    /// Place a structure for `owner`.
    ///
    /// The footprint must be open, unoccupied, free of deposits and free of
    /// units. The cost is paid up front and the structure starts in the
    /// constructing state.
    pub fn request_build_for(
        &mut self,
        owner: Owner,
        kind: BuildingKind,
        center: TilePos,
    ) -> Result<EntityId> {
        if let Err(err) = self.check_footprint(kind, center) {
            return self.reject(owner, None, err);
        }
        let cost = kind.stats().cost;
        let Some(ledger) = self.ledgers.get_mut(&owner) else {
            let err = GameError::InvalidOrder("neutral side cannot build".into());
            return self.reject(owner, None, err);
        };
        if let Err(err) = ledger.check(&cost) {
            return self.reject(owner, None, err);
        }
        ledger.spend(&cost);

        let id = self.insert_structure(owner, kind, center, true);
        tracing::debug!(
            entity = id,
            kind = kind.name(),
            x = center.x,
            y = center.y,
            "Construction started"
        );
        Ok(id)
    }

    /// Queue a unit at a structure.
    ///
    /// Affordability is checked before queue capacity; nothing is spent
    /// unless the job is accepted.
    pub fn request_spawn(&mut self, structure: EntityId, unit: UnitKind) -> Result<()> {
        let entity = self
            .entities
            .get(structure)
            .ok_or(GameError::EntityNotFound(structure))?;
        let owner = entity.owner;
        let building = entity.kind.building();
        let constructing = entity.is_under_construction();
        let queue_full = entity.production.as_ref().map(ProductionQueue::is_full);

        let Some(building) = building else {
            let err = GameError::InvalidOrder("only structures produce units".into());
            return self.reject(owner, Some(structure), err);
        };
        if constructing {
            let err = GameError::InvalidOrder(format!(
                "{} is still under construction",
                building.name()
            ));
            return self.reject(owner, Some(structure), err);
        }
        if !building.can_produce(unit) {
            let err = GameError::InvalidOrder(format!(
                "{} cannot produce {}",
                building.name(),
                unit.name()
            ));
            return self.reject(owner, Some(structure), err);
        }

        let stats = unit.stats();
        let affordable = self.ledgers.get(&owner).map(|l| l.check(&stats.cost));
        match affordable {
            Some(Ok(())) => {}
            Some(Err(err)) => return self.reject(owner, Some(structure), err),
            None => {
                let err = GameError::InvalidOrder("neutral side cannot produce".into());
                return self.reject(owner, Some(structure), err);
            }
        }
        if queue_full != Some(false) {
            return self.reject(owner, Some(structure), GameError::QueueFull);
        }

        if let Some(ledger) = self.ledgers.get_mut(&owner) {
            ledger.spend(&stats.cost);
        }
        if let Some(queue) = self
            .entities
            .get_mut(structure)
            .and_then(|e| e.production.as_mut())
        {
            queue.enqueue(unit, stats.build_time_ms)?;
        }
        tracing::debug!(structure, unit = unit.name(), "Production queued");
        Ok(())
    }

    /// Cancel whatever a unit is doing.
    pub fn cancel_order(&mut self, id: EntityId) -> Result<()> {
        self.unit_for_order(id)?;
        self.clear_task(id);
        Ok(())
    }

    /// Drop the job at the head of a structure's queue and refund its
    /// full cost, whatever its progress. Returns the cancelled unit kind.
    pub fn cancel_production(&mut self, structure: EntityId) -> Result<UnitKind> {
        let entity = self
            .entities
            .get_mut(structure)
            .ok_or(GameError::EntityNotFound(structure))?;
        let owner = entity.owner;
        let Some(job) = entity.production.as_mut().and_then(ProductionQueue::cancel_head) else {
            let err = GameError::InvalidOrder("nothing in production".into());
            return self.reject(owner, Some(structure), err);
        };

        if let Some(ledger) = self.ledgers.get_mut(&owner) {
            ledger.refund(&job.unit.stats().cost);
        }
        tracing::debug!(structure, unit = job.unit.name(), "Production cancelled");
        Ok(job.unit)
    }

    /// Damage an entity. Entities at zero health are removed on the next
    /// tick.
    pub fn apply_damage(&mut self, id: EntityId, amount: u32) -> Result<()> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or(GameError::EntityNotFound(id))?;
        entity.health.apply_damage(amount);
        Ok(())
    }

    /// Remove an entity now, releasing its deposit claim and footprint.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<Entity> {
        if !self.entities.contains(id) {
            return Err(GameError::EntityNotFound(id));
        }
        self.clear_task(id);
        let entity = self
            .entities
            .remove(id)
            .ok_or(GameError::EntityNotFound(id))?;
        if !entity.is_unit() {
            for pos in entity.footprint() {
                self.map.set_occupied(pos, false);
                self.nav.refresh_tile(&self.map, pos);
            }
        }
        Ok(entity)
    }

    fn unit_for_order(&mut self, id: EntityId) -> Result<(Owner, UnitKind, TilePos, Vec2Fixed)> {
        let entity = self.entities.get(id).ok_or(GameError::EntityNotFound(id))?;
        let owner = entity.owner;
        let kind = entity.kind.unit();
        let tile = entity.tile();
        let position = entity.position;
        match kind {
            Some(kind) => Ok((owner, kind, tile, position)),
            None => {
                let err = GameError::InvalidOrder("structures cannot take unit orders".into());
                self.reject(owner, Some(id), err)
            }
        }
    }

    /// Return a unit to idle, dropping its path and any deposit claim.
    fn clear_task(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get_mut(id) else {
            return;
        };
        let claimed = entity.task.claimed_deposit();
        entity.task = TaskState::Idle;
        entity.path.clear();
        if let Some(deposit) = claimed.and_then(|d| self.map.deposit_mut(d)) {
            deposit.claimants.remove(&id);
        }
    }

    /// Start following `path`. A unit caught between tiles first returns
    /// to the centre of the tile it is on.
    fn begin_walk(
        &mut self,
        id: EntityId,
        start: TilePos,
        position: Vec2Fixed,
        path: Vec<TilePos>,
        harvest: Option<DepositId>,
    ) {
        let Some(entity) = self.entities.get_mut(id) else {
            return;
        };
        let mut waypoints: VecDeque<TilePos> = path.into();
        if position != Vec2Fixed::tile_center(start) {
            waypoints.push_front(start);
        }

        entity.task = match waypoints.back() {
            Some(&destination) => TaskState::Moving {
                destination,
                harvest,
            },
            None => match harvest {
                Some(deposit) => TaskState::Harvesting { deposit },
                None => TaskState::Idle,
            },
        };
        entity.path = waypoints;
    }

    fn check_footprint(&self, kind: BuildingKind, center: TilePos) -> Result<()> {
        let half_extent = kind.stats().half_extent;
        let tiles = footprint(center, half_extent);
        let side = (2 * half_extent + 1) as usize;
        if tiles.len() != side * side {
            return Err(GameError::PlacementRejected(
                "footprint extends past the map edge".into(),
            ));
        }

        for pos in &tiles {
            let Some(tile) = self.map.tile(*pos) else {
                return Err(GameError::PlacementRejected(
                    "footprint extends past the map edge".into(),
                ));
            };
            let reason = if tile.occupied {
                Some("occupied by a structure")
            } else if tile.passability() != Passability::Open {
                Some("blocked by terrain")
            } else if tile.deposit.is_some() {
                Some("covered by a resource deposit")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(GameError::PlacementRejected(format!(
                    "tile ({}, {}) is {reason}",
                    pos.x, pos.y
                )));
            }
        }

        if self
            .entities
            .iter()
            .any(|(_, e)| e.is_unit() && tiles.contains(&e.tile()))
        {
            return Err(GameError::PlacementRejected(
                "units are standing in the footprint".into(),
            ));
        }
        Ok(())
    }

    fn insert_structure(
        &mut self,
        owner: Owner,
        kind: BuildingKind,
        center: TilePos,
        under_construction: bool,
    ) -> EntityId {
        let mut entity = Entity::structure(owner, kind, center);
        if under_construction {
            entity.construction = Some(ConstructionProgress::new(kind.stats().build_time_ms));
            entity.task = TaskState::Constructing;
        }
        for pos in entity.footprint() {
            self.map.set_occupied(pos, true);
            self.nav.refresh_tile(&self.map, pos);
        }
        self.entities.insert(entity)
    }

    // ------------------------------------------------------------------
    // Systems
    // ------------------------------------------------------------------

    /// Advance the match by `delta_ms` milliseconds.
    ///
    /// Runs all systems in deterministic order and increments the tick
    /// counter. Harvest yields are per tick, everything else scales with
    /// `delta_ms`.
    pub fn tick(&mut self, delta_ms: u32) -> TickEvents {
        let mut events = TickEvents::default();
        let entity_ids = self.entities.sorted_ids();

        // 1. Production
        self.run_production_system(&entity_ids, delta_ms, &mut events);

        // 2. Construction
        self.run_construction_system(&entity_ids, delta_ms, &mut events);

        // 3. Harvesting
        self.run_harvest_system(&entity_ids, &mut events);

        // 4. Movement
        self.run_movement_system(&entity_ids, delta_ms, &mut events);

        // 5. Health
        self.run_health_system(&entity_ids, &mut events);

        // 6. Countdowns
        self.run_countdown_system(&entity_ids, delta_ms, &mut events);

        // 7. Visibility
        self.update_visibility();

        self.tick += 1;
        self.elapsed_ms += u64::from(delta_ms);

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Match state hash");
        }

        events
    }

    fn run_production_system(
        &mut self,
        entity_ids: &[EntityId],
        delta_ms: u32,
        events: &mut TickEvents,
    ) {
        for &id in entity_ids {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            if entity.is_under_construction() {
                continue;
            }
            let Some(building) = entity.kind.building() else {
                continue;
            };
            let Some(queue) = entity.production.as_mut() else {
                continue;
            };
            if !queue.advance(delta_ms) {
                continue;
            }
            let Some(unit) = queue.head().map(|job| job.unit) else {
                continue;
            };
            let owner = entity.owner;
            let center = entity.tile();

            let half_extent = building.stats().half_extent;
            let Some(tile) = self.find_spawn_tile(center, half_extent, unit.stats().mobility)
            else {
                tracing::debug!(
                    structure = id,
                    unit = unit.name(),
                    "No free spawn tile; holding job"
                );
                events.stalled.push(id);
                continue;
            };

            if let Some(queue) = self
                .entities
                .get_mut(id)
                .and_then(|e| e.production.as_mut())
            {
                queue.pop_completed();
            }
            let mut spawned = Entity::unit(owner, unit, tile);
            spawned.commissioning_ms = Some(COMMISSIONING_MS);
            let new_id = self.entities.insert(spawned);
            tracing::debug!(
                structure = id,
                entity = new_id,
                unit = unit.name(),
                "Unit spawned"
            );
            events.spawned.push(new_id);
        }
    }

    /// Fixed spawn offset beside the footprint, falling back to the first
    /// enterable tile on successive rings around the structure.
    fn find_spawn_tile(
        &self,
        center: TilePos,
        half_extent: u32,
        mobility: Mobility,
    ) -> Option<TilePos> {
        let preferred = center.offset((half_extent + 1) as i32, 0);
        if let Some(tile) = preferred.filter(|p| self.nav.is_enterable(*p, mobility)) {
            return Some(tile);
        }

        for ring in (half_extent + 1)..=(half_extent + SPAWN_SEARCH_RINGS) {
            let r = ring as i32;
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx.abs() != r && dy.abs() != r {
                        continue;
                    }
                    if let Some(tile) = center
                        .offset(dx, dy)
                        .filter(|p| self.nav.is_enterable(*p, mobility))
                    {
                        return Some(tile);
                    }
                }
            }
        }
        None
    }

    fn run_construction_system(
        &mut self,
        entity_ids: &[EntityId],
        delta_ms: u32,
        events: &mut TickEvents,
    ) {
        for &id in entity_ids {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            let Some(progress) = entity.construction.as_mut() else {
                continue;
            };
            if progress.advance(delta_ms) {
                entity.construction = None;
                entity.task = TaskState::Idle;
                tracing::debug!(entity = id, "Construction complete");
                events.constructed.push(id);
            }
        }
    }

    fn run_harvest_system(&mut self, entity_ids: &[EntityId], events: &mut TickEvents) {
        for &id in entity_ids {
            let Some(entity) = self.entities.get(id) else {
                continue;
            };
            let TaskState::Harvesting { deposit } = entity.task else {
                continue;
            };
            let owner = entity.owner;
            let worker_tile = entity.tile();
            let yield_per_tick = entity.kind.unit().map_or(0, |k| k.stats().harvest_yield);

            let Some(source) = self.map.deposit_mut(deposit) else {
                self.clear_task(id);
                continue;
            };
            if !in_reach(worker_tile, source.position) {
                self.clear_task(id);
                continue;
            }

            let outcome = harvest_tick(source, yield_per_tick);
            if let Some(ledger) = self.ledgers.get_mut(&owner) {
                ledger.add(outcome.kind, outcome.amount);
            }
            events.harvested.push((id, outcome.kind, outcome.amount));

            if outcome.depleted {
                self.deplete_deposit(deposit);
                events.depleted.push(deposit);
            }
        }
    }

    /// Remove an exhausted deposit and idle everyone working it.
    fn deplete_deposit(&mut self, deposit: DepositId) {
        let Some(removed) = self.map.remove_deposit(deposit) else {
            return;
        };
        self.nav.refresh_tile(&self.map, removed.position);
        for worker in &removed.claimants {
            if let Some(entity) = self.entities.get_mut(*worker) {
                entity.task = TaskState::Idle;
                entity.path.clear();
            }
        }
        tracing::debug!(
            deposit,
            kind = removed.kind.name(),
            x = removed.position.x,
            y = removed.position.y,
            "Deposit depleted"
        );
    }

    fn run_movement_system(
        &mut self,
        entity_ids: &[EntityId],
        delta_ms: u32,
        events: &mut TickEvents,
    ) {
        for &id in entity_ids {
            let nav = &self.nav;
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            if entity.path.is_empty() {
                continue;
            }
            let Some(kind) = entity.kind.unit() else {
                continue;
            };
            let stats = kind.stats();
            // Saturates for huge deltas; any path is shorter than the cap.
            let mut budget = Fixed::saturating_from_num(delta_ms).saturating_mul(stats.speed)
                / Fixed::from_num(1000);
            let mut blocked = false;

            while budget > Fixed::ZERO {
                let Some(&next) = entity.path.front() else {
                    break;
                };
                if next != entity.tile() && !nav.is_enterable(next, stats.mobility) {
                    blocked = true;
                    break;
                }
                let target = Vec2Fixed::tile_center(next);
                let offset = target - entity.position;
                let distance = offset.x.abs().max(offset.y.abs());
                if distance <= budget {
                    entity.position = target;
                    budget -= distance;
                    entity.path.pop_front();
                } else {
                    entity.position = entity.position.step_toward(target, budget);
                    budget = Fixed::ZERO;
                }
            }
            let arrived = !blocked && entity.path.is_empty();

            if blocked {
                self.replan_route(id, events);
            } else if arrived {
                self.finish_walk(id);
                events.arrived.push(id);
            }
        }
    }

    /// Route around something that appeared on the path.
    fn replan_route(&mut self, id: EntityId, events: &mut TickEvents) {
        let Some(entity) = self.entities.get(id) else {
            return;
        };
        let TaskState::Moving {
            destination,
            harvest,
        } = entity.task
        else {
            return;
        };
        let Some(mobility) = entity.kind.unit().map(|k| k.stats().mobility) else {
            return;
        };
        let owner = entity.owner;
        let start = entity.tile();
        let position = entity.position;

        let route = match harvest.and_then(|d| self.map.deposit(d)) {
            Some(deposit) => find_path_adjacent(&self.nav, start, deposit.position, mobility),
            None => find_path(&self.nav, start, destination, mobility),
        };
        match route {
            Ok(path) => self.begin_walk(id, start, position, path, harvest),
            Err(err) => {
                self.clear_task(id);
                let message = format!(
                    "route blocked: {}",
                    err.into_game_error(start, destination)
                );
                self.notify(owner, Some(id), message);
                events.stranded.push(id);
            }
        }
    }

    fn finish_walk(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get(id) else {
            return;
        };
        let harvest = match entity.task {
            TaskState::Moving { harvest, .. } => harvest,
            _ => None,
        };
        let tile = entity.tile();

        let reachable = harvest
            .and_then(|d| self.map.deposit(d))
            .is_some_and(|d| in_reach(tile, d.position));
        match (harvest, reachable) {
            (Some(deposit), true) => {
                if let Some(entity) = self.entities.get_mut(id) {
                    entity.task = TaskState::Harvesting { deposit };
                }
            }
            _ => self.clear_task(id),
        }
    }

    fn run_health_system(&mut self, entity_ids: &[EntityId], events: &mut TickEvents) {
        for &id in entity_ids {
            let dead = self
                .entities
                .get(id)
                .is_some_and(|e| e.health.is_dead());
            if dead && self.remove_entity(id).is_ok() {
                tracing::debug!(entity = id, "Entity destroyed");
                events.deaths.push(id);
            }
        }
    }

    fn run_countdown_system(
        &mut self,
        entity_ids: &[EntityId],
        delta_ms: u32,
        events: &mut TickEvents,
    ) {
        for &id in entity_ids {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            let Some(remaining) = entity.commissioning_ms else {
                continue;
            };
            let left = remaining.saturating_sub(delta_ms);
            if left == 0 {
                entity.commissioning_ms = None;
                events.commissioned.push(id);
            } else {
                entity.commissioning_ms = Some(left);
            }
        }
    }

    fn update_visibility(&mut self) {
        for owner in Owner::SIDES {
            let sources: Vec<VisionSource> = self
                .entities
                .iter_sorted()
                .filter(|e| e.owner == owner)
                .map(|e| VisionSource::new(e.tile(), e.vision_radius()))
                .collect();
            if let Some(field) = self.visibility.get_mut(&owner) {
                field.recompute(&self.map, sources);
            }
        }
    }

    /// Compute a hash of the current match state.
    ///
    /// Two matches fed the same config and commands produce the same hash
    /// after every tick.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.elapsed_ms.hash(&mut hasher);

        let ids = self.entities.sorted_ids();
        ids.len().hash(&mut hasher);
        for entity in self.entities.iter_sorted() {
            entity.id.hash(&mut hasher);
            entity.owner.hash(&mut hasher);
            entity.kind.hash(&mut hasher);
            entity.position.x.to_bits().hash(&mut hasher);
            entity.position.y.to_bits().hash(&mut hasher);
            entity.health.hash(&mut hasher);
            entity.task.hash(&mut hasher);
            entity.path.hash(&mut hasher);
            entity.production.hash(&mut hasher);
            entity.construction.hash(&mut hasher);
            entity.commissioning_ms.hash(&mut hasher);
        }

        self.ledgers.hash(&mut hasher);

        for (id, deposit) in self.map.deposits() {
            id.hash(&mut hasher);
            deposit.remaining.hash(&mut hasher);
        }

        hasher.finish()
    }
}
