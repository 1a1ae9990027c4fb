//! Read-only views of a match filtered through one side's fog of war.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, EntityKind, Health, Owner, TaskState};
use crate::economy::{ResourceAmounts, ResourceKind};
use crate::map::{TerrainKind, TilePos};
use crate::math::Vec2Fixed;
use crate::production::BuildJob;
use crate::simulation::MatchState;
use crate::visibility::TileVisibility;

/// What a viewer knows about one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSnapshot {
    /// Current terrain when visible, remembered terrain when explored.
    pub terrain: Option<TerrainKind>,
    /// Fog state.
    pub visibility: TileVisibility,
    /// Deposit on the tile. Only reported while visible.
    pub deposit: Option<ResourceKind>,
}

/// An entity as seen by the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Entity id.
    pub id: EntityId,
    /// Owning side.
    pub owner: Owner,
    /// Unit or structure kind.
    pub kind: EntityKind,
    /// Exact position.
    pub position: Vec2Fixed,
    /// Tile the entity stands on.
    pub tile: TilePos,
    /// Health.
    pub health: Health,
    /// Current task.
    pub task: TaskState,
    /// Commissioning has finished.
    pub commissioned: bool,
    /// Construction progress for structures still being built.
    pub construction_percentage: Option<u32>,
}

/// One of the viewer's production queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Structure owning the queue.
    pub structure: EntityId,
    /// Queued jobs, head first.
    pub jobs: Vec<BuildJob>,
    /// Completion percentage of the head job.
    pub head_percentage: Option<u32>,
    /// Maximum number of jobs.
    pub capacity: usize,
}

/// Everything one side is allowed to know at a given tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// Tick the snapshot was taken after.
    pub tick: u64,
    /// Simulated milliseconds.
    pub elapsed_ms: u64,
    /// Side the snapshot was taken for.
    pub viewer: Owner,
    /// Map width in tiles.
    pub width: u32,
    /// Map height in tiles.
    pub height: u32,
    /// Row-major tiles.
    pub tiles: Vec<TileSnapshot>,
    /// Own entities plus any other entity on a visible tile.
    pub entities: Vec<EntitySnapshot>,
    /// Viewer's ledger. `None` for neutral.
    pub resources: Option<ResourceAmounts>,
    /// Viewer's production queues.
    pub queues: Vec<QueueSnapshot>,
}

impl MatchSnapshot {
    /// Capture the match as `viewer` sees it.
    #[must_use]
    pub fn capture(state: &MatchState, viewer: Owner) -> Self {
        let map = state.map();
        let field = state.visibility(viewer);

        let tiles = map
            .tiles()
            .map(|tile| {
                let visibility =
                    field.map_or(TileVisibility::Visible, |f| f.state(tile.position));
                let deposit = tile
                    .deposit
                    .and_then(|id| map.deposit(id))
                    .map(|d| d.kind);
                match visibility {
                    TileVisibility::Visible => TileSnapshot {
                        terrain: Some(tile.kind),
                        visibility,
                        deposit,
                    },
                    TileVisibility::Explored => TileSnapshot {
                        terrain: field.and_then(|f| f.remembered_terrain(tile.position)),
                        visibility,
                        deposit: None,
                    },
                    TileVisibility::Unseen => TileSnapshot {
                        terrain: None,
                        visibility,
                        deposit: None,
                    },
                }
            })
            .collect();

        let sees = |pos: TilePos| field.map_or(true, |f| f.is_visible(pos));
        let entities = state
            .entities()
            .iter_sorted()
            .filter(|e| e.owner == viewer || e.footprint().into_iter().any(&sees))
            .map(|e| EntitySnapshot {
                id: e.id,
                owner: e.owner,
                kind: e.kind,
                position: e.position,
                tile: e.tile(),
                health: e.health,
                task: e.task,
                commissioned: e.is_commissioned(),
                construction_percentage: e.construction.map(|c| c.percentage()),
            })
            .collect();

        let queues = state
            .entities()
            .iter_sorted()
            .filter(|e| e.owner == viewer)
            .filter_map(|e| {
                e.production.as_ref().map(|q| QueueSnapshot {
                    structure: e.id,
                    jobs: q.jobs().copied().collect(),
                    head_percentage: q.head_percentage(),
                    capacity: q.capacity(),
                })
            })
            .collect();

        Self {
            tick: state.tick_count(),
            elapsed_ms: state.elapsed_ms(),
            viewer,
            width: map.width(),
            height: map.height(),
            tiles,
            entities,
            resources: state.ledger(viewer).map(|l| l.amounts()),
            queues,
        }
    }

    /// Tile at a position.
    #[must_use]
    pub fn tile(&self, pos: TilePos) -> Option<&TileSnapshot> {
        if pos.x >= self.width || pos.y >= self.height {
            return None;
        }
        self.tiles
            .get((pos.y as usize) * (self.width as usize) + (pos.x as usize))
    }

    /// Look up an entity in the snapshot.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities.iter().find(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::UnitKind;
    use crate::config::MatchConfig;
    use crate::map::Map;

    fn state() -> MatchState {
        MatchState::from_map(MatchConfig::default(), Map::blank(40, 40)).unwrap()
    }

    #[test]
    fn test_enemy_base_hidden_from_player() {
        let state = state();
        let snapshot = state.snapshot(Owner::Player);
        let enemy_cc = state.command_center(Owner::Enemy).unwrap();
        let own_cc = state.command_center(Owner::Player).unwrap();

        assert!(snapshot.entity(enemy_cc).is_none());
        assert!(snapshot.entity(own_cc).is_some());
        assert_eq!(snapshot.queues.len(), 1);
        assert_eq!(snapshot.resources, Some(ResourceAmounts::new(50, 20, 30)));

        let far = snapshot.tile(state.map().anchors().enemy).unwrap();
        assert_eq!(far.visibility, TileVisibility::Unseen);
        assert_eq!(far.terrain, None);
    }

    #[test]
    fn test_neutral_viewer_sees_everything() {
        let state = state();
        let snapshot = state.snapshot(Owner::Neutral);

        assert_eq!(snapshot.entities.len(), 2);
        assert!(snapshot
            .tiles
            .iter()
            .all(|t| t.visibility == TileVisibility::Visible && t.terrain.is_some()));
        assert_eq!(snapshot.resources, None);
        assert!(snapshot.queues.is_empty());
    }

    #[test]
    fn test_enemy_unit_visible_in_range() {
        let mut state = state();
        let anchor = state.map().anchors().player;
        let intruder = state
            .place_unit(Owner::Enemy, UnitKind::Soldier, TilePos::new(anchor.x + 3, anchor.y))
            .unwrap();
        state.tick(16);

        let snapshot = state.snapshot(Owner::Player);
        let seen = snapshot.entity(intruder).unwrap();
        assert_eq!(seen.owner, Owner::Enemy);
        assert!(seen.commissioned);
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = state().snapshot(Owner::Player);
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: MatchSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
