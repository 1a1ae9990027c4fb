//! Static unit and building definitions.
//!
//! Costs are in [`ResourceAmounts`], times in milliseconds and speeds in
//! tiles per second.

use serde::{Deserialize, Serialize};

use crate::economy::ResourceAmounts;
use crate::math::Fixed;
use crate::pathfinding::Mobility;

/// Units that structures can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Resource gatherer.
    Harvester,
    /// Basic infantry.
    Soldier,
    /// Heavy ground vehicle.
    Tank,
    /// Fast hover craft able to cross water.
    Hovercraft,
}

/// Structures that can be placed on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildingKind {
    /// Main base. Produces harvesters.
    CommandCenter,
    /// Infantry production.
    Barracks,
    /// Vehicle production.
    Factory,
}

/// Stats for a unit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStats {
    /// Production cost.
    pub cost: ResourceAmounts,
    /// Production time in milliseconds.
    pub build_time_ms: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Vision radius in tiles.
    pub vision_radius: u32,
    /// Movement speed in tiles per second.
    pub speed: Fixed,
    /// Terrain the unit may cross.
    pub mobility: Mobility,
    /// Amount gathered per tick while harvesting. Zero for non-gatherers.
    pub harvest_yield: u32,
}

/// Stats for a building kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingStats {
    /// Construction cost.
    pub cost: ResourceAmounts,
    /// Construction time in milliseconds.
    pub build_time_ms: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Vision radius in tiles once operational.
    pub vision_radius: u32,
    /// Footprint is a square of side `2 * half_extent + 1` around the centre.
    pub half_extent: u32,
    /// Units this building can produce.
    pub produces: &'static [UnitKind],
    /// Production queue capacity.
    pub queue_capacity: usize,
}

/// Time before a freshly spawned unit is commissioned.
pub const COMMISSIONING_MS: u32 = 5_000;

impl UnitKind {
    /// Every unit kind.
    pub const ALL: [Self; 4] = [Self::Harvester, Self::Soldier, Self::Tank, Self::Hovercraft];

    /// Stats for this kind.
    #[must_use]
    pub const fn stats(self) -> UnitStats {
        match self {
            Self::Harvester => UnitStats {
                cost: ResourceAmounts::new(30, 10, 0),
                build_time_ms: 5_000,
                max_health: 100,
                vision_radius: 5,
                speed: Fixed::const_from_int(4),
                mobility: Mobility::Ground,
                harvest_yield: 5,
            },
            Self::Soldier => UnitStats {
                cost: ResourceAmounts::new(100, 50, 0),
                build_time_ms: 15_000,
                max_health: 100,
                vision_radius: 5,
                speed: Fixed::const_from_int(3),
                mobility: Mobility::Ground,
                harvest_yield: 0,
            },
            Self::Tank => UnitStats {
                cost: ResourceAmounts::new(300, 150, 0),
                build_time_ms: 30_000,
                max_health: 300,
                vision_radius: 5,
                speed: Fixed::const_from_int(2),
                mobility: Mobility::Ground,
                harvest_yield: 0,
            },
            Self::Hovercraft => UnitStats {
                cost: ResourceAmounts::new(200, 100, 0),
                build_time_ms: 20_000,
                max_health: 150,
                vision_radius: 6,
                speed: Fixed::const_from_int(5),
                mobility: Mobility::Hover,
                harvest_yield: 0,
            },
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Harvester => "harvester",
            Self::Soldier => "soldier",
            Self::Tank => "tank",
            Self::Hovercraft => "hovercraft",
        }
    }
}

impl BuildingKind {
    /// Every building kind.
    pub const ALL: [Self; 3] = [Self::CommandCenter, Self::Barracks, Self::Factory];

    /// Stats for this kind.
    #[must_use]
    pub const fn stats(self) -> BuildingStats {
        match self {
            Self::CommandCenter => BuildingStats {
                cost: ResourceAmounts::new(200, 100, 0),
                build_time_ms: 30_000,
                max_health: 1_000,
                vision_radius: 5,
                half_extent: 1,
                produces: &[UnitKind::Harvester],
                queue_capacity: 1,
            },
            Self::Barracks => BuildingStats {
                cost: ResourceAmounts::new(150, 50, 0),
                build_time_ms: 20_000,
                max_health: 500,
                vision_radius: 3,
                half_extent: 1,
                produces: &[UnitKind::Soldier],
                queue_capacity: 5,
            },
            Self::Factory => BuildingStats {
                cost: ResourceAmounts::new(300, 150, 0),
                build_time_ms: 40_000,
                max_health: 800,
                vision_radius: 3,
                half_extent: 1,
                produces: &[UnitKind::Tank, UnitKind::Hovercraft],
                queue_capacity: 5,
            },
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CommandCenter => "command center",
            Self::Barracks => "barracks",
            Self::Factory => "factory",
        }
    }

    /// Whether this building can produce `unit`.
    #[must_use]
    pub fn can_produce(self, unit: UnitKind) -> bool {
        self.stats().produces.contains(&unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harvester_cost_matches_base_economy() {
        let stats = UnitKind::Harvester.stats();
        assert_eq!(stats.cost, ResourceAmounts::new(30, 10, 0));
        assert_eq!(stats.build_time_ms, 5_000);
        assert!(stats.harvest_yield > 0);
    }

    #[test]
    fn test_only_harvesters_gather() {
        for kind in UnitKind::ALL {
            let gathers = kind.stats().harvest_yield > 0;
            assert_eq!(gathers, kind == UnitKind::Harvester, "{kind:?}");
        }
    }

    #[test]
    fn test_every_unit_has_a_producer() {
        for unit in UnitKind::ALL {
            assert!(
                BuildingKind::ALL.iter().any(|b| b.can_produce(unit)),
                "{unit:?} cannot be produced"
            );
        }
    }

    #[test]
    fn test_command_center_queue_is_single_slot() {
        assert_eq!(BuildingKind::CommandCenter.stats().queue_capacity, 1);
        assert!(BuildingKind::CommandCenter.can_produce(UnitKind::Harvester));
        assert!(!BuildingKind::CommandCenter.can_produce(UnitKind::Tank));
    }

    #[test]
    fn test_only_hovercraft_hovers() {
        assert_eq!(UnitKind::Hovercraft.stats().mobility, Mobility::Hover);
        assert_eq!(UnitKind::Tank.stats().mobility, Mobility::Ground);
    }
}
