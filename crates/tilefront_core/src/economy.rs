//! Resource economy: per-player ledgers and harvestable deposits.
//!
//! Three resources exist: metal, gold and wood. Each player owns a
//! [`ResourceLedger`]; harvesters pull fixed amounts out of a
//! [`ResourceDeposit`] until it runs dry.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::error::{GameError, Result};
use crate::map::TilePos;

/// Identifier for a resource deposit on the map.
pub type DepositId = u32;

/// Kind of harvestable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Mined from metal deposits on open ground.
    Metal,
    /// Mined from gold deposits on open ground.
    Gold,
    /// Cut from forest tiles.
    Wood,
}

impl ResourceKind {
    /// All resource kinds in ledger order.
    pub const ALL: [Self; 3] = [Self::Metal, Self::Gold, Self::Wood];

    /// Lowercase display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Metal => "metal",
            Self::Gold => "gold",
            Self::Wood => "wood",
        }
    }
}

/// A bundle of resource amounts, used for costs and stockpiles alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceAmounts {
    /// Metal amount.
    pub metal: u32,
    /// Gold amount.
    pub gold: u32,
    /// Wood amount.
    pub wood: u32,
}

impl ResourceAmounts {
    /// Create a bundle from explicit amounts.
    #[must_use]
    pub const fn new(metal: u32, gold: u32, wood: u32) -> Self {
        Self { metal, gold, wood }
    }

    /// Empty bundle.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Amount of a single resource.
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Metal => self.metal,
            ResourceKind::Gold => self.gold,
            ResourceKind::Wood => self.wood,
        }
    }

    fn get_mut(&mut self, kind: ResourceKind) -> &mut u32 {
        match kind {
            ResourceKind::Metal => &mut self.metal,
            ResourceKind::Gold => &mut self.gold,
            ResourceKind::Wood => &mut self.wood,
        }
    }
}

/// A player's resource stockpile.
///
/// All counters are non-negative. Spending is all-or-nothing: either every
/// resource in the cost is deducted or the ledger is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResourceLedger {
    amounts: ResourceAmounts,
}

impl ResourceLedger {
    /// Create a ledger holding the given amounts.
    #[must_use]
    pub const fn new(amounts: ResourceAmounts) -> Self {
        Self { amounts }
    }

    /// Current amount of one resource.
    #[must_use]
    pub const fn amount(&self, kind: ResourceKind) -> u32 {
        self.amounts.get(kind)
    }

    /// Current stockpile as a bundle.
    #[must_use]
    pub const fn amounts(&self) -> ResourceAmounts {
        self.amounts
    }

    /// Check whether every resource in `cost` is covered.
    #[must_use]
    pub fn can_afford(&self, cost: &ResourceAmounts) -> bool {
        self.shortfall(cost).is_none()
    }

    /// First resource that `cost` cannot be covered for, with the required
    /// and available amounts.
    #[must_use]
    pub fn shortfall(&self, cost: &ResourceAmounts) -> Option<(ResourceKind, u32, u32)> {
        ResourceKind::ALL.into_iter().find_map(|kind| {
            let required = cost.get(kind);
            let available = self.amount(kind);
            (available < required).then_some((kind, required, available))
        })
    }

    /// Like [`can_afford`](Self::can_afford) but reports the shortfall as
    /// [`GameError::InsufficientResources`].
    pub fn check(&self, cost: &ResourceAmounts) -> Result<()> {
        match self.shortfall(cost) {
            Some((kind, required, available)) => Err(GameError::InsufficientResources {
                resource: kind.name().to_string(),
                required,
                available,
            }),
            None => Ok(()),
        }
    }

    /// Deduct `cost` if affordable. Returns `false` and changes nothing
    /// otherwise.
    pub fn spend(&mut self, cost: &ResourceAmounts) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for kind in ResourceKind::ALL {
            *self.amounts.get_mut(kind) -= cost.get(kind);
        }
        true
    }

    /// Credit a single resource. Saturates at `u32::MAX`.
    pub fn add(&mut self, kind: ResourceKind, amount: u32) {
        let slot = self.amounts.get_mut(kind);
        *slot = slot.saturating_add(amount);
    }

    /// Credit a whole bundle back, e.g. for cancelled production.
    pub fn refund(&mut self, cost: &ResourceAmounts) {
        for kind in ResourceKind::ALL {
            self.add(kind, cost.get(kind));
        }
    }
}

/// A finite resource deposit sitting on one map tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDeposit {
    /// Deposit identifier.
    pub id: DepositId,
    /// What this deposit yields.
    pub kind: ResourceKind,
    /// Tile the deposit sits on.
    pub position: TilePos,
    /// Amount left. Never increases.
    pub remaining: u32,
    /// Workers currently assigned to this deposit.
    pub claimants: BTreeSet<EntityId>,
}

impl ResourceDeposit {
    /// Create a deposit with no claimants.
    #[must_use]
    pub fn new(id: DepositId, kind: ResourceKind, position: TilePos, amount: u32) -> Self {
        Self {
            id,
            kind,
            position,
            remaining: amount,
            claimants: BTreeSet::new(),
        }
    }

    /// Take up to `amount`, returning what was actually extracted.
    pub fn extract(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.remaining);
        self.remaining -= taken;
        taken
    }

    /// Check if the deposit is empty.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_spend_deducts_every_resource() {
        let mut ledger = ResourceLedger::new(ResourceAmounts::new(50, 20, 30));

        assert!(ledger.spend(&ResourceAmounts::new(30, 10, 0)));
        assert_eq!(ledger.amounts(), ResourceAmounts::new(20, 10, 30));
    }

    #[test]
    fn test_spend_rejects_without_partial_deduction() {
        let mut ledger = ResourceLedger::new(ResourceAmounts::new(100, 5, 0));

        assert!(!ledger.spend(&ResourceAmounts::new(30, 10, 0)));
        assert_eq!(ledger.amounts(), ResourceAmounts::new(100, 5, 0));
    }

    #[test]
    fn test_check_reports_first_shortfall() {
        let ledger = ResourceLedger::new(ResourceAmounts::new(20, 10, 0));
        let err = ledger.check(&ResourceAmounts::new(30, 10, 0)).unwrap_err();

        assert_eq!(
            err,
            GameError::InsufficientResources {
                resource: "metal".into(),
                required: 30,
                available: 20,
            }
        );
    }

    #[test]
    fn test_add_saturates() {
        let mut ledger = ResourceLedger::new(ResourceAmounts::new(u32::MAX - 1, 0, 0));
        ledger.add(ResourceKind::Metal, 10);
        ledger.add(ResourceKind::Wood, 5);

        assert_eq!(ledger.amount(ResourceKind::Metal), u32::MAX);
        assert_eq!(ledger.amount(ResourceKind::Wood), 5);
    }

    #[test]
    fn test_deposit_extraction() {
        let mut deposit = ResourceDeposit::new(1, ResourceKind::Gold, TilePos::new(3, 4), 12);

        assert_eq!(deposit.extract(5), 5);
        assert_eq!(deposit.extract(5), 5);
        assert!(!deposit.is_depleted());

        assert_eq!(deposit.extract(5), 2);
        assert!(deposit.is_depleted());
        assert_eq!(deposit.extract(5), 0);
    }

    fn amounts() -> impl Strategy<Value = ResourceAmounts> {
        (0u32..500, 0u32..500, 0u32..500).prop_map(|(m, g, w)| ResourceAmounts::new(m, g, w))
    }

    proptest! {
        #[test]
        fn prop_spend_is_all_or_nothing(stock in amounts(), cost in amounts()) {
            let mut ledger = ResourceLedger::new(stock);
            let affordable = ledger.can_afford(&cost);

            let spent = ledger.spend(&cost);
            prop_assert_eq!(spent, affordable);

            if spent {
                for kind in ResourceKind::ALL {
                    prop_assert_eq!(ledger.amount(kind), stock.get(kind) - cost.get(kind));
                }
            } else {
                prop_assert_eq!(ledger.amounts(), stock);
            }
        }
    }
}
