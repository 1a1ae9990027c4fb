//! Harvesting rules.
//!
//! A worker harvests while standing within one tile (Chebyshev) of a
//! deposit, pulling its fixed per-tick yield straight into the owner's
//! ledger. There is no carry-and-return trip.

use crate::economy::{ResourceDeposit, ResourceKind};
use crate::map::TilePos;

/// Result of one harvesting tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestOutcome {
    /// Resource gathered.
    pub kind: ResourceKind,
    /// Amount gathered this tick.
    pub amount: u32,
    /// The deposit ran dry on this tick.
    pub depleted: bool,
}

/// Whether a worker on `worker` can reach a deposit on `deposit`.
#[must_use]
pub fn in_reach(worker: TilePos, deposit: TilePos) -> bool {
    worker.chebyshev_distance(deposit) <= 1
}

/// Extract one tick's yield from a deposit.
pub fn harvest_tick(deposit: &mut ResourceDeposit, yield_per_tick: u32) -> HarvestOutcome {
    let amount = deposit.extract(yield_per_tick);
    HarvestOutcome {
        kind: deposit.kind,
        amount,
        depleted: deposit.is_depleted(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reach_includes_diagonals() {
        let deposit = TilePos::new(5, 5);
        assert!(in_reach(TilePos::new(4, 4), deposit));
        assert!(in_reach(TilePos::new(5, 5), deposit));
        assert!(!in_reach(TilePos::new(3, 5), deposit));
    }

    #[test]
    fn test_fifty_at_five_per_tick_takes_ten_ticks() {
        let mut deposit = ResourceDeposit::new(1, ResourceKind::Metal, TilePos::new(2, 2), 50);
        let mut ticks = 0;
        let mut total = 0;
        loop {
            let outcome = harvest_tick(&mut deposit, 5);
            ticks += 1;
            total += outcome.amount;
            if outcome.depleted {
                break;
            }
        }
        assert_eq!(ticks, 10);
        assert_eq!(total, 50);
    }

    #[test]
    fn test_last_tick_takes_remainder() {
        let mut deposit = ResourceDeposit::new(1, ResourceKind::Wood, TilePos::new(2, 2), 7);
        assert_eq!(harvest_tick(&mut deposit, 5).amount, 5);
        let last = harvest_tick(&mut deposit, 5);
        assert_eq!(last.amount, 2);
        assert!(last.depleted);
        assert_eq!(last.kind, ResourceKind::Wood);
    }
}
