//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a match produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the match has to avoid:
//!
//! - **Floating-point math**: Positions and speeds use
//!   [`tilefront_core::math::Fixed`].
//!
//! - **HashMap iteration order**: Systems iterate entities in sorted id
//!   order; deposits and ledgers live in ordered maps.
//!
//! - **System randomness**: Map generation draws only from a
//!   `ChaCha8Rng` seeded from the match config.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual passes and systems are reproducible
//! 2. **Property tests**: Random command scripts replay identically
//! 3. **Integration tests**: Full matches hash identically tick for tick

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use tilefront_core::catalog::UnitKind;
use tilefront_core::components::Owner;
use tilefront_core::map::TilePos;
use tilefront_core::simulation::MatchState;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic match).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the match was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Match is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use tilefront_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// An order issued at a given tick of a scripted match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedOrder {
    /// Queue a unit at the side's command centre.
    Spawn(Owner, UnitKind),
    /// Send a side's lowest-id unit to a tile.
    Move(Owner, TilePos),
    /// Send a side's lowest-id unit to the lowest-id deposit.
    Harvest(Owner),
}

/// Apply an order to a match. Rejections are traced and otherwise ignored.
pub fn apply_order(state: &mut MatchState, order: ScriptedOrder) {
    let first_unit = |state: &MatchState, owner: Owner| {
        state
            .entities()
            .iter_sorted()
            .find(|e| e.owner == owner && e.is_unit())
            .map(|e| e.id)
    };

    // Rejected orders are part of the script too; they must be rejected
    // identically on every run.
    let result = match order {
        ScriptedOrder::Spawn(owner, unit) => match state.command_center(owner) {
            Some(cc) => state.request_spawn(cc, unit),
            None => Ok(()),
        },
        ScriptedOrder::Move(owner, goal) => match first_unit(state, owner) {
            Some(id) => state.request_move(id, goal),
            None => Ok(()),
        },
        ScriptedOrder::Harvest(owner) => {
            let deposit = state.map().deposits().keys().next().copied();
            match (first_unit(state, owner), deposit) {
                (Some(id), Some(deposit)) => state.request_harvest(id, deposit),
                _ => Ok(()),
            }
        }
    };
    if let Err(err) = result {
        tracing::trace!(?order, %err, "Scripted order rejected");
    }
}

/// Run a scripted match and record the state hash after every tick.
///
/// `script` pairs a tick number with the order issued just before that
/// tick runs.
pub fn hash_trace<F>(
    setup: F,
    script: &[(u64, ScriptedOrder)],
    ticks: u64,
    delta_ms: u32,
) -> Vec<u64>
where
    F: Fn() -> MatchState,
{
    let mut state = setup();
    let mut trace = Vec::with_capacity(ticks as usize);
    for tick in 0..ticks {
        for (_, order) in script.iter().filter(|(at, _)| *at == tick) {
            apply_order(&mut state, *order);
        }
        state.tick(delta_ms);
        trace.push(state.state_hash());
    }
    trace
}

/// Compare two scripted runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if the runs are identical, `Some(tick)` for the first tick whose
/// hashes differ.
pub fn find_first_divergence<F>(
    setup: F,
    script: &[(u64, ScriptedOrder)],
    ticks: u64,
    delta_ms: u32,
) -> Option<u64>
where
    F: Fn() -> MatchState,
{
    let a = hash_trace(&setup, script, ticks, delta_ms);
    let b = hash_trace(&setup, script, ticks, delta_ms);
    a.iter()
        .zip(&b)
        .position(|(x, y)| x != y)
        .map(|i| i as u64 + 1)
}

/// Run the same scripted match on several threads and collect final
/// hashes.
///
/// Catches accidental reliance on per-process state such as randomized
/// hashers.
///
/// # Panics
///
/// Panics if a worker thread panics.
#[must_use]
pub fn run_parallel_matches<F>(
    setup: F,
    script: &[(u64, ScriptedOrder)],
    runs: usize,
    ticks: u64,
    delta_ms: u32,
) -> Vec<u64>
where
    F: Fn() -> MatchState + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..runs)
            .map(|_| {
                s.spawn(|| {
                    hash_trace(&setup, script, ticks, delta_ms)
                        .last()
                        .copied()
                        .unwrap_or_default()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
pub mod strategies {
    use proptest::prelude::*;
    use tilefront_core::catalog::UnitKind;
    use tilefront_core::components::Owner;
    use tilefront_core::map::TilePos;

    use super::ScriptedOrder;

    /// Either playing side.
    pub fn arb_side() -> impl Strategy<Value = Owner> {
        prop_oneof![Just(Owner::Player), Just(Owner::Enemy)]
    }

    /// A tile on a map of the given size.
    pub fn arb_tile(width: u32, height: u32) -> impl Strategy<Value = TilePos> {
        (0..width, 0..height).prop_map(|(x, y)| TilePos::new(x, y))
    }

    /// Any scripted order.
    pub fn arb_order(width: u32, height: u32) -> impl Strategy<Value = ScriptedOrder> {
        prop_oneof![
            arb_side().prop_map(|side| ScriptedOrder::Spawn(side, UnitKind::Harvester)),
            (arb_side(), arb_tile(width, height))
                .prop_map(|(side, goal)| ScriptedOrder::Move(side, goal)),
            arb_side().prop_map(ScriptedOrder::Harvest),
        ]
    }

    /// A script of orders spread across the first `ticks` ticks.
    pub fn arb_script(
        width: u32,
        height: u32,
        ticks: u64,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<(u64, ScriptedOrder)>> {
        proptest::collection::vec((0..ticks, arb_order(width, height)), 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::open_match;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_detects_divergence() {
        let result = DeterminismResult {
            is_deterministic: false,
            hashes: vec![1, 2, 1],
            ticks: 5,
        };
        assert_eq!(result.unique_hashes(), vec![1, 2]);
    }

    #[test]
    #[should_panic(expected = "non-deterministic")]
    fn test_assert_panics_on_divergence() {
        DeterminismResult {
            is_deterministic: false,
            hashes: vec![1, 2],
            ticks: 1,
        }
        .assert_deterministic();
    }

    #[test]
    fn test_idle_match_has_no_divergence() {
        assert_eq!(find_first_divergence(|| open_match(32, 32), &[], 50, 100), None);
    }

    #[test]
    fn test_scripted_spawn_is_applied() {
        let script = [(0, ScriptedOrder::Spawn(Owner::Player, UnitKind::Harvester))];
        let with = hash_trace(|| open_match(32, 32), &script, 10, 1_000);
        let without = hash_trace(|| open_match(32, 32), &[], 10, 1_000);
        assert_ne!(with.last(), without.last());
    }
}
