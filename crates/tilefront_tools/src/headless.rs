//! Headless match runs.
//!
//! Drives a match without a renderer: the player's command centre keeps a
//! harvester in production whenever it can afford one, and idle harvesters
//! are sent to the nearest deposit they can reach.

use std::collections::BTreeMap;

use serde::Serialize;
use tilefront_core::catalog::UnitKind;
use tilefront_core::components::{EntityId, Owner, TaskState};
use tilefront_core::config::MatchConfig;
use tilefront_core::economy::{ResourceAmounts, ResourceKind};
use tilefront_core::simulation::{MatchState, Notification, TickEvents};
use tilefront_core::snapshot::MatchSnapshot;

use crate::Result;

/// Deposits tried per idle worker before giving up for this tick.
const DEPOSIT_CANDIDATES: usize = 3;

/// Totals collected over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    /// Units spawned.
    pub spawned: usize,
    /// Structures completed.
    pub constructed: usize,
    /// Deposits exhausted.
    pub depleted: usize,
    /// Entities destroyed.
    pub deaths: usize,
    /// Resources gathered by kind.
    pub harvested: BTreeMap<ResourceKind, u64>,
}

impl RunTotals {
    fn record(&mut self, events: &TickEvents) {
        self.spawned += events.spawned.len();
        self.constructed += events.constructed.len();
        self.depleted += events.depleted.len();
        self.deaths += events.deaths.len();
        for (_, kind, amount) in &events.harvested {
            *self.harvested.entry(*kind).or_default() += u64::from(*amount);
        }
    }
}

/// Outcome of a headless run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Ticks run.
    pub ticks: u64,
    /// Simulated milliseconds.
    pub elapsed_ms: u64,
    /// Final state hash.
    pub state_hash: u64,
    /// Map size.
    pub map_size: (u32, u32),
    /// Player's final ledger.
    pub player_resources: Option<ResourceAmounts>,
    /// Player units by kind.
    pub player_units: BTreeMap<String, usize>,
    /// Deposits left on the map.
    pub deposits_remaining: usize,
    /// Event totals.
    pub totals: RunTotals,
    /// Notifications raised during the run.
    pub notifications: Vec<Notification>,
    /// Final player snapshot, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<MatchSnapshot>,
}

/// Run a match for `ticks` ticks of `delta_ms` each.
///
/// # Errors
///
/// Fails only if the match cannot be created from `config`.
pub fn run_headless(
    config: MatchConfig,
    ticks: u64,
    delta_ms: u32,
    include_snapshot: bool,
) -> Result<RunSummary> {
    let mut state = MatchState::new(config)?;
    let mut totals = RunTotals::default();
    let mut notifications = Vec::new();

    for _ in 0..ticks {
        keep_harvester_queued(&mut state);
        dispatch_idle_harvesters(&mut state);
        let events = state.tick(delta_ms);
        totals.record(&events);
        notifications.extend(state.drain_notifications());
    }

    tracing::info!(
        ticks = state.tick_count(),
        spawned = totals.spawned,
        depleted = totals.depleted,
        "Headless run finished"
    );

    let mut player_units = BTreeMap::new();
    for entity in state.entities().iter_sorted() {
        if let (Owner::Player, Some(kind)) = (entity.owner, entity.kind.unit()) {
            *player_units.entry(kind.name().to_string()).or_default() += 1;
        }
    }

    Ok(RunSummary {
        ticks: state.tick_count(),
        elapsed_ms: state.elapsed_ms(),
        state_hash: state.state_hash(),
        map_size: (state.map().width(), state.map().height()),
        player_resources: state.ledger(Owner::Player).map(|l| l.amounts()),
        player_units,
        deposits_remaining: state.map().deposits().len(),
        totals,
        notifications,
        snapshot: include_snapshot.then(|| state.snapshot(Owner::Player)),
    })
}

fn keep_harvester_queued(state: &mut MatchState) {
    let Some(cc) = state.command_center(Owner::Player) else {
        return;
    };
    let idle_queue = state.queue(cc).is_some_and(|q| q.is_empty());
    let affordable = state
        .ledger(Owner::Player)
        .is_some_and(|l| l.can_afford(&UnitKind::Harvester.stats().cost));
    if idle_queue && affordable {
        if let Err(err) = state.request_spawn(cc, UnitKind::Harvester) {
            tracing::debug!(structure = cc, %err, "Harvester not queued");
        }
    }
}

fn dispatch_idle_harvesters(state: &mut MatchState) {
    let idle: Vec<EntityId> = state
        .entities()
        .iter_sorted()
        .filter(|e| {
            e.owner == Owner::Player
                && e.kind.unit() == Some(UnitKind::Harvester)
                && e.task == TaskState::Idle
        })
        .map(|e| e.id)
        .collect();

    for worker in idle {
        let Some(tile) = state.entity(worker).map(|e| e.tile()) else {
            continue;
        };
        let mut candidates: Vec<_> = state
            .map()
            .deposits()
            .values()
            .map(|d| (d.position.distance_squared(tile), d.id))
            .collect();
        candidates.sort_unstable();

        for (_, deposit) in candidates.into_iter().take(DEPOSIT_CANDIDATES) {
            if state.request_harvest(worker, deposit).is_ok() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_run_produces_harvesters() {
        let config = MatchConfig::new(48, 48).with_seed(5);
        let summary = run_headless(config, 60, 500, false).unwrap();

        assert_eq!(summary.ticks, 60);
        assert_eq!(summary.elapsed_ms, 30_000);
        assert!(summary.totals.spawned >= 1);
        assert!(summary.player_units.get("harvester").copied().unwrap_or(0) >= 1);
        assert!(summary.snapshot.is_none());
    }

    #[test]
    fn test_headless_run_is_reproducible() {
        let config = MatchConfig::new(48, 48).with_seed(11);
        let a = run_headless(config.clone(), 40, 250, false).unwrap();
        let b = run_headless(config, 40, 250, false).unwrap();
        assert_eq!(a.state_hash, b.state_hash);
        assert_eq!(a.totals, b.totals);
    }

    #[test]
    fn test_summary_serializes_with_snapshot() {
        let summary = run_headless(MatchConfig::new(32, 32), 2, 100, true).unwrap();
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"snapshot\""));
        assert!(json.contains("\"state_hash\""));
    }
}
