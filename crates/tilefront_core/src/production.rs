//! Unit production queues and structure construction.
//!
//! A [`ProductionQueue`] is a FIFO of [`BuildJob`]s. Only the job at the
//! head accrues progress; everything behind it waits. A finished job stays
//! at the head until the simulation finds room to spawn the unit and pops
//! it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::catalog::UnitKind;
use crate::error::{GameError, Result};

/// One unit being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildJob {
    /// Unit to spawn on completion.
    pub unit: UnitKind,
    /// Elapsed production time in milliseconds.
    pub progress_ms: u32,
    /// Total production time in milliseconds.
    pub duration_ms: u32,
}

impl BuildJob {
    /// Create a job with no progress.
    #[must_use]
    pub const fn new(unit: UnitKind, duration_ms: u32) -> Self {
        Self {
            unit,
            progress_ms: 0,
            duration_ms,
        }
    }

    /// Check if production time has fully elapsed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.progress_ms >= self.duration_ms
    }

    /// Completion percentage (0-100).
    #[must_use]
    pub fn percentage(&self) -> u32 {
        percent_of(self.progress_ms, self.duration_ms)
    }
}

fn percent_of(progress_ms: u32, duration_ms: u32) -> u32 {
    if duration_ms == 0 {
        return 100;
    }
    let pct = u64::from(progress_ms) * 100 / u64::from(duration_ms);
    pct.min(100) as u32
}

/// FIFO production queue owned by a structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductionQueue {
    jobs: VecDeque<BuildJob>,
    capacity: usize,
}

impl ProductionQueue {
    /// Create an empty queue holding at most `capacity` jobs.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            jobs: VecDeque::new(),
            capacity,
        }
    }

    /// Queue that accepts one job at a time.
    #[must_use]
    pub fn single_slot() -> Self {
        Self::new(1)
    }

    /// Maximum number of jobs.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of queued jobs, including the active one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Check if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Check if another job would be rejected.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.capacity
    }

    /// Job currently in production.
    #[must_use]
    pub fn head(&self) -> Option<&BuildJob> {
        self.jobs.front()
    }

    /// All queued jobs, head first.
    pub fn jobs(&self) -> impl Iterator<Item = &BuildJob> {
        self.jobs.iter()
    }

    /// Append a job.
    ///
    /// # Errors
    ///
    /// [`GameError::QueueFull`] when at capacity.
    pub fn enqueue(&mut self, unit: UnitKind, duration_ms: u32) -> Result<()> {
        if self.is_full() {
            return Err(GameError::QueueFull);
        }
        self.jobs.push_back(BuildJob::new(unit, duration_ms));
        Ok(())
    }

    /// Add elapsed time to the head job. Returns `true` when the head is
    /// complete and ready to spawn.
    pub fn advance(&mut self, delta_ms: u32) -> bool {
        match self.jobs.front_mut() {
            Some(job) => {
                job.progress_ms = job.progress_ms.saturating_add(delta_ms).min(job.duration_ms);
                job.is_complete()
            }
            None => false,
        }
    }

    /// Remove the head job if it is complete.
    pub fn pop_completed(&mut self) -> Option<BuildJob> {
        if self.jobs.front().is_some_and(BuildJob::is_complete) {
            self.jobs.pop_front()
        } else {
            None
        }
    }

    /// Drop the head job regardless of progress.
    pub fn cancel_head(&mut self) -> Option<BuildJob> {
        self.jobs.pop_front()
    }

    /// Completion percentage of the head job.
    #[must_use]
    pub fn head_percentage(&self) -> Option<u32> {
        self.head().map(BuildJob::percentage)
    }
}

/// Countdown for a structure being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstructionProgress {
    /// Elapsed construction time in milliseconds.
    pub elapsed_ms: u32,
    /// Total construction time in milliseconds.
    pub duration_ms: u32,
}

impl ConstructionProgress {
    /// Start a countdown.
    #[must_use]
    pub const fn new(duration_ms: u32) -> Self {
        Self {
            elapsed_ms: 0,
            duration_ms,
        }
    }

    /// Advance and report completion.
    pub fn advance(&mut self, delta_ms: u32) -> bool {
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms).min(self.duration_ms);
        self.elapsed_ms >= self.duration_ms
    }

    /// Completion percentage (0-100).
    #[must_use]
    pub fn percentage(&self) -> u32 {
        percent_of(self.elapsed_ms, self.duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_slot_rejects_second_job() {
        let mut queue = ProductionQueue::single_slot();
        assert!(queue.enqueue(UnitKind::Harvester, 5_000).is_ok());
        assert_eq!(
            queue.enqueue(UnitKind::Harvester, 5_000),
            Err(GameError::QueueFull)
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_only_head_progresses() {
        let mut queue = ProductionQueue::new(3);
        queue.enqueue(UnitKind::Soldier, 1_000).unwrap();
        queue.enqueue(UnitKind::Soldier, 1_000).unwrap();

        assert!(!queue.advance(600));
        let jobs: Vec<_> = queue.jobs().copied().collect();
        assert_eq!(jobs[0].progress_ms, 600);
        assert_eq!(jobs[1].progress_ms, 0);
    }

    #[test]
    fn test_completion_and_pop() {
        let mut queue = ProductionQueue::new(2);
        queue.enqueue(UnitKind::Harvester, 5_000).unwrap();

        assert!(queue.pop_completed().is_none());
        assert!(!queue.advance(4_999));
        assert_eq!(queue.head_percentage(), Some(99));
        assert!(queue.advance(16));

        let job = queue.pop_completed().unwrap();
        assert_eq!(job.unit, UnitKind::Harvester);
        assert_eq!(job.progress_ms, 5_000);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_completed_job_holds_head() {
        let mut queue = ProductionQueue::new(2);
        queue.enqueue(UnitKind::Tank, 100).unwrap();
        queue.enqueue(UnitKind::Tank, 100).unwrap();

        assert!(queue.advance(500));
        assert!(queue.advance(500));
        let jobs: Vec<_> = queue.jobs().copied().collect();
        assert_eq!(jobs[1].progress_ms, 0);
    }

    #[test]
    fn test_advance_empty_queue() {
        let mut queue = ProductionQueue::new(1);
        assert!(!queue.advance(1_000));
        assert_eq!(queue.head_percentage(), None);
    }

    #[test]
    fn test_construction_countdown() {
        let mut progress = ConstructionProgress::new(20_000);
        assert!(!progress.advance(10_000));
        assert_eq!(progress.percentage(), 50);
        assert!(progress.advance(10_000));
        assert_eq!(progress.percentage(), 100);
    }
}
