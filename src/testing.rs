//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, TimeZone, Utc};

use crate::core::{Child, CustomRewardRequest, Reward, RewardRedemption, Task, TaskCompletion};
use crate::error::Result;
use crate::storage::{
    CommitOutcome, HouseholdStore, MemoryHouseholdStore, RecordQuery, Versioned, WriteBatch,
};

/// 2026-03-02 09:00 UTC, a Monday morning.
pub fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

/// A store wrapper that rejects the first `n` commits as conflicts.
pub struct ContendedStore {
    inner: MemoryHouseholdStore,
    remaining: AtomicU32,
    injected: AtomicU32,
}

impl ContendedStore {
    pub fn new(inner: MemoryHouseholdStore, conflicts: u32) -> Self {
        Self {
            inner,
            remaining: AtomicU32::new(conflicts),
            injected: AtomicU32::new(0),
        }
    }

    pub fn inner(&self) -> &MemoryHouseholdStore {
        &self.inner
    }

    pub fn conflicts_injected(&self) -> u32 {
        self.injected.load(Ordering::SeqCst)
    }
}

impl HouseholdStore for ContendedStore {
    fn child(&self, id: &str) -> Result<Option<Versioned<Child>>> {
        self.inner.child(id)
    }

    fn children(&self, family_id: &str) -> Result<Vec<Child>> {
        self.inner.children(family_id)
    }

    fn task(&self, id: &str) -> Result<Option<Task>> {
        self.inner.task(id)
    }

    fn reward(&self, id: &str) -> Result<Option<Reward>> {
        self.inner.reward(id)
    }

    fn completion(&self, id: &str) -> Result<Option<Versioned<TaskCompletion>>> {
        self.inner.completion(id)
    }

    fn completions(&self, query: &RecordQuery) -> Result<Vec<TaskCompletion>> {
        self.inner.completions(query)
    }

    fn redemption(&self, id: &str) -> Result<Option<Versioned<RewardRedemption>>> {
        self.inner.redemption(id)
    }

    fn redemptions(&self, query: &RecordQuery) -> Result<Vec<RewardRedemption>> {
        self.inner.redemptions(query)
    }

    fn custom_request(&self, id: &str) -> Result<Option<Versioned<CustomRewardRequest>>> {
        self.inner.custom_request(id)
    }

    fn custom_requests(&self, query: &RecordQuery) -> Result<Vec<CustomRewardRequest>> {
        self.inner.custom_requests(query)
    }

    fn register_child(&self, child: &Child) -> Result<()> {
        self.inner.register_child(child)
    }

    fn put_task(&self, task: &Task) -> Result<()> {
        self.inner.put_task(task)
    }

    fn put_reward(&self, reward: &Reward) -> Result<()> {
        self.inner.put_reward(reward)
    }

    fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome> {
        let take = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if take.is_ok() {
            self.injected.fetch_add(1, Ordering::SeqCst);
            return Ok(CommitOutcome::Conflict);
        }
        self.inner.commit(batch)
    }
}
