//! In-memory household storage.
//!
//! This module provides a thread-safe in-memory implementation of the
//! HouseholdStore trait, used by tests and by embedders that persist state
//! elsewhere.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::{Child, CustomRewardRequest, Reward, RewardRedemption, Task, TaskCompletion};
use crate::error::Result;
use crate::storage::state::{CommitOutcome, HouseholdState, RecordQuery, Versioned, WriteBatch};
use crate::storage::HouseholdStore;

/// In-memory household store.
///
/// Thread-safe implementation using one `RwLock` over the whole document,
/// so a commit's version checks and writes happen in one critical section.
#[derive(Debug, Default)]
pub struct MemoryHouseholdStore {
    state: RwLock<HouseholdState>,
}

impl MemoryHouseholdStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from an existing document.
    pub fn from_state(state: HouseholdState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Copy of the whole document.
    pub fn snapshot(&self) -> HouseholdState {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, HouseholdState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HouseholdState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HouseholdStore for MemoryHouseholdStore {
    fn child(&self, id: &str) -> Result<Option<Versioned<Child>>> {
        Ok(self.read().children.get(id).cloned())
    }

    fn children(&self, family_id: &str) -> Result<Vec<Child>> {
        Ok(self.read().children_of(family_id))
    }

    fn task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.read().tasks.get(id).cloned())
    }

    fn reward(&self, id: &str) -> Result<Option<Reward>> {
        Ok(self.read().rewards.get(id).cloned())
    }

    fn completion(&self, id: &str) -> Result<Option<Versioned<TaskCompletion>>> {
        Ok(self.read().completions.get(id).cloned())
    }

    fn completions(&self, query: &RecordQuery) -> Result<Vec<TaskCompletion>> {
        Ok(self.read().query_completions(query))
    }

    fn redemption(&self, id: &str) -> Result<Option<Versioned<RewardRedemption>>> {
        Ok(self.read().redemptions.get(id).cloned())
    }

    fn redemptions(&self, query: &RecordQuery) -> Result<Vec<RewardRedemption>> {
        Ok(self.read().query_redemptions(query))
    }

    fn custom_request(&self, id: &str) -> Result<Option<Versioned<CustomRewardRequest>>> {
        Ok(self.read().custom_requests.get(id).cloned())
    }

    fn custom_requests(&self, query: &RecordQuery) -> Result<Vec<CustomRewardRequest>> {
        Ok(self.read().query_custom_requests(query))
    }

    fn register_child(&self, child: &Child) -> Result<()> {
        self.write().register_child(child)
    }

    fn put_task(&self, task: &Task) -> Result<()> {
        self.write().tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    fn put_reward(&self, reward: &Reward) -> Result<()> {
        self.write().rewards.insert(reward.id.clone(), reward.clone());
        Ok(())
    }

    fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome> {
        Ok(self.write().apply(batch))
    }
}
