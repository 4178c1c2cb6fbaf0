//! Household storage traits for Starboard.
//!
//! This module defines the `HouseholdStore` trait: versioned reads of the
//! child aggregate and request records, read access to the task and reward
//! catalogs, and atomic batch commits with optimistic-concurrency checks.

use std::sync::Arc;

use crate::core::{Child, CustomRewardRequest, Reward, RewardRedemption, Task, TaskCompletion};
use crate::error::Result;
use crate::storage::state::{CommitOutcome, RecordQuery, Versioned, WriteBatch};

/// Trait for household storage backends.
///
/// Reads return the record with the version it had when read. Writes only
/// happen through [`HouseholdStore::commit`], which applies a batch
/// all-or-nothing and reports a conflict if any record changed since it was
/// read.
pub trait HouseholdStore: Send + Sync {
    /// Retrieve a child by ID.
    ///
    /// Returns `Ok(None)` if the child doesn't exist.
    fn child(&self, id: &str) -> Result<Option<Versioned<Child>>>;

    /// List the children of a family, sorted by name.
    fn children(&self, family_id: &str) -> Result<Vec<Child>>;

    /// Look up a task in the catalog.
    fn task(&self, id: &str) -> Result<Option<Task>>;

    /// Look up a reward in the catalog.
    fn reward(&self, id: &str) -> Result<Option<Reward>>;

    /// Retrieve a task completion by ID.
    fn completion(&self, id: &str) -> Result<Option<Versioned<TaskCompletion>>>;

    /// List completions matching the query, oldest first.
    fn completions(&self, query: &RecordQuery) -> Result<Vec<TaskCompletion>>;

    /// Retrieve a reward redemption by ID.
    fn redemption(&self, id: &str) -> Result<Option<Versioned<RewardRedemption>>>;

    /// List redemptions matching the query, oldest first.
    fn redemptions(&self, query: &RecordQuery) -> Result<Vec<RewardRedemption>>;

    /// Retrieve a custom reward request by ID.
    fn custom_request(&self, id: &str) -> Result<Option<Versioned<CustomRewardRequest>>>;

    /// List custom requests matching the query, oldest first.
    fn custom_requests(&self, query: &RecordQuery) -> Result<Vec<CustomRewardRequest>>;

    /// Add a child profile. Fails if the id is taken.
    fn register_child(&self, child: &Child) -> Result<()>;

    /// Create or replace a task catalog entry.
    fn put_task(&self, task: &Task) -> Result<()>;

    /// Create or replace a reward catalog entry.
    fn put_reward(&self, reward: &Reward) -> Result<()>;

    /// Apply a batch of writes atomically.
    fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome>;
}

/// Blanket implementation of HouseholdStore for Arc-wrapped stores.
///
/// This allows sharing one store between an engine and its tests, or
/// between threads.
impl<T: HouseholdStore + ?Sized> HouseholdStore for Arc<T> {
    fn child(&self, id: &str) -> Result<Option<Versioned<Child>>> {
        (**self).child(id)
    }

    fn children(&self, family_id: &str) -> Result<Vec<Child>> {
        (**self).children(family_id)
    }

    fn task(&self, id: &str) -> Result<Option<Task>> {
        (**self).task(id)
    }

    fn reward(&self, id: &str) -> Result<Option<Reward>> {
        (**self).reward(id)
    }

    fn completion(&self, id: &str) -> Result<Option<Versioned<TaskCompletion>>> {
        (**self).completion(id)
    }

    fn completions(&self, query: &RecordQuery) -> Result<Vec<TaskCompletion>> {
        (**self).completions(query)
    }

    fn redemption(&self, id: &str) -> Result<Option<Versioned<RewardRedemption>>> {
        (**self).redemption(id)
    }

    fn redemptions(&self, query: &RecordQuery) -> Result<Vec<RewardRedemption>> {
        (**self).redemptions(query)
    }

    fn custom_request(&self, id: &str) -> Result<Option<Versioned<CustomRewardRequest>>> {
        (**self).custom_request(id)
    }

    fn custom_requests(&self, query: &RecordQuery) -> Result<Vec<CustomRewardRequest>> {
        (**self).custom_requests(query)
    }

    fn register_child(&self, child: &Child) -> Result<()> {
        (**self).register_child(child)
    }

    fn put_task(&self, task: &Task) -> Result<()> {
        (**self).put_task(task)
    }

    fn put_reward(&self, reward: &Reward) -> Result<()> {
        (**self).put_reward(reward)
    }

    fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome> {
        (**self).commit(batch)
    }
}
