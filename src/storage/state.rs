//! The versioned household document shared by every store backend.
//!
//! Each record carries a version that starts at 1 and increases by one on
//! every committed update. A [`WriteBatch`] is applied all-or-nothing: every
//! write's precondition is checked first, and any mismatch rejects the
//! whole batch.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{Child, CustomRewardRequest, Reward, RewardRedemption, Task, TaskCompletion};
use crate::error::{Result, StarError};

/// A record together with its optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

impl<T> Versioned<T> {
    fn first(value: T) -> Self {
        Self { version: 1, value }
    }
}

/// Result of a batch commit.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Every write was applied.
    Committed,
    /// A precondition failed; nothing was applied.
    Conflict,
}

/// One write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Child { expected: u64, child: Child },
    InsertCompletion(TaskCompletion),
    UpdateCompletion { expected: u64, completion: TaskCompletion },
    InsertRedemption(RewardRedemption),
    UpdateRedemption { expected: u64, redemption: RewardRedemption },
    InsertCustomRequest(CustomRewardRequest),
    UpdateCustomRequest { expected: u64, request: CustomRewardRequest },
}

/// Writes that must be applied together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a child whose stored version is `expected`.
    pub fn child(mut self, expected: u64, child: Child) -> Self {
        self.writes.push(Write::Child { expected, child });
        self
    }

    /// Insert a completion whose id must not exist yet.
    pub fn insert_completion(mut self, completion: TaskCompletion) -> Self {
        self.writes.push(Write::InsertCompletion(completion));
        self
    }

    /// Replace a completion whose stored version is `expected`.
    pub fn update_completion(mut self, expected: u64, completion: TaskCompletion) -> Self {
        self.writes.push(Write::UpdateCompletion {
            expected,
            completion,
        });
        self
    }

    /// Insert a redemption whose id must not exist yet.
    pub fn insert_redemption(mut self, redemption: RewardRedemption) -> Self {
        self.writes.push(Write::InsertRedemption(redemption));
        self
    }

    /// Replace a redemption whose stored version is `expected`.
    pub fn update_redemption(mut self, expected: u64, redemption: RewardRedemption) -> Self {
        self.writes.push(Write::UpdateRedemption {
            expected,
            redemption,
        });
        self
    }

    /// Insert a custom request whose id must not exist yet.
    pub fn insert_custom_request(mut self, request: CustomRewardRequest) -> Self {
        self.writes.push(Write::InsertCustomRequest(request));
        self
    }

    /// Replace a custom request whose stored version is `expected`.
    pub fn update_custom_request(mut self, expected: u64, request: CustomRewardRequest) -> Self {
        self.writes
            .push(Write::UpdateCustomRequest { expected, request });
        self
    }

    /// The writes in this batch.
    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    /// Whether the batch has no writes.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Filter for record listings. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub family_id: Option<String>,
    pub child_id: Option<String>,
}

impl RecordQuery {
    /// Records of one family.
    pub fn family(family_id: impl Into<String>) -> Self {
        Self {
            family_id: Some(family_id.into()),
            child_id: None,
        }
    }

    /// Records of one child.
    pub fn child(child_id: impl Into<String>) -> Self {
        Self {
            family_id: None,
            child_id: Some(child_id.into()),
        }
    }

    fn matches(&self, family_id: &str, child_id: &str) -> bool {
        self.family_id.as_deref().map_or(true, |f| f == family_id)
            && self.child_id.as_deref().map_or(true, |c| c == child_id)
    }
}

/// Everything a store persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseholdState {
    pub children: HashMap<String, Versioned<Child>>,
    pub tasks: HashMap<String, Task>,
    pub rewards: HashMap<String, Reward>,
    pub completions: HashMap<String, Versioned<TaskCompletion>>,
    pub redemptions: HashMap<String, Versioned<RewardRedemption>>,
    pub custom_requests: HashMap<String, Versioned<CustomRewardRequest>>,
}

impl HouseholdState {
    /// Add a new child profile.
    pub fn register_child(&mut self, child: &Child) -> Result<()> {
        child.validate()?;
        if self.children.contains_key(&child.id) {
            return Err(StarError::validation(format!(
                "child {} already exists",
                child.id
            )));
        }
        self.children
            .insert(child.id.clone(), Versioned::first(child.clone()));
        Ok(())
    }

    /// Apply a batch all-or-nothing.
    pub fn apply(&mut self, batch: WriteBatch) -> CommitOutcome {
        if !batch.writes.iter().all(|w| self.precondition_holds(w)) {
            return CommitOutcome::Conflict;
        }
        for write in batch.writes {
            match write {
                Write::Child { expected, child } => {
                    self.children.insert(child.id.clone(), bumped(expected, child));
                }
                Write::InsertCompletion(c) => {
                    self.completions.insert(c.id.clone(), Versioned::first(c));
                }
                Write::UpdateCompletion {
                    expected,
                    completion,
                } => {
                    self.completions
                        .insert(completion.id.clone(), bumped(expected, completion));
                }
                Write::InsertRedemption(r) => {
                    self.redemptions.insert(r.id.clone(), Versioned::first(r));
                }
                Write::UpdateRedemption {
                    expected,
                    redemption,
                } => {
                    self.redemptions
                        .insert(redemption.id.clone(), bumped(expected, redemption));
                }
                Write::InsertCustomRequest(r) => {
                    self.custom_requests
                        .insert(r.id.clone(), Versioned::first(r));
                }
                Write::UpdateCustomRequest { expected, request } => {
                    self.custom_requests
                        .insert(request.id.clone(), bumped(expected, request));
                }
            }
        }
        CommitOutcome::Committed
    }

    fn precondition_holds(&self, write: &Write) -> bool {
        match write {
            Write::Child { expected, child } => version_is(&self.children, &child.id, *expected),
            Write::InsertCompletion(c) => !self.completions.contains_key(&c.id),
            Write::UpdateCompletion {
                expected,
                completion,
            } => version_is(&self.completions, &completion.id, *expected),
            Write::InsertRedemption(r) => !self.redemptions.contains_key(&r.id),
            Write::UpdateRedemption {
                expected,
                redemption,
            } => version_is(&self.redemptions, &redemption.id, *expected),
            Write::InsertCustomRequest(r) => !self.custom_requests.contains_key(&r.id),
            Write::UpdateCustomRequest { expected, request } => {
                version_is(&self.custom_requests, &request.id, *expected)
            }
        }
    }

    /// Children of a family, sorted by name.
    pub fn children_of(&self, family_id: &str) -> Vec<Child> {
        let mut children: Vec<Child> = self
            .children
            .values()
            .filter(|c| c.value.family_id == family_id)
            .map(|c| c.value.clone())
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        children
    }

    /// Matching completions, oldest first.
    pub fn query_completions(&self, query: &RecordQuery) -> Vec<TaskCompletion> {
        let mut found: Vec<TaskCompletion> = self
            .completions
            .values()
            .filter(|c| query.matches(&c.value.family_id, &c.value.child_id))
            .map(|c| c.value.clone())
            .collect();
        found.sort_by(|a, b| a.completed_at.cmp(&b.completed_at).then_with(|| a.id.cmp(&b.id)));
        found
    }

    /// Matching redemptions, oldest first.
    pub fn query_redemptions(&self, query: &RecordQuery) -> Vec<RewardRedemption> {
        let mut found: Vec<RewardRedemption> = self
            .redemptions
            .values()
            .filter(|r| query.matches(&r.value.family_id, &r.value.child_id))
            .map(|r| r.value.clone())
            .collect();
        found.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then_with(|| a.id.cmp(&b.id)));
        found
    }

    /// Matching custom requests, oldest first.
    pub fn query_custom_requests(&self, query: &RecordQuery) -> Vec<CustomRewardRequest> {
        let mut found: Vec<CustomRewardRequest> = self
            .custom_requests
            .values()
            .filter(|r| query.matches(&r.value.family_id, &r.value.child_id))
            .map(|r| r.value.clone())
            .collect();
        found.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then_with(|| a.id.cmp(&b.id)));
        found
    }
}

fn version_is<T>(map: &HashMap<String, Versioned<T>>, id: &str, expected: u64) -> bool {
    map.get(id).is_some_and(|v| v.version == expected)
}

fn bumped<T>(expected: u64, value: T) -> Versioned<T> {
    Versioned {
        version: expected + 1,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CompletionStatus, StarType};
    use chrono::Utc;

    fn completion(id: &str) -> TaskCompletion {
        TaskCompletion {
            id: id.to_string(),
            task_id: "t1".to_string(),
            child_id: "kid-1".to_string(),
            family_id: "fam".to_string(),
            star_type: StarType::Growth,
            stars_awarded: 10,
            status: CompletionStatus::Pending,
            completed_at: Utc::now(),
            decided_at: None,
        }
    }

    fn state_with_child() -> HouseholdState {
        let mut state = HouseholdState::default();
        state
            .register_child(&Child::new("kid-1", "fam", "Ada", 2))
            .unwrap();
        state
    }

    #[test]
    fn test_register_child_starts_at_version_one() {
        let state = state_with_child();
        assert_eq!(state.children["kid-1"].version, 1);
    }

    #[test]
    fn test_register_duplicate_child_fails() {
        let mut state = state_with_child();
        let err = state
            .register_child(&Child::new("kid-1", "fam", "Ada", 2))
            .unwrap_err();
        assert!(matches!(err, StarError::Validation { .. }));
    }

    #[test]
    fn test_child_update_bumps_version() {
        let mut state = state_with_child();
        let mut child = state.children["kid-1"].value.clone();
        child.trust_level = 4;

        let outcome = state.apply(WriteBatch::new().child(1, child));

        assert_eq!(outcome, CommitOutcome::Committed);
        assert_eq!(state.children["kid-1"].version, 2);
        assert_eq!(state.children["kid-1"].value.trust_level, 4);
    }

    #[test]
    fn test_stale_version_rejects_whole_batch() {
        let mut state = state_with_child();
        let child = state.children["kid-1"].value.clone();

        let outcome = state.apply(
            WriteBatch::new()
                .insert_completion(completion("cmp_1"))
                .child(7, child),
        );

        assert_eq!(outcome, CommitOutcome::Conflict);
        assert!(state.completions.is_empty());
        assert_eq!(state.children["kid-1"].version, 1);
    }

    #[test]
    fn test_insert_existing_id_conflicts() {
        let mut state = state_with_child();
        assert_eq!(
            state.apply(WriteBatch::new().insert_completion(completion("cmp_1"))),
            CommitOutcome::Committed
        );
        assert_eq!(
            state.apply(WriteBatch::new().insert_completion(completion("cmp_1"))),
            CommitOutcome::Conflict
        );
    }

    #[test]
    fn test_update_missing_record_conflicts() {
        let mut state = state_with_child();
        let outcome = state.apply(WriteBatch::new().update_completion(1, completion("ghost")));
        assert_eq!(outcome, CommitOutcome::Conflict);
    }

    #[test]
    fn test_query_filters_by_child() {
        let mut state = state_with_child();
        let mut other = completion("cmp_2");
        other.child_id = "kid-2".to_string();
        let _ = state.apply(
            WriteBatch::new()
                .insert_completion(completion("cmp_1"))
                .insert_completion(other),
        );

        let found = state.query_completions(&RecordQuery::child("kid-1"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "cmp_1");
        assert_eq!(state.query_completions(&RecordQuery::family("fam")).len(), 2);
        assert!(state
            .query_completions(&RecordQuery::family("other"))
            .is_empty());
    }
}
