//! Completion submission gateway.
//!
//! Turns a child's "I did it" into a [`TaskCompletion`]. The trust policy
//! decides whether it waits for a parent or is credited on the spot; on the
//! auto path the record insert, the credit and the streak update are one
//! commit.

use chrono::{DateTime, Utc};

use crate::config::{Config, DuplicatePolicy};
use crate::core::{generate_id, CompletionStatus, Task, TaskCompletion};
use crate::error::{Result, StarError};
use crate::ledger::{apply_completion, apply_credit, calendar_day, commit_or_retry, with_retries};
use crate::policy::TrustPolicy;
use crate::storage::{HouseholdStore, RecordQuery, WriteBatch};

/// Id prefix for task completions.
pub const COMPLETION_ID_PREFIX: &str = "cmp";

/// Entry point for task completion submissions.
#[derive(Debug)]
pub struct CompletionGateway<'a, S: HouseholdStore + ?Sized> {
    store: &'a S,
    config: &'a Config,
    policy: &'a TrustPolicy,
}

impl<'a, S: HouseholdStore + ?Sized> CompletionGateway<'a, S> {
    /// Create a gateway over a store.
    pub fn new(store: &'a S, config: &'a Config, policy: &'a TrustPolicy) -> Self {
        Self {
            store,
            config,
            policy,
        }
    }

    /// Submit a completion of `task_id` by `child_id` at `now`.
    ///
    /// Returns the created record; its status tells the caller which path
    /// was taken.
    pub fn submit(
        &self,
        child_id: &str,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TaskCompletion> {
        let today = calendar_day(now, self.config.streaks.utc_offset_minutes);
        let once_per_day = self.config.completions.duplicate_policy == DuplicatePolicy::OncePerDay;

        with_retries("submit_completion", self.config.ledger.max_attempts, || {
            let current = self
                .store
                .child(child_id)?
                .ok_or_else(|| StarError::not_found("child", child_id))?;
            let task = self.submittable_task(task_id, &current.value.family_id, child_id)?;

            if once_per_day {
                self.ensure_first_today(child_id, task_id, now)?;
            }

            let requirement = self
                .policy
                .decide(current.value.trust_level, task.category.as_deref())?;
            let status = requirement.initial_status();

            let completion = TaskCompletion {
                id: generate_id(COMPLETION_ID_PREFIX),
                task_id: task.id.clone(),
                child_id: child_id.to_string(),
                family_id: current.value.family_id.clone(),
                star_type: task.star_type,
                stars_awarded: task.star_value,
                status,
                completed_at: now,
                decided_at: status.is_credited().then_some(now),
            };

            let mut batch = WriteBatch::new().insert_completion(completion.clone());
            if status.is_credited() {
                let mut child = current.value;
                apply_credit(
                    &mut child,
                    task.star_type,
                    task.star_value,
                    today,
                    self.config.ledger.default_weekly_limit,
                )?;
                let change = apply_completion(&mut child.streaks, today);
                tracing::debug!(child_id, ?change, "streak evaluated");
                batch = batch.child(current.version, child);
            } else if once_per_day {
                // Writing the child back serializes same-child submissions
                // against the duplicate check.
                batch = batch.child(current.version, current.value);
            }

            commit_or_retry(self.store, batch, completion)
        })
    }

    fn submittable_task(&self, task_id: &str, family_id: &str, child_id: &str) -> Result<Task> {
        let task = self
            .store
            .task(task_id)?
            .ok_or_else(|| StarError::invalid_task(task_id, "not found"))?;
        if !task.is_active {
            return Err(StarError::invalid_task(task_id, "task is inactive"));
        }
        if task.family_id != family_id || !task.is_assigned_to(child_id) {
            return Err(StarError::invalid_task(
                task_id,
                format!("task is not assigned to {}", child_id),
            ));
        }
        Ok(task)
    }

    fn ensure_first_today(&self, child_id: &str, task_id: &str, now: DateTime<Utc>) -> Result<()> {
        let offset = self.config.streaks.utc_offset_minutes;
        let today = calendar_day(now, offset);
        let repeated = self
            .store
            .completions(&RecordQuery::child(child_id))?
            .iter()
            .any(|c| {
                c.task_id == task_id
                    && c.status != CompletionStatus::Rejected
                    && calendar_day(c.completed_at, offset) == today
            });
        if repeated {
            return Err(StarError::validation(format!(
                "{} already submitted task {} today",
                child_id, task_id
            )));
        }
        Ok(())
    }
}
