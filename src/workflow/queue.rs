//! Approval queue: what a parent still has to decide, and the entry points
//! that decide it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{
    CompletionStatus, Decision, RedemptionStatus, RewardRedemption, StarType,
    TaskCompletion,
};
use crate::error::{Result, StarError};
use crate::ledger::{apply_completion, apply_credit, calendar_day, commit_or_retry, with_retries};
use crate::storage::{HouseholdStore, RecordQuery, WriteBatch};
use crate::workflow::redemption::RedemptionWorkflow;

/// Kind of record waiting in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingKind {
    Completion,
    Redemption,
    CustomRequest,
}

impl PendingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingKind::Completion => "completion",
            PendingKind::Redemption => "redemption",
            PendingKind::CustomRequest => "custom_request",
        }
    }
}

/// One queue entry, decorated for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingItem {
    pub kind: PendingKind,
    pub id: String,
    pub child_id: String,
    /// Falls back to the child id when the profile is gone.
    pub child_name: String,
    /// Task title, reward title, or the custom reward's name.
    pub title: String,
    pub star_type: StarType,
    /// Unset for a custom request that has not been priced.
    pub stars: Option<u32>,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
}

/// Read side and decision entry points for parents.
#[derive(Debug)]
pub struct ApprovalQueue<'a, S: HouseholdStore + ?Sized> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S: HouseholdStore + ?Sized> ApprovalQueue<'a, S> {
    /// Create a queue over a store.
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// Everything awaiting a parent in a family, oldest first.
    pub fn pending(&self, family_id: &str) -> Result<Vec<PendingItem>> {
        let query = RecordQuery::family(family_id);
        let names: HashMap<String, String> = self
            .store
            .children(family_id)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let child_name = |id: &str| names.get(id).cloned().unwrap_or_else(|| id.to_string());

        let mut items = Vec::new();

        for completion in self.store.completions(&query)? {
            if completion.status != CompletionStatus::Pending {
                continue;
            }
            let title = self
                .store
                .task(&completion.task_id)?
                .map_or_else(|| completion.task_id.clone(), |t| t.title);
            items.push(PendingItem {
                kind: PendingKind::Completion,
                child_name: child_name(&completion.child_id),
                title,
                star_type: completion.star_type,
                stars: Some(completion.stars_awarded),
                status: completion.status.to_string(),
                submitted_at: completion.completed_at,
                id: completion.id,
                child_id: completion.child_id,
            });
        }

        for redemption in self.store.redemptions(&query)? {
            if redemption.status != RedemptionStatus::Pending {
                continue;
            }
            let title = self
                .store
                .reward(&redemption.reward_id)?
                .map_or_else(|| redemption.reward_id.clone(), |r| r.title);
            items.push(PendingItem {
                kind: PendingKind::Redemption,
                child_name: child_name(&redemption.child_id),
                title,
                star_type: redemption.star_type,
                stars: Some(redemption.stars_deducted),
                status: redemption.status.to_string(),
                submitted_at: redemption.requested_at,
                id: redemption.id,
                child_id: redemption.child_id,
            });
        }

        for request in self.store.custom_requests(&query)? {
            if !request.status.awaits_parent() {
                continue;
            }
            items.push(PendingItem {
                kind: PendingKind::CustomRequest,
                child_name: child_name(&request.child_id),
                title: request.reward_name,
                star_type: request.star_type,
                stars: request.stars_required,
                status: request.status.to_string(),
                submitted_at: request.requested_at,
                id: request.id,
                child_id: request.child_id,
            });
        }

        items.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(items)
    }

    /// Transition: Pending → Approved | Rejected
    ///
    /// Approval credits the award and updates the streak in the same commit
    /// as the status change. The credit week and the streak day are taken
    /// from `now`, the decision time.
    pub fn decide_completion(
        &self,
        id: &str,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<TaskCompletion> {
        let today = calendar_day(now, self.config.streaks.utc_offset_minutes);

        with_retries("decide_completion", self.config.ledger.max_attempts, || {
            let current = self
                .store
                .completion(id)?
                .ok_or_else(|| StarError::not_found("completion", id))?;
            match current.value.status {
                CompletionStatus::Pending => {}
                status @ (CompletionStatus::AutoApproved
                | CompletionStatus::Approved
                | CompletionStatus::Rejected) => {
                    return Err(StarError::already_processed("completion", id, status));
                }
            }

            let mut completion = current.value;
            completion.decided_at = Some(now);
            let batch = match decision {
                Decision::Approve => {
                    let owner = self
                        .store
                        .child(&completion.child_id)?
                        .ok_or_else(|| StarError::not_found("child", completion.child_id.clone()))?;
                    let mut child = owner.value;
                    apply_credit(
                        &mut child,
                        completion.star_type,
                        completion.stars_awarded,
                        today,
                        self.config.ledger.default_weekly_limit,
                    )?;
                    let change = apply_completion(&mut child.streaks, today);
                    tracing::debug!(child_id = %child.id, ?change, "streak evaluated");
                    completion.status = CompletionStatus::Approved;
                    WriteBatch::new()
                        .child(owner.version, child)
                        .update_completion(current.version, completion.clone())
                }
                Decision::Reject => {
                    completion.status = CompletionStatus::Rejected;
                    WriteBatch::new().update_completion(current.version, completion.clone())
                }
            };
            commit_or_retry(self.store, batch, completion)
        })
    }

    /// Decide a pending redemption.
    pub fn decide_redemption(
        &self,
        id: &str,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<RewardRedemption> {
        RedemptionWorkflow::new(self.store, self.config).decide(id, decision, now)
    }
}
