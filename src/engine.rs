//! The reward engine: the public operations of Starboard.
//!
//! [`RewardEngine`] owns a store, the loaded configuration, the trust
//! policy, a clock and a notifier. Each operation runs one workflow
//! transition, logs it, and hands the committed result to the notifier.
//! Notifier failures are logged and otherwise ignored.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::core::{
    Child, CustomRequestStatus, CustomRewardRequest, Decision, RewardRedemption, StarBalance,
    StarType, Streaks, TaskCompletion,
};
use crate::error::{FailOpen, Result, StarError};
use crate::ledger::{calendar_day, StarLedger, StreakTracker};
use crate::notify::{EngineEvent, Notifier, NullNotifier};
use crate::policy::TrustPolicy;
use crate::storage::{HouseholdStore, RecordQuery};
use crate::workflow::{
    ApprovalQueue, CompletionGateway, CustomRewardDraft, CustomRewardNegotiation, PendingItem,
    RedemptionWorkflow,
};

/// Facade over the workflows, ledger and streak tracker.
pub struct RewardEngine<S, N = NullNotifier> {
    store: S,
    config: Config,
    policy: TrustPolicy,
    clock: Arc<dyn Clock>,
    notifier: N,
}

impl<S: HouseholdStore> RewardEngine<S, NullNotifier> {
    /// Create an engine with the wall clock and no notifier.
    ///
    /// Fails if the configured trust tables are malformed.
    pub fn new(store: S, config: Config) -> Result<Self> {
        let policy = TrustPolicy::from_config(&config.trust)?;
        Ok(Self {
            store,
            config,
            policy,
            clock: Arc::new(SystemClock),
            notifier: NullNotifier,
        })
    }
}

impl<S: HouseholdStore, N: Notifier> RewardEngine<S, N> {
    /// Replace the notifier.
    pub fn with_notifier<M: Notifier>(self, notifier: M) -> RewardEngine<S, M> {
        RewardEngine {
            store: self.store,
            config: self.config,
            policy: self.policy,
            clock: self.clock,
            notifier,
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the trust policy built from configuration.
    pub fn with_policy(mut self, policy: TrustPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Current engine time.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // =========================================================================
    // Completions
    // =========================================================================

    /// Submit a task completion for a child.
    pub fn submit_completion(&self, child_id: &str, task_id: &str) -> Result<TaskCompletion> {
        let completion = CompletionGateway::new(&self.store, &self.config, &self.policy).submit(
            child_id,
            task_id,
            self.clock.now(),
        )?;
        tracing::info!(
            completion_id = %completion.id,
            child_id,
            task_id,
            status = %completion.status,
            stars = completion.stars_awarded,
            "completion submitted"
        );
        self.publish(EngineEvent::CompletionSubmitted {
            completion_id: completion.id.clone(),
            family_id: completion.family_id.clone(),
            child_id: completion.child_id.clone(),
            task_id: completion.task_id.clone(),
            star_type: completion.star_type,
            stars: completion.stars_awarded,
            status: completion.status,
        });
        Ok(completion)
    }

    /// Approve or reject a pending completion.
    pub fn decide_completion(&self, id: &str, decision: Decision) -> Result<TaskCompletion> {
        let completion =
            ApprovalQueue::new(&self.store, &self.config).decide_completion(id, decision, self.clock.now())?;
        tracing::info!(
            completion_id = id,
            child_id = %completion.child_id,
            status = %completion.status,
            "completion decided"
        );
        self.publish(EngineEvent::CompletionDecided {
            completion_id: completion.id.clone(),
            family_id: completion.family_id.clone(),
            child_id: completion.child_id.clone(),
            status: completion.status,
        });
        Ok(completion)
    }

    // =========================================================================
    // Redemptions
    // =========================================================================

    /// Request a catalog reward, escrowing its cost.
    pub fn request_redemption(&self, child_id: &str, reward_id: &str) -> Result<RewardRedemption> {
        let redemption =
            RedemptionWorkflow::new(&self.store, &self.config).request(child_id, reward_id, self.clock.now())?;
        tracing::info!(
            redemption_id = %redemption.id,
            child_id,
            reward_id,
            status = %redemption.status,
            stars = redemption.stars_deducted,
            "redemption requested"
        );
        self.publish(EngineEvent::RedemptionRequested {
            redemption_id: redemption.id.clone(),
            family_id: redemption.family_id.clone(),
            child_id: redemption.child_id.clone(),
            reward_id: redemption.reward_id.clone(),
            star_type: redemption.star_type,
            stars: redemption.stars_deducted,
            status: redemption.status,
        });
        Ok(redemption)
    }

    /// Approve or reject a pending redemption.
    pub fn decide_redemption(&self, id: &str, decision: Decision) -> Result<RewardRedemption> {
        let redemption =
            ApprovalQueue::new(&self.store, &self.config).decide_redemption(id, decision, self.clock.now())?;
        tracing::info!(
            redemption_id = id,
            child_id = %redemption.child_id,
            status = %redemption.status,
            "redemption decided"
        );
        self.publish(EngineEvent::RedemptionDecided {
            redemption_id: redemption.id.clone(),
            family_id: redemption.family_id.clone(),
            child_id: redemption.child_id.clone(),
            status: redemption.status,
        });
        Ok(redemption)
    }

    // =========================================================================
    // Custom rewards
    // =========================================================================

    /// Submit a custom reward request.
    pub fn submit_custom_reward_request(
        &self,
        child_id: &str,
        draft: &CustomRewardDraft,
    ) -> Result<CustomRewardRequest> {
        let request =
            CustomRewardNegotiation::new(&self.store, &self.config).submit(child_id, draft, self.clock.now())?;
        tracing::info!(request_id = %request.id, child_id, "custom reward requested");
        self.publish(EngineEvent::CustomRequestSubmitted {
            request_id: request.id.clone(),
            family_id: request.family_id.clone(),
            child_id: request.child_id.clone(),
            reward_name: request.reward_name.clone(),
        });
        Ok(request)
    }

    /// Price a pending custom reward request.
    pub fn set_custom_reward_price(&self, id: &str, stars: u32) -> Result<CustomRewardRequest> {
        let request =
            CustomRewardNegotiation::new(&self.store, &self.config).set_price(id, stars, self.clock.now())?;
        tracing::info!(request_id = id, stars, "custom reward priced");
        self.publish(EngineEvent::CustomRequestPriced {
            request_id: request.id.clone(),
            family_id: request.family_id.clone(),
            child_id: request.child_id.clone(),
            stars,
        });
        Ok(request)
    }

    /// Approve or reject a priced custom reward request.
    pub fn decide_custom_reward_request(
        &self,
        id: &str,
        decision: Decision,
    ) -> Result<CustomRewardRequest> {
        let request =
            CustomRewardNegotiation::new(&self.store, &self.config).decide(id, decision, self.clock.now())?;
        tracing::info!(request_id = id, status = %request.status, "custom reward decided");
        self.publish(EngineEvent::CustomRequestDecided {
            request_id: request.id.clone(),
            family_id: request.family_id.clone(),
            child_id: request.child_id.clone(),
            status: request.status,
        });
        Ok(request)
    }

    // =========================================================================
    // Queue and audit
    // =========================================================================

    /// Everything awaiting a parent in a family, oldest first.
    pub fn pending_approvals(&self, family_id: &str) -> Result<Vec<PendingItem>> {
        ApprovalQueue::new(&self.store, &self.config).pending(family_id)
    }

    /// All records of one child, oldest first.
    pub fn history(&self, child_id: &str) -> Result<ChildHistory> {
        self.require_child(child_id)?;
        let query = RecordQuery::child(child_id);
        Ok(ChildHistory {
            completions: self.store.completions(&query)?,
            redemptions: self.store.redemptions(&query)?,
            custom_requests: self.store.custom_requests(&query)?,
        })
    }

    /// Compare a child's balances with what its records imply.
    ///
    /// Expected balance per star type is the credited completion awards,
    /// minus redemptions still holding their escrow, minus approved custom
    /// rewards. Standalone ledger operations are not recorded and show up
    /// as a difference.
    pub fn reconcile(&self, child_id: &str) -> Result<ReconciliationReport> {
        let child = self.require_child(child_id)?;
        let history = self.history(child_id)?;

        let lines = StarType::ALL
            .iter()
            .map(|&star_type| {
                let earned: i64 = history
                    .completions
                    .iter()
                    .filter(|c| c.star_type == star_type && c.status.is_credited())
                    .map(|c| i64::from(c.stars_awarded))
                    .sum();
                let escrowed: i64 = history
                    .redemptions
                    .iter()
                    .filter(|r| r.star_type == star_type && r.status.holds_stars())
                    .map(|r| i64::from(r.stars_deducted))
                    .sum();
                let custom: i64 = history
                    .custom_requests
                    .iter()
                    .filter(|r| {
                        r.star_type == star_type && r.status == CustomRequestStatus::Approved
                    })
                    .map(|r| i64::from(r.stars_required.unwrap_or(0)))
                    .sum();
                ReconciliationLine {
                    star_type,
                    expected: earned - escrowed - custom,
                    actual: child.balance(star_type),
                }
            })
            .collect();

        let report = ReconciliationReport {
            child_id: child_id.to_string(),
            lines,
        };
        if !report.is_balanced() {
            tracing::warn!(child_id, "ledger does not reconcile with records");
        }
        Ok(report)
    }

    // =========================================================================
    // Standalone ledger and streak operations
    // =========================================================================

    /// Credit stars outside any workflow.
    pub fn credit(&self, child_id: &str, star_type: StarType, amount: u32) -> Result<StarBalance> {
        let today = self.today();
        StarLedger::new(&self.store, &self.config.ledger).credit(child_id, star_type, amount, today)
    }

    /// Debit stars outside any workflow.
    pub fn debit(&self, child_id: &str, star_type: StarType, amount: u32) -> Result<StarBalance> {
        StarLedger::new(&self.store, &self.config.ledger).debit(child_id, star_type, amount)
    }

    /// Refund stars outside any workflow.
    pub fn refund(&self, child_id: &str, star_type: StarType, amount: u32) -> Result<StarBalance> {
        StarLedger::new(&self.store, &self.config.ledger).refund(child_id, star_type, amount)
    }

    /// Count one approved completion toward the streak, now.
    pub fn record_completion(&self, child_id: &str) -> Result<Streaks> {
        StreakTracker::new(
            &self.store,
            self.config.ledger.max_attempts,
            self.config.streaks.utc_offset_minutes,
        )
        .record_completion(child_id, self.clock.now())
    }

    fn today(&self) -> NaiveDate {
        calendar_day(self.clock.now(), self.config.streaks.utc_offset_minutes)
    }

    fn require_child(&self, child_id: &str) -> Result<Child> {
        self.store
            .child(child_id)?
            .map(|c| c.value)
            .ok_or_else(|| StarError::not_found("child", child_id))
    }

    fn publish(&self, event: EngineEvent) {
        self.notifier
            .notify(&event)
            .fail_open_default("Failed to notify observers");
    }
}

/// Records of one child.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChildHistory {
    pub completions: Vec<TaskCompletion>,
    pub redemptions: Vec<RewardRedemption>,
    pub custom_requests: Vec<CustomRewardRequest>,
}

/// Expected against actual balance for one star type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationLine {
    pub star_type: StarType,
    /// Signed: records alone can imply a negative balance when stars were
    /// credited outside any workflow.
    pub expected: i64,
    pub actual: u32,
}

impl ReconciliationLine {
    pub fn is_balanced(&self) -> bool {
        self.expected == i64::from(self.actual)
    }
}

/// Result of [`RewardEngine::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub child_id: String,
    pub lines: Vec<ReconciliationLine>,
}

impl ReconciliationReport {
    /// Whether every star type reconciles.
    pub fn is_balanced(&self) -> bool {
        self.lines.iter().all(ReconciliationLine::is_balanced)
    }
}
