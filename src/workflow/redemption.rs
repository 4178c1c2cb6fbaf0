//! Redemption workflow for catalog rewards.
//!
//! Stars are escrowed at request time: the debit and the record insert are
//! one commit. Approval finalizes the escrow; rejection refunds exactly the
//! escrowed amount in the same commit that marks the record rejected.

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::core::{generate_id, Decision, RedemptionStatus, Reward, RewardRedemption};
use crate::error::{Result, StarError};
use crate::ledger::{apply_debit, apply_refund, commit_or_retry, with_retries};
use crate::storage::{HouseholdStore, Versioned, WriteBatch};

/// Id prefix for reward redemptions.
pub const REDEMPTION_ID_PREFIX: &str = "rdm";

/// Catalog reward redemptions.
#[derive(Debug)]
pub struct RedemptionWorkflow<'a, S: HouseholdStore + ?Sized> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S: HouseholdStore + ?Sized> RedemptionWorkflow<'a, S> {
    /// Create a workflow over a store.
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// Request a catalog reward, escrowing its cost.
    ///
    /// `InsufficientBalance` is returned unchanged and nothing is written.
    pub fn request(
        &self,
        child_id: &str,
        reward_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RewardRedemption> {
        with_retries("request_redemption", self.config.ledger.max_attempts, || {
            let current = self
                .store
                .child(child_id)?
                .ok_or_else(|| StarError::not_found("child", child_id))?;
            let reward = self.redeemable_reward(reward_id, &current.value.family_id)?;

            let mut child = current.value;
            apply_debit(&mut child, reward.star_type, reward.star_cost)?;

            let status = if reward.requires_approval {
                RedemptionStatus::Pending
            } else {
                RedemptionStatus::Approved
            };
            let redemption = RewardRedemption {
                id: generate_id(REDEMPTION_ID_PREFIX),
                reward_id: reward.id.clone(),
                child_id: child_id.to_string(),
                family_id: child.family_id.clone(),
                star_type: reward.star_type,
                stars_deducted: reward.star_cost,
                status,
                requested_at: now,
                decided_at: (status == RedemptionStatus::Approved).then_some(now),
            };

            commit_or_retry(
                self.store,
                WriteBatch::new()
                    .child(current.version, child)
                    .insert_redemption(redemption.clone()),
                redemption,
            )
        })
    }

    /// Apply a parent decision to a pending redemption.
    pub fn decide(&self, id: &str, decision: Decision, now: DateTime<Utc>) -> Result<RewardRedemption> {
        match decision {
            Decision::Approve => self.approve(id, now),
            Decision::Reject => self.reject(id, now),
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Transition: Pending → Approved
    ///
    /// The stars were escrowed at request time; nothing moves.
    pub fn approve(&self, id: &str, now: DateTime<Utc>) -> Result<RewardRedemption> {
        with_retries("approve_redemption", self.config.ledger.max_attempts, || {
            let current = self.pending(id)?;
            let mut redemption = current.value;
            redemption.status = RedemptionStatus::Approved;
            redemption.decided_at = Some(now);

            commit_or_retry(
                self.store,
                WriteBatch::new().update_redemption(current.version, redemption.clone()),
                redemption,
            )
        })
    }

    /// Transition: Pending → Rejected
    ///
    /// Refunds `stars_deducted` in the same commit.
    pub fn reject(&self, id: &str, now: DateTime<Utc>) -> Result<RewardRedemption> {
        with_retries("reject_redemption", self.config.ledger.max_attempts, || {
            let current = self.pending(id)?;
            let mut redemption = current.value;
            let owner = self
                .store
                .child(&redemption.child_id)?
                .ok_or_else(|| StarError::not_found("child", redemption.child_id.clone()))?;

            let mut child = owner.value;
            apply_refund(
                &mut child,
                redemption.star_type,
                redemption.stars_deducted,
                self.config.ledger.default_weekly_limit,
            )?;
            redemption.status = RedemptionStatus::Rejected;
            redemption.decided_at = Some(now);

            commit_or_retry(
                self.store,
                WriteBatch::new()
                    .child(owner.version, child)
                    .update_redemption(current.version, redemption.clone()),
                redemption,
            )
        })
    }

    // =========================================================================
    // Guards
    // =========================================================================

    fn pending(&self, id: &str) -> Result<Versioned<RewardRedemption>> {
        let current = self
            .store
            .redemption(id)?
            .ok_or_else(|| StarError::not_found("redemption", id))?;
        match current.value.status {
            RedemptionStatus::Pending => Ok(current),
            status @ (RedemptionStatus::Approved | RedemptionStatus::Rejected) => {
                Err(StarError::already_processed("redemption", id, status))
            }
        }
    }

    fn redeemable_reward(&self, reward_id: &str, family_id: &str) -> Result<Reward> {
        let reward = self
            .store
            .reward(reward_id)?
            .ok_or_else(|| StarError::invalid_reward(reward_id, "not found"))?;
        if !reward.is_active {
            return Err(StarError::invalid_reward(reward_id, "reward is inactive"));
        }
        if reward.family_id != family_id {
            return Err(StarError::invalid_reward(
                reward_id,
                "reward belongs to another family",
            ));
        }
        Ok(reward)
    }
}
