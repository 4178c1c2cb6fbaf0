//! Persisted request records and their status machines.
//!
//! Every record is created once and never deleted; its status is the audit
//! trail. Status fields are exhaustive enums so new states cannot slip
//! through a match unnoticed.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::StarType;

/// Generate a record id with the given prefix.
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// A parent's decision on a pending item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approve => f.write_str("approve"),
            Decision::Reject => f.write_str("reject"),
        }
    }
}

// =============================================================================
// Task completions
// =============================================================================

/// Status of a task completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// Awaiting a parent decision.
    Pending,
    /// Credited at submission time by the trust policy.
    AutoApproved,
    /// Credited after a parent approved it.
    Approved,
    /// Refused by a parent. Never credited.
    Rejected,
}

impl CompletionStatus {
    /// Whether the completion's award has been credited.
    pub fn is_credited(&self) -> bool {
        match self {
            CompletionStatus::AutoApproved | CompletionStatus::Approved => true,
            CompletionStatus::Pending | CompletionStatus::Rejected => false,
        }
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Pending => "pending",
            CompletionStatus::AutoApproved => "auto_approved",
            CompletionStatus::Approved => "approved",
            CompletionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A child's claim of having finished a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub id: String,
    pub task_id: String,
    pub child_id: String,
    pub family_id: String,
    pub star_type: StarType,
    /// Fixed at creation from the task definition.
    pub stars_awarded: u32,
    pub status: CompletionStatus,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub decided_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Reward redemptions
// =============================================================================

/// Status of a catalog reward redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionStatus {
    /// Stars escrowed, awaiting a parent decision.
    Pending,
    /// Escrow finalized.
    Approved,
    /// Escrow refunded.
    Rejected,
}

impl RedemptionStatus {
    /// Whether the escrowed stars remain spent.
    pub fn holds_stars(&self) -> bool {
        match self {
            RedemptionStatus::Pending | RedemptionStatus::Approved => true,
            RedemptionStatus::Rejected => false,
        }
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RedemptionStatus::Pending => "pending",
            RedemptionStatus::Approved => "approved",
            RedemptionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A child's request to spend stars on a catalog reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRedemption {
    pub id: String,
    pub reward_id: String,
    pub child_id: String,
    pub family_id: String,
    pub star_type: StarType,
    /// Fixed at creation from the reward definition.
    pub stars_deducted: u32,
    pub status: RedemptionStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub decided_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Custom reward requests
// =============================================================================

/// Status of a free-form reward request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomRequestStatus {
    /// Submitted, no price yet.
    Pending,
    /// Priced by a parent, awaiting the decision.
    StarsSet,
    /// Approved and debited.
    Approved,
    /// Refused. Never debited.
    Rejected,
}

impl CustomRequestStatus {
    /// Whether a parent still has to act on the request.
    pub fn awaits_parent(&self) -> bool {
        match self {
            CustomRequestStatus::Pending | CustomRequestStatus::StarsSet => true,
            CustomRequestStatus::Approved | CustomRequestStatus::Rejected => false,
        }
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomRequestStatus::Pending => "pending",
            CustomRequestStatus::StarsSet => "stars_set",
            CustomRequestStatus::Approved => "approved",
            CustomRequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CustomRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A free-form reward request priced after the fact by a parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRewardRequest {
    pub id: String,
    pub child_id: String,
    pub family_id: String,
    pub reward_name: String,
    #[serde(default)]
    pub link: Option<String>,
    /// Reference to an uploaded image; the upload itself happens elsewhere.
    #[serde(default)]
    pub image_ref: Option<String>,
    pub star_type: StarType,
    /// Absent until a parent sets the price.
    #[serde(default)]
    pub stars_required: Option<u32>,
    pub status: CustomRequestStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub priced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub decided_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_prefix_and_uniqueness() {
        let a = generate_id("cmp");
        let b = generate_id("cmp");
        assert!(a.starts_with("cmp_"));
        assert_eq!(a.len(), "cmp_".len() + 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_completion_status_credited() {
        assert!(CompletionStatus::AutoApproved.is_credited());
        assert!(CompletionStatus::Approved.is_credited());
        assert!(!CompletionStatus::Pending.is_credited());
        assert!(!CompletionStatus::Rejected.is_credited());
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&CompletionStatus::AutoApproved).unwrap(),
            "\"auto_approved\""
        );
        assert_eq!(
            serde_json::to_string(&CustomRequestStatus::StarsSet).unwrap(),
            "\"stars_set\""
        );
        assert_eq!(CustomRequestStatus::StarsSet.to_string(), "stars_set");
    }

    #[test]
    fn test_redemption_holds_stars() {
        assert!(RedemptionStatus::Pending.holds_stars());
        assert!(RedemptionStatus::Approved.holds_stars());
        assert!(!RedemptionStatus::Rejected.holds_stars());
    }

    #[test]
    fn test_custom_awaits_parent() {
        assert!(CustomRequestStatus::Pending.awaits_parent());
        assert!(CustomRequestStatus::StarsSet.awaits_parent());
        assert!(!CustomRequestStatus::Approved.awaits_parent());
    }
}
