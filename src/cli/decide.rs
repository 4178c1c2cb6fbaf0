//! Decide command for Starboard.
//!
//! A parent approves or rejects a pending completion, a pending redemption,
//! or a priced custom reward request.

use serde::Serialize;

use crate::cli::{failure_line, CommandOutput};
use crate::core::Decision;
use crate::engine::RewardEngine;
use crate::error::Result;
use crate::notify::Notifier;
use crate::storage::HouseholdStore;
use crate::workflow::PendingKind;

/// Output format for the decide command.
#[derive(Debug, Clone, Serialize)]
pub struct DecideOutput {
    /// Whether the decision was applied.
    pub success: bool,
    /// What kind of record was decided.
    pub kind: PendingKind,
    /// Record id.
    pub id: String,
    /// The decision asked for.
    pub decision: Decision,
    /// Status after the decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Child the record belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_id: Option<String>,
    /// Error message if the decision failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    refused: bool,
}

impl DecideOutput {
    fn from_result(
        kind: PendingKind,
        id: &str,
        decision: Decision,
        result: Result<(String, String)>,
    ) -> Self {
        let (status, child_id, error, refused) = match result {
            Ok((status, child_id)) => (Some(status), Some(child_id), None, false),
            Err(e) => (None, None, Some(e.to_string()), e.is_domain()),
        };
        Self {
            success: error.is_none(),
            kind,
            id: id.to_string(),
            decision,
            status,
            child_id,
            error,
            refused,
        }
    }
}

impl CommandOutput for DecideOutput {
    fn succeeded(&self) -> bool {
        self.success
    }

    fn refused(&self) -> bool {
        self.refused
    }

    fn format_human_readable(&self) -> String {
        if !self.success {
            return failure_line(
                &format!("Decision on {} {}", self.kind.as_str(), self.id),
                self.error.as_deref(),
            );
        }
        format!(
            "{} {} is now {}.\n",
            self.kind.as_str(),
            self.id,
            self.status.as_deref().unwrap_or("unknown")
        )
    }
}

/// The decide command implementation.
pub struct DecideCommand<'a, S, N> {
    engine: &'a RewardEngine<S, N>,
}

impl<'a, S: HouseholdStore, N: Notifier> DecideCommand<'a, S, N> {
    /// Create a new decide command.
    pub fn new(engine: &'a RewardEngine<S, N>) -> Self {
        Self { engine }
    }

    /// Decide a pending task completion.
    pub fn completion(&self, id: &str, decision: Decision) -> DecideOutput {
        let result = self
            .engine
            .decide_completion(id, decision)
            .map(|c| (c.status.to_string(), c.child_id));
        DecideOutput::from_result(PendingKind::Completion, id, decision, result)
    }

    /// Decide a pending reward redemption.
    pub fn redemption(&self, id: &str, decision: Decision) -> DecideOutput {
        let result = self
            .engine
            .decide_redemption(id, decision)
            .map(|r| (r.status.to_string(), r.child_id));
        DecideOutput::from_result(PendingKind::Redemption, id, decision, result)
    }

    /// Decide a priced custom reward request.
    pub fn custom(&self, id: &str, decision: Decision) -> DecideOutput {
        let result = self
            .engine
            .decide_custom_reward_request(id, decision)
            .map(|r| (r.status.to_string(), r.child_id));
        DecideOutput::from_result(PendingKind::CustomRequest, id, decision, result)
    }
}
