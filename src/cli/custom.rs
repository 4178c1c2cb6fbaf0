//! Custom reward command for Starboard.
//!
//! A child asks for something outside the catalog; a parent prices it.
//! Deciding a priced request goes through the decide command.

use serde::Serialize;

use crate::cli::{failure_line, CommandOutput};
use crate::core::{CustomRequestStatus, CustomRewardRequest};
use crate::engine::RewardEngine;
use crate::error::StarError;
use crate::notify::Notifier;
use crate::storage::HouseholdStore;
use crate::workflow::CustomRewardDraft;

/// Output format for the custom reward command.
#[derive(Debug, Clone, Serialize)]
pub struct CustomOutput {
    /// Whether the request was saved.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<CustomRewardRequest>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    refused: bool,
}

impl CustomOutput {
    /// Create a successful output.
    pub fn success(request: CustomRewardRequest) -> Self {
        Self {
            success: true,
            request: Some(request),
            error: None,
            refused: false,
        }
    }

    /// Create a failed output.
    pub fn failure(err: &StarError) -> Self {
        Self {
            success: false,
            request: None,
            error: Some(err.to_string()),
            refused: err.is_domain(),
        }
    }
}

impl CommandOutput for CustomOutput {
    fn succeeded(&self) -> bool {
        self.success
    }

    fn refused(&self) -> bool {
        self.refused
    }

    fn format_human_readable(&self) -> String {
        let Some(r) = self.request.as_ref().filter(|_| self.success) else {
            return failure_line("Custom reward", self.error.as_deref());
        };
        match (r.status, r.stars_required) {
            (CustomRequestStatus::StarsSet, Some(stars)) => format!(
                "\"{}\" ({}) priced at {} {} stars; waiting for a decision.\n",
                r.reward_name, r.id, stars, r.star_type
            ),
            _ => format!(
                "Requested \"{}\" ({}); waiting for a parent to set a price.\n",
                r.reward_name, r.id
            ),
        }
    }
}

/// The custom reward command implementation.
pub struct CustomCommand<'a, S, N> {
    engine: &'a RewardEngine<S, N>,
}

impl<'a, S: HouseholdStore, N: Notifier> CustomCommand<'a, S, N> {
    /// Create a new custom reward command.
    pub fn new(engine: &'a RewardEngine<S, N>) -> Self {
        Self { engine }
    }

    /// Submit a custom reward request for a child.
    pub fn request(&self, child_id: &str, draft: &CustomRewardDraft) -> CustomOutput {
        match self.engine.submit_custom_reward_request(child_id, draft) {
            Ok(request) => CustomOutput::success(request),
            Err(e) => CustomOutput::failure(&e),
        }
    }

    /// Set the price of a pending request.
    pub fn price(&self, id: &str, stars: u32) -> CustomOutput {
        match self.engine.set_custom_reward_price(id, stars) {
            Ok(request) => CustomOutput::success(request),
            Err(e) => CustomOutput::failure(&e),
        }
    }
}
