//! Redeem command for Starboard.
//!
//! A child spends stars on a catalog reward. The cost is held at request
//! time and refunded if a parent rejects the request.

use serde::Serialize;

use crate::cli::{failure_line, CommandOutput};
use crate::core::{RedemptionStatus, RewardRedemption};
use crate::engine::RewardEngine;
use crate::error::StarError;
use crate::notify::Notifier;
use crate::storage::HouseholdStore;

/// Output format for the redeem command.
#[derive(Debug, Clone, Serialize)]
pub struct RedeemOutput {
    /// Whether the redemption was recorded.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption: Option<RewardRedemption>,
    /// Error message if the request failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    refused: bool,
}

impl RedeemOutput {
    /// Create a successful output.
    pub fn success(redemption: RewardRedemption) -> Self {
        Self {
            success: true,
            redemption: Some(redemption),
            error: None,
            refused: false,
        }
    }

    /// Create a failed output.
    pub fn failure(err: &StarError) -> Self {
        Self {
            success: false,
            redemption: None,
            error: Some(err.to_string()),
            refused: err.is_domain(),
        }
    }
}

impl CommandOutput for RedeemOutput {
    fn succeeded(&self) -> bool {
        self.success
    }

    fn refused(&self) -> bool {
        self.refused
    }

    fn format_human_readable(&self) -> String {
        let Some(r) = self.redemption.as_ref().filter(|_| self.success) else {
            return failure_line("Redeem", self.error.as_deref());
        };
        match r.status {
            RedemptionStatus::Pending => format!(
                "Redemption {} is waiting for a parent; {} {} stars held.\n",
                r.id, r.stars_deducted, r.star_type
            ),
            RedemptionStatus::Approved => format!(
                "Redeemed {} for {} {} stars ({}).\n",
                r.reward_id, r.stars_deducted, r.star_type, r.id
            ),
            RedemptionStatus::Rejected => format!("Redemption {} rejected.\n", r.id),
        }
    }
}

/// The redeem command implementation.
pub struct RedeemCommand<'a, S, N> {
    engine: &'a RewardEngine<S, N>,
}

impl<'a, S: HouseholdStore, N: Notifier> RedeemCommand<'a, S, N> {
    /// Create a new redeem command.
    pub fn new(engine: &'a RewardEngine<S, N>) -> Self {
        Self { engine }
    }

    /// Request `reward_id` for `child_id`.
    pub fn run(&self, child_id: &str, reward_id: &str) -> RedeemOutput {
        match self.engine.request_redemption(child_id, reward_id) {
            Ok(redemption) => RedeemOutput::success(redemption),
            Err(e) => RedeemOutput::failure(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support::engine;
    use crate::core::StarType;

    #[test]
    fn test_redeem_holds_stars() {
        let engine = engine(2);
        engine.credit("kid-1", StarType::Fun, 25).unwrap();

        let output = RedeemCommand::new(&engine).run("kid-1", "movie");

        assert!(output.success);
        assert!(output.format_human_readable().contains("20 fun stars held"));
    }

    #[test]
    fn test_redeem_without_approval() {
        let engine = engine(2);
        engine.credit("kid-1", StarType::Fun, 5).unwrap();
        let output = RedeemCommand::new(&engine).run("kid-1", "candy");
        assert!(output.format_human_readable().starts_with("Redeemed candy"));
    }

    #[test]
    fn test_redeem_insufficient_is_refused() {
        let engine = engine(2);
        let output = RedeemCommand::new(&engine).run("kid-1", "movie");
        assert!(!output.success);
        assert!(output.refused());
        assert!(output.format_human_readable().contains("insufficient fun balance"));
    }
}
