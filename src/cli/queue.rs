//! Queue command for Starboard.
//!
//! Lists everything in a family still waiting for a parent.

use serde::Serialize;

use crate::cli::{failure_line, CommandOutput};
use crate::engine::RewardEngine;
use crate::error::StarError;
use crate::notify::Notifier;
use crate::storage::HouseholdStore;
use crate::workflow::PendingItem;

/// Output format for the queue command.
#[derive(Debug, Clone, Serialize)]
pub struct QueueOutput {
    /// Whether the queue was read.
    pub success: bool,
    pub family_id: String,
    /// Number of pending items.
    pub count: usize,
    /// Pending items, oldest first.
    pub items: Vec<PendingItem>,
    /// Error message if reading failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    refused: bool,
}

impl QueueOutput {
    /// Create a successful output.
    pub fn success(family_id: &str, items: Vec<PendingItem>) -> Self {
        Self {
            success: true,
            family_id: family_id.to_string(),
            count: items.len(),
            items,
            error: None,
            refused: false,
        }
    }

    /// Create a failed output.
    pub fn failure(family_id: &str, err: &StarError) -> Self {
        Self {
            success: false,
            family_id: family_id.to_string(),
            count: 0,
            items: Vec::new(),
            error: Some(err.to_string()),
            refused: err.is_domain(),
        }
    }
}

impl CommandOutput for QueueOutput {
    fn succeeded(&self) -> bool {
        self.success
    }

    fn refused(&self) -> bool {
        self.refused
    }

    fn format_human_readable(&self) -> String {
        if !self.success {
            return failure_line("Queue", self.error.as_deref());
        }
        if self.items.is_empty() {
            return format!("Nothing waiting for approval in {}.\n", self.family_id);
        }

        let mut lines = vec![format!("{} item(s) waiting for approval:\n", self.count)];
        for (i, item) in self.items.iter().enumerate() {
            let stars = item
                .stars
                .map(|s| format!("{} {}", s, item.star_type))
                .unwrap_or_else(|| "unpriced".to_string());
            lines.push(format!(
                "{}. [{}] {} - {} ({}, {})",
                i + 1,
                item.kind.as_str(),
                item.child_name,
                item.title,
                stars,
                item.submitted_at.format("%Y-%m-%d %H:%M")
            ));
            lines.push(format!("   id: {}", item.id));
        }
        lines.join("\n") + "\n"
    }
}

/// The queue command implementation.
pub struct QueueCommand<'a, S, N> {
    engine: &'a RewardEngine<S, N>,
}

impl<'a, S: HouseholdStore, N: Notifier> QueueCommand<'a, S, N> {
    /// Create a new queue command.
    pub fn new(engine: &'a RewardEngine<S, N>) -> Self {
        Self { engine }
    }

    /// List pending items for a family.
    pub fn run(&self, family_id: &str) -> QueueOutput {
        match self.engine.pending_approvals(family_id) {
            Ok(items) => QueueOutput::success(family_id, items),
            Err(e) => QueueOutput::failure(family_id, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support::engine;
    use crate::workflow::CustomRewardDraft;

    #[test]
    fn test_empty_queue() {
        let engine = engine(1);
        let output = QueueCommand::new(&engine).run("fam");
        assert!(output.success);
        assert_eq!(output.count, 0);
        assert_eq!(
            output.format_human_readable(),
            "Nothing waiting for approval in fam.\n"
        );
    }

    #[test]
    fn test_queue_lists_items() {
        let engine = engine(1);
        engine.submit_completion("kid-1", "dishes").unwrap();
        engine
            .submit_custom_reward_request("kid-1", &CustomRewardDraft::named("Kite"))
            .unwrap();

        let output = QueueCommand::new(&engine).run("fam");

        assert_eq!(output.count, 2);
        let text = output.format_human_readable();
        assert!(text.contains("[completion] Ada - Dishes (10 fun"));
        assert!(text.contains("[custom_request] Ada - Kite (unpriced"));
    }

    #[test]
    fn test_other_family_is_empty() {
        let engine = engine(1);
        engine.submit_completion("kid-1", "dishes").unwrap();
        assert_eq!(QueueCommand::new(&engine).run("other").count, 0);
    }
}
