//! Submit command for Starboard.
//!
//! A child reports a finished task. Depending on trust level the completion
//! is credited immediately or waits in the approval queue.

use serde::Serialize;

use crate::cli::{failure_line, CommandOutput};
use crate::core::{CompletionStatus, TaskCompletion};
use crate::engine::RewardEngine;
use crate::error::StarError;
use crate::notify::Notifier;
use crate::storage::HouseholdStore;

/// Output format for the submit command.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutput {
    /// Whether the completion was recorded.
    pub success: bool,
    /// The recorded completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<TaskCompletion>,
    /// Error message if submission failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    refused: bool,
}

impl SubmitOutput {
    /// Create a successful output.
    pub fn success(completion: TaskCompletion) -> Self {
        Self {
            success: true,
            completion: Some(completion),
            error: None,
            refused: false,
        }
    }

    /// Create a failed output.
    pub fn failure(err: &StarError) -> Self {
        Self {
            success: false,
            completion: None,
            error: Some(err.to_string()),
            refused: err.is_domain(),
        }
    }
}

impl CommandOutput for SubmitOutput {
    fn succeeded(&self) -> bool {
        self.success
    }

    fn refused(&self) -> bool {
        self.refused
    }

    fn format_human_readable(&self) -> String {
        let Some(c) = self.completion.as_ref().filter(|_| self.success) else {
            return failure_line("Submit", self.error.as_deref());
        };
        match c.status {
            CompletionStatus::AutoApproved => format!(
                "Completion {} auto-approved: +{} {} stars.\n",
                c.id, c.stars_awarded, c.star_type
            ),
            CompletionStatus::Pending => format!(
                "Completion {} is waiting for a parent ({} {} stars).\n",
                c.id, c.stars_awarded, c.star_type
            ),
            CompletionStatus::Approved | CompletionStatus::Rejected => {
                format!("Completion {} recorded ({}).\n", c.id, c.status)
            }
        }
    }
}

/// The submit command implementation.
pub struct SubmitCommand<'a, S, N> {
    engine: &'a RewardEngine<S, N>,
}

impl<'a, S: HouseholdStore, N: Notifier> SubmitCommand<'a, S, N> {
    /// Create a new submit command.
    pub fn new(engine: &'a RewardEngine<S, N>) -> Self {
        Self { engine }
    }

    /// Submit a completion of `task_id` by `child_id`.
    pub fn run(&self, child_id: &str, task_id: &str) -> SubmitOutput {
        match self.engine.submit_completion(child_id, task_id) {
            Ok(completion) => SubmitOutput::success(completion),
            Err(e) => SubmitOutput::failure(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support::engine;
    use crate::error::exit_codes;

    #[test]
    fn test_submit_pending() {
        let engine = engine(1);
        let output = SubmitCommand::new(&engine).run("kid-1", "dishes");
        assert!(output.success);
        assert_eq!(
            output.completion.as_ref().unwrap().status,
            CompletionStatus::Pending
        );
        assert!(output.format_human_readable().contains("waiting for a parent"));
    }

    #[test]
    fn test_submit_auto_approved() {
        let engine = engine(5);
        let output = SubmitCommand::new(&engine).run("kid-1", "dishes");
        assert!(output.format_human_readable().contains("auto-approved: +10 fun"));
    }

    #[test]
    fn test_submit_unknown_task_refused() {
        let engine = engine(1);
        let output = SubmitCommand::new(&engine).run("kid-1", "mow");
        assert!(!output.success);
        assert_eq!(output.exit_code(), exit_codes::REFUSED);
        assert!(output.error.unwrap().contains("invalid task mow"));
    }

    #[test]
    fn test_json_has_no_error_on_success() {
        let engine = engine(1);
        let output = SubmitCommand::new(&engine).run("kid-1", "dishes");
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert_eq!(json["completion"]["status"], "pending");
    }
}
