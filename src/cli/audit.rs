//! Audit command for Starboard.
//!
//! Shows a child's record history and checks that the stored balances
//! match what the records imply.

use serde::Serialize;

use crate::cli::{failure_line, CommandOutput};
use crate::engine::{ChildHistory, ReconciliationReport, RewardEngine};
use crate::error::{Result, StarError};
use crate::notify::Notifier;
use crate::storage::HouseholdStore;

/// Options for the audit command.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditOptions {
    /// Show only the last `limit` records of each kind.
    pub limit: Option<usize>,
}

/// Output format for the audit command.
#[derive(Debug, Clone, Serialize)]
pub struct AuditOutput {
    /// Whether the audit ran.
    pub success: bool,
    pub child_id: String,
    /// Whether every balance reconciles.
    pub balanced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<ReconciliationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<ChildHistory>,
    /// Error message if the audit failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    refused: bool,
}

impl AuditOutput {
    /// Create a successful output.
    pub fn success(child_id: &str, reconciliation: ReconciliationReport, history: ChildHistory) -> Self {
        Self {
            success: true,
            child_id: child_id.to_string(),
            balanced: reconciliation.is_balanced(),
            reconciliation: Some(reconciliation),
            history: Some(history),
            error: None,
            refused: false,
        }
    }

    /// Create a failed output.
    pub fn failure(child_id: &str, err: &StarError) -> Self {
        Self {
            success: false,
            child_id: child_id.to_string(),
            balanced: false,
            reconciliation: None,
            history: None,
            error: Some(err.to_string()),
            refused: err.is_domain(),
        }
    }
}

impl CommandOutput for AuditOutput {
    fn succeeded(&self) -> bool {
        self.success
    }

    fn refused(&self) -> bool {
        self.refused
    }

    fn format_human_readable(&self) -> String {
        let (Some(report), Some(history)) = (&self.reconciliation, &self.history) else {
            return failure_line("Audit", self.error.as_deref());
        };

        let mut lines = vec![format!("Audit for {}", self.child_id)];
        for line in &report.lines {
            lines.push(format!(
                "  {:<7} expected {:>5}  actual {:>5}  {}",
                line.star_type,
                line.expected,
                line.actual,
                if line.is_balanced() { "ok" } else { "MISMATCH" }
            ));
        }

        lines.push(format!("Completions ({}):", history.completions.len()));
        for c in &history.completions {
            lines.push(format!(
                "  {} {} {} {} {}",
                c.completed_at.format("%Y-%m-%d %H:%M"),
                c.id,
                c.task_id,
                c.stars_awarded,
                c.status
            ));
        }
        lines.push(format!("Redemptions ({}):", history.redemptions.len()));
        for r in &history.redemptions {
            lines.push(format!(
                "  {} {} {} {} {}",
                r.requested_at.format("%Y-%m-%d %H:%M"),
                r.id,
                r.reward_id,
                r.stars_deducted,
                r.status
            ));
        }
        lines.push(format!("Custom requests ({}):", history.custom_requests.len()));
        for r in &history.custom_requests {
            lines.push(format!(
                "  {} {} \"{}\" {} {}",
                r.requested_at.format("%Y-%m-%d %H:%M"),
                r.id,
                r.reward_name,
                r.stars_required
                    .map_or_else(|| "-".to_string(), |s| s.to_string()),
                r.status
            ));
        }
        lines.join("\n") + "\n"
    }
}

/// The audit command implementation.
pub struct AuditCommand<'a, S, N> {
    engine: &'a RewardEngine<S, N>,
}

impl<'a, S: HouseholdStore, N: Notifier> AuditCommand<'a, S, N> {
    /// Create a new audit command.
    pub fn new(engine: &'a RewardEngine<S, N>) -> Self {
        Self { engine }
    }

    /// Audit one child.
    pub fn run(&self, child_id: &str, options: &AuditOptions) -> AuditOutput {
        match self.audit(child_id, options) {
            Ok((report, history)) => AuditOutput::success(child_id, report, history),
            Err(e) => AuditOutput::failure(child_id, &e),
        }
    }

    fn audit(
        &self,
        child_id: &str,
        options: &AuditOptions,
    ) -> Result<(ReconciliationReport, ChildHistory)> {
        let report = self.engine.reconcile(child_id)?;
        let mut history = self.engine.history(child_id)?;
        if let Some(limit) = options.limit {
            keep_last(&mut history.completions, limit);
            keep_last(&mut history.redemptions, limit);
            keep_last(&mut history.custom_requests, limit);
        }
        Ok((report, history))
    }
}

fn keep_last<T>(records: &mut Vec<T>, limit: usize) {
    let excess = records.len().saturating_sub(limit);
    records.drain(..excess);
}
