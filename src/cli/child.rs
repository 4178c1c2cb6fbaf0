//! Child command for Starboard.
//!
//! Registers child profiles and shows their balances and streaks.

use serde::{Deserialize, Serialize};

use crate::cli::{failure_line, CommandOutput};
use crate::core::{Child, StarType};
use crate::engine::RewardEngine;
use crate::error::{Result, StarError};
use crate::notify::Notifier;
use crate::storage::HouseholdStore;

/// Balance of one star type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub star_type: StarType,
    pub balance: u32,
    pub weekly_earned: u32,
    pub weekly_limit: u32,
}

/// Profile summary for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildInfo {
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub trust_level: u8,
    pub balances: Vec<BalanceInfo>,
    pub current_streak: u32,
    pub longest_streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_completion_date: Option<String>,
}

impl ChildInfo {
    /// Summarize a child, filling missing balances with `default_weekly_limit`.
    pub fn from_child(child: &Child, default_weekly_limit: u32) -> Self {
        let balances = StarType::ALL
            .iter()
            .map(|&star_type| {
                let entry = child.star_balances.get(&star_type);
                BalanceInfo {
                    star_type,
                    balance: entry.map_or(0, |b| b.balance),
                    weekly_earned: entry.map_or(0, |b| b.weekly_earned),
                    weekly_limit: entry.map_or(default_weekly_limit, |b| b.weekly_limit),
                }
            })
            .collect();
        Self {
            id: child.id.clone(),
            family_id: child.family_id.clone(),
            name: child.name.clone(),
            trust_level: child.trust_level,
            balances,
            current_streak: child.streaks.current_streak,
            longest_streak: child.streaks.longest_streak,
            last_completion_date: child
                .streaks
                .last_completion_date
                .map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Output format for the child command.
#[derive(Debug, Clone, Serialize)]
pub struct ChildOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// Whether the child was just registered.
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child: Option<ChildInfo>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    refused: bool,
}

impl ChildOutput {
    /// Create a successful output.
    pub fn success(child: ChildInfo, created: bool) -> Self {
        Self {
            success: true,
            created,
            child: Some(child),
            error: None,
            refused: false,
        }
    }

    /// Create a failed output.
    pub fn failure(err: &StarError) -> Self {
        Self {
            success: false,
            created: false,
            child: None,
            error: Some(err.to_string()),
            refused: err.is_domain(),
        }
    }
}

impl CommandOutput for ChildOutput {
    fn succeeded(&self) -> bool {
        self.success
    }

    fn refused(&self) -> bool {
        self.refused
    }

    fn format_human_readable(&self) -> String {
        let Some(child) = self.child.as_ref().filter(|_| self.success) else {
            return failure_line("Child", self.error.as_deref());
        };

        let mut lines = Vec::new();
        if self.created {
            lines.push(format!("Registered {} ({}).", child.name, child.id));
        }
        lines.push(format!(
            "{} ({}) family {} trust level {}",
            child.name, child.id, child.family_id, child.trust_level
        ));
        for b in &child.balances {
            lines.push(format!(
                "  {:<7} {:>5} stars  ({} of {} earned this week)",
                b.star_type, b.balance, b.weekly_earned, b.weekly_limit
            ));
        }
        lines.push(format!(
            "  streak  {} day(s), best {}{}",
            child.current_streak,
            child.longest_streak,
            child
                .last_completion_date
                .as_deref()
                .map(|d| format!(", last {}", d))
                .unwrap_or_default()
        ));
        lines.join("\n") + "\n"
    }
}

/// The child command implementation.
pub struct ChildCommand<'a, S, N> {
    engine: &'a RewardEngine<S, N>,
}

impl<'a, S: HouseholdStore, N: Notifier> ChildCommand<'a, S, N> {
    /// Create a new child command.
    pub fn new(engine: &'a RewardEngine<S, N>) -> Self {
        Self { engine }
    }

    /// Register a new child profile.
    pub fn add(&self, id: &str, family_id: &str, name: &str, trust_level: u8) -> ChildOutput {
        let child = Child::new(id, family_id, name, trust_level);
        match self.engine.store().register_child(&child) {
            Ok(()) => {
                tracing::info!(child_id = id, family_id, trust_level, "child registered");
                ChildOutput::success(self.info(&child), true)
            }
            Err(e) => ChildOutput::failure(&e),
        }
    }

    /// Show a child's balances and streaks.
    pub fn show(&self, id: &str) -> ChildOutput {
        match self.load(id) {
            Ok(child) => ChildOutput::success(self.info(&child), false),
            Err(e) => ChildOutput::failure(&e),
        }
    }

    fn load(&self, id: &str) -> Result<Child> {
        self.engine
            .store()
            .child(id)?
            .map(|c| c.value)
            .ok_or_else(|| StarError::not_found("child", id))
    }

    fn info(&self, child: &Child) -> ChildInfo {
        ChildInfo::from_child(child, self.engine.config().ledger.default_weekly_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support::engine;
    use crate::error::exit_codes;

    #[test]
    fn test_add_and_show() {
        let engine = engine(2);
        let cmd = ChildCommand::new(&engine);

        let output = cmd.add("kid-2", "fam", "Bo", 3);
        assert!(output.success);
        assert!(output.created);

        let shown = cmd.show("kid-2");
        let child = shown.child.unwrap();
        assert_eq!(child.name, "Bo");
        assert_eq!(child.trust_level, 3);
        assert_eq!(child.balances.len(), 2);
        assert!(child.balances.iter().all(|b| b.balance == 0 && b.weekly_limit == 100));
    }

    #[test]
    fn test_add_invalid_trust_level_is_refused() {
        let engine = engine(2);
        let output = ChildCommand::new(&engine).add("kid-2", "fam", "Bo", 9);
        assert!(!output.success);
        assert_eq!(output.exit_code(), exit_codes::REFUSED);
    }

    #[test]
    fn test_add_duplicate_fails() {
        let engine = engine(2);
        let output = ChildCommand::new(&engine).add("kid-1", "fam", "Ada", 2);
        assert!(!output.success);
        assert!(output.error.unwrap().contains("already exists"));
    }

    #[test]
    fn test_show_unknown() {
        let engine = engine(2);
        let output = ChildCommand::new(&engine).show("ghost");
        assert!(!output.success);
        assert!(output.format_human_readable().starts_with("Child failed"));
    }

    #[test]
    fn test_human_readable_lists_balances() {
        let engine = engine(2);
        engine.credit("kid-1", StarType::Growth, 12).unwrap();
        let text = ChildCommand::new(&engine).show("kid-1").format_human_readable();
        assert!(text.contains("Ada (kid-1)"));
        assert!(text.contains("growth"));
        assert!(text.contains("12 stars"));
    }
}
