//! Catalog command for Starboard.
//!
//! Adds or replaces task and reward catalog entries.

use serde::Serialize;

use crate::cli::{failure_line, CommandOutput};
use crate::core::{Reward, StarType, Task};
use crate::engine::RewardEngine;
use crate::error::{Result, StarError};
use crate::notify::Notifier;
use crate::storage::HouseholdStore;

/// A task to add.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub id: String,
    pub family_id: String,
    pub title: String,
    pub star_value: u32,
    pub star_type: StarType,
    pub assigned_child_ids: Vec<String>,
    pub category: Option<String>,
    pub inactive: bool,
}

/// A reward to add.
#[derive(Debug, Clone)]
pub struct RewardSpec {
    pub id: String,
    pub family_id: String,
    pub title: String,
    pub star_cost: u32,
    pub star_type: StarType,
    pub requires_approval: bool,
    pub inactive: bool,
}

/// A saved catalog entry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogEntry {
    Task(Task),
    Reward(Reward),
}

/// Output format for the catalog command.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogOutput {
    /// Whether the entry was saved.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<CatalogEntry>,
    /// Error message if saving failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    refused: bool,
}

impl CatalogOutput {
    /// Create a successful output.
    pub fn success(entry: CatalogEntry) -> Self {
        Self {
            success: true,
            entry: Some(entry),
            error: None,
            refused: false,
        }
    }

    /// Create a failed output.
    pub fn failure(err: &StarError) -> Self {
        Self {
            success: false,
            entry: None,
            error: Some(err.to_string()),
            refused: err.is_domain(),
        }
    }
}

impl CommandOutput for CatalogOutput {
    fn succeeded(&self) -> bool {
        self.success
    }

    fn refused(&self) -> bool {
        self.refused
    }

    fn format_human_readable(&self) -> String {
        match (&self.entry, self.success) {
            (Some(CatalogEntry::Task(task)), true) => format!(
                "Saved task {} \"{}\": {} {} stars, assigned to {}\n",
                task.id,
                task.title,
                task.star_value,
                task.star_type,
                if task.assigned_child_ids.is_empty() {
                    "nobody".to_string()
                } else {
                    task.assigned_child_ids.join(", ")
                }
            ),
            (Some(CatalogEntry::Reward(reward)), true) => format!(
                "Saved reward {} \"{}\": {} {} stars{}\n",
                reward.id,
                reward.title,
                reward.star_cost,
                reward.star_type,
                if reward.requires_approval {
                    ", needs approval"
                } else {
                    ""
                }
            ),
            _ => failure_line("Catalog update", self.error.as_deref()),
        }
    }
}

/// The catalog command implementation.
pub struct CatalogCommand<'a, S, N> {
    engine: &'a RewardEngine<S, N>,
}

impl<'a, S: HouseholdStore, N: Notifier> CatalogCommand<'a, S, N> {
    /// Create a new catalog command.
    pub fn new(engine: &'a RewardEngine<S, N>) -> Self {
        Self { engine }
    }

    /// Add or replace a task.
    pub fn add_task(&self, spec: &TaskSpec) -> CatalogOutput {
        match self.save_task(spec) {
            Ok(task) => {
                tracing::info!(task_id = %task.id, "task saved");
                CatalogOutput::success(CatalogEntry::Task(task))
            }
            Err(e) => CatalogOutput::failure(&e),
        }
    }

    /// Add or replace a reward.
    pub fn add_reward(&self, spec: &RewardSpec) -> CatalogOutput {
        match self.save_reward(spec) {
            Ok(reward) => {
                tracing::info!(reward_id = %reward.id, "reward saved");
                CatalogOutput::success(CatalogEntry::Reward(reward))
            }
            Err(e) => CatalogOutput::failure(&e),
        }
    }

    fn save_task(&self, spec: &TaskSpec) -> Result<Task> {
        require_text("task id", &spec.id)?;
        require_text("task title", &spec.title)?;
        let mut task = Task::new(
            spec.id.trim(),
            spec.family_id.trim(),
            spec.title.trim(),
            spec.star_value,
            spec.star_type,
        );
        task.assigned_child_ids = spec.assigned_child_ids.clone();
        task.category = spec.category.clone();
        task.is_active = !spec.inactive;
        self.engine.store().put_task(&task)?;
        Ok(task)
    }

    fn save_reward(&self, spec: &RewardSpec) -> Result<Reward> {
        require_text("reward id", &spec.id)?;
        require_text("reward title", &spec.title)?;
        let mut reward = Reward::new(
            spec.id.trim(),
            spec.family_id.trim(),
            spec.title.trim(),
            spec.star_cost,
            spec.star_type,
            spec.requires_approval,
        );
        reward.is_active = !spec.inactive;
        self.engine.store().put_reward(&reward)?;
        Ok(reward)
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StarError::validation(format!("{} must not be blank", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_support::engine;

    fn task_spec() -> TaskSpec {
        TaskSpec {
            id: "laundry".to_string(),
            family_id: "fam".to_string(),
            title: "Fold laundry".to_string(),
            star_value: 8,
            star_type: StarType::Growth,
            assigned_child_ids: vec!["kid-1".to_string()],
            category: Some("chores".to_string()),
            inactive: false,
        }
    }

    #[test]
    fn test_add_task_is_submittable() {
        let engine = engine(5);
        let output = CatalogCommand::new(&engine).add_task(&task_spec());
        assert!(output.success);
        assert!(output.format_human_readable().contains("assigned to kid-1"));

        let completion = engine.submit_completion("kid-1", "laundry").unwrap();
        assert_eq!(completion.stars_awarded, 8);
    }

    #[test]
    fn test_inactive_task_saved_but_not_submittable() {
        let engine = engine(5);
        let spec = TaskSpec {
            inactive: true,
            ..task_spec()
        };
        assert!(CatalogCommand::new(&engine).add_task(&spec).success);
        assert!(matches!(
            engine.submit_completion("kid-1", "laundry"),
            Err(StarError::InvalidTask { .. })
        ));
    }

    #[test]
    fn test_blank_title_refused() {
        let engine = engine(5);
        let spec = TaskSpec {
            title: "  ".to_string(),
            ..task_spec()
        };
        let output = CatalogCommand::new(&engine).add_task(&spec);
        assert!(!output.success);
        assert!(output.refused());
    }

    #[test]
    fn test_add_reward() {
        let engine = engine(5);
        let output = CatalogCommand::new(&engine).add_reward(&RewardSpec {
            id: "zoo".to_string(),
            family_id: "fam".to_string(),
            title: "Zoo trip".to_string(),
            star_cost: 100,
            star_type: StarType::Fun,
            requires_approval: true,
            inactive: false,
        });
        assert!(output.success);
        assert!(output.format_human_readable().contains("needs approval"));
        assert_eq!(engine.store().reward("zoo").unwrap().unwrap().star_cost, 100);
    }
}
