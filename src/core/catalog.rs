//! Task and reward catalog entries.
//!
//! The catalogs are owned by the surrounding application; the engine only
//! reads them to price completions and redemptions.

use serde::{Deserialize, Serialize};

use crate::core::StarType;

/// A chore or activity a child can complete for stars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Family the task belongs to.
    pub family_id: String,
    /// Display title.
    pub title: String,
    /// Stars awarded per approved completion.
    pub star_value: u32,
    /// Star type awarded.
    pub star_type: StarType,
    /// Inactive tasks cannot be submitted.
    pub is_active: bool,
    /// Children allowed to submit this task.
    #[serde(default)]
    pub assigned_child_ids: Vec<String>,
    /// Optional category selecting a trust policy override.
    #[serde(default)]
    pub category: Option<String>,
}

impl Task {
    /// Create an active task with no assignees.
    pub fn new(
        id: impl Into<String>,
        family_id: impl Into<String>,
        title: impl Into<String>,
        star_value: u32,
        star_type: StarType,
    ) -> Self {
        Self {
            id: id.into(),
            family_id: family_id.into(),
            title: title.into(),
            star_value,
            star_type,
            is_active: true,
            assigned_child_ids: Vec::new(),
            category: None,
        }
    }

    /// Assign the task to a child.
    pub fn assigned_to(mut self, child_id: impl Into<String>) -> Self {
        self.assigned_child_ids.push(child_id.into());
        self
    }

    /// Set the task category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Whether the child may submit this task.
    pub fn is_assigned_to(&self, child_id: &str) -> bool {
        self.assigned_child_ids.iter().any(|id| id == child_id)
    }
}

/// A catalog reward a child can spend stars on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    /// Unique reward identifier.
    pub id: String,
    /// Family the reward belongs to.
    pub family_id: String,
    /// Display title.
    pub title: String,
    /// Stars escrowed when the reward is requested.
    pub star_cost: u32,
    /// Star type spent.
    pub star_type: StarType,
    /// Whether a parent must approve each redemption.
    pub requires_approval: bool,
    /// Inactive rewards cannot be requested.
    pub is_active: bool,
}

impl Reward {
    /// Create an active reward.
    pub fn new(
        id: impl Into<String>,
        family_id: impl Into<String>,
        title: impl Into<String>,
        star_cost: u32,
        star_type: StarType,
        requires_approval: bool,
    ) -> Self {
        Self {
            id: id.into(),
            family_id: family_id.into(),
            title: title.into(),
            star_cost,
            star_type,
            requires_approval,
            is_active: true,
        }
    }
}
