//! Trust policy: maps a child's trust level to the friction a completion faces.
//!
//! The mapping is a table loaded from configuration rather than a hard-coded
//! threshold, with optional per task-category overrides.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::TrustConfig;
use crate::core::{validate_trust_level, CompletionStatus, MAX_TRUST_LEVEL};
use crate::error::{Result, StarError};

/// Whether a completion needs a parent before it is credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalRequirement {
    /// Goes to the approval queue as pending.
    Manual,
    /// Credited at submission time.
    Auto,
}

impl ApprovalRequirement {
    /// Initial status for a completion under this requirement.
    pub fn initial_status(&self) -> CompletionStatus {
        match self {
            ApprovalRequirement::Manual => CompletionStatus::Pending,
            ApprovalRequirement::Auto => CompletionStatus::AutoApproved,
        }
    }
}

/// One requirement per trust level.
type TrustTable = [ApprovalRequirement; MAX_TRUST_LEVEL as usize];

/// Replaceable trust policy.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustPolicy {
    default: TrustTable,
    categories: HashMap<String, TrustTable>,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        // The default config table is always well-formed.
        Self::from_config(&TrustConfig::default()).unwrap_or(Self {
            default: [ApprovalRequirement::Manual; MAX_TRUST_LEVEL as usize],
            categories: HashMap::new(),
        })
    }
}

impl TrustPolicy {
    /// Build a policy from its configuration tables.
    ///
    /// Every table must have exactly one entry per trust level.
    pub fn from_config(config: &TrustConfig) -> Result<Self> {
        let default = to_table("trust.levels", &config.levels)?;
        let categories = config
            .categories
            .iter()
            .map(|(name, levels)| {
                to_table(&format!("trust.categories.{}", name), levels)
                    .map(|table| (name.clone(), table))
            })
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self {
            default,
            categories,
        })
    }

    /// Replace the table used for one task category.
    pub fn with_category(mut self, category: impl Into<String>, table: TrustTable) -> Self {
        self.categories.insert(category.into(), table);
        self
    }

    /// Decide the approval requirement for a trust level.
    ///
    /// A category without an override falls back to the default table.
    pub fn decide(&self, trust_level: u8, category: Option<&str>) -> Result<ApprovalRequirement> {
        validate_trust_level(trust_level)?;
        let table = category
            .and_then(|c| self.categories.get(c))
            .unwrap_or(&self.default);
        Ok(table[usize::from(trust_level - 1)])
    }
}

fn to_table(name: &str, levels: &[ApprovalRequirement]) -> Result<TrustTable> {
    levels.try_into().map_err(|_| {
        StarError::config(format!(
            "{} must list exactly {} entries, found {}",
            name,
            MAX_TRUST_LEVEL,
            levels.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApprovalRequirement::{Auto, Manual};

    #[test]
    fn test_default_mapping() {
        let policy = TrustPolicy::default();
        assert_eq!(policy.decide(1, None).unwrap(), Manual);
        assert_eq!(policy.decide(2, None).unwrap(), Manual);
        assert_eq!(policy.decide(3, None).unwrap(), Auto);
        assert_eq!(policy.decide(4, None).unwrap(), Auto);
        assert_eq!(policy.decide(5, None).unwrap(), Auto);
    }

    #[test]
    fn test_out_of_range_levels_rejected() {
        let policy = TrustPolicy::default();
        assert!(matches!(
            policy.decide(0, None),
            Err(StarError::Validation { .. })
        ));
        assert!(matches!(
            policy.decide(6, None),
            Err(StarError::Validation { .. })
        ));
    }

    #[test]
    fn test_category_override() {
        let policy = TrustPolicy::default().with_category("homework", [Manual; 5]);
        assert_eq!(policy.decide(5, Some("homework")).unwrap(), Manual);
        assert_eq!(policy.decide(5, Some("chores")).unwrap(), Auto);
        assert_eq!(policy.decide(5, None).unwrap(), Auto);
    }

    #[test]
    fn test_from_config_rejects_short_table() {
        let config = TrustConfig {
            levels: vec![Manual, Auto],
            ..TrustConfig::default()
        };
        let err = TrustPolicy::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("exactly 5 entries"));
    }

    #[test]
    fn test_from_config_with_categories() {
        let mut config = TrustConfig::default();
        config
            .categories
            .insert("outdoor".to_string(), vec![Auto, Auto, Auto, Auto, Auto]);
        let policy = TrustPolicy::from_config(&config).unwrap();
        assert_eq!(policy.decide(1, Some("outdoor")).unwrap(), Auto);
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(Manual.initial_status(), CompletionStatus::Pending);
        assert_eq!(Auto.initial_status(), CompletionStatus::AutoApproved);
    }
}
