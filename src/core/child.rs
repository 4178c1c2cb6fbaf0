//! The child aggregate: trust level, star balances and streak counters.
//!
//! Balances and streaks are only ever mutated through the ledger and streak
//! functions in [`crate::ledger`]; everything else reads them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StarError};

/// Lowest valid trust level.
pub const MIN_TRUST_LEVEL: u8 = 1;

/// Highest valid trust level.
pub const MAX_TRUST_LEVEL: u8 = 5;

/// Star currency type. Each type keeps an independent balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarType {
    /// Earned for chores and growth tasks.
    Growth,
    /// Earned for fun or bonus tasks.
    Fun,
}

impl StarType {
    /// All star types, in display order.
    pub const ALL: [StarType; 2] = [StarType::Growth, StarType::Fun];

    /// Wire name of the star type.
    pub fn as_str(&self) -> &'static str {
        match self {
            StarType::Growth => "growth",
            StarType::Fun => "fun",
        }
    }
}

impl fmt::Display for StarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for StarType {
    type Err = StarError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "growth" => Ok(StarType::Growth),
            "fun" => Ok(StarType::Fun),
            other => Err(StarError::validation(format!(
                "unknown star type '{}' (expected growth or fun)",
                other
            ))),
        }
    }
}

/// Balance and weekly earnings for one star type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarBalance {
    /// Spendable stars. Never negative.
    pub balance: u32,
    /// Stars earned in the current week, clamped at `weekly_limit`.
    pub weekly_earned: u32,
    /// Reporting cap for `weekly_earned`. Does not cap the balance.
    pub weekly_limit: u32,
    /// First day of the week `weekly_earned` belongs to.
    #[serde(default)]
    pub week_of: Option<NaiveDate>,
}

impl StarBalance {
    /// An empty balance with the given weekly limit.
    pub fn empty(weekly_limit: u32) -> Self {
        Self {
            balance: 0,
            weekly_earned: 0,
            weekly_limit,
            week_of: None,
        }
    }
}

/// Streak counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Streaks {
    /// Consecutive calendar days with at least one approved completion.
    pub current_streak: u32,
    /// Best streak ever reached.
    pub longest_streak: u32,
    /// Calendar day of the last approved completion.
    pub last_completion_date: Option<NaiveDate>,
}

/// A child profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    /// Unique child identifier.
    pub id: String,
    /// Family the child belongs to.
    pub family_id: String,
    /// Display name.
    pub name: String,
    /// Trust level, 1 (most supervised) to 5.
    pub trust_level: u8,
    /// Per-type balances. A missing entry reads as zero.
    #[serde(default)]
    pub star_balances: BTreeMap<StarType, StarBalance>,
    /// Streak counters.
    #[serde(default)]
    pub streaks: Streaks,
}

impl Child {
    /// Create a child with empty balances and streaks.
    pub fn new(
        id: impl Into<String>,
        family_id: impl Into<String>,
        name: impl Into<String>,
        trust_level: u8,
    ) -> Self {
        Self {
            id: id.into(),
            family_id: family_id.into(),
            name: name.into(),
            trust_level,
            star_balances: BTreeMap::new(),
            streaks: Streaks::default(),
        }
    }

    /// Check the profile fields the engine relies on.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(StarError::validation("child id must not be empty"));
        }
        validate_trust_level(self.trust_level)?;
        if self.streaks.current_streak > self.streaks.longest_streak {
            return Err(StarError::validation(format!(
                "child {} has current streak {} above longest streak {}",
                self.id, self.streaks.current_streak, self.streaks.longest_streak
            )));
        }
        Ok(())
    }

    /// Spendable balance for a star type.
    pub fn balance(&self, star_type: StarType) -> u32 {
        self.star_balances
            .get(&star_type)
            .map(|b| b.balance)
            .unwrap_or(0)
    }

    /// Mutable balance entry, created empty with `weekly_limit` if missing.
    pub(crate) fn balance_entry(&mut self, star_type: StarType, weekly_limit: u32) -> &mut StarBalance {
        self.star_balances
            .entry(star_type)
            .or_insert_with(|| StarBalance::empty(weekly_limit))
    }
}

/// Reject trust levels outside 1..=5.
pub fn validate_trust_level(level: u8) -> Result<()> {
    if (MIN_TRUST_LEVEL..=MAX_TRUST_LEVEL).contains(&level) {
        Ok(())
    } else {
        Err(StarError::validation(format!(
            "trust level {} outside {}..={}",
            level, MIN_TRUST_LEVEL, MAX_TRUST_LEVEL
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_child_has_zero_balances() {
        let child = Child::new("kid-1", "fam-1", "Ada", 2);
        assert_eq!(child.balance(StarType::Growth), 0);
        assert_eq!(child.balance(StarType::Fun), 0);
        assert_eq!(child.streaks, Streaks::default());
    }

    #[test]
    fn test_validate_trust_level_bounds() {
        assert!(validate_trust_level(0).is_err());
        assert!(validate_trust_level(1).is_ok());
        assert!(validate_trust_level(5).is_ok());
        assert!(validate_trust_level(6).is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_streaks() {
        let mut child = Child::new("kid-1", "fam-1", "Ada", 3);
        child.streaks.current_streak = 4;
        child.streaks.longest_streak = 2;
        assert!(child.validate().is_err());
    }

    #[test]
    fn test_balance_entry_creates_with_limit() {
        let mut child = Child::new("kid-1", "fam-1", "Ada", 3);
        let entry = child.balance_entry(StarType::Fun, 70);
        assert_eq!(entry.weekly_limit, 70);
        entry.balance = 12;
        assert_eq!(child.balance(StarType::Fun), 12);
    }

    #[test]
    fn test_star_type_parse_and_display() {
        assert_eq!("growth".parse::<StarType>().unwrap(), StarType::Growth);
        assert_eq!("fun".parse::<StarType>().unwrap(), StarType::Fun);
        assert!("gold".parse::<StarType>().is_err());
        assert_eq!(StarType::Growth.to_string(), "growth");
    }

    #[test]
    fn test_child_json_uses_star_type_keys() {
        let mut child = Child::new("kid-1", "fam-1", "Ada", 3);
        child.balance_entry(StarType::Growth, 100).balance = 5;
        let json = serde_json::to_string(&child).unwrap();
        assert!(json.contains("\"growth\""));
        let parsed: Child = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, child);
    }
}
