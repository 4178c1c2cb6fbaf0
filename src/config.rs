//! Configuration loading for Starboard.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.starboard/config.toml` in cwd or an ancestor)
//! 3. User config (`~/.starboard/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The engine runs with the default trust
//! table and retry budget when no config exists.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StarError};
use crate::policy::ApprovalRequirement;

/// Main configuration struct for Starboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where the household store lives.
    pub data: DataConfig,
    /// Trust level to approval requirement tables.
    pub trust: TrustConfig,
    /// Star ledger behavior.
    pub ledger: LedgerConfig,
    /// Streak day-boundary settings.
    pub streaks: StreakConfig,
    /// Completion submission rules.
    pub completions: CompletionConfig,
    /// Activity journal settings.
    pub journal: JournalConfig,
}

/// Data directory configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding `household.json` and `activity.log`.
    /// Defaults to `<starboard_home>/data`.
    pub dir: Option<PathBuf>,
}

/// Trust policy tables.
///
/// `levels[i]` is the requirement for trust level `i + 1`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrustConfig {
    /// Default table, one entry per trust level 1..=5.
    pub levels: Vec<ApprovalRequirement>,
    /// Per task-category overrides, same shape as `levels`.
    pub categories: HashMap<String, Vec<ApprovalRequirement>>,
}

impl Default for TrustConfig {
    fn default() -> Self {
        use ApprovalRequirement::{Auto, Manual};
        Self {
            levels: vec![Manual, Manual, Auto, Auto, Auto],
            categories: HashMap::new(),
        }
    }
}

/// Star ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Attempts per operation before giving up on optimistic conflicts.
    pub max_attempts: u32,
    /// Weekly earning cap for balances created without one.
    pub default_weekly_limit: u32,
}

/// Minimum valid max_attempts value (one attempt, no retries).
pub const MIN_MAX_ATTEMPTS: u32 = 1;

impl LedgerConfig {
    /// Check if max_attempts is valid (must be >= 1).
    pub fn is_valid_max_attempts(value: u32) -> bool {
        value >= MIN_MAX_ATTEMPTS
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            default_weekly_limit: 100,
        }
    }
}

/// Streak configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreakConfig {
    /// Offset from UTC, in minutes, of the household's calendar day.
    pub utc_offset_minutes: i32,
}

/// Largest accepted UTC offset magnitude (just under a day).
pub const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60 - 1;

impl StreakConfig {
    /// Check if an offset is within a day in either direction.
    pub fn is_valid_offset(value: i32) -> bool {
        value.abs() <= MAX_UTC_OFFSET_MINUTES
    }
}

/// Whether repeated completions of one task on one day are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Every submission creates a completion.
    #[default]
    Allow,
    /// At most one non-rejected completion per task, child and day.
    OncePerDay,
}

/// Valid values for the duplicate policy field.
pub const VALID_DUPLICATE_POLICIES: &[&str] = &["allow", "once_per_day"];

impl DuplicatePolicy {
    /// Parse a policy name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "allow" => Some(Self::Allow),
            "once_per_day" => Some(Self::OncePerDay),
            _ => None,
        }
    }
}

/// Completion submission configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompletionConfig {
    /// Same-day duplicate handling.
    pub duplicate_policy: DuplicatePolicy,
}

/// Activity journal configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JournalConfig {
    /// Whether the CLI appends engine events to `activity.log`.
    pub enabled: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.starboard/config.toml`)
    /// 3. User config (`~/.starboard/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `~/.starboard/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = starboard_home()?;
        let config_path = home.join("config.toml");
        Self::load_optional(&config_path)
    }

    /// Load project config from the nearest `.starboard/config.toml`.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let dir = find_project_dir(cwd)?;
        Self::load_optional(&dir.join("config.toml"))
    }

    /// Load a config file that may legitimately be absent.
    ///
    /// A present but unreadable or invalid file is reported and skipped.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!("ignoring {}: {}", path.display(), err);
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| StarError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| StarError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // STARBOARD_DATA_DIR
        if let Ok(val) = env::var("STARBOARD_DATA_DIR") {
            if val.is_empty() {
                tracing::warn!("STARBOARD_DATA_DIR is empty, ignoring");
            } else {
                self.data.dir = Some(PathBuf::from(val));
            }
        }

        // STARBOARD_MAX_ATTEMPTS
        if let Ok(val) = env::var("STARBOARD_MAX_ATTEMPTS") {
            match val.parse::<u32>() {
                Ok(n) if LedgerConfig::is_valid_max_attempts(n) => self.ledger.max_attempts = n,
                _ => tracing::warn!(
                    "Invalid STARBOARD_MAX_ATTEMPTS value '{}'. Must be >= {}. Using '{}'.",
                    val,
                    MIN_MAX_ATTEMPTS,
                    self.ledger.max_attempts
                ),
            }
        }

        // STARBOARD_WEEKLY_LIMIT
        if let Ok(val) = env::var("STARBOARD_WEEKLY_LIMIT") {
            match val.parse::<u32>() {
                Ok(n) => self.ledger.default_weekly_limit = n,
                Err(_) => tracing::warn!(
                    "Invalid STARBOARD_WEEKLY_LIMIT value '{}'. \
                    Expected a non-negative integer. Using '{}'.",
                    val,
                    self.ledger.default_weekly_limit
                ),
            }
        }

        // STARBOARD_UTC_OFFSET_MINUTES
        if let Ok(val) = env::var("STARBOARD_UTC_OFFSET_MINUTES") {
            match val.parse::<i32>() {
                Ok(n) if StreakConfig::is_valid_offset(n) => self.streaks.utc_offset_minutes = n,
                _ => tracing::warn!(
                    "Invalid STARBOARD_UTC_OFFSET_MINUTES value '{}'. \
                    Must be within +/-{}. Using '{}'.",
                    val,
                    MAX_UTC_OFFSET_MINUTES,
                    self.streaks.utc_offset_minutes
                ),
            }
        }

        // STARBOARD_DUPLICATE_POLICY
        if let Ok(val) = env::var("STARBOARD_DUPLICATE_POLICY") {
            match DuplicatePolicy::parse(&val) {
                Some(policy) => self.completions.duplicate_policy = policy,
                None => tracing::warn!(
                    "Invalid STARBOARD_DUPLICATE_POLICY value '{}'. \
                    Valid values: {:?}. Using '{:?}'.",
                    val,
                    VALID_DUPLICATE_POLICIES,
                    self.completions.duplicate_policy
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence field by field: every value in
    /// `other` that differs from the default replaces the value in `self`.
    ///
    /// # Limitation
    ///
    /// A layer cannot set a value back to its default to override a
    /// non-default value from a lower layer, since "unset" and "explicitly
    /// default" are indistinguishable after deserialization.
    fn merge(mut self, other: Config) -> Self {
        if other.data.dir.is_some() {
            self.data.dir = other.data.dir;
        }

        let default_trust = TrustConfig::default();
        if other.trust.levels != default_trust.levels {
            self.trust.levels = other.trust.levels;
        }
        for (category, table) in other.trust.categories {
            self.trust.categories.insert(category, table);
        }

        let default_ledger = LedgerConfig::default();
        if other.ledger.max_attempts != default_ledger.max_attempts {
            self.ledger.max_attempts = other.ledger.max_attempts;
        }
        if other.ledger.default_weekly_limit != default_ledger.default_weekly_limit {
            self.ledger.default_weekly_limit = other.ledger.default_weekly_limit;
        }

        if other.streaks.utc_offset_minutes != StreakConfig::default().utc_offset_minutes {
            self.streaks.utc_offset_minutes = other.streaks.utc_offset_minutes;
        }

        if other.completions.duplicate_policy != DuplicatePolicy::default() {
            self.completions.duplicate_policy = other.completions.duplicate_policy;
        }

        if other.journal.enabled != JournalConfig::default().enabled {
            self.journal.enabled = other.journal.enabled;
        }

        self
    }

    /// Resolve the data directory.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data
            .dir
            .clone()
            .or_else(|| starboard_home().map(|h| h.join("data")))
    }
}

/// Get the Starboard home directory.
///
/// Checks `STARBOARD_HOME` first, then falls back to `~/.starboard`.
/// An empty `STARBOARD_HOME` is ignored.
pub fn starboard_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("STARBOARD_HOME") {
        if home.is_empty() {
            tracing::warn!("STARBOARD_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("STARBOARD_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    dirs::home_dir().map(|home| home.join(".starboard"))
}

/// Find the nearest `.starboard/` directory at or above `cwd`.
pub fn find_project_dir(cwd: &Path) -> Option<PathBuf> {
    cwd.ancestors()
        .map(|ancestor| ancestor.join(".starboard"))
        .find(|dir| dir.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        for key in [
            "STARBOARD_DATA_DIR",
            "STARBOARD_MAX_ATTEMPTS",
            "STARBOARD_WEEKLY_LIMIT",
            "STARBOARD_UTC_OFFSET_MINUTES",
            "STARBOARD_DUPLICATE_POLICY",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.trust.levels.len(), 5);
        assert_eq!(config.trust.levels[0], ApprovalRequirement::Manual);
        assert_eq!(config.trust.levels[1], ApprovalRequirement::Manual);
        assert_eq!(config.trust.levels[2], ApprovalRequirement::Auto);
        assert_eq!(config.trust.levels[4], ApprovalRequirement::Auto);
        assert!(config.trust.categories.is_empty());

        assert_eq!(config.ledger.max_attempts, 3);
        assert_eq!(config.ledger.default_weekly_limit, 100);
        assert_eq!(config.streaks.utc_offset_minutes, 0);
        assert_eq!(config.completions.duplicate_policy, DuplicatePolicy::Allow);
        assert!(config.journal.enabled);
        assert!(config.data.dir.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let toml_content = r#"
[trust]
levels = ["manual", "manual", "manual", "auto", "auto"]

[trust.categories]
homework = ["manual", "manual", "manual", "manual", "auto"]

[ledger]
max_attempts = 5

[completions]
duplicate_policy = "once_per_day"
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(config.trust.levels[2], ApprovalRequirement::Manual);
        assert_eq!(config.trust.categories["homework"][3], ApprovalRequirement::Manual);
        assert_eq!(config.ledger.max_attempts, 5);
        assert_eq!(config.ledger.default_weekly_limit, 100);
        assert_eq!(
            config.completions.duplicate_policy,
            DuplicatePolicy::OncePerDay
        );
    }

    #[test]
    fn test_load_from_file_missing() {
        let result = Config::load_from_file(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "this is not valid toml [[[").unwrap();

        let result = Config::load_from_file(&config_path);
        assert!(matches!(result, Err(StarError::Config { .. })));
    }

    #[test]
    #[serial]
    fn test_project_config_precedence() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".starboard");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(
            project_dir.join("config.toml"),
            "[ledger]\ndefault_weekly_limit = 40\n",
        )
        .unwrap();

        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::load_from_cwd(&nested);

        assert_eq!(config.ledger.default_weekly_limit, 40);
        assert_eq!(config.ledger.max_attempts, 3);
    }

    #[test]
    #[serial]
    fn test_env_var_precedence() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".starboard");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join("config.toml"), "[ledger]\nmax_attempts = 7\n").unwrap();

        env::set_var("STARBOARD_MAX_ATTEMPTS", "10");
        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.ledger.max_attempts, 10);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        clear_env();
        env::set_var("STARBOARD_DATA_DIR", "/tmp/starboard-data");
        env::set_var("STARBOARD_WEEKLY_LIMIT", "55");
        env::set_var("STARBOARD_UTC_OFFSET_MINUTES", "-300");
        env::set_var("STARBOARD_DUPLICATE_POLICY", "once_per_day");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.data.dir, Some(PathBuf::from("/tmp/starboard-data")));
        assert_eq!(config.ledger.default_weekly_limit, 55);
        assert_eq!(config.streaks.utc_offset_minutes, -300);
        assert_eq!(
            config.completions.duplicate_policy,
            DuplicatePolicy::OncePerDay
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_var_invalid_values_ignored() {
        clear_env();
        env::set_var("STARBOARD_MAX_ATTEMPTS", "0");
        env::set_var("STARBOARD_UTC_OFFSET_MINUTES", "5000");
        env::set_var("STARBOARD_DUPLICATE_POLICY", "sometimes");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.ledger.max_attempts, 3);
        assert_eq!(config.streaks.utc_offset_minutes, 0);
        assert_eq!(config.completions.duplicate_policy, DuplicatePolicy::Allow);

        clear_env();
    }

    #[test]
    fn test_merge_field_by_field() {
        let mut user = Config::default();
        user.ledger.max_attempts = 6;
        user.streaks.utc_offset_minutes = 60;

        let mut project = Config::default();
        project.ledger.default_weekly_limit = 20;
        project
            .trust
            .categories
            .insert("chores".to_string(), vec![ApprovalRequirement::Auto; 5]);

        let merged = Config::default().merge(user).merge(project);

        assert_eq!(merged.ledger.max_attempts, 6);
        assert_eq!(merged.ledger.default_weekly_limit, 20);
        assert_eq!(merged.streaks.utc_offset_minutes, 60);
        assert!(merged.trust.categories.contains_key("chores"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[journal]\nenabled = false\n").unwrap();
        assert!(!config.journal.enabled);
        assert_eq!(config.trust, TrustConfig::default());
    }

    #[test]
    fn test_duplicate_policy_parse() {
        assert_eq!(DuplicatePolicy::parse("allow"), Some(DuplicatePolicy::Allow));
        assert_eq!(
            DuplicatePolicy::parse("once_per_day"),
            Some(DuplicatePolicy::OncePerDay)
        );
        assert_eq!(DuplicatePolicy::parse("never"), None);
    }

    #[test]
    #[serial]
    fn test_starboard_home_with_env() {
        let dir = TempDir::new().unwrap();
        env::set_var("STARBOARD_HOME", dir.path());
        assert_eq!(starboard_home(), Some(dir.path().to_path_buf()));
        env::remove_var("STARBOARD_HOME");
    }

    #[test]
    #[serial]
    fn test_data_dir_defaults_under_home() {
        clear_env();
        let dir = TempDir::new().unwrap();
        env::set_var("STARBOARD_HOME", dir.path());
        let config = Config::default();
        assert_eq!(config.data_dir(), Some(dir.path().join("data")));
        env::remove_var("STARBOARD_HOME");
    }

    #[test]
    fn test_find_project_dir_in_ancestor() {
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".starboard");
        fs::create_dir_all(&project_dir).unwrap();
        let nested = dir.path().join("kids").join("chores");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_dir(&nested), Some(project_dir));
    }
}
