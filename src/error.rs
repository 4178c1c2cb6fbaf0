//! Unified error types for Starboard.
//!
//! Domain failures (a rejected request, an already-decided record, a
//! contended ledger) are ordinary typed outcomes the caller maps to a user
//! message. Infrastructure failures (storage, serialization, config) are
//! kept separate so the CLI can tell "your request was refused" apart from
//! "the engine could not run".

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::StarType;

/// The main error type for Starboard operations.
#[derive(Error, Debug)]
pub enum StarError {
    /// Malformed input, e.g. a non-positive custom price.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Task catalog lookup failed, or the task is inactive or unassigned.
    #[error("invalid task {task_id}: {reason}")]
    InvalidTask { task_id: String, reason: String },

    /// Reward catalog lookup failed, or the reward is inactive.
    #[error("invalid reward {reward_id}: {reason}")]
    InvalidReward { reward_id: String, reason: String },

    /// A debit exceeds the balance read inside the same transaction.
    #[error(
        "insufficient {star_type} balance for {child_id}: requested {requested}, available {available}"
    )]
    InsufficientBalance {
        child_id: String,
        star_type: StarType,
        requested: u32,
        available: u32,
    },

    /// A transition was attempted on a record that is no longer awaiting it.
    #[error("{kind} {id} already processed (status: {status})")]
    AlreadyProcessed {
        kind: &'static str,
        id: String,
        status: String,
    },

    /// Unknown child, completion, redemption or custom request id.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Optimistic-concurrency conflicts exceeded the retry budget.
    #[error("{operation} gave up after {attempts} conflicting attempts")]
    ConflictRetryExhausted {
        operation: &'static str,
        attempts: u32,
    },

    /// I/O errors from store file operations.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for Starboard operations.
pub type Result<T> = std::result::Result<T, StarError>;

impl StarError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an invalid task error.
    pub fn invalid_task(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTask {
            task_id: task_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid reward error.
    pub fn invalid_reward(reward_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReward {
            reward_id: reward_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an already processed error.
    pub fn already_processed(
        kind: &'static str,
        id: impl Into<String>,
        status: impl ToString,
    ) -> Self {
        Self::AlreadyProcessed {
            kind,
            id: id.into(),
            status: status.to_string(),
        }
    }

    /// Create a not found error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error is one of the fixed domain outcomes.
    ///
    /// Everything else is an infrastructure failure.
    pub fn is_domain(&self) -> bool {
        match self {
            Self::Validation { .. }
            | Self::InvalidTask { .. }
            | Self::InvalidReward { .. }
            | Self::InsufficientBalance { .. }
            | Self::AlreadyProcessed { .. }
            | Self::NotFound { .. }
            | Self::ConflictRetryExhausted { .. } => true,
            Self::Storage { .. } | Self::Serde { .. } | Self::Config { .. } => false,
        }
    }
}

impl From<io::Error> for StarError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for StarError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Used for side effects that must never undo or block a committed
/// transition, such as writing to the activity journal: log the error and
/// carry on with a safe value.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the Starboard CLI.
pub mod exit_codes {
    /// The operation succeeded.
    pub const SUCCESS: i32 = 0;

    /// The engine could not run (storage, config, serialization).
    pub const ERROR: i32 = 1;

    /// The request was refused with a domain error.
    pub const REFUSED: i32 = 2;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = StarError::validation("price must be at least 1");
        assert_eq!(err.to_string(), "validation error: price must be at least 1");
    }

    #[test]
    fn test_insufficient_balance_display() {
        let err = StarError::InsufficientBalance {
            child_id: "kid-1".to_string(),
            star_type: StarType::Growth,
            requested: 20,
            available: 15,
        };
        assert_eq!(
            err.to_string(),
            "insufficient growth balance for kid-1: requested 20, available 15"
        );
    }

    #[test]
    fn test_already_processed_display() {
        let err = StarError::already_processed("completion", "cmp_1", "approved");
        assert_eq!(
            err.to_string(),
            "completion cmp_1 already processed (status: approved)"
        );
    }

    #[test]
    fn test_not_found_display() {
        let err = StarError::not_found("child", "ghost");
        assert_eq!(err.to_string(), "child not found: ghost");
    }

    #[test]
    fn test_conflict_display() {
        let err = StarError::ConflictRetryExhausted {
            operation: "debit",
            attempts: 3,
        };
        assert_eq!(err.to_string(), "debit gave up after 3 conflicting attempts");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StarError::storage(
            "/tmp/household.json",
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        );
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("/tmp/household.json"));
    }

    #[test]
    fn test_is_domain() {
        assert!(StarError::validation("x").is_domain());
        assert!(StarError::invalid_task("t", "inactive").is_domain());
        assert!(StarError::invalid_reward("r", "inactive").is_domain());
        assert!(StarError::not_found("child", "c").is_domain());
        assert!(!StarError::config("bad toml").is_domain());
        assert!(!StarError::serde("bad json").is_domain());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: StarError = io_err.into();
        assert!(matches!(err, StarError::Storage { .. }));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: StarError = json_err.into();
        assert!(matches!(err, StarError::Serde { .. }));
    }

    #[test]
    fn test_fail_open_default() {
        let result: Result<Vec<String>> = Err(StarError::serde("test"));
        assert!(result.fail_open_default("test context").is_empty());
    }

    #[test]
    fn test_fail_open_with() {
        let result: Result<i32> = Err(StarError::serde("test"));
        assert_eq!(result.fail_open_with("test context", 42), 42);
    }

    #[test]
    fn test_fail_open_success() {
        let result: Result<i32> = Ok(100);
        assert_eq!(result.fail_open_default("test context"), 100);
    }
}
