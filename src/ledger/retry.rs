//! Bounded retry loop for optimistic-concurrency operations.

use crate::error::{Result, StarError};
use crate::storage::{CommitOutcome, HouseholdStore, WriteBatch};

/// Outcome of one read-compute-commit attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T> {
    /// The attempt committed and produced a value.
    Done(T),
    /// Something changed between read and commit; start over.
    Conflict,
}

/// Commit `batch`, yielding `value` if it went through.
pub fn commit_or_retry<S, T>(store: &S, batch: WriteBatch, value: T) -> Result<Attempt<T>>
where
    S: HouseholdStore + ?Sized,
{
    match store.commit(batch)? {
        CommitOutcome::Committed => Ok(Attempt::Done(value)),
        CommitOutcome::Conflict => Ok(Attempt::Conflict),
    }
}

/// Run `attempt` until it commits, at most `max_attempts` times.
///
/// Errors from an attempt end the loop immediately; only conflicts are
/// retried. Each attempt must re-read everything it depends on.
pub fn with_retries<T>(
    operation: &'static str,
    max_attempts: u32,
    mut attempt: impl FnMut() -> Result<Attempt<T>>,
) -> Result<T> {
    let max_attempts = max_attempts.max(1);
    for n in 1..=max_attempts {
        match attempt()? {
            Attempt::Done(value) => return Ok(value),
            Attempt::Conflict => {
                tracing::debug!(operation, attempt = n, "optimistic conflict");
            }
        }
    }
    tracing::warn!(operation, attempts = max_attempts, "retry budget exhausted");
    Err(StarError::ConflictRetryExhausted {
        operation,
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_success() {
        let mut calls = 0;
        let value = with_retries("op", 3, || {
            calls += 1;
            Ok(Attempt::Done(7))
        })
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_retries_until_success() {
        let mut calls = 0;
        let value = with_retries("op", 3, || {
            calls += 1;
            if calls < 3 {
                Ok(Attempt::Conflict)
            } else {
                Ok(Attempt::Done("ok"))
            }
        })
        .unwrap();
        assert_eq!(value, "ok");
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_exhausted_budget() {
        let mut calls = 0;
        let err = with_retries::<()>("debit", 3, || {
            calls += 1;
            Ok(Attempt::Conflict)
        })
        .unwrap_err();
        assert_eq!(calls, 3);
        assert!(matches!(
            err,
            StarError::ConflictRetryExhausted {
                operation: "debit",
                attempts: 3
            }
        ));
    }

    #[test]
    fn test_errors_are_not_retried() {
        let mut calls = 0;
        let err = with_retries::<()>("op", 3, || {
            calls += 1;
            Err(StarError::validation("bad"))
        })
        .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, StarError::Validation { .. }));
    }

    #[test]
    fn test_zero_budget_still_attempts_once() {
        let value = with_retries("op", 0, || Ok(Attempt::Done(1))).unwrap();
        assert_eq!(value, 1);
    }
}
