//! The per-child ledger: star balances and streak counters.
//!
//! All mutation of a child's balances and streaks goes through this module.

pub mod balance;
pub mod retry;
pub mod streak;

pub use balance::{apply_credit, apply_debit, apply_refund, week_start, StarLedger};
pub use retry::{commit_or_retry, with_retries, Attempt};
pub use streak::{apply_completion, calendar_day, StreakChange, StreakTracker};
