//! Streak tracker: consecutive-day counters updated per approved completion.
//!
//! Days are calendar days in the household's UTC offset, not 24-hour
//! windows: a completion at 23:50 and one at 00:10 the next morning are one
//! day apart.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::core::Streaks;
use crate::error::{Result, StarError};
use crate::ledger::retry::{commit_or_retry, with_retries};
use crate::storage::{HouseholdStore, WriteBatch};

/// How a completion changed the current streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakChange {
    /// First completion ever.
    Started,
    /// Same day as the last one (or earlier).
    Unchanged,
    /// The day after the last one.
    Extended,
    /// A gap of two or more days broke the streak.
    Reset,
}

/// Calendar day of `now` at the given offset from UTC.
pub fn calendar_day(now: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
        .unwrap_or_else(|| Utc.fix());
    now.with_timezone(&offset).date_naive()
}

/// Apply one approved completion on `today` to the counters.
///
/// `last_completion_date` is set to `today` on every branch.
pub fn apply_completion(streaks: &mut Streaks, today: NaiveDate) -> StreakChange {
    let change = match streaks.last_completion_date {
        None => {
            streaks.current_streak = 1;
            streaks.longest_streak = streaks.longest_streak.max(1);
            StreakChange::Started
        }
        Some(last) => match (today - last).num_days() {
            1 => {
                streaks.current_streak = streaks.current_streak.saturating_add(1);
                streaks.longest_streak = streaks.longest_streak.max(streaks.current_streak);
                StreakChange::Extended
            }
            delta if delta > 1 => {
                streaks.current_streak = 1;
                StreakChange::Reset
            }
            // Same day, or a backdated decision behind the last one.
            _ => StreakChange::Unchanged,
        },
    };
    streaks.last_completion_date = Some(today);
    change
}

/// Standalone streak updates against the store.
#[derive(Debug)]
pub struct StreakTracker<'a, S: HouseholdStore + ?Sized> {
    store: &'a S,
    max_attempts: u32,
    utc_offset_minutes: i32,
}

impl<'a, S: HouseholdStore + ?Sized> StreakTracker<'a, S> {
    /// Create a tracker over a store.
    pub fn new(store: &'a S, max_attempts: u32, utc_offset_minutes: i32) -> Self {
        Self {
            store,
            max_attempts,
            utc_offset_minutes,
        }
    }

    /// Record one approved completion at `now`.
    ///
    /// Callers guarantee this runs once per completion; it does not
    /// deduplicate.
    pub fn record_completion(&self, child_id: &str, now: DateTime<Utc>) -> Result<Streaks> {
        let today = calendar_day(now, self.utc_offset_minutes);
        with_retries("record_completion", self.max_attempts, || {
            let current = self
                .store
                .child(child_id)?
                .ok_or_else(|| StarError::not_found("child", child_id))?;
            let mut child = current.value;
            let change = apply_completion(&mut child.streaks, today);
            tracing::debug!(child_id, ?change, "streak evaluated");
            let streaks = child.streaks;
            commit_or_retry(
                self.store,
                WriteBatch::new().child(current.version, child),
                streaks,
            )
        })
    }
}
