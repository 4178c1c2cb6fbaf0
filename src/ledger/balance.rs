//! Star ledger: credit, debit and refund of a child's balances.
//!
//! The `apply_*` functions are the only code that changes a balance. They
//! mutate an in-memory child; [`StarLedger`] wraps each in its own
//! read-modify-commit loop, while the workflows call them directly so the
//! balance change lands in the same commit as the record's status change.

use chrono::{Datelike, Duration, NaiveDate};

use crate::config::LedgerConfig;
use crate::core::{Child, StarBalance, StarType};
use crate::error::{Result, StarError};
use crate::ledger::retry::{commit_or_retry, with_retries};
use crate::storage::{HouseholdStore, WriteBatch};

/// Monday of the week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

/// Add earned stars.
///
/// `weekly_earned` rolls over when `today` falls in a later week and is
/// clamped at `weekly_limit`; the balance itself is never clamped.
pub fn apply_credit(
    child: &mut Child,
    star_type: StarType,
    amount: u32,
    today: NaiveDate,
    default_weekly_limit: u32,
) -> Result<StarBalance> {
    let child_id = child.id.clone();
    let entry = child.balance_entry(star_type, default_weekly_limit);

    let balance = entry.balance.checked_add(amount).ok_or_else(|| {
        StarError::validation(format!(
            "crediting {} {} stars would overflow {}'s balance",
            amount, star_type, child_id
        ))
    })?;

    let this_week = week_start(today);
    if entry.week_of.map_or(true, |week| week < this_week) {
        entry.week_of = Some(this_week);
        entry.weekly_earned = 0;
    }

    entry.balance = balance;
    entry.weekly_earned = entry
        .weekly_earned
        .saturating_add(amount)
        .min(entry.weekly_limit);
    Ok(*entry)
}

/// Spend stars, failing if the balance cannot cover `amount`.
pub fn apply_debit(child: &mut Child, star_type: StarType, amount: u32) -> Result<StarBalance> {
    let available = child.balance(star_type);
    if amount > available {
        return Err(StarError::InsufficientBalance {
            child_id: child.id.clone(),
            star_type,
            requested: amount,
            available,
        });
    }
    match child.star_balances.get_mut(&star_type) {
        Some(entry) => {
            entry.balance -= amount;
            Ok(*entry)
        }
        // Only reachable for a zero debit against a missing entry.
        None => Ok(StarBalance::empty(0)),
    }
}

/// Return escrowed stars without counting them as new earnings.
pub fn apply_refund(
    child: &mut Child,
    star_type: StarType,
    amount: u32,
    default_weekly_limit: u32,
) -> Result<StarBalance> {
    let child_id = child.id.clone();
    let entry = child.balance_entry(star_type, default_weekly_limit);
    entry.balance = entry.balance.checked_add(amount).ok_or_else(|| {
        StarError::validation(format!(
            "refunding {} {} stars would overflow {}'s balance",
            amount, star_type, child_id
        ))
    })?;
    Ok(*entry)
}

/// Standalone ledger operations, each one atomic unit against one child.
#[derive(Debug)]
pub struct StarLedger<'a, S: HouseholdStore + ?Sized> {
    store: &'a S,
    config: &'a LedgerConfig,
}

impl<'a, S: HouseholdStore + ?Sized> StarLedger<'a, S> {
    /// Create a ledger over a store.
    pub fn new(store: &'a S, config: &'a LedgerConfig) -> Self {
        Self { store, config }
    }

    /// Credit earned stars.
    pub fn credit(
        &self,
        child_id: &str,
        star_type: StarType,
        amount: u32,
        today: NaiveDate,
    ) -> Result<StarBalance> {
        let limit = self.config.default_weekly_limit;
        self.mutate("credit", child_id, |child| {
            apply_credit(child, star_type, amount, today, limit)
        })
    }

    /// Debit stars against the balance read in the same attempt.
    pub fn debit(&self, child_id: &str, star_type: StarType, amount: u32) -> Result<StarBalance> {
        self.mutate("debit", child_id, |child| apply_debit(child, star_type, amount))
    }

    /// Refund previously debited stars.
    pub fn refund(&self, child_id: &str, star_type: StarType, amount: u32) -> Result<StarBalance> {
        let limit = self.config.default_weekly_limit;
        self.mutate("refund", child_id, |child| {
            apply_refund(child, star_type, amount, limit)
        })
    }

    fn mutate(
        &self,
        operation: &'static str,
        child_id: &str,
        change: impl Fn(&mut Child) -> Result<StarBalance>,
    ) -> Result<StarBalance> {
        let balance = with_retries(operation, self.config.max_attempts, || {
            let current = self
                .store
                .child(child_id)?
                .ok_or_else(|| StarError::not_found("child", child_id))?;
            let mut child = current.value;
            let balance = change(&mut child)?;
            commit_or_retry(
                self.store,
                WriteBatch::new().child(current.version, child),
                balance,
            )
        })?;
        tracing::debug!(operation, child_id, balance = balance.balance, "ledger updated");
        Ok(balance)
    }
}
