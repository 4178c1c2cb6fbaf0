//! Starboard - household chore and reward engine
//!
//! Starboard keeps each child's star balances and streaks, gates task
//! completions behind a trust-level approval policy, escrows stars when a
//! reward is requested, negotiates prices for custom rewards, and gives
//! parents one queue of everything waiting for a decision.

pub mod cli;
pub mod clock;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod policy;
pub mod storage;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use core::{
    Child, CompletionStatus, CustomRequestStatus, CustomRewardRequest, Decision,
    RedemptionStatus, Reward, RewardRedemption, StarBalance, StarType, Streaks, Task,
    TaskCompletion,
};
pub use engine::{ChildHistory, ReconciliationLine, ReconciliationReport, RewardEngine};
pub use error::{Result, StarError};
pub use ledger::{StarLedger, StreakTracker};
pub use notify::{EngineEvent, JournalNotifier, MemoryNotifier, Notifier, NullNotifier};
pub use policy::{ApprovalRequirement, TrustPolicy};
pub use storage::{FileHouseholdStore, HouseholdStore, MemoryHouseholdStore};
pub use workflow::{
    ApprovalQueue, CompletionGateway, CustomRewardDraft, CustomRewardNegotiation, PendingItem,
    PendingKind, RedemptionWorkflow,
};

// CLI commands
pub use cli::{
    AuditCommand, CatalogCommand, ChildCommand, CustomCommand, DecideCommand, QueueCommand,
    RedeemCommand, SubmitCommand,
};
