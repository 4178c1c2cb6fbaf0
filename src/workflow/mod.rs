//! Request workflows: completions, redemptions, custom rewards and the
//! parent approval queue.
//!
//! Each workflow is a short-lived view over a store, borrowed for one
//! operation. Every transition is a single [`WriteBatch`](crate::storage::WriteBatch)
//! commit carrying the record's status change together with any ledger or
//! streak effect, retried from fresh reads on conflict.

pub mod completion;
pub mod custom;
pub mod queue;
pub mod redemption;

pub use completion::{CompletionGateway, COMPLETION_ID_PREFIX};
pub use custom::{CustomRewardDraft, CustomRewardNegotiation, CUSTOM_REQUEST_ID_PREFIX};
pub use queue::{ApprovalQueue, PendingItem, PendingKind};
pub use redemption::{RedemptionWorkflow, REDEMPTION_ID_PREFIX};
