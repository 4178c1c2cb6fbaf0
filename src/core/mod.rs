//! Core types for Starboard.
//!
//! This module contains the child aggregate, the task and reward catalog
//! entries, and the request records with their status enums.

pub mod catalog;
pub mod child;
pub mod records;

pub use catalog::{Reward, Task};
pub use child::{
    validate_trust_level, Child, StarBalance, StarType, Streaks, MAX_TRUST_LEVEL,
    MIN_TRUST_LEVEL,
};
pub use records::{
    generate_id, CompletionStatus, CustomRequestStatus, CustomRewardRequest, Decision,
    RedemptionStatus, RewardRedemption, TaskCompletion,
};
