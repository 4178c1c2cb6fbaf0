//! Household storage for Starboard.
//!
//! This module provides versioned, optimistic-concurrency storage for the
//! child aggregate, the catalogs and the request records, with file-based
//! and in-memory backends.

pub mod file;
pub mod memory;
pub mod state;
pub mod traits;

pub use file::FileHouseholdStore;
pub use memory::MemoryHouseholdStore;
pub use state::{CommitOutcome, HouseholdState, RecordQuery, Versioned, Write, WriteBatch};
pub use traits::HouseholdStore;
