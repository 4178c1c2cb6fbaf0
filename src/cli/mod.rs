//! CLI commands for Starboard.
//!
//! This module provides the CLI commands, organized into:
//! - **Household setup**: child, catalog (profiles, tasks, rewards)
//! - **Child actions**: submit, redeem, custom request
//! - **Parent actions**: queue, decide, custom price
//! - **Audit**: audit (history and ledger reconciliation)
//!
//! Every command returns a serializable output with a `success` flag and
//! renders it as JSON, human-readable text, or nothing.

use serde::Serialize;

use crate::error::exit_codes;

// Household setup
pub mod catalog;
pub mod child;

// Child actions
pub mod custom;
pub mod redeem;
pub mod submit;

// Parent actions
pub mod decide;
pub mod queue;

// Audit
pub mod audit;

pub use audit::AuditCommand;
pub use catalog::CatalogCommand;
pub use child::ChildCommand;
pub use custom::CustomCommand;
pub use decide::DecideCommand;
pub use queue::QueueCommand;
pub use redeem::RedeemCommand;
pub use submit::SubmitCommand;

/// Output options shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// A command result that can be printed and mapped to an exit code.
pub trait CommandOutput: Serialize {
    /// Whether the command succeeded.
    fn succeeded(&self) -> bool;

    /// Whether a failure was a refused request rather than a broken engine.
    fn refused(&self) -> bool;

    /// Human-readable rendering.
    fn format_human_readable(&self) -> String;

    /// Process exit code for this output.
    fn exit_code(&self) -> i32 {
        if self.succeeded() {
            exit_codes::SUCCESS
        } else if self.refused() {
            exit_codes::REFUSED
        } else {
            exit_codes::ERROR
        }
    }
}

/// Format output based on options.
pub fn format_output<O: CommandOutput>(output: &O, options: &OutputOptions) -> String {
    if options.quiet {
        return String::new();
    }

    if options.json {
        serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
    } else {
        output.format_human_readable()
    }
}

/// Failure line shared by the human renderings.
pub(crate) fn failure_line(action: &str, error: Option<&str>) -> String {
    format!("{} failed: {}\n", action, error.unwrap_or("unknown error"))
}
