//! Notification port for committed state changes.
//!
//! The engine hands every successful transition to a [`Notifier`] after the
//! commit. Delivery is best effort: a failing notifier is logged and never
//! undoes or blocks the transition. The journal notifier writes an
//! append-only JSONL activity log (`activity.log`).

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{
    CompletionStatus, CustomRequestStatus, RedemptionStatus, StarType,
};
use crate::error::{Result, StarError};

/// Schema version for journal entries.
pub const JOURNAL_SCHEMA_VERSION: u8 = 1;

/// Name of the activity journal inside the data directory.
pub const JOURNAL_FILE: &str = "activity.log";

/// A committed state change observers may care about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A child submitted a task completion.
    CompletionSubmitted {
        completion_id: String,
        family_id: String,
        child_id: String,
        task_id: String,
        star_type: StarType,
        stars: u32,
        status: CompletionStatus,
    },

    /// A parent decided a pending completion.
    CompletionDecided {
        completion_id: String,
        family_id: String,
        child_id: String,
        status: CompletionStatus,
    },

    /// A child requested a catalog reward; stars are escrowed.
    RedemptionRequested {
        redemption_id: String,
        family_id: String,
        child_id: String,
        reward_id: String,
        star_type: StarType,
        stars: u32,
        status: RedemptionStatus,
    },

    /// A parent decided a pending redemption.
    RedemptionDecided {
        redemption_id: String,
        family_id: String,
        child_id: String,
        status: RedemptionStatus,
    },

    /// A child asked for a custom reward.
    CustomRequestSubmitted {
        request_id: String,
        family_id: String,
        child_id: String,
        reward_name: String,
    },

    /// A parent priced a custom reward request.
    CustomRequestPriced {
        request_id: String,
        family_id: String,
        child_id: String,
        stars: u32,
    },

    /// A parent decided a priced custom reward request.
    CustomRequestDecided {
        request_id: String,
        family_id: String,
        child_id: String,
        status: CustomRequestStatus,
    },
}

impl EngineEvent {
    /// Family the event belongs to.
    pub fn family_id(&self) -> &str {
        match self {
            EngineEvent::CompletionSubmitted { family_id, .. }
            | EngineEvent::CompletionDecided { family_id, .. }
            | EngineEvent::RedemptionRequested { family_id, .. }
            | EngineEvent::RedemptionDecided { family_id, .. }
            | EngineEvent::CustomRequestSubmitted { family_id, .. }
            | EngineEvent::CustomRequestPriced { family_id, .. }
            | EngineEvent::CustomRequestDecided { family_id, .. } => family_id,
        }
    }
}

/// Receives committed state changes.
pub trait Notifier: Send + Sync {
    /// Deliver one event.
    fn notify(&self, event: &EngineEvent) -> Result<()>;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &EngineEvent) -> Result<()> {
        Ok(())
    }
}

/// An absent notifier discards events.
impl<N: Notifier> Notifier for Option<N> {
    fn notify(&self, event: &EngineEvent) -> Result<()> {
        match self {
            Some(inner) => inner.notify(event),
            None => Ok(()),
        }
    }
}

/// Keeps events in memory, mainly for tests and in-process observers.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    events: Mutex<Vec<EngineEvent>>,
}

impl MemoryNotifier {
    /// Create an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, event: &EngineEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

/// One line of the activity journal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    /// Schema version for forward compatibility.
    pub v: u8,
    /// When the entry was written.
    pub ts: DateTime<Utc>,
    /// The event itself.
    #[serde(flatten)]
    pub event: EngineEvent,
}

/// Appends events to a JSONL activity journal.
#[derive(Debug, Clone)]
pub struct JournalNotifier {
    path: PathBuf,
}

impl JournalNotifier {
    /// Create a journal writing to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a journal in a data directory.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(JOURNAL_FILE))
    }

    /// Read every entry back, oldest first.
    pub fn read_all(&self) -> Result<Vec<JournalEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| StarError::storage(&self.path, e))?;

        let mut entries = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: JournalEntry = serde_json::from_str(line).map_err(|e| {
                StarError::serde(format!(
                    "Failed to parse journal entry on line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            entries.push(entry);
        }

        Ok(entries)
    }
}

impl Notifier for JournalNotifier {
    fn notify(&self, event: &EngineEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StarError::storage(parent, e))?;
        }

        let entry = JournalEntry {
            v: JOURNAL_SCHEMA_VERSION,
            ts: Utc::now(),
            event: event.clone(),
        };
        let json = serde_json::to_string(&entry)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StarError::storage(&self.path, e))?;
        writeln!(file, "{}", json).map_err(|e| StarError::storage(&self.path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn priced() -> EngineEvent {
        EngineEvent::CustomRequestPriced {
            request_id: "cst_1".to_string(),
            family_id: "fam".to_string(),
            child_id: "kid-1".to_string(),
            stars: 50,
        }
    }

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_string(&priced()).unwrap();
        assert!(json.contains("\"event\":\"custom_request_priced\""));
        assert!(json.contains("\"stars\":50"));
    }

    #[test]
    fn test_family_id() {
        assert_eq!(priced().family_id(), "fam");
    }

    #[test]
    fn test_memory_notifier_records() {
        let notifier = MemoryNotifier::new();
        notifier.notify(&priced()).unwrap();
        assert_eq!(notifier.events(), vec![priced()]);
    }

    #[test]
    fn test_optional_notifier() {
        let absent: Option<MemoryNotifier> = None;
        assert!(absent.notify(&priced()).is_ok());

        let present = Some(MemoryNotifier::new());
        present.notify(&priced()).unwrap();
        assert_eq!(present.as_ref().map(|n| n.events().len()), Some(1));
    }

    #[test]
    fn test_journal_append_and_read() {
        let dir = TempDir::new().unwrap();
        let journal = JournalNotifier::in_dir(&dir.path().join("nested"));

        journal.notify(&priced()).unwrap();
        journal
            .notify(&EngineEvent::CompletionDecided {
                completion_id: "cmp_1".to_string(),
                family_id: "fam".to_string(),
                child_id: "kid-1".to_string(),
                status: CompletionStatus::Approved,
            })
            .unwrap();

        let entries = journal.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].v, JOURNAL_SCHEMA_VERSION);
        assert_eq!(entries[0].event, priced());
    }

    #[test]
    fn test_journal_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let journal = JournalNotifier::in_dir(dir.path());
        assert!(journal.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_journal_invalid_line_reports_line_number() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(JOURNAL_FILE);
        fs::write(&path, "\n{not json}\n").unwrap();

        let err = JournalNotifier::new(&path).read_all().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
