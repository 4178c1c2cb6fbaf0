//! File-based household storage for Starboard.
//!
//! The whole household is one JSON document (`household.json`) in the data
//! directory. Atomic writes are achieved via temp file + rename, so readers
//! never see a half-written document. Writers serialize through an
//! in-process mutex plus a lock file, and re-check record versions against
//! the document on disk under that lock.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, SystemTime};

use crate::config::Config;
use crate::core::{Child, CustomRewardRequest, Reward, RewardRedemption, Task, TaskCompletion};
use crate::error::{Result, StarError};
use crate::storage::state::{CommitOutcome, HouseholdState, RecordQuery, Versioned, WriteBatch};
use crate::storage::HouseholdStore;

/// Name of the household document inside the data directory.
pub const HOUSEHOLD_FILE: &str = "household.json";

const LOCK_FILE: &str = ".household.lock";
const TEMP_FILE: &str = ".household.json.tmp";

/// How long to wait for another writer before giving up.
const LOCK_WAIT: Duration = Duration::from_secs(5);
const LOCK_POLL: Duration = Duration::from_millis(10);

/// Lock files older than this are assumed to belong to a crashed writer.
const STALE_LOCK_AGE: Duration = Duration::from_secs(30);

/// File-based household storage.
#[derive(Debug)]
pub struct FileHouseholdStore {
    /// Directory holding the household document.
    data_dir: PathBuf,
    /// Serializes writers within this process.
    writer: Mutex<()>,
}

impl FileHouseholdStore {
    /// Create a store in the configured data directory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let dir = config.data_dir().ok_or_else(|| {
            StarError::config("Could not determine data directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a store in a custom directory, creating it if needed.
    pub fn with_dir(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).map_err(|e| StarError::storage(&data_dir, e))?;
        }

        Ok(Self {
            data_dir,
            writer: Mutex::new(()),
        })
    }

    /// Directory holding the household document.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn document_path(&self) -> PathBuf {
        self.data_dir.join(HOUSEHOLD_FILE)
    }

    /// Read the current document. A missing file is an empty household.
    fn load(&self) -> Result<HouseholdState> {
        let path = self.document_path();
        match fs::read_to_string(&path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HouseholdState::default()),
            Err(e) => Err(StarError::storage(&path, e)),
        }
    }

    /// Write the document atomically using temp file + rename.
    fn atomic_write(&self, state: &HouseholdState) -> Result<()> {
        let final_path = self.document_path();
        let temp_path = self.data_dir.join(TEMP_FILE);

        let json = serde_json::to_string_pretty(state)?;

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| StarError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| StarError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| StarError::storage(&temp_path, e))?;
        }

        fs::rename(&temp_path, &final_path).map_err(|e| StarError::storage(&final_path, e))?;

        Ok(())
    }

    /// Run `f` on the document with exclusive write access, saving it when
    /// `f` reports a change.
    fn with_exclusive<T>(
        &self,
        f: impl FnOnce(&mut HouseholdState) -> Result<(T, bool)>,
    ) -> Result<T> {
        let _local = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _lock = LockFile::acquire(self.data_dir.join(LOCK_FILE))?;

        let mut state = self.load()?;
        let (value, changed) = f(&mut state)?;
        if changed {
            self.atomic_write(&state)?;
        }
        Ok(value)
    }
}

impl HouseholdStore for FileHouseholdStore {
    fn child(&self, id: &str) -> Result<Option<Versioned<Child>>> {
        Ok(self.load()?.children.remove(id))
    }

    fn children(&self, family_id: &str) -> Result<Vec<Child>> {
        Ok(self.load()?.children_of(family_id))
    }

    fn task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.load()?.tasks.remove(id))
    }

    fn reward(&self, id: &str) -> Result<Option<Reward>> {
        Ok(self.load()?.rewards.remove(id))
    }

    fn completion(&self, id: &str) -> Result<Option<Versioned<TaskCompletion>>> {
        Ok(self.load()?.completions.remove(id))
    }

    fn completions(&self, query: &RecordQuery) -> Result<Vec<TaskCompletion>> {
        Ok(self.load()?.query_completions(query))
    }

    fn redemption(&self, id: &str) -> Result<Option<Versioned<RewardRedemption>>> {
        Ok(self.load()?.redemptions.remove(id))
    }

    fn redemptions(&self, query: &RecordQuery) -> Result<Vec<RewardRedemption>> {
        Ok(self.load()?.query_redemptions(query))
    }

    fn custom_request(&self, id: &str) -> Result<Option<Versioned<CustomRewardRequest>>> {
        Ok(self.load()?.custom_requests.remove(id))
    }

    fn custom_requests(&self, query: &RecordQuery) -> Result<Vec<CustomRewardRequest>> {
        Ok(self.load()?.query_custom_requests(query))
    }

    fn register_child(&self, child: &Child) -> Result<()> {
        self.with_exclusive(|state| state.register_child(child).map(|()| ((), true)))
    }

    fn put_task(&self, task: &Task) -> Result<()> {
        self.with_exclusive(|state| {
            state.tasks.insert(task.id.clone(), task.clone());
            Ok(((), true))
        })
    }

    fn put_reward(&self, reward: &Reward) -> Result<()> {
        self.with_exclusive(|state| {
            state.rewards.insert(reward.id.clone(), reward.clone());
            Ok(((), true))
        })
    }

    fn commit(&self, batch: WriteBatch) -> Result<CommitOutcome> {
        self.with_exclusive(|state| {
            let outcome = state.apply(batch);
            Ok((outcome, outcome == CommitOutcome::Committed))
        })
    }
}

/// Cross-process writer lock, released on drop.
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    fn acquire(path: PathBuf) -> Result<Self> {
        let started = SystemTime::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if is_stale(&path) {
                        tracing::warn!("removing stale lock file {}", path.display());
                        let _ = fs::remove_file(&path);
                        continue;
                    }
                    let waited = started.elapsed().unwrap_or_default();
                    if waited >= LOCK_WAIT {
                        return Err(StarError::storage(
                            &path,
                            io::Error::new(
                                io::ErrorKind::WouldBlock,
                                "timed out waiting for another writer",
                            ),
                        ));
                    }
                    thread::sleep(LOCK_POLL);
                }
                Err(e) => return Err(StarError::storage(&path, e)),
            }
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age > STALE_LOCK_AGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StarType;
    use crate::storage::traits::tests::test_household_store_contract;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_store() -> (FileHouseholdStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileHouseholdStore::with_dir(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn test_file_store_contract() {
        let (store, _dir) = create_test_store();
        test_household_store_contract(&store);
    }

    #[test]
    fn test_with_dir_creates_directory() {
        let dir = TempDir::new().unwrap();
        let data_path = dir.path().join("data");

        assert!(!data_path.exists());
        let _store = FileHouseholdStore::with_dir(&data_path).unwrap();
        assert!(data_path.is_dir());
    }

    #[test]
    fn test_missing_document_is_empty_household() {
        let (store, _dir) = create_test_store();
        assert!(store.children("fam").unwrap().is_empty());
        assert!(store.child("kid-1").unwrap().is_none());
    }

    #[test]
    fn test_state_survives_reopen() {
        let (store, dir) = create_test_store();
        store
            .register_child(&Child::new("kid-1", "fam", "Ada", 4))
            .unwrap();
        store
            .put_task(&Task::new("t1", "fam", "Dishes", 10, StarType::Growth))
            .unwrap();

        let reopened = FileHouseholdStore::with_dir(dir.path()).unwrap();
        assert_eq!(
            reopened.child("kid-1").unwrap().unwrap().value.trust_level,
            4
        );
        assert_eq!(reopened.task("t1").unwrap().unwrap().title, "Dishes");
    }

    #[test]
    fn test_conflict_leaves_document_untouched() {
        let (store, _dir) = create_test_store();
        store
            .register_child(&Child::new("kid-1", "fam", "Ada", 4))
            .unwrap();
        let before = fs::read_to_string(store.document_path()).unwrap();

        let child = store.child("kid-1").unwrap().unwrap().value;
        let outcome = store.commit(WriteBatch::new().child(9, child)).unwrap();

        assert_eq!(outcome, CommitOutcome::Conflict);
        assert_eq!(fs::read_to_string(store.document_path()).unwrap(), before);
    }

    #[test]
    fn test_lock_and_temp_files_cleaned_up() {
        let (store, dir) = create_test_store();
        store
            .register_child(&Child::new("kid-1", "fam", "Ada", 4))
            .unwrap();

        assert!(!dir.path().join(LOCK_FILE).exists());
        assert!(!dir.path().join(TEMP_FILE).exists());
    }

    #[test]
    fn test_invalid_document_is_serde_error() {
        let (store, dir) = create_test_store();
        fs::write(dir.path().join(HOUSEHOLD_FILE), "not valid json").unwrap();

        let result = store.child("kid-1");
        assert!(matches!(result, Err(StarError::Serde { .. })));
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let (store, dir) = create_test_store();
        let lock_path = dir.path().join(LOCK_FILE);
        fs::write(&lock_path, "").unwrap();
        let old = SystemTime::now() - Duration::from_secs(120);
        fs::File::options()
            .write(true)
            .open(&lock_path)
            .unwrap()
            .set_modified(old)
            .unwrap();

        store
            .register_child(&Child::new("kid-1", "fam", "Ada", 4))
            .unwrap();
        assert!(store.child("kid-1").unwrap().is_some());
    }

    #[test]
    fn test_concurrent_registrations_all_persist() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileHouseholdStore::with_dir(dir.path()).unwrap());

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .register_child(&Child::new(format!("kid-{}", i), "fam", "Kid", 3))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.children("fam").unwrap().len(), 6);
    }
}
