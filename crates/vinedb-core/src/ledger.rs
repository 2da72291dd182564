//! Progress ledger: the durable record of which entities a scrape run has
//! handled, so an interrupted run can resume.
//!
//! The ledger is the sole source of truth for "has this entity been handled".
//! `processed`, `updated`, and `skipped` are terminal; `failed` entities are
//! retried on the next run. The on-disk format is a JSON document:
//!
//! ```json
//! {
//!   "processedIds": ["wine:opus-one-2019"],
//!   "failedIds": [{ "id": "wine:overture", "reason": "no candidate matched" }],
//!   "updatedIds": [],
//!   "skippedIds": [],
//!   "lastUpdate": "2026-10-18T09:30:00Z"
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger file {path} is not valid JSON: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("ledger lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub id: String,
    pub reason: String,
}

/// Terminal result of processing one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome {
    /// A new catalog record was created.
    Processed,
    /// An existing catalog record was patched.
    Updated,
    /// Nothing to do: already complete, or the match added nothing new.
    Skipped,
    Failed(String),
}

/// Where an entity currently stands in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerStatus {
    Pending,
    Processed,
    Updated,
    Skipped,
    Failed { reason: String },
}

impl LedgerStatus {
    /// `true` for states a resumed run must not reprocess.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LedgerStatus::Processed | LedgerStatus::Updated | LedgerStatus::Skipped
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    #[serde(default)]
    pub processed_ids: Vec<String>,
    #[serde(default)]
    pub failed_ids: Vec<FailedEntry>,
    #[serde(default)]
    pub updated_ids: Vec<String>,
    #[serde(default)]
    pub skipped_ids: Vec<String>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

impl LedgerState {
    #[must_use]
    pub fn status(&self, id: &str) -> LedgerStatus {
        if self.updated_ids.iter().any(|x| x == id) {
            LedgerStatus::Updated
        } else if self.processed_ids.iter().any(|x| x == id) {
            LedgerStatus::Processed
        } else if self.skipped_ids.iter().any(|x| x == id) {
            LedgerStatus::Skipped
        } else if let Some(entry) = self.failed_ids.iter().find(|e| e.id == id) {
            LedgerStatus::Failed {
                reason: entry.reason.clone(),
            }
        } else {
            LedgerStatus::Pending
        }
    }

    /// Removes `id` from the failed list ahead of a retry and returns the
    /// previous reason, so a repeat failure is recorded fresh.
    pub fn begin_retry(&mut self, id: &str) -> Option<String> {
        let pos = self.failed_ids.iter().position(|e| e.id == id)?;
        Some(self.failed_ids.remove(pos).reason)
    }

    /// Records the outcome for `id`, replacing any earlier entry for it.
    pub fn record(&mut self, id: &str, outcome: LedgerOutcome) {
        self.forget(id);
        match outcome {
            LedgerOutcome::Processed => self.processed_ids.push(id.to_string()),
            LedgerOutcome::Updated => self.updated_ids.push(id.to_string()),
            LedgerOutcome::Skipped => self.skipped_ids.push(id.to_string()),
            LedgerOutcome::Failed(reason) => self.failed_ids.push(FailedEntry {
                id: id.to_string(),
                reason,
            }),
        }
        self.last_update = Some(Utc::now());
    }

    /// Clears every entry; the explicit reset.
    pub fn reset(&mut self) {
        *self = LedgerState {
            last_update: Some(Utc::now()),
            ..LedgerState::default()
        };
    }

    fn forget(&mut self, id: &str) {
        self.processed_ids.retain(|x| x != id);
        self.updated_ids.retain(|x| x != id);
        self.skipped_ids.retain(|x| x != id);
        self.failed_ids.retain(|e| e.id != id);
    }
}

/// Persistence for [`LedgerState`].
///
/// Callers save after every entity, so an implementation must make each
/// `save` durable on its own.
pub trait LedgerStore {
    /// Loads the current state; a store with nothing saved yet yields the
    /// empty state.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the backing storage cannot be read.
    fn load(&self) -> Result<LedgerState, LedgerError>;

    /// Persists `state`, replacing whatever was stored.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the backing storage cannot be written.
    fn save(&self, state: &LedgerState) -> Result<(), LedgerError>;
}

/// JSON-file ledger. Writes go to a sibling temp file and are renamed into
/// place so a crash mid-write never leaves a truncated ledger.
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    path: PathBuf,
}

impl FileLedgerStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl LedgerStore for FileLedgerStore {
    fn load(&self) -> Result<LedgerState, LedgerError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LedgerState::default())
            }
            Err(e) => return Err(self.io_err(e)),
        };
        if content.trim().is_empty() {
            return Ok(LedgerState::default());
        }
        serde_json::from_str(&content).map_err(|source| LedgerError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn save(&self, state: &LedgerState) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let body = serde_json::to_string_pretty(state).map_err(|source| LedgerError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))
    }
}

/// In-memory ledger for tests and dry runs. Counts saves so callers can
/// check per-entity persistence.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: Mutex<LedgerState>,
    saves: AtomicUsize,
}

impl MemoryLedgerStore {
    #[must_use]
    pub fn with_state(state: LedgerState) -> Self {
        Self {
            state: Mutex::new(state),
            saves: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self) -> Result<LedgerState, LedgerError> {
        self.state
            .lock()
            .map(|s| s.clone())
            .map_err(|_| LedgerError::Poisoned)
    }

    fn save(&self, state: &LedgerState) -> Result<(), LedgerError> {
        let mut guard = self.state.lock().map_err(|_| LedgerError::Poisoned)?;
        guard.clone_from(state);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_moves_entity_between_lists() {
        let mut state = LedgerState::default();
        state.record("wine:a", LedgerOutcome::Failed("timeout".to_string()));
        assert_eq!(
            state.status("wine:a"),
            LedgerStatus::Failed {
                reason: "timeout".to_string()
            }
        );
        state.record("wine:a", LedgerOutcome::Updated);
        assert_eq!(state.status("wine:a"), LedgerStatus::Updated);
        assert!(state.failed_ids.is_empty());
        assert!(state.last_update.is_some());
    }

    #[test]
    fn terminal_states() {
        assert!(LedgerStatus::Processed.is_terminal());
        assert!(LedgerStatus::Updated.is_terminal());
        assert!(LedgerStatus::Skipped.is_terminal());
        assert!(!LedgerStatus::Pending.is_terminal());
        assert!(!LedgerStatus::Failed {
            reason: String::new()
        }
        .is_terminal());
    }

    #[test]
    fn begin_retry_promotes_out_of_failed() {
        let mut state = LedgerState::default();
        state.record("wine:y", LedgerOutcome::Failed("first".to_string()));
        assert_eq!(state.begin_retry("wine:y").as_deref(), Some("first"));
        assert_eq!(state.status("wine:y"), LedgerStatus::Pending);
        state.record("wine:y", LedgerOutcome::Failed("second".to_string()));
        assert_eq!(state.failed_ids.len(), 1);
        assert_eq!(state.failed_ids[0].reason, "second");
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = LedgerState::default();
        state.record("a", LedgerOutcome::Processed);
        state.record("b", LedgerOutcome::Skipped);
        state.reset();
        assert_eq!(state.status("a"), LedgerStatus::Pending);
        assert!(state.skipped_ids.is_empty());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let mut state = LedgerState::default();
        state.record("wine:x", LedgerOutcome::Failed("no match".to_string()));
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("processedIds").is_some());
        assert_eq!(json["failedIds"][0]["id"], "wine:x");
        assert_eq!(json["failedIds"][0]["reason"], "no match");
        assert!(json.get("lastUpdate").is_some());
    }

    #[test]
    fn file_store_round_trips_and_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLedgerStore::new(dir.path().join("nested/progress.json"));
        assert_eq!(store.load().unwrap(), LedgerState::default());

        let mut state = LedgerState::default();
        state.record("winery:opus-one", LedgerOutcome::Processed);
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.status("winery:opus-one"), LedgerStatus::Processed);
        assert!(!dir.path().join("nested/progress.json.tmp").exists());
    }

    #[test]
    fn file_store_reports_corrupt_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = FileLedgerStore::new(&path).load().unwrap_err();
        assert!(matches!(err, LedgerError::Corrupt { .. }));
    }

    #[test]
    fn file_store_reads_partial_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, r#"{"updatedIds": ["wine:a"]}"#).unwrap();
        let state = FileLedgerStore::new(&path).load().unwrap();
        assert_eq!(state.status("wine:a"), LedgerStatus::Updated);
    }

    #[test]
    fn memory_store_counts_saves() {
        let store = MemoryLedgerStore::default();
        let mut state = store.load().unwrap();
        state.record("a", LedgerOutcome::Skipped);
        store.save(&state).unwrap();
        store.save(&state).unwrap();
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.load().unwrap().status("a"), LedgerStatus::Skipped);
    }
}
