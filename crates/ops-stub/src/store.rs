//! Ops State & Audit Store
//!
//! File-backed storage for the stub service: a JSON document for the
//! current operations state and a JSONL audit log. Every mutation goes
//! through one mutex so concurrent requests serialize their
//! read-modify-write cycles.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Current operations state: item statuses and the latest hours note.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpsState {
    /// item name -> status ("paused" | "active")
    #[serde(default)]
    pub items: HashMap<String, String>,
    /// Free-text note left by the last hours update.
    #[serde(default)]
    pub hours_note: String,
}

/// File-backed state and audit persistence.
pub struct FileStore {
    state_file: PathBuf,
    audit_file: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Create a store under `data_dir`, creating the directory if needed.
    pub fn new(data_dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        Ok(Self {
            state_file: data_dir.join("ops_state.json"),
            audit_file: data_dir.join("audit.log"),
            lock: Mutex::new(()),
        })
    }

    /// Load the current state. Missing or corrupt files yield the default.
    pub fn load_state(&self) -> OpsState {
        let _guard = self.lock.lock().unwrap();
        self.load_state_unlocked()
    }

    fn load_state_unlocked(&self) -> OpsState {
        match std::fs::read_to_string(&self.state_file) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Corrupt state file, starting fresh: {}", e);
                OpsState::default()
            }),
            Err(_) => OpsState::default(),
        }
    }

    /// Apply a mutation to the state and persist the result, returning the
    /// new state.
    pub fn update_state<F>(&self, mutate: F) -> std::io::Result<OpsState>
    where
        F: FnOnce(&mut OpsState),
    {
        let _guard = self.lock.lock().unwrap();
        let mut state = self.load_state_unlocked();
        mutate(&mut state);
        let json = serde_json::to_string_pretty(&state)?;
        std::fs::write(&self.state_file, json)?;
        Ok(state)
    }

    /// Append one audit entry, stamping it with the current UTC time.
    pub fn append_audit(&self, mut entry: Value) -> std::io::Result<()> {
        let _guard = self.lock.lock().unwrap();
        if let Some(obj) = entry.as_object_mut() {
            obj.insert(
                "ts".to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_file)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }

    /// Read all parseable audit entries in order.
    pub fn read_audit(&self) -> Vec<Value> {
        let _guard = self.lock.lock().unwrap();
        match std::fs::read_to_string(&self.audit_file) {
            Ok(raw) => raw
                .lines()
                .filter_map(|line| serde_json::from_str(line).ok())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}
