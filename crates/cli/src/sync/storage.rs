// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key-value storage for the queue and cache records.
//!
//! Each key is stored as a single JSON document at `<root>/<key>.json`.
//! Writes go to a sibling temp file that is fsynced and then renamed over
//! the target, so a crash mid-write leaves the previous record intact.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Storage key of the offline action queue.
pub const QUEUE_KEY: &str = "offline_action_queue";

/// Storage key of the cached collections.
pub const CACHE_KEY: &str = "cached_data";

/// Schema version written into both records.
pub const SCHEMA_VERSION: u32 = 1;

/// Field carrying the schema version of a record.
pub const SCHEMA_VERSION_FIELD: &str = "schema_version";

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The record was written by a newer build.
    #[error("'{key}' has schema version {found}, newer than supported version {supported}\n  hint: upgrade fitsync, or run `fitsync reset` to discard local state")]
    UnsupportedSchema { key: String, found: u64, supported: u32 },
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A directory holding the persisted sync state.
#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StateDir { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Reads the record stored under `key`, or `None` if there is none.
    pub fn read(&self, key: &str) -> StoreResult<Option<Value>> {
        let bytes = match fs::read(self.path_for(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Atomically replaces the record stored under `key`.
    pub fn write(&self, key: &str, value: &Value) -> StoreResult<()> {
        fs::create_dir_all(&self.root)?;

        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(value)?;

        let result = write_synced(&temp_path, &json).and_then(|()| fs::rename(&temp_path, &path));
        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    /// Removes the record stored under `key`. A missing record is not an error.
    pub fn remove(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Size in bytes of the record stored under `key`, or 0 if missing.
    pub fn size(&self, key: &str) -> u64 {
        fs::metadata(self.path_for(key)).map(|m| m.len()).unwrap_or(0)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Returns the schema version of a stored record.
///
/// Records without a version field predate versioning and are version 0.
/// Versions newer than [`SCHEMA_VERSION`] are refused.
pub fn schema_version(key: &str, record: &Value) -> StoreResult<u64> {
    let found = record.get(SCHEMA_VERSION_FIELD).and_then(Value::as_u64).unwrap_or(0);
    if found > u64::from(SCHEMA_VERSION) {
        return Err(StoreError::UnsupportedSchema {
            key: key.to_string(),
            found,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(found)
}
