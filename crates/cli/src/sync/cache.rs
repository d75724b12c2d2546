// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local snapshot of the domain collections.
//!
//! Reads never touch the network and always return the most recently
//! applied value, optimistic or confirmed. Every write persists the whole
//! snapshot atomically before returning; if persisting fails the in-memory
//! snapshot is left unchanged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use fitsync_core::Collection;

use super::storage::{schema_version, StateDir, StoreError, StoreResult, CACHE_KEY, SCHEMA_VERSION};

/// Field holding a record's id within a list collection.
pub const ID_FIELD: &str = "id";

/// Persisted form of the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct CacheRecord {
    schema_version: u32,
    #[serde(default)]
    collections: BTreeMap<Collection, Value>,
    #[serde(default)]
    last_sync: Option<DateTime<Utc>>,
}

/// Durable, crash-consistent snapshot of cached collections.
pub struct CacheStore {
    state: StateDir,
    collections: BTreeMap<Collection, Value>,
    last_sync: Option<DateTime<Utc>>,
}

impl CacheStore {
    /// Opens the cache stored in `state`.
    ///
    /// A missing or unreadable record yields an empty cache. A record
    /// written by a newer build is refused.
    pub fn open(state: StateDir) -> StoreResult<Self> {
        let record = match state.read(CACHE_KEY) {
            Ok(Some(value)) => load_record(&value)?,
            Ok(None) => CacheRecord::default(),
            Err(e) => {
                warn!(error = %e, "cache unreadable, starting empty");
                CacheRecord::default()
            }
        };

        Ok(CacheStore { state, collections: record.collections, last_sync: record.last_sync })
    }

    /// Returns the cached value of `collection`, or its empty default.
    pub fn read(&self, collection: Collection) -> Value {
        self.collections.get(&collection).cloned().unwrap_or_else(|| collection.empty_value())
    }

    /// Replaces the cached value of `collection` and stamps `last_sync`.
    ///
    /// Writing the value already stored is a no-op. `null` stores the
    /// collection's empty default.
    pub fn write(&mut self, collection: Collection, value: Value) -> StoreResult<()> {
        let value = if value.is_null() { collection.empty_value() } else { value };
        if self.read(collection) == value {
            return Ok(());
        }

        let mut collections = self.collections.clone();
        collections.insert(collection, value);
        let last_sync = Some(Utc::now());
        self.persist(&collections, last_sync)?;

        self.collections = collections;
        self.last_sync = last_sync;
        debug!(%collection, "cache updated");
        Ok(())
    }

    /// Looks up a record by id. For `profile`, returns the profile.
    pub fn find_record(&self, collection: Collection, id: &str) -> Option<Value> {
        let value = self.collections.get(&collection)?;
        if !collection.is_list() {
            return (!value.is_null()).then(|| value.clone());
        }
        value.as_array()?.iter().find(|record| id_matches(record, id)).cloned()
    }

    /// Merges `patch` into the record with the given id, appending it if
    /// absent. Returns the resulting record.
    pub fn upsert_record(
        &mut self,
        collection: Collection,
        id: &str,
        patch: &Value,
    ) -> StoreResult<Value> {
        let merged = match self.find_record(collection, id) {
            Some(existing) => merge_fields(existing, patch),
            None => patch.clone(),
        };
        let merged = if collection.is_list() { with_id(merged, id) } else { merged };
        self.put_record(collection, id, merged.clone())?;
        Ok(merged)
    }

    /// Replaces the record with the given id, appending it if absent.
    pub fn put_record(&mut self, collection: Collection, id: &str, record: Value) -> StoreResult<()> {
        if !collection.is_list() {
            return self.write(collection, record);
        }

        let mut records = match self.read(collection) {
            Value::Array(records) => records,
            _ => Vec::new(),
        };
        match records.iter_mut().find(|existing| id_matches(existing, id)) {
            Some(slot) => *slot = record,
            None => records.push(record),
        }
        self.write(collection, Value::Array(records))
    }

    /// Wipes all collections and resets `last_sync`.
    pub fn clear(&mut self) -> StoreResult<()> {
        self.state.remove(CACHE_KEY)?;
        self.collections.clear();
        self.last_sync = None;
        Ok(())
    }

    /// Time of the last cache write.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    /// Size of the persisted cache record in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.state.size(CACHE_KEY)
    }

    fn persist(
        &self,
        collections: &BTreeMap<Collection, Value>,
        last_sync: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let record = CacheRecord {
            schema_version: SCHEMA_VERSION,
            collections: collections.clone(),
            last_sync,
        };
        self.state.write(CACHE_KEY, &serde_json::to_value(&record)?)
    }
}

/// Decodes a stored cache record, upgrading the unversioned layout.
fn load_record(value: &Value) -> StoreResult<CacheRecord> {
    if schema_version(CACHE_KEY, value)? == 0 {
        return Ok(upgrade_unversioned(value));
    }
    match serde_json::from_value::<CacheRecord>(value.clone()) {
        Ok(record) => Ok(record),
        Err(e) => {
            warn!(error = %StoreError::from(e), "cache record malformed, starting empty");
            Ok(CacheRecord::default())
        }
    }
}

/// Reads the original flat layout: one key per collection plus `lastSync`.
fn upgrade_unversioned(value: &Value) -> CacheRecord {
    let mut record = CacheRecord::default();
    let Some(fields) = value.as_object() else {
        warn!("unversioned cache is not an object, starting empty");
        return record;
    };

    for collection in Collection::ALL {
        if let Some(data) = fields.get(collection.as_str()) {
            record.collections.insert(collection, data.clone());
        }
    }
    record.last_sync = fields
        .get("lastSync")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<DateTime<Utc>>().ok());
    debug!(collections = record.collections.len(), "upgraded unversioned cache");
    record
}

fn id_matches(record: &Value, id: &str) -> bool {
    match record.get(ID_FIELD) {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => n.to_string() == id,
        _ => false,
    }
}

fn merge_fields(existing: Value, patch: &Value) -> Value {
    match (existing, patch) {
        (Value::Object(mut fields), Value::Object(changes)) => {
            for (key, value) in changes {
                fields.insert(key.clone(), value.clone());
            }
            Value::Object(fields)
        }
        (_, patch) => patch.clone(),
    }
}

fn with_id(record: Value, id: &str) -> Value {
    match record {
        Value::Object(mut fields) => {
            fields.entry(ID_FIELD).or_insert_with(|| Value::String(id.to_string()));
            Value::Object(fields)
        }
        other => other,
    }
}
