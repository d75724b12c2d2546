// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict resolution between the local and remote versions of a record.
//!
//! Strategies:
//! - `local`: the local value wins unconditionally
//! - `server`: the remote value wins (default)
//! - `merge`: remote fields as the base, local fields overlaid, and a fresh
//!   `updatedAt` stamp
//!
//! Resolution is a pure function of its inputs; [`resolve`] only adds the
//! current time as the merge stamp.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Field stamped on merged records.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// How to reconcile a local record with the remote's version of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    Local,
    #[default]
    Server,
    Merge,
}

impl ConflictStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStrategy::Local => "local",
            ConflictStrategy::Server => "server",
            ConflictStrategy::Merge => "merge",
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "local" => Ok(ConflictStrategy::Local),
            "server" => Ok(ConflictStrategy::Server),
            "merge" => Ok(ConflictStrategy::Merge),
            _ => Err(Error::InvalidStrategy(s.to_string())),
        }
    }
}

/// Reconciles `local` and `remote`, stamping merges with the current time.
pub fn resolve(local: &Value, remote: &Value, strategy: ConflictStrategy) -> Value {
    resolve_at(local, remote, strategy, Utc::now())
}

/// Reconciles `local` and `remote` using `stamp` as the merge time.
pub fn resolve_at(
    local: &Value,
    remote: &Value,
    strategy: ConflictStrategy,
    stamp: DateTime<Utc>,
) -> Value {
    match strategy {
        ConflictStrategy::Local => local.clone(),
        ConflictStrategy::Server => remote.clone(),
        ConflictStrategy::Merge => merge(local, remote, stamp),
    }
}

fn merge(local: &Value, remote: &Value, stamp: DateTime<Utc>) -> Value {
    match (local, remote) {
        (Value::Object(local_fields), Value::Object(remote_fields)) => {
            let mut merged = remote_fields.clone();
            for (key, value) in local_fields {
                merged.insert(key.clone(), value.clone());
            }
            merged.insert(
                UPDATED_AT_FIELD.to_string(),
                Value::String(stamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
            Value::Object(merged)
        }
        (Value::Null, _) => remote.clone(),
        // Nothing to union field by field
        _ => local.clone(),
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
