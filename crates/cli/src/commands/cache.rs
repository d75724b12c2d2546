// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use fitsync_core::Collection;

use crate::error::Result;
use crate::sync::{Remote, SyncEngine};

/// Prints a cached collection as JSON. Never touches the network.
pub fn show<R: Remote>(engine: &SyncEngine<R>, collection: Collection) -> Result<String> {
    Ok(serde_json::to_string_pretty(&engine.cached(collection))?)
}

/// Clears the queue and the cache, reporting unsynced actions lost.
pub fn reset<R: Remote>(engine: &SyncEngine<R>) -> Result<String> {
    let discarded = engine.status().pending_action_count;
    engine.reset()?;
    if discarded == 0 {
        Ok("local state cleared".to_string())
    } else {
        Ok(format!("local state cleared; discarded {} unsynced actions", discarded))
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
