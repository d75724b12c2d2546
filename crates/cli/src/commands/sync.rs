// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::display::{format_drain, format_preload};
use crate::error::Result;
use crate::sync::{DrainOutcome, PreloadOutcome, Remote, SyncEngine};

/// Manual drain trigger.
pub async fn run<R: Remote>(engine: &SyncEngine<R>) -> Result<String> {
    match engine.drain().await? {
        DrainOutcome::Offline => {
            let queued = engine.status().pending_action_count;
            Ok(format!("offline; {} queued", queued))
        }
        DrainOutcome::Coalesced => Ok("sync already in progress".to_string()),
        DrainOutcome::Completed(report) => Ok(format_drain(&report)),
    }
}

pub async fn preload<R: Remote>(engine: &SyncEngine<R>) -> Result<String> {
    match engine.preload().await? {
        PreloadOutcome::Offline => Ok("offline; serving cached data".to_string()),
        PreloadOutcome::Completed(report) => Ok(format_preload(&report).join("\n")),
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
