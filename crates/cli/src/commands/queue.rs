// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue inspection and manual dead-letter resolution.

use fitsync_core::ActionId;

use crate::cli::OutputArgs;
use crate::display::{format_entry_line, EntryView};
use crate::error::Result;
use crate::sync::{QueueEntry, Remote, SyncEngine};

/// Lists unsynced actions, dead letters included, in send order.
pub fn pending<R: Remote>(engine: &SyncEngine<R>, output: OutputArgs) -> Result<String> {
    list(&engine.pending(), output, "no pending actions")
}

pub fn dead_letters<R: Remote>(engine: &SyncEngine<R>, output: OutputArgs) -> Result<String> {
    list(&engine.dead_letters(), output, "no dead letters")
}

fn list(entries: &[QueueEntry], output: OutputArgs, empty: &str) -> Result<String> {
    if output.json {
        let views: Vec<EntryView> = entries.iter().map(EntryView::from).collect();
        return Ok(serde_json::to_string_pretty(&views)?);
    }
    if entries.is_empty() {
        return Ok(empty.to_string());
    }
    Ok(entries.iter().map(format_entry_line).collect::<Vec<_>>().join("\n"))
}

/// Returns a dead letter to the queue, then syncs if online.
pub async fn retry<R: Remote>(engine: &SyncEngine<R>, id: &str) -> Result<String> {
    let id = ActionId::parse(id)?;
    engine.retry_dead_letter(id).await?;

    let still_queued = engine.pending().iter().any(|entry| entry.id() == id);
    if still_queued {
        Ok(format!("requeued {}; it will be sent on the next sync", id))
    } else {
        Ok(format!("requeued {} and synced", id))
    }
}

pub fn discard<R: Remote>(engine: &SyncEngine<R>, id: &str) -> Result<String> {
    let id = ActionId::parse(id)?;
    engine.discard(id)?;
    Ok(format!("discarded {}", id))
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
