// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;

use fitsync_core::ActionStatus;

use crate::sync::{DrainReport, PreloadReport, QueueEntry, SyncStatus};

/// Longest error message shown inline in a queue listing.
const ERROR_WIDTH: usize = 72;

/// JSON shape of a queue entry in `pending` and `dead-letters` output.
#[derive(Serialize)]
pub struct EntryView {
    pub id: String,
    pub kind: String,
    pub entity: Option<String>,
    pub created_at: String,
    pub attempts: u32,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl From<&QueueEntry> for EntryView {
    fn from(entry: &QueueEntry) -> Self {
        let (status, reason) = match entry.status() {
            ActionStatus::Pending => ("pending".to_string(), None),
            ActionStatus::DeadLettered { reason, .. } => {
                ("dead_lettered".to_string(), Some(reason.clone()))
            }
        };
        EntryView {
            id: entry.id().to_string(),
            kind: entry.kind_label().to_string(),
            entity: entry.entity().map(|e| e.to_string()),
            created_at: entry.created_at().to_rfc3339(),
            attempts: entry.attempts(),
            status,
            reason,
            last_error: entry.last_error().map(str::to_string),
        }
    }
}

/// Human-readable status block.
pub fn format_status(status: &SyncStatus) -> String {
    let connectivity = if status.is_online { "online" } else { "offline" };
    let last_sync = status
        .last_sync
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());

    let mut lines = vec![
        format!("Connectivity: {}", connectivity),
        format!("State:        {}", status.state),
        format!("Pending:      {}", plural(status.pending_action_count, "action")),
    ];
    if status.dead_letter_count > 0 {
        lines.push(format!(
            "Dead letters: {} (see `fitsync dead-letters`)",
            status.dead_letter_count
        ));
    }
    lines.push(format!("Stored:       {}", format_bytes(status.cache_size_bytes)));
    lines.push(format!("Last sync:    {}", last_sync));
    lines.join("\n")
}

/// One line per queue entry: `{id} {kind} {entity} [{status}]`.
pub fn format_entry_line(entry: &QueueEntry) -> String {
    let entity = entry.entity().map(|e| e.to_string()).unwrap_or_else(|| "-".to_string());
    let mut line = format!("{}  {:<15}  {}", entry.id(), entry.kind_label(), entity);

    match entry.status() {
        ActionStatus::Pending => {}
        ActionStatus::DeadLettered { reason, .. } => {
            line.push_str(&format!("  [dead-lettered: {}]", truncate(reason)));
            return line;
        }
    }
    if entry.attempts() > 0 {
        line.push_str(&format!("  [{}]", plural(entry.attempts() as usize, "rejection")));
    }
    if let Some(error) = entry.last_error() {
        line.push_str(&format!("  last error: {}", truncate(error)));
    }
    line
}

pub fn format_drain(report: &DrainReport) -> String {
    let mut line = format!("synced {}", report.synced);
    if report.failed > 0 {
        line.push_str(&format!(", failed {}", report.failed));
    }
    if report.deferred > 0 {
        line.push_str(&format!(", deferred {}", report.deferred));
    }
    if report.dead_lettered > 0 {
        line.push_str(&format!(", dead-lettered {}", report.dead_lettered));
    }
    line
}

pub fn format_preload(report: &PreloadReport) -> Vec<String> {
    let join = |collections: &[fitsync_core::Collection]| {
        collections.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
    };

    let mut lines = Vec::new();
    if !report.refreshed.is_empty() {
        lines.push(format!("refreshed: {}", join(&report.refreshed)));
    }
    if !report.skipped.is_empty() {
        lines.push(format!("skipped (unsynced local changes): {}", join(&report.skipped)));
    }
    for (collection, error) in &report.failed {
        lines.push(format!("failed: {}: {}", collection, error));
    }
    lines
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    }
}

fn truncate(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() <= ERROR_WIDTH {
        return first_line.to_string();
    }
    let cut: String = first_line.chars().take(ERROR_WIDTH - 3).collect();
    format!("{}...", cut)
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
