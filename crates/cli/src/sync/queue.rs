// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable, ordered log of offline actions.
//!
//! The whole log is stored as one JSON record and rewritten atomically on
//! every mutation, so an action returned by [`ActionQueue::enqueue`] survives
//! a crash. Entries that this build cannot decode (an unknown kind written by
//! a newer build, or a legacy entry) are kept verbatim and written back
//! unchanged until they are discarded. An entry without a usable id is
//! stamped with the id minted for it, so it can be retried or discarded
//! from a later process.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use fitsync_core::{
    ActionId, ActionPayload, ActionStatus, Collection, ConflictStrategy, EntityKey, IdClock,
    OfflineAction,
};

use super::storage::{schema_version, StateDir, StoreResult, QUEUE_KEY, SCHEMA_VERSION};

/// Persisted form of the queue.
#[derive(Debug, Serialize, Deserialize)]
struct QueueRecord {
    schema_version: u32,
    actions: Vec<Value>,
}

/// A queued entry whose kind or shape this build does not understand.
#[derive(Debug, Clone, PartialEq)]
pub struct UnrecognizedAction {
    pub id: ActionId,
    /// Kind label as found in the raw entry, for display.
    pub kind: String,
    pub status: ActionStatus,
    /// The entry as it was read, plus the minted id if it had none.
    pub raw: Value,
}

/// One entry of the action log.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEntry {
    Action(OfflineAction),
    Unrecognized(UnrecognizedAction),
}

impl QueueEntry {
    pub fn id(&self) -> ActionId {
        match self {
            QueueEntry::Action(action) => action.id,
            QueueEntry::Unrecognized(entry) => entry.id,
        }
    }

    /// Kind label for display.
    pub fn kind_label(&self) -> &str {
        match self {
            QueueEntry::Action(action) => action.kind().as_str(),
            QueueEntry::Unrecognized(entry) => &entry.kind,
        }
    }

    pub fn status(&self) -> &ActionStatus {
        match self {
            QueueEntry::Action(action) => &action.status,
            QueueEntry::Unrecognized(entry) => &entry.status,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            QueueEntry::Action(action) => action.created_at,
            QueueEntry::Unrecognized(entry) => entry.id.timestamp(),
        }
    }

    /// The entity targeted, if the entry is understood.
    pub fn entity(&self) -> Option<EntityKey> {
        self.as_action().map(OfflineAction::entity)
    }

    pub fn attempts(&self) -> u32 {
        self.as_action().map(|a| a.attempts).unwrap_or(0)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.as_action().and_then(|a| a.last_error.as_deref())
    }

    pub fn as_action(&self) -> Option<&OfflineAction> {
        match self {
            QueueEntry::Action(action) => Some(action),
            QueueEntry::Unrecognized(_) => None,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.as_action().is_some_and(|a| a.synced)
    }

    pub fn is_pending(&self) -> bool {
        !self.is_synced() && *self.status() == ActionStatus::Pending
    }

    pub fn is_dead_lettered(&self) -> bool {
        matches!(self.status(), ActionStatus::DeadLettered { .. })
    }

    fn status_mut(&mut self) -> &mut ActionStatus {
        match self {
            QueueEntry::Action(action) => &mut action.status,
            QueueEntry::Unrecognized(entry) => &mut entry.status,
        }
    }

    fn to_value(&self) -> StoreResult<Value> {
        match self {
            QueueEntry::Action(action) => Ok(serde_json::to_value(action)?),
            QueueEntry::Unrecognized(entry) => {
                let mut raw = entry.raw.clone();
                if let Value::Object(fields) = &mut raw {
                    if entry.status != ActionStatus::Pending || fields.contains_key("status") {
                        fields.insert("status".to_string(), serde_json::to_value(&entry.status)?);
                    }
                }
                Ok(raw)
            }
        }
    }
}

/// Durable FIFO log of offline actions.
pub struct ActionQueue {
    state: StateDir,
    clock: IdClock,
    entries: Vec<QueueEntry>,
}

impl ActionQueue {
    /// Opens the queue stored in `state`, using the system clock for ids.
    pub fn open(state: StateDir) -> StoreResult<Self> {
        Self::open_with_clock(state, IdClock::new())
    }

    /// Opens the queue stored in `state` with a custom id clock.
    pub fn open_with_clock(state: StateDir, clock: IdClock) -> StoreResult<Self> {
        let raw_entries = match state.read(QUEUE_KEY)? {
            None => Vec::new(),
            Some(value) => {
                if schema_version(QUEUE_KEY, &value)? == 0 {
                    // Unversioned queues are a bare array
                    serde_json::from_value::<Vec<Value>>(value)?
                } else {
                    serde_json::from_value::<QueueRecord>(value)?.actions
                }
            }
        };

        // Observe stored ids first so any id minted below is fresh
        for id in raw_entries.iter().filter_map(stored_id) {
            clock.observe(&id);
        }
        let mut minted = 0;
        let entries: Vec<QueueEntry> = raw_entries
            .into_iter()
            .map(|raw| {
                let (entry, fresh) = decode_entry(raw, &clock);
                minted += usize::from(fresh);
                entry
            })
            .collect();

        let unrecognized =
            entries.iter().filter(|e| matches!(e, QueueEntry::Unrecognized(_))).count();
        if unrecognized > 0 {
            warn!(count = unrecognized, "queue holds entries this build does not recognize");
        }
        debug!(entries = entries.len(), "opened action queue");

        let queue = ActionQueue { state, clock, entries };
        if minted > 0 {
            // Pin the minted ids now; listing alone must not change them
            if let Err(e) = queue.persist(&queue.entries) {
                warn!(error = %e, count = minted, "could not persist ids for unrecognized entries");
            }
        }
        Ok(queue)
    }

    /// Appends an action and persists it before returning.
    ///
    /// On failure nothing is recorded and the storage error is returned.
    pub fn enqueue(&mut self, payload: ActionPayload) -> StoreResult<OfflineAction> {
        self.enqueue_with(payload, None)
    }

    /// Appends an action carrying a conflict strategy override.
    pub fn enqueue_with(
        &mut self,
        payload: ActionPayload,
        strategy: Option<ConflictStrategy>,
    ) -> StoreResult<OfflineAction> {
        let action = OfflineAction::new(self.clock.next(), payload).with_strategy(strategy);
        let entry = QueueEntry::Action(action.clone());
        self.commit(|entries| {
            entries.push(entry);
            true
        })?;
        debug!(id = %action.id, kind = %action.kind(), entity = %action.entity(), "enqueued action");
        Ok(action)
    }

    /// Mints a fresh id from the queue's clock without recording anything.
    pub fn mint_id(&self) -> ActionId {
        self.clock.next()
    }

    /// Every entry, in insertion order.
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn get(&self, id: ActionId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    /// Understood actions awaiting sync, in insertion order.
    pub fn pending(&self) -> Vec<OfflineAction> {
        self.entries
            .iter()
            .filter(|e| e.is_pending())
            .filter_map(QueueEntry::as_action)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries not yet acknowledged, dead letters included.
    pub fn unsynced_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_synced()).count()
    }

    pub fn dead_letters(&self) -> Vec<QueueEntry> {
        self.entries.iter().filter(|e| e.is_dead_lettered()).cloned().collect()
    }

    /// Entities held back by a dead-lettered action.
    pub fn dead_letter_entities(&self) -> HashSet<EntityKey> {
        self.entries.iter().filter(|e| e.is_dead_lettered()).filter_map(QueueEntry::entity).collect()
    }

    /// Returns true if an action newer than `id` for `entity` is pending.
    pub fn has_pending_after(&self, id: ActionId, entity: &EntityKey) -> bool {
        self.entries
            .iter()
            .filter(|e| e.is_pending() && e.id() > id)
            .any(|e| e.entity().as_ref() == Some(entity))
    }

    /// Returns true if any unacknowledged action targets `collection`.
    pub fn has_pending_in(&self, collection: Collection) -> bool {
        self.entries
            .iter()
            .filter(|e| !e.is_synced())
            .filter_map(QueueEntry::entity)
            .any(|entity| entity.collection == collection)
    }

    /// Flags an action as acknowledged. Unknown ids are ignored.
    pub fn mark_synced(&mut self, id: ActionId) -> StoreResult<()> {
        self.commit(|entries| match find_action(entries, id) {
            Some(action) if !action.synced => {
                action.synced = true;
                true
            }
            _ => false,
        })?;
        Ok(())
    }

    /// Removes every acknowledged action. Returns how many were removed.
    pub fn purge_synced(&mut self) -> StoreResult<usize> {
        let mut purged = 0;
        self.commit(|entries| {
            let before = entries.len();
            entries.retain(|e| !e.is_synced());
            purged = before - entries.len();
            purged > 0
        })?;
        Ok(purged)
    }

    /// Records a retryable failure. It does not count toward dead-lettering.
    pub fn record_transient(&mut self, id: ActionId, error: &str) -> StoreResult<()> {
        self.commit(|entries| match find_action(entries, id) {
            Some(action) => {
                action.last_error = Some(error.to_string());
                true
            }
            None => false,
        })?;
        Ok(())
    }

    /// Records a rejection by the remote. Returns true if the action has now
    /// reached `max_attempts` and was dead-lettered.
    pub fn record_rejection(
        &mut self,
        id: ActionId,
        error: &str,
        max_attempts: u32,
    ) -> StoreResult<bool> {
        let mut dead_lettered = false;
        self.commit(|entries| {
            let Some(action) = find_action(entries, id) else {
                return false;
            };
            action.attempts = action.attempts.saturating_add(1);
            action.last_error = Some(error.to_string());
            if action.attempts >= max_attempts {
                action.status =
                    ActionStatus::DeadLettered { reason: error.to_string(), at: Utc::now() };
                dead_lettered = true;
            }
            true
        })?;
        if dead_lettered {
            warn!(%id, error, "action dead-lettered after repeated rejection");
        }
        Ok(dead_lettered)
    }

    /// Dead-letters every pending entry this build cannot dispatch.
    pub fn quarantine_unrecognized(&mut self) -> StoreResult<usize> {
        let mut quarantined = 0;
        self.commit(|entries| {
            for entry in entries.iter_mut() {
                if let QueueEntry::Unrecognized(unknown) = entry {
                    if unknown.status == ActionStatus::Pending {
                        unknown.status = ActionStatus::DeadLettered {
                            reason: format!("unrecognized action kind '{}'", unknown.kind),
                            at: Utc::now(),
                        };
                        quarantined += 1;
                    }
                }
            }
            quarantined > 0
        })?;
        if quarantined > 0 {
            warn!(count = quarantined, "quarantined unrecognized actions");
        }
        Ok(quarantined)
    }

    /// Points unacknowledged actions on `entity` at `new_id`.
    pub fn remap_entity(&mut self, entity: &EntityKey, new_id: &str) -> StoreResult<usize> {
        let mut remapped = 0;
        self.commit(|entries| {
            for entry in entries.iter_mut() {
                if let QueueEntry::Action(action) = entry {
                    if !action.synced && action.payload.remap_entity(entity, new_id) {
                        remapped += 1;
                    }
                }
            }
            remapped > 0
        })?;
        if remapped > 0 {
            debug!(%entity, new_id, count = remapped, "remapped queued actions");
        }
        Ok(remapped)
    }

    /// Returns a dead letter to pending with a fresh attempt budget.
    ///
    /// Returns false if `id` is not a dead letter.
    pub fn requeue(&mut self, id: ActionId) -> StoreResult<bool> {
        self.commit(|entries| {
            let Some(entry) = entries.iter_mut().find(|e| e.id() == id) else {
                return false;
            };
            if !entry.is_dead_lettered() {
                return false;
            }
            *entry.status_mut() = ActionStatus::Pending;
            if let QueueEntry::Action(action) = entry {
                action.attempts = 0;
                action.last_error = None;
            }
            true
        })
    }

    /// Removes an entry outright. Returns false if `id` is not queued.
    pub fn discard(&mut self, id: ActionId) -> StoreResult<bool> {
        self.commit(|entries| {
            let before = entries.len();
            entries.retain(|e| e.id() != id);
            entries.len() != before
        })
    }

    /// Empties the queue.
    pub fn clear(&mut self) -> StoreResult<()> {
        self.state.remove(QUEUE_KEY)?;
        self.entries.clear();
        Ok(())
    }

    /// Size of the persisted queue record in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.state.size(QUEUE_KEY)
    }

    /// Applies `change` to a copy of the log and persists it. The in-memory
    /// log is only replaced once the write succeeds.
    ///
    /// `change` returns false when it made no change; nothing is written.
    fn commit(&mut self, change: impl FnOnce(&mut Vec<QueueEntry>) -> bool) -> StoreResult<bool> {
        let mut next = self.entries.clone();
        if !change(&mut next) {
            return Ok(false);
        }
        self.persist(&next)?;
        self.entries = next;
        Ok(true)
    }

    fn persist(&self, entries: &[QueueEntry]) -> StoreResult<()> {
        let actions = entries.iter().map(QueueEntry::to_value).collect::<StoreResult<Vec<_>>>()?;
        let record = QueueRecord { schema_version: SCHEMA_VERSION, actions };
        self.state.write(QUEUE_KEY, &serde_json::to_value(&record)?)
    }
}

fn find_action(entries: &mut [QueueEntry], id: ActionId) -> Option<&mut OfflineAction> {
    entries.iter_mut().find_map(|entry| match entry {
        QueueEntry::Action(action) if action.id == id => Some(action),
        _ => None,
    })
}

/// Field holding a minted id when the entry's own `id` is unusable.
const QUEUE_ID_FIELD: &str = "queue_id";

fn parse_id(value: &Value) -> Option<ActionId> {
    match value {
        Value::String(s) => ActionId::parse(s).ok(),
        Value::Number(n) => n.as_u64().and_then(|ms| ActionId::parse(&ms.to_string()).ok()),
        _ => None,
    }
}

fn stored_id(raw: &Value) -> Option<ActionId> {
    raw.get("id").and_then(parse_id).or_else(|| raw.get(QUEUE_ID_FIELD).and_then(parse_id))
}

/// Decodes a stored entry, keeping anything unreadable verbatim.
///
/// Returns true alongside the entry when a minted id was added to it.
fn decode_entry(mut raw: Value, clock: &IdClock) -> (QueueEntry, bool) {
    if let Ok(action) = serde_json::from_value::<OfflineAction>(raw.clone()) {
        return (QueueEntry::Action(action), false);
    }

    let (id, minted) = match stored_id(&raw) {
        Some(id) => (id, false),
        None => {
            let id = clock.next();
            let pinned = match &mut raw {
                Value::Object(fields) => {
                    // Never overwrite an id this build merely fails to read
                    let field = if fields.contains_key("id") { QUEUE_ID_FIELD } else { "id" };
                    fields.insert(field.to_string(), Value::String(id.to_string()));
                    true
                }
                _ => false,
            };
            (id, pinned)
        }
    };
    let kind = raw
        .pointer("/payload/kind")
        .or_else(|| raw.get("type"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let status = raw
        .get("status")
        .and_then(|s| serde_json::from_value::<ActionStatus>(s.clone()).ok())
        .unwrap_or_default();

    (QueueEntry::Unrecognized(UnrecognizedAction { id, kind, status, raw }), minted)
}
