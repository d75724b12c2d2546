// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync engine: replays queued actions against the remote.
//!
//! The engine owns the queue and the cache and is driven by three triggers:
//! a new action recorded while online, an offline to online transition, and
//! an explicit [`SyncEngine::drain`] call. Drains are single-flight; a
//! trigger that arrives mid-drain is folded into one more pass.
//!
//! Queue and cache locks are only ever held for synchronous work, never
//! across a remote call, and never both at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fitsync_core::{
    resolve, ActionId, ActionPayload, Collection, ConflictStrategy, EntityKey, OfflineAction,
};

use super::cache::{CacheStore, ID_FIELD};
use super::connectivity::{ConnectivityMonitor, Subscription};
use super::queue::{ActionQueue, QueueEntry};
use super::remote::{HttpRemote, Remote, RemoteError, RemoteRequest};
use super::storage::StoreError;

/// Marker set on records created locally and not yet acknowledged.
pub const OFFLINE_FIELD: &str = "offline";

/// Prefix of ids given to records created offline.
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Collections refreshed by [`SyncEngine::preload`], in fetch order.
pub const ESSENTIAL_COLLECTIONS: [Collection; 3] =
    [Collection::Exercises, Collection::Workouts, Collection::Profile];

/// Error type for sync engine operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Local storage failed; the operation was not recorded.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("action not found: {0}")]
    ActionNotFound(ActionId),

    #[error("action {0} is not dead-lettered\n  hint: only dead-lettered actions can be retried")]
    NotDeadLettered(ActionId),
}

/// Result type for sync engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Tunables for the sync engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rejections tolerated before an action is dead-lettered.
    pub max_attempts: u32,
    /// Strategy used when an action carries no override.
    pub conflict_strategy: ConflictStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { max_attempts: 5, conflict_strategy: ConflictStrategy::Server }
    }
}

/// Coarse state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Idle,
    Draining,
    Offline,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EngineState::Idle => "idle",
            EngineState::Draining => "draining",
            EngineState::Offline => "offline",
        })
    }
}

/// Counts from a completed drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Actions acknowledged by the remote.
    pub synced: usize,
    /// Actions that failed and stay queued.
    pub failed: usize,
    /// Actions held back behind a failed or dead-lettered predecessor, or
    /// because connectivity was lost mid-drain.
    pub deferred: usize,
    /// Actions moved to the dead-letter state.
    pub dead_lettered: usize,
    /// Acknowledged actions removed from the log.
    pub purged: usize,
}

impl DrainReport {
    fn absorb(&mut self, pass: DrainReport) {
        self.synced += pass.synced;
        self.failed += pass.failed;
        self.deferred = pass.deferred;
        self.dead_lettered += pass.dead_lettered;
        self.purged += pass.purged;
    }
}

/// What a call to [`SyncEngine::drain`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Not connected; nothing was sent.
    Offline,
    /// Another drain was in flight and will run one more pass.
    Coalesced,
    Completed(DrainReport),
}

/// Result of refreshing the essential collections.
#[derive(Debug, Clone, Default)]
pub struct PreloadReport {
    pub refreshed: Vec<Collection>,
    /// Collections with unsynced local changes, left untouched.
    pub skipped: Vec<Collection>,
    pub failed: Vec<(Collection, RemoteError)>,
}

#[derive(Debug, Clone)]
pub enum PreloadOutcome {
    /// Not connected; cached data stays authoritative.
    Offline,
    Completed(PreloadReport),
}

/// Read-only diagnostics snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub is_online: bool,
    pub state: EngineState,
    /// Actions still requiring attention, dead letters included.
    pub pending_action_count: usize,
    pub dead_letter_count: usize,
    /// Combined size of the persisted queue and cache records.
    pub cache_size_bytes: u64,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Handle to the background task started by [`SyncEngine::start`].
pub struct EngineHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    subscription: Subscription,
}

impl EngineHandle {
    /// Stops reacting to connectivity changes and waits for the task.
    pub async fn shutdown(self) {
        self.subscription.unsubscribe();
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

/// Clears the in-flight flag when a drain ends, including on error.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates the queue, the cache and the remote.
pub struct SyncEngine<R: Remote = HttpRemote> {
    config: EngineConfig,
    queue: Mutex<ActionQueue>,
    cache: Mutex<CacheStore>,
    monitor: Arc<ConnectivityMonitor>,
    remote: R,
    /// Temporary ids replaced by server ids during this process.
    settled: Mutex<HashMap<EntityKey, String>>,
    draining: AtomicBool,
    rerun: AtomicBool,
}

impl<R: Remote> SyncEngine<R> {
    pub fn new(
        config: EngineConfig,
        queue: ActionQueue,
        cache: CacheStore,
        monitor: Arc<ConnectivityMonitor>,
        remote: R,
    ) -> Self {
        SyncEngine {
            config,
            queue: Mutex::new(queue),
            cache: Mutex::new(cache),
            monitor,
            remote,
            settled: Mutex::new(HashMap::new()),
            draining: AtomicBool::new(false),
            rerun: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drains automatically on every offline to online transition until
    /// the returned handle is shut down.
    pub fn start(self: &Arc<Self>) -> EngineHandle
    where
        R: 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<bool>();
        let subscription = self.monitor.subscribe(move |online| {
            let _ = tx.send(online);
        });

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let engine = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = rx.recv() => match event {
                        Some(true) => engine.drain_logged("reconnect").await,
                        Some(false) => debug!("offline, drains suspended"),
                        None => break,
                    },
                }
            }
            debug!("sync task stopped");
        });

        EngineHandle { cancel, task, subscription }
    }

    /// Records an action, then drains if online.
    ///
    /// Only a storage failure is returned; the action is then not recorded.
    pub async fn record(&self, payload: ActionPayload) -> SyncResult<OfflineAction> {
        self.record_with(payload, None).await
    }

    /// Records an action with a conflict strategy override.
    pub async fn record_with(
        &self,
        payload: ActionPayload,
        strategy: Option<ConflictStrategy>,
    ) -> SyncResult<OfflineAction> {
        let action = self.lock_queue().enqueue_with(payload, strategy)?;
        self.drain_logged("enqueue").await;
        Ok(action)
    }

    /// Creates a workout offline-first. Returns its temporary id.
    pub async fn create_workout(&self, workout: Value) -> SyncResult<String> {
        self.create_record(Collection::Workouts, workout, |id, doc| {
            ActionPayload::create_workout(id, doc)
        })
        .await
    }

    /// Creates a custom exercise offline-first. Returns its temporary id.
    pub async fn create_exercise(&self, exercise: Value) -> SyncResult<String> {
        self.create_record(Collection::Exercises, exercise, |id, doc| {
            ActionPayload::create_exercise(id, doc)
        })
        .await
    }

    pub async fn update_workout(
        &self,
        workout_id: &str,
        changes: Value,
    ) -> SyncResult<OfflineAction> {
        let entity = EntityKey::new(Collection::Workouts, workout_id);
        let payload = ActionPayload::update_workout(workout_id, changes.clone());
        self.record_optimistic(&entity, &changes, payload).await
    }

    pub async fn update_progress(
        &self,
        entry_id: &str,
        changes: Value,
    ) -> SyncResult<OfflineAction> {
        let entity = EntityKey::new(Collection::Progress, entry_id);
        let payload = ActionPayload::update_progress(entry_id, changes.clone());
        self.record_optimistic(&entity, &changes, payload).await
    }

    pub async fn update_profile(&self, profile: Value) -> SyncResult<OfflineAction> {
        let payload = ActionPayload::update_profile(profile.clone());
        self.record_optimistic(&EntityKey::profile(), &profile, payload).await
    }

    async fn create_record(
        &self,
        collection: Collection,
        document: Value,
        make_payload: fn(String, Value) -> ActionPayload,
    ) -> SyncResult<String> {
        let local_id = format!("{TEMP_ID_PREFIX}{}", self.lock_queue().mint_id());
        let mut record = document.clone();
        if let Value::Object(fields) = &mut record {
            fields.insert(ID_FIELD.to_string(), Value::String(local_id.clone()));
            fields.insert(OFFLINE_FIELD.to_string(), Value::Bool(true));
        }

        let entity = EntityKey::new(collection, local_id.as_str());
        let payload = make_payload(local_id.clone(), document);
        self.record_optimistic(&entity, &record, payload).await?;
        Ok(local_id)
    }

    /// Applies `patch` to the cache, then enqueues `payload`. If enqueueing
    /// fails, the cached collection is restored and the error returned.
    async fn record_optimistic(
        &self,
        entity: &EntityKey,
        patch: &Value,
        payload: ActionPayload,
    ) -> SyncResult<OfflineAction> {
        let previous = {
            let mut cache = self.lock_cache();
            let previous = cache.read(entity.collection);
            cache.upsert_record(entity.collection, &entity.id, patch)?;
            previous
        };

        let enqueued = self.lock_queue().enqueue(payload);
        let action = match enqueued {
            Ok(action) => action,
            Err(e) => {
                if let Err(rollback) = self.lock_cache().write(entity.collection, previous) {
                    warn!(%entity, error = %rollback, "failed to roll back optimistic update");
                }
                return Err(e.into());
            }
        };

        self.drain_logged("enqueue").await;
        Ok(action)
    }

    /// Replays pending actions in order.
    pub async fn drain(&self) -> SyncResult<DrainOutcome> {
        if !self.monitor.is_connected() {
            return Ok(DrainOutcome::Offline);
        }
        if self.draining.swap(true, Ordering::SeqCst) {
            self.rerun.store(true, Ordering::SeqCst);
            debug!("drain in flight, coalescing trigger");
            return Ok(DrainOutcome::Coalesced);
        }

        let mut report = DrainReport::default();
        loop {
            {
                let _guard = DrainGuard(&self.draining);
                loop {
                    self.rerun.store(false, Ordering::SeqCst);
                    report.absorb(self.drain_pass().await?);
                    if !self.rerun.load(Ordering::SeqCst) || !self.monitor.is_connected() {
                        break;
                    }
                    debug!("running coalesced drain pass");
                }
            }
            // A trigger may have landed between the last check and release
            if !self.rerun.swap(false, Ordering::SeqCst)
                || !self.monitor.is_connected()
                || self.draining.swap(true, Ordering::SeqCst)
            {
                break;
            }
        }

        info!(
            synced = report.synced,
            failed = report.failed,
            deferred = report.deferred,
            dead_lettered = report.dead_lettered,
            purged = report.purged,
            "drain complete"
        );
        Ok(DrainOutcome::Completed(report))
    }

    async fn drain_pass(&self) -> SyncResult<DrainReport> {
        let mut report = DrainReport::default();
        let (pending, mut blocked) = {
            let mut queue = self.lock_queue();
            report.dead_lettered += queue.quarantine_unrecognized()?;
            (queue.pending(), queue.dead_letter_entities())
        };

        for queued in pending {
            if !self.monitor.is_connected() {
                report.deferred += 1;
                continue;
            }

            // Re-read: an earlier create in this pass may have remapped it
            let current = {
                let queue = self.lock_queue();
                queue.get(queued.id).and_then(QueueEntry::as_action).cloned()
            };
            let Some(action) = current.filter(OfflineAction::is_pending) else {
                continue;
            };

            let entity = action.entity();
            if blocked.contains(&entity) {
                debug!(id = %action.id, %entity, "deferred behind earlier failure");
                report.deferred += 1;
                continue;
            }

            let request = RemoteRequest::for_action(&action.payload);
            debug!(id = %action.id, %request, "sending action");
            match self.remote.execute(request).await {
                Ok(response) => {
                    self.acknowledge(&action, &response)?;
                    report.synced += 1;
                }
                Err(err) if err.is_transient() => {
                    debug!(id = %action.id, error = %err, "transient failure");
                    self.lock_queue().record_transient(action.id, &err.to_string())?;
                    blocked.insert(entity);
                    report.failed += 1;
                }
                Err(err) => {
                    warn!(id = %action.id, error = %err, "action rejected");
                    let dead = self.lock_queue().record_rejection(
                        action.id,
                        &err.to_string(),
                        self.config.max_attempts,
                    )?;
                    blocked.insert(entity);
                    report.failed += 1;
                    if dead {
                        report.dead_lettered += 1;
                    }
                }
            }
        }

        report.purged = self.lock_queue().purge_synced()?;
        Ok(report)
    }

    /// Marks an acknowledged action synced and folds the server response
    /// into the cache.
    fn acknowledge(&self, action: &OfflineAction, response: &Value) -> SyncResult<()> {
        let entity = action.entity();
        let server_id = response_id(response).filter(|id| *id != entity.id);
        let settled = match (&server_id, action.payload.is_create()) {
            (Some(id), true) => EntityKey::new(entity.collection, id.as_str()),
            _ => entity.clone(),
        };

        let newer_pending = {
            let mut queue = self.lock_queue();
            if settled != entity {
                queue.remap_entity(&entity, &settled.id)?;
            }
            queue.mark_synced(action.id)?;
            queue.has_pending_after(action.id, &settled)
        };
        if settled != entity {
            self.lock_settled().insert(entity.clone(), settled.id.clone());
        }

        if let Err(e) = self.reconcile(action, response, &entity, &settled, newer_pending) {
            // The cache is rebuildable; the acknowledgement already stands
            warn!(id = %action.id, error = %e, "failed to reconcile cache");
        }
        Ok(())
    }

    fn reconcile(
        &self,
        action: &OfflineAction,
        response: &Value,
        entity: &EntityKey,
        settled: &EntityKey,
        newer_pending: bool,
    ) -> Result<(), StoreError> {
        if response.is_null() {
            return Ok(());
        }
        let mut cache = self.lock_cache();
        let local = cache.find_record(entity.collection, &entity.id).unwrap_or(Value::Null);

        let mut record = if newer_pending {
            debug!(%entity, "newer local change pending, keeping optimistic value");
            local
        } else {
            let strategy = action.strategy.unwrap_or(self.config.conflict_strategy);
            let mut resolved = resolve(&local, response, strategy);
            if action.payload.is_create() {
                if let Value::Object(fields) = &mut resolved {
                    fields.remove(OFFLINE_FIELD);
                }
            }
            resolved
        };

        if entity.collection.is_list() {
            if let Value::Object(fields) = &mut record {
                if settled != entity || !fields.contains_key(ID_FIELD) {
                    fields.insert(ID_FIELD.to_string(), Value::String(settled.id.clone()));
                }
            }
        }
        if record.is_null() {
            return Ok(());
        }
        cache.put_record(entity.collection, &entity.id, record)
    }

    /// Refreshes the essential collections from the remote.
    ///
    /// Collections with unsynced local changes are skipped so optimistic
    /// data is never clobbered.
    pub async fn preload(&self) -> SyncResult<PreloadOutcome> {
        if !self.monitor.is_connected() {
            debug!("offline, serving cached data");
            return Ok(PreloadOutcome::Offline);
        }

        let mut report = PreloadReport::default();
        for collection in ESSENTIAL_COLLECTIONS {
            if self.has_local_changes(collection) {
                report.skipped.push(collection);
                continue;
            }
            let fetched = self.remote.execute(RemoteRequest::fetch(collection)).await;
            match fetched.and_then(|value| fetched_value(collection, value)) {
                Ok(value) => {
                    // A mutation may have been recorded while the fetch was in flight
                    if self.has_local_changes(collection) {
                        report.skipped.push(collection);
                        continue;
                    }
                    self.lock_cache().write(collection, value)?;
                    report.refreshed.push(collection);
                }
                Err(err) => {
                    warn!(%collection, error = %err, "preload failed");
                    report.failed.push((collection, err));
                }
            }
        }

        info!(
            refreshed = report.refreshed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "preload complete"
        );
        Ok(PreloadOutcome::Completed(report))
    }

    fn has_local_changes(&self, collection: Collection) -> bool {
        self.lock_queue().has_pending_in(collection)
    }

    /// Diagnostics for display. Has no side effects.
    pub fn status(&self) -> SyncStatus {
        let (pending_action_count, dead_letter_count, queue_bytes) = {
            let queue = self.lock_queue();
            (queue.unsynced_count(), queue.dead_letters().len(), queue.size_bytes())
        };
        let (cache_bytes, last_sync) = {
            let cache = self.lock_cache();
            (cache.size_bytes(), cache.last_sync())
        };

        SyncStatus {
            is_online: self.is_connected(),
            state: self.state(),
            pending_action_count,
            dead_letter_count,
            cache_size_bytes: queue_bytes + cache_bytes,
            last_sync,
        }
    }

    pub fn state(&self) -> EngineState {
        if !self.is_connected() {
            EngineState::Offline
        } else if self.draining.load(Ordering::SeqCst) {
            EngineState::Draining
        } else {
            EngineState::Idle
        }
    }

    /// Unacknowledged entries in queue order, dead letters included.
    pub fn pending(&self) -> Vec<QueueEntry> {
        self.lock_queue().entries().iter().filter(|e| !e.is_synced()).cloned().collect()
    }

    pub fn dead_letters(&self) -> Vec<QueueEntry> {
        self.lock_queue().dead_letters()
    }

    /// Returns a dead letter to the queue and drains if online.
    pub async fn retry_dead_letter(&self, id: ActionId) -> SyncResult<()> {
        {
            let mut queue = self.lock_queue();
            match queue.get(id) {
                None => return Err(SyncError::ActionNotFound(id)),
                Some(entry) if !entry.is_dead_lettered() => {
                    return Err(SyncError::NotDeadLettered(id))
                }
                Some(_) => {}
            }
            queue.requeue(id)?;
        }
        info!(%id, "dead letter requeued");
        self.drain_logged("retry").await;
        Ok(())
    }

    /// Drops a queued entry without sending it.
    pub fn discard(&self, id: ActionId) -> SyncResult<()> {
        if !self.lock_queue().discard(id)? {
            return Err(SyncError::ActionNotFound(id));
        }
        info!(%id, "action discarded");
        Ok(())
    }

    /// The cached value of `collection`. Never touches the network.
    pub fn cached(&self, collection: Collection) -> Value {
        self.lock_cache().read(collection)
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.lock_cache().last_sync()
    }

    pub fn is_connected(&self) -> bool {
        self.monitor.is_connected()
    }

    /// Subscribes to connectivity transitions.
    pub fn on_connectivity_change(
        &self,
        listener: impl Fn(bool) + Send + Sync + 'static,
    ) -> Subscription {
        self.monitor.subscribe(listener)
    }

    /// Clears both the cache and the queue.
    /// The server id a temporary id was replaced with, if its create was
    /// acknowledged by this engine.
    pub fn settled_id(&self, collection: Collection, local_id: &str) -> Option<String> {
        self.lock_settled().get(&EntityKey::new(collection, local_id)).cloned()
    }

    pub fn reset(&self) -> SyncResult<()> {
        self.lock_cache().clear()?;
        self.lock_queue().clear()?;
        self.lock_settled().clear();
        info!("local sync state cleared");
        Ok(())
    }

    async fn drain_logged(&self, trigger: &'static str) {
        match self.drain().await {
            Ok(outcome) => debug!(trigger, ?outcome, "drain finished"),
            Err(e) => warn!(trigger, error = %e, "drain failed"),
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, ActionQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_cache(&self) -> MutexGuard<'_, CacheStore> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_settled(&self) -> MutexGuard<'_, HashMap<EntityKey, String>> {
        self.settled.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The id the server assigned in a response, if any.
/// Checks a preload response against the collection's shape. An empty
/// body stands for an empty collection.
fn fetched_value(collection: Collection, value: Value) -> Result<Value, RemoteError> {
    match (collection.is_list(), value) {
        (_, Value::Null) => Ok(collection.empty_value()),
        (true, value @ Value::Array(_)) | (false, value @ Value::Object(_)) => Ok(value),
        (true, _) => Err(RemoteError::Transient(format!("expected a JSON array for {}", collection))),
        (false, _) => {
            Err(RemoteError::Transient(format!("expected a JSON object for {}", collection)))
        }
    }
}

fn response_id(response: &Value) -> Option<String> {
    match response.get(ID_FIELD)? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
