// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use fitsync_core::{ActionPayload, ClockSource, IdClock};

use super::cache::CacheStore;
use super::connectivity::{ConnectivityMonitor, Reachability};
use super::engine::{EngineConfig, SyncEngine};
use super::queue::ActionQueue;
use super::remote::{Method, Remote, RemoteError, RemoteRequest, RemoteResult};
use super::storage::StateDir;

/// Wall clock pinned to a settable instant.
pub struct FixedClock(AtomicU64);

impl FixedClock {
    pub fn new(ms: u64) -> Arc<Self> {
        Arc::new(FixedClock(AtomicU64::new(ms)))
    }
}

impl ClockSource for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// An id clock that always reads `ms`.
pub fn fixed_clock(ms: u64) -> IdClock {
    IdClock::with_clock(FixedClock::new(ms))
}

/// Opens a queue in `dir` with a deterministic clock.
pub fn open_queue(dir: &Path) -> ActionQueue {
    ActionQueue::open_with_clock(StateDir::new(dir), fixed_clock(1_700_000_000_000)).unwrap()
}

/// Engine wired to a [`MockRemote`], persisting under `dir`.
pub type MockEngine = SyncEngine<Arc<MockRemote>>;

/// Builds an engine over the state in `dir`.
pub fn engine_in(
    dir: &Path,
    config: EngineConfig,
    monitor: &Arc<ConnectivityMonitor>,
    remote: &Arc<MockRemote>,
) -> Arc<MockEngine> {
    let state = StateDir::new(dir);
    let queue = ActionQueue::open_with_clock(state.clone(), IdClock::new()).unwrap();
    let cache = CacheStore::open(state).unwrap();
    Arc::new(SyncEngine::new(config, queue, cache, Arc::clone(monitor), Arc::clone(remote)))
}

/// A monitor that has observed the given connectivity.
pub fn monitor(online: bool) -> Arc<ConnectivityMonitor> {
    let monitor = Arc::new(ConnectivityMonitor::new());
    if !online {
        monitor.observe(Reachability::Unreachable);
    }
    monitor
}

/// An UpdateProgress payload setting the weight of an entry.
pub fn progress_update(entry_id: &str, weight: i64) -> ActionPayload {
    ActionPayload::update_progress(entry_id, json!({ "weight": weight }))
}

/// Failure injected for a path.
struct Injected {
    error: RemoteError,
    /// Requests to let through before failing.
    skip: usize,
    /// Remaining failures; `None` fails forever.
    remaining: Option<usize>,
}

#[derive(Default)]
struct MockState {
    requests: Vec<RemoteRequest>,
    records: HashMap<String, Value>,
    failures: HashMap<String, Injected>,
    unreachable: bool,
    next_id: u64,
}

/// In-memory stand-in for the fitness API.
///
/// POST assigns a `srv-N` id and stores the document under `<path>/<id>`.
/// PUT merges the body into the stored document and bumps `version`.
/// GET returns whatever was stored or seeded at the path.
#[derive(Default)]
pub struct MockRemote {
    state: Mutex<MockState>,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(MockRemote::default())
    }

    /// Stores `value` at `path`, as if it already existed on the server.
    pub fn seed(&self, path: &str, value: Value) {
        self.state.lock().unwrap().records.insert(path.to_string(), value);
    }

    /// The document stored at `path`.
    pub fn record(&self, path: &str) -> Option<Value> {
        self.state.lock().unwrap().records.get(path).cloned()
    }

    /// Makes every request fail as a connection error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    /// Fails every request to `path` with `error`.
    pub fn fail_always(&self, path: &str, error: RemoteError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(path.to_string(), Injected { error, skip: 0, remaining: None });
    }

    /// Fails the next `times` requests to `path` with `error`.
    pub fn fail_times(&self, path: &str, error: RemoteError, times: usize) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(path.to_string(), Injected { error, skip: 0, remaining: Some(times) });
    }

    /// Lets `successes` requests to `path` through, then fails every later one.
    pub fn fail_after(&self, path: &str, error: RemoteError, successes: usize) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(path.to_string(), Injected { error, skip: successes, remaining: None });
    }

    pub fn requests(&self) -> Vec<RemoteRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Requests rendered as `"METHOD /path"`.
    pub fn calls(&self) -> Vec<String> {
        self.requests().iter().map(ToString::to_string).collect()
    }

    fn respond(&self, request: RemoteRequest) -> RemoteResult<Value> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());

        if state.unreachable {
            return Err(RemoteError::Transient("connection refused".to_string()));
        }
        if let Some(injected) = state.failures.get_mut(&request.path) {
            let error = injected.error.clone();
            if injected.skip > 0 {
                injected.skip -= 1;
            } else {
                match &mut injected.remaining {
                    None => return Err(error),
                    Some(0) => {}
                    Some(n) => {
                        *n -= 1;
                        return Err(error);
                    }
                }
            }
        }

        let body = request.body.unwrap_or(Value::Null);
        match request.method {
            Method::Get => Ok(state.records.get(&request.path).cloned().unwrap_or(Value::Null)),
            Method::Post => {
                state.next_id += 1;
                let id = format!("srv-{}", state.next_id);
                let mut created = body;
                if let Value::Object(fields) = &mut created {
                    fields.insert("id".to_string(), Value::String(id.clone()));
                }
                state.records.insert(format!("{}/{}", request.path, id), created.clone());
                Ok(created)
            }
            Method::Put => {
                state.next_id += 1;
                let version = state.next_id;
                let mut stored = state.records.get(&request.path).cloned().unwrap_or(json!({}));
                if let (Value::Object(fields), Value::Object(changes)) = (&mut stored, body) {
                    fields.extend(changes);
                    fields.insert("version".to_string(), json!(version));
                    // `/collection/{id}` documents carry their id
                    if let Some((_, id)) = request.path.trim_start_matches('/').split_once('/') {
                        let id = urlencoding::decode(id).unwrap().into_owned();
                        fields.entry("id").or_insert_with(|| json!(id));
                    }
                }
                state.records.insert(request.path.clone(), stored.clone());
                Ok(stored)
            }
        }
    }
}

impl Remote for MockRemote {
    fn execute(
        &self,
        request: RemoteRequest,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Value>> + Send + '_>> {
        Box::pin(async move {
            // Suspend like a real network call so concurrent drains interleave
            tokio::task::yield_now().await;
            self.respond(request)
        })
    }
}
