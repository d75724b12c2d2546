// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod cache;
pub mod queue;
pub mod record;
pub mod status;
pub mod sync;

#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::sync::{
    ActionQueue, CacheStore, ConnectivityMonitor, HttpRemote, Reachability, StateDir, SyncEngine,
};

/// Opens the engine over the state in `state_dir`.
///
/// The CLI has no platform reachability signal: without `offline` the
/// monitor sees `Unavailable`, which counts as online.
pub fn open_engine(config: &Config, state_dir: &Path, offline: bool) -> Result<SyncEngine> {
    let state = StateDir::new(state_dir);
    let queue = ActionQueue::open(state.clone())?;
    let cache = CacheStore::open(state)?;

    let monitor = Arc::new(ConnectivityMonitor::new());
    monitor.observe(if offline { Reachability::Unreachable } else { Reachability::Unavailable });

    let remote = HttpRemote::new(
        config.remote.base_url.as_str(),
        config.timeout(),
        config.remote.auth_token.clone(),
    )?;
    debug!(state_dir = %state_dir.display(), base_url = remote.base_url(), offline, "engine opened");

    Ok(SyncEngine::new(config.engine_config(), queue, cache, monitor, remote))
}
