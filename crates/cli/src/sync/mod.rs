// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline-first sync engine.
//!
//! Local mutations are applied to the cache immediately and recorded in a
//! durable action queue. When connectivity allows, the engine replays the
//! queue against the remote API and reconciles the cache with the server's
//! answers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  SyncEngine  │────►│   Remote    │────►│  REST API   │
//! │   (drain)    │◄────│   (trait)   │◄────│             │
//! └──────────────┘     └─────────────┘     └─────────────┘
//!    │    │    ▲
//!    │    │    │ transitions
//!    ▼    ▼    │
//! ┌───────┐ ┌───────┐ ┌──────────────┐
//! │ Queue │ │ Cache │ │ Connectivity │
//! └───────┘ └───────┘ └──────────────┘
//!     │         │
//!     ▼         ▼
//!  StateDir (atomic JSON records)
//! ```
//!
//! # Features
//!
//! - Durable FIFO queue; an action is on disk before `enqueue` returns
//! - Per-entity ordering: a failed action holds back later actions on the
//!   same entity but not unrelated ones
//! - Dead-lettering after repeated rejections
//! - Single-flight drains with coalesced re-runs
//! - Injectable remote trait for testing

mod cache;
mod connectivity;
mod engine;
mod queue;
mod remote;
mod storage;

pub use cache::CacheStore;
pub use connectivity::{ConnectivityMonitor, Reachability, Subscription};
pub use engine::{
    DrainOutcome, DrainReport, EngineConfig, EngineHandle, EngineState, PreloadOutcome,
    PreloadReport, SyncEngine, SyncError, SyncResult, SyncStatus,
};
pub use queue::{ActionQueue, QueueEntry, UnrecognizedAction};
pub use remote::{HttpRemote, Method, Remote, RemoteError, RemoteRequest, RemoteResult};
pub use storage::{StateDir, StoreError, StoreResult};

#[cfg(test)]
pub(crate) mod test_helpers;






#[cfg(test)]
mod remote_tests;
