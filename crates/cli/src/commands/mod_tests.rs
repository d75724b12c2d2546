// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Test infrastructure for command testing.
//!
//! This module provides a `TestContext` that opens an engine over a
//! temporary state directory, so commands can be exercised without touching
//! the user's real queue and cache.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::commands::testing::TestContext;
//!
//! #[tokio::test]
//! async fn test_some_command() {
//!     let ctx = TestContext::new();
//!     ctx.engine.update_profile(json!({"bio": "runner"})).await.unwrap();
//!
//!     // Test command logic using ctx.engine
//! }
//! ```

use crate::config::Config;
use crate::sync::SyncEngine;
use std::path::PathBuf;
use tempfile::TempDir;

use super::open_engine;

/// Nothing listens on port 1, so requests fail fast as transient errors.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

/// Test context providing an engine over a temporary state directory.
pub struct TestContext {
    pub engine: SyncEngine,
    pub config: Config,
    pub state_dir: PathBuf,
    _temp_dir: TempDir, // Keep alive for duration of test
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// Create a context whose engine is offline.
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Create a context whose engine is online against an unreachable API.
    pub fn online() -> Self {
        Self::build(false)
    }

    /// Reopen the engine over the same state, as a new process would.
    pub fn reopen(&mut self, offline: bool) {
        self.engine = open_engine(&self.config, &self.state_dir, offline).unwrap();
    }

    fn build(offline: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let state_dir = temp_dir.path().join("state");
        let mut config = Config::default();
        config.remote.base_url = UNREACHABLE_URL.to_string();
        config.remote.timeout_secs = 2;
        config.state_dir = state_dir.clone();

        let engine = open_engine(&config, &state_dir, offline).expect("Failed to open engine");
        TestContext { engine, config, state_dir, _temp_dir: temp_dir }
    }
}

#[test]
fn test_open_engine_offline_flag() {
    let ctx = TestContext::new();
    assert!(!ctx.engine.is_connected());

    let online = TestContext::online();
    assert!(online.engine.is_connected());
}

#[test]
fn test_open_engine_uses_engine_config() {
    let mut ctx = TestContext::new();
    ctx.config.sync.max_attempts = 9;
    ctx.reopen(true);
    assert_eq!(ctx.engine.config().max_attempts, 9);
}
