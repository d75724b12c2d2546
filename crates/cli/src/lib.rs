// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! fitsync - offline-first sync for a fitness app's client state.
//!
//! This crate provides the sync engine behind the `fitsync` CLI: local
//! changes are applied to a cache immediately, recorded in a durable queue,
//! and replayed against the REST API when the network allows.
//!
//! # Main Components
//!
//! - [`sync::SyncEngine`] - drains the queue and reconciles the cache
//! - [`sync::ActionQueue`] - durable FIFO log of unsynced actions
//! - [`sync::CacheStore`] - last known server state plus optimistic edits
//! - [`sync::ConnectivityMonitor`] - online/offline transitions
//! - [`Config`] - remote endpoint and sync tunables
//! - [`Error`] - Error types for all operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use fitsync::{commands, Config};
//!
//! let config = Config::load(None)?;
//! let engine = commands::open_engine(&config, &config.state_dir, false)?;
//! engine.update_progress("p1", serde_json::json!({"weight": 80})).await?;
//! ```

mod cli;
pub mod commands;
mod display;

pub mod config;
pub mod error;
pub mod sync;

pub use cli::{Cli, Command, GlobalArgs, OutputArgs};
pub use config::Config;
pub use error::{Error, Result};

/// Execute a CLI command. This is the main entry point for library users
/// and provides a testable way to run commands without process execution.
///
/// Returns the text to print on stdout.
pub fn run(global: &GlobalArgs, command: Command) -> Result<String> {
    let config = Config::load(global.config.as_deref())?;
    let state_dir = global.state_dir.clone().unwrap_or_else(|| config.state_dir.clone());
    let engine = commands::open_engine(&config, &state_dir, global.offline)?;

    // Single-threaded: drains interleave only at remote calls
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(async {
        match command {
            Command::Status { output } => commands::status::run(&engine, output),
            Command::Pending { output } => commands::queue::pending(&engine, output),
            Command::DeadLetters { output } => commands::queue::dead_letters(&engine, output),
            Command::Retry { id } => commands::queue::retry(&engine, &id).await,
            Command::Discard { id } => commands::queue::discard(&engine, &id),
            Command::Record { kind, id, document } => {
                commands::record::run(&engine, kind, id.as_deref(), &document).await
            }
            Command::Sync => commands::sync::run(&engine).await,
            Command::Preload => commands::sync::preload(&engine).await,
            Command::Cache { collection } => commands::cache::show(&engine, collection),
            Command::Reset => commands::cache::reset(&engine),
        }
    })
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
