// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod args;

use clap::{Parser, Subcommand};

use fitsync_core::{ActionKind, Collection};

pub use args::{GlobalArgs, OutputArgs};

/// Parse an action kind, accepting `update-progress` as well as `update_progress`.
fn parse_kind(s: &str) -> Result<ActionKind, String> {
    s.replace('-', "_").parse().map_err(|e: fitsync_core::Error| e.to_string())
}

fn parse_collection(s: &str) -> Result<Collection, String> {
    s.parse().map_err(|e: fitsync_core::Error| e.to_string())
}

#[derive(Parser)]
#[command(name = "fitsync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-first sync for workouts, exercises, progress and profile data")]
#[command(
    long_about = "Offline-first sync for workouts, exercises, progress and profile data.\n\n\
    Changes are applied to the local cache at once and queued durably. The queue is replayed \
    against the API whenever the network is reachable."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show connectivity, queue depth, dead letters and cache size
    Status {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List unsynced actions in the order they will be sent
    Pending {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List actions the remote rejected too many times
    #[command(name = "dead-letters")]
    DeadLetters {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Return a dead-lettered action to the queue and sync
    #[command(arg_required_else_help = true)]
    Retry {
        /// Action id, as shown by `pending` or `dead-letters`
        id: String,
    },

    /// Drop a queued action without sending it
    #[command(arg_required_else_help = true)]
    Discard {
        /// Action id, as shown by `pending` or `dead-letters`
        id: String,
    },

    /// Record a change offline-first
    #[command(arg_required_else_help = true)]
    #[command(after_help = "\
Examples:
  fitsync record create_workout '{\"name\": \"Leg day\"}'
  fitsync record update_workout --id w1 '{\"sets\": 4}'
  fitsync record create_exercise '{\"name\": \"Ring row\"}'
  fitsync record update_progress --id p1 '{\"weight\": 80}'
  fitsync record update_profile '{\"bio\": \"runner\"}'")]
    Record {
        /// Action kind: create_workout, update_workout, create_exercise,
        /// update_progress or update_profile
        #[arg(value_parser = parse_kind)]
        kind: ActionKind,

        /// Id of the record to update (update_workout, update_progress)
        #[arg(long)]
        id: Option<String>,

        /// The record, or the changed fields, as a JSON object
        document: String,
    },

    /// Send queued actions now
    Sync,

    /// Refresh exercises, recent workouts and the profile from the API
    Preload,

    /// Print a cached collection
    #[command(arg_required_else_help = true)]
    Cache {
        /// workouts, exercises, progress or profile
        #[arg(value_parser = parse_collection)]
        collection: Collection,
    },

    /// Delete the local queue and cache
    Reset,
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
