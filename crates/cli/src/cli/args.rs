// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared argument structs for CLI commands.
//!
//! These are flattened into the top-level parser so every subcommand
//! accepts them.

use clap::Args;
use std::path::PathBuf;

/// Options that apply to every command.
#[derive(Args, Clone, Debug, Default)]
pub struct GlobalArgs {
    /// Read configuration from <path> instead of the default location
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Keep the queue and cache in <dir> (overrides state_dir)
    #[arg(long, global = true, value_name = "dir")]
    pub state_dir: Option<PathBuf>,

    /// Treat the network as unreachable; nothing is sent
    #[arg(long, global = true)]
    pub offline: bool,

    /// Log debug detail (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Write logs to <path> instead of stderr
    #[arg(long, global = true, value_name = "path")]
    pub log_file: Option<PathBuf>,
}

/// Output selection for listing commands.
#[derive(Args, Clone, Copy, Debug, Default)]
pub struct OutputArgs {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}
