// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::OutputArgs;
use crate::display::format_status;
use crate::error::Result;
use crate::sync::{Remote, SyncEngine};

/// Renders the diagnostics snapshot. Never touches the network.
pub fn run<R: Remote>(engine: &SyncEngine<R>, output: OutputArgs) -> Result<String> {
    let status = engine.status();
    if output.json {
        return Ok(serde_json::to_string_pretty(&status)?);
    }
    Ok(format_status(&status))
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
