// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// Port 1 refuses connections, so requests fail fast as unreachable.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

pub fn fitsync() -> Command {
    cargo_bin_cmd!("fitsync")
}

/// Helper to create a temp directory holding a config file that points at
/// an unreachable API and keeps state under `state/`.
pub fn init_temp() -> TempDir {
    let temp = TempDir::new().unwrap();
    let config = format!(
        "state_dir = {:?}\n\n[remote]\nbase_url = {:?}\ntimeout_secs = 2\n",
        temp.path().join("state").display().to_string(),
        UNREACHABLE_URL
    );
    std::fs::write(temp.path().join("config.toml"), config).unwrap();
    temp
}

/// A command bound to the temp config.
pub fn fitsync_in(temp: &TempDir) -> Command {
    let mut cmd = fitsync();
    cmd.arg("--config").arg(temp.path().join("config.toml"));
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Helper to record a change offline and return the command's stdout.
pub fn record(temp: &TempDir, args: &[&str]) -> String {
    let output = fitsync_in(temp)
        .arg("--offline")
        .arg("record")
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
