// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use clap::CommandFactory;
use std::path::PathBuf;
use yare::parameterized;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("fitsync").chain(args.iter().copied())).unwrap()
}

#[test]
fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = parse(&["status", "--offline", "--state-dir", "/tmp/fs", "--verbose"]);
    assert!(cli.global.offline);
    assert!(cli.global.verbose);
    assert_eq!(cli.global.state_dir, Some(PathBuf::from("/tmp/fs")));
    assert!(matches!(cli.command, Command::Status { output } if !output.json));
}

#[test]
fn test_status_json() {
    let cli = parse(&["status", "--json"]);
    assert!(matches!(cli.command, Command::Status { output } if output.json));
}

#[parameterized(
    snake = { "update_progress" },
    kebab = { "update-progress" },
)]
fn test_record_kind_spellings(kind: &str) {
    let cli = parse(&["record", kind, "--id", "p1", "{\"weight\": 80}"]);
    match cli.command {
        Command::Record { kind, id, document } => {
            assert_eq!(kind, ActionKind::UpdateProgress);
            assert_eq!(id.as_deref(), Some("p1"));
            assert_eq!(document, "{\"weight\": 80}");
        }
        _ => unreachable!("parsed a record command"),
    }
}

#[test]
fn test_record_rejects_unknown_kind() {
    let result =
        Cli::try_parse_from(["fitsync", "record", "delete_workout", "{}"]).map(|_| ());
    let err = result.unwrap_err().to_string();
    assert!(err.contains("invalid action kind"));
}

#[test]
fn test_cache_parses_collection() {
    let cli = parse(&["cache", "profile"]);
    assert!(matches!(cli.command, Command::Cache { collection: Collection::Profile }));
    assert!(Cli::try_parse_from(["fitsync", "cache", "meals"]).is_err());
}

#[test]
fn test_dead_letters_command_name() {
    let cli = parse(&["dead-letters"]);
    assert!(matches!(cli.command, Command::DeadLetters { .. }));
}
