// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use fitsync_core::{ActionId, Collection};

#[test]
fn test_error_config_display() {
    let err = Error::Config("sync.max_attempts must be at least 1".to_string());
    assert_eq!(err.to_string(), "config error: sync.max_attempts must be at least 1");
}

#[test]
fn test_error_invalid_document_has_hint() {
    let err = Error::InvalidDocument("expected value at line 1 column 1".to_string());
    let msg = err.to_string();
    assert!(msg.contains("invalid json document"));
    assert!(msg.contains("hint:"));
}

#[test]
fn test_error_id_required_display() {
    let err = Error::IdRequired { kind: "update_progress" };
    assert_eq!(err.to_string(), "--id is required for update_progress");
}

#[test]
fn test_error_from_core_keeps_hint() {
    let core = "meals".parse::<Collection>().unwrap_err();
    let err = Error::from(core);
    assert!(err.to_string().contains("invalid collection: 'meals'"));
    assert!(err.to_string().contains("hint: valid collections"));
}

#[test]
fn test_error_from_sync_is_transparent() {
    let id = ActionId::new(1_700_000_000_000, 2);
    let err = Error::from(SyncError::NotDeadLettered(id));
    let msg = err.to_string();
    assert!(msg.contains("1700000000000-2"));
    assert!(msg.contains("only dead-lettered actions can be retried"));
}

#[test]
fn test_error_from_store_suggests_reset() {
    let err = Error::from(StoreError::UnsupportedSchema {
        key: "cached_data".to_string(),
        found: 7,
        supported: 1,
    });
    assert!(err.to_string().contains("fitsync reset"));
}
