// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! fitsync-core: Domain model for the fitsync offline sync engine
//!
//! This crate provides the offline action types, the action id clock, and
//! the conflict resolver used by the sync engine in the fitsync crate. It
//! performs no I/O.

pub mod action;
pub mod action_id;
pub mod error;
pub mod resolve;

pub use action::{
    ActionKind, ActionPayload, ActionStatus, Collection, EntityKey, OfflineAction,
    PROFILE_ENTITY_ID,
};
pub use action_id::{ActionId, ClockSource, IdClock, SystemClock};
pub use error::{Error, Result};
pub use resolve::{resolve, resolve_at, ConflictStrategy, UPDATED_AT_FIELD};
