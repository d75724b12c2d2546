// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Time-based identifiers for queued actions.
//!
//! An [`ActionId`] pairs a wall clock reading with a sequence number so that
//! ids are unique and strictly increasing even when several actions are
//! recorded within the same millisecond, or the device clock steps backwards.
//!
//! Format: `{wall_ms}-{seq}`
//!
//! A bare `{wall_ms}` is also accepted when parsing; queues written before
//! ids carried a sequence used that form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Unique, ordered identifier of an offline action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId {
    /// Wall clock time in milliseconds since Unix epoch.
    pub wall_ms: u64,
    /// Tiebreaker for ids minted within the same millisecond.
    pub seq: u32,
}

impl ActionId {
    /// Creates an id from its components.
    pub fn new(wall_ms: u64, seq: u32) -> Self {
        ActionId { wall_ms, seq }
    }

    /// Parses an id from its string representation.
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }

    /// The wall clock component as a UTC timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        i64::try_from(self.wall_ms)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_default()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.wall_ms, self.seq)
    }
}

impl FromStr for ActionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (wall, seq) = match s.split_once('-') {
            Some((wall, seq)) => (wall, Some(seq)),
            None => (s, None),
        };

        let wall_ms = wall
            .parse::<u64>()
            .map_err(|_| Error::InvalidActionId(format!("invalid wall_ms '{wall}' in '{s}'")))?;

        let seq = match seq {
            Some(seq) => seq
                .parse::<u32>()
                .map_err(|_| Error::InvalidActionId(format!("invalid seq '{seq}' in '{s}'")))?,
            None => 0,
        };

        Ok(ActionId::new(wall_ms, seq))
    }
}

impl Serialize for ActionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ActionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Trait for getting the current wall clock time.
///
/// This allows injecting a mock clock for testing.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;
}

/// System clock implementation using `std::time::SystemTime`.
#[derive(Debug, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
    }
}

impl<C: ClockSource + ?Sized> ClockSource for Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Generator of monotonically increasing [`ActionId`]s.
pub struct IdClock {
    clock: Box<dyn ClockSource>,
    last: Mutex<ActionId>,
}

impl IdClock {
    /// Creates a clock backed by the system time.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Creates a clock with a custom time source.
    pub fn with_clock(clock: impl ClockSource + 'static) -> Self {
        IdClock { clock: Box::new(clock), last: Mutex::new(ActionId::new(0, 0)) }
    }

    /// Mints a new id, strictly greater than every id minted or observed
    /// before it.
    pub fn next(&self) -> ActionId {
        let physical = self.clock.now_ms();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());

        let id = if physical > last.wall_ms {
            ActionId::new(physical, 0)
        } else {
            // Clock stalled or went backwards: stay on the last wall time
            ActionId::new(last.wall_ms, last.seq.saturating_add(1))
        };

        *last = id;
        id
    }

    /// Advances the clock past an id that was minted elsewhere, such as one
    /// reloaded from disk after a restart.
    pub fn observe(&self, seen: &ActionId) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if *seen > *last {
            *last = *seen;
        }
    }
}

impl Default for IdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "action_id_tests.rs"]
mod tests;
