// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use yare::parameterized;

/// Mock clock for testing with controllable time.
struct MockClock {
    time_ms: AtomicU64,
}

impl MockClock {
    fn new(initial_ms: u64) -> Arc<Self> {
        Arc::new(MockClock { time_ms: AtomicU64::new(initial_ms) })
    }

    fn set(&self, ms: u64) {
        self.time_ms.store(ms, AtomicOrdering::SeqCst);
    }
}

impl ClockSource for MockClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(AtomicOrdering::SeqCst)
    }
}

#[test]
fn id_ordering() {
    assert!(ActionId::new(200, 0) > ActionId::new(100, 9));
    assert!(ActionId::new(100, 2) > ActionId::new(100, 1));
}

#[test]
fn id_parse_roundtrip() {
    let original = ActionId::new(1_718_000_000_000, 7);
    let parsed: ActionId = original.to_string().parse().unwrap();
    assert_eq!(original, parsed);
}

#[test]
fn id_parse_bare_millis() {
    let id = ActionId::parse("1718000000000").unwrap();
    assert_eq!(id, ActionId::new(1_718_000_000_000, 0));
}

#[parameterized(
    empty = { "" },
    word = { "invalid" },
    bad_seq = { "100-abc" },
    three_parts = { "1-2-3" },
    negative = { "-5" },
)]
fn id_parse_errors(input: &str) {
    assert!(input.parse::<ActionId>().is_err());
}

#[test]
fn id_serializes_as_string() {
    let id = ActionId::new(42, 3);
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"42-3\"");
    let back: ActionId = serde_json::from_str("\"42-3\"").unwrap();
    assert_eq!(back, id);
}

#[test]
fn id_timestamp_matches_wall_clock() {
    let id = ActionId::new(1_700_000_000_123, 0);
    assert_eq!(id.timestamp().timestamp_millis(), 1_700_000_000_123);
}

#[test]
fn clock_advances_with_wall_time() {
    let time = MockClock::new(1000);
    let clock = IdClock::with_clock(Arc::clone(&time));

    assert_eq!(clock.next(), ActionId::new(1000, 0));
    time.set(2000);
    assert_eq!(clock.next(), ActionId::new(2000, 0));
}

#[test]
fn clock_bumps_seq_within_same_millisecond() {
    let time = MockClock::new(1000);
    let clock = IdClock::with_clock(Arc::clone(&time));

    let a = clock.next();
    let b = clock.next();
    let c = clock.next();
    assert_eq!(a, ActionId::new(1000, 0));
    assert_eq!(b, ActionId::new(1000, 1));
    assert_eq!(c, ActionId::new(1000, 2));
}

#[test]
fn clock_stays_monotonic_when_time_goes_backwards() {
    let time = MockClock::new(5000);
    let clock = IdClock::with_clock(Arc::clone(&time));

    let before = clock.next();
    time.set(1000);
    let after = clock.next();
    assert!(after > before);
    assert_eq!(after.wall_ms, 5000);
}

#[test]
fn clock_observe_skips_past_reloaded_ids() {
    let time = MockClock::new(1000);
    let clock = IdClock::with_clock(Arc::clone(&time));

    clock.observe(&ActionId::new(9000, 4));
    let next = clock.next();
    assert_eq!(next, ActionId::new(9000, 5));
}

#[test]
fn clock_observe_ignores_older_ids() {
    let time = MockClock::new(1000);
    let clock = IdClock::with_clock(Arc::clone(&time));

    let first = clock.next();
    clock.observe(&ActionId::new(10, 0));
    assert!(clock.next() > first);
}
