// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Online/offline tracking with edge-triggered notifications.
//!
//! The platform feeds reachability samples through
//! [`ConnectivityMonitor::observe`]. Subscribers are called only when the
//! online flag actually changes. When the platform cannot tell, the monitor
//! assumes online so queued work is never stranded behind a missing signal.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{info, warn};

/// A reachability sample from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable,
    /// The platform signal is missing or failed.
    Unavailable,
}

impl Reachability {
    /// Whether the engine should treat this sample as online.
    pub fn is_online(self) -> bool {
        !matches!(self, Reachability::Unreachable)
    }
}

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

struct Registry {
    online: bool,
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Tracks connectivity and fans out transitions to subscribers.
pub struct ConnectivityMonitor {
    registry: Arc<Mutex<Registry>>,
}

impl ConnectivityMonitor {
    /// Creates a monitor that assumes online until the first sample.
    pub fn new() -> Self {
        ConnectivityMonitor {
            registry: Arc::new(Mutex::new(Registry {
                online: true,
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Last known connectivity. Never blocks on the platform.
    pub fn is_connected(&self) -> bool {
        self.lock().online
    }

    /// Records a sample, notifying subscribers if the online flag changed.
    pub fn observe(&self, sample: Reachability) {
        if sample == Reachability::Unavailable {
            warn!("reachability signal unavailable, assuming online");
        }
        let online = sample.is_online();

        let listeners: Vec<Listener> = {
            let mut registry = self.lock();
            if registry.online == online {
                return;
            }
            registry.online = online;
            registry.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };

        info!(online, "connectivity changed");
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(online))).is_err() {
                warn!("connectivity listener panicked");
            }
        }
    }

    /// Registers a listener for connectivity transitions.
    ///
    /// The listener stays registered until the returned handle is dropped.
    pub fn subscribe(&self, listener: impl Fn(bool) + Send + Sync + 'static) -> Subscription {
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(listener)));
        Subscription { registry: Arc::downgrade(&self.registry), id }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a registered connectivity listener.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    id: u64,
}

impl Subscription {
    /// Deregisters the listener.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(|e| e.into_inner());
            registry.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
