// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Route invalidation signal.
//!
//! The web layer caches a dispatch table keyed by active type names. After
//! any change to the set of active types the engine pokes the
//! [`RouteInvalidator`] so that table is rebuilt. The signal is
//! deliberately payload-free; the routing layer re-reads the registry.

use std::sync::atomic::{AtomicU64, Ordering};

/// Receiver of the "active type set changed" signal.
pub trait RouteInvalidator: Send + Sync {
    /// The set of active types changed; cached routes are stale.
    fn invalidate(&self);
}

/// Invalidator that drops the signal. Default when no routing layer exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullInvalidator;

impl RouteInvalidator for NullInvalidator {
    fn invalidate(&self) {}
}

/// Invalidator that counts signals. Used by tests and health endpoints.
#[derive(Debug, Default)]
pub struct CountingInvalidator {
    count: AtomicU64,
}

impl CountingInvalidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl RouteInvalidator for CountingInvalidator {
    fn invalidate(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_invalidator_tallies_signals() {
        let inv = CountingInvalidator::new();
        assert_eq!(inv.count(), 0);
        inv.invalidate();
        inv.invalidate();
        assert_eq!(inv.count(), 2);
    }
}
