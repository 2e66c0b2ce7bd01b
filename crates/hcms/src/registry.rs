// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide registry of active content types.
//!
//! The registry is the single shared mutable resource of the engine. An
//! install replaces any previous entry for the same id under one write
//! lock, so concurrent readers observe either the old unit or the new one,
//! never both and never a gap. Teardown of a displaced unit is the
//! caller's job (the lifecycle coordinator does it outside the lock).

use crate::service::ActiveType;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Registry operation counters. Relaxed ordering; observability only.
#[derive(Debug, Default)]
pub struct RegistryMetrics {
    installs: AtomicU64,
    displacements: AtomicU64,
    removals: AtomicU64,
    lookups: AtomicU64,
    misses: AtomicU64,
}

impl RegistryMetrics {
    #[must_use]
    pub fn installs(&self) -> u64 {
        self.installs.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn displacements(&self) -> u64 {
        self.displacements.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn removals(&self) -> u64 {
        self.removals.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Map from schema id to its active handling unit.
pub struct TypeRegistry {
    entries: RwLock<HashMap<u32, Arc<ActiveType>>>,
    metrics: RegistryMetrics,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            metrics: RegistryMetrics::default(),
        }
    }

    /// Install a unit, atomically replacing any entry with the same id.
    /// Returns the displaced unit so the caller can tear it down.
    pub fn install(&self, unit: Arc<ActiveType>) -> Option<Arc<ActiveType>> {
        let id = unit.id();
        let displaced = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            entries.insert(id, unit)
        };
        self.metrics.installs.fetch_add(1, Ordering::Relaxed);
        if displaced.is_some() {
            self.metrics.displacements.fetch_add(1, Ordering::Relaxed);
            log::debug!("[REGISTRY] replaced type {id}");
        } else {
            log::debug!("[REGISTRY] installed type {id}");
        }
        displaced
    }

    /// Remove a unit by id. `None` when the id was not active.
    pub fn remove(&self, id: u32) -> Option<Arc<ActiveType>> {
        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            entries.remove(&id)
        };
        if removed.is_some() {
            self.metrics.removals.fetch_add(1, Ordering::Relaxed);
            log::debug!("[REGISTRY] removed type {id}");
        }
        removed
    }

    /// Look an active unit up by schema id.
    #[must_use]
    pub fn lookup(&self, id: u32) -> Option<Arc<ActiveType>> {
        self.metrics.lookups.fetch_add(1, Ordering::Relaxed);
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let hit = entries.get(&id).cloned();
        if hit.is_none() {
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    /// Look an active unit up by internal type name.
    #[must_use]
    pub fn lookup_by_name(&self, name: &str) -> Option<Arc<ActiveType>> {
        self.metrics.lookups.fetch_add(1, Ordering::Relaxed);
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let hit = entries.values().find(|u| u.name() == name).cloned();
        if hit.is_none() {
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(&id)
    }

    /// Point-in-time copy of every active unit, sorted by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<ActiveType>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut units: Vec<_> = entries.values().cloned().collect();
        units.sort_by_key(|u| u.id());
        units
    }

    /// Active schema ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<u32> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<_> = entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn metrics(&self) -> &RegistryMetrics {
        &self.metrics
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("active", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::config::EngineConfig;
    use crate::schema::{FieldKind, SchemaBuilder};
    use crate::service::{instantiate, AllowAll, MemoryStore};

    fn unit(id: u32, name: &str) -> Arc<ActiveType> {
        let rows = SchemaBuilder::new(id, name)
            .field("title", FieldKind::Text)
            .build();
        let shape =
            compile(&rows.descriptor, &rows.fields, &EngineConfig::default()).expect("compile");
        let store = Arc::new(MemoryStore::for_type(shape.name()));
        Arc::new(instantiate(shape, store, Arc::new(AllowAll)).expect("instantiate"))
    }

    #[test]
    fn install_then_lookup_by_id_and_name() {
        let registry = TypeRegistry::new();
        assert!(registry.install(unit(5, "feedback")).is_none());
        assert_eq!(registry.lookup(5).map(|u| u.id()), Some(5));
        assert_eq!(
            registry.lookup_by_name("feedback").map(|u| u.id()),
            Some(5)
        );
        assert!(registry.lookup(6).is_none());
        assert_eq!(registry.metrics().installs(), 1);
        assert_eq!(registry.metrics().misses(), 1);
    }

    #[test]
    fn reinstall_hands_back_the_displaced_unit() {
        let registry = TypeRegistry::new();
        let old = unit(5, "feedback");
        registry.install(old.clone());
        let displaced = registry.install(unit(5, "feedback")).expect("displaced");
        assert!(Arc::ptr_eq(&displaced, &old));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.metrics().displacements(), 1);
    }

    #[test]
    fn remove_is_a_noop_for_absent_ids() {
        let registry = TypeRegistry::new();
        registry.install(unit(5, "feedback"));
        assert!(registry.remove(99).is_none());
        assert_eq!(registry.metrics().removals(), 0);
        assert!(registry.remove(5).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_sorted_and_detached() {
        let registry = TypeRegistry::new();
        registry.install(unit(9, "c"));
        registry.install(unit(2, "a"));
        registry.install(unit(4, "b"));
        let snap = registry.snapshot();
        let ids: Vec<u32> = snap.iter().map(|u| u.id()).collect();
        assert_eq!(ids, [2, 4, 9]);

        registry.remove(4);
        // The snapshot still holds the removed unit
        assert_eq!(snap.len(), 3);
        assert_eq!(registry.ids(), [2, 9]);
    }
}
