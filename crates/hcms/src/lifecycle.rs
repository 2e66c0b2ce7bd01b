// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lifecycle coordinator: loads, reloads and unloads content types.
//!
//! [`TypeEngine`] ties the pieces together. It reads rows from the
//! [`SchemaSource`], compiles them, binds handling units and installs them
//! in the [`TypeRegistry`], then pokes the [`RouteInvalidator`].
//!
//! Transitions for the same schema id are serialized through a per-id lock
//! table; transitions for distinct ids run in parallel. A failed reload
//! leaves the previously active unit installed and untouched.

use crate::compile::{compile, ConstructedType};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::registry::TypeRegistry;
use crate::routes::{NullInvalidator, RouteInvalidator};
use crate::schema::{FieldDescriptor, SchemaDescriptor};
use crate::service::{instantiate, AccessPolicy, ActiveType, AllowAll, ContentStore, MemoryStore};
use crate::source::{ListOptions, SchemaSource};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Replication action codes, as carried on the sync channel between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SyncAction {
    Created = 1,
    Updated = 2,
    Deleted = 3,
}

impl SyncAction {
    /// Decode a wire action code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Created),
            2 => Some(Self::Updated),
            3 => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// Outcome of a bulk load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Types compiled, bound and installed.
    pub loaded: usize,
    /// Types skipped because compilation or binding failed.
    pub failed: usize,
    /// Field rows dropped because their owning schema row was absent.
    pub orphaned_fields: usize,
}

type StoreFactory = Box<dyn Fn(&ConstructedType) -> Arc<dyn ContentStore> + Send + Sync>;

/// Builder for [`TypeEngine`]. Obtained via [`TypeEngine::builder`].
pub struct TypeEngineBuilder {
    source: Arc<dyn SchemaSource>,
    config: EngineConfig,
    invalidator: Arc<dyn RouteInvalidator>,
    policy: Arc<dyn AccessPolicy>,
    store_factory: StoreFactory,
}

impl TypeEngineBuilder {
    /// Override the default configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Wire the routing layer's invalidation signal.
    #[must_use]
    pub fn invalidator(mut self, invalidator: Arc<dyn RouteInvalidator>) -> Self {
        self.invalidator = invalidator;
        self
    }

    /// Access policy applied to every handling unit.
    #[must_use]
    pub fn policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Factory producing one store per handling unit. The factory runs on
    /// every load and reload, so a persistent backend should hand out
    /// handles to shared state rather than fresh empty stores.
    #[must_use]
    pub fn store_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ConstructedType) -> Arc<dyn ContentStore> + Send + Sync + 'static,
    {
        self.store_factory = Box::new(factory);
        self
    }

    #[must_use]
    pub fn build(self) -> TypeEngine {
        TypeEngine {
            source: self.source,
            config: self.config,
            invalidator: self.invalidator,
            policy: self.policy,
            store_factory: self.store_factory,
            registry: Arc::new(TypeRegistry::new()),
            transitions: Mutex::new(HashMap::new()),
            epoch: AtomicU64::new(0),
        }
    }
}

/// The content-type engine.
///
/// Shared across threads behind an `Arc`; every public method takes
/// `&self`.
pub struct TypeEngine {
    source: Arc<dyn SchemaSource>,
    config: EngineConfig,
    invalidator: Arc<dyn RouteInvalidator>,
    policy: Arc<dyn AccessPolicy>,
    store_factory: StoreFactory,
    registry: Arc<TypeRegistry>,
    /// Per-id transition locks, created on first use and kept forever.
    /// Ids are few (one per content type) so the table never shrinks.
    transitions: Mutex<HashMap<u32, Arc<Mutex<()>>>>,
    epoch: AtomicU64,
}

impl TypeEngine {
    /// Start building an engine on top of a schema source.
    #[must_use]
    pub fn builder(source: Arc<dyn SchemaSource>) -> TypeEngineBuilder {
        TypeEngineBuilder {
            source,
            config: EngineConfig::default(),
            invalidator: Arc::new(NullInvalidator),
            policy: Arc::new(AllowAll),
            store_factory: Box::new(|shape| Arc::new(MemoryStore::for_type(shape.name()))),
        }
    }

    /// The registry of active types.
    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Monotonic counter bumped on every change to the active set.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Every active unit, sorted by id.
    #[must_use]
    pub fn active_types(&self) -> Vec<Arc<ActiveType>> {
        self.registry.snapshot()
    }

    /// Map of schema id to active compiled shape, for introspection.
    #[must_use]
    pub fn active_shapes(&self) -> HashMap<u32, Arc<ConstructedType>> {
        self.registry
            .snapshot()
            .into_iter()
            .map(|unit| (unit.id(), unit.shape().clone()))
            .collect()
    }

    fn transition_lock(&self, id: u32) -> Arc<Mutex<()>> {
        let mut table = self.transitions.lock().unwrap_or_else(|e| e.into_inner());
        table.entry(id).or_default().clone()
    }

    /// Compile, bind and install one type from already-fetched rows.
    /// The caller holds the per-id transition lock.
    fn activate(
        &self,
        descriptor: &SchemaDescriptor,
        fields: &[FieldDescriptor],
    ) -> Result<()> {
        let shape = compile(descriptor, fields, &self.config)?;
        let store = (self.store_factory)(&shape);
        let unit = Arc::new(instantiate(shape, store, self.policy.clone())?);
        let displaced = self.registry.install(unit);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        // Teardown happens after the swap; readers never see a gap
        if let Some(old) = displaced {
            old.service.shutdown();
        }
        Ok(())
    }

    /// Load or reload one type from the source.
    ///
    /// On any failure the previously active unit, if there was one, stays
    /// installed. A descriptor carrying the soft-delete flag unloads the
    /// type instead.
    pub fn load_type(&self, id: u32) -> Result<()> {
        let lock = self.transition_lock(id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        let started = Instant::now();

        let rows = self.source.fetch(id, &ListOptions::engine())?;
        if rows.descriptor.deleted {
            log::debug!("[ENGINE] type {id} is soft-deleted, unloading");
            self.deactivate(id);
            return Ok(());
        }
        self.activate(&rows.descriptor, &rows.fields)?;
        self.invalidator.invalidate();

        let elapsed = started.elapsed();
        if self.config.log_slow_reload_ms > 0
            && elapsed.as_millis() as u64 > self.config.log_slow_reload_ms
        {
            log::warn!(
                "[ENGINE] slow reload of type {id}: {} ms",
                elapsed.as_millis()
            );
        } else {
            log::info!("[ENGINE] loaded type '{}' (id {id})", rows.descriptor.name);
        }
        Ok(())
    }

    /// Install one type from a descriptor row the caller already holds,
    /// typically the row the admin layer just persisted. Field rows are
    /// still read fresh from the source; an in-memory field list can be
    /// stale by the time the transition runs. A soft-deleted descriptor
    /// unloads instead.
    pub fn load_descriptor(&self, descriptor: &SchemaDescriptor) -> Result<()> {
        let lock = self.transition_lock(descriptor.id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        if descriptor.deleted {
            log::debug!(
                "[ENGINE] descriptor for type {} is soft-deleted, unloading",
                descriptor.id
            );
            self.deactivate(descriptor.id);
            return Ok(());
        }
        let fields = self.source.fields_of(descriptor.id, &ListOptions::engine())?;
        self.activate(descriptor, &fields)?;
        self.invalidator.invalidate();
        log::info!(
            "[ENGINE] loaded type '{}' (id {}) from caller descriptor",
            descriptor.name,
            descriptor.id
        );
        Ok(())
    }

    fn deactivate(&self, id: u32) -> bool {
        match self.registry.remove(id) {
            Some(unit) => {
                self.epoch.fetch_add(1, Ordering::AcqRel);
                unit.service.shutdown();
                self.invalidator.invalidate();
                log::info!("[ENGINE] unloaded type '{}' (id {id})", unit.name());
                true
            }
            None => false,
        }
    }

    /// Remove a type from the active set.
    ///
    /// Returns whether anything was removed. Unloading an absent id is a
    /// no-op and fires no invalidation.
    pub fn unload_type(&self, id: u32) -> bool {
        let lock = self.transition_lock(id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        self.deactivate(id)
    }

    /// Load every non-deleted type from the source in two bulk reads.
    ///
    /// Field rows are joined to their descriptors client side; rows whose
    /// owner is missing are dropped and counted. A type that fails to
    /// compile is skipped and counted, the rest still load. Exactly one
    /// invalidation fires, after all installs.
    ///
    /// Meant to run once at startup against an empty registry; running it
    /// against a non-empty registry reloads what it finds and logs a
    /// warning.
    pub fn load_all(&self) -> Result<LoadReport> {
        if !self.registry.is_empty() {
            log::warn!(
                "[ENGINE] bulk load over {} already-active type(s)",
                self.registry.len()
            );
        }
        let opts = ListOptions::engine();
        let descriptors = self.source.list_schemas(&opts)?;
        let all_fields = self.source.list_fields(&opts)?;

        let mut by_owner: HashMap<u32, Vec<FieldDescriptor>> = HashMap::new();
        for field in all_fields {
            by_owner.entry(field.schema_id).or_default().push(field);
        }

        let mut report = LoadReport::default();
        for descriptor in &descriptors {
            let fields = by_owner.remove(&descriptor.id).unwrap_or_default();
            let lock = self.transition_lock(descriptor.id);
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            match self.activate(descriptor, &fields) {
                Ok(()) => report.loaded += 1,
                Err(err) => {
                    report.failed += 1;
                    log::error!(
                        "[ENGINE] skipping type '{}' (id {}): {err}",
                        descriptor.name,
                        descriptor.id
                    );
                }
            }
        }
        report.orphaned_fields = by_owner.values().map(Vec::len).sum();
        if report.orphaned_fields > 0 {
            log::warn!(
                "[ENGINE] dropped {} field row(s) with no owning schema",
                report.orphaned_fields
            );
        }

        self.invalidator.invalidate();
        log::info!(
            "[ENGINE] bulk load: {} loaded, {} failed",
            report.loaded,
            report.failed
        );
        Ok(report)
    }

    /// Apply a replicated change from another node.
    pub fn apply_remote(&self, id: u32, action: SyncAction) -> Result<()> {
        log::debug!("[ENGINE] remote sync: type {id} {action:?}");
        match action {
            SyncAction::Created | SyncAction::Updated => self.load_type(id),
            SyncAction::Deleted => {
                self.unload_type(id);
                Ok(())
            }
        }
    }

    /// Apply a replicated change from its wire action code. Unknown codes
    /// are logged and ignored.
    pub fn apply_remote_code(&self, id: u32, code: u8) -> Result<()> {
        match SyncAction::from_code(code) {
            Some(action) => self.apply_remote(id, action),
            None => {
                log::warn!("[ENGINE] ignoring unknown sync action {code} for type {id}");
                Ok(())
            }
        }
    }

    /// Tear down every active unit. One invalidation fires if anything
    /// was removed.
    pub fn shutdown(&self) {
        let mut removed = 0usize;
        for id in self.registry.ids() {
            let lock = self.transition_lock(id);
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(unit) = self.registry.remove(id) {
                self.epoch.fetch_add(1, Ordering::AcqRel);
                unit.service.shutdown();
                removed += 1;
            }
        }
        if removed > 0 {
            self.invalidator.invalidate();
        }
        log::info!("[ENGINE] shutdown: {removed} type(s) unloaded");
    }
}

impl std::fmt::Debug for TypeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeEngine")
            .field("name", &self.config.name)
            .field("active", &self.registry.len())
            .field("epoch", &self.epoch())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::CountingInvalidator;
    use crate::schema::{FieldKind, SchemaBuilder};

    use crate::source::MemorySource;

    fn engine_with(source: &Arc<MemorySource>) -> (TypeEngine, Arc<CountingInvalidator>) {
        let invalidator = Arc::new(CountingInvalidator::new());
        let engine = TypeEngine::builder(source.clone())
            .invalidator(invalidator.clone())
            .build();
        (engine, invalidator)
    }

    fn fixture() -> Arc<MemorySource> {
        let source = Arc::new(MemorySource::new());
        source.put_schema(
            SchemaBuilder::new(5, "feedback")
                .field("rating", FieldKind::Number)
                .field("comment", FieldKind::Text)
                .build(),
        );
        source
    }

    #[test]
    fn load_then_unload_round_trip() {
        let fx = fixture();
        let (engine, invalidator) = engine_with(&fx);
        engine.load_type(5).expect("load");
        assert!(engine.registry().contains(5));
        assert_eq!(invalidator.count(), 1);

        assert!(engine.unload_type(5));
        assert!(!engine.registry().contains(5));
        assert_eq!(invalidator.count(), 2);
    }

    #[test]
    fn unloading_an_absent_id_fires_nothing() {
        let fx = fixture();
        let (engine, invalidator) = engine_with(&fx);
        assert!(!engine.unload_type(99));
        assert_eq!(invalidator.count(), 0);
        assert_eq!(engine.epoch(), 0);
    }

    #[test]
    fn reload_replaces_and_tears_down_the_old_unit() {
        let fx = fixture();
        let (engine, _) = engine_with(&fx);
        engine.load_type(5).expect("load");
        let old = engine.registry().lookup(5).expect("active");

        fx.put_schema(
            SchemaBuilder::new(5, "feedback")
                .field("rating", FieldKind::Number)
                .field("comment", FieldKind::Text)
                .field("reviewed", FieldKind::Boolean)
                .build(),
        );
        engine.load_type(5).expect("reload");

        let new = engine.registry().lookup(5).expect("active");
        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(new.shape().field_count(), 3);
        assert!(!old.service.is_live());
        assert!(new.service.is_live());
    }

    #[test]
    fn failed_reload_keeps_the_active_unit() {
        let fx = fixture();
        let (engine, invalidator) = engine_with(&fx);
        engine.load_type(5).expect("load");
        let before = engine.registry().lookup(5).expect("active");

        fx.set_offline(true);
        assert!(engine.load_type(5).is_err());
        fx.set_offline(false);

        let after = engine.registry().lookup(5).expect("still active");
        assert!(Arc::ptr_eq(&before, &after));
        assert!(after.service.is_live());
        // Only the successful load invalidated
        assert_eq!(invalidator.count(), 1);
    }

    #[test]
    fn soft_deleted_descriptor_unloads() {
        let fx = fixture();
        let (engine, _) = engine_with(&fx);
        engine.load_type(5).expect("load");

        let mut rows = SchemaBuilder::new(5, "feedback").build();
        rows.descriptor.deleted = true;
        fx.put_schema(rows);
        let all = ListOptions {
            include_deleted: true,
            ..ListOptions::engine()
        };
        // fetch still sees the row; load_type must translate it to an unload
        assert!(fx.fetch(5, &all).is_ok());
        engine.load_type(5).expect("load of deleted row");
        assert!(!engine.registry().contains(5));
    }

    #[test]
    fn load_descriptor_reads_fields_fresh() {
        let fx = fixture();
        let (engine, invalidator) = engine_with(&fx);

        // The caller's row predates a field added by another writer
        let descriptor = crate::schema::SchemaDescriptor::new(5, "feedback");
        fx.put_schema(
            SchemaBuilder::new(5, "feedback")
                .field("rating", FieldKind::Number)
                .field("comment", FieldKind::Text)
                .field("reviewed", FieldKind::Boolean)
                .build(),
        );
        engine.load_descriptor(&descriptor).expect("load");
        let unit = engine.registry().lookup(5).expect("active");
        assert_eq!(unit.shape().field_count(), 3);
        assert_eq!(invalidator.count(), 1);

        // A soft-deleted descriptor unloads instead
        let mut retired = crate::schema::SchemaDescriptor::new(5, "feedback");
        retired.deleted = true;
        engine.load_descriptor(&retired).expect("unload");
        assert!(!engine.registry().contains(5));
    }

    #[test]
    fn remote_action_codes_map_to_transitions() {
        let fx = fixture();
        let (engine, _) = engine_with(&fx);
        engine.apply_remote_code(5, 1).expect("created");
        assert!(engine.registry().contains(5));
        engine.apply_remote_code(5, 2).expect("updated");
        assert!(engine.registry().contains(5));
        engine.apply_remote_code(5, 3).expect("deleted");
        assert!(!engine.registry().contains(5));
        // Unknown codes are dropped
        engine.apply_remote_code(5, 9).expect("ignored");
        assert!(!engine.registry().contains(5));
    }

    #[test]
    fn epoch_tracks_set_changes() {
        let fx = fixture();
        let (engine, _) = engine_with(&fx);
        assert_eq!(engine.epoch(), 0);
        engine.load_type(5).expect("load");
        assert_eq!(engine.epoch(), 1);
        engine.load_type(5).expect("reload");
        assert_eq!(engine.epoch(), 2);
        engine.unload_type(5);
        assert_eq!(engine.epoch(), 3);
    }
}
