// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Handling units: a CRUD pipeline bound to one constructed type.
//!
//! [`instantiate`] takes a compiled shape plus the storage and permission
//! collaborators and produces an [`ActiveType`], the unit the registry
//! installs. The unit's [`ContentService`] runs every operation through the
//! same pipeline: liveness check, policy check, shape check, before hooks,
//! store call, after hooks.

mod hooks;
mod store;

pub use hooks::{AfterHook, BeforeHook, ContentHook, HookDecision, HookSet, HookStage};
pub use store::{AccessPolicy, Action, AllowAll, ContentStore, MemoryStore, ReadOnly};

use crate::compile::ConstructedType;
use crate::content::{ContentRecord, FieldValue};
use crate::error::{InstantiateError, ServiceError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// Metrics
// ============================================================================

/// Per-unit operation counters. Relaxed ordering; read for observability only.
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    creates: AtomicU64,
    reads: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    cancellations: AtomicU64,
}

impl ServiceMetrics {
    #[must_use]
    pub fn creates(&self) -> u64 {
        self.creates.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn cancellations(&self) -> u64 {
        self.cancellations.load(Ordering::Relaxed)
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// Service
// ============================================================================

/// CRUD pipeline for one content type.
///
/// Cheap to share; all interior state is synchronized. After [`shutdown`]
/// every operation fails with [`ServiceError::Unloaded`].
///
/// [`shutdown`]: ContentService::shutdown
pub struct ContentService {
    shape: Arc<ConstructedType>,
    store: Arc<dyn ContentStore>,
    policy: Arc<dyn AccessPolicy>,
    hooks: HookSet,
    live: AtomicBool,
    metrics: ServiceMetrics,
}

impl ContentService {
    fn new(
        shape: Arc<ConstructedType>,
        store: Arc<dyn ContentStore>,
        policy: Arc<dyn AccessPolicy>,
    ) -> Self {
        Self {
            shape,
            store,
            policy,
            hooks: HookSet::new(),
            live: AtomicBool::new(true),
            metrics: ServiceMetrics::default(),
        }
    }

    /// Hook slots of this unit.
    #[must_use]
    pub fn hooks(&self) -> &HookSet {
        &self.hooks
    }

    #[must_use]
    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> Result<(), ServiceError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(ServiceError::Unloaded {
                type_name: self.shape.name().to_string(),
            })
        }
    }

    fn ensure_allowed(&self, action: Action) -> Result<(), ServiceError> {
        if self.policy.allows(self.shape.name(), action) {
            Ok(())
        } else {
            Err(ServiceError::Denied {
                type_name: self.shape.name().to_string(),
                action: action.as_str().to_string(),
            })
        }
    }

    /// Records must have been created against this exact shape revision.
    fn ensure_shape(&self, record: &ContentRecord) -> Result<(), ServiceError> {
        if Arc::ptr_eq(record.shape(), &self.shape) {
            Ok(())
        } else {
            Err(ServiceError::ShapeMismatch {
                type_name: self.shape.name().to_string(),
                detail: format!(
                    "record was built for '{}' revision no longer active",
                    record.type_name()
                ),
            })
        }
    }

    fn cancelled(&self, slot: String, reason: String) -> ServiceError {
        ServiceMetrics::bump(&self.metrics.cancellations);
        ServiceError::Cancelled { slot, reason }
    }

    /// Persist a new record. Returns the record with its assigned id.
    pub fn create(&self, mut record: ContentRecord) -> Result<ContentRecord, ServiceError> {
        self.ensure_live()?;
        self.ensure_allowed(Action::Create)?;
        self.ensure_shape(&record)?;
        if let Some((slot, reason)) = self.hooks.fire_before(HookStage::BeforeCreate, &mut record)
        {
            return Err(self.cancelled(slot, reason));
        }
        let id = self.store.insert(&record)?;
        record.set_id(id);
        self.hooks.fire_after(HookStage::AfterCreate, &record);
        ServiceMetrics::bump(&self.metrics.creates);
        log::debug!("[SERVICE] created {}#{}", self.shape.name(), id);
        Ok(record)
    }

    /// Fetch a record by id.
    pub fn get(&self, id: u64) -> Result<ContentRecord, ServiceError> {
        self.ensure_live()?;
        self.ensure_allowed(Action::Read)?;
        ServiceMetrics::bump(&self.metrics.reads);
        self.store.fetch(id)?.ok_or_else(|| ServiceError::NotFound {
            type_name: self.shape.name().to_string(),
            record: id,
        })
    }

    /// All records of this type, in id order.
    pub fn list(&self) -> Result<Vec<ContentRecord>, ServiceError> {
        self.ensure_live()?;
        self.ensure_allowed(Action::Read)?;
        ServiceMetrics::bump(&self.metrics.reads);
        self.store.list()
    }

    /// Records matching the predicate, in id order.
    pub fn list_where<P>(&self, predicate: P) -> Result<Vec<ContentRecord>, ServiceError>
    where
        P: Fn(&ContentRecord) -> bool,
    {
        let mut records = self.list()?;
        records.retain(|r| predicate(r));
        Ok(records)
    }

    /// Records whose named field equals the value, in id order.
    ///
    /// The field name is not validated here; an unknown field simply
    /// matches nothing, the same as a store-side filter on an absent
    /// column would.
    pub fn list_by(
        &self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<Vec<ContentRecord>, ServiceError> {
        let value = value.into();
        self.list_where(|r| r.get(field) == Some(&value))
    }

    /// Overwrite a previously persisted record.
    pub fn update(&self, mut record: ContentRecord) -> Result<ContentRecord, ServiceError> {
        self.ensure_live()?;
        self.ensure_allowed(Action::Update)?;
        self.ensure_shape(&record)?;
        if let Some((slot, reason)) = self.hooks.fire_before(HookStage::BeforeUpdate, &mut record)
        {
            return Err(self.cancelled(slot, reason));
        }
        self.store.update(&record)?;
        self.hooks.fire_after(HookStage::AfterUpdate, &record);
        ServiceMetrics::bump(&self.metrics.updates);
        log::debug!("[SERVICE] updated {}#{}", self.shape.name(), record.id());
        Ok(record)
    }

    /// Remove a record by id. Returns the removed record.
    pub fn delete(&self, id: u64) -> Result<ContentRecord, ServiceError> {
        self.ensure_live()?;
        self.ensure_allowed(Action::Delete)?;
        let mut existing = self.store.fetch(id)?.ok_or_else(|| ServiceError::NotFound {
            type_name: self.shape.name().to_string(),
            record: id,
        })?;
        if let Some((slot, reason)) =
            self.hooks.fire_before(HookStage::BeforeDelete, &mut existing)
        {
            return Err(self.cancelled(slot, reason));
        }
        let removed = self.store.delete(id)?;
        self.hooks.fire_after(HookStage::AfterDelete, &removed);
        ServiceMetrics::bump(&self.metrics.deletes);
        log::debug!("[SERVICE] deleted {}#{}", self.shape.name(), id);
        Ok(removed)
    }

    /// Retire the unit. Idempotent; the unloaded notification fires once,
    /// after which every hook slot is detached.
    pub fn shutdown(&self) {
        if self.live.swap(false, Ordering::AcqRel) {
            log::debug!("[SERVICE] shutdown '{}'", self.shape.name());
            self.hooks.fire_unloaded(self.shape.name());
            self.hooks.clear();
        }
    }
}

impl std::fmt::Debug for ContentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentService")
            .field("type", &self.shape.name())
            .field("live", &self.is_live())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

// ============================================================================
// Active type
// ============================================================================

/// A constructed type bound to its handling unit; the registry entry.
#[derive(Debug)]
pub struct ActiveType {
    shape: Arc<ConstructedType>,
    pub service: ContentService,
}

impl ActiveType {
    #[must_use]
    pub fn id(&self) -> u32 {
        self.shape.schema_id()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.shape.name()
    }

    #[must_use]
    pub fn shape(&self) -> &Arc<ConstructedType> {
        &self.shape
    }

    /// Start an empty record against this unit's shape revision.
    #[must_use]
    pub fn new_record(&self) -> ContentRecord {
        ContentRecord::new(self.shape.clone())
    }
}

/// Bind a handling unit to a compiled shape.
///
/// The shape-id check is defensive; every shape produced by the compiler
/// carries a non-zero id.
pub fn instantiate(
    shape: Arc<ConstructedType>,
    store: Arc<dyn ContentStore>,
    policy: Arc<dyn AccessPolicy>,
) -> Result<ActiveType, InstantiateError> {
    if shape.schema_id() == 0 {
        return Err(InstantiateError::NotCompiled { id: 0 });
    }
    let service = ContentService::new(shape.clone(), store, policy);
    Ok(ActiveType { shape, service })
}
