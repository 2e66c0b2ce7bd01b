// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Source of truth for schema and field rows.
//!
//! The engine never persists schemas itself; it reads them through
//! [`SchemaSource`]. The bulk path reads all descriptor rows and all field
//! rows in two calls and joins them client side, so a source backed by a
//! remote database pays two round trips per startup, not two per type.

use crate::error::SourceError;
use crate::schema::{FieldDescriptor, SchemaDescriptor, SchemaRows};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Read options passed through to the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    /// Bypass per-caller permission filtering. Engine-internal reads set
    /// this; the engine must see every type regardless of who triggered
    /// the load.
    pub ignore_permissions: bool,
    /// Include soft-deleted descriptor rows.
    pub include_deleted: bool,
}

impl ListOptions {
    /// Options used by the engine's own loads.
    #[must_use]
    pub const fn engine() -> Self {
        Self {
            ignore_permissions: true,
            include_deleted: false,
        }
    }
}

/// Read access to persisted schema and field rows.
pub trait SchemaSource: Send + Sync {
    /// Every schema descriptor row.
    fn list_schemas(&self, opts: &ListOptions) -> Result<Vec<SchemaDescriptor>, SourceError>;

    /// Every field row, across all schemas. Rows whose owner is gone may
    /// be present; the caller drops them during the join.
    fn list_fields(&self, opts: &ListOptions) -> Result<Vec<FieldDescriptor>, SourceError>;

    /// One schema with its fields.
    fn fetch(&self, id: u32, opts: &ListOptions) -> Result<SchemaRows, SourceError>;

    /// Field rows of one schema, fresh from the source.
    fn fields_of(&self, schema_id: u32, opts: &ListOptions)
        -> Result<Vec<FieldDescriptor>, SourceError>;
}

/// In-memory source for tests and embedded deployments.
///
/// `set_offline(true)` makes every read fail, for exercising the engine's
/// behavior when the backing store is unreachable.
pub struct MemorySource {
    schemas: RwLock<HashMap<u32, SchemaRows>>,
    stray_fields: RwLock<Vec<FieldDescriptor>>,
    offline: AtomicBool,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            schemas: RwLock::new(HashMap::new()),
            stray_fields: RwLock::new(Vec::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Insert or replace a schema with its fields.
    pub fn put_schema(&self, rows: SchemaRows) {
        let mut schemas = self.schemas.write().unwrap_or_else(|e| e.into_inner());
        schemas.insert(rows.descriptor.id, rows);
    }

    /// Remove a schema row entirely. Its field rows go with it.
    pub fn remove_schema(&self, id: u32) -> bool {
        let mut schemas = self.schemas.write().unwrap_or_else(|e| e.into_inner());
        schemas.remove(&id).is_some()
    }

    /// Add a field row with no live owner, as a half-deleted database
    /// would hand out.
    pub fn put_stray_field(&self, field: FieldDescriptor) {
        let mut stray = self.stray_fields.write().unwrap_or_else(|e| e.into_inner());
        stray.push(field);
    }

    /// Make every read fail with [`SourceError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    fn check_online(&self) -> Result<(), SourceError> {
        if self.offline.load(Ordering::Acquire) {
            Err(SourceError::Unavailable("memory source offline".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaSource for MemorySource {
    fn list_schemas(&self, opts: &ListOptions) -> Result<Vec<SchemaDescriptor>, SourceError> {
        self.check_online()?;
        let schemas = self.schemas.read().unwrap_or_else(|e| e.into_inner());
        let mut rows: Vec<SchemaDescriptor> = schemas
            .values()
            .map(|r| r.descriptor.clone())
            .filter(|d| opts.include_deleted || !d.deleted)
            .collect();
        rows.sort_by_key(|d| d.id);
        Ok(rows)
    }

    fn list_fields(&self, _opts: &ListOptions) -> Result<Vec<FieldDescriptor>, SourceError> {
        self.check_online()?;
        let schemas = self.schemas.read().unwrap_or_else(|e| e.into_inner());
        let stray = self.stray_fields.read().unwrap_or_else(|e| e.into_inner());
        let mut rows: Vec<FieldDescriptor> = schemas
            .values()
            .flat_map(|r| r.fields.iter().cloned())
            .collect();
        rows.extend(stray.iter().cloned());
        Ok(rows)
    }

    fn fetch(&self, id: u32, _opts: &ListOptions) -> Result<SchemaRows, SourceError> {
        self.check_online()?;
        let schemas = self.schemas.read().unwrap_or_else(|e| e.into_inner());
        schemas
            .get(&id)
            .cloned()
            .ok_or(SourceError::SchemaNotFound(id))
    }

    fn fields_of(
        &self,
        schema_id: u32,
        _opts: &ListOptions,
    ) -> Result<Vec<FieldDescriptor>, SourceError> {
        self.check_online()?;
        let schemas = self.schemas.read().unwrap_or_else(|e| e.into_inner());
        let stray = self.stray_fields.read().unwrap_or_else(|e| e.into_inner());
        let mut rows: Vec<FieldDescriptor> = schemas
            .get(&schema_id)
            .map(|r| r.fields.clone())
            .unwrap_or_default();
        rows.extend(stray.iter().filter(|f| f.schema_id == schema_id).cloned());
        Ok(rows)
    }
}
