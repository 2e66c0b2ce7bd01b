// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Storage and permission collaborators for handling units.
//!
//! The engine owns neither persistence nor authorization; both arrive as
//! trait objects at instantiation time. [`MemoryStore`] and [`AllowAll`]
//! are the in-process defaults used by tests and single-node deployments.

use crate::content::ContentRecord;
use crate::error::ServiceError;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// CRUD action, as seen by the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Decides whether the calling context may perform an action on a type.
pub trait AccessPolicy: Send + Sync {
    fn allows(&self, type_name: &str, action: Action) -> bool;
}

/// Policy that permits everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn allows(&self, _type_name: &str, _action: Action) -> bool {
        true
    }
}

/// Policy that rejects mutations, leaving reads open.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadOnly;

impl AccessPolicy for ReadOnly {
    fn allows(&self, _type_name: &str, action: Action) -> bool {
        matches!(action, Action::Read)
    }
}

/// Record persistence for a single content type.
///
/// One store instance per handling unit; the engine never routes records of
/// two types through the same store object.
pub trait ContentStore: Send + Sync {
    /// Persist a new record and return its assigned id.
    fn insert(&self, record: &ContentRecord) -> Result<u64, ServiceError>;

    /// Overwrite an existing record in place.
    fn update(&self, record: &ContentRecord) -> Result<(), ServiceError>;

    /// Remove a record, returning it for the after-delete hooks.
    fn delete(&self, id: u64) -> Result<ContentRecord, ServiceError>;

    /// Fetch a record by id. `Ok(None)` when absent.
    fn fetch(&self, id: u64) -> Result<Option<ContentRecord>, ServiceError>;

    /// All records, in id order.
    fn list(&self) -> Result<Vec<ContentRecord>, ServiceError>;
}

/// In-memory store backed by a `BTreeMap`, ids assigned from a counter.
///
/// Carries the name of the type it stores, so storage-level errors can
/// identify the type even when no record is at hand.
pub struct MemoryStore {
    type_name: String,
    records: Mutex<BTreeMap<u64, ContentRecord>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            records: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn not_found(&self, id: u64) -> ServiceError {
        ServiceError::NotFound {
            type_name: self.type_name.clone(),
            record: id,
        }
    }
}

impl ContentStore for MemoryStore {
    fn insert(&self, record: &ContentRecord) -> Result<u64, ServiceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut stored = record.clone();
        stored.set_id(id);
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, stored);
        Ok(id)
    }

    fn update(&self, record: &ContentRecord) -> Result<(), ServiceError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        match records.get_mut(&record.id()) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(self.not_found(record.id())),
        }
    }

    fn delete(&self, id: u64) -> Result<ContentRecord, ServiceError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.remove(&id).ok_or_else(|| self.not_found(id))
    }

    fn fetch(&self, id: u64) -> Result<Option<ContentRecord>, ServiceError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<ContentRecord>, ServiceError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::config::EngineConfig;
    use crate::schema::{FieldKind, SchemaBuilder};

    fn record() -> ContentRecord {
        let rows = SchemaBuilder::new(1, "note")
            .field("text", FieldKind::Text)
            .build();
        let shape =
            compile(&rows.descriptor, &rows.fields, &EngineConfig::default()).expect("compile");
        ContentRecord::new(shape)
    }

    #[test]
    fn insert_assigns_monotonic_ids() {
        let store = MemoryStore::for_type("note");
        let a = store.insert(&record()).expect("insert");
        let b = store.insert(&record()).expect("insert");
        assert!(b > a);
        assert_eq!(store.len(), 2);
        assert_eq!(store.fetch(a).expect("fetch").map(|r| r.id()), Some(a));
    }

    #[test]
    fn update_of_absent_record_is_not_found() {
        let store = MemoryStore::for_type("note");
        let mut r = record();
        r.set_id(77);
        assert!(matches!(
            store.update(&r),
            Err(ServiceError::NotFound { record: 77, .. })
        ));
    }

    #[test]
    fn delete_hands_back_the_record() {
        let store = MemoryStore::for_type("note");
        let mut r = record();
        r.set("text", "bye").expect("set");
        let id = store.insert(&r).expect("insert");
        let gone = store.delete(id).expect("delete");
        assert_eq!(gone.get("text").and_then(|v| v.as_text()), Some("bye"));
        assert!(store.fetch(id).expect("fetch").is_none());
    }

    #[test]
    fn absent_delete_error_names_the_type() {
        let store = MemoryStore::for_type("note");
        let err = store.delete(7).expect_err("absent");
        assert_eq!(err.to_string(), "record 7 not found in type 'note'");
    }

    #[test]
    fn read_only_policy_blocks_mutations() {
        assert!(ReadOnly.allows("t", Action::Read));
        assert!(!ReadOnly.allows("t", Action::Create));
        assert!(AllowAll.allows("t", Action::Delete));
    }
}
