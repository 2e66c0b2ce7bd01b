// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema compiler: descriptor rows in, constructed type out.
//!
//! Compilation is pure. It touches no registry, no storage, and no routing
//! state; the same inputs always yield the same [`ConstructedType`]. Field
//! kinds resolve to storage cells through the fixed table on
//! [`FieldKind::storage_cell`], so an unknown kind is a compile error, never
//! a runtime surprise.

use crate::config::EngineConfig;
use crate::error::SchemaError;
use crate::schema::{FieldDescriptor, FieldKind, SchemaDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Concrete storage shape a field kind resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageCell {
    Text,
    Integer,
    Float,
    Flag,
    Timestamp,
    RecordRef,
    MediaRef,
    Json,
}

impl fmt::Display for StorageCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Flag => "flag",
            Self::Timestamp => "timestamp",
            Self::RecordRef => "record-ref",
            Self::MediaRef => "media-ref",
            Self::Json => "json",
        };
        f.write_str(s)
    }
}

/// One compiled field: parsed kind, resolved cell, positional index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledField {
    pub name: String,
    pub kind: FieldKind,
    pub cell: StorageCell,
    pub max_length: Option<u32>,
    pub localised: bool,
    pub module: Option<String>,
    /// Position within the constructed type, in declaration order.
    pub index: usize,
}

/// Immutable compiled shape of one content type.
///
/// Shared behind `Arc` between the handling unit, the registry entry and any
/// records created against it; never mutated after `compile()` returns.
/// Equality is structural: identical source rows compile to equal types.
#[derive(Debug, PartialEq, Eq)]
pub struct ConstructedType {
    schema_id: u32,
    name: String,
    display_name: String,
    is_form: bool,
    fields: Vec<CompiledField>,
    by_name: HashMap<String, usize>,
}

impl ConstructedType {
    #[must_use]
    pub fn schema_id(&self) -> u32 {
        self.schema_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn is_form(&self) -> bool {
        self.is_form
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    /// Look a field up by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Compile a descriptor and its field rows into a [`ConstructedType`].
///
/// Field rows belonging to a different schema id are dropped with a debug
/// log entry; the persistence layer can hand over stale rows after a partial
/// delete and those must not poison the rest of the type.
pub fn compile(
    descriptor: &SchemaDescriptor,
    fields: &[FieldDescriptor],
    config: &EngineConfig,
) -> Result<Arc<ConstructedType>, SchemaError> {
    if descriptor.id == 0 {
        return Err(SchemaError::InvalidId);
    }
    if descriptor.name.trim().is_empty() {
        return Err(SchemaError::EmptyName { id: descriptor.id });
    }

    let mut compiled: Vec<CompiledField> = Vec::with_capacity(fields.len());
    let mut by_name: HashMap<String, usize> = HashMap::with_capacity(fields.len());

    for row in fields {
        if row.schema_id != descriptor.id {
            log::debug!(
                "[COMPILE] dropping stray field '{}' (owner {} != {})",
                row.name,
                row.schema_id,
                descriptor.id
            );
            continue;
        }
        let kind = FieldKind::parse(&row.kind).ok_or_else(|| SchemaError::UnknownKind {
            schema: descriptor.name.clone(),
            field: row.name.clone(),
            kind: row.kind.clone(),
        })?;
        if by_name.contains_key(&row.name) {
            return Err(SchemaError::DuplicateField {
                schema: descriptor.name.clone(),
                name: row.name.clone(),
            });
        }
        let index = compiled.len();
        by_name.insert(row.name.clone(), index);
        compiled.push(CompiledField {
            name: row.name.clone(),
            kind,
            cell: kind.storage_cell(),
            max_length: row.max_length,
            localised: row.localised,
            module: row.module.clone(),
            index,
        });
    }

    if compiled.len() > config.max_fields_per_type {
        return Err(SchemaError::TooManyFields {
            schema: descriptor.name.clone(),
            count: compiled.len(),
            limit: config.max_fields_per_type,
        });
    }
    if compiled.is_empty() && !config.allow_empty_types {
        return Err(SchemaError::EmptyType {
            schema: descriptor.name.clone(),
        });
    }

    log::debug!(
        "[COMPILE] schema '{}' (id {}) -> {} field(s)",
        descriptor.name,
        descriptor.id,
        compiled.len()
    );

    Ok(Arc::new(ConstructedType {
        schema_id: descriptor.id,
        name: descriptor.name.clone(),
        display_name: descriptor.display_name().to_string(),
        is_form: descriptor.is_form,
        fields: compiled,
        by_name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    fn cfg() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn compiles_fields_in_declaration_order() {
        let rows = SchemaBuilder::new(5, "feedback")
            .field("rating", FieldKind::Number)
            .field("comment", FieldKind::Text)
            .build();
        let ty = compile(&rows.descriptor, &rows.fields, &cfg()).expect("compile");
        assert_eq!(ty.schema_id(), 5);
        assert_eq!(ty.fields()[0].name, "rating");
        assert_eq!(ty.fields()[0].cell, StorageCell::Integer);
        assert_eq!(ty.fields()[1].cell, StorageCell::Text);
        assert_eq!(ty.field("comment").map(|f| f.index), Some(1));
        assert!(ty.field("missing").is_none());
    }

    #[test]
    fn identical_rows_compile_to_equal_types() {
        let rows = SchemaBuilder::new(5, "feedback")
            .field("rating", FieldKind::Number)
            .build();
        let a = compile(&rows.descriptor, &rows.fields, &cfg()).expect("compile");
        let b = compile(&rows.descriptor, &rows.fields, &cfg()).expect("compile");
        assert_eq!(*a, *b);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn rejects_id_zero_and_empty_name() {
        let rows = SchemaBuilder::new(0, "x").build();
        assert_eq!(
            compile(&rows.descriptor, &rows.fields, &cfg()),
            Err(SchemaError::InvalidId)
        );

        let rows = SchemaBuilder::new(4, "   ").build();
        assert_eq!(
            compile(&rows.descriptor, &rows.fields, &cfg()),
            Err(SchemaError::EmptyName { id: 4 })
        );
    }

    #[test]
    fn rejects_duplicate_and_unknown_kind() {
        let rows = SchemaBuilder::new(6, "dup")
            .field("a", FieldKind::Text)
            .field("a", FieldKind::Number)
            .build();
        assert!(matches!(
            compile(&rows.descriptor, &rows.fields, &cfg()),
            Err(SchemaError::DuplicateField { .. })
        ));

        let mut rows = SchemaBuilder::new(7, "odd").field("a", FieldKind::Text).build();
        rows.fields[0].kind = "geoshape".to_string();
        assert!(matches!(
            compile(&rows.descriptor, &rows.fields, &cfg()),
            Err(SchemaError::UnknownKind { .. })
        ));
    }

    #[test]
    fn stray_rows_are_dropped_not_fatal() {
        let mut rows = SchemaBuilder::new(8, "clean")
            .field("keep", FieldKind::Text)
            .build();
        rows.fields
            .push(crate::schema::FieldDescriptor::new(99, "stray", FieldKind::Text));
        let ty = compile(&rows.descriptor, &rows.fields, &cfg()).expect("compile");
        assert_eq!(ty.field_count(), 1);
        assert!(ty.field("stray").is_none());
    }

    #[test]
    fn empty_type_policy_is_configurable() {
        let rows = SchemaBuilder::new(9, "bare").build();
        let ty = compile(&rows.descriptor, &rows.fields, &cfg()).expect("empty allowed");
        assert!(ty.is_empty());

        let strict = EngineConfig {
            allow_empty_types: false,
            ..Default::default()
        };
        assert!(matches!(
            compile(&rows.descriptor, &rows.fields, &strict),
            Err(SchemaError::EmptyType { .. })
        ));
    }

    #[test]
    fn field_limit_enforced() {
        let mut b = SchemaBuilder::new(10, "wide");
        for i in 0..3 {
            b = b.field(format!("f{i}"), FieldKind::Text);
        }
        let rows = b.build();
        let tight = EngineConfig {
            max_fields_per_type: 2,
            ..Default::default()
        };
        assert!(matches!(
            compile(&rows.descriptor, &rows.fields, &tight),
            Err(SchemaError::TooManyFields { count: 3, limit: 2, .. })
        ));
    }
}
