// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read-only admin views of the engine.
//!
//! A [`TypesSnapshot`] is a serializable point-in-time copy of the active
//! set, meant for admin endpoints and diagnostics. It holds no handles
//! into the engine; taking one never blocks a transition for longer than
//! a registry read.

use crate::lifecycle::TypeEngine;
use serde::Serialize;

/// Point-in-time view of every active type.
#[derive(Debug, Clone, Serialize)]
pub struct TypesSnapshot {
    /// Engine epoch at capture time. Two snapshots with the same epoch
    /// describe the same active set.
    pub epoch: u64,
    pub types: Vec<TypeView>,
}

/// One active type, flattened for serialization.
#[derive(Debug, Clone, Serialize)]
pub struct TypeView {
    pub id: u32,
    pub name: String,
    pub display_name: String,
    pub is_form: bool,
    pub live: bool,
    pub hook_slots: usize,
    pub records_created: u64,
    pub fields: Vec<FieldView>,
}

/// One compiled field, flattened for serialization.
#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    pub name: String,
    pub kind: String,
    pub cell: String,
    pub localised: bool,
    pub max_length: Option<u32>,
}

impl TypesSnapshot {
    /// Capture the active set of an engine.
    #[must_use]
    pub fn capture(engine: &TypeEngine) -> Self {
        let epoch = engine.epoch();
        let types = engine
            .active_types()
            .iter()
            .map(|unit| TypeView {
                id: unit.id(),
                name: unit.name().to_string(),
                display_name: unit.shape().display_name().to_string(),
                is_form: unit.shape().is_form(),
                live: unit.service.is_live(),
                hook_slots: unit.service.hooks().len(),
                records_created: unit.service.metrics().creates(),
                fields: unit
                    .shape()
                    .fields()
                    .iter()
                    .map(|f| FieldView {
                        name: f.name.clone(),
                        kind: f.kind.to_string(),
                        cell: f.cell.to_string(),
                        localised: f.localised,
                        max_length: f.max_length,
                    })
                    .collect(),
            })
            .collect();
        Self { epoch, types }
    }

    /// Find a type view by id.
    #[must_use]
    pub fn type_view(&self, id: u32) -> Option<&TypeView> {
        self.types.iter().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, SchemaBuilder};
    use crate::source::MemorySource;
    use std::sync::Arc;

    #[test]
    fn snapshot_reflects_the_active_set() {
        let source = Arc::new(MemorySource::new());
        source.put_schema(
            SchemaBuilder::new(5, "feedback")
                .nick_name("Feedback")
                .field("rating", FieldKind::Number)
                .field_with_max("comment", FieldKind::Text, 200)
                .build(),
        );
        let engine = TypeEngine::builder(source).build();
        engine.load_type(5).expect("load");

        let snap = TypesSnapshot::capture(&engine);
        assert_eq!(snap.epoch, engine.epoch());
        let view = snap.type_view(5).expect("view");
        assert_eq!(view.display_name, "Feedback");
        assert_eq!(view.fields.len(), 2);
        assert_eq!(view.fields[0].cell, "integer");
        assert_eq!(view.fields[1].max_length, Some(200));
        assert!(view.live);

        // Snapshots serialize for admin endpoints
        let json = serde_json::to_value(&snap).expect("serialize");
        assert_eq!(json["types"][0]["name"], "feedback");
    }

    #[test]
    fn snapshot_is_detached_from_later_transitions() {
        let source = Arc::new(MemorySource::new());
        source.put_schema(SchemaBuilder::new(1, "page").build());
        let engine = TypeEngine::builder(source).build();
        engine.load_type(1).expect("load");

        let snap = TypesSnapshot::capture(&engine);
        engine.unload_type(1);
        assert_eq!(snap.types.len(), 1);
        assert!(snap.epoch < engine.epoch());
        assert!(TypesSnapshot::capture(&engine).types.is_empty());
    }
}
