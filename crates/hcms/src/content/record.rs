// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::FieldValue;
use crate::compile::ConstructedType;
use crate::error::ServiceError;
use std::sync::Arc;

/// An instance of a constructed type: one value slot per compiled field.
///
/// Records keep a handle to the shape they were created against, so a
/// handling unit can reject records built for a different (or older)
/// revision of the type.
#[derive(Debug, Clone)]
pub struct ContentRecord {
    id: u64,
    shape: Arc<ConstructedType>,
    values: Vec<FieldValue>,
}

impl ContentRecord {
    /// Create a record for the given shape, every slot holding its cell's
    /// default value. Id 0 means "not yet persisted"; the store assigns
    /// the real id.
    #[must_use]
    pub fn new(shape: Arc<ConstructedType>) -> Self {
        let values = shape
            .fields()
            .iter()
            .map(|f| FieldValue::default_for(f.cell))
            .collect();
        Self {
            id: 0,
            shape,
            values,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    /// Shape this record was created against.
    #[must_use]
    pub fn shape(&self) -> &Arc<ConstructedType> {
        &self.shape
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        self.shape.name()
    }

    /// Set a field by name, coercing the value into the field's cell.
    pub fn set(
        &mut self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), ServiceError> {
        let compiled = self
            .shape
            .field(field)
            .ok_or_else(|| ServiceError::UnknownField {
                type_name: self.shape.name().to_string(),
                field: field.to_string(),
            })?;
        let value = value.into();
        let got = value.kind_name();
        let fitted = value
            .coerce(compiled.cell)
            .ok_or_else(|| ServiceError::ValueKindMismatch {
                field: field.to_string(),
                expected: compiled.cell.to_string(),
                got: got.to_string(),
            })?;
        if let (Some(max), Some(text)) = (compiled.max_length, fitted.as_text()) {
            let len = text.chars().count();
            if len > max as usize {
                return Err(ServiceError::ValueTooLong {
                    field: field.to_string(),
                    max,
                    len,
                });
            }
        }
        self.values[compiled.index] = fitted;
        Ok(())
    }

    /// Read a field by name. `None` when the field does not exist.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.shape.field(field).map(|f| &self.values[f.index])
    }

    /// Slots in field declaration order.
    #[must_use]
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Named-pair JSON projection, used by stores and admin views.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(self.values.len() + 1);
        map.insert("_id".to_string(), serde_json::json!(self.id));
        for field in self.shape.fields() {
            let v = serde_json::to_value(&self.values[field.index])
                .unwrap_or(serde_json::Value::Null);
            map.insert(field.name.clone(), v);
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::config::EngineConfig;
    use crate::schema::{FieldKind, SchemaBuilder};

    fn feedback_shape() -> Arc<ConstructedType> {
        let rows = SchemaBuilder::new(5, "feedback")
            .field("rating", FieldKind::Number)
            .field_with_max("comment", FieldKind::Text, 10)
            .build();
        compile(&rows.descriptor, &rows.fields, &EngineConfig::default()).expect("compile")
    }

    #[test]
    fn set_and_get_round_trip() {
        let mut record = ContentRecord::new(feedback_shape());
        record.set("rating", 4i64).expect("set rating");
        record.set("comment", "ok").expect("set comment");
        assert_eq!(record.get("rating"), Some(&FieldValue::Integer(4)));
        assert_eq!(record.get("comment").and_then(|v| v.as_text()), Some("ok"));
        assert!(record.get("nope").is_none());
    }

    #[test]
    fn unknown_field_and_bad_kind_are_typed_errors() {
        let mut record = ContentRecord::new(feedback_shape());
        assert!(matches!(
            record.set("missing", 1i64),
            Err(ServiceError::UnknownField { .. })
        ));
        assert!(matches!(
            record.set("rating", "four"),
            Err(ServiceError::ValueKindMismatch { .. })
        ));
    }

    #[test]
    fn max_length_enforced_on_write() {
        let mut record = ContentRecord::new(feedback_shape());
        assert!(record.set("comment", "short").is_ok());
        let err = record.set("comment", "a very long comment").expect_err("too long");
        assert!(matches!(
            err,
            ServiceError::ValueTooLong { ref field, max: 10, len: 19 } if field == "comment"
        ));
        // The rejected write leaves the previous value in place
        assert_eq!(record.get("comment").and_then(|v| v.as_text()), Some("short"));
    }

    #[test]
    fn fresh_slots_hold_cell_defaults() {
        let record = ContentRecord::new(feedback_shape());
        assert_eq!(record.get("rating"), Some(&FieldValue::Integer(0)));
        assert_eq!(record.get("comment"), Some(&FieldValue::Text(String::new())));
    }

    #[test]
    fn json_projection_names_every_field() {
        let mut record = ContentRecord::new(feedback_shape());
        record.set_id(9);
        record.set("rating", 5i64).expect("set");
        let json = record.to_json();
        assert_eq!(json["_id"], 9);
        assert_eq!(json["rating"], serde_json::json!({"integer": 5}));
        assert_eq!(json["comment"], serde_json::json!({"text": ""}));
    }
}
