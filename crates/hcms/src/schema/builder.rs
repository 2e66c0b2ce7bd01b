// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent construction of schema and field rows.

use super::{FieldDescriptor, FieldKind, SchemaDescriptor, SchemaRows};

/// Fluent builder producing a [`SchemaRows`] bundle.
///
/// Field order is the call order; the compiler preserves it in the
/// constructed shape.
///
/// # Example
/// ```
/// use hcms::{SchemaBuilder, FieldKind};
///
/// let rows = SchemaBuilder::new(5, "feedback")
///     .nick_name("Feedback")
///     .field("rating", FieldKind::Number)
///     .field("comment", FieldKind::Text)
///     .build();
/// assert_eq!(rows.fields.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    descriptor: SchemaDescriptor,
    fields: Vec<FieldDescriptor>,
}

impl SchemaBuilder {
    /// Start a schema with the given id and internal name.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            descriptor: SchemaDescriptor::new(id, name),
            fields: Vec::new(),
        }
    }

    /// Set the human readable display name.
    #[must_use]
    pub fn nick_name(mut self, nick: impl Into<String>) -> Self {
        self.descriptor.nick_name = nick.into();
        self
    }

    /// Set the admin icon reference.
    #[must_use]
    pub fn icon_ref(mut self, icon: impl Into<String>) -> Self {
        self.descriptor.icon_ref = Some(icon.into());
        self
    }

    /// Mark the type as a user-facing form.
    #[must_use]
    pub fn form(mut self) -> Self {
        self.descriptor.is_form = true;
        self
    }

    /// Append a field of the given kind.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields
            .push(FieldDescriptor::new(self.descriptor.id, name, kind));
        self
    }

    /// Append a field with a length constraint.
    #[must_use]
    pub fn field_with_max(mut self, name: impl Into<String>, kind: FieldKind, max: u32) -> Self {
        let mut f = FieldDescriptor::new(self.descriptor.id, name, kind);
        f.max_length = Some(max);
        self.fields.push(f);
        self
    }

    /// Append a localised field.
    #[must_use]
    pub fn localised_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        let mut f = FieldDescriptor::new(self.descriptor.id, name, kind);
        f.localised = true;
        self.fields.push(f);
        self
    }

    /// Append a pre-built field row. The row's `schema_id` is rewritten to
    /// the builder's schema id.
    #[must_use]
    pub fn raw_field(mut self, mut field: FieldDescriptor) -> Self {
        field.schema_id = self.descriptor.id;
        self.fields.push(field);
        self
    }

    /// Finish, yielding the descriptor row and its field rows.
    #[must_use]
    pub fn build(self) -> SchemaRows {
        SchemaRows {
            descriptor: self.descriptor,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_field_order() {
        let rows = SchemaBuilder::new(9, "article")
            .field("title", FieldKind::Text)
            .field("body", FieldKind::LongText)
            .field("published", FieldKind::DateTime)
            .build();
        let names: Vec<&str> = rows.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["title", "body", "published"]);
        assert!(rows.fields.iter().all(|f| f.schema_id == 9));
    }

    #[test]
    fn raw_field_rebinds_owner() {
        let stray = FieldDescriptor::new(42, "orphan", FieldKind::Boolean);
        let rows = SchemaBuilder::new(3, "flags").raw_field(stray).build();
        assert_eq!(rows.fields[0].schema_id, 3);
    }

    #[test]
    fn modifiers_land_on_the_right_row() {
        let rows = SchemaBuilder::new(2, "page")
            .nick_name("Page")
            .field_with_max("slug", FieldKind::Text, 120)
            .localised_field("title", FieldKind::Text)
            .build();
        assert_eq!(rows.descriptor.nick_name, "Page");
        assert_eq!(rows.fields[0].max_length, Some(120));
        assert!(rows.fields[1].localised);
        assert!(!rows.fields[0].localised);
    }
}
