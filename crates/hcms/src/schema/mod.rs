// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema model: runtime descriptions of content types and their fields.
//!
//! A [`SchemaDescriptor`] plus its [`FieldDescriptor`] rows are the raw
//! material the compiler turns into a [`crate::ConstructedType`]. Both are
//! plain rows handed over by the persistence collaborator; nothing here is
//! known at build time.

mod builder;

pub use builder::SchemaBuilder;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A runtime-defined content type: identity and display metadata.
///
/// The field set is *not* part of the descriptor row; fields are loaded
/// separately and joined by `schema_id` (see [`crate::SchemaSource`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Numeric id, stable for the type's lifetime. 0 means "unassigned".
    pub id: u32,
    /// Internal name used for routing and storage (e.g. "feedback").
    pub name: String,
    /// Human readable display name.
    #[serde(default)]
    pub nick_name: String,
    /// Optional icon reference shown in admin UIs.
    #[serde(default)]
    pub icon_ref: Option<String>,
    /// Whether this type captures data from end users via a form.
    #[serde(default)]
    pub is_form: bool,
    /// Soft-delete flag; retired descriptors keep their row.
    #[serde(default)]
    pub deleted: bool,
}

impl SchemaDescriptor {
    /// Create a descriptor with the given identity and internal name.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            nick_name: String::new(),
            icon_ref: None,
            is_form: false,
            deleted: false,
        }
    }

    /// Display name, falling back to the internal name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.nick_name.is_empty() {
            &self.name
        } else {
            &self.nick_name
        }
    }
}

/// One named, typed attribute belonging to exactly one schema.
///
/// The `kind` is stored in its persisted string form; parsing happens at
/// compile time so a bad row is rejected with a precise error rather than
/// failing deserialization of the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Row id of the field itself.
    #[serde(default)]
    pub id: u32,
    /// Owning schema id (foreign key).
    pub schema_id: u32,
    /// Field name, unique within the owning schema.
    pub name: String,
    /// Declared value kind in persisted string form (e.g. "number").
    pub kind: String,
    /// Optional length constraint for textual kinds.
    #[serde(default)]
    pub max_length: Option<u32>,
    /// Whether the field is translated per locale.
    #[serde(default)]
    pub localised: bool,
    /// Optional admin editor module override.
    #[serde(default)]
    pub module: Option<String>,
}

impl FieldDescriptor {
    /// Create a field row for the given owner.
    pub fn new(schema_id: u32, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: 0,
            schema_id,
            name: name.into(),
            kind: kind.as_str().to_string(),
            max_length: None,
            localised: false,
            module: None,
        }
    }
}

/// Closed set of value kinds a field can declare.
///
/// Kinds map to storage cells through a fixed dispatch table
/// ([`FieldKind::storage_cell`]); there is no runtime code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Short text (titles, slugs, one-liners).
    Text,
    /// Long-form text (bodies, markdown).
    LongText,
    /// Signed integer.
    Number,
    /// Floating point.
    Decimal,
    /// True/false flag.
    Boolean,
    /// Point in time, milliseconds since the epoch.
    DateTime,
    /// Reference to a record of another content type.
    Reference,
    /// Reference to an uploaded media item.
    Media,
    /// Free-form JSON document.
    Document,
}

impl FieldKind {
    /// All kinds, in declaration order. Used by admin UIs and tests.
    pub const ALL: [FieldKind; 9] = [
        Self::Text,
        Self::LongText,
        Self::Number,
        Self::Decimal,
        Self::Boolean,
        Self::DateTime,
        Self::Reference,
        Self::Media,
        Self::Document,
    ];

    /// Canonical persisted string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::LongText => "longtext",
            Self::Number => "number",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::Reference => "reference",
            Self::Media => "media",
            Self::Document => "document",
        }
    }

    /// Parse the persisted string form. Matching is case-insensitive because
    /// older admin builds stored kinds capitalised.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "text" | "string" => Some(Self::Text),
            "longtext" | "textarea" => Some(Self::LongText),
            "number" | "integer" => Some(Self::Number),
            "decimal" | "float" => Some(Self::Decimal),
            "boolean" | "bool" => Some(Self::Boolean),
            "datetime" | "date" => Some(Self::DateTime),
            "reference" => Some(Self::Reference),
            "media" | "upload" => Some(Self::Media),
            "document" | "json" => Some(Self::Document),
            _ => None,
        }
    }

    /// Storage cell this kind resolves to (fixed dispatch table).
    #[must_use]
    pub const fn storage_cell(&self) -> crate::compile::StorageCell {
        use crate::compile::StorageCell;
        match self {
            Self::Text | Self::LongText => StorageCell::Text,
            Self::Number => StorageCell::Integer,
            Self::Decimal => StorageCell::Float,
            Self::Boolean => StorageCell::Flag,
            Self::DateTime => StorageCell::Timestamp,
            Self::Reference => StorageCell::RecordRef,
            Self::Media => StorageCell::MediaRef,
            Self::Document => StorageCell::Json,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A descriptor row together with its field rows, as produced by
/// [`SchemaBuilder`] and consumed by [`crate::MemorySource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRows {
    pub descriptor: SchemaDescriptor,
    pub fields: Vec<FieldDescriptor>,
}
