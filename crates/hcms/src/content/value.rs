// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::compile::StorageCell;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single typed content value.
///
/// Variants mirror [`StorageCell`] one to one, plus `Null` for unset slots.
/// Reference cells carry the referenced row id, not the row itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    RecordRef(u64),
    MediaRef(u64),
    Json(serde_json::Value),
}

impl FieldValue {
    /// Short kind name for error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Flag(_) => "flag",
            Self::Timestamp(_) => "timestamp",
            Self::RecordRef(_) => "record-ref",
            Self::MediaRef(_) => "media-ref",
            Self::Json(_) => "json",
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Default value for a freshly created slot of the given cell.
    /// Reference cells have no meaningful default and start `Null`.
    #[must_use]
    pub fn default_for(cell: StorageCell) -> Self {
        match cell {
            StorageCell::Text => Self::Text(String::new()),
            StorageCell::Integer => Self::Integer(0),
            StorageCell::Float => Self::Float(0.0),
            StorageCell::Flag => Self::Flag(false),
            StorageCell::Timestamp => Self::Timestamp(0),
            StorageCell::RecordRef | StorageCell::MediaRef => Self::Null,
            StorageCell::Json => Self::Json(serde_json::Value::Null),
        }
    }

    /// Fit the value into the given cell, coercing where the payload is
    /// unambiguous (an integer is a valid timestamp or reference id).
    /// Returns `None` when the value cannot represent the cell.
    #[must_use]
    pub fn coerce(self, cell: StorageCell) -> Option<Self> {
        match (self, cell) {
            (v @ Self::Null, _) => Some(v),
            (v @ Self::Text(_), StorageCell::Text) => Some(v),
            (v @ Self::Integer(_), StorageCell::Integer) => Some(v),
            (Self::Integer(ms), StorageCell::Timestamp) => Some(Self::Timestamp(ms)),
            (Self::Integer(id), StorageCell::RecordRef) if id >= 0 => {
                Some(Self::RecordRef(id as u64))
            }
            (Self::Integer(id), StorageCell::MediaRef) if id >= 0 => {
                Some(Self::MediaRef(id as u64))
            }
            (v @ Self::Float(_), StorageCell::Float) => Some(v),
            (Self::Integer(n), StorageCell::Float) => Some(Self::Float(n as f64)),
            (v @ Self::Flag(_), StorageCell::Flag) => Some(v),
            (v @ Self::Timestamp(_), StorageCell::Timestamp) => Some(v),
            (v @ Self::RecordRef(_), StorageCell::RecordRef) => Some(v),
            (v @ Self::MediaRef(_), StorageCell::MediaRef) => Some(v),
            (v @ Self::Json(_), StorageCell::Json) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) | Self::Timestamp(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Flag(b) => write!(f, "{b}"),
            Self::Timestamp(ms) => write!(f, "@{ms}"),
            Self::RecordRef(id) => write!(f, "record#{id}"),
            Self::MediaRef(id) => write!(f, "media#{id}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Integer(n.into())
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}
