// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for the content-type engine.
//!
//! Each stage of the pipeline owns its error enum; `EngineError` is the
//! umbrella type surfaced by the lifecycle coordinator. Compile and
//! instantiate failures during a reload are caught at the coordinator
//! boundary and reported without disturbing the previously active entry.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Malformed schema or field set, rejected by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Schema id 0 is reserved as "unassigned" by the persistence layer.
    #[error("schema id 0 is not a valid type id")]
    InvalidId,

    #[error("schema '{id}' has an empty internal name")]
    EmptyName { id: u32 },

    #[error("duplicate field '{name}' in schema '{schema}'")]
    DuplicateField { schema: String, name: String },

    #[error("unknown field kind '{kind}' for field '{field}' in schema '{schema}'")]
    UnknownKind {
        schema: String,
        field: String,
        kind: String,
    },

    #[error("schema '{schema}' declares {count} fields, limit is {limit}")]
    TooManyFields {
        schema: String,
        count: usize,
        limit: usize,
    },

    #[error("schema '{schema}' has no fields and empty types are disabled")]
    EmptyType { schema: String },
}

/// Defensive failure while binding a handling unit to a constructed type.
///
/// Unreachable when the input came from a successful `compile()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstantiateError {
    #[error("constructed type for schema '{id}' was not produced by the compiler")]
    NotCompiled { id: u32 },
}

/// Errors surfaced by a handling unit's CRUD pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Record or type not found. Benign for unload paths; an error for CRUD.
    #[error("record {record} not found in type '{type_name}'")]
    NotFound { type_name: String, record: u64 },

    /// A before-stage hook cancelled the operation with a typed result.
    #[error("operation cancelled by hook '{slot}': {reason}")]
    Cancelled { slot: String, reason: String },

    /// The record's shape does not match the service's constructed type.
    #[error("shape mismatch for type '{type_name}': {detail}")]
    ShapeMismatch { type_name: String, detail: String },

    #[error("field '{field}' does not exist on type '{type_name}'")]
    UnknownField { type_name: String, field: String },

    #[error("field '{field}' expects {expected}, got {got}")]
    ValueKindMismatch {
        field: String,
        expected: String,
        got: String,
    },

    /// Text written to a length-limited field exceeds the limit.
    #[error("field '{field}' value is {len} chars, limit is {max}")]
    ValueTooLong { field: String, max: u32, len: usize },

    /// The access policy collaborator rejected the caller.
    #[error("access denied for {action} on type '{type_name}'")]
    Denied { type_name: String, action: String },

    /// The service was shut down; its type has been uninstalled.
    #[error("type '{type_name}' is no longer active")]
    Unloaded { type_name: String },
}

/// Failure reading schema or field rows from the source of truth.
///
/// Transient by contract: the caller of a bulk or single load retries,
/// the engine itself does not.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("schema source unavailable: {0}")]
    Unavailable(String),

    #[error("schema {0} not found in source")]
    SchemaNotFound(u32),
}

/// Umbrella error surfaced by [`crate::TypeEngine`] operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Instantiate(#[from] InstantiateError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

impl EngineError {
    /// True when the error is a benign not-found (lookup of an absent id).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Service(ServiceError::NotFound { .. }) | Self::Source(SourceError::SchemaNotFound(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_display_names_the_offender() {
        let err = SchemaError::DuplicateField {
            schema: "feedback".to_string(),
            name: "rating".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate field 'rating' in schema 'feedback'");
    }

    #[test]
    fn engine_error_classifies_not_found() {
        let err = EngineError::from(ServiceError::NotFound {
            type_name: "feedback".to_string(),
            record: 9,
        });
        assert!(err.is_not_found());

        let err = EngineError::from(SchemaError::InvalidId);
        assert!(!err.is_not_found());
    }
}
