// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # hcms
//!
//! Dynamic content-type engine: runtime-described schemas become live,
//! addressable data-handling units without a process restart.
//!
//! ```text
//!   SchemaSource ──► compile() ──► ConstructedType
//!                                       │
//!                                  instantiate()
//!                                       │
//!        TypeEngine ──install──► TypeRegistry ──► ActiveType
//!             │                                      │
//!       RouteInvalidator                       ContentService
//!                                            (hooks + store + policy)
//! ```
//!
//! The [`TypeEngine`] coordinates every lifecycle transition: it reads
//! schema rows from a [`SchemaSource`], compiles them into an immutable
//! [`ConstructedType`], binds a [`ContentService`] with its own hook slots
//! and storage, installs the resulting [`ActiveType`] in the process-wide
//! [`TypeRegistry`] and signals the routing layer through a
//! [`RouteInvalidator`]. Transitions for one schema id are serialized;
//! distinct ids proceed in parallel.
//!
//! ## Quick start
//!
//! ```
//! use hcms::{SchemaBuilder, FieldKind, TypeEngine, MemorySource};
//! use std::sync::Arc;
//!
//! # fn main() -> hcms::Result<()> {
//! let source = Arc::new(MemorySource::new());
//! source.put_schema(
//!     SchemaBuilder::new(5, "feedback")
//!         .nick_name("Feedback")
//!         .field("rating", FieldKind::Number)
//!         .field("comment", FieldKind::Text)
//!         .build(),
//! );
//!
//! let engine = TypeEngine::builder(source).build();
//! engine.load_all()?;
//!
//! let unit = engine.registry().lookup(5).expect("feedback active");
//! let mut record = unit.new_record();
//! record.set("rating", 4i64)?;
//! record.set("comment", "works at runtime")?;
//! unit.service.create(record)?;
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod compile;
pub mod config;
pub mod content;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod routes;
pub mod schema;
pub mod service;
pub mod source;

pub use admin::{FieldView, TypeView, TypesSnapshot};
pub use compile::{compile, CompiledField, ConstructedType, StorageCell};
pub use config::{ConfigError, EngineConfig};
pub use content::{ContentRecord, FieldValue};
pub use error::{
    EngineError, InstantiateError, Result, SchemaError, ServiceError, SourceError,
};
pub use lifecycle::{LoadReport, SyncAction, TypeEngine, TypeEngineBuilder};
pub use registry::{RegistryMetrics, TypeRegistry};
pub use routes::{CountingInvalidator, NullInvalidator, RouteInvalidator};
pub use schema::{FieldDescriptor, FieldKind, SchemaBuilder, SchemaDescriptor, SchemaRows};
pub use service::{
    instantiate, AccessPolicy, Action, ActiveType, AfterHook, AllowAll, BeforeHook,
    ContentHook, ContentService, ContentStore, HookDecision, HookSet, HookStage, MemoryStore,
    ReadOnly, ServiceMetrics,
};
pub use source::{ListOptions, MemorySource, SchemaSource};

/// Crate version, as baked in at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn version_matches_manifest() {
        assert_eq!(super::VERSION, env!("CARGO_PKG_VERSION"));
    }
}
