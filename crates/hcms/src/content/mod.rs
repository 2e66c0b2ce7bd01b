// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime content values and records.
//!
//! A [`ContentRecord`] is an instance of a [`crate::ConstructedType`]: a
//! slot per compiled field, each holding a [`FieldValue`] checked against
//! the field's storage cell on write.

mod record;
mod value;

pub use record::ContentRecord;
pub use value::FieldValue;
