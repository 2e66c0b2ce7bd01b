// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lifecycle hooks for handling units.
//!
//! Hooks occupy named, ordered slots on a single unit. Before-stage hooks
//! may cancel the operation with a typed decision; after-stage hooks only
//! observe. A panicking hook is isolated and logged, never propagated into
//! the CRUD pipeline, and a panicked before-stage hook counts as `Proceed`.

use crate::content::ContentRecord;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Outcome of a before-stage hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookDecision {
    /// Continue with the operation.
    Proceed,
    /// Abort the operation; the reason reaches the caller verbatim.
    Cancel { reason: String },
}

impl HookDecision {
    /// Shorthand for a cancellation.
    #[must_use]
    pub fn cancel(reason: impl Into<String>) -> Self {
        Self::Cancel {
            reason: reason.into(),
        }
    }
}

/// Pipeline stage a hook fires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
    /// Fired exactly once when the unit is shut down.
    Unloaded,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BeforeCreate => "before-create",
            Self::AfterCreate => "after-create",
            Self::BeforeUpdate => "before-update",
            Self::AfterUpdate => "after-update",
            Self::BeforeDelete => "before-delete",
            Self::AfterDelete => "after-delete",
            Self::Unloaded => "unloaded",
        };
        f.write_str(s)
    }
}

/// Observer of a handling unit's CRUD pipeline.
///
/// All methods are optional; the default implementation observes nothing
/// and cancels nothing.
pub trait ContentHook: Send + Sync {
    fn before_create(&self, _record: &mut ContentRecord) -> HookDecision {
        HookDecision::Proceed
    }

    fn after_create(&self, _record: &ContentRecord) {}

    fn before_update(&self, _record: &mut ContentRecord) -> HookDecision {
        HookDecision::Proceed
    }

    fn after_update(&self, _record: &ContentRecord) {}

    fn before_delete(&self, _record: &ContentRecord) -> HookDecision {
        HookDecision::Proceed
    }

    fn after_delete(&self, _record: &ContentRecord) {}

    /// The owning unit was shut down and its type uninstalled.
    fn unloaded(&self, _type_name: &str) {}
}

#[derive(Clone)]
struct Slot {
    name: String,
    hook: Arc<dyn ContentHook>,
}

/// Ordered, named hook slots belonging to one handling unit.
///
/// Registration order is firing order. Slot names need not be unique;
/// duplicate names all fire in order. The slot list is snapshotted before
/// a stage fires, so a hook may register or unregister slots on its own
/// unit; the change takes effect from the next stage on.
pub struct HookSet {
    slots: Mutex<Vec<Slot>>,
    panics: AtomicU64,
}

impl HookSet {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            panics: AtomicU64::new(0),
        }
    }

    /// Register a hook under a slot name, appended after existing slots.
    pub fn register<H: ContentHook + 'static>(&self, name: impl Into<String>, hook: H) {
        let name = name.into();
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        log::debug!("[HOOKS] register slot '{}' (position {})", name, slots.len());
        slots.push(Slot {
            name,
            hook: Arc::new(hook),
        });
    }

    fn firing_order(&self) -> Vec<Slot> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Remove every slot with the given name. Returns how many were removed.
    pub fn unregister(&self, name: &str) -> usize {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let before = slots.len();
        slots.retain(|s| s.name != name);
        before - slots.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hook invocations that panicked and were isolated.
    #[must_use]
    pub fn panics(&self) -> u64 {
        self.panics.load(Ordering::Relaxed)
    }

    /// Drop every slot. Called once the owning unit is retired.
    pub(crate) fn clear(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.clear();
    }

    fn record_panic(&self, slot: &str, stage: HookStage) {
        self.panics.fetch_add(1, Ordering::Relaxed);
        log::error!("[HOOKS] hook '{slot}' panicked at {stage}");
    }

    /// Run before-stage hooks in order. The first cancellation stops the
    /// walk and is returned with the cancelling slot's name.
    pub(crate) fn fire_before(
        &self,
        stage: HookStage,
        record: &mut ContentRecord,
    ) -> Option<(String, String)> {
        for slot in self.firing_order() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match stage {
                HookStage::BeforeCreate => slot.hook.before_create(record),
                HookStage::BeforeUpdate => slot.hook.before_update(record),
                HookStage::BeforeDelete => slot.hook.before_delete(record),
                _ => HookDecision::Proceed,
            }));
            match outcome {
                Ok(HookDecision::Proceed) => {}
                Ok(HookDecision::Cancel { reason }) => {
                    return Some((slot.name, reason));
                }
                Err(_) => self.record_panic(&slot.name, stage),
            }
        }
        None
    }

    /// Run after-stage hooks in order. Panics are logged and skipped.
    pub(crate) fn fire_after(&self, stage: HookStage, record: &ContentRecord) {
        for slot in self.firing_order() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match stage {
                HookStage::AfterCreate => slot.hook.after_create(record),
                HookStage::AfterUpdate => slot.hook.after_update(record),
                HookStage::AfterDelete => slot.hook.after_delete(record),
                _ => {}
            }));
            if outcome.is_err() {
                self.record_panic(&slot.name, stage);
            }
        }
    }

    /// Notify every hook that the unit went away.
    pub(crate) fn fire_unloaded(&self, type_name: &str) {
        for slot in self.firing_order() {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| slot.hook.unloaded(type_name)));
            if outcome.is_err() {
                self.record_panic(&slot.name, HookStage::Unloaded);
            }
        }
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let names: Vec<&str> = slots.iter().map(|s| s.name.as_str()).collect();
        f.debug_struct("HookSet").field("slots", &names).finish()
    }
}

/// Read-only veto fired at every before stage, built from a closure.
pub struct BeforeHook<F>(pub F)
where
    F: Fn(&ContentRecord) -> HookDecision + Send + Sync;

impl<F> ContentHook for BeforeHook<F>
where
    F: Fn(&ContentRecord) -> HookDecision + Send + Sync,
{
    fn before_create(&self, record: &mut ContentRecord) -> HookDecision {
        (self.0)(record)
    }

    fn before_update(&self, record: &mut ContentRecord) -> HookDecision {
        (self.0)(record)
    }

    fn before_delete(&self, record: &ContentRecord) -> HookDecision {
        (self.0)(record)
    }
}

/// Observer fired at every after stage, built from a closure.
pub struct AfterHook<F>(pub F)
where
    F: Fn(&ContentRecord) + Send + Sync;

impl<F> ContentHook for AfterHook<F>
where
    F: Fn(&ContentRecord) + Send + Sync,
{
    fn after_create(&self, record: &ContentRecord) {
        (self.0)(record)
    }

    fn after_update(&self, record: &ContentRecord) {
        (self.0)(record)
    }

    fn after_delete(&self, record: &ContentRecord) {
        (self.0)(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::config::EngineConfig;
    use crate::schema::{FieldKind, SchemaBuilder};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn record() -> ContentRecord {
        let rows = SchemaBuilder::new(1, "t").field("a", FieldKind::Number).build();
        let shape =
            compile(&rows.descriptor, &rows.fields, &EngineConfig::default()).expect("compile");
        ContentRecord::new(shape)
    }

    struct Counting(Arc<AtomicUsize>);

    impl ContentHook for Counting {
        fn after_create(&self, _record: &ContentRecord) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn unloaded(&self, _type_name: &str) {
            self.0.fetch_add(100, Ordering::SeqCst);
        }
    }

    struct Vetoing;

    impl ContentHook for Vetoing {
        fn before_create(&self, _record: &mut ContentRecord) -> HookDecision {
            HookDecision::cancel("not today")
        }
    }

    struct Panicking;

    impl ContentHook for Panicking {
        fn before_create(&self, _record: &mut ContentRecord) -> HookDecision {
            panic!("boom");
        }
        fn after_create(&self, _record: &ContentRecord) {
            panic!("boom");
        }
    }

    #[test]
    fn first_cancellation_wins_and_names_its_slot() {
        let hooks = HookSet::new();
        let count = Arc::new(AtomicUsize::new(0));
        hooks.register("counter", Counting(count.clone()));
        hooks.register("veto", Vetoing);
        hooks.register("veto-late", Vetoing);

        let mut r = record();
        let cancelled = hooks.fire_before(HookStage::BeforeCreate, &mut r);
        assert_eq!(
            cancelled,
            Some(("veto".to_string(), "not today".to_string()))
        );
    }

    #[test]
    fn panicking_hook_is_isolated() {
        let hooks = HookSet::new();
        let count = Arc::new(AtomicUsize::new(0));
        hooks.register("bomb", Panicking);
        hooks.register("counter", Counting(count.clone()));

        let mut r = record();
        // Panic in a before hook counts as Proceed
        assert_eq!(hooks.fire_before(HookStage::BeforeCreate, &mut r), None);
        // Panic in an after hook does not stop later slots
        hooks.fire_after(HookStage::AfterCreate, &r);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(hooks.panics(), 2);
    }

    #[test]
    fn unregister_removes_all_slots_with_the_name() {
        let hooks = HookSet::new();
        hooks.register("x", Vetoing);
        hooks.register("x", Vetoing);
        hooks.register("y", Vetoing);
        assert_eq!(hooks.unregister("x"), 2);
        assert_eq!(hooks.len(), 1);
    }

    #[test]
    fn unloaded_reaches_every_hook() {
        let hooks = HookSet::new();
        let count = Arc::new(AtomicUsize::new(0));
        hooks.register("a", Counting(count.clone()));
        hooks.register("b", Counting(count.clone()));
        hooks.fire_unloaded("t");
        assert_eq!(count.load(Ordering::SeqCst), 200);
    }
}
