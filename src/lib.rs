//! # QAO Runtime
//!
//! Deterministic registry and scheduler for quasi-active objects: long-lived,
//! stateful objects stepped once per simulation tick.
//!
//! ## Design Goals
//! - Generation-checked identities that detect stale references
//! - Deterministic, priority-bucketed step order with stable ties
//! - Safe creation and destruction while a step is in progress
//! - Unique, move-only ownership of every object
//!
//! ## Quick start
//! ```rust
//! use qao_runtime::prelude::*;
//!
//! struct Counter(u32);
//!
//! impl ActiveObject for Counter {
//!     fn update(&mut self, _ctx: &mut StepContext<'_, Self>) {
//!         self.0 += 1;
//!     }
//! }
//!
//! let mut runtime = Runtime::new();
//! runtime.register_category("counter", 0);
//!
//! let handle = runtime.create("counter", Counter(0)).unwrap();
//! runtime.step();
//! assert_eq!(runtime.resolve(&handle).unwrap().0, 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::runtime::{
    Runtime,
    RuntimeStats,
    StepReport,
    TeardownReport,
};

pub use engine::identity::Identity;

pub use engine::handle::{
    ObjectRef,
    OwnedHandle,
    WeakHandle,
};

pub use engine::object::{
    ActiveObject,
    StepContext,
};

pub use engine::priority::{
    Category,
    PriorityResolver,
};

pub use engine::config::RuntimeConfig;

pub use engine::commands::{Command, DestroyCause};

pub use engine::error::{
    RuntimeResult,
    RuntimeError,
    HandleResult,
    HandleError,
    CapacityError,
    StaleReferenceError,
    UnknownCategoryError,
    InvariantViolation,
};

pub use engine::types::{
    Priority,
    Tick,
    RuntimeID,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used runtime types.
///
/// Import with:
/// ```rust
/// use qao_runtime::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ActiveObject,
        Category,
        HandleError,
        Identity,
        OwnedHandle,
        Runtime,
        RuntimeConfig,
        RuntimeError,
        RuntimeResult,
        StepContext,
        WeakHandle,
    };
}
