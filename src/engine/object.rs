//! Active Object Abstractions
//!
//! This module defines the *object execution model* used by the runtime.
//!
//! An **active object** is long-lived state that is stepped once per tick.
//! Objects:
//! - run in ascending priority order, ties broken by creation order,
//! - may create new objects while they run (visible from the next step),
//! - may request destruction of any object (applied after the step),
//! - operate through a [`StepContext`] rather than direct runtime access.
//!
//! ## Closed category set
//!
//! A runtime is generic over one object type. Deployments with several kinds
//! of object use an enum and dispatch in [`ActiveObject::update`]; the set of
//! kinds is fixed at compile time and every kind is registered with the
//! priority resolver under a [`Category`].
//!
//! ```ignore
//! enum Actor { Spawner(Spawner), Walker(Walker) }
//!
//! impl ActiveObject for Actor {
//!     fn update(&mut self, ctx: &mut StepContext<'_, Self>) {
//!         match self {
//!             Actor::Spawner(s) => s.update(ctx),
//!             Actor::Walker(w) => w.update(ctx),
//!         }
//!     }
//! }
//! ```

use crate::engine::commands::Command;
use crate::engine::error::{
    invariant_violation, HandleResult, InvariantViolation, RuntimeError, RuntimeResult,
};
use crate::engine::handle::{ObjectRef, OwnedHandle, WeakHandle};
use crate::engine::identity::Identity;
use crate::engine::priority::Category;
use crate::engine::runtime::Runtime;
use crate::engine::types::{Priority, Tick};


/// Per-tick behaviour of a runtime object.
pub trait ActiveObject: Sized {
    /// Advances the object by one tick.
    fn update(&mut self, ctx: &mut StepContext<'_, Self>);

    /// Called once, right before the object is dropped by the runtime.
    ///
    /// Not called for objects moved to another runtime with
    /// [`Runtime::adopt`].
    fn on_destroy(&mut self, _identity: Identity) {}
}

/// View of the runtime handed to an object while it updates.
///
/// The updating object itself is lent out for the duration of the call, so
/// looking up [`StepContext::identity`] through the context returns `None`;
/// use `self` instead.
pub struct StepContext<'a, T: ActiveObject> {
    runtime: &'a mut Runtime<T>,
    current: Identity,
    tick: Tick,
}

impl<'a, T: ActiveObject> StepContext<'a, T> {
    pub(crate) fn new(runtime: &'a mut Runtime<T>, current: Identity, tick: Tick) -> Self {
        Self { runtime, current, tick }
    }

    /// Identity of the object being updated.
    #[inline] pub fn identity(&self) -> Identity { self.current }

    /// Tick being stepped.
    #[inline] pub fn tick(&self) -> Tick { self.tick }

    /// Creates an object. It joins the order immediately but is first
    /// visited on the next step.
    pub fn create(&mut self, category: impl Into<Category>, object: T) -> RuntimeResult<OwnedHandle> {
        self.runtime.create(category, object)
    }

    /// Like [`StepContext::create`], constructing the object from its
    /// identity.
    pub fn create_with<F>(&mut self, category: impl Into<Category>, construct: F) -> RuntimeResult<OwnedHandle>
    where
        F: FnOnce(Identity) -> T,
    {
        self.runtime.create_with(category, construct)
    }

    /// Schedules destruction of `identity` after this step's traversal.
    pub fn request_destroy(&mut self, identity: Identity) -> RuntimeResult<()> {
        self.runtime.request_destroy(identity)
    }

    /// Schedules destruction of the updating object.
    pub fn destroy_self(&mut self) {
        if self.runtime.request_destroy(self.current).is_err() {
            invariant_violation(InvariantViolation::NotLive(self.current));
        }
    }

    /// Schedules a move of `identity` to the tail of the `priority` bucket
    /// once this step's traversal has finished.
    pub fn set_priority(&mut self, identity: Identity, priority: Priority) -> RuntimeResult<()> {
        if !self.runtime.contains(identity) {
            return Err(RuntimeError::stale(identity));
        }
        self.runtime.enqueue(Command::Reprioritize { identity, priority });
        Ok(())
    }

    /// Removes an object from traversal immediately, keeping it alive.
    ///
    /// If it comes later in the current snapshot it is skipped this step.
    /// The updating object cannot detach itself; its handle comes back in a
    /// [`RuntimeError::Busy`] error.
    pub fn detach(&mut self, handle: OwnedHandle) -> HandleResult<OwnedHandle> {
        self.runtime.detach(handle)
    }

    /// Looks up another object.
    pub fn get(&self, identity: Identity) -> Option<&T> {
        self.runtime.get(identity)
    }

    /// Mutable lookup of another object. The updating object is lent out
    /// and never found here.
    pub fn get_mut(&mut self, identity: Identity) -> Option<&mut T> {
        self.runtime.get_mut(identity)
    }

    /// Looks up another object through a handle.
    pub fn resolve<H: ObjectRef>(&self, handle: &H) -> RuntimeResult<&T> {
        self.runtime.resolve(handle)
    }

    /// `true` if `identity` names an object that is live in this runtime.
    pub fn contains(&self, identity: Identity) -> bool {
        self.runtime.contains(identity)
    }

    /// Observer for a live object, including the one updating.
    pub fn observe(&self, identity: Identity) -> Option<WeakHandle> {
        self.runtime.observe(identity)
    }

    /// Stored priority of an object, detached ones included.
    pub fn priority_of(&self, identity: Identity) -> Option<Priority> {
        self.runtime.priority_of(identity)
    }
}
