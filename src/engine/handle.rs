//! Owning and observing handles.
//!
//! A handle is a capability token over an [`Identity`]:
//!
//! * [`OwnedHandle`] is move-only. Exactly one exists per created object.
//!   Dropping it while bound schedules the object's destruction for the next
//!   step boundary.
//! * [`WeakHandle`] is a freely cloneable observer. It never keeps an object
//!   alive and must be re-validated against the runtime on every access.
//!
//! Copying ownership is impossible: the only way from an owned handle to a
//! second token is [`OwnedHandle::observe`], which yields an observer.
//!
//! Handles reach their runtime through a weak pointer to its command queue,
//! so a handle that outlives its runtime is inert rather than dangling.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::engine::commands::{Command, CommandQueue, DestroyCause};
use crate::engine::identity::Identity;
use crate::engine::types::RuntimeID;


/// Identity plus the runtime it belongs to.
#[derive(Clone)]
struct Binding {
    identity: Identity,
    origin: RuntimeID,
    link: Option<Weak<CommandQueue>>,
}

impl Binding {
    fn is_bound(&self) -> bool {
        self.link.as_ref().is_some_and(|link| link.strong_count() > 0)
    }

    fn is_bound_to(&self, runtime: RuntimeID) -> bool {
        self.link
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|queue| queue.runtime() == runtime)
    }
}

/// Unique owner of a runtime object.
///
/// Not `Clone`. Dropping a bound handle enqueues a destroy command; use
/// [`OwnedHandle::release`] or [`OwnedHandle::into_identity`] to give up
/// ownership without destroying the object.
pub struct OwnedHandle {
    binding: Binding,
}

impl OwnedHandle {
    pub(crate) fn bound(identity: Identity, queue: &Rc<CommandQueue>) -> Self {
        Self {
            binding: Binding {
                identity,
                origin: queue.runtime(),
                link: Some(Rc::downgrade(queue)),
            },
        }
    }

    pub(crate) fn unbound(identity: Identity, origin: RuntimeID) -> Self {
        Self { binding: Binding { identity, origin, link: None } }
    }

    /// Identity of the owned object.
    #[inline] pub fn identity(&self) -> Identity { self.binding.identity }

    /// Runtime that issued this handle.
    #[inline] pub fn origin(&self) -> RuntimeID { self.binding.origin }

    /// `true` while the handle is attached to a runtime that still exists.
    pub fn is_bound(&self) -> bool { self.binding.is_bound() }

    pub(crate) fn is_bound_to(&self, runtime: RuntimeID) -> bool {
        self.binding.is_bound_to(runtime)
    }

    /// Creates an observer of the same object.
    pub fn observe(&self) -> WeakHandle {
        WeakHandle { binding: self.binding.clone() }
    }

    /// Gives up ownership without destroying the object.
    ///
    /// The runtime keeps the object until it is destroyed by identity or the
    /// runtime is torn down.
    pub fn release(mut self) -> WeakHandle {
        let link = self.binding.link.take();
        WeakHandle {
            binding: Binding { identity: self.binding.identity, origin: self.binding.origin, link },
        }
    }

    /// Forgets ownership and returns the bare identity.
    pub fn into_identity(mut self) -> Identity {
        self.binding.link = None;
        self.binding.identity
    }

    /// Consumes the handle without enqueueing anything. Used by the runtime
    /// when it has already dealt with the object itself.
    pub(crate) fn disarm(self) -> Identity {
        self.into_identity()
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        let Some(queue) = self.binding.link.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        queue.push(Command::Destroy {
            identity: self.binding.identity,
            cause: DestroyCause::HandleDropped,
        });
    }
}

impl fmt::Debug for OwnedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedHandle")
            .field("identity", &self.binding.identity)
            .field("origin", &self.binding.origin)
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Non-owning observer of a runtime object.
#[derive(Clone)]
pub struct WeakHandle {
    binding: Binding,
}

impl WeakHandle {
    /// An observer bound to nothing. Never valid.
    pub fn null() -> Self {
        Self { binding: Binding { identity: Identity::NULL, origin: 0, link: None } }
    }

    pub(crate) fn bound(identity: Identity, queue: &Rc<CommandQueue>) -> Self {
        Self {
            binding: Binding {
                identity,
                origin: queue.runtime(),
                link: Some(Rc::downgrade(queue)),
            },
        }
    }

    /// Identity of the observed object.
    #[inline] pub fn identity(&self) -> Identity { self.binding.identity }

    /// Runtime that issued this observer.
    #[inline] pub fn origin(&self) -> RuntimeID { self.binding.origin }

    /// `true` for an observer that was never bound to an object.
    pub fn is_null(&self) -> bool { self.binding.identity.is_null() }

    /// `true` while the issuing runtime is still alive.
    pub fn is_bound(&self) -> bool { self.binding.is_bound() }

    pub(crate) fn is_bound_to(&self, runtime: RuntimeID) -> bool {
        self.binding.is_bound_to(runtime)
    }
}

impl Default for WeakHandle {
    fn default() -> Self { Self::null() }
}

impl PartialEq for WeakHandle {
    fn eq(&self, other: &Self) -> bool {
        self.binding.identity == other.binding.identity && self.binding.origin == other.binding.origin
    }
}

impl Eq for WeakHandle {}

impl fmt::Debug for WeakHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakHandle")
            .field("identity", &self.binding.identity)
            .field("origin", &self.binding.origin)
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Anything that names a runtime object.
///
/// Lets lookups accept handles of either flavour.
pub trait ObjectRef {
    /// The named identity.
    fn identity(&self) -> Identity;

    /// `true` if the reference is bound to the runtime with id `runtime`.
    fn bound_to(&self, runtime: RuntimeID) -> bool;
}

impl ObjectRef for OwnedHandle {
    fn identity(&self) -> Identity { self.binding.identity }
    fn bound_to(&self, runtime: RuntimeID) -> bool { self.is_bound_to(runtime) }
}

impl ObjectRef for WeakHandle {
    fn identity(&self) -> Identity { self.binding.identity }
    fn bound_to(&self, runtime: RuntimeID) -> bool { self.is_bound_to(runtime) }
}
