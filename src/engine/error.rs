//! Error types for object creation, lookup and lifecycle management.
//!
//! This module declares focused, composable error types used across the
//! slot registry, priority resolver, orderer and runtime. Each error carries
//! enough context to make failures actionable while remaining small and cheap
//! to pass around or convert into the aggregate [`RuntimeError`].
//!
//! ## Taxonomy
//! * **Resource exhaustion** ([`CapacityError`]): no free slot and growth is
//!   capped. Recoverable; the caller may retry or drop the request.
//! * **Stale reference** ([`StaleReferenceError`]): the identity's generation
//!   no longer matches. Routine for observers of destroyed objects.
//! * **Configuration** ([`UnknownCategoryError`]): the category was never
//!   registered with the priority resolver. Recoverable.
//! * **Invariant violation** ([`InvariantViolation`]): a programming defect
//!   (double free, freeing a never-allocated identity, ordering an identity
//!   twice). Low-level components return it; the runtime refuses to continue
//!   and panics.
//! * **Rejected handoff** ([`HandleError`]): an operation that consumed an
//!   [`OwnedHandle`] failed. Wraps the [`RuntimeError`] and returns the
//!   handle so the object survives the failure.
//!
//! ## Typical flow
//! ```ignore
//! fn spawn(rt: &mut Runtime<Agent>) -> RuntimeResult<OwnedHandle> {
//!     // UnknownCategoryError and CapacityError both convert via `From`.
//!     rt.create(Category::new("agent"), Agent::default())
//! }
//!
//! match spawn(&mut rt) {
//!     Ok(handle) => { /* … */ }
//!     Err(RuntimeError::Capacity(e)) => eprintln!("{e}"),
//!     Err(RuntimeError::UnknownCategory(e)) => eprintln!("fix registration: {e}"),
//!     Err(other) => eprintln!("{other}"),
//! }
//! ```
//!
//! ## Display vs. Debug
//! * [`fmt::Display`] is short and suitable for logs.
//! * [`fmt::Debug`] (derived) retains full structure for diagnostics.

use std::fmt;

use crate::engine::handle::OwnedHandle;
use crate::engine::identity::Identity;
use crate::engine::priority::Category;
use crate::engine::types::RuntimeID;


/// Returned when the registry cannot hand out another slot because the
/// configured (or absolute) slot limit has been reached.
///
/// ### Fields
/// * `slots_needed`: slot count the allocation would have required.
/// * `capacity`: the upper bound that prevented the allocation.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityError {

    /// Total slots the operation attempted to occupy.
    pub slots_needed: u64,

    /// Current capacity limiting the operation.
    pub capacity: u64,
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "object limit reached ({} needed; capacity {})",
            self.slots_needed, self.capacity
        )
    }
}

impl std::error::Error for CapacityError {}

/// Returned when an identity no longer refers to a live object, typically
/// because it was destroyed and its slot generation moved on.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleReferenceError {

    /// The identity that failed validation.
    pub identity: Identity,
}

impl fmt::Display for StaleReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stale or dead object reference {}", self.identity)
    }
}

impl std::error::Error for StaleReferenceError {}

/// Returned when a category has no registered priority.
///
/// Unknown categories are never defaulted; an object running at an
/// unintended point in the step order is worse than a failed creation.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategoryError {

    /// The category that was looked up.
    pub category: Category,
}

impl fmt::Display for UnknownCategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no priority registered for category `{}`", self.category)
    }
}

impl std::error::Error for UnknownCategoryError {}

/// Structural invariant violations.
///
/// These indicate a defect in the caller, not a recoverable runtime
/// condition. The runtime converts them into panics through
/// [`invariant_violation`].

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {

    /// The identity's slot is vacant or its generation moved on.
    DoubleFree(Identity),

    /// The identity's index was never handed out by this registry.
    NeverAllocated(Identity),

    /// The identity is already a member of a priority bucket.
    AlreadyOrdered(Identity),

    /// A construction step targeted a slot that is not under construction.
    NotReserved(Identity),

    /// An object was restored into a slot that had not lent it out.
    NotBusy(Identity),

    /// An operation that requires a live object found none.
    NotLive(Identity),
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::DoubleFree(id) => write!(f, "double free of {id}"),
            InvariantViolation::NeverAllocated(id) => write!(f, "free of never-allocated {id}"),
            InvariantViolation::AlreadyOrdered(id) => write!(f, "{id} is already ordered"),
            InvariantViolation::NotReserved(id) => write!(f, "{id} is not under construction"),
            InvariantViolation::NotBusy(id) => write!(f, "{id} was not lent to an update"),
            InvariantViolation::NotLive(id) => write!(f, "{id} is not live"),
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// Aborts on a violated structural invariant.
///
/// Continuing after one of these would leave the registry and orderer
/// disagreeing about which objects exist.
#[cold]
#[track_caller]
pub fn invariant_violation(violation: InvariantViolation) -> ! {
    panic!("invariant violation: {violation}");
}

/// Unwraps a low-level result, aborting on a violated invariant.
#[inline]
#[track_caller]
pub(crate) fn upheld<V>(result: Result<V, InvariantViolation>) -> V {
    match result {
        Ok(value) => value,
        Err(violation) => invariant_violation(violation),
    }
}

/// High-level error for runtime entrypoints.
///
/// Aggregates the recoverable failure modes of `create`, lookup, destroy and
/// ownership transfer while preserving the underlying structured error.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {

    /// No slot could be allocated.
    Capacity(CapacityError),

    /// The identity or handle no longer refers to a live object.
    StaleReference(StaleReferenceError),

    /// The category has no registered priority.
    UnknownCategory(UnknownCategoryError),

    /// The handle was issued by a different runtime.
    ForeignHandle {
        /// Runtime that issued the handle.
        origin: RuntimeID,

        /// Runtime the handle was presented to.
        runtime: RuntimeID,
    },

    /// The operation requires a detached object.
    NotDetached(Identity),

    /// The operation requires a handle bound to no runtime.
    StillBound(Identity),

    /// The object is lent to its own update and cannot change hands.
    Busy(Identity),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Capacity(e) => write!(f, "{e}"),
            RuntimeError::StaleReference(e) => write!(f, "{e}"),
            RuntimeError::UnknownCategory(e) => write!(f, "{e}"),
            RuntimeError::ForeignHandle { origin, runtime } => write!(
                f,
                "handle issued by runtime {origin} presented to runtime {runtime}"
            ),
            RuntimeError::NotDetached(id) => write!(f, "{id} is not detached"),
            RuntimeError::StillBound(id) => write!(f, "handle for {id} is still bound to its runtime"),
            RuntimeError::Busy(id) => write!(f, "{id} is being updated"),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Capacity(e) => Some(e),
            RuntimeError::StaleReference(e) => Some(e),
            RuntimeError::UnknownCategory(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CapacityError> for RuntimeError {
    fn from(e: CapacityError) -> Self { RuntimeError::Capacity(e) }
}
impl From<StaleReferenceError> for RuntimeError {
    fn from(e: StaleReferenceError) -> Self { RuntimeError::StaleReference(e) }
}
impl From<UnknownCategoryError> for RuntimeError {
    fn from(e: UnknownCategoryError) -> Self { RuntimeError::UnknownCategory(e) }
}

impl RuntimeError {
    /// Shorthand for a stale-reference error on `identity`.
    pub fn stale(identity: Identity) -> Self {
        RuntimeError::StaleReference(StaleReferenceError { identity })
    }

    /// Returns `true` for the routine "object is gone" condition.
    pub fn is_stale(&self) -> bool {
        matches!(self, RuntimeError::StaleReference(_))
    }
}

/// Result alias for runtime entrypoints.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Failure of an operation that consumed an [`OwnedHandle`].
///
/// The handle comes back untouched, so a rejected call never destroys the
/// object. Dropping `handle` has the usual effect: a bound handle schedules
/// its object's destruction.

#[derive(Debug)]
pub struct HandleError {

    /// Why the operation was rejected.
    pub error: RuntimeError,

    /// The handle that was passed in.
    pub handle: OwnedHandle,
}

impl HandleError {
    pub(crate) fn new(error: impl Into<RuntimeError>, handle: OwnedHandle) -> Self {
        Self { error: error.into(), handle }
    }

    /// Takes the handle back, discarding the error.
    pub fn into_handle(self) -> OwnedHandle {
        self.handle
    }

    /// Splits into the error and the handle.
    pub fn into_parts(self) -> (RuntimeError, OwnedHandle) {
        (self.error, self.handle)
    }
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for HandleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Result alias for operations that consume an owned handle.
pub type HandleResult<T> = Result<T, HandleError>;
