//! Runtime orchestration and step execution.
//!
//! This module defines the central orchestration layer, responsible for:
//!
//! * owning the slot registry, the orderer and the priority resolver,
//! * creating objects (two-phase: constructed first, ordered second),
//! * stepping every ordered object once per tick,
//! * applying deferred commands at step boundaries,
//! * moving objects out of and between runtimes,
//! * tearing everything down in step order.
//!
//! ## Step protocol
//!
//! ```text
//! step(tick):
//!   apply deferred commands             (boundary)
//!   snapshot = orderer.snapshot()
//!   for id in snapshot:
//!     object = registry.take(id)        (skip if gone or detached)
//!     object.update(ctx)                (ctx may create / request destroy)
//!     registry.restore(id, object)
//!   apply deferred commands             (boundary)
//! ```
//!
//! The snapshot is a copy, so creations made mid-step never alter the walk,
//! and removals wait for the trailing boundary. That single protocol is what
//! keeps the traversal free of use-after-free and order corruption.
//!
//! ## Concurrency model
//!
//! Single-threaded and cooperative. The runtime is the only writer of its
//! registry and orderer; handles can only append to its command queue.
//! `Runtime` is `!Send` because handles share that queue through `Rc`.

use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, debug_span, trace, warn};

use crate::engine::commands::{Command, CommandQueue, DestroyCause};
use crate::engine::config::RuntimeConfig;
use crate::engine::error::{upheld, HandleError, HandleResult, RuntimeError, RuntimeResult};
use crate::engine::handle::{ObjectRef, OwnedHandle, WeakHandle};
use crate::engine::identity::Identity;
use crate::engine::object::{ActiveObject, StepContext};
use crate::engine::orderer::Orderer;
use crate::engine::priority::{Category, PriorityResolver};
use crate::engine::registry::{ObjectState, SlotRegistry};
use crate::engine::types::{Priority, RuntimeID, Tick};


static NEXT_RUNTIME_ID: AtomicU32 = AtomicU32::new(1);

/// Summary of one [`Runtime::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Tick that was stepped.
    pub tick: Tick,
    /// Identities in the step's snapshot.
    pub scheduled: usize,
    /// Objects whose update ran.
    pub visited: usize,
    /// Snapshot entries skipped because the object was gone or detached.
    pub skipped: usize,
    /// Objects created during the step.
    pub created: usize,
    /// Objects destroyed at the step's boundaries.
    pub destroyed: usize,
}

/// Outcome of [`Runtime::teardown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Destroyed identities, in destruction order.
    pub destroyed: Vec<Identity>,
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Objects currently ordered for stepping.
    pub ordered: usize,
    /// Objects currently detached.
    pub detached: usize,
    /// Occupied registry slots.
    pub occupied_slots: usize,
    /// Vacant registry slots awaiting reuse.
    pub free_slots: usize,
    /// Distinct priority buckets.
    pub buckets: usize,
    /// Commands waiting for the next boundary.
    pub pending_commands: usize,
    /// Objects created over the runtime's lifetime.
    pub created_total: u64,
    /// Objects destroyed over the runtime's lifetime.
    pub destroyed_total: u64,
    /// Next tick to be stepped.
    pub tick: Tick,
}

/// Registry and scheduler of active objects.
///
/// ## Invariants
/// * An identity is in the orderer iff its slot is `Live` or `Busy`.
/// * Its bucket matches the priority stored in its slot.
/// * No slot is freed while a step walks its snapshot.
pub struct Runtime<T: ActiveObject> {
    id: RuntimeID,
    registry: SlotRegistry<T>,
    orderer: Orderer,
    resolver: PriorityResolver,
    queue: Rc<CommandQueue>,
    tick: Tick,
    created_total: u64,
    destroyed_total: u64,
}

impl<T: ActiveObject> Default for Runtime<T> {
    fn default() -> Self { Self::new() }
}

impl<T: ActiveObject> Runtime<T> {
    /// Creates a runtime with default settings and no categories.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Creates a runtime from a configuration, seeding its priority table.
    pub fn with_config(config: RuntimeConfig) -> Self {
        let resolver = PriorityResolver::from_config(&config);
        Self::with_parts(&config, resolver)
    }

    /// Creates a runtime with default settings and a prepared resolver.
    pub fn with_resolver(resolver: PriorityResolver) -> Self {
        Self::with_parts(&RuntimeConfig::default(), resolver)
    }

    fn with_parts(config: &RuntimeConfig, resolver: PriorityResolver) -> Self {
        let id = NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed);
        debug!(runtime = id, categories = resolver.len(), max_slots = ?config.max_slots, "qao.runtime.new");
        Self {
            id,
            registry: SlotRegistry::with_limits(config.initial_capacity, config.max_slots),
            orderer: Orderer::new(),
            resolver,
            queue: Rc::new(CommandQueue::new(id)),
            tick: 0,
            created_total: 0,
            destroyed_total: 0,
        }
    }

    /// Process-unique id stamped into every handle this runtime issues.
    #[inline] pub fn id(&self) -> RuntimeID { self.id }

    /// Tick the next [`step`](Self::step) will run.
    #[inline] pub fn tick(&self) -> Tick { self.tick }

    /// Number of objects ordered for stepping.
    #[inline] pub fn len(&self) -> usize { self.orderer.len() }
    /// `true` if no object is ordered.
    #[inline] pub fn is_empty(&self) -> bool { self.orderer.is_empty() }

    /// Number of detached objects still held in this runtime's registry.
    pub fn detached_len(&self) -> usize {
        self.registry.len() - self.orderer.len()
    }

    /// Read-only view of the slot registry.
    pub fn registry(&self) -> &SlotRegistry<T> { &self.registry }

    /// Read-only view of the execution order.
    pub fn orderer(&self) -> &Orderer { &self.orderer }

    /// Category table used by [`create`](Self::create).
    pub fn resolver(&self) -> &PriorityResolver { &self.resolver }

    /// Registers a category. Affects objects created afterwards.
    pub fn register_category(&mut self, category: impl Into<Category>, priority: Priority) -> Option<Priority> {
        self.resolver.register(category, priority)
    }

    /// The order the next step would walk, ignoring pending commands.
    pub fn order(&self) -> Vec<Identity> {
        self.orderer.snapshot()
    }

    /// Current counters.
    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            ordered: self.orderer.len(),
            detached: self.detached_len(),
            occupied_slots: self.registry.len(),
            free_slots: self.registry.free_len(),
            buckets: self.orderer.bucket_count(),
            pending_commands: self.queue.len(),
            created_total: self.created_total,
            destroyed_total: self.destroyed_total,
            tick: self.tick,
        }
    }

    // ── creation ────────────────────────────────────────────────────────────

    /// Creates an object under `category` and returns its owning handle.
    pub fn create(&mut self, category: impl Into<Category>, object: T) -> RuntimeResult<OwnedHandle> {
        self.create_with(category, |_| object)
    }

    /// Creates an object whose construction needs its own identity.
    ///
    /// The slot is reserved before `construct` runs but the object is not
    /// visible to lookups or ordered until construction has returned.
    pub fn create_with<F>(&mut self, category: impl Into<Category>, construct: F) -> RuntimeResult<OwnedHandle>
    where
        F: FnOnce(Identity) -> T,
    {
        let category = category.into();
        let priority = self.resolver.resolve(&category)?;
        let identity = self.registry.allocate(category, priority)?;

        let object = construct(identity);
        upheld(self.registry.fill(identity, object));
        upheld(self.orderer.insert(identity, priority));

        self.created_total += 1;
        trace!(runtime = self.id, %identity, priority, "qao.create");
        Ok(OwnedHandle::bound(identity, &self.queue))
    }

    // ── lookup ──────────────────────────────────────────────────────────────

    /// Object named by `identity`, if it is live and visible.
    pub fn get(&self, identity: Identity) -> Option<&T> {
        self.registry.get(identity)
    }

    /// Mutable counterpart of [`get`](Self::get).
    pub fn get_mut(&mut self, identity: Identity) -> Option<&mut T> {
        self.registry.get_mut(identity)
    }

    /// `true` if `identity` names a live object (including one mid-update).
    pub fn contains(&self, identity: Identity) -> bool {
        self.registry.is_live(identity)
    }

    /// `true` if the handle is bound to this runtime and its object is live.
    pub fn is_valid<H: ObjectRef>(&self, handle: &H) -> bool {
        handle.bound_to(self.id) && self.registry.is_live(handle.identity())
    }

    /// Dereferences a handle, failing with a stale-reference error if the
    /// handle is unbound, bound elsewhere, or its object is gone.
    pub fn resolve<H: ObjectRef>(&self, handle: &H) -> RuntimeResult<&T> {
        let identity = handle.identity();
        if !handle.bound_to(self.id) {
            return Err(RuntimeError::stale(identity));
        }
        self.registry.get(identity).ok_or(RuntimeError::stale(identity))
    }

    /// Mutable counterpart of [`resolve`](Self::resolve).
    pub fn resolve_mut<H: ObjectRef>(&mut self, handle: &H) -> RuntimeResult<&mut T> {
        let identity = handle.identity();
        if !handle.bound_to(self.id) {
            return Err(RuntimeError::stale(identity));
        }
        self.registry.get_mut(identity).ok_or(RuntimeError::stale(identity))
    }

    /// Observer for a live object.
    pub fn observe(&self, identity: Identity) -> Option<WeakHandle> {
        self.registry
            .is_live(identity)
            .then(|| WeakHandle::bound(identity, &self.queue))
    }

    /// Stored priority of a live or detached object.
    pub fn priority_of(&self, identity: Identity) -> Option<Priority> {
        self.registry.priority_of(identity)
    }

    /// Category a live or detached object was created under.
    pub fn category_of(&self, identity: Identity) -> Option<&Category> {
        self.registry.category_of(identity)
    }

    // ── destruction ─────────────────────────────────────────────────────────

    pub(crate) fn enqueue(&self, command: Command) {
        self.queue.push(command);
    }

    /// Schedules destruction of `identity` for the next step boundary.
    ///
    /// Repeated requests for the same identity are coalesced.
    pub fn request_destroy(&mut self, identity: Identity) -> RuntimeResult<()> {
        if !self.registry.is_live(identity) {
            return Err(RuntimeError::stale(identity));
        }
        if !self.queue.is_pending_destroy(identity) {
            self.queue.push(Command::Destroy { identity, cause: DestroyCause::Requested });
        }
        Ok(())
    }

    /// Destroys an object synchronously.
    ///
    /// Only reachable outside a step. Accepts a bound handle of a live
    /// object, or an unbound handle of an object detached from this runtime.
    /// A rejected handle is returned inside the error.
    pub fn destroy_immediate(&mut self, handle: OwnedHandle) -> HandleResult<()> {
        let identity = handle.identity();
        if let Err(error) = self.check_origin(&handle) {
            return Err(HandleError::new(error, handle));
        }

        let destroyable = match self.registry.state(identity) {
            Some(ObjectState::Live(_)) => handle.is_bound_to(self.id),
            Some(ObjectState::Detached(_)) => !handle.is_bound(),
            _ => false,
        };
        if !destroyable {
            return Err(HandleError::new(RuntimeError::stale(identity), handle));
        }

        handle.disarm();
        self.destroy_slot(identity);
        Ok(())
    }

    /// Applies every queued command in request order.
    ///
    /// Commands produced while applying (an object holding owned handles
    /// drops them when destroyed) are applied too. Returns the number of
    /// objects destroyed.
    pub fn apply_deferred(&mut self) -> usize {
        self.apply_deferred_into(None)
    }

    fn apply_deferred_into(&mut self, mut log: Option<&mut Vec<Identity>>) -> usize {
        let mut destroyed = 0;
        loop {
            let batch = self.queue.drain();
            if batch.is_empty() {
                break;
            }
            for command in batch {
                match command {
                    Command::Destroy { identity, cause } => {
                        if !matches!(self.registry.state(identity), Some(ObjectState::Live(_))) {
                            trace!(runtime = self.id, %identity, ?cause, "qao.destroy.skip");
                            continue;
                        }
                        self.destroy_slot(identity);
                        if let Some(log) = log.as_deref_mut() {
                            log.push(identity);
                        }
                        destroyed += 1;
                    }
                    Command::Reprioritize { identity, priority } => {
                        if self.set_priority(identity, priority).is_err() {
                            trace!(runtime = self.id, %identity, priority, "qao.reprioritize.skip");
                        }
                    }
                }
            }
        }
        destroyed
    }

    /// Removes `identity` from the order, frees its slot and drops the
    /// object after its destroy hook.
    fn destroy_slot(&mut self, identity: Identity) {
        self.orderer.remove(identity);
        let freed = upheld(self.registry.free(identity));
        self.destroyed_total += 1;
        trace!(runtime = self.id, %identity, category = %freed.category, "qao.destroy");
        if let Some(mut object) = freed.object {
            object.on_destroy(identity);
        }
    }

    // ── priority ────────────────────────────────────────────────────────────

    /// Re-prioritises an object immediately.
    ///
    /// An ordered object moves to the tail of its new bucket. A detached
    /// object keeps the new priority when reattached. Returns the previous
    /// priority.
    pub fn set_priority(&mut self, identity: Identity, priority: Priority) -> RuntimeResult<Priority> {
        let Some(previous) = self.registry.priority_of(identity) else {
            return Err(RuntimeError::stale(identity));
        };
        if matches!(self.registry.state(identity), Some(ObjectState::Reserved)) {
            return Err(RuntimeError::stale(identity));
        }
        self.registry.set_priority(identity, priority);
        self.orderer.reprioritize(identity, priority);
        Ok(previous)
    }

    // ── stepping ────────────────────────────────────────────────────────────

    /// Runs one tick.
    pub fn step(&mut self) -> StepReport {
        let tick = self.tick;
        let span = debug_span!("qao.step", runtime = self.id, tick);
        let _entered = span.enter();

        let created_before = self.created_total;
        let mut report = StepReport { tick, ..StepReport::default() };
        report.destroyed += self.apply_deferred();

        let snapshot = self.orderer.snapshot();
        report.scheduled = snapshot.len();

        for identity in snapshot {
            let Some(mut object) = self.registry.take(identity) else {
                trace!(%identity, "qao.step.skip");
                report.skipped += 1;
                continue;
            };

            let mut ctx = StepContext::new(self, identity, tick);
            object.update(&mut ctx);

            upheld(self.registry.restore(identity, object));
            report.visited += 1;
        }

        report.destroyed += self.apply_deferred();
        report.created = (self.created_total - created_before) as usize;
        self.tick += 1;

        debug!(
            visited = report.visited,
            skipped = report.skipped,
            created = report.created,
            destroyed = report.destroyed,
            "qao.step.done"
        );
        report
    }

    // ── ownership transfer ──────────────────────────────────────────────────

    fn check_origin(&self, handle: &OwnedHandle) -> RuntimeResult<()> {
        if handle.origin() != self.id {
            return Err(RuntimeError::ForeignHandle { origin: handle.origin(), runtime: self.id });
        }
        Ok(())
    }

    /// Takes an object out of traversal without destroying it.
    ///
    /// The object stays in the registry, unreachable through lookups, under
    /// a new identity; the returned handle carries it and is bound to no
    /// runtime. Observers and commands naming the old identity are stale.
    /// The holder may [`attach`](Self::attach) it again, move it to another
    /// runtime with [`adopt`](Self::adopt), or destroy it with
    /// [`destroy_immediate`](Self::destroy_immediate).
    pub fn detach(&mut self, handle: OwnedHandle) -> HandleResult<OwnedHandle> {
        let identity = handle.identity();
        if let Err(error) = self.check_origin(&handle) {
            return Err(HandleError::new(error, handle));
        }
        let rejected = match self.registry.state(identity) {
            Some(ObjectState::Detached(_)) if !handle.is_bound() => return Ok(handle),
            Some(ObjectState::Busy) => RuntimeError::Busy(identity),
            Some(ObjectState::Live(_)) if handle.is_bound_to(self.id) => {
                return match self.detach_slot(identity) {
                    Ok(detached) => {
                        handle.disarm();
                        Ok(detached)
                    }
                    Err(error) => Err(HandleError::new(error, handle)),
                };
            }
            _ => RuntimeError::stale(identity),
        };
        Err(HandleError::new(rejected, handle))
    }

    /// Detaches by identity, for callers that never held the owning handle.
    ///
    /// Ownership moves to the returned unbound handle. Any owning handle
    /// still held elsewhere names the old identity and goes stale, so
    /// dropping it later destroys nothing.
    pub fn detach_object(&mut self, identity: Identity) -> RuntimeResult<OwnedHandle> {
        match self.registry.state(identity) {
            Some(ObjectState::Live(_)) => self.detach_slot(identity),
            Some(ObjectState::Busy) => Err(RuntimeError::Busy(identity)),
            _ => Err(RuntimeError::stale(identity)),
        }
    }

    fn detach_slot(&mut self, identity: Identity) -> RuntimeResult<OwnedHandle> {
        let detached = self.registry.detach(identity)?;
        self.orderer.remove(identity);
        let purged = self.queue.purge(identity);
        trace!(runtime = self.id, %identity, %detached, purged, "qao.detach");
        Ok(OwnedHandle::unbound(detached, self.id))
    }

    /// Re-admits an object detached from this runtime.
    ///
    /// It joins the tail of its priority bucket and is first visited on the
    /// next step.
    pub fn attach(&mut self, handle: OwnedHandle) -> HandleResult<OwnedHandle> {
        let identity = handle.identity();
        if let Err(error) = self.check_origin(&handle) {
            return Err(HandleError::new(error, handle));
        }
        if handle.is_bound() {
            return Err(HandleError::new(RuntimeError::StillBound(identity), handle));
        }
        let priority = match self.registry.priority_of(identity) {
            Some(priority) if self.registry.is_detached(identity) => priority,
            Some(_) => return Err(HandleError::new(RuntimeError::NotDetached(identity), handle)),
            None => return Err(HandleError::new(RuntimeError::stale(identity), handle)),
        };

        self.registry.reattach(identity);
        upheld(self.orderer.insert(identity, priority));
        handle.disarm();
        trace!(runtime = self.id, %identity, priority, "qao.attach");
        Ok(OwnedHandle::bound(identity, &self.queue))
    }

    /// Moves an object detached from `source` into this runtime.
    ///
    /// The object keeps its category; its priority is resolved by this
    /// runtime. The source slot is freed (its generation advances) and a new
    /// identity is issued here. If the category is unknown here or no slot is
    /// available, the object stays detached in `source` and the handle is
    /// returned inside the error.
    pub fn adopt(&mut self, source: &mut Runtime<T>, handle: OwnedHandle) -> HandleResult<OwnedHandle> {
        let identity = handle.identity();
        if let Err(error) = source.check_origin(&handle) {
            return Err(HandleError::new(error, handle));
        }
        if handle.is_bound() {
            return Err(HandleError::new(RuntimeError::StillBound(identity), handle));
        }
        let category = match source.registry.category_of(identity) {
            Some(category) if source.registry.is_detached(identity) => category.clone(),
            Some(_) => return Err(HandleError::new(RuntimeError::NotDetached(identity), handle)),
            None => return Err(HandleError::new(RuntimeError::stale(identity), handle)),
        };

        let slot = self
            .resolver
            .resolve(&category)
            .map_err(RuntimeError::from)
            .and_then(|priority| Ok((self.registry.allocate(category, priority)?, priority)));
        let (adopted, priority) = match slot {
            Ok(slot) => slot,
            Err(error) => return Err(HandleError::new(error, handle)),
        };

        let freed = upheld(source.registry.free(identity));
        let Some(object) = freed.object else {
            unreachable!("detached slots always hold an object");
        };
        upheld(self.registry.fill(adopted, object));
        upheld(self.orderer.insert(adopted, priority));
        handle.disarm();

        self.created_total += 1;
        debug!(from = source.id, to = self.id, %identity, %adopted, "qao.adopt");
        Ok(OwnedHandle::bound(adopted, &self.queue))
    }

    // ── teardown ────────────────────────────────────────────────────────────

    /// Destroys every object.
    ///
    /// Pending commands are applied first, then ordered objects are destroyed
    /// in step order, then detached objects in slot order. The registry is
    /// empty afterwards; the runtime itself remains usable.
    pub fn teardown(&mut self) -> TeardownReport {
        let span = debug_span!("qao.teardown", runtime = self.id);
        let _entered = span.enter();

        let mut report = TeardownReport::default();
        self.apply_deferred_into(Some(&mut report.destroyed));

        for identity in self.orderer.snapshot() {
            self.destroy_slot(identity);
            report.destroyed.push(identity);
        }

        let detached: Vec<Identity> = self.registry.detached().collect();
        for identity in detached {
            self.destroy_slot(identity);
            report.destroyed.push(identity);
        }

        // Destroyed objects may have dropped owned handles of objects that
        // are already gone.
        self.apply_deferred_into(Some(&mut report.destroyed));

        let leftovers: Vec<Identity> = self.registry.occupied_identities().collect();
        for identity in leftovers {
            warn!(%identity, "qao.teardown.leftover");
            self.destroy_slot(identity);
        }

        debug!(destroyed = report.destroyed.len(), "qao.teardown.done");
        report
    }
}

impl<T: ActiveObject> Drop for Runtime<T> {
    fn drop(&mut self) {
        self.teardown();
        self.queue.close();
    }
}
