//! Generational slot arena owning every active object.
//!
//! The registry maps [`Identity`] values to object state. It knows nothing
//! about execution order; that is the orderer's job. Keeping storage and
//! order apart means a slot can be freed, lent out or detached without the
//! registry ever touching a traversal in progress.
//!
//! ## Slot lifecycle
//!
//! ```text
//! Vacant ──allocate──▶ Reserved ──fill──▶ Live ◀──restore── Busy
//!   ▲                                      │ ╰──take──────────▲
//!   │                                      ├──detach──▶ Detached
//!   ╰───────────────free (generation + 1)──┴◀─────────────────╯
//! ```
//!
//! * `Reserved` objects are under construction and invisible to lookups.
//! * `Busy` objects are lent to their own update callback; they count as
//!   live but cannot be borrowed by anyone else.
//! * `Detached` objects are alive but unreachable through lookups until
//!   reattached or freed by their new owner. Detaching re-issues the object
//!   under a new generation, so no identity from before the detach survives
//!   it.
//!
//! ## Generations
//!
//! A slot's generation starts at 0 and is bumped on every free and every
//! detach, never on first use. A slot whose generation would wrap is retired instead of being
//! pushed back onto the free list, so no identity is ever issued twice.

use crate::engine::error::{invariant_violation, upheld, CapacityError, InvariantViolation};
use crate::engine::identity::Identity;
use crate::engine::priority::Category;
use crate::engine::types::{GenerationID, IndexID, Priority, INDEX_CAP};


/// State of an occupied slot.
#[derive(Debug)]
pub enum ObjectState<T> {
    /// Allocated but still under construction.
    Reserved,
    /// Visible to lookups and traversal.
    Live(T),
    /// Temporarily lent to its own update callback.
    Busy,
    /// Removed from traversal; owned by whoever holds the detached handle.
    Detached(T),
}

#[derive(Debug)]
enum SlotEntry<T> {
    Vacant { next_free: Option<IndexID> },
    Occupied { category: Category, priority: Priority, state: ObjectState<T> },
}

#[derive(Debug)]
struct Slot<T> {
    generation: GenerationID,
    entry: SlotEntry<T>,
}

/// What [`SlotRegistry::free`] hands back to the caller.
#[derive(Debug)]
pub struct FreedSlot<T> {
    /// Category the object was created under.
    pub category: Category,
    /// Priority the object had when freed.
    pub priority: Priority,
    /// The object, unless it was freed while still under construction.
    pub object: Option<T>,
}

/// Growable arena of generation-checked slots.
#[derive(Debug)]
pub struct SlotRegistry<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<IndexID>,
    free_len: usize,
    occupied: usize,
    max_slots: Option<u32>,
}

impl<T> Default for SlotRegistry<T> {
    fn default() -> Self { Self::new() }
}

impl<T> SlotRegistry<T> {
    /// Empty registry without a slot limit.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            free_len: 0,
            occupied: 0,
            max_slots: None,
        }
    }

    /// Creates a registry with room for `capacity` slots and an optional cap
    /// on simultaneously occupied slots.
    pub fn with_limits(capacity: usize, max_slots: Option<u32>) -> Self {
        let mut registry = Self::new();
        registry.slots.reserve(capacity);
        registry.max_slots = max_slots;
        registry
    }

    /// Number of occupied slots (live, busy, reserved or detached).
    #[inline] pub fn len(&self) -> usize { self.occupied }
    #[inline] pub fn is_empty(&self) -> bool { self.occupied == 0 }
    /// Number of slots ever created, occupied or not.
    #[inline] pub fn capacity(&self) -> usize { self.slots.len() }
    /// Number of vacant slots waiting on the free list.
    #[inline] pub fn free_len(&self) -> usize { self.free_len }

    fn limit(&self) -> u64 {
        self.max_slots.map_or(INDEX_CAP, |cap| (cap as u64).min(INDEX_CAP))
    }

    /// Reserves a slot for an object of `category` running at `priority`.
    ///
    /// Reuses the most recently freed slot if there is one, otherwise grows
    /// the arena by one slot. The slot starts out `Reserved`.
    pub fn allocate(&mut self, category: Category, priority: Priority) -> Result<Identity, CapacityError> {
        let slots_needed = self.occupied as u64 + 1;
        let capacity = self.limit();
        if slots_needed > capacity {
            return Err(CapacityError { slots_needed, capacity });
        }

        let index = match self.free_head {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                let SlotEntry::Vacant { next_free } = slot.entry else {
                    unreachable!("free list points at an occupied slot");
                };
                self.free_head = next_free;
                self.free_len -= 1;
                index
            }
            None => {
                if self.slots.len() as u64 >= INDEX_CAP {
                    return Err(CapacityError { slots_needed, capacity: INDEX_CAP });
                }
                self.slots.push(Slot {
                    generation: 0,
                    entry: SlotEntry::Vacant { next_free: None },
                });
                (self.slots.len() - 1) as IndexID
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.entry = SlotEntry::Occupied { category, priority, state: ObjectState::Reserved };
        self.occupied += 1;
        Ok(Identity::new(index, slot.generation))
    }

    fn occupied(&self, identity: Identity) -> Option<(&Category, Priority, &ObjectState<T>)> {
        let slot = self.slots.get(identity.index() as usize)?;
        if slot.generation != identity.generation() {
            return None;
        }
        match &slot.entry {
            SlotEntry::Occupied { category, priority, state } => Some((category, *priority, state)),
            SlotEntry::Vacant { .. } => None,
        }
    }

    fn state_mut(&mut self, identity: Identity) -> Option<&mut ObjectState<T>> {
        let slot = self.slots.get_mut(identity.index() as usize)?;
        if slot.generation != identity.generation() {
            return None;
        }
        match &mut slot.entry {
            SlotEntry::Occupied { state, .. } => Some(state),
            SlotEntry::Vacant { .. } => None,
        }
    }

    /// Completes construction: `Reserved -> Live`.
    pub fn fill(&mut self, identity: Identity, object: T) -> Result<(), InvariantViolation> {
        match self.state_mut(identity) {
            Some(state @ ObjectState::Reserved) => {
                *state = ObjectState::Live(object);
                Ok(())
            }
            _ => Err(InvariantViolation::NotReserved(identity)),
        }
    }

    /// Returns the object iff `identity` names a live, visible object.
    pub fn get(&self, identity: Identity) -> Option<&T> {
        match self.occupied(identity)? {
            (_, _, ObjectState::Live(object)) => Some(object),
            _ => None,
        }
    }

    /// Mutable variant of [`SlotRegistry::get`].
    pub fn get_mut(&mut self, identity: Identity) -> Option<&mut T> {
        match self.state_mut(identity)? {
            ObjectState::Live(object) => Some(object),
            _ => None,
        }
    }

    /// `true` if the object exists and is either visible or mid-update.
    pub fn is_live(&self, identity: Identity) -> bool {
        matches!(
            self.occupied(identity),
            Some((_, _, ObjectState::Live(_) | ObjectState::Busy))
        )
    }

    /// `true` if the object exists and is detached.
    pub fn is_detached(&self, identity: Identity) -> bool {
        matches!(self.occupied(identity), Some((_, _, ObjectState::Detached(_))))
    }

    /// State of an occupied slot, if `identity` is current.
    pub fn state(&self, identity: Identity) -> Option<&ObjectState<T>> {
        self.occupied(identity).map(|(_, _, state)| state)
    }

    /// Stored priority of an occupied slot.
    pub fn priority_of(&self, identity: Identity) -> Option<Priority> {
        self.occupied(identity).map(|(_, priority, _)| priority)
    }

    /// Category an occupied slot was created under.
    pub fn category_of(&self, identity: Identity) -> Option<&Category> {
        self.occupied(identity).map(|(category, _, _)| category)
    }

    /// Overwrites the stored priority of an occupied slot.
    pub fn set_priority(&mut self, identity: Identity, new_priority: Priority) -> bool {
        let Some(slot) = self.slots.get_mut(identity.index() as usize) else { return false; };
        if slot.generation != identity.generation() {
            return false;
        }
        match &mut slot.entry {
            SlotEntry::Occupied { priority, .. } => {
                *priority = new_priority;
                true
            }
            SlotEntry::Vacant { .. } => false,
        }
    }

    /// Lends a live object out: `Live -> Busy`.
    pub fn take(&mut self, identity: Identity) -> Option<T> {
        let state = self.state_mut(identity)?;
        match std::mem::replace(state, ObjectState::Busy) {
            ObjectState::Live(object) => Some(object),
            other => {
                *state = other;
                None
            }
        }
    }

    /// Returns a lent object: `Busy -> Live`.
    pub fn restore(&mut self, identity: Identity, object: T) -> Result<(), InvariantViolation> {
        match self.state_mut(identity) {
            Some(state @ ObjectState::Busy) => {
                *state = ObjectState::Live(object);
                Ok(())
            }
            _ => Err(InvariantViolation::NotBusy(identity)),
        }
    }

    /// Hides a live object from lookups: `Live -> Detached`.
    ///
    /// The object is re-issued under a new identity so every reference to
    /// the old one is stale from here on. The slot keeps its index and
    /// advances its generation; a slot at its last generation is retired and
    /// the object moves to a freshly allocated slot, which can fail with a
    /// [`CapacityError`] (nothing changes in that case).
    ///
    /// Detaching anything but a live object is an invariant violation.
    pub fn detach(&mut self, identity: Identity) -> Result<Identity, CapacityError> {
        let Some((category, priority, ObjectState::Live(_))) = self.occupied(identity) else {
            invariant_violation(InvariantViolation::NotLive(identity));
        };

        if identity.generation() == GenerationID::MAX {
            let category = category.clone();
            let fresh = self.allocate(category, priority)?;
            let freed = upheld(self.free(identity));
            let (Some(state), Some(object)) = (self.state_mut(fresh), freed.object) else {
                unreachable!("fresh slot is reserved and the freed slot was live");
            };
            *state = ObjectState::Detached(object);
            return Ok(fresh);
        }

        let slot = &mut self.slots[identity.index() as usize];
        slot.generation += 1;
        if let SlotEntry::Occupied { state, .. } = &mut slot.entry {
            if let ObjectState::Live(object) = std::mem::replace(state, ObjectState::Reserved) {
                *state = ObjectState::Detached(object);
            }
        }
        Ok(Identity::new(identity.index(), slot.generation))
    }

    /// Makes a detached object visible again: `Detached -> Live`.
    pub fn reattach(&mut self, identity: Identity) -> bool {
        let Some(state) = self.state_mut(identity) else { return false; };
        match std::mem::replace(state, ObjectState::Reserved) {
            ObjectState::Detached(object) => {
                *state = ObjectState::Live(object);
                true
            }
            other => {
                *state = other;
                false
            }
        }
    }

    /// Releases a slot and advances its generation.
    ///
    /// Freeing a vacant slot, a stale identity or an index this registry
    /// never issued is an invariant violation.
    pub fn free(&mut self, identity: Identity) -> Result<FreedSlot<T>, InvariantViolation> {
        let index = identity.index();
        let Some(slot) = self.slots.get_mut(index as usize) else {
            return Err(InvariantViolation::NeverAllocated(identity));
        };
        if slot.generation != identity.generation() || matches!(slot.entry, SlotEntry::Vacant { .. }) {
            return Err(InvariantViolation::DoubleFree(identity));
        }

        let retired = slot.generation == GenerationID::MAX;
        let vacant = SlotEntry::Vacant { next_free: if retired { None } else { self.free_head } };
        let SlotEntry::Occupied { category, priority, state } = std::mem::replace(&mut slot.entry, vacant) else {
            unreachable!("checked occupied above");
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.occupied -= 1;
        if !retired {
            self.free_head = Some(index);
            self.free_len += 1;
        }

        let object = match state {
            ObjectState::Live(object) | ObjectState::Detached(object) => Some(object),
            ObjectState::Reserved | ObjectState::Busy => None,
        };
        Ok(FreedSlot { category, priority, object })
    }

    /// Identities of all detached objects, in slot order.
    pub fn detached(&self) -> impl Iterator<Item = Identity> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| match &slot.entry {
            SlotEntry::Occupied { state: ObjectState::Detached(_), .. } => {
                Some(Identity::new(index as IndexID, slot.generation))
            }
            _ => None,
        })
    }

    /// Identities of all occupied slots, in slot order.
    pub fn occupied_identities(&self) -> impl Iterator<Item = Identity> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| match &slot.entry {
            SlotEntry::Occupied { .. } => Some(Identity::new(index as IndexID, slot.generation)),
            SlotEntry::Vacant { .. } => None,
        })
    }
}
