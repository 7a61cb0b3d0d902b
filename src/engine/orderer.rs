//! Priority-bucketed execution order.
//!
//! The orderer holds every identity that should be stepped, partitioned into
//! buckets by priority. It never stores object state and never touches the
//! registry.
//!
//! ## Ordering model
//!
//! * Buckets are visited in **ascending** priority order.
//! * Within a bucket, identities keep their insertion order; that is the
//!   deterministic tie-break between objects of equal priority.
//! * Removing an identity never reorders the rest of its bucket.
//!
//! ## Snapshots
//!
//! [`Orderer::snapshot`] copies the full cross-bucket order. A step walks the
//! copy, so objects inserted while the step runs only show up in the next
//! snapshot, and removals are deferred by the runtime until the walk ends.
//!
//! ## Complexity
//! * `insert`: O(log b) for b buckets
//! * `remove`: O(log b + bucket size)
//! * `snapshot`: O(n)

use std::collections::{BTreeMap, HashMap};

use crate::engine::error::InvariantViolation;
use crate::engine::identity::Identity;
use crate::engine::types::Priority;


/// Identities partitioned into insertion-ordered priority buckets.
#[derive(Debug, Default, Clone)]
pub struct Orderer {
    buckets: BTreeMap<Priority, Vec<Identity>>,
    membership: HashMap<Identity, Priority>,
}

impl Orderer {
    /// Empty order.
    pub fn new() -> Self { Self::default() }

    /// Appends `identity` to the tail of the `priority` bucket.
    pub fn insert(&mut self, identity: Identity, priority: Priority) -> Result<(), InvariantViolation> {
        if self.membership.contains_key(&identity) {
            return Err(InvariantViolation::AlreadyOrdered(identity));
        }
        self.membership.insert(identity, priority);
        self.buckets.entry(priority).or_default().push(identity);
        Ok(())
    }

    /// Removes `identity` from its bucket, returning the bucket's priority.
    ///
    /// Empty buckets are dropped so snapshots never pay for them.
    pub fn remove(&mut self, identity: Identity) -> Option<Priority> {
        let priority = self.membership.remove(&identity)?;
        if let Some(bucket) = self.buckets.get_mut(&priority) {
            if let Some(position) = bucket.iter().position(|&member| member == identity) {
                bucket.remove(position);
            }
            if bucket.is_empty() {
                self.buckets.remove(&priority);
            }
        }
        Some(priority)
    }

    /// Moves `identity` to the tail of the `priority` bucket.
    ///
    /// Returns the previous priority, or `None` if the identity is not
    /// ordered. Moving to the same priority still re-appends at the tail.
    pub fn reprioritize(&mut self, identity: Identity, priority: Priority) -> Option<Priority> {
        let previous = self.remove(identity)?;
        self.membership.insert(identity, priority);
        self.buckets.entry(priority).or_default().push(identity);
        Some(previous)
    }

    /// Copies the full step order: buckets ascending, insertion order within.
    pub fn snapshot(&self) -> Vec<Identity> {
        let mut order = Vec::with_capacity(self.membership.len());
        for bucket in self.buckets.values() {
            order.extend_from_slice(bucket);
        }
        order
    }

    /// Iterates the current order without copying it.
    pub fn iter(&self) -> impl Iterator<Item = Identity> + '_ {
        self.buckets.values().flat_map(|bucket| bucket.iter().copied())
    }

    /// `true` if `identity` is ordered.
    pub fn contains(&self, identity: Identity) -> bool {
        self.membership.contains_key(&identity)
    }

    /// Bucket `identity` is ordered under.
    pub fn priority_of(&self, identity: Identity) -> Option<Priority> {
        self.membership.get(&identity).copied()
    }

    /// Number of ordered identities.
    #[inline] pub fn len(&self) -> usize { self.membership.len() }
    /// `true` if nothing is ordered.
    #[inline] pub fn is_empty(&self) -> bool { self.membership.is_empty() }
    /// Number of non-empty buckets.
    #[inline] pub fn bucket_count(&self) -> usize { self.buckets.len() }

    /// Identities in the `priority` bucket, in insertion order.
    pub fn bucket(&self, priority: Priority) -> &[Identity] {
        self.buckets.get(&priority).map(Vec::as_slice).unwrap_or(&[])
    }
}
