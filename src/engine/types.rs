//! Core Runtime Types, Identifiers, and Bit-Level Layouts
//!
//! This module defines the **fundamental numeric types and layout constants**
//! shared by every part of the runtime: the slot registry, the orderer, the
//! handle layer and the step driver.
//!
//! ## Identity Representation
//!
//! An [`Identity`](crate::engine::identity::Identity) is a `(index, generation)`
//! pair. For collaborators that want a single opaque value (replication
//! layers, debug overlays, foreign tables) it packs into a 64-bit integer:
//!
//! ```text
//! | generation | index |
//! ```
//!
//! - **Index** identifies the slot within the registry.
//! - **Generation** enables stale-reference detection after destruction.
//!
//! The exact bit widths are compile-time constants validated by static
//! assertions below.
//!
//! ## Priorities
//!
//! Priorities are signed integers. Lower values run first; the ordering
//! policy is fixed and ascending.

/// Bit-width type used for compile-time layout calculations.
pub type Bits = u8;

/// Packed identity value (`generation << INDEX_BITS | index`).
pub type IdentityBits = u64;
/// Index of a slot within the registry.
pub type IndexID = u32;
/// Generation counter used to detect stale identities.
pub type GenerationID = u32;
/// Execution priority of an object. Lower runs earlier.
pub type Priority = i32;
/// Simulation tick counter.
pub type Tick = u64;
/// Process-unique identifier of a runtime instance.
pub type RuntimeID = u32;

/// Total number of bits in an [`IdentityBits`].
pub const IDENTITY_BITS: Bits = 64;
/// Number of bits reserved for the slot index.
pub const INDEX_BITS: Bits = 32;
/// Number of bits reserved for the generation.
pub const GENERATION_BITS: Bits = IDENTITY_BITS - INDEX_BITS;

/// Mask selecting the index bits of a packed identity.
pub const INDEX_MASK: IdentityBits = (1u64 << INDEX_BITS) - 1;

/// Reserved index denoting the null identity.
pub const NULL_INDEX: IndexID = IndexID::MAX;

/// Largest number of slots a registry can ever hold (the null index is
/// never handed out).
pub const INDEX_CAP: u64 = NULL_INDEX as u64;

/// Default number of slots reserved up front by a new runtime.
pub const DEFAULT_INITIAL_CAPACITY: usize = 64;

const _: () = assert!(INDEX_BITS as u32 == IndexID::BITS);
const _: () = assert!(GENERATION_BITS as u32 == GenerationID::BITS);
