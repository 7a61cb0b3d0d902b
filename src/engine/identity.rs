//! Stable object identities.
//!
//! An [`Identity`] names an object without holding a reference to it. The
//! registry checks the generation on every access, so an identity that
//! outlives its object is detected as stale instead of aliasing whatever
//! object later reuses the slot.

use std::fmt;

use crate::engine::types::{
    GenerationID, IdentityBits, IndexID, INDEX_BITS, INDEX_MASK, NULL_INDEX,
};

/// Generation-checked reference to a slot in the registry.
///
/// Two identities are equal iff both index and generation match. The index
/// [`NULL_INDEX`] is reserved for [`Identity::NULL`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identity {
    index: IndexID,
    generation: GenerationID,
}

#[inline]
const fn make_bits(index: IndexID, generation: GenerationID) -> IdentityBits {
    ((generation as IdentityBits) << INDEX_BITS) | (index as IdentityBits)
}

#[inline]
const fn split_bits(bits: IdentityBits) -> (IndexID, GenerationID) {
    let index = (bits & INDEX_MASK) as IndexID;
    let generation = (bits >> INDEX_BITS) as GenerationID;
    (index, generation)
}

impl Identity {
    /// The null identity. Never valid in any registry.
    pub const NULL: Identity = Identity { index: NULL_INDEX, generation: 0 };

    #[inline]
    pub(crate) const fn new(index: IndexID, generation: GenerationID) -> Self {
        Self { index, generation }
    }

    /// Slot index in the issuing registry.
    #[inline] pub const fn index(self) -> IndexID { self.index }

    /// Generation of the slot when this identity was issued.
    #[inline] pub const fn generation(self) -> GenerationID { self.generation }

    /// `true` for [`Identity::NULL`].
    #[inline] pub const fn is_null(self) -> bool { self.index == NULL_INDEX }

    /// Packs the identity into a single 64-bit value.
    #[inline]
    pub const fn to_bits(self) -> IdentityBits {
        make_bits(self.index, self.generation)
    }

    /// Rebuilds an identity from [`Identity::to_bits`] output.
    ///
    /// Any bit pattern decodes; whether it names a live object is decided by
    /// the registry, not here.
    #[inline]
    pub const fn from_bits(bits: IdentityBits) -> Self {
        let (index, generation) = split_bits(bits);
        Self { index, generation }
    }
}

impl Default for Identity {
    fn default() -> Self { Identity::NULL }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("Identity(null)")
        } else {
            write!(f, "Identity({}v{})", self.index, self.generation)
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("null")
        } else {
            write!(f, "{}v{}", self.index, self.generation)
        }
    }
}
