//! Packed record handles.
//!
//! A [`Handle`] is the sole public identity of a stored record. It packs five
//! fields into one `u64` using explicit shift-and-mask arithmetic:
//!
//! ```text
//! | meta (8) | owner (8) | record type (12) | generation (16) | index (20) |
//! ```
//!
//! The raw value `0` is reserved as the invalid handle: slot index 0 is never
//! allocated and generations never take the value 0, so no live record can
//! ever pack to zero. Code that needs a sentinel compares against
//! [`Handle::INVALID`] rather than inventing its own.

use crate::engine::types::{
    Generation, HandleBits, MetaFlags, OwnerId, RecordTypeId, SlotIndex,
    GENERATION_MASK, GENERATION_SHIFT, INDEX_MASK, META_MASK, META_SHIFT,
    OWNER_MASK, OWNER_SHIFT, RECORD_TYPE_MASK, RECORD_TYPE_SHIFT,
};

/// Generation-checked identity of a stored record.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle(pub HandleBits);

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_invalid() {
            return f.write_str("Handle(INVALID)");
        }
        f.debug_struct("Handle")
            .field("index", &self.index())
            .field("generation", &self.generation())
            .field("record_type", &self.record_type())
            .field("owner", &self.owner())
            .field("meta", &self.meta())
            .finish()
    }
}

#[inline]
const fn make_bits(
    index: SlotIndex,
    generation: Generation,
    record_type: RecordTypeId,
    owner: OwnerId,
    meta: MetaFlags,
) -> HandleBits {
    ((meta as HandleBits) << META_SHIFT)
        | ((owner as HandleBits) << OWNER_SHIFT)
        | (((record_type as HandleBits) & RECORD_TYPE_MASK) << RECORD_TYPE_SHIFT)
        | ((generation as HandleBits) << GENERATION_SHIFT)
        | ((index as HandleBits) & INDEX_MASK)
}

impl Handle {
    /// The reserved null handle. Never minted for a live record.
    pub const INVALID: Handle = Handle(0);

    /// Packs the five handle fields into a single value.
    #[inline]
    pub fn pack(
        index: SlotIndex,
        generation: Generation,
        record_type: RecordTypeId,
        owner: OwnerId,
        meta: MetaFlags,
    ) -> Handle {
        debug_assert!((index as HandleBits) <= INDEX_MASK);
        debug_assert!((record_type as HandleBits) <= RECORD_TYPE_MASK);
        debug_assert!(generation != 0, "generation 0 is reserved for the invalid handle");
        Handle(make_bits(index, generation, record_type, owner, meta))
    }

    /// Returns `true` if this is the reserved null handle.
    #[inline] pub const fn is_invalid(self) -> bool { self.0 == 0 }

    /// Returns `true` for any handle other than the reserved null handle.
    #[inline] pub const fn is_valid(self) -> bool { self.0 != 0 }

    /// Returns `true` if the owner tag is 0, the server routing tag.
    #[inline] pub const fn is_server(self) -> bool { self.owner() == 0 }

    /// Returns `true` if the handle carries `owner` as its routing tag.
    #[inline] pub const fn is_owned_by(self, owner: OwnerId) -> bool { self.owner() == owner }

    /// Slot index into the registry's location table.
    #[inline] pub const fn index(self) -> SlotIndex { (self.0 & INDEX_MASK) as SlotIndex }

    /// Recycle generation the handle was minted with.
    #[inline] pub const fn generation(self) -> Generation {
        ((self.0 >> GENERATION_SHIFT) & GENERATION_MASK) as Generation
    }

    /// Record type that minted the handle.
    #[inline] pub const fn record_type(self) -> RecordTypeId {
        ((self.0 >> RECORD_TYPE_SHIFT) & RECORD_TYPE_MASK) as RecordTypeId
    }

    /// Owner tag. Zero means server-owned.
    #[inline] pub const fn owner(self) -> OwnerId {
        ((self.0 >> OWNER_SHIFT) & OWNER_MASK) as OwnerId
    }

    /// Reserved flag bits.
    #[inline] pub const fn meta(self) -> MetaFlags {
        ((self.0 >> META_SHIFT) & META_MASK) as MetaFlags
    }

    /// Returns a copy of this handle with the owner tag replaced.
    #[inline]
    pub const fn with_owner(self, owner: OwnerId) -> Handle {
        Handle((self.0 & !(OWNER_MASK << OWNER_SHIFT)) | ((owner as HandleBits) << OWNER_SHIFT))
    }

    /// Returns a copy of this handle with the meta flags replaced.
    #[inline]
    pub const fn with_meta(self, meta: MetaFlags) -> Handle {
        Handle((self.0 & !(META_MASK << META_SHIFT)) | ((meta as HandleBits) << META_SHIFT))
    }
}

/// Advances a slot generation, skipping the reserved value 0 on wrap.
#[inline]
pub const fn next_generation(generation: Generation) -> Generation {
    let next = generation.wrapping_add(1);
    if next == 0 { 1 } else { next }
}
