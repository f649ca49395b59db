//! Core Types, Identifiers, and Bit-Level Layouts
//!
//! This module defines the **fundamental types, identifiers, bit layouts, and
//! signatures** used throughout the storage core. These definitions form the
//! *semantic backbone* of the system and are shared across all subsystems,
//! including handle management, archetype storage, schema composition, and
//! batch dispatch.
//!
//! ## Design Philosophy
//!
//! The storage core is designed around:
//!
//! - **Dense columnar storage**
//! - **Bitset-based signatures**
//! - **Stable numeric identifiers**
//! - **Generation-checked handles**
//!
//! To support these goals efficiently, this module:
//!
//! - Encodes record handles into a single 64-bit value,
//! - Represents component sets as fixed-size bit arrays,
//! - Uses small, copyable numeric IDs for all storage concepts,
//! - Avoids heap allocation in hot paths.
//!
//! ## Handle Representation
//!
//! Handles are encoded as a packed 64-bit integer with the following layout:
//!
//! ```text
//! | meta | owner | record type | generation | index |
//! ```
//!
//! - **Index** identifies the slot in the registry's location table.
//! - **Generation** enables stale-handle detection after destruction.
//! - **Record type** identifies the record type that minted the handle.
//! - **Owner** is a routing tag (0 means server-owned).
//! - **Meta** bits are reserved for flags.
//!
//! The exact bit widths are controlled by compile-time constants and validated
//! using static assertions. All packing is explicit shift-and-mask arithmetic
//! (see `engine::handle`), so the layout never depends on struct field
//! ordering or compiler-specific bitfield behavior.
//!
//! ## Archetypes and Components
//!
//! Components are identified by compact [`ComponentTypeId`] values. Archetypes
//! are described by [`Signature`] bitsets indicating which components they
//! contain. Two record types with identical component sets produce equal
//! signatures and therefore share one archetype.
//!
//! Component signatures:
//!
//! - are fixed-size arrays of `u64`,
//! - support fast bitwise comparison,
//! - allow efficient iteration over set bits,
//! - are used as the archetype lookup key, so equality and hashing are
//!   structural over the word array.
//!
//! ## Safety and Performance
//!
//! This module contains **no unsafe code**, but many of its types are used at
//! unsafe boundaries elsewhere in the storage layer. Correctness here is
//! therefore critical to overall soundness.

/// Bit-width type used for compile-time layout calculations.
pub type Bits = u8;

/// Raw packed handle value.
pub type HandleBits = u64;
/// Slot index within the registry's location table.
pub type SlotIndex = u32;
/// Generation counter used to detect stale handles.
pub type Generation = u16;
/// Unique identifier for a registered record type.
pub type RecordTypeId = u16;
/// Routing/ownership tag carried by a handle.
pub type OwnerId = u8;
/// Reserved flag bits carried by a handle.
pub type MetaFlags = u8;

/// Unique identifier for a component type.
pub type ComponentTypeId = u16;
/// Unique identifier for an archetype.
pub type ArchetypeId = u16;
/// Row index within an archetype's dense entity range.
pub type RowIndex = u32;
/// Chunk index within an archetype.
pub type ChunkIndex = u32;

/// Total number of bits in a packed handle.
pub const HANDLE_BITS: Bits = 64;
/// Number of bits reserved for the location-table slot index.
pub const INDEX_BITS: Bits = 20;
/// Number of bits reserved for the recycle generation.
pub const GENERATION_BITS: Bits = 16;
/// Number of bits reserved for the record type id.
pub const RECORD_TYPE_BITS: Bits = 12;
/// Number of bits reserved for the owner tag.
pub const OWNER_BITS: Bits = 8;
/// Number of bits reserved for flags.
pub const META_BITS: Bits = 8;

const _: [(); 1] = [();
    (INDEX_BITS + GENERATION_BITS + RECORD_TYPE_BITS + OWNER_BITS + META_BITS
        == HANDLE_BITS) as usize];
const _: [(); 1] = [(); (INDEX_BITS > 0) as usize];
const _: [(); 1] = [(); (GENERATION_BITS <= 16) as usize];
const _: [(); 1] = [(); (RECORD_TYPE_BITS <= 16) as usize];

/// Builds a mask covering the low `bits` bits.
pub const fn mask(bits: Bits) -> HandleBits {
    if bits == 0 { 0 } else { ((1 as HandleBits) << bits) - 1 }
}

/// Mask selecting the index slice of a handle.
pub const INDEX_MASK: HandleBits = mask(INDEX_BITS);
/// Mask selecting the generation slice of a handle.
pub const GENERATION_MASK: HandleBits = mask(GENERATION_BITS);
/// Mask selecting the record-type slice of a handle.
pub const RECORD_TYPE_MASK: HandleBits = mask(RECORD_TYPE_BITS);
/// Mask selecting the owner slice of a handle.
pub const OWNER_MASK: HandleBits = mask(OWNER_BITS);
/// Mask selecting the meta slice of a handle.
pub const META_MASK: HandleBits = mask(META_BITS);

/// Bit offset of the generation slice.
pub const GENERATION_SHIFT: Bits = INDEX_BITS;
/// Bit offset of the record-type slice.
pub const RECORD_TYPE_SHIFT: Bits = INDEX_BITS + GENERATION_BITS;
/// Bit offset of the owner slice.
pub const OWNER_SHIFT: Bits = RECORD_TYPE_SHIFT + RECORD_TYPE_BITS;
/// Bit offset of the meta slice.
pub const META_SHIFT: Bits = OWNER_SHIFT + OWNER_BITS;

/// Maximum slot index a handle can address.
pub const INDEX_CAP: SlotIndex = INDEX_MASK as SlotIndex;
/// Number of distinct record type ids a handle can carry.
pub const RECORD_TYPE_CAP: usize = RECORD_TYPE_MASK as usize + 1;

/// Maximum number of registered component types.
pub const COMPONENT_CAP: usize = 256;
/// Number of `u64` words required to represent a full component signature.
pub const SIGNATURE_SIZE: usize = (COMPONENT_CAP + 63) / 64;

/// Byte size of one storage chunk.
pub const CHUNK_SIZE: usize = 16 * 1024;
/// Base alignment of every chunk allocation, matched to the cache line.
pub const CHUNK_ALIGN: usize = 64;
/// Bytes reserved at the start of every chunk for header data.
pub const CHUNK_RESERVED_HEADER: usize = 64;

const _: [(); 1] = [(); (CHUNK_RESERVED_HEADER % CHUNK_ALIGN == 0) as usize];
const _: [(); 1] = [(); (CHUNK_SIZE > CHUNK_RESERVED_HEADER) as usize];

/// Lane count of one full dispatch batch.
pub const LANES: usize = 8;

/// Bitset representing a set of component types.
///
/// Bit *i* set means component type *i* is present. Signatures are built once
/// per record type at registration and then compared structurally when
/// resolving archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    /// Packed component bitset.
    pub components: [u64; SIGNATURE_SIZE],
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            components: [0u64; SIGNATURE_SIZE],
        }
    }
}

impl Signature {
    /// Sets the bit corresponding to `component_id`.
    #[inline]
    pub fn set(&mut self, component_id: ComponentTypeId) {
        let index = (component_id as usize) / 64;
        let bits = (component_id as usize) % 64;
        self.components[index] |= 1u64 << bits;
    }

    /// Clears the bit corresponding to `component_id`.
    #[inline]
    pub fn clear(&mut self, component_id: ComponentTypeId) {
        let index = (component_id as usize) / 64;
        let bits = (component_id as usize) % 64;
        self.components[index] &= !(1u64 << bits);
    }

    /// Returns `true` if `component_id` is present in this signature.
    #[inline]
    pub fn has(&self, component_id: ComponentTypeId) -> bool {
        let index = (component_id as usize) / 64;
        let bits = (component_id as usize) % 64;
        (self.components[index] >> bits) & 1 == 1
    }

    /// Returns `true` if all components in `signature` are present.
    #[inline]
    pub fn contains_all(&self, signature: &Signature) -> bool {
        for (component_a, component_b) in self.components.iter().zip(signature.components.iter()) {
            if (component_a & component_b) != *component_b { return false; }
        }
        true
    }

    /// Number of component bits set.
    #[inline]
    pub fn count(&self) -> usize {
        self.components.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Returns `true` if no component bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.iter().all(|word| *word == 0)
    }

    /// Iterates over all component IDs set in this signature, ascending.
    pub fn iterate_over_components(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.components
            .iter()
            .enumerate()
            .flat_map(|(word_index, &word)| {
                let base = word_index * 64;
                let mut bits = word;
                std::iter::from_fn(move || {
                    if bits == 0 {
                        return None;
                    }
                    let tz = bits.trailing_zeros() as usize;
                    bits &= bits - 1;
                    Some((base + tz) as ComponentTypeId)
                })
            })
    }
}

/// Builds a component signature from a list of component IDs.
pub fn build_signature(component_ids: &[ComponentTypeId]) -> Signature {
    let mut signature = Signature::default();
    for &component_id in component_ids { signature.set(component_id); }
    signature
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_slices_cover_all_bits() {
        let all = INDEX_MASK
            | (GENERATION_MASK << GENERATION_SHIFT)
            | (RECORD_TYPE_MASK << RECORD_TYPE_SHIFT)
            | (OWNER_MASK << OWNER_SHIFT)
            | (META_MASK << META_SHIFT);
        assert_eq!(all, u64::MAX);
        assert_eq!(INDEX_MASK & (GENERATION_MASK << GENERATION_SHIFT), 0);
        assert_eq!(
            (RECORD_TYPE_MASK << RECORD_TYPE_SHIFT) & (OWNER_MASK << OWNER_SHIFT),
            0
        );
    }

    #[test]
    fn signature_set_has_clear() {
        let mut signature = Signature::default();
        signature.set(0);
        signature.set(63);
        signature.set(64);
        signature.set(255);
        assert!(signature.has(0));
        assert!(signature.has(63));
        assert!(signature.has(64));
        assert!(signature.has(255));
        assert_eq!(signature.count(), 4);

        signature.clear(64);
        assert!(!signature.has(64));
        assert_eq!(
            signature.iterate_over_components().collect::<Vec<_>>(),
            vec![0, 63, 255]
        );
    }

    #[test]
    fn signature_equality_is_order_independent() {
        let forward = build_signature(&[3, 7, 120]);
        let backward = build_signature(&[120, 7, 3]);
        assert_eq!(forward, backward);
        assert!(forward.contains_all(&build_signature(&[7])));
        assert!(!forward.contains_all(&build_signature(&[7, 8])));
    }
}
