//! # Storage Chunks
//!
//! A [`Chunk`] is one fixed-size, cache-aligned block of raw storage. All
//! record data lives in chunks: the archetype layer carves each chunk into
//! per-column slices and addresses rows with precomputed byte offsets.
//!
//! ## Purpose
//! Keeping every allocation the same size and alignment makes chunk reuse
//! trivial, keeps column bases cache-line aligned, and bounds the working
//! set a single dispatch touches.
//!
//! ## Invariants
//! - Every chunk is exactly [`CHUNK_SIZE`] bytes, aligned to
//!   [`CHUNK_ALIGN`].
//! - The first [`CHUNK_RESERVED_HEADER`] bytes are reserved; column offsets
//!   handed to [`Chunk::offset_ptr`] always point past them.
//! - Memory is zeroed at allocation, so fresh rows read as zero before any
//!   create hook runs.
//!
//! ## Safety
//! The chunk owns its allocation; pointer arithmetic against it is only
//! sound while the archetype guarantees offsets stay inside the block. All
//! offset math is validated with debug assertions.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use crate::engine::types::{CHUNK_ALIGN, CHUNK_RESERVED_HEADER, CHUNK_SIZE};

/// One fixed-size block of zero-initialized, cache-aligned storage.
pub struct Chunk {
    data: NonNull<u8>,
}

impl Chunk {
    const LAYOUT: Layout = match Layout::from_size_align(CHUNK_SIZE, CHUNK_ALIGN) {
        Ok(layout) => layout,
        Err(_) => panic!("chunk layout constants are invalid"),
    };

    /// Allocates one zeroed chunk. Returns `None` if the global allocator
    /// fails.
    pub fn allocate() -> Option<Chunk> {
        // SAFETY: LAYOUT has non-zero size.
        let raw = unsafe { alloc_zeroed(Self::LAYOUT) };
        NonNull::new(raw).map(|data| Chunk { data })
    }

    /// Base pointer of the whole block, including the reserved header.
    #[inline]
    pub fn base_ptr(&self) -> *mut u8 { self.data.as_ptr() }

    /// Pointer at `offset` bytes into the block.
    ///
    /// ## Safety contract
    /// `offset` must come from the owning archetype's layout, which only
    /// produces offsets in `[CHUNK_RESERVED_HEADER, CHUNK_SIZE)`.
    #[inline]
    pub fn offset_ptr(&self, offset: usize) -> *mut u8 {
        debug_assert!(offset >= CHUNK_RESERVED_HEADER);
        debug_assert!(offset < CHUNK_SIZE);
        // SAFETY: offset is within the owned allocation.
        unsafe { self.data.as_ptr().add(offset) }
    }

    /// Usable payload bytes per chunk.
    #[inline]
    pub const fn payload_size() -> usize { CHUNK_SIZE - CHUNK_RESERVED_HEADER }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        // SAFETY: data was allocated with LAYOUT and is owned uniquely.
        unsafe { dealloc(self.data.as_ptr(), Self::LAYOUT) };
    }
}

// The chunk owns its allocation; all aliasing is controlled by the archetype
// layer, which hands out pointers under its own borrow discipline.
unsafe impl Send for Chunk {}
unsafe impl Sync for Chunk {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_aligned_and_zeroed() {
        let chunk = Chunk::allocate().unwrap();
        assert_eq!(chunk.base_ptr() as usize % CHUNK_ALIGN, 0);
        for offset in [CHUNK_RESERVED_HEADER, CHUNK_SIZE / 2, CHUNK_SIZE - 1] {
            let byte = unsafe { *chunk.base_ptr().add(offset) };
            assert_eq!(byte, 0);
        }
    }

    #[test]
    fn payload_excludes_the_header() {
        assert_eq!(Chunk::payload_size(), CHUNK_SIZE - CHUNK_RESERVED_HEADER);
    }
}
