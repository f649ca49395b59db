//! # Archetype storage
//!
//! An [`Archetype`] owns the columnar storage for every record whose schema
//! resolves to one component [`Signature`]. Distinct record types with equal
//! signatures share a single archetype; the archetype tracks which record
//! types reside in it.
//!
//! ## Layout
//!
//! Storage is carved out of fixed 16 KB chunks. At construction the
//! archetype resolves its component list into a flat column plan:
//!
//! - each interleaved component contributes one column,
//! - each decomposed component contributes one column per field,
//! - columns appear in schema order (fields in declaration order), which is
//!   also the order the field array table is hydrated in.
//!
//! Capacity starts from `usable_bytes / stride` and shrinks until the
//! aligned column layout fits one chunk; every column base is aligned to its
//! element and offsets grow monotonically past the reserved header. A record
//! whose single instance cannot fit fails registration with
//! [`ChunkOverflowError`].
//!
//! ## Density
//!
//! Rows are densely packed. Removal swaps the last active row into the
//! vacated position column by column, so iteration never sees holes; the
//! caller is told which global slot moved so it can patch that record's
//! location. The vacated tail row is zeroed, so every row handed out by
//! [`Archetype::push_row`] reads as zero.
//!
//! ## Safety
//!
//! Column access is raw-pointer based. The registry is the only caller and
//! upholds the single-writer frame discipline; this module only guarantees
//! that every pointer it produces stays inside the owning chunk.

use crate::engine::batch::FieldArrayTable;
use crate::engine::chunk::Chunk;
use crate::engine::error::{ChunkOverflowError, CreateError};
use crate::engine::meta::ComponentMeta;
use crate::engine::types::{
    ArchetypeId, ChunkIndex, ComponentTypeId, RecordTypeId, RowIndex, Signature, SlotIndex,
    CHUNK_RESERVED_HEADER, CHUNK_SIZE,
};

/// One storage column of an archetype: a component, or one field of a
/// decomposed component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    /// Component this column belongs to.
    pub component_id: ComponentTypeId,

    /// Field index within the component for decomposed storage; `None` for
    /// an interleaved component column.
    pub field_index: Option<usize>,

    /// Element size in bytes.
    pub size: usize,

    /// Element alignment in bytes.
    pub align: usize,

    /// Byte offset of the column base within each chunk.
    pub offset: usize,
}

/// Flattens a component list into columns and sizes the per-chunk capacity.
///
/// ## Behavior
/// Capacity starts at `usable / stride` and shrinks until every aligned
/// column fits inside one chunk. Offsets are assigned monotonically starting
/// at the reserved header, each aligned to its column's element.
///
/// ## Errors
/// Fails when even a single instance cannot be laid out.
fn build_layout(
    record_type: RecordTypeId,
    components: &[ComponentMeta],
) -> Result<(Vec<Column>, u32), ChunkOverflowError> {
    let mut columns = Vec::new();
    for meta in components {
        if meta.is_decomposed() {
            for (field_index, field) in meta.fields.iter().enumerate() {
                columns.push(Column {
                    component_id: meta.component_id,
                    field_index: Some(field_index),
                    size: field.size,
                    align: field.align,
                    offset: 0,
                });
            }
        } else {
            columns.push(Column {
                component_id: meta.component_id,
                field_index: None,
                size: meta.size,
                align: meta.align,
                offset: 0,
            });
        }
    }

    let stride: usize = columns.iter().map(|column| column.size).sum();
    let usable = CHUNK_SIZE - CHUNK_RESERVED_HEADER;
    let overflow = ChunkOverflowError { record_type, stride, usable };
    if stride == 0 || stride > usable {
        return Err(overflow);
    }

    let mut capacity = usable / stride;
    while capacity > 0 {
        if assign_offsets(&mut columns, capacity) {
            return Ok((columns, capacity as u32));
        }
        capacity -= 1;
    }
    Err(overflow)
}

/// Assigns aligned column offsets for `capacity` rows. Returns `false` if
/// the layout spills past the chunk.
fn assign_offsets(columns: &mut [Column], capacity: usize) -> bool {
    let mut offset = CHUNK_RESERVED_HEADER;
    for column in columns.iter_mut() {
        offset = (offset + column.align - 1) & !(column.align - 1);
        column.offset = offset;
        offset += column.size * capacity;
        if offset > CHUNK_SIZE {
            return false;
        }
    }
    true
}

/// Columnar, chunked storage for all records sharing one signature.
///
/// ## Invariants
/// - `row_slots.len() == total_count`, and `row_slots[dense]` is the global
///   slot of the record stored at dense row `dense`.
/// - Every chunk in `chunks` is allocated; chunks past the occupied tail are
///   kept for reuse and hold only zeroed rows.
/// - Column offsets never change after construction.
pub struct Archetype {
    archetype_id: ArchetypeId,
    signature: Signature,
    resident_types: Vec<RecordTypeId>,
    columns: Vec<Column>,
    entities_per_chunk: u32,
    total_count: u32,
    chunks: Vec<Chunk>,
    row_slots: Vec<SlotIndex>,
}

impl Archetype {
    /// Builds an empty archetype for one signature and component list.
    ///
    /// ## Errors
    /// Fails when the component list cannot be laid out in one chunk.
    pub fn new(
        archetype_id: ArchetypeId,
        signature: Signature,
        record_type: RecordTypeId,
        components: &[ComponentMeta],
    ) -> Result<Self, ChunkOverflowError> {
        let (columns, entities_per_chunk) = build_layout(record_type, components)?;
        Ok(Self {
            archetype_id,
            signature,
            resident_types: vec![record_type],
            columns,
            entities_per_chunk,
            total_count: 0,
            chunks: Vec::new(),
            row_slots: Vec::new(),
        })
    }

    /// Stable identifier of this archetype.
    #[inline] pub fn id(&self) -> ArchetypeId { self.archetype_id }

    /// Component signature shared by every resident record.
    #[inline] pub fn signature(&self) -> &Signature { &self.signature }

    /// Record types resident in this archetype, in registration order.
    #[inline] pub fn resident_types(&self) -> &[RecordTypeId] { &self.resident_types }

    /// Notes another record type as resident. Idempotent.
    pub fn add_resident_type(&mut self, record_type: RecordTypeId) {
        if !self.resident_types.contains(&record_type) {
            self.resident_types.push(record_type);
        }
    }

    /// Rows stored per chunk.
    #[inline] pub fn entities_per_chunk(&self) -> u32 { self.entities_per_chunk }

    /// Number of active rows.
    #[inline] pub fn total_count(&self) -> u32 { self.total_count }

    /// Number of chunks holding at least one active row.
    #[inline]
    pub fn occupied_chunk_count(&self) -> u32 {
        self.total_count.div_ceil(self.entities_per_chunk)
    }

    /// Number of allocated chunks, including retained empty tails.
    #[inline] pub fn allocated_chunk_count(&self) -> u32 { self.chunks.len() as u32 }

    /// Column plan in hydration order.
    #[inline] pub fn columns(&self) -> &[Column] { &self.columns }

    /// Global slot of the record stored at a dense row.
    ///
    /// ## Panics
    /// Panics when `(chunk, row)` names a row past the occupied range.
    #[inline]
    pub fn slot_at(&self, chunk: ChunkIndex, row: RowIndex) -> SlotIndex {
        let dense = (chunk * self.entities_per_chunk + row) as usize;
        assert!(
            dense < self.row_slots.len(),
            "row ({chunk}, {row}) is not occupied"
        );
        self.row_slots[dense]
    }

    /// Number of active rows in `chunk`: full capacity for every chunk
    /// before the occupied tail, the occupancy remainder for the tail
    /// (capacity when the tail is exactly full).
    pub fn chunk_len(&self, chunk: ChunkIndex) -> u32 {
        let occupied = self.occupied_chunk_count();
        if chunk + 1 < occupied {
            self.entities_per_chunk
        } else if chunk + 1 == occupied {
            let tail = self.total_count % self.entities_per_chunk;
            if tail == 0 { self.entities_per_chunk } else { tail }
        } else {
            0
        }
    }

    /// Appends a zeroed row for the record in global slot `slot`,
    /// allocating a chunk when the tail is full.
    pub fn push_row(&mut self, slot: SlotIndex) -> Result<(ChunkIndex, RowIndex), CreateError> {
        let dense = self.total_count;
        let chunk = dense / self.entities_per_chunk;
        let row = dense % self.entities_per_chunk;

        if (chunk as usize) == self.chunks.len() {
            let fresh = Chunk::allocate().ok_or(CreateError::ChunkAllocation)?;
            self.chunks.push(fresh);
        }

        self.row_slots.push(slot);
        self.total_count += 1;
        Ok((chunk, row))
    }

    /// Removes the row at `(chunk, row)` by swapping the last active row
    /// into its place, column by column, then zeroing the vacated tail row.
    ///
    /// Returns the global slot of the record that moved into the vacated
    /// position, or `None` if the removed row was the tail.
    pub fn swap_remove_row(&mut self, chunk: ChunkIndex, row: RowIndex) -> Option<SlotIndex> {
        let removed = chunk * self.entities_per_chunk + row;
        debug_assert!(removed < self.total_count);
        let last = self.total_count - 1;

        let moved = if removed != last {
            self.copy_row(last, removed);
            self.row_slots[removed as usize] = self.row_slots[last as usize];
            Some(self.row_slots[removed as usize])
        } else {
            None
        };

        self.zero_row(last);
        self.row_slots.pop();
        self.total_count -= 1;
        moved
    }

    /// Copies every column of dense row `from` into dense row `to`.
    fn copy_row(&mut self, from: u32, to: u32) {
        let (from_chunk, from_row) = self.locate(from);
        let (to_chunk, to_row) = self.locate(to);
        for column in &self.columns {
            let src = self.chunks[from_chunk as usize]
                .offset_ptr(column.offset + column.size * from_row as usize);
            let dst = self.chunks[to_chunk as usize]
                .offset_ptr(column.offset + column.size * to_row as usize);
            // SAFETY: both pointers address distinct rows of the same sized
            // column, fully inside their chunks.
            unsafe { std::ptr::copy_nonoverlapping(src, dst, column.size) };
        }
    }

    /// Zeroes every column of a dense row.
    fn zero_row(&mut self, dense: u32) {
        let (chunk, row) = self.locate(dense);
        for column in &self.columns {
            let ptr = self.chunks[chunk as usize]
                .offset_ptr(column.offset + column.size * row as usize);
            // SAFETY: the row is inside the chunk per the column layout.
            unsafe { std::ptr::write_bytes(ptr, 0, column.size) };
        }
    }

    #[inline]
    fn locate(&self, dense: u32) -> (ChunkIndex, RowIndex) {
        (dense / self.entities_per_chunk, dense % self.entities_per_chunk)
    }

    /// Hydrates `table` with one pointer per column of `chunk`, in column
    /// plan order. O(columns); no lookups.
    ///
    /// ## Panics
    /// Panics when `chunk` is not an allocated chunk of this archetype.
    pub fn build_field_array_table(&self, chunk: ChunkIndex, table: &mut FieldArrayTable) {
        table.clear();
        assert!(
            (chunk as usize) < self.chunks.len(),
            "chunk {chunk} is not allocated"
        );
        let chunk = &self.chunks[chunk as usize];
        for column in &self.columns {
            table.push(chunk.offset_ptr(column.offset));
        }
    }

    /// Pointer to the interleaved value of `component_id` at `(chunk, row)`.
    ///
    /// Returns `None` when the component is absent or stored decomposed.
    pub fn component_ptr(
        &self,
        chunk: ChunkIndex,
        row: RowIndex,
        component_id: ComponentTypeId,
    ) -> Option<*mut u8> {
        let column = self
            .columns
            .iter()
            .find(|column| column.component_id == component_id && column.field_index.is_none())?;
        Some(
            self.chunks[chunk as usize]
                .offset_ptr(column.offset + column.size * row as usize),
        )
    }

    /// Pointer to field `field_index` of a decomposed component at
    /// `(chunk, row)`. Returns `None` when no such column exists.
    pub fn field_ptr(
        &self,
        chunk: ChunkIndex,
        row: RowIndex,
        component_id: ComponentTypeId,
        field_index: usize,
    ) -> Option<*mut u8> {
        let column = self.columns.iter().find(|column| {
            column.component_id == component_id && column.field_index == Some(field_index)
        })?;
        Some(
            self.chunks[chunk as usize]
                .offset_ptr(column.offset + column.size * row as usize),
        )
    }
}
