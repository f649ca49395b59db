//! # Batch dispatch
//!
//! Lifecycle hooks run over chunk data eight rows at a time. This module
//! provides the machinery that makes a hook body read like scalar code while
//! compiling to fixed-width lane loops the optimizer can vectorize:
//!
//! - [`FieldArrayTable`]: a flat pointer table, one entry per storage
//!   column, rebuilt per chunk by the archetype.
//! - [`BatchCursor`]: the shared running row index plus the active lane
//!   count of the current batch.
//! - [`ColumnBatch`]: a single column bound to the cursor, const-generic
//!   over whether stores honor the tail mask.
//! - [`BatchColumns`] and the [`batch_view!`] macro: generate a view struct
//!   binding consecutive table slots in schema column order.
//! - [`Lifecycle`]: the per-record hook trait, written once and
//!   monomorphized for both the full-width and masked paths.
//! - Drivers (`drive_update` and friends) that split a chunk into
//!   `floor(count / 8)` full batches plus at most one masked tail batch.
//!
//! ## Masking
//!
//! A masked batch covers the `1..=7` rows left after the full batches. Every
//! lane operation compares its fixed lane index against the active lane
//! count: inactive lanes are neither loaded nor stored, so memory past the
//! tail is never touched. Because the comparison is against fixed indices,
//! the compiler turns it into a constant predicate per lane.
//!
//! The full and masked paths share one hook body, so their results are
//! bit-identical to running the same arithmetic in a plain scalar loop.
//! Integer division stays a per-lane scalar operation in both paths; there
//! is no widened form to diverge from.

use crate::engine::types::{RowIndex, LANES};

/// Per-chunk step hook: `(dt, field table, active row count)`.
pub type StepFn = fn(f64, &FieldArrayTable, u32);
/// Per-row slot hook: `(field table, row)`.
pub type SlotFn = fn(&FieldArrayTable, RowIndex);

/// Capacity of the field array table. Bounds the column count of a single
/// archetype.
pub const FIELD_TABLE_CAP: usize = 32;

/// Flat table of column base pointers for one chunk, in column plan order.
///
/// Rebuilt by the archetype before each chunk dispatch; hydration is a
/// fixed sequence of pointer adds off cached offsets.
pub struct FieldArrayTable {
    pointers: [*mut u8; FIELD_TABLE_CAP],
    length: usize,
}

impl Default for FieldArrayTable {
    fn default() -> Self { Self::new() }
}

impl FieldArrayTable {
    /// Creates an empty table.
    pub const fn new() -> Self {
        Self {
            pointers: [std::ptr::null_mut(); FIELD_TABLE_CAP],
            length: 0,
        }
    }

    /// Empties the table for rehydration.
    #[inline]
    pub fn clear(&mut self) { self.length = 0; }

    /// Appends one column base pointer.
    #[inline]
    pub fn push(&mut self, pointer: *mut u8) {
        debug_assert!(self.length < FIELD_TABLE_CAP, "archetype exceeds the column cap");
        self.pointers[self.length] = pointer;
        self.length += 1;
    }

    /// Number of bound columns.
    #[inline]
    pub fn len(&self) -> usize { self.length }

    /// Returns `true` if no column is bound.
    #[inline]
    pub fn is_empty(&self) -> bool { self.length == 0 }

    /// Base pointer of column `index`.
    #[inline]
    pub fn pointer(&self, index: usize) -> *mut u8 {
        debug_assert!(index < self.length);
        self.pointers[index]
    }
}

/// Sequential reader over a field array table.
///
/// Each `column` call consumes the next slot, so a view binds its fields in
/// exactly the order the archetype hydrated them.
pub struct TableBinder<'a> {
    table: &'a FieldArrayTable,
    next: usize,
}

impl<'a> TableBinder<'a> {
    /// Starts binding at the first table slot.
    pub fn new(table: &'a FieldArrayTable) -> Self {
        Self { table, next: 0 }
    }

    /// Consumes the next slot as a column of `T`.
    #[inline]
    pub fn column<T>(&mut self) -> *mut T {
        let pointer = self.table.pointer(self.next);
        self.next += 1;
        pointer as *mut T
    }
}

/// Shared batch position: the base row of the current batch and how many of
/// its lanes are active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchCursor {
    /// First row covered by the batch.
    pub base: u32,

    /// Active lanes; [`LANES`] for a full batch, `1..=7` for a tail.
    pub lanes: u32,
}

/// One storage column bound to a batch cursor.
///
/// `MASKED` selects the tail path: loads and stores skip lanes at or beyond
/// the active count, leaving their memory untouched. The unmasked path
/// compiles to straight-line lane loops.
pub struct ColumnBatch<T, const MASKED: bool> {
    pointer: *mut T,
    cursor: BatchCursor,
}

impl<T: Copy + Default, const MASKED: bool> ColumnBatch<T, MASKED> {
    /// Binds a column base pointer to a cursor.
    #[inline]
    pub fn bind(pointer: *mut T, cursor: BatchCursor) -> Self {
        Self { pointer, cursor }
    }

    /// Moves the batch window forward by `rows`.
    #[inline]
    pub fn advance(&mut self, rows: u32) {
        self.cursor.base += rows;
    }

    #[inline]
    fn lane_active(&self, lane: usize) -> bool {
        !MASKED || (lane as u32) < self.cursor.lanes
    }

    #[inline]
    fn lane_ptr(&self, lane: usize) -> *mut T {
        // SAFETY: lane is only dereferenced when active, and active lanes
        // address rows inside the chunk's occupied range.
        unsafe { self.pointer.add(self.cursor.base as usize + lane) }
    }

    /// Loads the batch. Inactive lanes read as `T::default()` and never
    /// touch memory.
    #[inline]
    pub fn load(&self) -> [T; LANES] {
        let mut values = [T::default(); LANES];
        for lane in 0..LANES {
            if self.lane_active(lane) {
                values[lane] = unsafe { *self.lane_ptr(lane) };
            }
        }
        values
    }

    /// Stores the batch. Inactive lanes are skipped, so memory past the
    /// tail is byte-identical before and after.
    #[inline]
    pub fn store(&mut self, values: [T; LANES]) {
        for lane in 0..LANES {
            if self.lane_active(lane) {
                unsafe { *self.lane_ptr(lane) = values[lane] };
            }
        }
    }

    /// Alias of [`store`](Self::store), for hook bodies that read as
    /// assignments.
    #[inline]
    pub fn assign(&mut self, values: [T; LANES]) {
        self.store(values);
    }
}

impl<T: Copy + Default + std::ops::Div<Output = T>, const MASKED: bool> ColumnBatch<T, MASKED> {
    /// Lanewise division of this column's batch by `divisor`'s batch,
    /// computed only for active lanes.
    ///
    /// Division is the one lane operation that cannot run speculatively on
    /// inactive lanes: a masked load yields `T::default()` there, and for
    /// integer `T` that is a zero divisor. Inactive result lanes are
    /// `T::default()`; a subsequent masked store skips them anyway.
    #[inline]
    pub fn div_by(&self, divisor: &Self) -> [T; LANES] {
        let numerators = self.load();
        let divisors = divisor.load();
        let mut values = [T::default(); LANES];
        for lane in 0..LANES {
            if self.lane_active(lane) {
                values[lane] = numerators[lane] / divisors[lane];
            }
        }
        values
    }
}

/// Broadcasts one value across all lanes.
#[inline]
pub fn splat<T: Copy>(value: T) -> [T; LANES] {
    [value; LANES]
}

/// Lanewise addition.
#[inline]
pub fn lane_add<T: Copy + std::ops::Add<Output = T>>(a: [T; LANES], b: [T; LANES]) -> [T; LANES] {
    std::array::from_fn(|lane| a[lane] + b[lane])
}

/// Lanewise subtraction.
#[inline]
pub fn lane_sub<T: Copy + std::ops::Sub<Output = T>>(a: [T; LANES], b: [T; LANES]) -> [T; LANES] {
    std::array::from_fn(|lane| a[lane] - b[lane])
}

/// Lanewise multiplication.
#[inline]
pub fn lane_mul<T: Copy + std::ops::Mul<Output = T>>(a: [T; LANES], b: [T; LANES]) -> [T; LANES] {
    std::array::from_fn(|lane| a[lane] * b[lane])
}

/// Lanewise division. Runs one scalar division per lane in both the full
/// and masked paths; divisors must be non-zero for integer `T`.
#[inline]
pub fn lane_div<T: Copy + std::ops::Div<Output = T>>(a: [T; LANES], b: [T; LANES]) -> [T; LANES] {
    std::array::from_fn(|lane| a[lane] / b[lane])
}

/// A view over consecutive field table slots.
///
/// Implementations bind their columns with a [`TableBinder`], in the same
/// order the archetype hydrates the table; [`batch_view!`] generates
/// conforming impls.
pub trait BatchColumns {
    /// Binds the view's columns starting at the first table slot.
    fn bind(table: &FieldArrayTable, cursor: BatchCursor) -> Self;

    /// Moves every column's window forward by `rows`.
    fn advance(&mut self, rows: u32);
}

/// Generates a batch view struct and its [`BatchColumns`] impl.
///
/// Fields are bound to consecutive field table slots in declaration order,
/// so the declaration must mirror the record's column plan: components in
/// schema order, fields of a decomposed component in field order.
///
/// ```ignore
/// batch_view!(pub struct MoverView {
///     x: f32,
///     y: f32,
///     vx: f32,
///     vy: f32,
/// });
/// ```
#[macro_export]
macro_rules! batch_view {
    ($vis:vis struct $name:ident { $($field:ident : $ty:ty),+ $(,)? }) => {
        $vis struct $name<const MASKED: bool> {
            $(pub $field: $crate::engine::batch::ColumnBatch<$ty, MASKED>,)+
        }

        impl<const MASKED: bool> $crate::engine::batch::BatchColumns for $name<MASKED> {
            fn bind(
                table: &$crate::engine::batch::FieldArrayTable,
                cursor: $crate::engine::batch::BatchCursor,
            ) -> Self {
                let mut binder = $crate::engine::batch::TableBinder::new(table);
                Self {
                    $($field: $crate::engine::batch::ColumnBatch::bind(
                        binder.column::<$ty>(),
                        cursor,
                    ),)+
                }
            }

            fn advance(&mut self, rows: u32) {
                $(self.$field.advance(rows);)+
            }
        }
    };
}

/// Associates a record type with its batch view.
pub trait RecordBatches {
    /// The view type, instantiated for the full and masked paths.
    type View<const MASKED: bool>: BatchColumns;
}

/// Per-record lifecycle hooks.
///
/// The per-frame hooks are generic over the mask so one body serves both
/// the full-width and tail paths; drivers monomorphize them. All hooks
/// default to no-ops.
pub trait Lifecycle: RecordBatches {
    /// Runs once for a freshly created row, through a single-lane view.
    fn on_create(_view: &mut Self::View<true>) {}

    /// Runs per batch during the update phase.
    fn update<const MASKED: bool>(_dt: f64, _view: &mut Self::View<MASKED>) {}

    /// Runs per batch before physics integration.
    fn pre_physics<const MASKED: bool>(_dt: f64, _view: &mut Self::View<MASKED>) {}

    /// Runs per batch after physics integration.
    fn post_physics<const MASKED: bool>(_dt: f64, _view: &mut Self::View<MASKED>) {}

    /// Runs once for a row about to be destroyed, through a single-lane
    /// view.
    fn on_destroy(_view: &mut Self::View<true>) {}
}

/// Shared driver loop: `floor(count / LANES)` full batches advancing the
/// shared cursor, then exactly one masked batch when a tail remains.
fn drive_phase<R: Lifecycle>(
    dt: f64,
    table: &FieldArrayTable,
    count: u32,
    full: fn(f64, &mut R::View<false>),
    masked: fn(f64, &mut R::View<true>),
) {
    let lanes = LANES as u32;
    let full_batches = count / lanes;
    if full_batches > 0 {
        let cursor = BatchCursor { base: 0, lanes };
        let mut view = <R::View<false> as BatchColumns>::bind(table, cursor);
        for _ in 0..full_batches {
            full(dt, &mut view);
            view.advance(lanes);
        }
    }

    let tail = count % lanes;
    if tail > 0 {
        let cursor = BatchCursor { base: full_batches * lanes, lanes: tail };
        let mut view = <R::View<true> as BatchColumns>::bind(table, cursor);
        masked(dt, &mut view);
    }
}

/// Runs `R`'s update hook over one chunk. Matches [`StepFn`] so it can be
/// installed in a schema as `Hook::Step(drive_update::<R>)`.
pub fn drive_update<R: Lifecycle>(dt: f64, table: &FieldArrayTable, count: u32) {
    drive_phase::<R>(dt, table, count, R::update::<false>, R::update::<true>);
}

/// Runs `R`'s pre-physics hook over one chunk.
pub fn drive_pre_physics<R: Lifecycle>(dt: f64, table: &FieldArrayTable, count: u32) {
    drive_phase::<R>(dt, table, count, R::pre_physics::<false>, R::pre_physics::<true>);
}

/// Runs `R`'s post-physics hook over one chunk.
pub fn drive_post_physics<R: Lifecycle>(dt: f64, table: &FieldArrayTable, count: u32) {
    drive_phase::<R>(dt, table, count, R::post_physics::<false>, R::post_physics::<true>);
}

/// Runs `R`'s create hook for one row, through a single-lane masked view.
/// Matches [`SlotFn`] for installation as `Hook::Slot(slot_create::<R>)`.
pub fn slot_create<R: Lifecycle>(table: &FieldArrayTable, row: RowIndex) {
    let cursor = BatchCursor { base: row, lanes: 1 };
    let mut view = <R::View<true> as BatchColumns>::bind(table, cursor);
    R::on_create(&mut view);
}

/// Runs `R`'s destroy hook for one row, through a single-lane masked view.
pub fn slot_destroy<R: Lifecycle>(table: &FieldArrayTable, row: RowIndex) {
    let cursor = BatchCursor { base: row, lanes: 1 };
    let mut view = <R::View<true> as BatchColumns>::bind(table, cursor);
    R::on_destroy(&mut view);
}
