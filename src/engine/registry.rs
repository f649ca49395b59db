//! # Record Registry
//!
//! The [`Registry`] is the single entry point for record lifetimes: it mints
//! and validates handles, owns every archetype, and drives the per-frame
//! lifecycle phases.
//!
//! ## Purpose
//! Callers create and destroy records through the registry and resolve
//! component data through generation-checked handles; everything below the
//! handle (archetype residency, chunk placement, swap-remove relocation) is
//! internal bookkeeping.
//!
//! ## Design
//! - A global location table maps slot index to `(archetype, chunk, row)`;
//!   it grows by doubling and slot index 0 is never allocated.
//! - Freed indices recycle through a FIFO queue, so a destroyed slot is not
//!   immediately re-minted while stale handles to it are still in flight.
//! - Each slot stores a generation, starting at 1; destruction bumps it
//!   (skipping 0 on wrap), which invalidates every outstanding handle.
//! - Destruction is deferred: `destroy` only queues, and
//!   [`Registry::process_deferred_destructions`] applies the queue at a
//!   frame boundary. Handles stay valid, and rows stay in place, until the
//!   sweep runs.
//! - Record types with equal signatures share one archetype; the frame
//!   dispatch for a shared archetype uses the hook table of the *first*
//!   record type that became resident.
//!
//! ## Concurrency
//! The registry has no internal locking. One writer per frame phase;
//! synchronization is the embedding runtime's responsibility.

use std::collections::{HashMap, VecDeque};

use crate::engine::archetype::Archetype;
use crate::engine::batch::{FieldArrayTable, StepFn};
use crate::engine::error::{
    CapacityError, ChunkOverflowError, CreateError, UnregisteredTypeError,
};
use crate::engine::handle::{next_generation, Handle};
use crate::engine::meta::{self, LifecycleTable, RecordMeta};
use crate::engine::types::{
    ArchetypeId, ChunkIndex, Generation, OwnerId, RecordTypeId, RowIndex, Signature, SlotIndex,
    INDEX_CAP,
};

/// Where a record's row currently lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecordLocation {
    /// Owning archetype.
    pub archetype: ArchetypeId,

    /// Chunk within the archetype.
    pub chunk: ChunkIndex,

    /// Row within the chunk.
    pub row: RowIndex,
}

#[derive(Clone, Copy)]
struct Slot {
    generation: Generation,
    alive: bool,
    location: RecordLocation,
}

impl Default for Slot {
    fn default() -> Self {
        Slot {
            generation: 1,
            alive: false,
            location: RecordLocation::default(),
        }
    }
}

/// Owns all archetypes and the handle table; the facade of the storage
/// core.
pub struct Registry {
    slots: Vec<Slot>,
    free_indices: VecDeque<SlotIndex>,
    next_index: SlotIndex,
    archetypes: Vec<Archetype>,
    by_signature: HashMap<Signature, ArchetypeId>,
    records: Vec<RecordMeta>,
    record_archetype: Vec<ArchetypeId>,
    pending_destructions: Vec<Handle>,
    scratch_table: FieldArrayTable,
}

impl Registry {
    /// Builds a registry with one archetype per distinct signature among
    /// the registered record types.
    ///
    /// Call after all registration is done and the meta registry is frozen;
    /// record types registered later are resolved lazily through
    /// [`Registry::get_or_create_archetype`].
    ///
    /// ## Errors
    /// Fails when any registered record's layout cannot fit one chunk.
    pub fn new() -> Result<Self, ChunkOverflowError> {
        let mut registry = Self {
            slots: vec![Slot::default()],
            free_indices: VecDeque::new(),
            next_index: 1,
            archetypes: Vec::new(),
            by_signature: HashMap::new(),
            records: Vec::new(),
            record_archetype: Vec::new(),
            pending_destructions: Vec::new(),
            scratch_table: FieldArrayTable::new(),
        };

        for record_type in 0..meta::record_count() {
            let record = match meta::record_meta(record_type) {
                Some(record) => record,
                None => continue,
            };
            let archetype = registry.get_or_create_archetype_inner(&record)?;
            registry.records.push(record);
            registry.record_archetype.push(archetype);
        }
        Ok(registry)
    }

    fn get_or_create_archetype_inner(
        &mut self,
        record: &RecordMeta,
    ) -> Result<ArchetypeId, ChunkOverflowError> {
        if let Some(&existing) = self.by_signature.get(&record.signature) {
            self.archetypes[existing as usize].add_resident_type(record.record_type);
            return Ok(existing);
        }

        let components: Vec<_> = record
            .components
            .iter()
            .filter_map(|&component_id| meta::component_meta(component_id))
            .collect();
        debug_assert_eq!(components.len(), record.components.len());

        let archetype_id = self.archetypes.len() as ArchetypeId;
        let archetype =
            Archetype::new(archetype_id, record.signature, record.record_type, &components)?;
        log::info!(
            "archetype {} for {}: {} columns, {} rows per chunk",
            archetype_id,
            record.name,
            archetype.columns().len(),
            archetype.entities_per_chunk()
        );
        self.archetypes.push(archetype);
        self.by_signature.insert(record.signature, archetype_id);
        Ok(archetype_id)
    }

    /// Resolves the archetype for a record type registered after this
    /// registry was built, creating it if its signature is new.
    pub fn get_or_create_archetype(
        &mut self,
        record_type: RecordTypeId,
    ) -> Result<ArchetypeId, CreateError> {
        if let Some(record) = self.records.iter().find(|r| r.record_type == record_type) {
            let record = record.clone();
            return Ok(self.get_or_create_archetype_inner(&record)?);
        }
        let record = meta::record_meta(record_type)
            .ok_or(UnregisteredTypeError { type_name: "<unknown record type>" })?;
        let archetype = self.get_or_create_archetype_inner(&record)?;
        self.records.push(record);
        self.record_archetype.push(archetype);
        Ok(archetype)
    }

    fn record_entry(&self, record_type: RecordTypeId) -> Option<(usize, &RecordMeta)> {
        self.records
            .iter()
            .enumerate()
            .find(|(_, record)| record.record_type == record_type)
    }

    fn hooks_for(&self, record_type: RecordTypeId) -> Option<LifecycleTable> {
        self.record_entry(record_type).map(|(_, record)| record.hooks)
    }

    /// Creates a server-owned instance of `R`.
    ///
    /// Returns [`Handle::INVALID`] on failure; releases log the error,
    /// debug builds additionally assert on an unregistered type.
    pub fn create<R: 'static>(&mut self) -> Handle {
        self.create_owned::<R>(0)
    }

    /// Creates an instance of `R` carrying `owner` as its routing tag.
    ///
    /// Same failure behavior as [`Registry::create`].
    pub fn create_owned<R: 'static>(&mut self, owner: OwnerId) -> Handle {
        match self.try_create::<R>(owner) {
            Ok(handle) => handle,
            Err(error) => {
                debug_assert!(
                    !matches!(error, CreateError::Unregistered(_)),
                    "create called for unregistered record type {}",
                    std::any::type_name::<R>()
                );
                log::error!("create {} failed: {}", std::any::type_name::<R>(), error);
                Handle::INVALID
            }
        }
    }

    /// Fallible core of record creation: allocates a slot, pushes a zeroed
    /// row, runs the create hook, and mints the handle.
    pub fn try_create<R: 'static>(&mut self, owner: OwnerId) -> Result<Handle, CreateError> {
        let record_type = meta::record_type_of::<R>().ok_or(UnregisteredTypeError {
            type_name: std::any::type_name::<R>(),
        })?;
        let (entry, _) = self
            .record_entry(record_type)
            .ok_or(UnregisteredTypeError { type_name: std::any::type_name::<R>() })?;
        let archetype_id = self.record_archetype[entry];

        let index = self.allocate_index()?;
        let (chunk, row) = match self.archetypes[archetype_id as usize].push_row(index) {
            Ok(placement) => placement,
            Err(error) => {
                // The row never landed, so the index goes straight back on
                // the free list.
                self.free_indices.push_back(index);
                return Err(error.into());
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.alive = true;
        slot.location = RecordLocation { archetype: archetype_id, chunk, row };
        let generation = slot.generation;

        if let Some(on_create) = self.records[entry].hooks.on_create {
            let archetype = &self.archetypes[archetype_id as usize];
            archetype.build_field_array_table(chunk, &mut self.scratch_table);
            on_create(&self.scratch_table, row);
        }

        Ok(Handle::pack(index, generation, record_type, owner, 0))
    }

    /// Takes a recycled index FIFO, or mints a fresh one, growing the
    /// location table by doubling.
    fn allocate_index(&mut self) -> Result<SlotIndex, CapacityError> {
        if let Some(index) = self.free_indices.pop_front() {
            return Ok(index);
        }
        if self.next_index > INDEX_CAP {
            return Err(CapacityError {
                slots_needed: self.next_index as u64 + 1,
                capacity: INDEX_CAP as u64 + 1,
            });
        }
        let index = self.next_index;
        self.next_index += 1;
        if index as usize >= self.slots.len() {
            let grown = (self.slots.len() * 2).max(index as usize + 1);
            self.slots.resize(grown, Slot::default());
        }
        Ok(index)
    }

    /// Queues a record for destruction at the next sweep. Returns `false`
    /// for an invalid or stale handle.
    ///
    /// The record stays fully accessible until
    /// [`Registry::process_deferred_destructions`] runs.
    pub fn destroy(&mut self, handle: Handle) -> bool {
        if self.resolve(handle).is_none() {
            return false;
        }
        self.pending_destructions.push(handle);
        true
    }

    /// Applies every queued destruction: runs destroy hooks, swap-removes
    /// rows, patches relocated records, bumps slot generations, and
    /// recycles indices FIFO.
    ///
    /// Call exactly once per frame, at the frame boundary, after all phase
    /// dispatch for the frame. Returns the number of records destroyed.
    pub fn process_deferred_destructions(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_destructions);
        let mut destroyed = 0;
        for handle in pending {
            // Revalidate: the handle may have been queued twice, or the
            // record destroyed by an earlier queue entry this sweep.
            let location = match self.resolve(handle) {
                Some(slot) => slot.location,
                None => continue,
            };

            if let Some(hooks) = self.hooks_for(handle.record_type()) {
                if let Some(on_destroy) = hooks.on_destroy {
                    let archetype = &self.archetypes[location.archetype as usize];
                    archetype.build_field_array_table(location.chunk, &mut self.scratch_table);
                    on_destroy(&self.scratch_table, location.row);
                }
            }

            let archetype = &mut self.archetypes[location.archetype as usize];
            if let Some(moved_slot) = archetype.swap_remove_row(location.chunk, location.row) {
                self.slots[moved_slot as usize].location = location;
            }

            let index = handle.index();
            let slot = &mut self.slots[index as usize];
            slot.alive = false;
            slot.generation = next_generation(slot.generation);
            slot.location = RecordLocation::default();
            self.free_indices.push_back(index);
            destroyed += 1;
        }
        destroyed
    }

    fn resolve(&self, handle: Handle) -> Option<&Slot> {
        if handle.is_invalid() {
            return None;
        }
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.alive && slot.generation == handle.generation() {
            Some(slot)
        } else {
            None
        }
    }

    /// Returns `true` if `handle` still addresses a live record.
    pub fn is_alive(&self, handle: Handle) -> bool {
        self.resolve(handle).is_some()
    }

    /// Current storage location of the record, if the handle is live.
    pub fn location(&self, handle: Handle) -> Option<RecordLocation> {
        self.resolve(handle).map(|slot| slot.location)
    }

    /// Returns `true` if the record's archetype stores component `T`.
    pub fn has_component<T: 'static>(&self, handle: Handle) -> bool {
        let component_id = match meta::component_id_of::<T>() {
            Some(id) => id,
            None => return false,
        };
        match self.location(handle) {
            Some(location) => {
                self.archetypes[location.archetype as usize].signature().has(component_id)
            }
            None => false,
        }
    }

    /// Reads an interleaved component of the record.
    ///
    /// Returns `None` for a stale handle, a component outside the record's
    /// archetype, or a component stored field-decomposed.
    pub fn get_component<T: Copy + 'static>(&self, handle: Handle) -> Option<&T> {
        let location = self.location(handle)?;
        let component_id = meta::component_id_of::<T>()?;
        let pointer = self.archetypes[location.archetype as usize].component_ptr(
            location.chunk,
            location.row,
            component_id,
        )?;
        // SAFETY: the column stores values of T at this row, and the shared
        // borrow of self keeps the chunk alive and unmutated.
        Some(unsafe { &*(pointer as *const T) })
    }

    /// Mutable access to an interleaved component of the record.
    pub fn get_component_mut<T: Copy + 'static>(&mut self, handle: Handle) -> Option<&mut T> {
        let location = self.location(handle)?;
        let component_id = meta::component_id_of::<T>()?;
        let pointer = self.archetypes[location.archetype as usize].component_ptr(
            location.chunk,
            location.row,
            component_id,
        )?;
        // SAFETY: as in get_component; the exclusive borrow of self makes
        // this the only live reference into the column.
        Some(unsafe { &mut *(pointer as *mut T) })
    }

    /// Reads one field of a field-decomposed component `C`.
    ///
    /// `F` must be the field's declared type; `field_index` follows the
    /// registration order of the decomposition.
    pub fn get_field<C: 'static, F: Copy + 'static>(
        &self,
        handle: Handle,
        field_index: usize,
    ) -> Option<&F> {
        let location = self.location(handle)?;
        let component_id = meta::component_id_of::<C>()?;
        let pointer = self.archetypes[location.archetype as usize].field_ptr(
            location.chunk,
            location.row,
            component_id,
            field_index,
        )?;
        // SAFETY: the field column stores values of F at this row.
        Some(unsafe { &*(pointer as *const F) })
    }

    /// Mutable access to one field of a field-decomposed component `C`.
    pub fn get_field_mut<C: 'static, F: Copy + 'static>(
        &mut self,
        handle: Handle,
        field_index: usize,
    ) -> Option<&mut F> {
        let location = self.location(handle)?;
        let component_id = meta::component_id_of::<C>()?;
        let pointer = self.archetypes[location.archetype as usize].field_ptr(
            location.chunk,
            location.row,
            component_id,
            field_index,
        )?;
        // SAFETY: as in get_field, under the exclusive borrow of self.
        Some(unsafe { &mut *(pointer as *mut F) })
    }

    /// Runs the update phase over every populated archetype.
    pub fn invoke_update(&mut self, dt: f64) {
        self.invoke_phase(dt, |hooks| hooks.update);
    }

    /// Runs the pre-physics phase over every populated archetype.
    pub fn invoke_pre_physics(&mut self, dt: f64) {
        self.invoke_phase(dt, |hooks| hooks.pre_physics);
    }

    /// Runs the post-physics phase over every populated archetype.
    pub fn invoke_post_physics(&mut self, dt: f64) {
        self.invoke_phase(dt, |hooks| hooks.post_physics);
    }

    /// Per archetype: take the first resident record type's hook for the
    /// phase and run it over every occupied chunk.
    fn invoke_phase(&mut self, dt: f64, select: fn(&LifecycleTable) -> Option<StepFn>) {
        for archetype_index in 0..self.archetypes.len() {
            let archetype = &self.archetypes[archetype_index];
            if archetype.total_count() == 0 {
                continue;
            }
            let first_resident = archetype.resident_types()[0];
            let step = match self.hooks_for(first_resident).and_then(|hooks| select(&hooks)) {
                Some(step) => step,
                None => continue,
            };

            let archetype = &self.archetypes[archetype_index];
            for chunk in 0..archetype.occupied_chunk_count() {
                archetype.build_field_array_table(chunk, &mut self.scratch_table);
                step(dt, &self.scratch_table, archetype.chunk_len(chunk));
            }
        }
    }

    /// The archetype with the given id, if it exists.
    pub fn archetype(&self, archetype_id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(archetype_id as usize)
    }

    /// All archetypes, for snapshot consumers walking storage directly.
    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    /// Total live records across all archetypes.
    pub fn total_entity_count(&self) -> u32 {
        self.archetypes.iter().map(|archetype| archetype.total_count()).sum()
    }

    /// Total allocated chunks across all archetypes.
    pub fn total_chunk_count(&self) -> u32 {
        self.archetypes
            .iter()
            .map(|archetype| archetype.allocated_chunk_count())
            .sum()
    }

    /// Queued destructions awaiting the next sweep.
    pub fn pending_destruction_count(&self) -> usize {
        self.pending_destructions.len()
    }
}
