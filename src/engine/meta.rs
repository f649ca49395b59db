//! # Meta Registry
//!
//! This module provides a global registry that assigns stable
//! [`ComponentTypeId`] and [`RecordTypeId`] values to Rust types and stores
//! the schema-derived metadata the storage layer needs: component sizes and
//! alignments, optional field decompositions, per-record component orderings,
//! signatures, and lifecycle dispatch tables.
//!
//! ## Purpose
//! The registry decouples type information (`TypeId`, name, size, alignment,
//! field layout) from runtime storage, so archetypes can be laid out and
//! dispatched without any compile-time knowledge of the record types flowing
//! through them.
//!
//! ## Design
//! - Components are registered once and assigned a compact id in
//!   `[0, COMPONENT_CAP)`.
//! - Records are registered once, with a composed [`Schema`], and assigned a
//!   compact id in `[0, RECORD_TYPE_CAP)`.
//! - Record registration resolves the schema into an ordered component list,
//!   a [`Signature`], and a [`LifecycleTable`] of dispatch function pointers.
//! - The registry can be [`freeze_meta`]-d to prevent further registration
//!   after startup; ids are then stable for the lifetime of the process.
//!
//! ## Invariants
//! - Ids are unique and stable for the lifetime of the process.
//! - Every registered record has a resolved signature and component list.
//! - When frozen, registration is disallowed.
//!
//! ## Concurrency
//! The registry is protected by `RwLock` for concurrent reads and serialized
//! writes. Registration is expected to happen on one thread during startup;
//! all post-freeze access is read-only.

use std::{
    any::{type_name, TypeId},
    collections::HashMap,
    mem::{align_of, size_of},
    sync::{OnceLock, RwLock},
};

use crate::engine::batch::{SlotFn, StepFn, FIELD_TABLE_CAP};
use crate::engine::error::MetaError;
use crate::engine::schema::{Hook, LifecycleRole, Member, Record, Schema};
use crate::engine::types::{
    ComponentTypeId, RecordTypeId, Signature, COMPONENT_CAP, RECORD_TYPE_CAP,
};

/// Describes one field of a decomposed component.
///
/// A decomposed component is stored one column per field instead of one
/// interleaved column per struct; `offset` locates the field inside the
/// source struct so instance data can be scattered and gathered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldMeta {
    /// Field name for diagnostics.
    pub name: &'static str,

    /// Size of the field in bytes.
    pub size: usize,

    /// Alignment of the field in bytes.
    pub align: usize,

    /// Byte offset of the field within its component struct.
    pub offset: usize,
}

impl FieldMeta {
    /// Builds a field descriptor for a field of type `F`.
    ///
    /// Pair with `std::mem::offset_of!` at the call site:
    /// `FieldMeta::of::<f32>("x", std::mem::offset_of!(Vec3, x))`.
    #[inline]
    pub fn of<F: 'static>(name: &'static str, offset: usize) -> Self {
        Self {
            name,
            size: size_of::<F>(),
            align: align_of::<F>(),
            offset,
        }
    }
}

/// Describes a registered component type.
///
/// ## Fields
/// - `component_id`: Runtime identifier assigned by the registry.
/// - `name`: Rust type name for diagnostics.
/// - `type_id`: Runtime `TypeId`.
/// - `size` / `align`: Layout of the whole component struct.
/// - `fields`: Field decomposition; empty means the component is stored as
///   one interleaved column.
#[derive(Clone, Debug)]
pub struct ComponentMeta {
    /// Runtime identifier assigned to this component type.
    pub component_id: ComponentTypeId,

    /// Rust type name for diagnostics.
    pub name: &'static str,

    /// Runtime `TypeId` of the component.
    pub type_id: TypeId,

    /// Size of the component type in bytes.
    pub size: usize,

    /// Alignment of the component type in bytes.
    pub align: usize,

    /// Field decomposition. Empty means interleaved storage.
    pub fields: Vec<FieldMeta>,
}

impl ComponentMeta {
    /// Returns `true` if this component is stored one column per field.
    #[inline]
    pub fn is_decomposed(&self) -> bool { !self.fields.is_empty() }

    /// Number of storage columns this component occupies.
    #[inline]
    pub fn column_count(&self) -> usize {
        if self.fields.is_empty() { 1 } else { self.fields.len() }
    }
}

/// Per-record table of lifecycle dispatch functions.
///
/// Step hooks run once per chunk over a bound field table; slot hooks run
/// for a single row. All entries are optional; an absent hook is a no-op.
#[derive(Copy, Clone, Debug, Default)]
pub struct LifecycleTable {
    /// Runs for each freshly created row.
    pub on_create: Option<SlotFn>,

    /// Runs once per chunk during the update phase.
    pub update: Option<StepFn>,

    /// Runs once per chunk before physics integration.
    pub pre_physics: Option<StepFn>,

    /// Runs once per chunk after physics integration.
    pub post_physics: Option<StepFn>,

    /// Runs for each row about to be destroyed.
    pub on_destroy: Option<SlotFn>,
}

/// Describes a registered record type: its resolved schema, signature, and
/// lifecycle dispatch table.
#[derive(Clone, Debug)]
pub struct RecordMeta {
    /// Runtime identifier assigned to this record type.
    pub record_type: RecordTypeId,

    /// Rust type name for diagnostics.
    pub name: &'static str,

    /// Runtime `TypeId` of the record marker type.
    pub type_id: TypeId,

    /// Component set, used as the archetype lookup key.
    pub signature: Signature,

    /// Components in schema order. Column order in the archetype layout
    /// follows this ordering exactly.
    pub components: Vec<ComponentTypeId>,

    /// Lifecycle dispatch table resolved from the schema.
    pub hooks: LifecycleTable,
}

/// Global mapping between Rust types and compact runtime identifiers.
///
/// ## Invariants
/// - Every entry in `components_by_type` has a matching
///   `components[id as usize]`, and likewise for records.
/// - Ids are always in bounds of their capacity constants.
pub struct MetaRegistry {
    next_component_id: ComponentTypeId,
    components_by_type: HashMap<TypeId, ComponentTypeId>,
    components: Vec<Option<ComponentMeta>>,

    next_record_type: RecordTypeId,
    records_by_type: HashMap<TypeId, RecordTypeId>,
    records: Vec<Option<RecordMeta>>,

    frozen: bool,
}

static REGISTRY: OnceLock<RwLock<MetaRegistry>> = OnceLock::new();

fn meta_registry() -> &'static RwLock<MetaRegistry> {
    REGISTRY.get_or_init(|| {
        RwLock::new(MetaRegistry {
            next_component_id: 0,
            components_by_type: HashMap::new(),
            components: vec![None; COMPONENT_CAP],
            next_record_type: 0,
            records_by_type: HashMap::new(),
            records: vec![None; RECORD_TYPE_CAP],
            frozen: false,
        })
    })
}

impl MetaRegistry {
    /// Freezes the registry, preventing further registrations.
    ///
    /// ## Purpose
    /// Locks type identity and schema layout so archetypes can assume ids
    /// are complete and stable.
    pub fn freeze(&mut self) { self.frozen = true; }

    /// Returns `true` if the registry has been frozen.
    pub fn is_frozen(&self) -> bool { self.frozen }

    /// Registers component type `T` and returns its assigned id.
    ///
    /// The `Copy` bound is the compile-time rendition of the component
    /// contract: plain-old-data values with no heap state, safe to relocate
    /// with a raw byte copy during swap-remove.
    ///
    /// ## Behavior
    /// - If `T` is already registered, returns the existing id; a differing
    ///   `fields` list on re-registration is ignored.
    /// - Otherwise allocates a new id and stores a [`ComponentMeta`].
    ///
    /// ## Errors
    /// Fails if the registry is frozen or `COMPONENT_CAP` is exceeded.
    pub fn register_component<T: Copy + Send + Sync + 'static>(
        &mut self,
        fields: Vec<FieldMeta>,
    ) -> Result<ComponentTypeId, MetaError> {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.components_by_type.get(&type_id) {
            return Ok(existing);
        }

        if self.frozen {
            return Err(MetaError::Frozen);
        }
        if (self.next_component_id as usize) >= COMPONENT_CAP {
            return Err(MetaError::ComponentCap { capacity: COMPONENT_CAP });
        }

        debug_assert!(
            fields.iter().map(|field| field.size).sum::<usize>() <= size_of::<T>(),
            "field decomposition of {} exceeds the struct size",
            type_name::<T>()
        );

        let component_id = self.next_component_id;
        self.next_component_id += 1;
        self.components_by_type.insert(type_id, component_id);
        self.components[component_id as usize] = Some(ComponentMeta {
            component_id,
            name: type_name::<T>(),
            type_id,
            size: size_of::<T>(),
            align: align_of::<T>(),
            fields,
        });
        Ok(component_id)
    }

    /// Registers record type `R` with a composed schema and returns its
    /// assigned id.
    ///
    /// ## Behavior
    /// Resolves the schema into an ordered component list, a signature, and
    /// a lifecycle dispatch table. Registration is idempotent: a type that is
    /// already registered keeps its id and its original schema. Later
    /// lifecycle members of the same role overwrite earlier ones, so a schema
    /// that appends a hook without replacing the base member silently shadows
    /// the base behavior.
    ///
    /// ## Errors
    /// Fails if the registry is frozen, the record type id space is
    /// exhausted, a lifecycle member carries a hook of the wrong arity for
    /// its role, or the schema decomposes into more storage columns than a
    /// field array table can bind.
    pub fn register_record<R: 'static>(
        &mut self,
        schema: &Schema,
    ) -> Result<RecordTypeId, MetaError> {
        let type_id = TypeId::of::<R>();
        if let Some(&existing) = self.records_by_type.get(&type_id) {
            return Ok(existing);
        }
        if self.frozen {
            return Err(MetaError::Frozen);
        }
        if (self.next_record_type as usize) >= RECORD_TYPE_CAP {
            return Err(MetaError::RecordTypeCap { capacity: RECORD_TYPE_CAP });
        }

        let mut signature = Signature::default();
        let mut components = Vec::new();
        let mut hooks = LifecycleTable::default();
        let mut column_count = 0;

        for member in schema.members() {
            match member {
                Member::Component(component_id) => {
                    signature.set(*component_id);
                    components.push(*component_id);
                    column_count += self
                        .component(*component_id)
                        .map_or(1, |meta| meta.column_count());
                }
                Member::Lifecycle { role, hook } => match (role, hook) {
                    (LifecycleRole::Create, Hook::Slot(f)) => hooks.on_create = Some(*f),
                    (LifecycleRole::Destroy, Hook::Slot(f)) => hooks.on_destroy = Some(*f),
                    (LifecycleRole::Update, Hook::Step(f)) => hooks.update = Some(*f),
                    (LifecycleRole::PrePhysics, Hook::Step(f)) => hooks.pre_physics = Some(*f),
                    (LifecycleRole::PostPhysics, Hook::Step(f)) => hooks.post_physics = Some(*f),
                    (role, _) => return Err(MetaError::LifecycleArity { role: *role }),
                },
            }
        }

        if column_count > FIELD_TABLE_CAP {
            return Err(MetaError::ColumnCap { columns: column_count, capacity: FIELD_TABLE_CAP });
        }

        let record_type = self.next_record_type;
        self.next_record_type += 1;
        self.records_by_type.insert(type_id, record_type);
        self.records[record_type as usize] = Some(RecordMeta {
            record_type,
            name: type_name::<R>(),
            type_id,
            signature,
            components,
            hooks,
        });
        Ok(record_type)
    }

    /// Returns the component id for `T`, if registered.
    pub fn component_id_of<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.components_by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the component descriptor for an id, if registered.
    pub fn component(&self, component_id: ComponentTypeId) -> Option<&ComponentMeta> {
        self.components.get(component_id as usize).and_then(|slot| slot.as_ref())
    }

    /// Returns the record type id for `R`, if registered.
    pub fn record_type_of<R: 'static>(&self) -> Option<RecordTypeId> {
        self.records_by_type.get(&TypeId::of::<R>()).copied()
    }

    /// Returns the record descriptor for an id, if registered.
    pub fn record(&self, record_type: RecordTypeId) -> Option<&RecordMeta> {
        self.records.get(record_type as usize).and_then(|slot| slot.as_ref())
    }

    /// Number of record types registered so far. Ids are assigned densely,
    /// so every id below this count is valid.
    pub fn record_count(&self) -> RecordTypeId {
        self.next_record_type
    }
}

/// Registers component type `T` (interleaved storage) in the global
/// registry.
pub fn register_component<T: Copy + Send + Sync + 'static>() -> Result<ComponentTypeId, MetaError> {
    meta_registry().write().unwrap().register_component::<T>(Vec::new())
}

/// Registers component type `T` with a field decomposition, so each field
/// gets its own storage column.
pub fn register_component_fields<T: Copy + Send + Sync + 'static>(
    fields: Vec<FieldMeta>,
) -> Result<ComponentTypeId, MetaError> {
    meta_registry().write().unwrap().register_component::<T>(fields)
}

/// Registers record type `R` with an explicit schema in the global registry.
pub fn register_record<R: 'static>(schema: &Schema) -> Result<RecordTypeId, MetaError> {
    meta_registry().write().unwrap().register_record::<R>(schema)
}

/// Registers record type `R` using the schema its [`Record`] impl declares.
pub fn register_record_type<R: Record>() -> Result<RecordTypeId, MetaError> {
    // Compose the schema before taking the write lock: schema() bodies read
    // the registry (component_id_of and friends), and a read acquired while
    // this thread holds the write lock blocks forever.
    let schema = R::schema();
    meta_registry().write().unwrap().register_record::<R>(&schema)
}

/// Freezes the global meta registry.
///
/// ## Purpose
/// Prevents any further registration, making ids and schema layouts stable
/// for archetype construction.
pub fn freeze_meta() {
    meta_registry().write().unwrap().freeze();
}

/// Returns the registered component id for type `T`, if any.
pub fn component_id_of<T: 'static>() -> Option<ComponentTypeId> {
    meta_registry().read().unwrap().component_id_of::<T>()
}

/// Returns a copy of the descriptor for `component_id`, if registered.
pub fn component_meta(component_id: ComponentTypeId) -> Option<ComponentMeta> {
    meta_registry().read().unwrap().component(component_id).cloned()
}

/// Returns the registered record type id for `R`, if any.
pub fn record_type_of<R: 'static>() -> Option<RecordTypeId> {
    meta_registry().read().unwrap().record_type_of::<R>()
}

/// Returns a copy of the descriptor for `record_type`, if registered.
pub fn record_meta(record_type: RecordTypeId) -> Option<RecordMeta> {
    meta_registry().read().unwrap().record(record_type).cloned()
}

/// Number of record types registered so far.
pub fn record_count() -> RecordTypeId {
    meta_registry().read().unwrap().record_count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::batch::FieldArrayTable;

    #[derive(Clone, Copy)]
    struct Pixel {
        #[allow(dead_code)]
        x: f32,
        #[allow(dead_code)]
        y: f32,
    }

    fn noop_step(_dt: f64, _table: &FieldArrayTable, _count: u32) {}

    struct Sprite;

    impl Record for Sprite {
        fn schema() -> Schema {
            // Resolves the component id through the registry, the way
            // application schemas do.
            let pixel = component_id_of::<Pixel>().unwrap();
            Schema::new()
                .component(pixel)
                .lifecycle(LifecycleRole::Update, Hook::Step(noop_step))
        }
    }

    // schema() takes a read lock on the registry, so registration must
    // resolve it before acquiring the write lock or the thread blocks on
    // itself.
    #[test]
    fn registration_resolves_a_schema_that_reads_the_registry() {
        register_component::<Pixel>().unwrap();
        let record_type = register_record_type::<Sprite>().unwrap();
        let meta = record_meta(record_type).unwrap();
        assert_eq!(meta.components.len(), 1);
        assert_eq!(meta.hooks.update, Some(noop_step as StepFn));
    }
}
