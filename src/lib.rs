//! # ECS Core
//!
//! Columnar, chunked archetype storage with generation-checked handles and
//! lane-width batch dispatch, built to sit at the heart of an entity
//! simulation runtime.
//!
//! ## Design Goals
//! - Archetype-based SoA storage in fixed, cache-aligned chunks
//! - Stale-handle detection through packed generations
//! - Explicit schema composition, resolved once at startup
//! - Eight-wide batch dispatch with a masked tail, bit-identical to scalar
//!
//! ## Usage sketch
//! Register components and record schemas at startup, freeze the meta
//! registry, build a [`Registry`], then drive the frame phases:
//!
//! ```ignore
//! let pos = register_component_fields::<Position>(position_fields())?;
//! let vel = register_component_fields::<Velocity>(velocity_fields())?;
//! register_record_type::<Mover>()?;
//! freeze_meta();
//!
//! let mut registry = Registry::new()?;
//! let mover = registry.create::<Mover>();
//! registry.invoke_update(dt);
//! registry.process_deferred_destructions();
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]
#![deny(dead_code)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::handle::Handle;

pub use engine::registry::{
    RecordLocation,
    Registry,
};

pub use engine::schema::{
    Hook,
    LifecycleRole,
    Member,
    Record,
    Schema,
};

pub use engine::meta::{
    component_id_of,
    component_meta,
    freeze_meta,
    record_meta,
    record_type_of,
    register_component,
    register_component_fields,
    register_record,
    register_record_type,
    ComponentMeta,
    FieldMeta,
    RecordMeta,
};

pub use engine::batch::{
    drive_post_physics,
    drive_pre_physics,
    drive_update,
    lane_add,
    lane_div,
    lane_mul,
    lane_sub,
    slot_create,
    slot_destroy,
    splat,
    BatchColumns,
    BatchCursor,
    ColumnBatch,
    FieldArrayTable,
    Lifecycle,
    RecordBatches,
    SlotFn,
    StepFn,
    FIELD_TABLE_CAP,
};

pub use engine::error::{
    CapacityError,
    ChunkOverflowError,
    CreateError,
    MetaError,
    UnregisteredTypeError,
};

pub use engine::types::{
    ArchetypeId,
    ComponentTypeId,
    OwnerId,
    RecordTypeId,
    RowIndex,
    Signature,
    LANES,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used storage-core types.
///
/// Import with:
/// ```rust
/// use ecs_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        batch_view,
        component_id_of,
        drive_post_physics,
        drive_pre_physics,
        drive_update,
        freeze_meta,
        lane_add,
        lane_div,
        lane_mul,
        lane_sub,
        register_component,
        register_component_fields,
        register_record_type,
        slot_create,
        slot_destroy,
        splat,
        FieldMeta,
        Handle,
        Hook,
        Lifecycle,
        LifecycleRole,
        Record,
        RecordBatches,
        Registry,
        Schema,
    };
}
