//! Error types for schema registration, layout, and record creation.
//!
//! This module declares focused, composable error types used across the
//! registry, archetype, and schema layers. Each error carries enough context
//! to make failures actionable while remaining small and cheap to pass around
//! or convert into higher-level variants like [`CreateError`].
//!
//! ## Goals
//! * **Specificity:** Each error type models a single failure mode (e.g.
//!   chunk overflow during layout, exhausted handle indices).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`fmt::Display`], and provide `From<T>` conversions into aggregate
//!   errors.
//! * **Actionability:** Structured fields (e.g. required vs. available bytes,
//!   offending ids) make logs useful without reproducing the issue.
//!
//! Stale or invalid handle lookups are deliberately *not* errors: component
//! accessors on the registry return `Option`, because a handle going stale a
//! frame after a destroy is ordinary control flow, not a failure.
//!
//! ## Display vs. Debug
//! * [`fmt::Display`] is optimized for operator logs (short, imperative
//!   phrasing).
//! * [`fmt::Debug`] (derived) retains full structure for diagnostics.

use std::fmt;

use crate::engine::schema::LifecycleRole;
use crate::engine::types::RecordTypeId;

/// Returned when a record layout cannot fit a single instance into one chunk.
///
/// This arises at registration time, when the per-instance stride (all
/// component and field columns together) plus alignment padding exceeds the
/// usable chunk payload.
///
/// ### Fields
/// * `record_type` — The record type whose layout failed.
/// * `stride` — Bytes required per instance across all columns.
/// * `usable` — Payload bytes available in one chunk after the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOverflowError {
    /// Record type whose layout failed.
    pub record_type: RecordTypeId,

    /// Bytes required per instance across all columns.
    pub stride: usize,

    /// Payload bytes available in one chunk.
    pub usable: usize,
}

impl fmt::Display for ChunkOverflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record type {} does not fit in a chunk ({} bytes per instance; {} usable)",
            self.record_type, self.stride, self.usable
        )
    }
}

impl std::error::Error for ChunkOverflowError {}

/// Returned when the registry cannot mint another handle because the slot
/// index space is exhausted.
///
/// ### Fields
/// * `slots_needed` — Total number of slots the operation required.
/// * `capacity` — Maximum number of addressable slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityError {
    /// Total slots the operation attempted to address.
    pub slots_needed: u64,

    /// Maximum addressable slot count.
    pub capacity: u64,
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "handle index space exhausted ({} needed; capacity {})",
            self.slots_needed, self.capacity
        )
    }
}

impl std::error::Error for CapacityError {}

/// Returned when an operation names a record type the meta registry has
/// never seen.
///
/// ## Context
/// Record types must be registered (and the registry frozen) before any
/// instance is created. Hitting this error in production means a
/// registration call was skipped during startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnregisteredTypeError {
    /// Human-readable name of the offending type.
    pub type_name: &'static str,
}

impl fmt::Display for UnregisteredTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record type {} is not registered", self.type_name)
    }
}

impl std::error::Error for UnregisteredTypeError {}

/// Errors raised while composing or registering schemas in the meta
/// registry.
///
/// ## Notes
/// These all indicate startup-time configuration mistakes rather than
/// recoverable runtime conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaError {
    /// Registration was attempted after the registry was frozen.
    Frozen,

    /// The record type id space is exhausted.
    RecordTypeCap {
        /// Maximum number of record types.
        capacity: usize,
    },

    /// The component type id space is exhausted.
    ComponentCap {
        /// Maximum number of component types.
        capacity: usize,
    },

    /// The record's components decompose into more storage columns than a
    /// field array table can bind.
    ColumnCap {
        /// Columns the schema requires.
        columns: usize,
        /// Maximum columns a field table holds.
        capacity: usize,
    },

    /// A lifecycle member carried a hook of the wrong arity for its role.
    ///
    /// Per-frame roles take step hooks; create/destroy roles take slot
    /// hooks.
    LifecycleArity {
        /// Role whose hook had the wrong shape.
        role: LifecycleRole,
    },

    /// A replace directive named a member absent from the base schema.
    ReplaceTargetMissing {
        /// Human-readable description of the missing member.
        member: &'static str,
    },

    /// A record layout did not fit into one chunk.
    Layout(ChunkOverflowError),
}

impl fmt::Display for MetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaError::Frozen => {
                f.write_str("meta registry is frozen; register types before startup completes")
            }
            MetaError::RecordTypeCap { capacity } => {
                write!(f, "record type capacity reached ({capacity})")
            }
            MetaError::ComponentCap { capacity } => {
                write!(f, "component type capacity reached ({capacity})")
            }
            MetaError::ColumnCap { columns, capacity } => {
                write!(f, "record needs {columns} storage columns; a field table holds {capacity}")
            }
            MetaError::LifecycleArity { role } => {
                write!(f, "lifecycle role {:?} registered with the wrong hook arity", role)
            }
            MetaError::ReplaceTargetMissing { member } => {
                write!(f, "schema replace target not found: {}", member)
            }
            MetaError::Layout(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for MetaError {}

impl From<ChunkOverflowError> for MetaError {
    fn from(e: ChunkOverflowError) -> Self { MetaError::Layout(e) }
}

/// High-level error for record creation.
///
/// This aggregates the failure modes encountered while allocating a slot,
/// resolving an archetype, and pushing a fresh row. `From<T>` conversions
/// allow `?` from the low-level operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateError {
    /// The slot index space is exhausted.
    Capacity(CapacityError),

    /// The record type was never registered.
    Unregistered(UnregisteredTypeError),

    /// The record layout cannot fit into one chunk.
    Layout(ChunkOverflowError),

    /// A chunk allocation failed.
    ChunkAllocation,
}

impl fmt::Display for CreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateError::Capacity(e) => write!(f, "{e}"),
            CreateError::Unregistered(e) => write!(f, "{e}"),
            CreateError::Layout(e) => write!(f, "{e}"),
            CreateError::ChunkAllocation => f.write_str("chunk allocation failed"),
        }
    }
}

impl std::error::Error for CreateError {}

impl From<CapacityError> for CreateError {
    fn from(e: CapacityError) -> Self { CreateError::Capacity(e) }
}
impl From<UnregisteredTypeError> for CreateError {
    fn from(e: UnregisteredTypeError) -> Self { CreateError::Unregistered(e) }
}
impl From<ChunkOverflowError> for CreateError {
    fn from(e: ChunkOverflowError) -> Self { CreateError::Layout(e) }
}
