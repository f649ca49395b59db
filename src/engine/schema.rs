//! # Schema Composition
//!
//! A [`Schema`] is an ordered list of members describing what a record type
//! is made of: which components it stores and which lifecycle hooks run for
//! it. Schemas are plain data, composed explicitly with builder calls, and
//! handed to the meta registry at registration.
//!
//! ## Composition model
//! - **Append** (`component`, `lifecycle`) adds a member to the end; column
//!   order in the archetype layout follows member order.
//! - **Extend** clones a base schema so a derived record type can build on
//!   it without mutating the base.
//! - **Replace** substitutes a member in place, keeping its position. A
//!   component member is matched by component id; a lifecycle member is
//!   matched by role.
//!
//! A derived schema that *appends* a lifecycle member instead of replacing
//! the inherited one ends up with two members of the same role; resolution
//! takes the later one, so the base hook is shadowed without any diagnostic.
//! Prefer `replace_lifecycle` when overriding inherited behavior.

use crate::engine::batch::{SlotFn, StepFn};
use crate::engine::error::MetaError;
use crate::engine::types::ComponentTypeId;

/// Phase a lifecycle hook is attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LifecycleRole {
    /// Runs once per freshly created row.
    Create,
    /// Runs once per chunk during the update phase.
    Update,
    /// Runs once per chunk before physics integration.
    PrePhysics,
    /// Runs once per chunk after physics integration.
    PostPhysics,
    /// Runs once per row about to be destroyed.
    Destroy,
}

/// Dispatch function attached to a lifecycle member.
///
/// The two arities encode where the hook runs: step hooks cover a whole
/// chunk with a timestep, slot hooks touch exactly one row.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Hook {
    /// Per-chunk hook: `(dt, field table, row count)`.
    Step(StepFn),
    /// Per-row hook: `(field table, row)`.
    Slot(SlotFn),
}

/// Declares the schema of a record type.
///
/// The marker type implementing this trait is what handles carry as their
/// record type; the schema it returns drives archetype layout and lifecycle
/// dispatch. Registration happens explicitly at startup through
/// `meta::register_record_type::<R>()`.
pub trait Record: 'static {
    /// The composed member list for this record type.
    fn schema() -> Schema;
}

/// One entry of a schema.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Member {
    /// A stored component, identified by its registered id.
    Component(ComponentTypeId),

    /// A lifecycle hook for one phase.
    Lifecycle {
        /// Phase the hook runs in.
        role: LifecycleRole,
        /// Function to dispatch.
        hook: Hook,
    },
}

/// Ordered member list describing a record type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    members: Vec<Member>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self { Self::default() }

    /// Appends a component member.
    pub fn component(mut self, component_id: ComponentTypeId) -> Self {
        self.members.push(Member::Component(component_id));
        self
    }

    /// Appends a lifecycle member.
    pub fn lifecycle(mut self, role: LifecycleRole, hook: Hook) -> Self {
        self.members.push(Member::Lifecycle { role, hook });
        self
    }

    /// Clones this schema as the base of a derived one.
    pub fn extend(&self) -> Self { self.clone() }

    /// Substitutes the component member for `old` with `new`, keeping its
    /// position in the member order.
    ///
    /// ## Errors
    /// Fails if no member stores `old`.
    pub fn replace_component(
        mut self,
        old: ComponentTypeId,
        new: ComponentTypeId,
    ) -> Result<Self, MetaError> {
        let position = self
            .members
            .iter()
            .position(|member| matches!(member, Member::Component(id) if *id == old))
            .ok_or(MetaError::ReplaceTargetMissing { member: "component" })?;
        self.members[position] = Member::Component(new);
        Ok(self)
    }

    /// Substitutes the lifecycle member for `role` with a new hook, keeping
    /// its position in the member order.
    ///
    /// ## Errors
    /// Fails if no member carries `role`.
    pub fn replace_lifecycle(
        mut self,
        role: LifecycleRole,
        hook: Hook,
    ) -> Result<Self, MetaError> {
        let position = self
            .members
            .iter()
            .position(|member| matches!(member, Member::Lifecycle { role: r, .. } if *r == role))
            .ok_or(MetaError::ReplaceTargetMissing { member: "lifecycle role" })?;
        self.members[position] = Member::Lifecycle { role, hook };
        Ok(self)
    }

    /// Members in declaration order.
    pub fn members(&self) -> &[Member] { &self.members }

    /// Component ids in declaration order.
    pub fn component_ids(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.members.iter().filter_map(|member| match member {
            Member::Component(id) => Some(*id),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::batch::FieldArrayTable;
    use crate::engine::types::RowIndex;

    fn step_a(_dt: f64, _table: &FieldArrayTable, _count: u32) {}
    fn step_b(_dt: f64, _table: &FieldArrayTable, _count: u32) {}
    fn slot_a(_table: &FieldArrayTable, _row: RowIndex) {}

    #[test]
    fn append_preserves_order() {
        let schema = Schema::new()
            .component(3)
            .component(1)
            .lifecycle(LifecycleRole::Update, Hook::Step(step_a));
        assert_eq!(schema.component_ids().collect::<Vec<_>>(), vec![3, 1]);
        assert_eq!(schema.members().len(), 3);
    }

    #[test]
    fn extend_does_not_mutate_base() {
        let base = Schema::new().component(0);
        let derived = base.extend().component(1);
        assert_eq!(base.component_ids().count(), 1);
        assert_eq!(derived.component_ids().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn replace_component_is_positional() {
        let schema = Schema::new()
            .component(0)
            .component(1)
            .component(2)
            .replace_component(1, 9)
            .unwrap();
        assert_eq!(schema.component_ids().collect::<Vec<_>>(), vec![0, 9, 2]);
    }

    #[test]
    fn replace_lifecycle_swaps_the_hook_in_place() {
        let schema = Schema::new()
            .lifecycle(LifecycleRole::Update, Hook::Step(step_a))
            .component(0)
            .replace_lifecycle(LifecycleRole::Update, Hook::Step(step_b))
            .unwrap();
        match schema.members()[0] {
            Member::Lifecycle { role, hook } => {
                assert_eq!(role, LifecycleRole::Update);
                assert_eq!(hook, Hook::Step(step_b));
            }
            _ => panic!("expected lifecycle member first"),
        }
    }

    #[test]
    fn replace_missing_target_fails() {
        let schema = Schema::new().component(0);
        assert!(schema.clone().replace_component(5, 6).is_err());
        assert!(schema
            .replace_lifecycle(LifecycleRole::Destroy, Hook::Slot(slot_a))
            .is_err());
    }
}
