use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Once;

use ecs_core::prelude::*;
use ecs_core::CreateError;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Health {
    current: u32,
    maximum: u32,
}

struct Creature;

batch_view!(struct CreatureView {
    current: u32,
    maximum: u32,
});

impl RecordBatches for Creature {
    type View<const MASKED: bool> = CreatureView<MASKED>;
}

static CREATED: AtomicU32 = AtomicU32::new(0);
static DESTROYED: AtomicU32 = AtomicU32::new(0);

impl Lifecycle for Creature {
    fn on_create(view: &mut Self::View<true>) {
        view.current.store(splat(100));
        view.maximum.store(splat(100));
        CREATED.fetch_add(1, Ordering::Relaxed);
    }

    fn on_destroy(_view: &mut Self::View<true>) {
        DESTROYED.fetch_add(1, Ordering::Relaxed);
    }
}

impl Record for Creature {
    fn schema() -> Schema {
        Schema::new()
            .component(component_id_of::<Health>().unwrap())
            .lifecycle(LifecycleRole::Create, Hook::Slot(slot_create::<Creature>))
            .lifecycle(LifecycleRole::Destroy, Hook::Slot(slot_destroy::<Creature>))
    }
}

struct Unregistered;

static INIT: Once = Once::new();

fn init() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
        register_component_fields::<Health>(vec![
            FieldMeta::of::<u32>("current", std::mem::offset_of!(Health, current)),
            FieldMeta::of::<u32>("maximum", std::mem::offset_of!(Health, maximum)),
        ])
        .unwrap();
        register_record_type::<Creature>().unwrap();
        freeze_meta();
    });
}

#[test]
fn create_mints_valid_handles_and_runs_the_create_hook() {
    init();
    let mut registry = Registry::new().unwrap();

    let before = CREATED.load(Ordering::Relaxed);
    let handle = registry.create::<Creature>();
    assert!(handle.is_valid());
    assert!(registry.is_alive(handle));
    assert_eq!(handle.generation(), 1);
    // Other tests create records concurrently, so only a lower bound holds.
    assert!(CREATED.load(Ordering::Relaxed) > before);

    // The create hook initialized both fields.
    assert_eq!(registry.get_field::<Health, u32>(handle, 0), Some(&100));
    assert_eq!(registry.get_field::<Health, u32>(handle, 1), Some(&100));
}

#[test]
fn index_zero_is_never_minted() {
    init();
    let mut registry = Registry::new().unwrap();
    for _ in 0..8 {
        let handle = registry.create::<Creature>();
        assert!(handle.index() > 0);
    }
}

#[test]
fn create_for_an_unregistered_type_is_an_error() {
    init();
    let mut registry = Registry::new().unwrap();
    match registry.try_create::<Unregistered>(0) {
        Err(CreateError::Unregistered(_)) => {}
        other => panic!("expected an unregistered-type error, got {other:?}"),
    }
}

#[test]
fn destruction_is_deferred_until_the_sweep() {
    init();
    let mut registry = Registry::new().unwrap();
    let handle = registry.create::<Creature>();
    let live_before = registry.total_entity_count();

    assert!(registry.destroy(handle));
    assert_eq!(registry.pending_destruction_count(), 1);

    // Not applied yet: the handle still resolves and storage is untouched.
    assert!(registry.is_alive(handle));
    assert_eq!(registry.get_field::<Health, u32>(handle, 0), Some(&100));
    assert_eq!(registry.total_entity_count(), live_before);

    let destroyed_before = DESTROYED.load(Ordering::Relaxed);
    assert_eq!(registry.process_deferred_destructions(), 1);
    assert!(DESTROYED.load(Ordering::Relaxed) > destroyed_before);
    assert!(!registry.is_alive(handle));
    assert_eq!(registry.get_field::<Health, u32>(handle, 0), None);
    assert_eq!(registry.total_entity_count(), live_before - 1);
}

#[test]
fn double_destroy_sweeps_once() {
    init();
    let mut registry = Registry::new().unwrap();
    let handle = registry.create::<Creature>();
    assert!(registry.destroy(handle));
    assert!(registry.destroy(handle));
    assert_eq!(registry.process_deferred_destructions(), 1);
}

#[test]
fn stale_handles_stay_dead_after_reuse() {
    init();
    let mut registry = Registry::new().unwrap();
    let stale = registry.create::<Creature>();
    registry.destroy(stale);
    registry.process_deferred_destructions();

    // Recreating reuses the index with a bumped generation.
    let fresh = registry.create::<Creature>();
    assert_eq!(fresh.index(), stale.index());
    assert_eq!(fresh.generation(), stale.generation() + 1);

    assert!(registry.is_alive(fresh));
    assert!(!registry.is_alive(stale));
    assert_eq!(registry.get_field::<Health, u32>(stale, 0), None);
    assert!(registry.get_field::<Health, u32>(fresh, 0).is_some());
}

#[test]
fn freed_indices_recycle_in_fifo_order() {
    init();
    let mut registry = Registry::new().unwrap();
    let a = registry.create::<Creature>();
    let b = registry.create::<Creature>();
    let c = registry.create::<Creature>();

    registry.destroy(a);
    registry.destroy(b);
    registry.process_deferred_destructions();

    let first = registry.create::<Creature>();
    let second = registry.create::<Creature>();
    assert_eq!(first.index(), a.index());
    assert_eq!(second.index(), b.index());

    // A fresh index continues past the highest minted one.
    let third = registry.create::<Creature>();
    assert!(third.index() > c.index());
}

#[test]
fn owner_tags_route_through_the_handle() {
    init();
    let mut registry = Registry::new().unwrap();
    let server = registry.create::<Creature>();
    let client = registry.create_owned::<Creature>(7);

    assert!(server.is_server());
    assert!(!client.is_server());
    assert!(client.is_owned_by(7));
    assert_eq!(client.record_type(), server.record_type());
    assert!(registry.is_alive(client));
}

#[test]
fn hundred_records_destroy_forty_and_recreate() {
    init();
    let mut registry = Registry::new().unwrap();
    let base = registry.total_entity_count();

    let handles: Vec<Handle> = (0..100).map(|_| registry.create::<Creature>()).collect();
    assert_eq!(registry.total_entity_count(), base + 100);

    // Destroy every other handle in the first 80.
    let doomed: Vec<Handle> = handles.iter().copied().take(80).step_by(2).collect();
    assert_eq!(doomed.len(), 40);
    for handle in &doomed {
        assert!(registry.destroy(*handle));
    }
    assert_eq!(registry.process_deferred_destructions(), 40);
    assert_eq!(registry.total_entity_count(), base + 60);

    // Occupancy summed over chunks matches the live count.
    let location = registry.location(handles[1]).unwrap();
    let archetype = registry.archetype(location.archetype).unwrap();
    let occupancy: u32 = (0..archetype.occupied_chunk_count())
        .map(|chunk| archetype.chunk_len(chunk))
        .sum();
    assert_eq!(occupancy, archetype.total_count());

    // Survivors are intact and readable.
    for handle in handles.iter().skip(1).step_by(2) {
        assert!(registry.is_alive(*handle));
        assert_eq!(registry.get_field::<Health, u32>(*handle, 0), Some(&100));
    }

    // Recreation drains the free list FIFO with bumped generations.
    let recreated: Vec<Handle> = (0..40).map(|_| registry.create::<Creature>()).collect();
    for (old, new) in doomed.iter().zip(recreated.iter()) {
        assert_eq!(new.index(), old.index());
        assert_eq!(new.generation(), old.generation() + 1);
        assert!(!registry.is_alive(*old));
        assert!(registry.is_alive(*new));
    }
    assert_eq!(registry.total_entity_count(), base + 100);
}
