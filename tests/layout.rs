use std::mem::offset_of;
use std::sync::Once;

use ecs_core::engine::archetype::Column;
use ecs_core::engine::types::{CHUNK_RESERVED_HEADER, CHUNK_SIZE};
use ecs_core::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Tag(u8);

#[derive(Clone, Copy, Debug, PartialEq)]
struct Mass(f64);

struct Body;

batch_view!(struct BodyView {
    x: f32,
    y: f32,
    z: f32,
});

impl RecordBatches for Body {
    type View<const MASKED: bool> = BodyView<MASKED>;
}

impl Lifecycle for Body {}

impl Record for Body {
    fn schema() -> Schema {
        Schema::new()
            .component(component_id_of::<Position>().unwrap())
            .component(component_id_of::<Tag>().unwrap())
            .component(component_id_of::<Mass>().unwrap())
    }
}

// Same component set declared in a different order: the signature is equal,
// so Shade shares Body's archetype.
struct Shade;

impl Record for Shade {
    fn schema() -> Schema {
        Schema::new()
            .component(component_id_of::<Mass>().unwrap())
            .component(component_id_of::<Tag>().unwrap())
            .component(component_id_of::<Position>().unwrap())
    }
}

static INIT: Once = Once::new();

fn init() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
        register_component_fields::<Position>(vec![
            FieldMeta::of::<f32>("x", offset_of!(Position, x)),
            FieldMeta::of::<f32>("y", offset_of!(Position, y)),
            FieldMeta::of::<f32>("z", offset_of!(Position, z)),
        ])
        .unwrap();
        register_component::<Tag>().unwrap();
        register_component::<Mass>().unwrap();
        register_record_type::<Body>().unwrap();
        register_record_type::<Shade>().unwrap();
        freeze_meta();
    });
}

fn body_columns(registry: &mut Registry) -> (Vec<Column>, u32) {
    let handle = registry.create::<Body>();
    let location = registry.location(handle).unwrap();
    let archetype = registry.archetype(location.archetype).unwrap();
    (archetype.columns().to_vec(), archetype.entities_per_chunk())
}

#[test]
fn every_column_is_aligned_to_its_element() {
    init();
    let mut registry = Registry::new().unwrap();
    let (columns, _) = body_columns(&mut registry);

    // 3 position fields + tag + mass.
    assert_eq!(columns.len(), 5);
    for column in &columns {
        assert!(column.offset >= CHUNK_RESERVED_HEADER);
        assert_eq!(column.offset % column.align, 0, "column {column:?}");
    }
}

#[test]
fn columns_do_not_overlap_and_fit_the_chunk() {
    init();
    let mut registry = Registry::new().unwrap();
    let (columns, capacity) = body_columns(&mut registry);

    let mut previous_end = CHUNK_RESERVED_HEADER;
    for column in &columns {
        assert!(column.offset >= previous_end, "column {column:?} overlaps its predecessor");
        previous_end = column.offset + column.size * capacity as usize;
        assert!(previous_end <= CHUNK_SIZE);
    }
}

#[test]
fn capacity_matches_the_stride_estimate() {
    init();
    let mut registry = Registry::new().unwrap();
    let (columns, capacity) = body_columns(&mut registry);

    let stride: usize = columns.iter().map(|column| column.size).sum();
    let estimate = (CHUNK_SIZE - CHUNK_RESERVED_HEADER) / stride;
    assert!(capacity as usize <= estimate);
    // Shrinking only absorbs alignment padding, never more than a few rows.
    assert!(capacity as usize + 8 >= estimate);
}

#[test]
fn records_spill_into_a_second_chunk_at_capacity() {
    init();
    let mut registry = Registry::new().unwrap();
    let probe = registry.create::<Body>();
    let location = registry.location(probe).unwrap();
    let capacity = registry.archetype(location.archetype).unwrap().entities_per_chunk();

    // One probe plus capacity + 3 more: the tail chunk holds 4 rows.
    let handles: Vec<Handle> =
        (1..capacity + 4).map(|_| registry.create::<Body>()).collect();
    let archetype = registry.archetype(location.archetype).unwrap();
    assert_eq!(archetype.occupied_chunk_count(), 2);
    assert_eq!(archetype.chunk_len(0), capacity);
    assert_eq!(archetype.chunk_len(1), 4);

    // The spilled record landed in chunk 1, row 0.
    let spilled = handles[capacity as usize - 1];
    let spilled_location = registry.location(spilled).unwrap();
    assert_eq!(spilled_location.chunk, 1);
    assert_eq!(spilled_location.row, 0);
}

#[test]
fn equal_signatures_share_one_archetype() {
    init();
    let mut registry = Registry::new().unwrap();
    let body = registry.create::<Body>();
    let shade = registry.create::<Shade>();
    assert_ne!(body.record_type(), shade.record_type());

    let body_location = registry.location(body).unwrap();
    let shade_location = registry.location(shade).unwrap();
    assert_eq!(body_location.archetype, shade_location.archetype);

    let archetype = registry.archetype(body_location.archetype).unwrap();
    assert!(archetype.resident_types().contains(&body.record_type()));
    assert!(archetype.resident_types().contains(&shade.record_type()));
    assert_eq!(archetype.total_count(), 2);
}

#[test]
fn interleaved_components_read_back_through_the_handle() {
    init();
    let mut registry = Registry::new().unwrap();
    let handle = registry.create::<Body>();

    *registry.get_component_mut::<Mass>(handle).unwrap() = Mass(9.81);
    *registry.get_component_mut::<Tag>(handle).unwrap() = Tag(3);
    assert_eq!(registry.get_component::<Mass>(handle), Some(&Mass(9.81)));
    assert_eq!(registry.get_component::<Tag>(handle), Some(&Tag(3)));

    // Decomposed components have no interleaved form.
    assert_eq!(registry.get_component::<Position>(handle), None);
    assert!(registry.has_component::<Position>(handle));
    *registry.get_field_mut::<Position, f32>(handle, 2).unwrap() = 4.5;
    assert_eq!(registry.get_field::<Position, f32>(handle, 2), Some(&4.5));
}
