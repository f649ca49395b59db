#![allow(dead_code)]

use std::mem::offset_of;
use std::sync::Once;

use ecs_core::prelude::*;

pub const RECORDS_SMALL: u32 = 100_000;
pub const RECORDS_MED: u32 = 1_000_000;

#[derive(Clone, Copy)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

pub struct Mover;

batch_view!(struct MoverView {
    px: f32,
    py: f32,
    vx: f32,
    vy: f32,
});

impl RecordBatches for Mover {
    type View<const MASKED: bool> = MoverView<MASKED>;
}

impl Lifecycle for Mover {
    fn update<const MASKED: bool>(dt: f64, view: &mut Self::View<MASKED>) {
        let step = splat(dt as f32);
        view.px.store(lane_add(view.px.load(), lane_mul(view.vx.load(), step)));
        view.py.store(lane_add(view.py.load(), lane_mul(view.vy.load(), step)));
    }
}

impl Record for Mover {
    fn schema() -> Schema {
        Schema::new()
            .component(component_id_of::<Position>().unwrap())
            .component(component_id_of::<Velocity>().unwrap())
            .lifecycle(LifecycleRole::Update, Hook::Step(drive_update::<Mover>))
    }
}

static INIT: Once = Once::new();

pub fn init_meta() {
    INIT.call_once(|| {
        register_component_fields::<Position>(vec![
            FieldMeta::of::<f32>("x", offset_of!(Position, x)),
            FieldMeta::of::<f32>("y", offset_of!(Position, y)),
        ])
        .unwrap();
        register_component_fields::<Velocity>(vec![
            FieldMeta::of::<f32>("x", offset_of!(Velocity, x)),
            FieldMeta::of::<f32>("y", offset_of!(Velocity, y)),
        ])
        .unwrap();
        register_record_type::<Mover>().unwrap();
        freeze_meta();
    });
}

pub fn populate(registry: &mut Registry, count: u32) {
    for i in 0..count {
        let handle = registry.create::<Mover>();
        *registry.get_field_mut::<Velocity, f32>(handle, 0).unwrap() = (i % 7) as f32;
        *registry.get_field_mut::<Velocity, f32>(handle, 1).unwrap() = (i % 5) as f32;
    }
}
