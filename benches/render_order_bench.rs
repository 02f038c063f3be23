//! Render order benchmark: gather + sort of generated scenes.
//!
//! Run with: `cargo bench --bench render_order_bench`

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::{Vec3, Vec4};
use thirty::components::{
    CameraRecord, ComponentKind, GeometryRecord, Slot, TransformRecord, UberMaterialRecord,
};
use thirty::render::{GeometryId, RecordingBackend, ShaderId};
use thirty::scene::{ObjectHandle, Scene};

/// A scene of `count` drawables spread over a few shaders and materials,
/// nested up to four levels deep.
fn build_scene(count: usize) -> Scene {
    let mut scene = Scene::default();
    let camera = scene.components_mut().insert(
        ComponentKind::Camera,
        "main",
        CameraRecord::new(1.0, 1.0, 0.1, 1000.0, true),
    );
    scene.add_component(ObjectHandle::ROOT, camera);

    let materials: Vec<_> = (0..16u32)
        .map(|i| {
            let m = UberMaterialRecord::new(ShaderId(i % 4))
                .with_diffuse(Vec4::splat(i as f32 / 16.0))
                .with_alpha_blending(i % 5 == 0);
            scene
                .components_mut()
                .insert(ComponentKind::MaterialUber, "material", m)
        })
        .collect();

    let mut parents = vec![ObjectHandle::ROOT];
    for i in 0..count {
        let parent = parents[i % parents.len()];
        let h = scene.create_object("object", parent);
        let f = i as f32;
        scene
            .component_mut::<TransformRecord>(h, Slot::Transform)
            .unwrap()
            .set_translation(Vec3::new(f.sin(), f.cos(), -(f % 97.0)));
        let geo = scene.components_mut().insert(
            ComponentKind::Geometry,
            "mesh",
            GeometryRecord::new(GeometryId(i as u32)),
        );
        scene.add_component(h, geo);
        scene.add_component(h, materials[i % materials.len()]);
        if parents.len() < 4 {
            parents.push(h);
        }
    }
    scene
}

fn bench_prepare(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare_frame");
    for count in [100, 1_000, 10_000] {
        let mut scene = build_scene(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(scene.prepare_frame().unwrap()));
        });
    }
    group.finish();
}

fn bench_draw(c: &mut Criterion) {
    let mut scene = build_scene(1_000);
    let mut backend = RecordingBackend::new();
    c.bench_function("draw_1000", |b| {
        b.iter(|| {
            backend.clear();
            scene.draw(&mut backend).unwrap();
            black_box(backend.commands.len())
        });
    });
}

criterion_group!(benches, bench_prepare, bench_draw);
criterion_main!(benches);
