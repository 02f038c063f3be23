//! Scene Integration Tests
//!
//! Tests for:
//! - Object creation, parent/child links and cycle rejection
//! - Absolute transform resolution
//! - Removal with re-parenting and defragmentation
//! - Update hooks and the skybox helper

use std::cell::Cell;
use std::rc::Rc;

use glam::{Mat4, Vec3};
use thirty::components::{
    ComponentKind, GeometryRecord, NO_OWNER, SkyboxMaterialRecord, Slot, TransformRecord,
};
use thirty::render::{GeometryId, ShaderId, TextureId};
use thirty::scene::{ObjectHandle, Scene};
use thirty::settings::SceneSettings;

fn new_scene() -> Scene {
    Scene::new(SceneSettings::default()).unwrap()
}

fn translate(scene: &mut Scene, object: ObjectHandle, offset: Vec3) {
    scene
        .component_mut::<TransformRecord>(object, Slot::Transform)
        .unwrap()
        .translate(offset);
}

fn children(scene: &Scene, object: ObjectHandle) -> Vec<ObjectHandle> {
    scene.object(object).unwrap().children().collect()
}

// ============================================================================
// Creation & Hierarchy
// ============================================================================

#[test]
fn create_object_links_to_parent_with_identity_transform() {
    let mut scene = new_scene();
    let a = scene.create_object("a", ObjectHandle::ROOT);
    let b = scene.create_object("b", a);

    assert_eq!(a, ObjectHandle(1));
    assert_eq!(b, ObjectHandle(2));
    assert_eq!(scene.object(b).unwrap().parent, a);
    assert_eq!(children(&scene, ObjectHandle::ROOT), vec![a]);
    assert_eq!(children(&scene, a), vec![b]);

    let t = scene.component::<TransformRecord>(b, Slot::Transform).unwrap();
    assert_eq!(t.model(), Mat4::IDENTITY);
    assert_eq!(scene.object_by_name("b"), Some(b));
    assert_eq!(scene.object_by_name("root"), Some(ObjectHandle::ROOT));
    assert_eq!(scene.object_by_name("zzz"), None);
}

#[test]
fn add_child_moves_between_parents() {
    let mut scene = new_scene();
    let a = scene.create_object("a", ObjectHandle::ROOT);
    let b = scene.create_object("b", ObjectHandle::ROOT);
    let c = scene.create_object("c", a);

    assert!(scene.add_child(b, c));
    assert!(children(&scene, a).is_empty());
    assert_eq!(children(&scene, b), vec![c]);
    assert_eq!(scene.object(c).unwrap().parent, b);
}

#[test]
fn add_child_rejects_cycles_and_unknown_handles() {
    let mut scene = new_scene();
    let a = scene.create_object("a", ObjectHandle::ROOT);
    let b = scene.create_object("b", a);

    assert!(!scene.add_child(b, a));
    assert!(!scene.add_child(a, a));
    assert!(!scene.add_child(a, ObjectHandle::ROOT));
    assert!(!scene.add_child(a, ObjectHandle(99)));
    assert_eq!(scene.object(a).unwrap().parent, ObjectHandle::ROOT);
}

#[test]
fn component_owner_is_recorded() {
    let mut scene = new_scene();
    let a = scene.create_object("a", ObjectHandle::ROOT);
    let geo = scene
        .components_mut()
        .insert(ComponentKind::Geometry, "g", GeometryRecord::new(GeometryId(1)));
    assert_eq!(scene.add_component(a, geo), None);
    assert_eq!(scene.components().header(geo).unwrap().owner, a.0);
    assert_eq!(scene.add_component(ObjectHandle(42), geo), None);
}

// ============================================================================
// Absolute Transform
// ============================================================================

#[test]
fn absolute_transform_composes_ancestors() {
    let mut scene = new_scene();
    let parent = scene.create_object("parent", ObjectHandle::ROOT);
    let child = scene.create_object("child", parent);
    translate(&mut scene, parent, Vec3::new(0.0, 1.0, 0.0));
    translate(&mut scene, child, Vec3::new(1.0, 0.0, 0.0));

    let world = scene.absolute_transform(child);
    assert!(world.w_axis.truncate().abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
}

#[test]
fn absolute_transform_applies_parent_rotation() {
    let mut scene = new_scene();
    let parent = scene.create_object("parent", ObjectHandle::ROOT);
    let child = scene.create_object("child", parent);
    scene
        .component_mut::<TransformRecord>(parent, Slot::Transform)
        .unwrap()
        .rotate(std::f32::consts::FRAC_PI_2, Vec3::Z);
    translate(&mut scene, child, Vec3::X);

    let world = scene.absolute_transform(child);
    assert!(world.w_axis.truncate().abs_diff_eq(Vec3::Y, 1e-6));
}

#[test]
fn absolute_transform_is_identity_without_transform() {
    let mut scene = new_scene();
    let parent = scene.create_object("parent", ObjectHandle::ROOT);
    let child = scene.create_object("child", parent);
    translate(&mut scene, child, Vec3::X);

    scene.object_mut(child).unwrap().slots.clear(Slot::Transform);
    assert_eq!(scene.absolute_transform(child), Mat4::IDENTITY);

    // a missing transform higher up the chain has the same effect
    let grandchild = scene.create_object("grandchild", parent);
    translate(&mut scene, grandchild, Vec3::Z);
    scene.object_mut(parent).unwrap().slots.clear(Slot::Transform);
    assert_eq!(scene.absolute_transform(grandchild), Mat4::IDENTITY);
}

// ============================================================================
// Removal & Defragmentation
// ============================================================================

#[test]
fn remove_object_reparents_children() {
    let mut scene = new_scene();
    let a = scene.create_object("a", ObjectHandle::ROOT);
    let b = scene.create_object("b", a);
    let c = scene.create_object("c", b);
    let d = scene.create_object("d", b);

    let removed = scene.remove_object(b).unwrap();
    assert_eq!(removed.name, "b");
    assert!(scene.object(b).is_none());
    assert_eq!(children(&scene, a), vec![c, d]);
    assert_eq!(scene.object(c).unwrap().parent, a);
    assert_eq!(scene.object_count(), 3);

    let transform = removed.slots.get(Slot::Transform).unwrap();
    assert_eq!(scene.components().header(transform).unwrap().owner, NO_OWNER);

    assert!(scene.remove_object(b).is_none());
    assert!(scene.remove_object(ObjectHandle::ROOT).is_none());
}

#[test]
fn defragment_rewrites_handles() {
    let mut scene = new_scene();
    let a = scene.create_object("a", ObjectHandle::ROOT);
    let b = scene.create_object("b", ObjectHandle::ROOT);
    let c = scene.create_object("c", b);
    translate(&mut scene, b, Vec3::Y);
    translate(&mut scene, c, Vec3::X);
    scene.remove_object(a);

    assert_eq!(scene.defragment(), 1);
    assert_eq!(scene.defragment(), 0);

    let b = scene.object_by_name("b").unwrap();
    let c = scene.object_by_name("c").unwrap();
    assert_eq!(b, ObjectHandle(1));
    assert_eq!(c, ObjectHandle(2));
    assert_eq!(children(&scene, ObjectHandle::ROOT), vec![b]);
    assert_eq!(children(&scene, b), vec![c]);
    assert_eq!(scene.object(c).unwrap().parent, b);

    let transform = scene.object(c).unwrap().slots.get(Slot::Transform).unwrap();
    assert_eq!(scene.components().header(transform).unwrap().owner, c.0);
    assert!(
        scene
            .absolute_transform(c)
            .w_axis
            .truncate()
            .abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6)
    );
}

// ============================================================================
// Update Hooks & Helpers
// ============================================================================

#[test]
fn update_runs_hooks_with_scene_access() {
    let mut scene = new_scene();
    let a = scene.create_object("spinner", ObjectHandle::ROOT);
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    scene.set_update_hook(a, move |scene, me, dt| {
        seen.set(seen.get() + 1);
        scene
            .component_mut::<TransformRecord>(me, Slot::Transform)
            .unwrap()
            .translate(Vec3::X * dt);
    });

    scene.update(0.5);
    scene.update(0.5);
    assert_eq!(calls.get(), 2);
    assert!(scene.object(a).unwrap().has_hook());
    assert!(scene.absolute_transform(a).w_axis.truncate().abs_diff_eq(Vec3::X, 1e-6));
}

#[test]
fn hook_may_create_objects() {
    let mut scene = new_scene();
    let a = scene.create_object("spawner", ObjectHandle::ROOT);
    scene.set_update_hook(a, |scene, me, _| {
        scene.create_object("spawned", me);
    });
    scene.update(0.1);
    scene.update(0.1);
    assert_eq!(children(&scene, a).len(), 2);
}

#[test]
fn set_skybox_builds_geometry_and_material() {
    let mut scene = new_scene();
    let sky = scene.set_skybox("sky", GeometryId(10), ShaderId(2), TextureId(3));

    assert_eq!(scene.object(sky).unwrap().parent, ObjectHandle::ROOT);
    let geo = scene.component::<GeometryRecord>(sky, Slot::Geometry).unwrap();
    assert_eq!(geo.mesh(), GeometryId(10));
    let mat = scene.component::<SkyboxMaterialRecord>(sky, Slot::Material).unwrap();
    assert_eq!(mat.cubemap(), Some(TextureId(3)));
    assert_eq!(mat.base.shader(), ShaderId(2));
}
