//! Component Store Tests
//!
//! Tests for:
//! - Creation: kind tag, handle and fixed size per kind
//! - Slot tables: attach, replace, typed slot access
//! - Name lookup with kind filters
//! - Per-frame update (animation only) and teardown

use glam::{Mat4, Quat, Vec3, Vec4};
use thirty::components::{
    Animation, AnimationRecord, AnimationSet, Bone, CameraRecord, ComponentKind, ComponentStore,
    GeometryRecord, Keyframe, KindFilter, LightRecord, NO_OWNER, Skeleton, SkyboxMaterialRecord,
    Slot, SlotTable, TextureSlot, TransformRecord, UberMaterialRecord,
};
use thirty::render::{Command, GeometryId, RecordingBackend, ShaderId, TextureId, Uniform};
use thirty::scene::ObjectHandle;

fn store() -> ComponentStore {
    ComponentStore::new(16, 512)
}

fn two_bone_set() -> AnimationSet {
    let bones = vec![
        Bone {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            parent: 0,
        },
        Bone {
            position: Vec3::Y,
            rotation: Quat::IDENTITY,
            parent: 1,
        },
    ];
    let skeleton = Skeleton::new(Mat4::IDENTITY, bones).unwrap();
    let keyframe = |timestamp: f32, x: f32| Keyframe {
        timestamp,
        root_offset: Vec3::new(x, 0.0, 0.0),
        rotations: vec![Quat::IDENTITY; 2],
    };
    let walk = Animation {
        name: "walk".into(),
        keyframes: vec![keyframe(0.0, 0.0), keyframe(1.0, 2.0)],
    };
    AnimationSet::new(skeleton, vec![walk])
}

// ============================================================================
// Creation
// ============================================================================

#[test]
fn created_record_has_kind_and_fixed_size() {
    let mut s = store();
    for kind in ComponentKind::ALL {
        let h = s.create(kind, "");
        let header = s.header(h).unwrap();
        assert_eq!(header.kind(), Some(kind));
        assert_eq!(header.handle(), h);
        assert_eq!(header.owner, NO_OWNER);
        assert_eq!(s.records().size_of(h.index()), Some(kind.info().size), "{kind:?}");
    }
    assert_eq!(s.len(), ComponentKind::COUNT);
}

#[test]
fn records_are_readable_after_many_appends() {
    let mut s = ComponentStore::new(16, 16);
    let handles: Vec<_> = (0..64)
        .map(|i| {
            s.insert(
                ComponentKind::Transform,
                "",
                TransformRecord::new(Mat4::from_translation(Vec3::splat(i as f32))),
            )
        })
        .collect();
    for (i, h) in handles.into_iter().enumerate() {
        let t = s.get::<TransformRecord>(h).unwrap();
        assert_eq!(t.translation(), Vec3::splat(i as f32));
    }
}

#[test]
fn material_prefix_views_both_material_kinds() {
    let mut s = store();
    let uber = s.insert(ComponentKind::MaterialUber, "m", UberMaterialRecord::new(ShaderId(3)));
    let sky = s.insert(
        ComponentKind::MaterialSkybox,
        "sky",
        SkyboxMaterialRecord::new(ShaderId(4)),
    );
    assert_eq!(s.material_shader(uber), Some(ShaderId(3)));
    assert_eq!(s.material_shader(sky), Some(ShaderId(4)));
    assert!(s.get::<UberMaterialRecord>(sky).is_none());
}

// ============================================================================
// Slot tables
// ============================================================================

#[test]
fn attach_fills_the_kind_slot() {
    let mut s = store();
    let mut slots = SlotTable::new();
    let owner = ObjectHandle(7);

    let light = s.insert(
        ComponentKind::LightPoint,
        "lamp",
        LightRecord::new(Vec3::ONE, 2.0, 10.0),
    );
    assert_eq!(s.attach(&mut slots, owner, light), None);
    assert!(slots.has(Slot::Light));
    assert_eq!(s.header(light).unwrap().owner, 7);

    let other = s.insert(
        ComponentKind::LightSpot,
        "spot",
        LightRecord::new(Vec3::ONE, 1.0, 5.0),
    );
    assert_eq!(s.attach(&mut slots, owner, other), Some(light));
    assert_eq!(slots.get(Slot::Light), Some(other));

    let record = s.get_slot::<LightRecord>(&slots, Slot::Light).unwrap();
    assert_eq!(record.intensity, 1.0);
    assert!(s.get_slot::<CameraRecord>(&slots, Slot::Camera).is_none());
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn idx_by_name_respects_filter() {
    let mut s = store();
    let geo = s.insert(ComponentKind::Geometry, "crate", GeometryRecord::new(GeometryId(1)));
    let mat = s.insert(ComponentKind::MaterialUber, "crate", UberMaterialRecord::new(ShaderId(1)));

    assert_eq!(s.idx_by_name("crate", KindFilter::all()), Some(geo));
    assert_eq!(s.idx_by_name("crate", KindFilter::MATERIAL), Some(mat));
    assert_eq!(s.idx_by_name("crate", KindFilter::LIGHT), None);
    assert_eq!(s.idx_by_name("missing", KindFilter::all()), None);
    assert_eq!(s.name_of(mat), Some("crate"));
}

// ============================================================================
// Update & teardown
// ============================================================================

#[test]
fn update_advances_only_animations() {
    let mut s = store();
    let mut slots = SlotTable::new();
    let anim = s.insert_animation("hero", two_bone_set());
    let t = s.insert(ComponentKind::Transform, "", TransformRecord::identity());
    s.attach(&mut slots, ObjectHandle(1), anim);
    s.attach(&mut slots, ObjectHandle(1), t);

    let (_, set) = s.animation(anim).unwrap();
    let walk = set.index_by_name("walk").unwrap();
    s.get_mut::<AnimationRecord>(anim).unwrap().play(walk);

    s.update(&slots, 0.25);
    s.update(&slots, 0.5);
    let record = s.get::<AnimationRecord>(anim).unwrap();
    assert!((record.time - 0.75).abs() < 1e-6);

    // wraps at the last keyframe
    s.update(&slots, 0.5);
    let record = s.get::<AnimationRecord>(anim).unwrap();
    assert!((record.time - 0.25).abs() < 1e-6);
    assert_eq!(s.get::<TransformRecord>(t).unwrap().model(), Mat4::IDENTITY);
}

#[test]
fn bind_bones_uploads_skinning_matrices() {
    let mut s = store();
    let anim = s.insert_animation("hero", two_bone_set());
    s.get_mut::<AnimationRecord>(anim).unwrap().pose(0, 0.5);

    let mut backend = RecordingBackend::new();
    let (record, set) = s.animation(anim).unwrap();
    record.bind_bones(set, ShaderId(1), &mut backend);

    // root offset lerps to (1, 0, 0) halfway; every bone follows the root
    let Some(Uniform::Mat4(m)) = backend.uniform(ShaderId(1), "bones[1]") else {
        panic!("bones[1] not uploaded");
    };
    assert!(m.w_axis.truncate().abs_diff_eq(Vec3::X, 1e-5));

    s.get_mut::<AnimationRecord>(anim).unwrap().set_bind_pose();
    let (record, set) = s.animation(anim).unwrap();
    record.bind_bones(set, ShaderId(1), &mut backend);
    assert_eq!(
        backend.uniform(ShaderId(1), "bones[0]"),
        Some(Uniform::Mat4(Mat4::IDENTITY))
    );
}

#[test]
fn uber_material_uploads_uniforms_and_textures() {
    let mut s = store();
    let mut m = UberMaterialRecord::new(ShaderId(2)).with_diffuse(Vec4::new(1.0, 0.0, 0.0, 1.0));
    m.set_texture(TextureSlot::Diffuse, TextureId(5));
    let h = s.insert(ComponentKind::MaterialUber, "red", m);

    let mut backend = RecordingBackend::new();
    s.upload_material(h, &mut backend);
    assert_eq!(
        backend.uniform(ShaderId(2), "material.diffuseColor"),
        Some(Uniform::Vec4(Vec4::new(1.0, 0.0, 0.0, 1.0)))
    );
    assert_eq!(
        backend.uniform(ShaderId(2), "material.hasDiffuseTexture"),
        Some(Uniform::Bool(true))
    );
    assert!(backend.commands.contains(&Command::BindTexture {
        texture: TextureId(5),
        unit: TextureSlot::Diffuse.unit(),
    }));
    assert!(!s.is_transparent(h));
}

#[test]
fn free_collection_releases_owned_resources() {
    let mut s = store();
    let mut m = UberMaterialRecord::new(ShaderId(1));
    m.set_texture(TextureSlot::Normal, TextureId(9));
    s.insert(ComponentKind::MaterialUber, "m", m);
    s.insert(ComponentKind::Geometry, "g", GeometryRecord::new(GeometryId(4)));
    s.insert_animation("a", two_bone_set());

    let mut backend = RecordingBackend::new();
    s.free_collection(&mut backend);

    assert!(s.is_empty());
    assert!(backend.commands.contains(&Command::ReleaseTexture(TextureId(9))));
    assert!(backend.commands.contains(&Command::ReleaseGeometry(GeometryId(4))));
    assert!(s.animation_set(0).is_none());
}
