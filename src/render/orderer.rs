//! Render Orderer
//!
//! Flattens the scene tree into a sorted draw stream once per frame.
//!
//! # Frame Phases
//!
//! 1. **Gather**: bounded-depth walk accumulating `world = parent_world * local`
//!    and classifying the main camera, the skybox, lights and shaders in use
//! 2. **Distances**: camera-space distance of every entry
//! 3. **Sort**: non-drawables last, then stage, shader, material, distance
//! 4. **Lights**: every shader receives the gathered lights and the ambient
//! 5. **Stream**: shader and material state changes only when they differ
//!
//! Buffers are kept between frames so a steady scene does not allocate.

use std::cmp::Ordering;

use glam::{Mat4, Vec3, Vec4};
use smallvec::SmallVec;

use super::{DepthFunc, GeometryId, RenderBackend, RenderStage, ShaderId, Uniform};
use crate::components::light::{update_global_ambient, update_shader_disabled};
use crate::components::{
    CameraRecord, ComponentHandle, ComponentKind, GeometryRecord, LightRecord,
    SkyboxMaterialRecord, Slot, TransformRecord,
};
use crate::core::BoundedStack;
use crate::errors::{Result, ThirtyError};
use crate::scene::{ObjectHandle, Scene};

/// One gathered object.
#[derive(Debug, Clone, Copy)]
pub struct DrawEntry {
    pub object: ObjectHandle,
    pub world: Mat4,
    /// Distance to the main camera
    pub distance: f32,
    pub geometry: Option<GeometryId>,
    pub material: Option<ComponentHandle>,
    pub shader: Option<ShaderId>,
    pub animation: Option<ComponentHandle>,
    pub stage: RenderStage,
}

impl DrawEntry {
    /// Entries need both a geometry and a material to be drawn.
    #[inline]
    #[must_use]
    pub fn is_drawable(&self) -> bool {
        self.geometry.is_some() && self.material.is_some()
    }

    fn position(&self) -> Vec3 {
        self.world.w_axis.truncate()
    }
}

/// Total order of the draw stream.
fn compare_entries(a: &DrawEntry, b: &DrawEntry) -> Ordering {
    b.is_drawable()
        .cmp(&a.is_drawable())
        .then(a.stage.cmp(&b.stage))
        .then(a.shader.cmp(&b.shader))
        .then(a.material.cmp(&b.material))
        .then_with(|| match a.stage {
            // back to front for blending
            RenderStage::Transparent => b.distance.total_cmp(&a.distance),
            _ => a.distance.total_cmp(&b.distance),
        })
}

#[derive(Debug, Clone, Copy)]
struct GatheredLight {
    handle: ComponentHandle,
    world: Mat4,
}

#[derive(Debug, Clone, Copy)]
struct MainCamera {
    handle: ComponentHandle,
    world: Mat4,
}

struct Frame {
    object: ObjectHandle,
    world: Mat4,
    /// Raw index into the object's child array
    next: usize,
}

/// Per-frame draw stream builder.
#[derive(Debug)]
pub struct RenderOrderer {
    max_depth: usize,
    max_lights: usize,
    entries: Vec<DrawEntry>,
    lights: Vec<GatheredLight>,
    shaders: SmallVec<[ShaderId; 8]>,
    camera: Option<MainCamera>,
    skybox: Option<ComponentHandle>,
}

impl Default for RenderOrderer {
    fn default() -> Self {
        Self::new(32, 8)
    }
}

impl RenderOrderer {
    #[must_use]
    pub fn new(max_depth: usize, max_lights: usize) -> Self {
        Self {
            max_depth,
            max_lights,
            entries: Vec::new(),
            lights: Vec::new(),
            shaders: SmallVec::new(),
            camera: None,
            skybox: None,
        }
    }

    /// Entries of the last prepared frame, in stream order.
    #[must_use]
    pub fn entries(&self) -> &[DrawEntry] {
        &self.entries
    }

    /// Distinct shaders referenced by the last prepared frame.
    #[must_use]
    pub fn shaders(&self) -> &[ShaderId] {
        &self.shaders
    }

    #[must_use]
    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    #[must_use]
    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.lights.clear();
        self.shaders.clear();
        self.camera = None;
        self.skybox = None;
    }

    // ========================================================================
    // Gather / sort
    // ========================================================================

    /// Gathers, measures and sorts the scene. Returns `false` if the scene
    /// has no main camera, in which case nothing can be drawn.
    pub fn prepare(&mut self, scene: &Scene) -> Result<bool> {
        self.clear();
        self.gather(scene)?;

        let Some(camera) = self.camera else {
            log::warn!("frame skipped: scene has no main camera");
            return Ok(false);
        };
        let eye = camera.world.w_axis.truncate();
        for entry in &mut self.entries {
            entry.distance = entry.position().distance(eye);
        }
        self.entries.sort_unstable_by(compare_entries);
        Ok(true)
    }

    fn gather(&mut self, scene: &Scene) -> Result<()> {
        // root frame plus one per level; max_depth brackets nest max_depth + 1 levels
        let mut stack: BoundedStack<Frame> = BoundedStack::new(self.max_depth + 2);
        let _ = stack.push(Frame {
            object: ObjectHandle::ROOT,
            world: self.visit(scene, ObjectHandle::ROOT, Mat4::IDENTITY),
            next: 0,
        });

        while let Some(frame) = stack.pop() {
            let Some(parent) = scene.object(frame.object) else {
                continue;
            };
            // next live child at or after `frame.next`
            let mut index = frame.next;
            while index < parent.children.len() && !parent.children.is_live(index) {
                index += 1;
            }
            let Some(&child) = parent.children.get(index) else {
                continue;
            };
            let parent_world = frame.world;
            let _ = stack.push(Frame {
                next: index + 1,
                ..frame
            });
            let world = self.visit(scene, child, parent_world);
            if stack
                .push(Frame {
                    object: child,
                    world,
                    next: 0,
                })
                .is_err()
            {
                return Err(ThirtyError::TreeTooDeep(self.max_depth));
            }
        }
        Ok(())
    }

    /// Records one object and returns its world matrix.
    fn visit(&mut self, scene: &Scene, handle: ObjectHandle, parent_world: Mat4) -> Mat4 {
        let store = scene.components();
        let Some(object) = scene.object(handle) else {
            return parent_world;
        };
        let slots = &object.slots;
        let local = store
            .get_slot::<TransformRecord>(slots, Slot::Transform)
            .map_or(Mat4::IDENTITY, TransformRecord::model);
        let world = parent_world * local;

        if self.camera.is_none()
            && let Some(camera) = slots.get(Slot::Camera)
            && store.get::<CameraRecord>(camera).is_some_and(CameraRecord::is_main)
        {
            self.camera = Some(MainCamera {
                handle: camera,
                world,
            });
        }
        if let Some(light) = slots.get(Slot::Light) {
            self.lights.push(GatheredLight {
                handle: light,
                world,
            });
        }

        let material = slots.get(Slot::Material);
        let shader = material.and_then(|m| store.material_shader(m));
        if let Some(shader) = shader
            && !self.shaders.contains(&shader)
        {
            self.shaders.push(shader);
        }
        let stage = match material {
            Some(m) if store.kind_of(m) == Some(ComponentKind::MaterialSkybox) => {
                self.skybox = Some(m);
                RenderStage::Skybox
            }
            Some(m) if store.is_transparent(m) => RenderStage::Transparent,
            _ => RenderStage::Opaque,
        };

        if !handle.is_root() {
            self.entries.push(DrawEntry {
                object: handle,
                world,
                distance: 0.0,
                geometry: store
                    .get_slot::<GeometryRecord>(slots, Slot::Geometry)
                    .map(GeometryRecord::mesh),
                material,
                shader,
                animation: slots.get(Slot::Animation),
                stage,
            });
        }
        world
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Prepares the frame and streams it into `backend`.
    pub fn draw(&mut self, scene: &Scene, backend: &mut dyn RenderBackend) -> Result<()> {
        if !self.prepare(scene)? {
            return Ok(());
        }
        self.update_lights(scene, backend);
        self.prebind_skybox(scene, backend);
        self.stream(scene, backend);
        Ok(())
    }

    fn update_lights(&self, scene: &Scene, backend: &mut dyn RenderBackend) {
        let Some(camera) = self.camera else { return };
        let store = scene.components();
        let view = CameraRecord::view(camera.world);
        let count = self.lights.len().min(self.max_lights);
        if self.lights.len() > self.max_lights {
            log::debug!(
                "{} lights gathered, only {} uploaded",
                self.lights.len(),
                self.max_lights
            );
        }

        for &shader in &self.shaders {
            for (i, light) in self.lights.iter().take(count).enumerate() {
                if let Some(record) = store.get::<LightRecord>(light.handle) {
                    record.update_shader(i, view, light.world, shader, backend);
                }
            }
            update_shader_disabled(count, self.max_lights, shader, backend);
            update_global_ambient(scene.ambient_light(), shader, backend);
        }
    }

    fn prebind_skybox(&self, scene: &Scene, backend: &mut dyn RenderBackend) {
        if let Some(material) = self
            .skybox
            .and_then(|h| scene.components().get::<SkyboxMaterialRecord>(h))
        {
            material.bind_textures(backend);
        }
    }

    fn stream(&self, scene: &Scene, backend: &mut dyn RenderBackend) {
        let Some(camera) = self.camera else { return };
        let store = scene.components();
        let view = CameraRecord::view(camera.world);
        let projection = store
            .get::<CameraRecord>(camera.handle)
            .map_or(Mat4::IDENTITY, CameraRecord::projection);

        let mut stage = RenderStage::Opaque;
        let mut current_shader: Option<ShaderId> = None;
        let mut current_material: Option<ComponentHandle> = None;
        let mut blending = false;

        for entry in &self.entries {
            let (Some(geometry), Some(material), Some(shader)) =
                (entry.geometry, entry.material, entry.shader)
            else {
                break;
            };

            debug_assert!(
                entry.stage >= stage,
                "render stage went backward: {} after {}",
                entry.stage.name(),
                stage.name()
            );
            if entry.stage != stage {
                log::trace!("stage {} -> {}", stage.name(), entry.stage.name());
                stage = entry.stage;
            }
            if stage == RenderStage::Transparent && !blending {
                backend.set_blending(true);
                blending = true;
            }

            let (model, view) = if stage == RenderStage::Skybox {
                backend.set_depth_func(DepthFunc::LessEqual);
                (strip_translation(entry.world), strip_translation(view))
            } else {
                (entry.world, view)
            };

            if current_shader != Some(shader) {
                backend.use_shader(shader);
                backend.set_uniform(shader, "projection", Uniform::Mat4(projection));
                current_shader = Some(shader);
                current_material = None;
            }
            if current_material != Some(material) {
                store.upload_material(material, backend);
                current_material = Some(material);
            }
            backend.set_uniform(shader, "view", Uniform::Mat4(view));
            backend.set_uniform(shader, "model", Uniform::Mat4(model));

            if let Some((record, set)) = entry.animation.and_then(|h| store.animation(h)) {
                record.bind_bones(set, shader, backend);
            }
            backend.draw(geometry);
        }

        if blending {
            backend.set_blending(false);
        }
        if stage == RenderStage::Skybox {
            backend.set_depth_func(DepthFunc::Less);
        }
    }
}

fn strip_translation(mut m: Mat4) -> Mat4 {
    m.w_axis = Vec4::new(0.0, 0.0, 0.0, m.w_axis.w);
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(drawable: bool, stage: RenderStage, shader: u32, material: u32, distance: f32) -> DrawEntry {
        DrawEntry {
            object: ObjectHandle(1),
            world: Mat4::IDENTITY,
            distance,
            geometry: drawable.then_some(GeometryId(1)),
            material: drawable.then_some(ComponentHandle(material)),
            shader: drawable.then_some(ShaderId(shader)),
            animation: None,
            stage,
        }
    }

    #[test]
    fn test_compare_orders_stages_and_distance() {
        let mut list = vec![
            entry(false, RenderStage::Opaque, 0, 0, 0.0),
            entry(true, RenderStage::Skybox, 1, 9, 0.0),
            entry(true, RenderStage::Transparent, 1, 3, 1.0),
            entry(true, RenderStage::Transparent, 1, 3, 7.0),
            entry(true, RenderStage::Opaque, 1, 2, 5.0),
            entry(true, RenderStage::Opaque, 1, 2, 2.0),
        ];
        list.sort_unstable_by(compare_entries);
        let got: Vec<(bool, RenderStage, f32)> = list
            .iter()
            .map(|e| (e.is_drawable(), e.stage, e.distance))
            .collect();
        assert_eq!(
            got,
            vec![
                (true, RenderStage::Opaque, 2.0),
                (true, RenderStage::Opaque, 5.0),
                (true, RenderStage::Transparent, 7.0),
                (true, RenderStage::Transparent, 1.0),
                (true, RenderStage::Skybox, 0.0),
                (false, RenderStage::Opaque, 0.0),
            ]
        );
    }

    #[test]
    fn test_compare_groups_by_shader_before_distance() {
        let mut list = vec![
            entry(true, RenderStage::Opaque, 2, 1, 1.0),
            entry(true, RenderStage::Opaque, 1, 5, 9.0),
        ];
        list.sort_unstable_by(compare_entries);
        assert_eq!(list[0].shader, Some(ShaderId(1)));
    }

    #[test]
    fn test_strip_translation() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(strip_translation(m), Mat4::IDENTITY);
    }
}
