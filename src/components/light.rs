use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use super::{ComponentKind, ComponentRecord, RecordHeader};
use crate::render::{ShaderFacility, ShaderId, Uniform};

/// Spot, directional or point light. The kind is the record's component
/// kind; the record layout is shared.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct LightRecord {
    pub header: RecordHeader,
    pub color: [f32; 3],
    pub intensity: f32,
    pub range: f32,
    /// Cone half-angles in radians (spot only)
    pub inner_cutoff: f32,
    pub outer_cutoff: f32,
    pub enabled: u32,
}

impl ComponentRecord for LightRecord {
    const KINDS: &'static [ComponentKind] = &[
        ComponentKind::LightSpot,
        ComponentKind::LightDirectional,
        ComponentKind::LightPoint,
    ];

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RecordHeader {
        &mut self.header
    }
}

/// Light-type code written to `lights[i].type`.
fn type_code(kind: ComponentKind) -> i32 {
    match kind {
        ComponentKind::LightSpot => 0,
        ComponentKind::LightDirectional => 1,
        _ => 2,
    }
}

impl LightRecord {
    #[must_use]
    pub fn new(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            header: RecordHeader::zeroed(),
            color: color.to_array(),
            intensity,
            range,
            inner_cutoff: 0.0,
            outer_cutoff: 0.0,
            enabled: 1,
        }
    }

    #[must_use]
    pub fn with_cone(mut self, inner: f32, outer: f32) -> Self {
        self.inner_cutoff = inner;
        self.outer_cutoff = outer;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled != 0
    }

    #[inline]
    #[must_use]
    pub fn color(&self) -> Vec3 {
        Vec3::from_array(self.color)
    }

    /// Pushes this light into uniform slot `index` of `shader`.
    ///
    /// Position and direction are given in view space: the light sits at
    /// the origin of `world` and shines down its local -Z axis.
    pub fn update_shader<S: ShaderFacility + ?Sized>(
        &self,
        index: usize,
        view: Mat4,
        world: Mat4,
        shader: ShaderId,
        shaders: &mut S,
    ) {
        let kind = self.header.kind().unwrap_or(ComponentKind::LightPoint);
        let view_model = view * world;
        let position = view_model * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let direction = (view_model * Vec4::new(0.0, 0.0, -1.0, 0.0)).truncate();

        let mut set = |field: &str, value: Uniform| {
            shaders.set_uniform(shader, &format!("lights[{index}].{field}"), value);
        };
        set("type", Uniform::Int(type_code(kind)));
        if kind != ComponentKind::LightDirectional {
            set("position", Uniform::Vec3(position.truncate()));
        }
        if kind != ComponentKind::LightPoint {
            set("direction", Uniform::Vec3(direction.normalize_or_zero()));
        }
        set("color", Uniform::Vec3(self.color()));
        set("intensity", Uniform::Float(self.intensity));
        set("range", Uniform::Float(self.range));
        if kind == ComponentKind::LightSpot {
            set("innerConeCos", Uniform::Float(self.inner_cutoff.cos()));
            set("outerConeCos", Uniform::Float(self.outer_cutoff.cos()));
        }
        set("enabled", Uniform::Bool(self.is_enabled()));
    }
}

/// Marks light slots `first..max` of `shader` as disabled.
pub fn update_shader_disabled<S: ShaderFacility + ?Sized>(
    first: usize,
    max: usize,
    shader: ShaderId,
    shaders: &mut S,
) {
    for index in first..max {
        shaders.set_uniform(
            shader,
            &format!("lights[{index}].enabled"),
            Uniform::Bool(false),
        );
    }
}

pub fn update_global_ambient<S: ShaderFacility + ?Sized>(
    ambient: Vec4,
    shader: ShaderId,
    shaders: &mut S,
) {
    shaders.set_uniform(shader, "ambientLight", Uniform::Vec4(ambient));
}
