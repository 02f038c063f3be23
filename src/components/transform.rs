use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use super::{ComponentKind, ComponentRecord, RecordHeader, mat4_from_raw, mat4_to_raw};

/// Transform 组件
///
/// Holds an object's local model matrix. Helpers post-multiply, so a
/// translation applied after a rotation moves along the rotated axes.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct TransformRecord {
    pub header: RecordHeader,
    /// Column-major local matrix
    pub model: [f32; 16],
}

impl ComponentRecord for TransformRecord {
    const KINDS: &'static [ComponentKind] = &[ComponentKind::Transform];

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RecordHeader {
        &mut self.header
    }
}

impl TransformRecord {
    #[must_use]
    pub fn new(model: Mat4) -> Self {
        Self {
            header: RecordHeader::zeroed(),
            model: mat4_to_raw(model),
        }
    }

    #[must_use]
    pub fn identity() -> Self {
        Self::new(Mat4::IDENTITY)
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> Mat4 {
        mat4_from_raw(&self.model)
    }

    #[inline]
    pub fn set_model(&mut self, model: Mat4) {
        self.model = mat4_to_raw(model);
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    pub fn translate(&mut self, offset: Vec3) {
        self.set_model(self.model() * Mat4::from_translation(offset));
    }

    /// Rotates by `angle` radians around `axis` (normalized internally).
    pub fn rotate(&mut self, angle: f32, axis: Vec3) {
        self.set_model(self.model() * Mat4::from_axis_angle(axis.normalize(), angle));
    }

    pub fn scale(&mut self, factors: Vec3) {
        self.set_model(self.model() * Mat4::from_scale(factors));
    }

    /// Replaces the translation column, keeping rotation and scale.
    pub fn set_translation(&mut self, position: Vec3) {
        let mut m = self.model();
        m.w_axis = position.extend(1.0);
        self.set_model(m);
    }

    #[must_use]
    pub fn translation(&self) -> Vec3 {
        self.model().w_axis.truncate()
    }
}
