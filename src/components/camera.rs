use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use super::{ComponentKind, ComponentRecord, RecordHeader};

/// Perspective camera. The scene renders through the first camera flagged
/// `main` that the frame walk meets.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct CameraRecord {
    pub header: RecordHeader,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Vertical field of view in radians
    pub fov: f32,
    pub main: u32,
}

impl ComponentRecord for CameraRecord {
    const KINDS: &'static [ComponentKind] = &[ComponentKind::Camera];

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RecordHeader {
        &mut self.header
    }
}

impl CameraRecord {
    #[must_use]
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32, main: bool) -> Self {
        Self {
            header: RecordHeader::zeroed(),
            aspect,
            near,
            far,
            fov,
            main: u32::from(main),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_main(&self) -> bool {
        self.main != 0
    }

    /// OpenGL-convention perspective projection.
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, self.aspect, self.near, self.far)
    }

    /// View matrix of a camera placed by `world`.
    #[must_use]
    pub fn view(world: Mat4) -> Mat4 {
        world.inverse()
    }
}
