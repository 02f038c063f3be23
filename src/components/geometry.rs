use bytemuck::{Pod, Zeroable};

use super::{ComponentKind, ComponentRecord, RecordHeader};
use crate::render::GeometryId;

/// Drawable mesh reference. The mesh itself belongs to the geometry
/// facility; the record only keeps its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct GeometryRecord {
    pub header: RecordHeader,
    pub mesh: u32,
}

impl ComponentRecord for GeometryRecord {
    const KINDS: &'static [ComponentKind] = &[ComponentKind::Geometry];

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RecordHeader {
        &mut self.header
    }
}

impl GeometryRecord {
    #[must_use]
    pub fn new(mesh: GeometryId) -> Self {
        Self {
            header: RecordHeader::zeroed(),
            mesh: mesh.0,
        }
    }

    #[inline]
    #[must_use]
    pub fn mesh(&self) -> GeometryId {
        GeometryId(self.mesh)
    }
}
