//! Components
//!
//! Per-object data lives as kind-tagged plain-data records inside the
//! [`ComponentStore`]'s byte arena:
//! - [`TransformRecord`]: local model matrix
//! - [`CameraRecord`]: perspective camera, optionally the main one
//! - [`GeometryRecord`]: opaque mesh handle drawn by the geometry facility
//! - [`UberMaterialRecord`] / [`SkyboxMaterialRecord`]: surface parameters
//! - [`LightRecord`]: spot, directional or point light
//! - [`AnimationRecord`]: skeletal animation playback state
//!
//! Every record starts with a [`RecordHeader`]. The set of kinds is closed;
//! per-kind behaviour goes through the dispatch table in [`store`].

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

pub mod animation;
pub mod camera;
pub mod geometry;
pub mod light;
pub mod material;
pub mod slots;
pub mod store;
pub mod transform;

pub use animation::{Animation, AnimationRecord, AnimationSet, Bone, Keyframe, Skeleton};
pub use camera::CameraRecord;
pub use geometry::GeometryRecord;
pub use light::LightRecord;
pub use material::{MaterialBase, SkyboxMaterialRecord, TextureSlot, UberMaterialRecord};
pub use slots::SlotTable;
pub use store::{ComponentStore, KindInfo};
pub use transform::TransformRecord;

/// Raw owner value of a component no object has claimed yet.
pub const NO_OWNER: u32 = u32::MAX;

/// Handle of a component record: its position in the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentHandle(pub u32);

impl ComponentHandle {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ComponentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// The closed set of component kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ComponentKind {
    Transform = 0,
    Camera = 1,
    Geometry = 2,
    MaterialUber = 3,
    MaterialSkybox = 4,
    LightSpot = 5,
    LightDirectional = 6,
    LightPoint = 7,
    AnimationCollection = 8,
}

impl ComponentKind {
    pub const COUNT: usize = 9;

    pub const ALL: [ComponentKind; Self::COUNT] = [
        ComponentKind::Transform,
        ComponentKind::Camera,
        ComponentKind::Geometry,
        ComponentKind::MaterialUber,
        ComponentKind::MaterialSkybox,
        ComponentKind::LightSpot,
        ComponentKind::LightDirectional,
        ComponentKind::LightPoint,
        ComponentKind::AnimationCollection,
    ];

    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Static properties of this kind.
    #[inline]
    #[must_use]
    pub fn info(self) -> &'static KindInfo {
        &store::KIND_TABLE[self as usize]
    }

    /// Slot category this kind occupies on an object.
    #[inline]
    #[must_use]
    pub fn slot(self) -> Slot {
        self.info().slot
    }

    #[inline]
    #[must_use]
    pub fn is_material(self) -> bool {
        self.slot() == Slot::Material
    }

    #[inline]
    #[must_use]
    pub fn is_light(self) -> bool {
        self.slot() == Slot::Light
    }
}

/// Slot categories of a [`SlotTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Transform = 0,
    Camera = 1,
    Geometry = 2,
    Material = 3,
    Light = 4,
    Animation = 5,
}

impl Slot {
    pub const COUNT: usize = 6;

    pub const ALL: [Slot; Self::COUNT] = [
        Slot::Transform,
        Slot::Camera,
        Slot::Geometry,
        Slot::Material,
        Slot::Light,
        Slot::Animation,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Slot::Transform => "transform",
            Slot::Camera => "camera",
            Slot::Geometry => "geometry",
            Slot::Material => "material",
            Slot::Light => "light",
            Slot::Animation => "animationCollection",
        }
    }
}

bitflags! {
    /// Kind restriction for name lookups.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct KindFilter: u32 {
        const TRANSFORM         = 1 << 0;
        const CAMERA            = 1 << 1;
        const GEOMETRY          = 1 << 2;
        const MATERIAL_UBER     = 1 << 3;
        const MATERIAL_SKYBOX   = 1 << 4;
        const LIGHT_SPOT        = 1 << 5;
        const LIGHT_DIRECTIONAL = 1 << 6;
        const LIGHT_POINT       = 1 << 7;
        const ANIMATION         = 1 << 8;

        const MATERIAL = Self::MATERIAL_UBER.bits() | Self::MATERIAL_SKYBOX.bits();
        const LIGHT = Self::LIGHT_SPOT.bits() | Self::LIGHT_DIRECTIONAL.bits() | Self::LIGHT_POINT.bits();
    }
}

impl KindFilter {
    #[inline]
    #[must_use]
    pub fn of(kind: ComponentKind) -> Self {
        Self::from_bits_truncate(1 << kind as u32)
    }

    #[inline]
    #[must_use]
    pub fn accepts(self, kind: ComponentKind) -> bool {
        self.contains(Self::of(kind))
    }
}

/// Common prefix of every component record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct RecordHeader {
    /// [`ComponentKind`] as `u32`
    pub kind: u32,
    /// The record's own handle
    pub handle: u32,
    /// Raw handle of the owning object, or [`NO_OWNER`]
    pub owner: u32,
    /// Interned display name
    pub name: u32,
}

impl RecordHeader {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<ComponentKind> {
        ComponentKind::from_raw(self.kind)
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> ComponentHandle {
        ComponentHandle(self.handle)
    }
}

/// A plain-data record type stored in the component arena.
///
/// `KINDS` lists the component kinds whose records can be viewed as `Self`;
/// views of a prefix (such as [`MaterialBase`]) accept several kinds.
pub trait ComponentRecord: Pod {
    const KINDS: &'static [ComponentKind];

    fn header(&self) -> &RecordHeader;

    fn header_mut(&mut self) -> &mut RecordHeader;
}

/// Column-major `[f32; 16]` as stored in records.
#[inline]
pub(crate) fn mat4_from_raw(raw: &[f32; 16]) -> glam::Mat4 {
    glam::Mat4::from_cols_array(raw)
}

#[inline]
pub(crate) fn mat4_to_raw(m: glam::Mat4) -> [f32; 16] {
    m.to_cols_array()
}
