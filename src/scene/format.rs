//! BOGLE Scene Format
//!
//! Little-endian binary scene description:
//!
//! ```text
//! magic "BOGLE" | version u8 | 6 × u32 counts | ambient 4 × f32
//! cameras | geometries | materials | lights | animation collections
//! objects | tree text terminated by a 0 byte
//! ```
//!
//! Strings are a `u32` byte length followed by UTF-8. Object records
//! reference components by 1-based index inside each kind's section, 0
//! meaning "none". Nothing may follow the tree sentinel.
//!
//! This module is a pure codec between bytes and plain descriptions; the
//! [loader](super::loader) turns descriptions into live components.

use glam::{Mat4, Quat, Vec3, Vec4};
use rustc_hash::FxHashMap;

use crate::components::{
    Animation, Bone, CameraRecord, ComponentKind, GeometryRecord, Keyframe, LightRecord,
    SkyboxMaterialRecord, Slot, TextureSlot, TransformRecord, UberMaterialRecord,
};
use crate::errors::{Result, ThirtyError};

use super::{ObjectHandle, Scene, tree};

pub const MAGIC: &[u8; 5] = b"BOGLE";
pub const VERSION: u8 = 0;

// ============================================================================
// Byte cursor
// ============================================================================

/// Bounds-checked little-endian reader.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[must_use]
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn take(&mut self, n: usize, context: &'static str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(ThirtyError::UnexpectedEof {
                context,
                offset: self.pos,
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N, context)?);
        Ok(out)
    }

    pub fn u8(&mut self, context: &'static str) -> Result<u8> {
        Ok(self.take(1, context)?[0])
    }

    pub fn u32(&mut self, context: &'static str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array(context)?))
    }

    pub fn f32(&mut self, context: &'static str) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array(context)?))
    }

    pub fn bool(&mut self, context: &'static str) -> Result<bool> {
        Ok(self.u8(context)? != 0)
    }

    fn floats<const N: usize>(&mut self, context: &'static str) -> Result<[f32; N]> {
        let mut out = [0.0; N];
        for v in &mut out {
            *v = self.f32(context)?;
        }
        Ok(out)
    }

    pub fn vec3(&mut self, context: &'static str) -> Result<Vec3> {
        Ok(Vec3::from_array(self.floats(context)?))
    }

    pub fn vec4(&mut self, context: &'static str) -> Result<Vec4> {
        Ok(Vec4::from_array(self.floats(context)?))
    }

    /// Quaternion stored as `x y z w`.
    pub fn quat(&mut self, context: &'static str) -> Result<Quat> {
        Ok(Quat::from_array(self.floats(context)?))
    }

    /// Column-major 4×4 matrix.
    pub fn mat4(&mut self, context: &'static str) -> Result<Mat4> {
        Ok(Mat4::from_cols_array(&self.floats(context)?))
    }

    pub fn string(&mut self, context: &'static str) -> Result<String> {
        let len = self.u32(context)? as usize;
        let bytes = self.take(len, context)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ThirtyError::InvalidString(context))
    }
}

/// Little-endian writer mirroring [`ByteReader`].
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    pub fn f32(&mut self, v: f32) {
        self.bytes(&v.to_le_bytes());
    }

    pub fn bool(&mut self, v: bool) {
        self.u8(u8::from(v));
    }

    pub fn floats(&mut self, v: &[f32]) {
        for f in v {
            self.f32(*f);
        }
    }

    pub fn string(&mut self, s: &str) {
        self.u32(s.len() as u32);
        self.bytes(s.as_bytes());
    }
}

// ============================================================================
// Descriptions
// ============================================================================

/// Header: component counts and the global ambient light.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Header {
    pub cameras: u32,
    pub geometries: u32,
    pub materials: u32,
    pub lights: u32,
    pub animations: u32,
    pub objects: u32,
    pub ambient: Vec4,
}

impl Header {
    /// Number of components of the section feeding `slot`.
    #[must_use]
    pub fn count_for(&self, slot: Slot) -> u32 {
        match slot {
            Slot::Transform => self.objects,
            Slot::Camera => self.cameras,
            Slot::Geometry => self.geometries,
            Slot::Material => self.materials,
            Slot::Light => self.lights,
            Slot::Animation => self.animations,
        }
    }

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let magic: [u8; 5] = r.array("magic")?;
        if &magic != MAGIC {
            return Err(ThirtyError::BadMagic(magic));
        }
        let version = r.u8("version")?;
        if version != VERSION {
            return Err(ThirtyError::UnsupportedVersion(version));
        }
        Ok(Self {
            cameras: r.u32("header")?,
            geometries: r.u32("header")?,
            materials: r.u32("header")?,
            lights: r.u32("header")?,
            animations: r.u32("header")?,
            objects: r.u32("header")?,
            ambient: r.vec4("ambient light")?,
        })
    }

    pub fn write(&self, w: &mut ByteWriter) {
        w.bytes(MAGIC);
        w.u8(VERSION);
        for count in [
            self.cameras,
            self.geometries,
            self.materials,
            self.lights,
            self.animations,
            self.objects,
        ] {
            w.u32(count);
        }
        w.floats(&self.ambient.to_array());
    }
}

fn expect_subtype(r: &mut ByteReader<'_>, section: &'static str) -> Result<()> {
    match r.u8(section)? {
        0 => Ok(()),
        subtype => Err(ThirtyError::UnknownKind { section, subtype }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraDesc {
    pub name: String,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub fov: f32,
    pub main: bool,
}

impl CameraDesc {
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        expect_subtype(r, "camera")?;
        Ok(Self {
            name: r.string("camera name")?,
            aspect: r.f32("camera")?,
            near: r.f32("camera")?,
            far: r.f32("camera")?,
            fov: r.f32("camera")?,
            main: r.bool("camera")?,
        })
    }

    pub fn write(&self, w: &mut ByteWriter) {
        w.u8(0);
        w.string(&self.name);
        w.floats(&[self.aspect, self.near, self.far, self.fov]);
        w.bool(self.main);
    }

    #[must_use]
    pub fn record(&self) -> CameraRecord {
        CameraRecord::new(self.fov, self.aspect, self.near, self.far, self.main)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryDesc {
    pub name: String,
    pub mesh: u32,
}

impl GeometryDesc {
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        expect_subtype(r, "geometry")?;
        Ok(Self {
            name: r.string("geometry name")?,
            mesh: r.u32("geometry")?,
        })
    }

    pub fn write(&self, w: &mut ByteWriter) {
        w.u8(0);
        w.string(&self.name);
        w.u32(self.mesh);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UberDesc {
    pub name: String,
    pub shader: u32,
    pub ambient: Vec4,
    pub emissive: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub opacity: f32,
    pub specular_power: f32,
    pub reflectance: f32,
    pub refraction: f32,
    pub index_of_refraction: f32,
    pub bump_intensity: f32,
    pub specular_scale: f32,
    pub alpha_threshold: f32,
    pub alpha_blending: bool,
    /// Texture paths per [`TextureSlot`], empty for none
    pub textures: [String; TextureSlot::COUNT],
}

impl UberDesc {
    /// Record with every parameter set and no textures loaded yet.
    #[must_use]
    pub fn record(&self) -> UberMaterialRecord {
        let mut m = UberMaterialRecord::new(crate::render::ShaderId(self.shader));
        m.ambient_color = self.ambient.to_array();
        m.emissive_color = self.emissive.to_array();
        m.diffuse_color = self.diffuse.to_array();
        m.specular_color = self.specular.to_array();
        m.opacity = self.opacity;
        m.specular_power = self.specular_power;
        m.reflectance = self.reflectance;
        m.refraction = self.refraction;
        m.index_of_refraction = self.index_of_refraction;
        m.bump_intensity = self.bump_intensity;
        m.specular_scale = self.specular_scale;
        m.alpha_threshold = self.alpha_threshold;
        m.alpha_blending = u32::from(self.alpha_blending);
        m
    }

    fn from_record(name: String, m: &UberMaterialRecord) -> Self {
        Self {
            name,
            shader: m.base.shader,
            ambient: Vec4::from_array(m.ambient_color),
            emissive: Vec4::from_array(m.emissive_color),
            diffuse: Vec4::from_array(m.diffuse_color),
            specular: Vec4::from_array(m.specular_color),
            opacity: m.opacity,
            specular_power: m.specular_power,
            reflectance: m.reflectance,
            refraction: m.refraction,
            index_of_refraction: m.index_of_refraction,
            bump_intensity: m.bump_intensity,
            specular_scale: m.specular_scale,
            alpha_threshold: m.alpha_threshold,
            alpha_blending: m.is_transparent(),
            textures: Default::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterialDesc {
    Uber(UberDesc),
    Skybox {
        name: String,
        shader: u32,
        cubemap: String,
    },
}

impl MaterialDesc {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            MaterialDesc::Uber(u) => &u.name,
            MaterialDesc::Skybox { name, .. } => name,
        }
    }

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let subtype = r.u8("material")?;
        let name = r.string("material name")?;
        let shader = r.u32("material")?;
        match subtype {
            0 => {
                let ambient = r.vec4("material")?;
                let emissive = r.vec4("material")?;
                let diffuse = r.vec4("material")?;
                let specular = r.vec4("material")?;
                let [
                    opacity,
                    specular_power,
                    reflectance,
                    refraction,
                    index_of_refraction,
                    bump_intensity,
                    specular_scale,
                    alpha_threshold,
                ] = r.floats::<8>("material")?;
                let alpha_blending = r.bool("material")?;
                let mut textures: [String; TextureSlot::COUNT] = Default::default();
                for t in &mut textures {
                    *t = r.string("texture path")?;
                }
                Ok(MaterialDesc::Uber(UberDesc {
                    name,
                    shader,
                    ambient,
                    emissive,
                    diffuse,
                    specular,
                    opacity,
                    specular_power,
                    reflectance,
                    refraction,
                    index_of_refraction,
                    bump_intensity,
                    specular_scale,
                    alpha_threshold,
                    alpha_blending,
                    textures,
                }))
            }
            1 => Ok(MaterialDesc::Skybox {
                name,
                shader,
                cubemap: r.string("cubemap path")?,
            }),
            subtype => Err(ThirtyError::UnknownKind {
                section: "material",
                subtype,
            }),
        }
    }

    pub fn write(&self, w: &mut ByteWriter) {
        match self {
            MaterialDesc::Uber(u) => {
                w.u8(0);
                w.string(&u.name);
                w.u32(u.shader);
                for c in [u.ambient, u.emissive, u.diffuse, u.specular] {
                    w.floats(&c.to_array());
                }
                w.floats(&[
                    u.opacity,
                    u.specular_power,
                    u.reflectance,
                    u.refraction,
                    u.index_of_refraction,
                    u.bump_intensity,
                    u.specular_scale,
                    u.alpha_threshold,
                ]);
                w.bool(u.alpha_blending);
                for t in &u.textures {
                    w.string(t);
                }
            }
            MaterialDesc::Skybox {
                name,
                shader,
                cubemap,
            } => {
                w.u8(1);
                w.string(name);
                w.u32(*shader);
                w.string(cubemap);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightDesc {
    pub kind: ComponentKind,
    pub name: String,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub inner_cutoff: f32,
    pub outer_cutoff: f32,
    pub enabled: bool,
}

impl LightDesc {
    fn kind_from_subtype(subtype: u8) -> Result<ComponentKind> {
        match subtype {
            0 => Ok(ComponentKind::LightSpot),
            1 => Ok(ComponentKind::LightDirectional),
            2 => Ok(ComponentKind::LightPoint),
            subtype => Err(ThirtyError::UnknownKind {
                section: "light",
                subtype,
            }),
        }
    }

    fn subtype(kind: ComponentKind) -> u8 {
        match kind {
            ComponentKind::LightSpot => 0,
            ComponentKind::LightDirectional => 1,
            _ => 2,
        }
    }

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let kind = Self::kind_from_subtype(r.u8("light")?)?;
        Ok(Self {
            kind,
            name: r.string("light name")?,
            color: r.vec3("light")?,
            intensity: r.f32("light")?,
            range: r.f32("light")?,
            inner_cutoff: r.f32("light")?,
            outer_cutoff: r.f32("light")?,
            enabled: r.bool("light")?,
        })
    }

    pub fn write(&self, w: &mut ByteWriter) {
        w.u8(Self::subtype(self.kind));
        w.string(&self.name);
        w.floats(&self.color.to_array());
        w.floats(&[self.intensity, self.range, self.inner_cutoff, self.outer_cutoff]);
        w.bool(self.enabled);
    }

    #[must_use]
    pub fn record(&self) -> LightRecord {
        let mut light = LightRecord::new(self.color, self.intensity, self.range)
            .with_cone(self.inner_cutoff, self.outer_cutoff);
        light.enabled = u32::from(self.enabled);
        light
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationDesc {
    pub name: String,
    pub model: Mat4,
    pub bones: Vec<Bone>,
    pub animations: Vec<Animation>,
}

impl AnimationDesc {
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        expect_subtype(r, "animation collection")?;
        let name = r.string("animation collection name")?;
        let count = r.u32("animation collection")?;

        let model = r.mat4("skeleton")?;
        let nbones = r.u32("skeleton")? as usize;
        let mut bones = Vec::with_capacity(nbones.min(r.remaining().len()));
        for _ in 0..nbones {
            bones.push(Bone {
                position: r.vec3("bone")?,
                rotation: r.quat("bone")?,
                parent: r.u32("bone")?,
            });
        }

        let mut animations = Vec::new();
        for _ in 0..count {
            let name = r.string("animation name")?;
            let nkeyframes = r.u32("animation")?;
            let mut keyframes = Vec::new();
            for _ in 0..nkeyframes {
                let timestamp = r.f32("keyframe")?;
                let root_offset = r.vec3("keyframe")?;
                let rotations = (0..nbones)
                    .map(|_| r.quat("keyframe"))
                    .collect::<Result<Vec<_>>>()?;
                keyframes.push(Keyframe {
                    timestamp,
                    root_offset,
                    rotations,
                });
            }
            animations.push(Animation { name, keyframes });
        }
        Ok(Self {
            name,
            model,
            bones,
            animations,
        })
    }

    pub fn write(&self, w: &mut ByteWriter) {
        w.u8(0);
        w.string(&self.name);
        w.u32(self.animations.len() as u32);
        w.floats(&self.model.to_cols_array());
        w.u32(self.bones.len() as u32);
        for bone in &self.bones {
            w.floats(&bone.position.to_array());
            w.floats(&bone.rotation.to_array());
            w.u32(bone.parent);
        }
        for anim in &self.animations {
            w.string(&anim.name);
            w.u32(anim.keyframes.len() as u32);
            for k in &anim.keyframes {
                w.f32(k.timestamp);
                w.floats(&k.root_offset.to_array());
                for q in &k.rotations {
                    w.floats(&q.to_array());
                }
            }
        }
    }
}

/// Slot categories an object record references, in file order.
pub const OBJECT_SLOTS: [Slot; 5] = [
    Slot::Camera,
    Slot::Geometry,
    Slot::Material,
    Slot::Light,
    Slot::Animation,
];

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDesc {
    pub name: String,
    /// 1-based section indices per [`OBJECT_SLOTS`], 0 for none
    pub slots: [u32; 5],
    pub model: Mat4,
}

impl ObjectDesc {
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let name = r.string("object name")?;
        let mut slots = [0; 5];
        for s in &mut slots {
            *s = r.u32("object")?;
        }
        Ok(Self {
            name,
            slots,
            model: r.mat4("object model")?,
        })
    }

    pub fn write(&self, w: &mut ByteWriter) {
        w.string(&self.name);
        for s in self.slots {
            w.u32(s);
        }
        w.floats(&self.model.to_cols_array());
    }

    /// Rejects slot indices past the end of their section.
    pub fn validate(&self, object: usize, header: &Header) -> Result<()> {
        for (slot, &index) in OBJECT_SLOTS.iter().zip(&self.slots) {
            let available = header.count_for(*slot);
            if index > available {
                return Err(ThirtyError::DanglingSlot {
                    object,
                    slot: slot.name(),
                    index,
                    available,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Whole file
// ============================================================================

/// A complete decoded scene file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneFile {
    pub ambient: Vec4,
    pub cameras: Vec<CameraDesc>,
    pub geometries: Vec<GeometryDesc>,
    pub materials: Vec<MaterialDesc>,
    pub lights: Vec<LightDesc>,
    pub animations: Vec<AnimationDesc>,
    pub objects: Vec<ObjectDesc>,
    /// Tree text, sentinel included
    pub tree: Vec<u8>,
}

impl SceneFile {
    #[must_use]
    pub fn header(&self) -> Header {
        Header {
            cameras: self.cameras.len() as u32,
            geometries: self.geometries.len() as u32,
            materials: self.materials.len() as u32,
            lights: self.lights.len() as u32,
            animations: self.animations.len() as u32,
            objects: self.objects.len() as u32,
            ambient: self.ambient,
        }
    }

    pub fn decode(bytes: &[u8], max_depth: usize) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        let header = Header::read(&mut r)?;

        fn section<T>(
            r: &mut ByteReader<'_>,
            count: u32,
            read: fn(&mut ByteReader<'_>) -> Result<T>,
        ) -> Result<Vec<T>> {
            (0..count).map(|_| read(r)).collect()
        }

        let mut file = SceneFile {
            ambient: header.ambient,
            cameras: section(&mut r, header.cameras, CameraDesc::read)?,
            geometries: section(&mut r, header.geometries, GeometryDesc::read)?,
            materials: section(&mut r, header.materials, MaterialDesc::read)?,
            lights: section(&mut r, header.lights, LightDesc::read)?,
            animations: section(&mut r, header.animations, AnimationDesc::read)?,
            objects: section(&mut r, header.objects, ObjectDesc::read)?,
            tree: Vec::new(),
        };
        for (i, object) in file.objects.iter().enumerate() {
            object.validate(i, &header)?;
        }

        let start = r.position();
        let used = tree::parse(r.remaining(), file.objects.len(), max_depth, |_, _| {})?;
        file.tree = bytes[start..start + used].to_vec();
        let trailing = bytes.len() - (start + used);
        if trailing > 0 {
            return Err(ThirtyError::TrailingData(trailing));
        }
        Ok(file)
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        self.header().write(&mut w);
        self.cameras.iter().for_each(|c| c.write(&mut w));
        self.geometries.iter().for_each(|g| g.write(&mut w));
        self.materials.iter().for_each(|m| m.write(&mut w));
        self.lights.iter().for_each(|l| l.write(&mut w));
        self.animations.iter().for_each(|a| a.write(&mut w));
        self.objects.iter().for_each(|o| o.write(&mut w));
        w.bytes(&self.tree);
        if self.tree.last() != Some(&tree::SENTINEL) {
            w.u8(tree::SENTINEL);
        }
        w.into_inner()
    }

    /// Snapshots a scene into a file description.
    ///
    /// Components are written in creation order within their sections and
    /// objects in array order. Texture ids cannot be mapped back to paths,
    /// so texture paths are left empty.
    pub fn capture(scene: &Scene, max_depth: usize) -> Result<Self> {
        let store = scene.components();
        let mut file = SceneFile {
            ambient: scene.ambient_light(),
            ..Default::default()
        };
        // component handle -> 1-based index inside its section
        let mut section_index = vec![0u32; store.len()];

        for handle in store.handles() {
            let Some(kind) = store.kind_of(handle) else {
                continue;
            };
            let name = store.name_of(handle).unwrap_or_default().to_owned();
            let index = match kind {
                ComponentKind::Transform => continue,
                ComponentKind::Camera => {
                    let Some(c) = store.get::<CameraRecord>(handle) else { continue };
                    file.cameras.push(CameraDesc {
                        name,
                        aspect: c.aspect,
                        near: c.near,
                        far: c.far,
                        fov: c.fov,
                        main: c.is_main(),
                    });
                    file.cameras.len()
                }
                ComponentKind::Geometry => {
                    let Some(g) = store.get::<GeometryRecord>(handle) else { continue };
                    file.geometries.push(GeometryDesc { name, mesh: g.mesh });
                    file.geometries.len()
                }
                ComponentKind::MaterialUber => {
                    let Some(m) = store.get::<UberMaterialRecord>(handle) else { continue };
                    file.materials.push(MaterialDesc::Uber(UberDesc::from_record(name, m)));
                    file.materials.len()
                }
                ComponentKind::MaterialSkybox => {
                    let Some(m) = store.get::<SkyboxMaterialRecord>(handle) else { continue };
                    file.materials.push(MaterialDesc::Skybox {
                        name,
                        shader: m.base.shader,
                        cubemap: String::new(),
                    });
                    file.materials.len()
                }
                ComponentKind::LightSpot | ComponentKind::LightDirectional | ComponentKind::LightPoint => {
                    let Some(l) = store.get::<LightRecord>(handle) else { continue };
                    file.lights.push(LightDesc {
                        kind,
                        name,
                        color: l.color(),
                        intensity: l.intensity,
                        range: l.range,
                        inner_cutoff: l.inner_cutoff,
                        outer_cutoff: l.outer_cutoff,
                        enabled: l.is_enabled(),
                    });
                    file.lights.len()
                }
                ComponentKind::AnimationCollection => {
                    let Some((_, set)) = store.animation(handle) else { continue };
                    file.animations.push(AnimationDesc {
                        name,
                        model: set.skeleton.model,
                        bones: set.skeleton.bones().to_vec(),
                        animations: set.animations.clone(),
                    });
                    file.animations.len()
                }
            };
            section_index[handle.index()] = index as u32;
        }

        // object handle -> 0-based file index
        let mut file_index = FxHashMap::default();
        for (handle, object) in scene.objects() {
            file_index.insert(handle, file.objects.len());
            let mut slots = [0u32; 5];
            for (s, slot) in slots.iter_mut().zip(OBJECT_SLOTS) {
                if let Some(h) = object.slots.get(slot) {
                    *s = section_index[h.index()];
                }
            }
            let model = store
                .get_slot::<TransformRecord>(&object.slots, Slot::Transform)
                .map_or(Mat4::IDENTITY, TransformRecord::model);
            file.objects.push(ObjectDesc {
                name: object.name.clone(),
                slots,
                model,
            });
        }

        file.tree = tree::encode(scene, max_depth, |h: ObjectHandle| {
            file_index.get(&h).copied()
        })?;
        Ok(file)
    }
}
