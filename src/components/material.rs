//! Materials
//!
//! Two closed material kinds share a common prefix ([`MaterialBase`]):
//! the uber material used by ordinary geometry and the skybox material
//! holding a single cubemap.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

use super::{ComponentKind, ComponentRecord, RecordHeader};
use crate::render::{ShaderFacility, ShaderId, TextureFacility, TextureId, Uniform};

/// Texture unit reserved for environment / skybox cubemaps.
pub const ENVIRONMENT_TEXTURE_UNIT: u32 = 8;

/// Texture slots of the uber material. The discriminant is the texture unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Ambient = 0,
    Emissive = 1,
    Diffuse = 2,
    Specular = 3,
    SpecularPower = 4,
    Normal = 5,
    Bump = 6,
    Opacity = 7,
}

impl TextureSlot {
    pub const COUNT: usize = 8;

    pub const ALL: [TextureSlot; Self::COUNT] = [
        TextureSlot::Ambient,
        TextureSlot::Emissive,
        TextureSlot::Diffuse,
        TextureSlot::Specular,
        TextureSlot::SpecularPower,
        TextureSlot::Normal,
        TextureSlot::Bump,
        TextureSlot::Opacity,
    ];

    #[inline]
    #[must_use]
    pub fn unit(self) -> u32 {
        self as u32
    }

    /// Name of the shader flag reporting whether the slot is populated.
    #[must_use]
    pub fn flag_uniform(self) -> &'static str {
        match self {
            TextureSlot::Ambient => "material.hasAmbientTexture",
            TextureSlot::Emissive => "material.hasEmissiveTexture",
            TextureSlot::Diffuse => "material.hasDiffuseTexture",
            TextureSlot::Specular => "material.hasSpecularTexture",
            TextureSlot::SpecularPower => "material.hasSpecularPowerTexture",
            TextureSlot::Normal => "material.hasNormalTexture",
            TextureSlot::Bump => "material.hasBumpTexture",
            TextureSlot::Opacity => "material.hasOpacityTexture",
        }
    }
}

/// Prefix shared by every material record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct MaterialBase {
    pub header: RecordHeader,
    pub shader: u32,
}

impl ComponentRecord for MaterialBase {
    const KINDS: &'static [ComponentKind] =
        &[ComponentKind::MaterialUber, ComponentKind::MaterialSkybox];

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RecordHeader {
        &mut self.header
    }
}

impl MaterialBase {
    #[inline]
    #[must_use]
    pub fn shader(&self) -> ShaderId {
        ShaderId(self.shader)
    }
}

// ============================================================================
// Uber
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct UberMaterialRecord {
    pub base: MaterialBase,

    pub ambient_color: [f32; 4],
    pub emissive_color: [f32; 4],
    pub diffuse_color: [f32; 4],
    pub specular_color: [f32; 4],

    pub opacity: f32,
    pub specular_power: f32,
    pub reflectance: f32,
    pub refraction: f32,
    pub index_of_refraction: f32,
    pub bump_intensity: f32,
    pub specular_scale: f32,
    pub alpha_threshold: f32,
    pub alpha_blending: u32,

    /// Texture ids per [`TextureSlot`], 0 when unset
    pub textures: [u32; TextureSlot::COUNT],
}

impl ComponentRecord for UberMaterialRecord {
    const KINDS: &'static [ComponentKind] = &[ComponentKind::MaterialUber];

    fn header(&self) -> &RecordHeader {
        &self.base.header
    }

    fn header_mut(&mut self) -> &mut RecordHeader {
        &mut self.base.header
    }
}

impl UberMaterialRecord {
    /// Black colors, no textures, opaque.
    #[must_use]
    pub fn new(shader: ShaderId) -> Self {
        Self {
            base: MaterialBase {
                header: RecordHeader::zeroed(),
                shader: shader.0,
            },
            ambient_color: [0.0, 0.0, 0.0, 1.0],
            emissive_color: [0.0, 0.0, 0.0, 1.0],
            diffuse_color: [0.0, 0.0, 0.0, 1.0],
            specular_color: [0.0, 0.0, 0.0, 1.0],
            opacity: 1.0,
            specular_power: 100.0,
            reflectance: 0.0,
            refraction: 0.0,
            index_of_refraction: 0.0,
            bump_intensity: 1.0,
            specular_scale: 1.0,
            alpha_threshold: 1.0,
            alpha_blending: 0,
            textures: [0; TextureSlot::COUNT],
        }
    }

    #[must_use]
    pub fn with_diffuse(mut self, color: Vec4) -> Self {
        self.diffuse_color = color.to_array();
        self
    }

    #[must_use]
    pub fn with_alpha_blending(mut self, enabled: bool) -> Self {
        self.alpha_blending = u32::from(enabled);
        self
    }

    #[inline]
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.alpha_blending != 0
    }

    #[inline]
    #[must_use]
    pub fn texture(&self, slot: TextureSlot) -> Option<TextureId> {
        match self.textures[slot as usize] {
            0 => None,
            id => Some(TextureId(id)),
        }
    }

    /// Stores `texture` in `slot`, returning the texture it replaced.
    pub fn set_texture(&mut self, slot: TextureSlot, texture: TextureId) -> Option<TextureId> {
        let old = self.texture(slot);
        self.textures[slot as usize] = texture.0;
        old
    }

    pub fn unset_texture(&mut self, slot: TextureSlot) -> Option<TextureId> {
        let old = self.texture(slot);
        self.textures[slot as usize] = 0;
        old
    }

    /// Uploads the material parameters to its shader.
    pub fn update_shader<S: ShaderFacility + ?Sized>(&self, shaders: &mut S) {
        let shader = self.base.shader();
        let mut set = |name: &str, value: Uniform| shaders.set_uniform(shader, name, value);

        set("material.ambientColor", Uniform::Vec4(Vec4::from_array(self.ambient_color)));
        set("material.emissiveColor", Uniform::Vec4(Vec4::from_array(self.emissive_color)));
        set("material.diffuseColor", Uniform::Vec4(Vec4::from_array(self.diffuse_color)));
        set("material.specularColor", Uniform::Vec4(Vec4::from_array(self.specular_color)));

        set("material.opacity", Uniform::Float(self.opacity));
        set("material.specularPower", Uniform::Float(self.specular_power));
        set("material.reflectance", Uniform::Float(self.reflectance));
        set("material.refraction", Uniform::Float(self.refraction));
        set("material.indexOfRefraction", Uniform::Float(self.index_of_refraction));

        for slot in TextureSlot::ALL {
            set(slot.flag_uniform(), Uniform::Bool(self.texture(slot).is_some()));
        }

        set("material.bumpIntensity", Uniform::Float(self.bump_intensity));
        set("material.specularScale", Uniform::Float(self.specular_scale));
        set("material.alphaThreshold", Uniform::Float(self.alpha_threshold));
        set("material.alphaBlendingMode", Uniform::Bool(self.is_transparent()));
    }

    pub fn bind_textures<T: TextureFacility + ?Sized>(&self, textures: &mut T) {
        for slot in TextureSlot::ALL {
            if let Some(texture) = self.texture(slot) {
                textures.bind_texture(texture, slot.unit());
            }
        }
    }

    pub(crate) fn release_textures<T: TextureFacility + ?Sized>(&mut self, textures: &mut T) {
        for slot in TextureSlot::ALL {
            if let Some(texture) = self.unset_texture(slot) {
                textures.release_texture(texture);
            }
        }
    }
}

// ============================================================================
// Skybox
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct SkyboxMaterialRecord {
    pub base: MaterialBase,
    /// Cubemap texture id, 0 while not loaded
    pub cubemap: u32,
}

impl ComponentRecord for SkyboxMaterialRecord {
    const KINDS: &'static [ComponentKind] = &[ComponentKind::MaterialSkybox];

    fn header(&self) -> &RecordHeader {
        &self.base.header
    }

    fn header_mut(&mut self) -> &mut RecordHeader {
        &mut self.base.header
    }
}

impl SkyboxMaterialRecord {
    #[must_use]
    pub fn new(shader: ShaderId) -> Self {
        Self {
            base: MaterialBase {
                header: RecordHeader::zeroed(),
                shader: shader.0,
            },
            cubemap: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn cubemap(&self) -> Option<TextureId> {
        (self.cubemap != 0).then_some(TextureId(self.cubemap))
    }

    pub fn set_cubemap(&mut self, texture: TextureId) -> Option<TextureId> {
        let old = self.cubemap();
        self.cubemap = texture.0;
        old
    }

    pub fn bind_textures<T: TextureFacility + ?Sized>(&self, textures: &mut T) {
        if let Some(texture) = self.cubemap() {
            textures.bind_texture(texture, ENVIRONMENT_TEXTURE_UNIT);
        }
    }

    pub(crate) fn release_textures<T: TextureFacility + ?Sized>(&mut self, textures: &mut T) {
        if let Some(texture) = self.cubemap() {
            self.cubemap = 0;
            textures.release_texture(texture);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uber_defaults_are_opaque() {
        let m = UberMaterialRecord::new(ShaderId(0));
        assert!(!m.is_transparent());
        assert!(m.with_alpha_blending(true).is_transparent());
    }

    #[test]
    fn test_set_texture_returns_replaced() {
        let mut m = UberMaterialRecord::new(ShaderId(0));
        assert_eq!(m.set_texture(TextureSlot::Diffuse, TextureId(3)), None);
        assert_eq!(m.set_texture(TextureSlot::Diffuse, TextureId(4)), Some(TextureId(3)));
        assert_eq!(m.texture(TextureSlot::Diffuse), Some(TextureId(4)));
        assert_eq!(m.texture(TextureSlot::Normal), None);
    }

    #[test]
    fn test_material_prefix_layout() {
        assert_eq!(std::mem::offset_of!(UberMaterialRecord, base), 0);
        assert_eq!(std::mem::offset_of!(SkyboxMaterialRecord, base), 0);
    }
}
