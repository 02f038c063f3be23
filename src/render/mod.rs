//! Rendering Collaborators
//!
//! The scene never talks to a graphics API directly. It drives a small set
//! of facilities through opaque ids:
//!
//! - [`ShaderFacility`]: program selection and uniform upload
//! - [`GeometryFacility`]: draw calls
//! - [`TextureFacility`]: texture creation and binding
//! - [`PipelineState`]: depth test and blending switches
//!
//! [`RenderBackend`] bundles all four; any type implementing them gets it for
//! free. [`RenderOrderer`] turns a scene into a sorted draw stream against a
//! backend, and [`RecordingBackend`] captures that stream for inspection.

pub mod orderer;
pub mod recorder;
pub mod stage;

pub use orderer::{DrawEntry, RenderOrderer};
pub use recorder::{Command, RecordingBackend};
pub use stage::RenderStage;

use glam::{Mat4, Vec3, Vec4};

/// Compiled shader program known to the shader facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ShaderId(pub u32);

/// Uploaded mesh known to the geometry facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GeometryId(pub u32);

/// Texture known to the texture facility. 0 means "no texture".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TextureId(pub u32);

/// A value for one shader uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Texture2D,
    Cubemap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthFunc {
    #[default]
    Less,
    LessEqual,
}

pub trait ShaderFacility {
    fn use_shader(&mut self, shader: ShaderId);
    fn set_uniform(&mut self, shader: ShaderId, name: &str, value: Uniform);
}

pub trait GeometryFacility {
    fn draw(&mut self, geometry: GeometryId);

    fn release_geometry(&mut self, _geometry: GeometryId) {}
}

pub trait TextureFacility {
    fn bind_texture(&mut self, texture: TextureId, unit: u32);

    /// Creates a texture from encoded file bytes. Decoding is up to the
    /// facility.
    fn create_texture(&mut self, target: TextureTarget, path: &str, bytes: &[u8]) -> TextureId;

    fn release_texture(&mut self, _texture: TextureId) {}
}

pub trait PipelineState {
    fn set_depth_func(&mut self, func: DepthFunc);
    fn set_blending(&mut self, enabled: bool);
}

/// Everything a scene needs to draw itself.
pub trait RenderBackend: ShaderFacility + GeometryFacility + TextureFacility + PipelineState {}

impl<T> RenderBackend for T where
    T: ShaderFacility + GeometryFacility + TextureFacility + PipelineState + ?Sized
{
}
