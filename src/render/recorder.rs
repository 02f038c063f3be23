//! Recording Backend
//!
//! A [`RenderBackend`](super::RenderBackend) that performs no rendering and
//! instead logs every call as a [`Command`]. Used by headless tools, tests
//! and benchmarks.

use rustc_hash::FxHashMap;

use super::{
    DepthFunc, GeometryFacility, GeometryId, PipelineState, ShaderFacility, ShaderId,
    TextureFacility, TextureId, TextureTarget, Uniform,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    UseShader(ShaderId),
    SetUniform {
        shader: ShaderId,
        name: String,
        value: Uniform,
    },
    Draw(GeometryId),
    BindTexture {
        texture: TextureId,
        unit: u32,
    },
    CreateTexture {
        texture: TextureId,
        target: TextureTarget,
        path: String,
        size: usize,
    },
    ReleaseTexture(TextureId),
    ReleaseGeometry(GeometryId),
    DepthFunc(DepthFunc),
    Blending(bool),
}

/// Records commands and keeps the latest value of every uniform.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub commands: Vec<Command>,
    uniforms: FxHashMap<(ShaderId, String), Uniform>,
    next_texture: u32,
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value uploaded to `name` on `shader`.
    #[must_use]
    pub fn uniform(&self, shader: ShaderId, name: &str) -> Option<Uniform> {
        self.uniforms.get(&(shader, name.to_owned())).copied()
    }

    /// Geometry ids in draw order.
    #[must_use]
    pub fn draws(&self) -> Vec<GeometryId> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Draw(g) => Some(*g),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Command) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.uniforms.clear();
    }
}

impl ShaderFacility for RecordingBackend {
    fn use_shader(&mut self, shader: ShaderId) {
        self.commands.push(Command::UseShader(shader));
    }

    fn set_uniform(&mut self, shader: ShaderId, name: &str, value: Uniform) {
        self.uniforms.insert((shader, name.to_owned()), value);
        self.commands.push(Command::SetUniform {
            shader,
            name: name.to_owned(),
            value,
        });
    }
}

impl GeometryFacility for RecordingBackend {
    fn draw(&mut self, geometry: GeometryId) {
        self.commands.push(Command::Draw(geometry));
    }

    fn release_geometry(&mut self, geometry: GeometryId) {
        self.commands.push(Command::ReleaseGeometry(geometry));
    }
}

impl TextureFacility for RecordingBackend {
    fn bind_texture(&mut self, texture: TextureId, unit: u32) {
        self.commands.push(Command::BindTexture { texture, unit });
    }

    fn create_texture(&mut self, target: TextureTarget, path: &str, bytes: &[u8]) -> TextureId {
        self.next_texture += 1;
        let texture = TextureId(self.next_texture);
        self.commands.push(Command::CreateTexture {
            texture,
            target,
            path: path.to_owned(),
            size: bytes.len(),
        });
        texture
    }

    fn release_texture(&mut self, texture: TextureId) {
        self.commands.push(Command::ReleaseTexture(texture));
    }
}

impl PipelineState for RecordingBackend {
    fn set_depth_func(&mut self, func: DepthFunc) {
        self.commands.push(Command::DepthFunc(func));
    }

    fn set_blending(&mut self, enabled: bool) {
        self.commands.push(Command::Blending(enabled));
    }
}
