//! Scene Loading
//!
//! Loading is a stack of pending [`LoadStep`]s driven by [`Scene::load`].
//! Each call pops and runs steps until the stack is empty or a step defers
//! because an asynchronous read has not completed yet. A deferred step goes
//! back on top of the stack and runs first on the next call; finished steps
//! never run again.
//!
//! File loading pushes its steps one at a time:
//!
//! ```text
//! OpenFile -> AwaitFile -> ReadHeader -> ReadComponents -> ReadObjects
//!          -> ReadTree -> AwaitTextures -> (steps added by the application)
//! ```
//!
//! Any error frees everything the load created and returns the scene to
//! [`LoadState::Unloaded`].

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::components::{
    AnimationSet, ComponentHandle, ComponentKind, GeometryRecord, Skeleton, SkyboxMaterialRecord,
    Slot, TextureSlot, TransformRecord, UberMaterialRecord,
};
use crate::errors::{Result, ThirtyError};
use crate::io::{AsyncReader, CompletedRead, ReadId, ReadPoll};
use crate::render::{GeometryId, RenderBackend, ShaderId, TextureTarget};

use super::format::{
    AnimationDesc, ByteReader, CameraDesc, GeometryDesc, Header, LightDesc, MaterialDesc,
    OBJECT_SLOTS, ObjectDesc,
};
use super::tree;
use super::{ObjectHandle, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
}

/// Result of running one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    /// Not finished; run again on the next [`Scene::load`]
    Deferred,
}

/// A loading step supplied by the application.
pub type CustomStep = Box<dyn FnMut(&mut Scene) -> Result<StepStatus>>;

pub(crate) enum LoadStep {
    OpenFile(PathBuf),
    AwaitFile(ReadId),
    ReadHeader,
    ReadComponents,
    ReadObjects,
    ReadTree,
    AwaitTextures,
    Custom(CustomStep),
}

impl LoadStep {
    fn name(&self) -> &'static str {
        match self {
            LoadStep::OpenFile(_) => "open file",
            LoadStep::AwaitFile(_) => "await file",
            LoadStep::ReadHeader => "read header",
            LoadStep::ReadComponents => "read components",
            LoadStep::ReadObjects => "read objects",
            LoadStep::ReadTree => "read tree",
            LoadStep::AwaitTextures => "await textures",
            LoadStep::Custom(_) => "custom",
        }
    }
}

/// Where a texture read lands once it completes.
#[derive(Debug, Clone, Copy)]
enum TextureTargetSlot {
    Uber(ComponentHandle, TextureSlot),
    Skybox(ComponentHandle),
}

/// Intermediate state of a file load.
#[derive(Default)]
struct LoadSession {
    bytes: Vec<u8>,
    offset: usize,
    header: Option<Header>,
    /// Per referenceable slot, file index -> component handle
    sections: [Vec<ComponentHandle>; OBJECT_SLOTS.len()],
    /// File index -> object handle
    objects: Vec<ObjectHandle>,
    textures: FxHashMap<ReadId, TextureTargetSlot>,
    /// Reads reaped but not yet consumed by a step
    completed: FxHashMap<ReadId, CompletedRead>,
}

impl LoadSession {
    fn header(&self) -> Result<Header> {
        self.header.ok_or(ThirtyError::UnexpectedEof {
            context: "header",
            offset: 0,
        })
    }

    /// Reaps every read the reader has finished.
    fn pump(&mut self, reader: &mut dyn AsyncReader) -> Result<()> {
        while let ReadPoll::Completed(read) = reader.poll()? {
            self.completed.insert(read.id, read);
        }
        Ok(())
    }
}

/// Loading state of a scene.
#[derive(Default)]
pub(crate) struct Loader {
    pub(crate) state: LoadState,
    steps: Vec<LoadStep>,
    /// A step is executing; steps added now run next
    running: bool,
    session: Option<LoadSession>,
}

impl Loader {
    fn session(&mut self) -> &mut LoadSession {
        self.session.get_or_insert_with(LoadSession::default)
    }
}

impl Scene {
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.loader.state
    }

    /// Starts loading a BOGLE file through the reader passed to
    /// [`load`](Self::load). The path is resolved by the reader.
    pub fn begin_load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.begin(LoadStep::OpenFile(path.as_ref().to_path_buf()))?;
        log::info!("loading scene from {}", path.as_ref().display());
        Ok(())
    }

    /// Starts loading a BOGLE file already in memory.
    pub fn begin_load_bytes(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.begin(LoadStep::ReadHeader)?;
        self.loader.session().bytes = bytes;
        log::info!("loading scene from memory");
        Ok(())
    }

    /// Application steps queued beforehand stay below the file steps.
    fn begin(&mut self, first: LoadStep) -> Result<()> {
        if self.loader.state == LoadState::Loaded || self.loader.session.is_some() {
            return Err(ThirtyError::SceneNotUnloaded);
        }
        self.loader.state = LoadState::Loading;
        self.loader.session = Some(LoadSession::default());
        self.loader.steps.push(first);
        Ok(())
    }

    /// Adds an application step. Steps run in insertion order after the
    /// file steps; a step added while another step runs executes next.
    /// Adding a step to a loaded scene makes it loading again.
    pub fn add_loading_step<F>(&mut self, step: F)
    where
        F: FnMut(&mut Scene) -> Result<StepStatus> + 'static,
    {
        let step = LoadStep::Custom(Box::new(step));
        if self.loader.running {
            self.loader.steps.push(step);
        } else {
            self.loader.steps.insert(0, step);
        }
        self.loader.state = LoadState::Loading;
    }

    /// Runs pending steps until the stack empties or a step defers.
    ///
    /// Safe to call every frame: on a loaded or unloaded scene it does
    /// nothing. On error the scene is freed and left unloaded.
    pub fn load(
        &mut self,
        reader: &mut dyn AsyncReader,
        backend: &mut dyn RenderBackend,
    ) -> Result<LoadState> {
        if self.loader.state != LoadState::Loading {
            return Ok(self.loader.state);
        }
        match self.run_steps(reader, backend) {
            Ok(state) => Ok(state),
            Err(e) => {
                log::error!("scene load failed: {e}");
                self.unload(backend);
                Err(e)
            }
        }
    }

    /// Frees every component and object and returns to `Unloaded`.
    pub fn unload(&mut self, backend: &mut dyn RenderBackend) {
        self.components.free_collection(backend);
        self.objects.clear();
        self.reset_root();
        self.ambient = glam::Vec4::ZERO;
        self.loader = Loader::default();
        log::debug!("scene unloaded");
    }

    fn run_steps(
        &mut self,
        reader: &mut dyn AsyncReader,
        backend: &mut dyn RenderBackend,
    ) -> Result<LoadState> {
        while let Some(step) = self.loader.steps.pop() {
            let name = step.name();
            self.loader.running = true;
            let outcome = self.run_step(step, reader, backend);
            self.loader.running = false;
            if let Some(deferred) = outcome? {
                log::debug!("load step '{name}' deferred");
                self.loader.steps.push(deferred);
                return Ok(LoadState::Loading);
            }
        }
        self.loader.state = LoadState::Loaded;
        self.loader.session = None;
        log::info!(
            "scene loaded: {} objects, {} components, {} bytes read",
            self.object_count(),
            self.components.len(),
            reader.total_size()
        );
        Ok(LoadState::Loaded)
    }

    /// Runs one step. Returns the step back if it deferred.
    fn run_step(
        &mut self,
        step: LoadStep,
        reader: &mut dyn AsyncReader,
        backend: &mut dyn RenderBackend,
    ) -> Result<Option<LoadStep>> {
        match step {
            LoadStep::OpenFile(path) => {
                let id = reader.enqueue_read(&path)?;
                self.loader.steps.push(LoadStep::AwaitFile(id));
            }
            LoadStep::AwaitFile(id) => {
                let session = self.loader.session();
                session.pump(reader)?;
                let Some(read) = session.completed.remove(&id) else {
                    return Ok(Some(LoadStep::AwaitFile(id)));
                };
                session.bytes = read.bytes.map_err(|source| ThirtyError::ReadFailed {
                    path: read.path.display().to_string(),
                    source,
                })?;
                self.loader.steps.push(LoadStep::ReadHeader);
            }
            LoadStep::ReadHeader => {
                self.read_header()?;
                self.loader.steps.push(LoadStep::ReadComponents);
            }
            LoadStep::ReadComponents => {
                self.read_components(reader)?;
                self.loader.steps.push(LoadStep::ReadObjects);
            }
            LoadStep::ReadObjects => {
                self.read_objects()?;
                self.loader.steps.push(LoadStep::ReadTree);
            }
            LoadStep::ReadTree => {
                self.read_tree()?;
                self.loader.steps.push(LoadStep::AwaitTextures);
            }
            LoadStep::AwaitTextures => {
                if !self.await_textures(reader, backend)? {
                    return Ok(Some(LoadStep::AwaitTextures));
                }
            }
            LoadStep::Custom(mut f) => {
                if f(self)? == StepStatus::Deferred {
                    return Ok(Some(LoadStep::Custom(f)));
                }
            }
        }
        Ok(None)
    }

    // ========================================================================
    // File steps
    // ========================================================================

    fn read_header(&mut self) -> Result<()> {
        let session = self.loader.session();
        let mut r = ByteReader::new(&session.bytes);
        let header = Header::read(&mut r)?;
        session.offset = r.position();
        session.header = Some(header);
        self.ambient = header.ambient;
        log::debug!(
            "header: {} cameras, {} geometries, {} materials, {} lights, {} animations, {} objects",
            header.cameras,
            header.geometries,
            header.materials,
            header.lights,
            header.animations,
            header.objects
        );
        Ok(())
    }

    fn read_components(&mut self, reader: &mut dyn AsyncReader) -> Result<()> {
        let mut session = self.loader.session.take().unwrap_or_default();
        let result = self.read_component_sections(&mut session, reader);
        self.loader.session = Some(session);
        result
    }

    fn read_component_sections(
        &mut self,
        session: &mut LoadSession,
        reader: &mut dyn AsyncReader,
    ) -> Result<()> {
        let header = session.header()?;
        let mut r = ByteReader::at(&session.bytes, session.offset);
        let store = &mut self.components;
        let section = |slot: Slot| {
            OBJECT_SLOTS
                .iter()
                .position(|s| *s == slot)
                .unwrap_or_default()
        };
        let mut handles: [Vec<ComponentHandle>; OBJECT_SLOTS.len()] = Default::default();

        for _ in 0..header.cameras {
            let desc = CameraDesc::read(&mut r)?;
            let h = store.insert(ComponentKind::Camera, &desc.name, desc.record());
            handles[section(Slot::Camera)].push(h);
        }
        for _ in 0..header.geometries {
            let desc = GeometryDesc::read(&mut r)?;
            let record = GeometryRecord::new(GeometryId(desc.mesh));
            let h = store.insert(ComponentKind::Geometry, &desc.name, record);
            handles[section(Slot::Geometry)].push(h);
        }
        for _ in 0..header.materials {
            let h = match MaterialDesc::read(&mut r)? {
                MaterialDesc::Uber(desc) => {
                    let h = store.insert(ComponentKind::MaterialUber, &desc.name, desc.record());
                    for (slot, path) in TextureSlot::ALL.into_iter().zip(&desc.textures) {
                        if !path.is_empty() {
                            let id = reader.enqueue_read(Path::new(path))?;
                            session.textures.insert(id, TextureTargetSlot::Uber(h, slot));
                        }
                    }
                    h
                }
                MaterialDesc::Skybox {
                    name,
                    shader,
                    cubemap,
                } => {
                    let record = SkyboxMaterialRecord::new(ShaderId(shader));
                    let h = store.insert(ComponentKind::MaterialSkybox, &name, record);
                    if !cubemap.is_empty() {
                        let id = reader.enqueue_read(Path::new(&cubemap))?;
                        session.textures.insert(id, TextureTargetSlot::Skybox(h));
                    }
                    h
                }
            };
            handles[section(Slot::Material)].push(h);
        }
        for _ in 0..header.lights {
            let desc = LightDesc::read(&mut r)?;
            let h = store.insert(desc.kind, &desc.name, desc.record());
            handles[section(Slot::Light)].push(h);
        }
        for _ in 0..header.animations {
            let desc = AnimationDesc::read(&mut r)?;
            let skeleton = Skeleton::new(desc.model, desc.bones)?;
            let h = store.insert_animation(&desc.name, AnimationSet::new(skeleton, desc.animations));
            handles[section(Slot::Animation)].push(h);
        }

        session.offset = r.position();
        session.sections = handles;
        log::debug!(
            "read {} components, {} texture reads enqueued",
            session.sections.iter().map(Vec::len).sum::<usize>(),
            session.textures.len()
        );
        Ok(())
    }

    fn read_objects(&mut self) -> Result<()> {
        let mut session = self.loader.session.take().unwrap_or_default();
        let result = self.read_object_section(&mut session);
        self.loader.session = Some(session);
        result
    }

    fn read_object_section(&mut self, session: &mut LoadSession) -> Result<()> {
        let header = session.header()?;
        let mut r = ByteReader::at(&session.bytes, session.offset);
        for i in 0..header.objects as usize {
            let desc = ObjectDesc::read(&mut r)?;
            desc.validate(i, &header)?;

            let handle = self.spawn_object(&desc.name);
            if let Some(t) = self.component_mut::<TransformRecord>(handle, Slot::Transform) {
                t.set_model(desc.model);
            }
            for (k, &index) in desc.slots.iter().enumerate() {
                if let Some(&component) = index
                    .checked_sub(1)
                    .and_then(|i| session.sections[k].get(i as usize))
                {
                    self.add_component(handle, component);
                }
            }
            session.objects.push(handle);
        }
        session.offset = r.position();
        Ok(())
    }

    fn read_tree(&mut self) -> Result<()> {
        let max_depth = self.settings.max_tree_depth;
        let session = self.loader.session();
        let text = session.bytes.get(session.offset..).unwrap_or_default();

        let mut edges = Vec::new();
        let used = tree::parse(text, session.objects.len(), max_depth, |p, c| {
            edges.push((p, c));
        })?;
        let trailing = text.len() - used;
        if trailing > 0 {
            return Err(ThirtyError::TrailingData(trailing));
        }

        // parse() hands out file positions; map them to live handles
        let objects = std::mem::take(&mut session.objects);
        let resolve = |h: ObjectHandle| match h.array_index() {
            None => Some(ObjectHandle::ROOT),
            Some(i) => objects.get(i).copied(),
        };
        let mut linked = vec![false; objects.len()];
        for (parent, child) in edges {
            let (Some(p), Some(c), Some(i)) = (resolve(parent), resolve(child), child.array_index())
            else {
                return Err(ThirtyError::InvalidLink { parent, child });
            };
            if !self.add_child(p, c) {
                return Err(ThirtyError::InvalidLink { parent, child });
            }
            linked[i] = true;
        }
        // objects the text never lists hang off the root
        for (&handle, _) in objects.iter().zip(&linked).filter(|(_, l)| !**l) {
            log::warn!("{handle} missing from the object tree, placed under the root");
            self.add_child(ObjectHandle::ROOT, handle);
        }
        self.loader.session().bytes = Vec::new();
        Ok(())
    }

    /// Creates textures for every completed read. `true` once none remain.
    fn await_textures(
        &mut self,
        reader: &mut dyn AsyncReader,
        backend: &mut dyn RenderBackend,
    ) -> Result<bool> {
        let session = self.loader.session();
        session.pump(reader)?;
        let ready: Vec<ReadId> = session
            .textures
            .keys()
            .filter(|id| session.completed.contains_key(*id))
            .copied()
            .collect();

        for id in ready {
            let session = self.loader.session();
            let (Some(target), Some(read)) =
                (session.textures.remove(&id), session.completed.remove(&id))
            else {
                continue;
            };
            let path = read.path.display().to_string();
            let bytes = read.bytes.map_err(|source| ThirtyError::ReadFailed {
                path: path.clone(),
                source,
            })?;
            match target {
                TextureTargetSlot::Uber(h, slot) => {
                    let texture = backend.create_texture(TextureTarget::Texture2D, &path, &bytes);
                    if let Some(m) = self.components.get_mut::<UberMaterialRecord>(h) {
                        m.set_texture(slot, texture);
                    }
                }
                TextureTargetSlot::Skybox(h) => {
                    let texture = backend.create_texture(TextureTarget::Cubemap, &path, &bytes);
                    if let Some(m) = self.components.get_mut::<SkyboxMaterialRecord>(h) {
                        m.set_cubemap(texture);
                    }
                }
            }
            log::debug!("texture {path} ready ({} bytes)", bytes.len());
        }
        Ok(self.loader.session().textures.is_empty())
    }
}
