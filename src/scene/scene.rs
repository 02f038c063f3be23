use glam::{Mat4, Vec4};

use crate::components::{
    ComponentHandle, ComponentKind, ComponentStore, GeometryRecord, NO_OWNER,
    SkyboxMaterialRecord, Slot, SlotTable, TransformRecord,
};
use crate::core::StableIndexArray;
use crate::errors::Result;
use crate::render::{GeometryId, RenderBackend, RenderOrderer, ShaderId, TextureId};
use crate::settings::SceneSettings;

use super::loader::Loader;
use super::object::{Object, ObjectHandle};

/// 场景图结构
///
/// Owns the component store, the root object and the flat object array.
/// Objects refer to each other and to their components by handle only;
/// any `&Object` handed out is invalidated by the next call that can append
/// to the object array.
pub struct Scene {
    pub(crate) settings: SceneSettings,
    pub(crate) components: ComponentStore,
    pub(crate) root: Object,
    pub(crate) objects: StableIndexArray<Object>,
    pub(crate) ambient: Vec4,
    pub(crate) loader: Loader,
    pub(crate) orderer: RenderOrderer,
}

impl Default for Scene {
    fn default() -> Self {
        Self::build(SceneSettings::default())
    }
}

impl Scene {
    /// Creates an empty, unloaded scene.
    pub fn new(settings: SceneSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(settings: SceneSettings) -> Self {
        let mut scene = Self {
            components: ComponentStore::new(
                settings.record_alignment,
                settings.initial_record_capacity,
            ),
            root: Object::new("root"),
            objects: StableIndexArray::with_capacity(settings.initial_object_capacity),
            ambient: Vec4::ZERO,
            loader: Loader::default(),
            orderer: RenderOrderer::new(settings.max_tree_depth, settings.max_lights),
            settings,
        };
        scene.reset_root();
        scene
    }

    /// Gives the root a fresh identity transform and no children.
    pub(crate) fn reset_root(&mut self) {
        self.root = Object::new("root");
        let transform =
            self.components
                .insert(ComponentKind::Transform, "", TransformRecord::identity());
        self.components
            .attach(&mut self.root.slots, ObjectHandle::ROOT, transform);
    }

    #[must_use]
    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    // ========================================================================
    // Access
    // ========================================================================

    #[must_use]
    pub fn root(&self) -> &Object {
        &self.root
    }

    #[must_use]
    pub fn object(&self, handle: ObjectHandle) -> Option<&Object> {
        match handle.array_index() {
            None => Some(&self.root),
            Some(i) => self.objects.get(i),
        }
    }

    pub fn object_mut(&mut self, handle: ObjectHandle) -> Option<&mut Object> {
        match handle.array_index() {
            None => Some(&mut self.root),
            Some(i) => self.objects.get_mut(i),
        }
    }

    /// Live non-root objects in array order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectHandle, &Object)> + '_ {
        self.objects
            .iter()
            .map(|(i, o)| (ObjectHandle::from_array_index(i), o))
    }

    /// Number of live non-root objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.live_len()
    }

    #[must_use]
    pub fn components(&self) -> &ComponentStore {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentStore {
        &mut self.components
    }

    #[must_use]
    pub fn ambient_light(&self) -> Vec4 {
        self.ambient
    }

    pub fn set_ambient_light(&mut self, ambient: Vec4) {
        self.ambient = ambient;
    }

    /// Typed view of the component in `slot` of an object.
    #[must_use]
    pub fn component<T: crate::components::ComponentRecord>(
        &self,
        object: ObjectHandle,
        slot: Slot,
    ) -> Option<&T> {
        self.components.get_slot(&self.object(object)?.slots, slot)
    }

    pub fn component_mut<T: crate::components::ComponentRecord>(
        &mut self,
        object: ObjectHandle,
        slot: Slot,
    ) -> Option<&mut T> {
        let handle = self.object(object)?.slots.get(slot)?;
        self.components.get_mut(handle)
    }

    /// Linear search by name; the root matches `"root"`.
    #[must_use]
    pub fn object_by_name(&self, name: &str) -> Option<ObjectHandle> {
        self.objects()
            .find(|(_, o)| o.name == name)
            .map(|(h, _)| h)
            .or_else(|| (self.root.name == name).then_some(ObjectHandle::ROOT))
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Appends an object holding an identity transform, without linking it
    /// into the tree.
    pub(crate) fn spawn_object(&mut self, name: &str) -> ObjectHandle {
        let index = self.objects.append(Object::new(name));
        let handle = ObjectHandle::from_array_index(index);
        let transform =
            self.components
                .insert(ComponentKind::Transform, "", TransformRecord::identity());
        self.add_component(handle, transform);
        handle
    }

    /// Creates an object with an identity transform as a child of `parent`.
    ///
    /// An unknown parent is logged and the object lands under the root.
    pub fn create_object(&mut self, name: &str, parent: ObjectHandle) -> ObjectHandle {
        let handle = self.spawn_object(name);
        if !self.add_child(parent, handle) {
            self.add_child(ObjectHandle::ROOT, handle);
        }
        log::trace!("created {handle} {name:?} under {parent}");
        handle
    }

    /// Makes `child` a child of `parent`, detaching it from its previous
    /// parent. Returns `false` (and changes nothing) if either handle is
    /// unknown or the link would create a cycle.
    pub fn add_child(&mut self, parent: ObjectHandle, child: ObjectHandle) -> bool {
        if child.is_root() || self.object(child).is_none() || self.object(parent).is_none() {
            log::error!("add_child: invalid link {parent} -> {child}");
            return false;
        }
        // parent 不能是 child 的后代
        let mut cursor = parent;
        for _ in 0..=self.objects.len() {
            if cursor == child {
                log::warn!("add_child: {child} is an ancestor of {parent}");
                return false;
            }
            if cursor.is_root() {
                break;
            }
            cursor = self.object(cursor).map_or(ObjectHandle::ROOT, |o| o.parent);
        }

        // 1. Detach from old
        self.detach(child);

        // 2. Attach to new
        if let Some(p) = self.object_mut(parent) {
            p.children.append(child);
        }
        // 3. Update child
        if let Some(c) = self.object_mut(child) {
            c.parent = parent;
        }
        true
    }

    /// Removes `child` from its parent's child list, if it is listed there.
    fn detach(&mut self, child: ObjectHandle) {
        let Some(old_parent) = self.object(child).map(|c| c.parent) else {
            return;
        };
        if let Some(p) = self.object_mut(old_parent)
            && let Some(i) = p.children.position(|&c| c == child)
        {
            p.children.remove(i);
        }
    }

    /// Places a component in the matching slot of `object`. Returns the
    /// component previously in that slot, or `None` if the object is
    /// unknown.
    pub fn add_component(
        &mut self,
        object: ObjectHandle,
        component: ComponentHandle,
    ) -> Option<ComponentHandle> {
        let Scene {
            root,
            objects,
            components,
            ..
        } = self;
        let target = match object.array_index() {
            None => root,
            Some(i) => objects.get_mut(i)?,
        };
        components.attach(&mut target.slots, object, component)
    }

    /// Installs a per-frame callback, replacing any previous one.
    pub fn set_update_hook<F>(&mut self, object: ObjectHandle, hook: F)
    where
        F: FnMut(&mut Scene, ObjectHandle, f32) + 'static,
    {
        if let Some(o) = self.object_mut(object) {
            o.hook = Some(Box::new(hook));
        }
    }

    /// Creates a skybox object under the root: a geometry, a skybox
    /// material sampling `cubemap`, and the object holding both.
    pub fn set_skybox(
        &mut self,
        name: &str,
        mesh: GeometryId,
        shader: ShaderId,
        cubemap: TextureId,
    ) -> ObjectHandle {
        let geometry = self
            .components
            .insert(ComponentKind::Geometry, name, GeometryRecord::new(mesh));
        let mut material = SkyboxMaterialRecord::new(shader);
        material.set_cubemap(cubemap);
        let material = self
            .components
            .insert(ComponentKind::MaterialSkybox, name, material);

        let handle = self.create_object(name, ObjectHandle::ROOT);
        self.add_component(handle, geometry);
        self.add_component(handle, material);
        handle
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Removes an object, handing its children to its parent.
    ///
    /// The object's slot is tombstoned; its components stay in the store
    /// without an owner. The root cannot be removed.
    pub fn remove_object(&mut self, handle: ObjectHandle) -> Option<Object> {
        let index = handle.array_index()?;
        if !self.objects.is_live(index) {
            return None;
        }
        self.detach(handle);
        let object = self.objects.remove(index);

        let parent = object.parent;
        let children: Vec<ObjectHandle> = object.children().collect();
        for &child in &children {
            if let Some(c) = self.object_mut(child) {
                c.parent = parent;
            }
            if let Some(p) = self.object_mut(parent) {
                p.children.append(child);
            }
        }
        for (_, component) in object.slots.iter() {
            self.components.set_owner(component, ObjectHandle(NO_OWNER));
        }
        log::debug!(
            "removed {handle} {:?}, {} children moved to {parent}",
            object.name,
            children.len()
        );
        Some(object)
    }

    /// Compacts the object array, reclaiming removed slots.
    ///
    /// Every handle stored in the tree and in component owners is rewritten.
    /// Handles held outside the scene are invalidated. Returns the number of
    /// reclaimed slots.
    pub fn defragment(&mut self) -> usize {
        let reclaimed = self.objects.tombstone_count();
        if reclaimed == 0 {
            return 0;
        }
        // 保持原有顺序，只压缩
        let remap = self.objects.sort_by_with_remap(|_, _| std::cmp::Ordering::Equal);
        let map = |h: ObjectHandle| -> ObjectHandle {
            match h.array_index() {
                None => ObjectHandle::ROOT,
                Some(i) => remap
                    .get(i)
                    .copied()
                    .flatten()
                    .map_or(ObjectHandle::ROOT, ObjectHandle::from_array_index),
            }
        };

        let fix = |object: &mut Object| {
            object.parent = map(object.parent);
            let children: Vec<ObjectHandle> = object.children().map(map).collect();
            object.children.clear();
            for child in children {
                object.children.append(child);
            }
        };
        fix(&mut self.root);
        let mut owners: Vec<(ComponentHandle, ObjectHandle)> = Vec::new();
        for (i, object) in self.objects.iter_mut() {
            fix(object);
            let handle = ObjectHandle::from_array_index(i);
            owners.extend(object.slots.iter().map(|(_, c)| (c, handle)));
        }
        for (component, owner) in owners {
            self.components.set_owner(component, owner);
        }
        log::debug!("defragmented object array, {reclaimed} slots reclaimed");
        reclaimed
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    /// World matrix of `object`: the product of local transforms from the
    /// root down to the object itself.
    ///
    /// Identity if the object, or any ancestor, has no transform.
    #[must_use]
    pub fn absolute_transform(&self, object: ObjectHandle) -> Mat4 {
        let mut world = Mat4::IDENTITY;
        let mut cursor = object;
        // the tree is acyclic, so the walk ends within len() + 1 steps
        for _ in 0..=self.objects.len() {
            let Some(o) = self.object(cursor) else {
                return Mat4::IDENTITY;
            };
            let Some(transform) = self
                .components
                .get_slot::<TransformRecord>(&o.slots, Slot::Transform)
            else {
                return Mat4::IDENTITY;
            };
            world = transform.model() * world;
            if cursor.is_root() {
                return world;
            }
            cursor = o.parent;
        }
        world
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Advances animation state and runs update hooks.
    pub fn update(&mut self, dt: f32) {
        let slots: Vec<SlotTable> = std::iter::once(self.root.slots)
            .chain(self.objects.values().map(|o| o.slots))
            .collect();
        for table in &slots {
            self.components.update(table, dt);
        }

        let hooked: Vec<ObjectHandle> = std::iter::once((ObjectHandle::ROOT, &self.root))
            .chain(self.objects())
            .filter(|(_, o)| o.has_hook())
            .map(|(h, _)| h)
            .collect();
        for handle in hooked {
            let Some(mut hook) = self.object_mut(handle).and_then(|o| o.hook.take()) else {
                continue;
            };
            hook(self, handle, dt);
            // the hook may have removed its object or installed a new hook
            if let Some(o) = self.object_mut(handle)
                && o.hook.is_none()
            {
                o.hook = Some(hook);
            }
        }
    }

    /// Streams the scene into `backend`.
    pub fn draw(&mut self, backend: &mut dyn RenderBackend) -> Result<()> {
        let mut orderer = std::mem::take(&mut self.orderer);
        let result = orderer.draw(self, backend);
        self.orderer = orderer;
        result
    }

    /// The orderer holding the last frame's sorted entries.
    #[must_use]
    pub fn orderer(&self) -> &RenderOrderer {
        &self.orderer
    }

    /// Runs only the gather and sort phases, e.g. to inspect draw order.
    pub fn prepare_frame(&mut self) -> Result<bool> {
        let mut orderer = std::mem::take(&mut self.orderer);
        let result = orderer.prepare(self);
        self.orderer = orderer;
        result
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("state", &self.loader.state)
            .field("objects", &self.objects.live_len())
            .field("components", &self.components)
            .field("ambient", &self.ambient)
            .finish()
    }
}

