//! Component Store
//!
//! Allocates kind-tagged records inside a [`VariableRecordStore`] and keeps
//! the few pieces of owned data a plain record cannot hold: interned names
//! and the skeleton/clip data of animation collections.
//!
//! Per-kind behaviour is looked up in [`KIND_TABLE`] instead of being spread
//! over `match` statements. Only animation collections advance on
//! [`ComponentStore::update`]; everything else is driven by the frame walk.

use std::ops::ControlFlow;

use super::animation::{AnimationRecord, AnimationSet};
use super::camera::CameraRecord;
use super::geometry::GeometryRecord;
use super::light::LightRecord;
use super::material::{MaterialBase, SkyboxMaterialRecord, UberMaterialRecord};
use super::slots::SlotTable;
use super::transform::TransformRecord;
use super::{
    ComponentHandle, ComponentKind, ComponentRecord, KindFilter, NO_OWNER, RecordHeader, Slot,
};
use crate::core::{StableIndexArray, VariableRecordStore};
use crate::render::RenderBackend;
use crate::scene::ObjectHandle;
use crate::utils::interner::{Interner, NO_NAME};

type FreeFn = fn(&mut ComponentStore, ComponentHandle, &mut dyn RenderBackend);
type UpdateFn = fn(&mut ComponentStore, ComponentHandle, f32);
type UploadFn = fn(&ComponentStore, ComponentHandle, &mut dyn RenderBackend);
type TransparentFn = fn(&ComponentStore, ComponentHandle) -> bool;

/// Static properties and behaviour of one component kind.
pub struct KindInfo {
    pub name: &'static str,
    pub slot: Slot,
    /// Record size in bytes
    pub size: usize,
    /// Releases resources owned by the record
    pub free: FreeFn,
    /// Per-frame advance, if the kind has one
    pub update: Option<UpdateFn>,
    /// Pushes the record's uniforms and textures (materials only)
    pub upload: Option<UploadFn>,
    pub transparent: TransparentFn,
}

fn free_nothing(_: &mut ComponentStore, _: ComponentHandle, _: &mut dyn RenderBackend) {}

fn never_transparent(_: &ComponentStore, _: ComponentHandle) -> bool {
    false
}

fn free_geometry(store: &mut ComponentStore, h: ComponentHandle, backend: &mut dyn RenderBackend) {
    if let Some(geometry) = store.get::<GeometryRecord>(h) {
        backend.release_geometry(geometry.mesh());
    }
}

fn free_uber(store: &mut ComponentStore, h: ComponentHandle, backend: &mut dyn RenderBackend) {
    if let Some(material) = store.get_mut::<UberMaterialRecord>(h) {
        material.release_textures(backend);
    }
}

fn free_skybox(store: &mut ComponentStore, h: ComponentHandle, backend: &mut dyn RenderBackend) {
    if let Some(material) = store.get_mut::<SkyboxMaterialRecord>(h) {
        material.release_textures(backend);
    }
}

fn free_animation(store: &mut ComponentStore, h: ComponentHandle, _: &mut dyn RenderBackend) {
    if let Some(set) = store.get::<AnimationRecord>(h).map(|r| r.set as usize) {
        store.animation_sets.try_remove(set);
    }
}

fn upload_uber(store: &ComponentStore, h: ComponentHandle, backend: &mut dyn RenderBackend) {
    if let Some(material) = store.get::<UberMaterialRecord>(h) {
        material.update_shader(backend);
        material.bind_textures(backend);
    }
}

fn upload_skybox(store: &ComponentStore, h: ComponentHandle, backend: &mut dyn RenderBackend) {
    if let Some(material) = store.get::<SkyboxMaterialRecord>(h) {
        material.bind_textures(backend);
    }
}

fn uber_transparent(store: &ComponentStore, h: ComponentHandle) -> bool {
    store
        .get::<UberMaterialRecord>(h)
        .is_some_and(UberMaterialRecord::is_transparent)
}

fn update_animation(store: &mut ComponentStore, h: ComponentHandle, dt: f32) {
    let Some(set) = store.get::<AnimationRecord>(h).map(|r| r.set as usize) else {
        return;
    };
    let ComponentStore {
        records,
        animation_sets,
        ..
    } = store;
    if let (Some(set), Some(record)) = (
        animation_sets.get(set),
        records.read_mut::<AnimationRecord>(h.index()),
    ) {
        record.update(set, dt);
    }
}

const fn light_info(name: &'static str) -> KindInfo {
    KindInfo {
        name,
        slot: Slot::Light,
        size: size_of::<LightRecord>(),
        free: free_nothing,
        update: None,
        upload: None,
        transparent: never_transparent,
    }
}

/// Indexed by `ComponentKind as usize`.
pub(crate) static KIND_TABLE: [KindInfo; ComponentKind::COUNT] = [
    KindInfo {
        name: "transform",
        slot: Slot::Transform,
        size: size_of::<TransformRecord>(),
        free: free_nothing,
        update: None,
        upload: None,
        transparent: never_transparent,
    },
    KindInfo {
        name: "camera",
        slot: Slot::Camera,
        size: size_of::<CameraRecord>(),
        free: free_nothing,
        update: None,
        upload: None,
        transparent: never_transparent,
    },
    KindInfo {
        name: "geometry",
        slot: Slot::Geometry,
        size: size_of::<GeometryRecord>(),
        free: free_geometry,
        update: None,
        upload: None,
        transparent: never_transparent,
    },
    KindInfo {
        name: "material_uber",
        slot: Slot::Material,
        size: size_of::<UberMaterialRecord>(),
        free: free_uber,
        update: None,
        upload: Some(upload_uber),
        transparent: uber_transparent,
    },
    KindInfo {
        name: "material_skybox",
        slot: Slot::Material,
        size: size_of::<SkyboxMaterialRecord>(),
        free: free_skybox,
        update: None,
        upload: Some(upload_skybox),
        transparent: never_transparent,
    },
    light_info("light_spot"),
    light_info("light_directional"),
    light_info("light_point"),
    KindInfo {
        name: "animation_collection",
        slot: Slot::Animation,
        size: size_of::<AnimationRecord>(),
        free: free_animation,
        update: Some(update_animation),
        upload: None,
        transparent: never_transparent,
    },
];

/// Owner of every component record of a scene.
pub struct ComponentStore {
    records: VariableRecordStore,
    names: Interner,
    animation_sets: StableIndexArray<AnimationSet>,
}

impl ComponentStore {
    /// # Panics
    ///
    /// Panics if `alignment` is smaller than the record header's alignment
    /// or is rejected by [`VariableRecordStore::new`].
    #[must_use]
    pub fn new(alignment: usize, initial_capacity: usize) -> Self {
        assert!(
            alignment >= align_of::<RecordHeader>(),
            "component records need an alignment of at least {}",
            align_of::<RecordHeader>()
        );
        Self {
            records: VariableRecordStore::new(alignment, initial_capacity),
            names: Interner::new(),
            animation_sets: StableIndexArray::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &VariableRecordStore {
        &self.records
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Allocates a zeroed record of `kind` and stamps its header. The record
    /// has no owner until it is [attached](Self::attach).
    pub fn create(&mut self, kind: ComponentKind, name: &str) -> ComponentHandle {
        let info = kind.info();
        let name = if name.is_empty() {
            NO_NAME
        } else {
            Interner::to_raw(self.names.intern(name))
        };
        let (index, bytes) = self.records.append(info.size);
        let handle = ComponentHandle(index as u32);
        let header = RecordHeader {
            kind: kind as u32,
            handle: handle.0,
            owner: NO_OWNER,
            name,
        };
        bytes[..size_of::<RecordHeader>()].copy_from_slice(bytemuck::bytes_of(&header));
        log::trace!("created {} {:?} as {handle}", info.name, self.names_resolve(name));
        handle
    }

    /// Allocates a record of `kind` initialised from `record`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not the record type of `kind`.
    pub fn insert<T: ComponentRecord>(
        &mut self,
        kind: ComponentKind,
        name: &str,
        mut record: T,
    ) -> ComponentHandle {
        assert!(
            T::KINDS.contains(&kind) && size_of::<T>() == kind.info().size,
            "record type {} cannot hold a {:?} component",
            std::any::type_name::<T>(),
            kind
        );
        let handle = self.create(kind, name);
        if let Some(header) = self.header(handle).copied() {
            *record.header_mut() = header;
        }
        if let Some(slot) = self.records.read_mut::<T>(handle.index()) {
            *slot = record;
        }
        handle
    }

    /// Registers an animation set and creates the collection record for it.
    pub fn insert_animation(&mut self, name: &str, set: AnimationSet) -> ComponentHandle {
        let index = self.animation_sets.append(set);
        self.insert(
            ComponentKind::AnimationCollection,
            name,
            AnimationRecord::new(index as u32),
        )
    }

    // ========================================================================
    // Access
    // ========================================================================

    #[must_use]
    pub fn header(&self, handle: ComponentHandle) -> Option<&RecordHeader> {
        self.records.read::<RecordHeader>(handle.index())
    }

    #[must_use]
    pub fn kind_of(&self, handle: ComponentHandle) -> Option<ComponentKind> {
        self.header(handle)?.kind()
    }

    #[must_use]
    pub fn name_of(&self, handle: ComponentHandle) -> Option<&str> {
        let raw = self.header(handle)?.name;
        Interner::from_raw(raw).map(|sym| self.names.resolve(sym))
    }

    fn names_resolve(&self, raw: u32) -> &str {
        Interner::from_raw(raw).map_or("", |sym| self.names.resolve(sym))
    }

    /// Typed view of a record. `None` if the handle is unknown or the record
    /// is of a kind `T` cannot view.
    #[must_use]
    pub fn get<T: ComponentRecord>(&self, handle: ComponentHandle) -> Option<&T> {
        let kind = self.kind_of(handle)?;
        if !T::KINDS.contains(&kind) {
            return None;
        }
        self.records.read::<T>(handle.index())
    }

    pub fn get_mut<T: ComponentRecord>(&mut self, handle: ComponentHandle) -> Option<&mut T> {
        let kind = self.kind_of(handle)?;
        if !T::KINDS.contains(&kind) {
            return None;
        }
        self.records.read_mut::<T>(handle.index())
    }

    /// The record in `slot` of an object's slot table.
    #[must_use]
    pub fn get_slot<T: ComponentRecord>(&self, slots: &SlotTable, slot: Slot) -> Option<&T> {
        self.get(slots.get(slot)?)
    }

    pub fn get_slot_mut<T: ComponentRecord>(
        &mut self,
        slots: &SlotTable,
        slot: Slot,
    ) -> Option<&mut T> {
        self.get_mut(slots.get(slot)?)
    }

    /// Places `handle` in the slot its kind belongs to and records `owner`
    /// on the component. Returns the handle previously in that slot.
    ///
    /// # Panics
    ///
    /// Panics if `handle` does not name a record.
    pub fn attach(
        &mut self,
        slots: &mut SlotTable,
        owner: ObjectHandle,
        handle: ComponentHandle,
    ) -> Option<ComponentHandle> {
        let Some(header) = self.records.read_mut::<RecordHeader>(handle.index()) else {
            panic!("ComponentStore::attach: {handle} does not exist");
        };
        header.owner = owner.0;
        let slot = match header.kind() {
            Some(kind) => kind.slot(),
            None => panic!("ComponentStore::attach: {handle} has unknown kind {}", header.kind),
        };
        let old = slots.get(slot);
        slots.set(slot, handle);
        old
    }

    /// Rewrites the owner recorded on a component, e.g. after the owning
    /// object moved in a defragmenting sort.
    pub fn set_owner(&mut self, handle: ComponentHandle, owner: ObjectHandle) {
        if let Some(header) = self.records.read_mut::<RecordHeader>(handle.index()) {
            header.owner = owner.0;
        }
    }

    #[must_use]
    pub fn animation_set(&self, index: u32) -> Option<&AnimationSet> {
        self.animation_sets.get(index as usize)
    }

    /// Animation set and playback record of a collection.
    #[must_use]
    pub fn animation(&self, handle: ComponentHandle) -> Option<(&AnimationRecord, &AnimationSet)> {
        let record = self.get::<AnimationRecord>(handle)?;
        Some((record, self.animation_set(record.set)?))
    }

    /// Shader of a material component.
    #[must_use]
    pub fn material_shader(&self, handle: ComponentHandle) -> Option<crate::render::ShaderId> {
        self.get::<MaterialBase>(handle).map(MaterialBase::shader)
    }

    #[must_use]
    pub fn is_transparent(&self, handle: ComponentHandle) -> bool {
        self.kind_of(handle)
            .is_some_and(|kind| (kind.info().transparent)(self, handle))
    }

    /// Pushes a material's uniforms and binds its textures.
    pub fn upload_material(&self, handle: ComponentHandle, backend: &mut dyn RenderBackend) {
        if let Some(upload) = self.kind_of(handle).and_then(|k| k.info().upload) {
            upload(self, handle, backend);
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// First component named `name` whose kind passes `filter`.
    ///
    /// Linear scan; meant for scene assembly, not per-frame use.
    #[must_use]
    pub fn idx_by_name(&self, name: &str, filter: KindFilter) -> Option<ComponentHandle> {
        let sym = Interner::to_raw(self.names.get(name)?);
        let mut found = None;
        let _ = self.records.for_each(|index, bytes| {
            let header: RecordHeader =
                bytemuck::pod_read_unaligned(&bytes[..size_of::<RecordHeader>()]);
            let accepted = header.kind().is_some_and(|k| filter.accepts(k));
            if header.name == sym && accepted {
                found = Some(ComponentHandle(index as u32));
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        });
        found
    }

    /// Handles of every record, in creation order.
    pub fn handles(&self) -> impl Iterator<Item = ComponentHandle> + '_ {
        self.records.handles().map(|i| ComponentHandle(i as u32))
    }

    // ========================================================================
    // Per-frame and teardown
    // ========================================================================

    /// Advances the components in `slots` that have a per-frame update.
    pub fn update(&mut self, slots: &SlotTable, dt: f32) {
        for (_, handle) in slots.iter() {
            if let Some(update) = self.kind_of(handle).and_then(|k| k.info().update) {
                update(self, handle, dt);
            }
        }
    }

    /// Runs every record's release hook and empties the store.
    pub fn free_collection(&mut self, backend: &mut dyn RenderBackend) {
        let handles: Vec<ComponentHandle> = self.handles().collect();
        for handle in handles {
            if let Some(kind) = self.kind_of(handle) {
                (kind.info().free)(self, handle, backend);
            }
        }
        log::debug!("freed {} components", self.records.len());
        self.records.clear();
        self.animation_sets.clear();
        self.names.clear();
    }
}

impl std::fmt::Debug for ComponentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentStore")
            .field("records", &self.records)
            .field("animation_sets", &self.animation_sets.live_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_table_matches_enum_order() {
        for kind in ComponentKind::ALL {
            let info = kind.info();
            assert!(info.size >= size_of::<RecordHeader>(), "{}", info.name);
        }
        assert_eq!(ComponentKind::MaterialSkybox.slot(), Slot::Material);
        assert_eq!(ComponentKind::LightPoint.slot(), Slot::Light);
    }

    #[test]
    fn test_create_stamps_header() {
        let mut store = ComponentStore::new(16, 256);
        let h = store.create(ComponentKind::Camera, "cam");
        let header = store.header(h).unwrap();
        assert_eq!(header.kind(), Some(ComponentKind::Camera));
        assert_eq!(header.handle(), h);
        assert_eq!(header.owner, NO_OWNER);
        assert_eq!(store.name_of(h), Some("cam"));
        assert_eq!(store.records().size_of(h.index()), Some(size_of::<CameraRecord>()));
    }

    #[test]
    fn test_get_rejects_wrong_kind() {
        let mut store = ComponentStore::new(16, 256);
        let h = store.insert(ComponentKind::Transform, "t", TransformRecord::identity());
        assert!(store.get::<TransformRecord>(h).is_some());
        assert!(store.get::<CameraRecord>(h).is_none());
    }
}
