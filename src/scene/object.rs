use crate::components::SlotTable;
use crate::core::StableIndexArray;

use super::Scene;

/// Handle of an object in a [`Scene`]: 0 is the root, any other value is
/// the object's position in the scene's object array plus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectHandle(pub u32);

impl ObjectHandle {
    pub const ROOT: ObjectHandle = ObjectHandle(0);

    #[inline]
    #[must_use]
    pub fn is_root(self) -> bool {
        self.0 == 0
    }

    /// Position in the object array, `None` for the root.
    #[inline]
    #[must_use]
    pub fn array_index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }

    #[inline]
    #[must_use]
    pub fn from_array_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }
}

impl std::fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            write!(f, "object#root")
        } else {
            write!(f, "object#{}", self.0)
        }
    }
}

/// Per-frame callback attached to an object.
pub type UpdateHook = Box<dyn FnMut(&mut Scene, ObjectHandle, f32)>;

/// A node of the scene tree.
///
/// Parent and children are handles, never references: the object array may
/// move on any append, so callers re-resolve through the [`Scene`].
pub struct Object {
    pub name: String,
    /// The root is its own parent
    pub parent: ObjectHandle,
    pub children: StableIndexArray<ObjectHandle>,
    pub slots: SlotTable,
    pub(crate) hook: Option<UpdateHook>,
}

impl Object {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: ObjectHandle::ROOT,
            children: StableIndexArray::new(),
            slots: SlotTable::new(),
            hook: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn has_hook(&self) -> bool {
        self.hook.is_some()
    }

    /// Live children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = ObjectHandle> + '_ {
        self.children.values().copied()
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children.values().collect::<Vec<_>>())
            .field("slots", &self.slots)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}
