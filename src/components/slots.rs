use std::num::NonZeroU32;

use super::{ComponentHandle, Slot};

/// Per-object mapping from slot category to component handle.
///
/// Entries are stored 1-based so that "absent" costs no extra space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotTable {
    slots: [Option<NonZeroU32>; Slot::COUNT],
}

impl SlotTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, slot: Slot) -> Option<ComponentHandle> {
        self.slots[slot as usize].map(|raw| ComponentHandle(raw.get() - 1))
    }

    #[inline]
    #[must_use]
    pub fn has(&self, slot: Slot) -> bool {
        self.slots[slot as usize].is_some()
    }

    /// Raw 1-based entry, 0 when absent.
    #[inline]
    #[must_use]
    pub fn raw(&self, slot: Slot) -> u32 {
        self.slots[slot as usize].map_or(0, NonZeroU32::get)
    }

    /// Use [`ComponentStore::attach`](super::ComponentStore::attach) to also
    /// stamp the owner on the record.
    pub(crate) fn set(&mut self, slot: Slot, handle: ComponentHandle) {
        self.slots[slot as usize] = NonZeroU32::new(handle.0 + 1);
    }

    pub fn clear(&mut self, slot: Slot) -> Option<ComponentHandle> {
        let old = self.get(slot);
        self.slots[slot as usize] = None;
        old
    }

    /// Occupied `(slot, handle)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, ComponentHandle)> + '_ {
        Slot::ALL
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|h| (slot, h)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_stored_one_based() {
        let mut t = SlotTable::new();
        assert!(!t.has(Slot::Camera));
        t.set(Slot::Camera, ComponentHandle(0));
        assert_eq!(t.raw(Slot::Camera), 1);
        assert_eq!(t.get(Slot::Camera), Some(ComponentHandle(0)));
        assert_eq!(t.clear(Slot::Camera), Some(ComponentHandle(0)));
        assert_eq!(t.iter().count(), 0);
    }
}
