//! Stable Index Array
//!
//! A growable, homogeneous array addressed by plain `usize` indices. Removing
//! an element leaves a tombstone behind instead of shifting the tail, so every
//! other index keeps pointing at the same logical element. Tombstones are only
//! reclaimed by [`StableIndexArray::sort_by`], which rewrites the live elements
//! contiguously.
//!
//! The tombstones form a singly-linked list threaded through the vacant
//! entries themselves, so removal is O(1) and costs no extra allocation.
//!
//! Two usage styles exist and must not be mixed on one instance:
//! - append + remove-by-index (object arrays, child lists)
//! - append + pop (stack-like scratch lists)

use std::cmp::Ordering;
use std::ops::{ControlFlow, Index, IndexMut};

#[derive(Debug, Clone)]
enum Entry<T> {
    Occupied(T),
    Vacant { next: Option<usize> },
}

impl<T> Entry<T> {
    #[inline]
    fn as_ref(&self) -> Option<&T> {
        match self {
            Entry::Occupied(v) => Some(v),
            Entry::Vacant { .. } => None,
        }
    }

    #[inline]
    fn as_mut(&mut self) -> Option<&mut T> {
        match self {
            Entry::Occupied(v) => Some(v),
            Entry::Vacant { .. } => None,
        }
    }
}

/// Growable array whose indices survive removals until the next sort.
#[derive(Debug, Clone)]
pub struct StableIndexArray<T> {
    entries: Vec<Entry<T>>,
    /// Head of the tombstone list
    free_head: Option<usize>,
    tombstones: usize,
}

impl<T> Default for StableIndexArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StableIndexArray<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free_head: None,
            tombstones: 0,
        }
    }

    /// Number of slots, live or tombstoned. Every index below this is either
    /// a live element or a tombstone.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of live elements.
    #[inline]
    #[must_use]
    pub fn live_len(&self) -> usize {
        self.entries.len() - self.tombstones
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_len() == 0
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    #[inline]
    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.tombstones
    }

    /// Appends a value at the end and returns its index.
    ///
    /// Tombstones are never reused here; storage doubles when full.
    pub fn append(&mut self, value: T) -> usize {
        if self.entries.len() == self.entries.capacity() {
            let grow = self.entries.capacity().max(1);
            self.entries.reserve_exact(grow);
        }
        self.entries.push(Entry::Occupied(value));
        self.entries.len() - 1
    }

    /// Tombstones the element at `index` and returns it. No other index is
    /// invalidated.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or already removed.
    pub fn remove(&mut self, index: usize) -> T {
        match self.try_remove(index) {
            Some(value) => value,
            None => panic!(
                "StableIndexArray::remove: index {index} is out of range or already removed (len {})",
                self.entries.len()
            ),
        }
    }

    /// Like [`remove`](Self::remove) but returns `None` instead of panicking.
    pub fn try_remove(&mut self, index: usize) -> Option<T> {
        let entry = self.entries.get_mut(index)?;
        if matches!(entry, Entry::Vacant { .. }) {
            return None;
        }
        let old = std::mem::replace(entry, Entry::Vacant { next: self.free_head });
        self.free_head = Some(index);
        self.tombstones += 1;
        match old {
            Entry::Occupied(value) => Some(value),
            Entry::Vacant { .. } => None,
        }
    }

    /// Removes the last element. Only valid on arrays used in the append/pop
    /// style, i.e. without tombstones.
    pub fn pop(&mut self) -> Option<T> {
        debug_assert_eq!(
            self.tombstones, 0,
            "StableIndexArray::pop on an array holding tombstones"
        );
        match self.entries.pop()? {
            Entry::Occupied(value) => Some(value),
            Entry::Vacant { .. } => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index).and_then(Entry::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.entries.get_mut(index).and_then(Entry::as_mut)
    }

    #[inline]
    #[must_use]
    pub fn is_live(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Visits live elements in index order. The callback stops the walk by
    /// returning `ControlFlow::Break`.
    pub fn for_each<F>(&self, mut f: F) -> ControlFlow<()>
    where
        F: FnMut(usize, &T) -> ControlFlow<()>,
    {
        for (i, value) in self.iter() {
            f(i, value)?;
        }
        ControlFlow::Continue(())
    }

    /// Live `(index, &value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|v| (i, v)))
    }

    /// Live `(index, &mut value)` pairs in index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> + '_ {
        self.entries
            .iter_mut()
            .enumerate()
            .filter_map(|(i, e)| e.as_mut().map(|v| (i, v)))
    }

    /// Live values in index order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().filter_map(Entry::as_ref)
    }

    /// Indices of the tombstoned slots, most recently removed first.
    pub fn tombstones(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.free_head, move |&i| match self.entries[i] {
            Entry::Vacant { next } => next,
            Entry::Occupied(_) => None,
        })
    }

    /// First live index whose value satisfies `pred`.
    pub fn position<P>(&self, mut pred: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().find(|(_, v)| pred(v)).map(|(i, _)| i)
    }

    /// Sorts the live elements and defragments: afterwards `len() ==
    /// live_len()` and there are no tombstones. All previously handed-out
    /// indices are invalidated.
    pub fn sort_by<F>(&mut self, cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let _ = self.sort_by_with_remap(cmp);
    }

    /// Same as [`sort_by`](Self::sort_by) but returns, for every old index,
    /// the element's new index (`None` for tombstones). Callers that cache
    /// indices use this to fix their references.
    pub fn sort_by_with_remap<F>(&mut self, mut cmp: F) -> Vec<Option<usize>>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let old_len = self.entries.len();
        let mut live: Vec<(usize, T)> = std::mem::take(&mut self.entries)
            .into_iter()
            .enumerate()
            .filter_map(|(i, e)| match e {
                Entry::Occupied(v) => Some((i, v)),
                Entry::Vacant { .. } => None,
            })
            .collect();
        live.sort_by(|a, b| cmp(&a.1, &b.1));

        let mut remap = vec![None; old_len];
        self.entries.reserve_exact(live.len());
        for (new_index, (old_index, value)) in live.into_iter().enumerate() {
            remap[old_index] = Some(new_index);
            self.entries.push(Entry::Occupied(value));
        }
        self.free_head = None;
        self.tombstones = 0;
        remap
    }

    /// Binary search over a defragmented array. `f` compares an element with
    /// the searched key, as in [`slice::binary_search_by`].
    pub fn binary_search_by<F>(&self, mut f: F) -> Result<usize, usize>
    where
        F: FnMut(&T) -> Ordering,
    {
        debug_assert_eq!(
            self.tombstones, 0,
            "StableIndexArray::binary_search_by requires a prior sort"
        );
        self.entries.binary_search_by(|e| match e {
            Entry::Occupied(v) => f(v),
            Entry::Vacant { .. } => unreachable!("tombstone in a defragmented array"),
        })
    }

    /// Drops every element, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.free_head = None;
        self.tombstones = 0;
    }
}

impl<T> Index<usize> for StableIndexArray<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(v) => v,
            None => panic!("StableIndexArray: index {index} is out of range or tombstoned"),
        }
    }
}

impl<T> IndexMut<usize> for StableIndexArray<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        match self.get_mut(index) {
            Some(v) => v,
            None => panic!("StableIndexArray: index {index} is out of range or tombstoned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_grows_by_doubling() {
        let mut a = StableIndexArray::with_capacity(2);
        a.append(1);
        a.append(2);
        assert_eq!(a.capacity(), 2);
        a.append(3);
        assert!(a.capacity() >= 4);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_tombstone_list_links_removed_slots() {
        let mut a = StableIndexArray::new();
        for i in 0..5 {
            a.append(i);
        }
        a.remove(1);
        a.remove(3);
        let tombs: Vec<usize> = a.tombstones().collect();
        assert_eq!(tombs, vec![3, 1]);
        assert_eq!(a.tombstone_count(), 2);
    }

    #[test]
    fn test_try_remove_twice_returns_none() {
        let mut a = StableIndexArray::new();
        a.append('x');
        assert_eq!(a.try_remove(0), Some('x'));
        assert_eq!(a.try_remove(0), None);
        assert_eq!(a.try_remove(9), None);
    }

    #[test]
    #[should_panic(expected = "already removed")]
    fn test_double_remove_panics() {
        let mut a = StableIndexArray::new();
        a.append(0u8);
        a.remove(0);
        a.remove(0);
    }

    #[test]
    fn test_for_each_stops_early() {
        let mut a = StableIndexArray::new();
        for i in 0..10 {
            a.append(i);
        }
        let mut seen = Vec::new();
        let flow = a.for_each(|_, &v| {
            seen.push(v);
            if v == 3 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
        });
        assert_eq!(flow, ControlFlow::Break(()));
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }
}
