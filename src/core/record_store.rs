//! Variable Record Store
//!
//! A growable byte arena holding records of different sizes back to back.
//! Each record is addressed by the number of records that existed when it was
//! appended, and its span is kept in a [`StableIndexArray`]. Records are never
//! freed one by one; the whole store is cleared at scene teardown.
//!
//! The backing storage is a vector of 16-byte aligned blocks, so any record
//! placed at a multiple of the configured alignment can be viewed as a
//! `bytemuck::Pod` type with alignment up to [`MAX_ALIGNMENT`].

use std::ops::ControlFlow;

use bytemuck::{Pod, Zeroable};

use crate::core::stable_array::StableIndexArray;

/// Largest alignment a record may request.
pub const MAX_ALIGNMENT: usize = 16;

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C, align(16))]
struct Block([u8; MAX_ALIGNMENT]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    offset: usize,
    size: usize,
}

/// Heterogeneous, append-only record arena.
pub struct VariableRecordStore {
    alignment: usize,
    blocks: Vec<Block>,
    /// First free byte
    cursor: usize,
    spans: StableIndexArray<Span>,
}

impl VariableRecordStore {
    /// Creates a store with the given record alignment and initial byte
    /// capacity.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a power of two or exceeds
    /// [`MAX_ALIGNMENT`].
    #[must_use]
    pub fn new(alignment: usize, initial_capacity: usize) -> Self {
        assert!(
            alignment.is_power_of_two() && alignment <= MAX_ALIGNMENT,
            "record alignment must be a power of two <= {MAX_ALIGNMENT}, got {alignment}"
        );
        let blocks = initial_capacity.div_ceil(MAX_ALIGNMENT);
        Self {
            alignment,
            blocks: vec![Block::zeroed(); blocks],
            cursor: 0,
            spans: StableIndexArray::with_capacity(initial_capacity / 64),
        }
    }

    #[inline]
    #[must_use]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Capacity of the byte buffer.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.blocks.len() * MAX_ALIGNMENT
    }

    /// Bytes consumed so far, including alignment padding.
    #[inline]
    #[must_use]
    pub fn bytes_used(&self) -> usize {
        self.cursor
    }

    /// Number of records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.blocks)
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.blocks)
    }

    fn reserve_for(&mut self, end: usize) {
        let mut capacity = self.capacity();
        if end <= capacity {
            return;
        }
        if capacity == 0 {
            capacity = MAX_ALIGNMENT;
        }
        while capacity < end {
            capacity *= 2;
        }
        log::trace!("record store grows to {capacity} bytes");
        self.blocks.resize(capacity.div_ceil(MAX_ALIGNMENT), Block::zeroed());
    }

    /// Reserves `size` zeroed bytes for a new record and returns its handle
    /// together with the writable bytes.
    pub fn append(&mut self, size: usize) -> (usize, &mut [u8]) {
        let offset = self.cursor.next_multiple_of(self.alignment);
        let end = offset + size;
        self.reserve_for(end);
        self.cursor = end;

        let handle = self.spans.append(Span { offset, size });
        let bytes = &mut self.bytes_mut()[offset..end];
        bytes.fill(0);
        (handle, bytes)
    }

    /// Copies `data` into a new record.
    pub fn append_bytes(&mut self, data: &[u8]) -> usize {
        let (handle, bytes) = self.append(data.len());
        bytes.copy_from_slice(data);
        handle
    }

    /// Copies a plain-data value into a new record.
    pub fn push<T: Pod>(&mut self, value: &T) -> usize {
        assert!(
            std::mem::align_of::<T>() <= self.alignment,
            "record type needs alignment {} but the store uses {}",
            std::mem::align_of::<T>(),
            self.alignment
        );
        self.append_bytes(bytemuck::bytes_of(value))
    }

    /// Bytes of record `handle`.
    #[must_use]
    pub fn get(&self, handle: usize) -> Option<&[u8]> {
        let span = *self.spans.get(handle)?;
        Some(&self.bytes()[span.offset..span.offset + span.size])
    }

    pub fn get_mut(&mut self, handle: usize) -> Option<&mut [u8]> {
        let span = *self.spans.get(handle)?;
        Some(&mut self.bytes_mut()[span.offset..span.offset + span.size])
    }

    /// Size in bytes of record `handle`.
    #[must_use]
    pub fn size_of(&self, handle: usize) -> Option<usize> {
        self.spans.get(handle).map(|s| s.size)
    }

    /// Views the leading bytes of a record as `T`.
    #[must_use]
    pub fn read<T: Pod>(&self, handle: usize) -> Option<&T> {
        let bytes = self.get(handle)?;
        let len = std::mem::size_of::<T>();
        if bytes.len() < len {
            return None;
        }
        bytemuck::try_from_bytes(&bytes[..len]).ok()
    }

    pub fn read_mut<T: Pod>(&mut self, handle: usize) -> Option<&mut T> {
        let bytes = self.get_mut(handle)?;
        let len = std::mem::size_of::<T>();
        if bytes.len() < len {
            return None;
        }
        bytemuck::try_from_bytes_mut(&mut bytes[..len]).ok()
    }

    /// Visits records in append order with their bytes.
    pub fn for_each<F>(&self, mut f: F) -> ControlFlow<()>
    where
        F: FnMut(usize, &[u8]) -> ControlFlow<()>,
    {
        let bytes = self.bytes();
        for (handle, span) in self.spans.iter() {
            f(handle, &bytes[span.offset..span.offset + span.size])?;
        }
        ControlFlow::Continue(())
    }

    /// Record handles in append order.
    pub fn handles(&self) -> impl Iterator<Item = usize> + '_ {
        self.spans.iter().map(|(h, _)| h)
    }

    /// Drops every record. Capacity is kept.
    pub fn clear(&mut self) {
        self.spans.clear();
        self.cursor = 0;
    }
}

impl std::fmt::Debug for VariableRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableRecordStore")
            .field("alignment", &self.alignment)
            .field("records", &self.len())
            .field("bytes_used", &self.cursor)
            .field("capacity", &self.capacity())
            .finish()
    }
}
