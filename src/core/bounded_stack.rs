//! Fixed-capacity stack.
//!
//! Allocates once and refuses to grow past its capacity. Tree walks use it
//! instead of recursion so worst-case memory is known up front.

/// Returned by [`BoundedStack::push`] when the stack is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackFull;

#[derive(Debug, Clone)]
pub struct BoundedStack<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> BoundedStack<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) -> Result<(), StackFull> {
        if self.is_full() {
            return Err(StackFull);
        }
        self.items.push(value);
        Ok(())
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    #[inline]
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
