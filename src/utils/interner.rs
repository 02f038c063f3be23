//! 组件名称驻留器 (Name Interner)
//!
//! Component records live in a byte arena and can only hold plain data, so
//! their display names are interned here and the record keeps the compact
//! [`Symbol`]. One interner belongs to one component store; there is no
//! global state.

use lasso::{Key, Rodeo, Spur};

/// Compact integer identifier of an interned name.
pub type Symbol = Spur;

/// Raw value stored in records for "no name".
pub const NO_NAME: u32 = u32::MAX;

#[derive(Debug, Default)]
pub struct Interner {
    rodeo: Rodeo,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self { rodeo: Rodeo::new() }
    }

    /// Interns `s`, returning the existing symbol if already present.
    #[inline]
    pub fn intern(&mut self, s: &str) -> Symbol {
        self.rodeo.get_or_intern(s)
    }

    /// Looks up `s` without allocating.
    #[inline]
    #[must_use]
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.rodeo.get(s)
    }

    #[inline]
    #[must_use]
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.rodeo.resolve(&sym)
    }

    /// Packs a symbol into the `u32` stored in a record header.
    #[inline]
    #[must_use]
    pub fn to_raw(sym: Symbol) -> u32 {
        sym.into_usize() as u32
    }

    /// Inverse of [`to_raw`](Self::to_raw); `NO_NAME` maps to `None`.
    #[inline]
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Symbol> {
        if raw == NO_NAME {
            return None;
        }
        Spur::try_from_usize(raw as usize)
    }

    pub fn clear(&mut self) {
        self.rodeo = Rodeo::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_resolve() {
        let mut names = Interner::new();
        let s1 = names.intern("hello");
        let s2 = names.intern("hello");
        let s3 = names.intern("world");

        assert_eq!(s1, s2);
        assert_ne!(s1, s3);
        assert_eq!(names.resolve(s1), "hello");
        assert_eq!(names.resolve(s3), "world");
    }

    #[test]
    fn test_raw_round_trip() {
        let mut names = Interner::new();
        let sym = names.intern("Cube");
        assert_eq!(Interner::from_raw(Interner::to_raw(sym)), Some(sym));
        assert_eq!(Interner::from_raw(NO_NAME), None);
        assert!(names.get("missing").is_none());
    }
}
