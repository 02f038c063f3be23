//! Utility Module
//!
//! - [`interner`]: name interning for component records
//!
//! # Name Interning
//!
//! Component records are plain data, so names are stored as [`Symbol`]s and
//! resolved through the owning store's [`Interner`].
//!
//! ```rust,ignore
//! use thirty::utils::Interner;
//!
//! let mut names = Interner::new();
//! let a = names.intern("Camera");
//! assert_eq!(names.resolve(a), "Camera");
//! ```

pub mod interner;

pub use interner::{Interner, Symbol};
