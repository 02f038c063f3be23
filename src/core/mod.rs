//! Core data structures
//!
//! - [`StableIndexArray`]: index-stable growable array with tombstones
//! - [`VariableRecordStore`]: byte arena of variably-sized records
//! - [`BoundedStack`]: fixed-capacity stack for iterative tree walks

pub mod bounded_stack;
pub mod record_store;
pub mod stable_array;

pub use bounded_stack::{BoundedStack, StackFull};
pub use record_store::{MAX_ALIGNMENT, VariableRecordStore};
pub use stable_array::StableIndexArray;
