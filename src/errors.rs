//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`ThirtyError`] covers the recoverable-by-the-caller
//! failure modes, which in practice are all resource failures:
//! - Malformed or truncated BOGLE scene files
//! - Malformed object-tree text
//! - File system and asynchronous read failures
//! - Invalid configuration
//!
//! Programming errors (double removal, render stage regressions, popping an
//! empty stack) are not represented here; they panic.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, ThirtyError>`.
//!
//! ```rust,ignore
//! use thirty::errors::Result;
//!
//! fn load() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::scene::ObjectHandle;

/// The main error type for the Thirty engine.
#[derive(Error, Debug)]
pub enum ThirtyError {
    // ========================================================================
    // Scene File Errors
    // ========================================================================
    /// The file does not start with the BOGLE magic bytes.
    #[error("Malformed scene file: bad magic {0:?}")]
    BadMagic([u8; 5]),

    /// The file declares a format version this build cannot read.
    #[error("Unsupported scene file version: {0} (supported: 0)")]
    UnsupportedVersion(u8),

    /// The reader ran out of bytes while decoding a record.
    #[error("Unexpected end of scene data while reading {context} at byte {offset}")]
    UnexpectedEof {
        /// What was being decoded
        context: &'static str,
        /// Byte offset where the read started
        offset: usize,
    },

    /// Bytes were left after the terminating sentinel.
    #[error("Malformed scene file: {0} trailing bytes after the object tree")]
    TrailingData(usize),

    /// A component record declared a subtype outside the closed kind set.
    #[error("Unknown component subtype {subtype} in {section} section")]
    UnknownKind {
        /// Section being decoded ("camera", "material", ...)
        section: &'static str,
        /// Raw subtype byte
        subtype: u8,
    },

    /// An object referenced a component index past the end of its section.
    #[error("Object {object} references {slot} #{index}, but only {available} exist")]
    DanglingSlot {
        /// 0-based object index in the file
        object: usize,
        /// Slot category name
        slot: &'static str,
        /// 1-based index found in the file
        index: u32,
        /// Number of components in that section
        available: u32,
    },

    /// A skeleton's bone parents do not form a tree.
    #[error("Malformed skeleton: {0}")]
    BadSkeleton(String),

    /// A string field was not valid UTF-8.
    #[error("Invalid UTF-8 in {0}")]
    InvalidString(&'static str),

    // ========================================================================
    // Object Tree Errors
    // ========================================================================
    /// The bracketed parent/child text is malformed.
    #[error("Malformed object tree at byte {offset}: {reason}")]
    TreeSyntax {
        /// Byte offset inside the tree text
        offset: usize,
        /// Human readable description
        reason: String,
    },

    /// Nesting exceeded the configured maximum depth.
    #[error("Object tree deeper than the maximum of {0}")]
    TreeTooDeep(usize),

    /// A tree edge could not be linked into the scene.
    #[error("Object tree cannot place {child} under {parent}")]
    InvalidLink {
        parent: ObjectHandle,
        child: ObjectHandle,
    },

    // ========================================================================
    // Loading Errors
    // ========================================================================
    /// A load was started on a scene that is loading or already loaded.
    #[error("Scene must be unloaded before a new load begins")]
    SceneNotUnloaded,

    /// The scene file could not be fetched.
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        /// Path as enqueued
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The asynchronous reader's workers are gone.
    #[error("Async reader disconnected")]
    ReaderDisconnected,

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings could not be parsed.
    #[error("Settings parse error: {0}")]
    Settings(#[from] serde_json::Error),

    /// Settings parsed but hold unusable values.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

/// Alias for `Result<T, ThirtyError>`.
pub type Result<T> = std::result::Result<T, ThirtyError>;
