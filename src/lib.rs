//! # Thirty
//!
//! Entity/component storage and scene graph for a small real-time 3D engine.
//!
//! - [`core`]: index-stable arrays, the variable record arena, bounded stacks
//! - [`components`]: the closed set of component kinds and their store
//! - [`scene`]: objects, the scene tree, BOGLE files and resumable loading
//! - [`render`]: collaborator traits and the per-frame render orderer
//! - [`io`]: asynchronous file reading
//!
//! ```rust,ignore
//! use thirty::{RecordingBackend, Scene, SceneSettings};
//! use thirty::io::AsyncFileReader;
//!
//! let settings = SceneSettings::default();
//! let mut reader = AsyncFileReader::from_settings(&settings)?;
//! let mut backend = RecordingBackend::new();
//! let mut scene = Scene::new(settings)?;
//!
//! scene.begin_load("level.bogle")?;
//! loop {
//!     scene.load(&mut reader, &mut backend)?;
//!     scene.update(1.0 / 60.0);
//!     scene.draw(&mut backend)?;
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod components;
pub mod core;
pub mod errors;
pub mod io;
pub mod render;
pub mod scene;
pub mod settings;
pub mod utils;

pub use components::{ComponentHandle, ComponentKind, ComponentStore, KindFilter, Slot, SlotTable};
pub use errors::{Result, ThirtyError};
pub use render::{RecordingBackend, RenderBackend, RenderOrderer, RenderStage};
pub use scene::{LoadState, Object, ObjectHandle, Scene, SceneFile, StepStatus};
pub use settings::SceneSettings;
pub use utils::interner;
