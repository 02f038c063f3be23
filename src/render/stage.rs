//! Render Stage Definitions
//!
//! The sorted draw stream passes through three stages, strictly in order:
//! opaque geometry front to back, transparent geometry back to front, and
//! finally the skybox.

/// Phase of the draw stream.
///
/// Stages never go backward within a frame.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
#[repr(u8)]
pub enum RenderStage {
    /// Depth-tested, no blending.
    Opaque = 0,

    /// Alpha-blended objects.
    Transparent = 1,

    /// Drawn last with depth `LessEqual` and translation stripped.
    Skybox = 2,
}

impl RenderStage {
    /// Returns the numeric index of the stage (used for sorting).
    #[inline]
    #[must_use]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Stage name (for debugging).
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Opaque => "Opaque",
            Self::Transparent => "Transparent",
            Self::Skybox => "Skybox",
        }
    }
}
