//! Per-category change tracking

use bitflags::bitflags;

bitflags! {
    /// Categories changed since the renderer last synchronized
    ///
    /// Tracking is per category, not per object: one changed light marks the
    /// whole light category dirty.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u32 {
        /// Primitive set or primitive-material binding changed
        const PRIMS = 1 << 0;
        /// Light set or light parameters changed
        const LIGHTS = 1 << 1;
        /// Material set or parameters changed
        const MATERIALS = 1 << 2;
        /// Texture set changed
        const TEXTURES = 1 << 3;
        /// Camera view matrix changed
        const CAMERA_VIEW = 1 << 4;
        /// Camera projection matrix changed
        const CAMERA_PROJECTION = 1 << 5;
        /// Primitive transforms changed
        const XFORMS = 1 << 6;

        /// Both camera matrices
        const CAMERA = Self::CAMERA_VIEW.bits() | Self::CAMERA_PROJECTION.bits();
    }
}

impl Default for DirtyFlags {
    fn default() -> Self {
        Self::empty()
    }
}
