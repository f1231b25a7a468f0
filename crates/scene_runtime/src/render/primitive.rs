//! Drawable primitives

use crate::backend::{GpuAllocator, GpuResult, Release};
use crate::foundation::math::Mat4;
use crate::render::geometry::Geometry;
use crate::render::{MaterialHandle, PrimitiveHandle};

/// A drawable: optional device geometry, a model transform and a material
///
/// Geometry is optional so the renderer can fill a slot later through a
/// pinned slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    /// Device geometry, if uploaded
    pub geometry: Option<Geometry>,
    /// Model-to-world transform
    pub xform: Mat4,
    /// Material used for shading
    pub material: MaterialHandle,
}

impl Primitive {
    /// Create a primitive from uploaded geometry
    pub fn new(geometry: Geometry, xform: Mat4, material: MaterialHandle) -> Self {
        Self {
            geometry: Some(geometry),
            xform,
            material,
        }
    }

    /// Create a primitive with no geometry yet
    pub fn empty(xform: Mat4, material: MaterialHandle) -> Self {
        Self {
            geometry: None,
            xform,
            material,
        }
    }

    /// Release the geometry, leaving the primitive empty
    pub fn free_geometry(&mut self, allocator: &mut dyn GpuAllocator) -> GpuResult<()> {
        match self.geometry.take() {
            Some(geometry) => geometry.free(allocator),
            None => Ok(()),
        }
    }
}

impl Release for Primitive {
    fn release(&mut self, allocator: &mut dyn GpuAllocator) -> GpuResult<()> {
        self.free_geometry(allocator)
    }
}

/// Ordered list of primitive handles, e.g. a draw or selection list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimitiveList {
    handles: Vec<PrimitiveHandle>,
}

impl PrimitiveList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handle
    pub fn push(&mut self, handle: PrimitiveHandle) {
        self.handles.push(handle);
    }

    /// Remove every handle
    pub fn clear(&mut self) {
        self.handles.clear();
    }

    /// Handles in insertion order
    pub fn iter(&self) -> impl Iterator<Item = PrimitiveHandle> + '_ {
        self.handles.iter().copied()
    }

    /// Number of handles
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl FromIterator<PrimitiveHandle> for PrimitiveList {
    fn from_iter<I: IntoIterator<Item = PrimitiveHandle>>(iter: I) -> Self {
        Self {
            handles: iter.into_iter().collect(),
        }
    }
}
