//! Device-side geometry
//!
//! A [`Geometry`] owns one vertex buffer region holding the attribute arrays
//! back to back (position, color, normal, uvw) and one index buffer region.

use crate::assets::file_geometry::{FileGeometry, ATTRIBUTE_COUNT};
use crate::backend::{BufferRegion, GpuAllocator, GpuResult};
use ash::vk;

const ATTRIBUTE_STRIDE: u64 = std::mem::size_of::<[f32; 3]>() as u64;

/// Geometry uploaded to GPU memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    /// Number of vertices
    pub vertex_count: u32,
    /// Region holding all vertex attributes
    pub vertex_region: BufferRegion,
    /// Number of indices
    pub index_count: u32,
    /// Region holding the indices
    pub index_region: BufferRegion,
    /// Byte offset of each attribute array inside `vertex_region`
    pub attribute_offsets: [u64; ATTRIBUTE_COUNT],
}

impl Geometry {
    /// Upload host geometry through `allocator`
    ///
    /// Both regions are placed in host-visible graphics memory. If the second
    /// allocation or either write fails, everything allocated so far is
    /// released before the error is returned.
    pub fn upload(allocator: &mut dyn GpuAllocator, source: &FileGeometry) -> GpuResult<Self> {
        let vertex_count = source.vertex_count() as u64;
        let attribute_size = vertex_count * ATTRIBUTE_STRIDE;
        let mut attribute_offsets = [0u64; ATTRIBUTE_COUNT];
        for (i, offset) in attribute_offsets.iter_mut().enumerate() {
            *offset = i as u64 * attribute_size;
        }

        let vertex_region = allocator.request_buffer(
            attribute_size * ATTRIBUTE_COUNT as u64,
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            crate::backend::MemoryType::HostGraphics,
        )?;

        let index_region = match allocator.request_buffer(
            (source.index_count() * std::mem::size_of::<u32>()) as u64,
            vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            crate::backend::MemoryType::HostGraphics,
        ) {
            Ok(region) => region,
            Err(e) => {
                release_quietly(allocator, &vertex_region);
                return Err(e);
            }
        };

        let written = source
            .attributes()
            .iter()
            .zip(attribute_offsets)
            .try_for_each(|(attribute, offset)| {
                allocator.write_buffer(&vertex_region, offset, bytemuck::cast_slice(attribute))
            })
            .and_then(|()| allocator.write_buffer(&index_region, 0, bytemuck::cast_slice(&source.indices)));

        if let Err(e) = written {
            release_quietly(allocator, &vertex_region);
            release_quietly(allocator, &index_region);
            return Err(e);
        }

        Ok(Self {
            vertex_count: vertex_count as u32,
            vertex_region,
            index_count: source.index_count() as u32,
            index_region,
            attribute_offsets,
        })
    }

    /// Release both buffer regions
    ///
    /// Attempts both frees even if the first fails and reports the first error.
    pub fn free(&self, allocator: &mut dyn GpuAllocator) -> GpuResult<()> {
        let vertices = allocator.free_buffer(&self.vertex_region);
        let indices = allocator.free_buffer(&self.index_region);
        vertices.and(indices)
    }
}

fn release_quietly(allocator: &mut dyn GpuAllocator, region: &BufferRegion) {
    if let Err(e) = allocator.free_buffer(region) {
        log::warn!("Failed to release buffer {:?} after upload error: {}", region.id, e);
    }
}
