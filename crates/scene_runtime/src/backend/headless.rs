//! Headless GPU allocator
//!
//! A [`GpuAllocator`] with no device behind it. Host-visible buffers are backed
//! by plain byte vectors, images only record their description and layout.
//! Every allocation and release is counted, so it doubles as the bookkeeping
//! backend for tests and for running a scene without a window.

use super::memory::{BufferRegion, GpuAllocator, GpuError, GpuImage, GpuResult, ImageDesc, MemoryType, ResourceId};
use ash::vk;
use std::collections::HashMap;

/// Allocation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Buffers handed out
    pub buffers_allocated: u64,
    /// Buffers released
    pub buffers_freed: u64,
    /// Images created
    pub images_created: u64,
    /// Images released
    pub images_freed: u64,
    /// Release calls for resources that were not live
    pub invalid_frees: u64,
    /// Bytes currently allocated
    pub bytes_in_use: u64,
}

#[derive(Debug)]
struct BufferRecord {
    size: u64,
    /// Present only for host-visible memory
    contents: Option<Vec<u8>>,
}

#[derive(Debug)]
struct ImageRecord {
    size: u64,
    layout: vk::ImageLayout,
    /// Bytes last copied into the base level
    contents: Option<Vec<u8>>,
}

/// Device-less allocator with optional memory budget
#[derive(Debug, Default)]
pub struct HeadlessAllocator {
    next_id: u64,
    buffers: HashMap<ResourceId, BufferRecord>,
    images: HashMap<ResourceId, ImageRecord>,
    budget: Option<u64>,
    stats: AllocatorStats,
}

impl HeadlessAllocator {
    /// Create an allocator without a memory budget
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator that refuses allocations past `bytes` in use
    pub fn with_budget(bytes: u64) -> Self {
        Self {
            budget: Some(bytes),
            ..Self::default()
        }
    }

    /// Allocation counters
    pub fn stats(&self) -> AllocatorStats {
        self.stats
    }

    /// Number of live buffers
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Number of live images
    pub fn live_images(&self) -> usize {
        self.images.len()
    }

    /// Whether a buffer region is still allocated
    pub fn is_buffer_live(&self, region: &BufferRegion) -> bool {
        self.buffers.contains_key(&region.id)
    }

    /// Whether an image is still allocated
    pub fn is_image_live(&self, image: &GpuImage) -> bool {
        self.images.contains_key(&image.id)
    }

    /// Contents of a host-visible buffer
    pub fn buffer_contents(&self, region: &BufferRegion) -> Option<&[u8]> {
        self.buffers.get(&region.id)?.contents.as_deref()
    }

    /// Bytes last copied into an image
    pub fn image_contents(&self, image: &GpuImage) -> Option<&[u8]> {
        self.images.get(&image.id)?.contents.as_deref()
    }

    /// Layout the allocator believes an image is in
    pub fn image_layout(&self, image: &GpuImage) -> Option<vk::ImageLayout> {
        self.images.get(&image.id).map(|record| record.layout)
    }

    fn reserve(&mut self, size: u64) -> GpuResult<ResourceId> {
        if let Some(budget) = self.budget {
            let available = budget.saturating_sub(self.stats.bytes_in_use);
            if size > available {
                return Err(GpuError::OutOfMemory {
                    requested: size,
                    available,
                });
            }
        }
        self.stats.bytes_in_use += size;
        self.next_id += 1;
        Ok(ResourceId(self.next_id))
    }
}

impl GpuAllocator for HeadlessAllocator {
    fn request_buffer(
        &mut self,
        size: u64,
        usage: vk::BufferUsageFlags,
        memory: MemoryType,
    ) -> GpuResult<BufferRegion> {
        let id = self.reserve(size)?;
        let contents = memory.is_host_visible().then(|| vec![0u8; size as usize]);
        self.buffers.insert(id, BufferRecord { size, contents });
        self.stats.buffers_allocated += 1;

        log::trace!("Allocated buffer {:?}: {} bytes, {:?}, {:?}", id, size, usage, memory);
        Ok(BufferRegion {
            id,
            size,
            offset: 0,
            usage,
            memory,
        })
    }

    fn write_buffer(&mut self, region: &BufferRegion, offset: u64, data: &[u8]) -> GpuResult<()> {
        let record = self
            .buffers
            .get_mut(&region.id)
            .ok_or(GpuError::UnknownResource(region.id))?;
        let size = record.size;
        let contents = record
            .contents
            .as_mut()
            .ok_or(GpuError::NotHostVisible(region.id))?;

        let len = data.len() as u64;
        if offset + len > size {
            return Err(GpuError::OutOfBounds { offset, len, size });
        }
        contents[offset as usize..(offset + len) as usize].copy_from_slice(data);
        Ok(())
    }

    fn free_buffer(&mut self, region: &BufferRegion) -> GpuResult<()> {
        match self.buffers.remove(&region.id) {
            Some(record) => {
                self.stats.bytes_in_use -= record.size;
                self.stats.buffers_freed += 1;
                log::trace!("Freed buffer {:?}", region.id);
                Ok(())
            }
            None => {
                self.stats.invalid_frees += 1;
                Err(GpuError::UnknownResource(region.id))
            }
        }
    }

    fn create_image(&mut self, desc: &ImageDesc) -> GpuResult<GpuImage> {
        let size = desc.byte_size()?;
        let id = self.reserve(size)?;
        self.images.insert(
            id,
            ImageRecord {
                size,
                layout: vk::ImageLayout::UNDEFINED,
                contents: None,
            },
        );
        self.stats.images_created += 1;

        log::trace!("Created image {:?}: {}x{} {:?}", id, desc.width, desc.height, desc.format);
        Ok(GpuImage {
            id,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            size,
            layout: vk::ImageLayout::UNDEFINED,
        })
    }

    fn copy_buffer_to_image(&mut self, src: &BufferRegion, dst: &GpuImage) -> GpuResult<()> {
        let source = self
            .buffers
            .get(&src.id)
            .ok_or(GpuError::UnknownResource(src.id))?;
        let record = self
            .images
            .get_mut(&dst.id)
            .ok_or(GpuError::UnknownResource(dst.id))?;

        if source.size < record.size {
            return Err(GpuError::OutOfBounds {
                offset: 0,
                len: record.size,
                size: source.size,
            });
        }
        record.contents = source
            .contents
            .as_ref()
            .map(|bytes| bytes[..record.size as usize].to_vec());
        Ok(())
    }

    fn transition_image_layout(&mut self, image: &mut GpuImage, new_layout: vk::ImageLayout) -> GpuResult<()> {
        let record = self
            .images
            .get_mut(&image.id)
            .ok_or(GpuError::UnknownResource(image.id))?;
        record.layout = new_layout;
        image.layout = new_layout;
        Ok(())
    }

    fn free_image(&mut self, image: &GpuImage) -> GpuResult<()> {
        match self.images.remove(&image.id) {
            Some(record) => {
                self.stats.bytes_in_use -= record.size;
                self.stats.images_freed += 1;
                log::trace!("Freed image {:?}", image.id);
                Ok(())
            }
            None => {
                self.stats.invalid_frees += 1;
                Err(GpuError::UnknownResource(image.id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_write_and_free() {
        let mut allocator = HeadlessAllocator::new();
        let region = allocator
            .request_buffer(8, vk::BufferUsageFlags::VERTEX_BUFFER, MemoryType::HostGraphics)
            .unwrap();

        allocator.write_buffer(&region, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(allocator.buffer_contents(&region).unwrap(), &[0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(matches!(
            allocator.write_buffer(&region, 6, &[0; 4]),
            Err(GpuError::OutOfBounds { .. })
        ));

        allocator.free_buffer(&region).unwrap();
        assert_eq!(allocator.free_buffer(&region), Err(GpuError::UnknownResource(region.id)));
        assert_eq!(allocator.stats().invalid_frees, 1);
        assert_eq!(allocator.stats().bytes_in_use, 0);
    }

    #[test]
    fn test_device_memory_not_writable() {
        let mut allocator = HeadlessAllocator::new();
        let region = allocator
            .request_buffer(4, vk::BufferUsageFlags::INDEX_BUFFER, MemoryType::Device)
            .unwrap();
        assert_eq!(allocator.write_buffer(&region, 0, &[0]), Err(GpuError::NotHostVisible(region.id)));
    }

    #[test]
    fn test_budget_enforced() {
        let mut allocator = HeadlessAllocator::with_budget(16);
        allocator
            .request_buffer(12, vk::BufferUsageFlags::UNIFORM_BUFFER, MemoryType::HostGraphics)
            .unwrap();
        let err = allocator
            .request_buffer(8, vk::BufferUsageFlags::UNIFORM_BUFFER, MemoryType::HostGraphics)
            .unwrap_err();
        assert_eq!(err, GpuError::OutOfMemory { requested: 8, available: 4 });
    }

    #[test]
    fn test_upload_image_releases_staging() {
        let mut allocator = HeadlessAllocator::new();
        let desc = ImageDesc::sampled_color(2, 2, vk::Format::R8G8B8A8_UNORM);
        let pixels = [255u8; 16];

        let (image, staging) = allocator.upload_image(&desc, &pixels, false).unwrap();
        assert!(staging.is_none());
        assert_eq!(allocator.live_buffers(), 0);
        assert_eq!(allocator.image_contents(&image).unwrap(), &pixels);
        assert_eq!(image.layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(allocator.image_layout(&image), Some(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL));
    }

    #[test]
    fn test_upload_image_keeps_staging_on_request() {
        let mut allocator = HeadlessAllocator::new();
        let desc = ImageDesc::sampled_color(1, 1, vk::Format::R8_UNORM);

        let (_, staging) = allocator.upload_image(&desc, &[7], true).unwrap();
        let staging = staging.unwrap();
        assert!(allocator.is_buffer_live(&staging));
        assert_eq!(allocator.buffer_contents(&staging).unwrap(), &[7]);
    }

    #[test]
    fn test_upload_failure_leaks_nothing() {
        // Staging (16 bytes) fits, the image (another 16) does not.
        let mut allocator = HeadlessAllocator::with_budget(20);
        let desc = ImageDesc::sampled_color(2, 2, vk::Format::R8G8B8A8_UNORM);

        assert!(allocator.upload_image(&desc, &[0; 16], false).is_err());
        assert_eq!(allocator.live_buffers(), 0);
        assert_eq!(allocator.live_images(), 0);
        assert_eq!(allocator.stats().bytes_in_use, 0);
    }
}
