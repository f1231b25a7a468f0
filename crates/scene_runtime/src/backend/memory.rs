//! GPU memory interface consumed by the scene
//!
//! The scene never talks to a device directly. Everything it needs from GPU
//! memory (buffer regions for geometry, images for textures, and releasing both)
//! goes through the [`GpuAllocator`] trait. Usage flags, formats and layouts
//! are expressed with `ash::vk` types so a Vulkan backend can pass them through
//! unchanged.

use ash::vk;
use thiserror::Error;

/// Errors reported by a [`GpuAllocator`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// The allocation does not fit in the remaining memory budget
    #[error("Out of GPU memory: requested {requested} bytes, available {available} bytes")]
    OutOfMemory {
        /// Bytes requested
        requested: u64,
        /// Bytes still available
        available: u64,
    },

    /// The resource was never allocated or has already been freed
    #[error("Unknown GPU resource: {0:?}")]
    UnknownResource(ResourceId),

    /// Host access was requested on device-only memory
    #[error("Resource {0:?} is not host visible")]
    NotHostVisible(ResourceId),

    /// A write or copy would exceed the resource bounds
    #[error("Access out of bounds: offset {offset} + length {len} exceeds size {size}")]
    OutOfBounds {
        /// Start of the access
        offset: u64,
        /// Length of the access
        len: u64,
        /// Size of the resource
        size: u64,
    },

    /// The image format has no known texel size
    #[error("Unsupported image format: {0:?}")]
    UnsupportedFormat(vk::Format),
}

/// Result type for allocator operations
pub type GpuResult<T> = Result<T, GpuError>;

/// Opaque identifier of an allocator-owned resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

/// Memory pool a resource is placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryType {
    /// Host-visible memory usable by graphics work (staging, dynamic data)
    HostGraphics,
    /// Host-visible memory for transfer sources
    HostTransfer,
    /// Device-local memory
    Device,
}

impl MemoryType {
    /// Whether the host can write this memory directly
    pub fn is_host_visible(self) -> bool {
        matches!(self, Self::HostGraphics | Self::HostTransfer)
    }
}

/// A region of a GPU buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferRegion {
    /// Allocator resource id
    pub id: ResourceId,
    /// Size of the region in bytes
    pub size: u64,
    /// Offset of the region inside its backing buffer
    pub offset: u64,
    /// Usage flags the region was requested with
    pub usage: vk::BufferUsageFlags,
    /// Memory pool the region lives in
    pub memory: MemoryType,
}

impl BufferRegion {
    /// Whether the host can write this region directly
    pub fn is_host_visible(&self) -> bool {
        self.memory.is_host_visible()
    }
}

/// Parameters for creating an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Texel format
    pub format: vk::Format,
    /// Usage flags
    pub usage: vk::ImageUsageFlags,
    /// Aspect mask for the image view
    pub aspect: vk::ImageAspectFlags,
    /// Sample count
    pub samples: vk::SampleCountFlags,
    /// Mip level count
    pub mip_levels: u32,
    /// Sampler filter
    pub filter: vk::Filter,
    /// Memory pool
    pub memory: MemoryType,
}

impl ImageDesc {
    /// Sampled 2D color image, single mip level, linear filtering, device memory
    pub fn sampled_color(width: u32, height: u32, format: vk::Format) -> Self {
        Self {
            width,
            height,
            format,
            usage: vk::ImageUsageFlags::TRANSFER_DST
                | vk::ImageUsageFlags::TRANSFER_SRC
                | vk::ImageUsageFlags::SAMPLED,
            aspect: vk::ImageAspectFlags::COLOR,
            samples: vk::SampleCountFlags::TYPE_1,
            mip_levels: 1,
            filter: vk::Filter::LINEAR,
            memory: MemoryType::Device,
        }
    }

    /// Size of the base mip level in bytes
    pub fn byte_size(&self) -> GpuResult<u64> {
        let texel = texel_size(self.format).ok_or(GpuError::UnsupportedFormat(self.format))?;
        Ok(u64::from(self.width) * u64::from(self.height) * texel)
    }
}

/// A GPU image with its view and sampler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuImage {
    /// Allocator resource id
    pub id: ResourceId,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Texel format
    pub format: vk::Format,
    /// Size of the backing memory in bytes
    pub size: u64,
    /// Current layout
    pub layout: vk::ImageLayout,
}

impl GpuImage {
    /// Image extent
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}

/// Bytes per texel for the formats the scene creates
pub fn texel_size(format: vk::Format) -> Option<u64> {
    match format {
        vk::Format::R8_UNORM => Some(1),
        vk::Format::R8G8_UNORM => Some(2),
        vk::Format::R8G8B8A8_UNORM | vk::Format::R8G8B8A8_SRGB | vk::Format::B8G8R8A8_UNORM => Some(4),
        vk::Format::R32G32B32A32_SFLOAT => Some(16),
        _ => None,
    }
}

/// GPU memory allocator used by the scene
///
/// Implementations own all device state. The scene only holds the returned
/// descriptors and hands them back for release.
pub trait GpuAllocator {
    /// Request a buffer region of `size` bytes
    fn request_buffer(
        &mut self,
        size: u64,
        usage: vk::BufferUsageFlags,
        memory: MemoryType,
    ) -> GpuResult<BufferRegion>;

    /// Write `data` into a host-visible region at `offset`
    fn write_buffer(&mut self, region: &BufferRegion, offset: u64, data: &[u8]) -> GpuResult<()>;

    /// Release a buffer region
    fn free_buffer(&mut self, region: &BufferRegion) -> GpuResult<()>;

    /// Create an image (plus view and sampler) in `UNDEFINED` layout
    fn create_image(&mut self, desc: &ImageDesc) -> GpuResult<GpuImage>;

    /// Copy the contents of `src` into the base level of `dst`
    fn copy_buffer_to_image(&mut self, src: &BufferRegion, dst: &GpuImage) -> GpuResult<()>;

    /// Transition `image` into `new_layout`
    fn transition_image_layout(&mut self, image: &mut GpuImage, new_layout: vk::ImageLayout) -> GpuResult<()>;

    /// Release an image and its view and sampler
    fn free_image(&mut self, image: &GpuImage) -> GpuResult<()>;

    /// Create an image and fill it with `pixels` through a staging buffer
    ///
    /// The image ends in `SHADER_READ_ONLY_OPTIMAL`. When `keep_staging` is
    /// false the staging buffer is released before returning; otherwise it is
    /// returned alongside the image. Nothing is leaked on failure.
    fn upload_image(
        &mut self,
        desc: &ImageDesc,
        pixels: &[u8],
        keep_staging: bool,
    ) -> GpuResult<(GpuImage, Option<BufferRegion>)> {
        let staging = self.request_buffer(
            pixels.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryType::HostTransfer,
        )?;

        let image = match self.fill_image(&staging, desc, pixels) {
            Ok(image) => image,
            Err(e) => {
                if let Err(free_err) = self.free_buffer(&staging) {
                    log::warn!("Failed to free staging buffer after upload error: {}", free_err);
                }
                return Err(e);
            }
        };

        if keep_staging {
            Ok((image, Some(staging)))
        } else {
            self.free_buffer(&staging)?;
            Ok((image, None))
        }
    }

    #[doc(hidden)]
    fn fill_image(&mut self, staging: &BufferRegion, desc: &ImageDesc, pixels: &[u8]) -> GpuResult<GpuImage> {
        self.write_buffer(staging, 0, pixels)?;
        let mut image = self.create_image(desc)?;
        let transferred = self
            .copy_buffer_to_image(staging, &image)
            .and_then(|()| self.transition_image_layout(&mut image, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL));
        if let Err(e) = transferred {
            if let Err(free_err) = self.free_image(&image) {
                log::warn!("Failed to free image after upload error: {}", free_err);
            }
            return Err(e);
        }
        Ok(image)
    }
}

/// Release hook for values stored in a resource table
///
/// Called exactly once for every value leaving a table, while the value is
/// still in place, so it can return any GPU memory it owns.
pub trait Release {
    /// Release external resources owned by this value
    fn release(&mut self, _allocator: &mut dyn GpuAllocator) -> GpuResult<()> {
        Ok(())
    }
}
