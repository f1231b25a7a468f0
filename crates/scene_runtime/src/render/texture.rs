//! Textures backed by device images

use crate::backend::{BufferRegion, GpuAllocator, GpuImage, GpuResult, Release};

/// A sampled texture
///
/// `host_buffer` is the staging copy of the pixels when it was kept after
/// upload (the default texture keeps one so it can be re-uploaded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    /// Device image
    pub image: GpuImage,
    /// Host-visible copy of the pixel data, if retained
    pub host_buffer: Option<BufferRegion>,
}

impl Texture {
    /// Wrap a device image without a host copy
    pub fn new(image: GpuImage) -> Self {
        Self {
            image,
            host_buffer: None,
        }
    }

    /// Wrap a device image with its retained staging buffer
    pub fn with_host_buffer(image: GpuImage, host_buffer: BufferRegion) -> Self {
        Self {
            image,
            host_buffer: Some(host_buffer),
        }
    }
}

impl Release for Texture {
    fn release(&mut self, allocator: &mut dyn GpuAllocator) -> GpuResult<()> {
        let image = allocator.free_image(&self.image);
        let host = match self.host_buffer.take() {
            Some(region) => allocator.free_buffer(&region),
            None => Ok(()),
        };
        image.and(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HeadlessAllocator, ImageDesc};
    use ash::vk;

    #[test]
    fn test_release_frees_image_and_host_copy() {
        let mut allocator = HeadlessAllocator::new();
        let desc = ImageDesc::sampled_color(2, 2, vk::Format::R8G8B8A8_UNORM);
        let (image, staging) = allocator.upload_image(&desc, &[255; 16], true).unwrap();
        let mut texture = Texture {
            image,
            host_buffer: staging,
        };

        texture.release(&mut allocator).unwrap();
        assert_eq!(allocator.live_images(), 0);
        assert_eq!(allocator.live_buffers(), 0);
        assert!(texture.host_buffer.is_none());
    }
}
