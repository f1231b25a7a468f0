//! Image loading utilities for texture data
//!
//! Decodes image files with the `image` crate into tightly packed 8-bit pixel
//! data with a requested channel count.

use crate::assets::AssetError;
use std::path::Path;

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw pixel data, `channels` bytes per pixel
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of color channels per pixel
    pub channels: u8,
}

impl ImageData {
    /// Load an image from a file path, converting to `channels` channels
    ///
    /// Supported channel counts are 1 (luma), 2 (luma + alpha), 3 (RGB) and 4 (RGBA).
    pub fn from_file<P: AsRef<Path>>(path: P, channels: u8) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();

        log::debug!("Loading image from: {:?}", path_ref);

        if !path_ref.exists() {
            return Err(AssetError::NotFound(path_ref.display().to_string()));
        }
        let img = image::open(path_ref)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image {}: {}", path_ref.display(), e)))?;

        let data = Self::from_dynamic(img, channels)?;
        log::info!("Loaded image {}x{} ({} channels) from {:?}", data.width, data.height, channels, path_ref);
        Ok(data)
    }

    /// Load an image from memory (useful for embedded resources)
    pub fn from_bytes(bytes: &[u8], channels: u8) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image from bytes: {}", e)))?;
        Self::from_dynamic(img, channels)
    }

    fn from_dynamic(img: image::DynamicImage, channels: u8) -> Result<Self, AssetError> {
        let (width, height) = (img.width(), img.height());
        let data = match channels {
            1 => img.to_luma8().into_raw(),
            2 => img.to_luma_alpha8().into_raw(),
            3 => img.to_rgb8().into_raw(),
            4 => img.to_rgba8().into_raw(),
            other => {
                return Err(AssetError::UnsupportedFormat(format!("{other} channels")));
            }
        };

        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Create a solid color RGBA image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        let mut data = Vec::with_capacity(pixel_count * 4);

        for _ in 0..pixel_count {
            data.extend_from_slice(&color);
        }

        Self {
            data,
            width,
            height,
            channels: 4,
        }
    }

    /// Expand 3-channel RGB data to RGBA with opaque alpha
    ///
    /// Other channel counts are returned unchanged.
    pub fn into_rgba_if_rgb(self) -> Self {
        if self.channels != 3 {
            return self;
        }
        let mut data = Vec::with_capacity(self.data.len() / 3 * 4);
        for rgb in self.data.chunks_exact(3) {
            data.extend_from_slice(rgb);
            data.push(u8::MAX);
        }
        Self {
            data,
            channels: 4,
            ..self
        }
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded_png(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(pixel));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, [255, 0, 0, 255]);
        assert_eq!(img.width, 4);
        assert_eq!(img.height, 4);
        assert_eq!(img.channels, 4);
        assert_eq!(img.size_bytes(), 4 * 4 * 4);
        assert_eq!(&img.data[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_decode_with_requested_channels() {
        let png = encoded_png(2, 3, [10, 20, 30, 40]);

        let rgba = ImageData::from_bytes(&png, 4).unwrap();
        assert_eq!((rgba.width, rgba.height), (2, 3));
        assert_eq!(rgba.size_bytes(), 2 * 3 * 4);
        assert_eq!(&rgba.data[..4], &[10, 20, 30, 40]);

        let luma = ImageData::from_bytes(&png, 1).unwrap();
        assert_eq!(luma.size_bytes(), 2 * 3);
    }

    #[test]
    fn test_unsupported_channel_count() {
        let png = encoded_png(1, 1, [0, 0, 0, 255]);
        assert!(matches!(ImageData::from_bytes(&png, 5), Err(AssetError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_rgb_expanded_to_rgba() {
        let png = encoded_png(1, 2, [1, 2, 3, 4]);
        let rgba = ImageData::from_bytes(&png, 3).unwrap().into_rgba_if_rgb();
        assert_eq!(rgba.channels, 4);
        assert_eq!(rgba.data, vec![1, 2, 3, 255, 1, 2, 3, 255]);
    }
}
