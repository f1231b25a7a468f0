//! Asset loading
//!
//! File-format parsing lives behind the [`AssetLoader`] trait: the scene asks
//! for CPU-side geometry or pixels by path and never sees the file format.

pub mod file_geometry;
pub mod image_loader;
pub mod obj_loader;

pub use file_geometry::FileGeometry;
pub use image_loader::ImageData;
pub use obj_loader::ObjLoader;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Failed to load asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// Invalid asset data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Unsupported asset format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// IO error during asset loading
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Loads geometry and pixel data from files
pub trait AssetLoader {
    /// Parse a geometry file into host memory
    fn load_geometry(&self, path: &Path) -> Result<FileGeometry, AssetError>;

    /// Decode an image file into `channels`-channel 8-bit pixels
    fn load_image(&self, path: &Path, channels: u8) -> Result<ImageData, AssetError>;
}

/// Loader reading from the file system, relative to a root directory
#[derive(Debug, Clone, Default)]
pub struct FileSystemLoader {
    root: PathBuf,
}

impl FileSystemLoader {
    /// Create a loader resolving relative paths against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl AssetLoader for FileSystemLoader {
    fn load_geometry(&self, path: &Path) -> Result<FileGeometry, AssetError> {
        let full_path = self.resolve(path);
        match full_path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("obj") => ObjLoader::load_obj(&full_path),
            _ => Err(AssetError::UnsupportedFormat(full_path.display().to_string())),
        }
    }

    fn load_image(&self, path: &Path, channels: u8) -> Result<ImageData, AssetError> {
        ImageData::from_file(self.resolve(path), channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_resolves_relative_paths() {
        let dir = std::env::temp_dir().join(format!("scene_assets_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("tri.obj"), "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let loader = FileSystemLoader::new(&dir);
        let geometry = loader.load_geometry(Path::new("tri.obj")).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(geometry.vertex_count(), 3);
        assert_eq!(geometry.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_loader_rejects_unknown_geometry_format() {
        let loader = FileSystemLoader::default();
        assert!(matches!(
            loader.load_geometry(Path::new("mesh.fbx")),
            Err(AssetError::UnsupportedFormat(_))
        ));
    }
}
