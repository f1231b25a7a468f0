//! Material system for rendering

use crate::backend::Release;
use crate::render::TextureHandle;

/// Material properties for 3D rendering
///
/// Texture slots hold [`TextureHandle::NULL`] when unused.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Base color (RGB)
    pub color: [f32; 3],

    /// Roughness factor (0.0 = mirror, 1.0 = completely rough)
    pub roughness: f32,

    /// Albedo texture
    pub albedo_texture: TextureHandle,

    /// Roughness texture
    pub roughness_texture: TextureHandle,

    /// Normal map
    pub normal_texture: TextureHandle,
}

impl Material {
    /// Create an untextured material
    pub fn new(color: [f32; 3], roughness: f32) -> Self {
        Self {
            color,
            roughness: roughness.clamp(0.0, 1.0),
            albedo_texture: TextureHandle::NULL,
            roughness_texture: TextureHandle::NULL,
            normal_texture: TextureHandle::NULL,
        }
    }

    /// Set the albedo texture
    pub fn with_albedo(mut self, texture: TextureHandle) -> Self {
        self.albedo_texture = texture;
        self
    }

    /// Set the roughness texture
    pub fn with_roughness_texture(mut self, texture: TextureHandle) -> Self {
        self.roughness_texture = texture;
        self
    }

    /// Set the normal map
    pub fn with_normal(mut self, texture: TextureHandle) -> Self {
        self.normal_texture = texture;
        self
    }

    /// Texture slots in albedo, roughness, normal order
    pub fn textures(&self) -> [TextureHandle; 3] {
        [self.albedo_texture, self.roughness_texture, self.normal_texture]
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new([1.0, 1.0, 1.0], 0.5)
    }
}

impl Release for Material {}
