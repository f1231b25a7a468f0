//! # Scene Configuration
//!
//! Startup parameters for a [`crate::scene::Scene`]: clip planes and lens,
//! initial table capacities, the built-in default material and texture, the
//! starting camera, and the arcball controller rates.

use super::{Config, ConfigError};
use crate::foundation::math::Vec3;
use serde::{Deserialize, Serialize};

/// Largest accepted default texture edge, the minimum `maxImageDimension2D` Vulkan guarantees
pub const MAX_TEXTURE_DIM: u32 = 4096;

/// Initial capacity of each resource table
///
/// Tables double when full, so these only decide when the first growth happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Primitive table capacity
    pub primitives: usize,
    /// Light table capacity
    pub lights: usize,
    /// Material table capacity
    pub materials: usize,
    /// Texture table capacity
    pub textures: usize,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            primitives: 16,
            lights: 8,
            materials: 8,
            textures: 8,
        }
    }
}

/// Material installed at scene creation so every primitive resolves to one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultMaterialConfig {
    /// Base color (RGB)
    pub color: [f32; 3],
    /// Roughness factor
    pub roughness: f32,
    /// Edge length of the white default texture, in pixels
    pub texture_dim: u32,
}

impl Default for DefaultMaterialConfig {
    fn default() -> Self {
        Self {
            color: [0.0, 0.937, 1.0],
            roughness: 0.8,
            texture_dim: 4,
        }
    }
}

/// Camera placement at scene creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraStartConfig {
    /// Eye position
    pub eye: [f32; 3],
    /// Look-at target
    pub target: [f32; 3],
    /// Up vector
    pub up: [f32; 3],
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Viewport aspect ratio (width / height)
    pub aspect: f32,
}

impl Default for CameraStartConfig {
    fn default() -> Self {
        Self {
            eye: [1.0, 1.0, 2.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov_degrees: 45.0,
            aspect: 1.0,
        }
    }
}

impl CameraStartConfig {
    /// Eye position as a vector
    pub fn eye(&self) -> Vec3 {
        Vec3::from(self.eye)
    }

    /// Target as a vector
    pub fn target(&self) -> Vec3 {
        Vec3::from(self.target)
    }

    /// Up vector as a vector
    pub fn up(&self) -> Vec3 {
        Vec3::from(self.up)
    }
}

/// Arcball controller rates and home pose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcballConfig {
    /// Fraction of the eye-target distance moved per zoom tick
    pub zoom_rate: f32,
    /// Pan speed multiplier
    pub pan_rate: f32,
    /// Tumble speed multiplier
    pub tumble_rate: f32,
    /// Eye position restored by the home action
    pub home_eye: [f32; 3],
    /// Target restored by the home action
    pub home_target: [f32; 3],
    /// Up vector restored by the home action
    pub home_up: [f32; 3],
}

impl Default for ArcballConfig {
    fn default() -> Self {
        Self {
            zoom_rate: 0.005,
            pan_rate: 0.1,
            tumble_rate: 2.0,
            home_eye: [0.0, 0.0, 1.0],
            home_target: [0.0, 0.0, 0.0],
            home_up: [0.0, 1.0, 0.0],
        }
    }
}

impl Config for ArcballConfig {}

/// # Scene Configuration
///
/// Top-level configuration for scene creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Distance to the near clipping plane
    pub near_clip: f32,
    /// Distance to the far clipping plane
    pub far_clip: f32,
    /// Initial table capacities
    pub capacities: CapacityConfig,
    /// Built-in default material
    pub default_material: DefaultMaterialConfig,
    /// Starting camera
    pub camera: CameraStartConfig,
    /// Arcball controller settings
    pub arcball: ArcballConfig,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            near_clip: 0.01,
            far_clip: 100.0,
            capacities: CapacityConfig::default(),
            default_material: DefaultMaterialConfig::default(),
            camera: CameraStartConfig::default(),
            arcball: ArcballConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl SceneConfig {
    /// Set the clip planes
    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near_clip = near;
        self.far_clip = far;
        self
    }

    /// Set the initial table capacities
    pub fn with_capacities(mut self, capacities: CapacityConfig) -> Self {
        self.capacities = capacities;
        self
    }

    /// Set the default log filter
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.near_clip > 0.0) {
            return Err(ConfigError::Invalid(format!("near_clip must be positive, got {}", self.near_clip)));
        }
        if !(self.far_clip > self.near_clip) {
            return Err(ConfigError::Invalid(format!(
                "far_clip ({}) must be greater than near_clip ({})",
                self.far_clip, self.near_clip
            )));
        }
        if !(self.camera.aspect > 0.0) || !(self.camera.fov_degrees > 0.0 && self.camera.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid("camera lens parameters out of range".to_string()));
        }
        let dim = self.default_material.texture_dim;
        if dim == 0 || dim > MAX_TEXTURE_DIM {
            return Err(ConfigError::Invalid(format!(
                "default texture dimension must be in 1..={MAX_TEXTURE_DIM}, got {dim}"
            )));
        }
        if (self.camera.target() - self.camera.eye()).norm() <= f32::EPSILON {
            return Err(ConfigError::Invalid("camera eye and target coincide".to_string()));
        }
        Ok(())
    }
}

impl Config for SceneConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SceneConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capacities.primitives, 16);
        assert_eq!(config.capacities.lights, 8);
        assert_eq!(config.default_material.texture_dim, 4);
    }

    #[test]
    fn test_default_texture_dim_bounds() {
        let mut config = SceneConfig::default();
        config.default_material.texture_dim = MAX_TEXTURE_DIM;
        assert!(config.validate().is_ok());

        config.default_material.texture_dim = MAX_TEXTURE_DIM + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.default_material.texture_dim = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_clip_planes_rejected() {
        assert!(SceneConfig::default().with_clip(0.0, 10.0).validate().is_err());
        assert!(SceneConfig::default().with_clip(5.0, 1.0).validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SceneConfig = toml::from_str(
            "near_clip = 0.5\n\n[capacities]\nlights = 2\n",
        )
        .unwrap();

        assert_eq!(config.near_clip, 0.5);
        assert_eq!(config.far_clip, 100.0);
        assert_eq!(config.capacities.lights, 2);
        assert_eq!(config.capacities.primitives, 16);
    }

    #[test]
    fn test_ron_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("scene_config_{}.ron", std::process::id()));
        let path = path.to_string_lossy().to_string();

        let config = SceneConfig::default().with_clip(0.1, 50.0).with_log_level("debug");
        config.save_to_file(&path).unwrap();
        let loaded = SceneConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        assert!(matches!(
            SceneConfig::default().save_to_file("scene.json"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let config = SceneConfig::load_or_default("/nonexistent/scene.toml").unwrap();
        assert_eq!(config, SceneConfig::default());
    }
}
