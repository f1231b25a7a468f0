//! Scene lights

use crate::backend::Release;
use crate::foundation::math::Vec3;

/// Light types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    /// Point light (like a lightbulb)
    Point,
    /// Directional light (like sunlight)
    Directional,
}

impl LightType {
    /// Numeric tag used in GPU light records
    pub fn tag(self) -> u32 {
        match self {
            Self::Point => 0,
            Self::Directional => 1,
        }
    }
}

/// Light source
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Light type
    pub light_type: LightType,
    /// Light position (point lights)
    pub position: Vec3,
    /// Light direction (directional lights), normalized
    pub direction: Vec3,
    /// Light color
    pub color: Vec3,
    /// Light intensity
    pub intensity: f32,
}

impl Light {
    /// Create a point light
    pub fn point(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Point,
            position,
            direction: Vec3::zeros(),
            color,
            intensity,
        }
    }

    /// Create a directional light
    ///
    /// A zero direction is kept as zero rather than normalized into NaNs.
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Directional,
            position: Vec3::zeros(),
            direction: direction.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros),
            color,
            intensity,
        }
    }
}

impl Release for Light {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_directional_light_normalizes_direction() {
        let light = Light::directional(Vec3::new(0.0, -4.0, 0.0), Vec3::new(1.0, 1.0, 1.0), 1.0);
        assert_eq!(light.light_type, LightType::Directional);
        assert_relative_eq!(light.direction, Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_zero_direction_stays_finite() {
        let light = Light::directional(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0), 1.0);
        assert!(light.direction.iter().all(|c| c.is_finite()));
    }
}
