//! Configuration system
//!
//! Configuration structures are plain serde types; the [`Config`] trait adds
//! file loading and saving in TOML or RON, chosen by file extension.

pub mod scene;

pub use scene::{ArcballConfig, CapacityConfig, CameraStartConfig, DefaultMaterialConfig, SceneConfig, MAX_TEXTURE_DIM};
pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Load configuration from file, falling back to defaults when the file is missing
    fn load_or_default(path: &str) -> Result<Self, ConfigError> {
        match Self::load_from_file(path) {
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path);
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of its valid range
    #[error("Invalid value: {0}")]
    Invalid(String),
}
