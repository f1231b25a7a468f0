//! Scene error types

use crate::assets::AssetError;
use crate::backend::GpuError;
use crate::config::ConfigError;
use crate::foundation::collections::CollectionError;
use std::fmt;
use thiserror::Error;

/// Resource category a handle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Drawable primitive
    Primitive,
    /// Light
    Light,
    /// Material
    Material,
    /// Texture
    Texture,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Primitive => "primitive",
            Self::Light => "light",
            Self::Material => "material",
            Self::Texture => "texture",
        };
        f.write_str(name)
    }
}

/// Errors returned by scene operations
#[derive(Error, Debug)]
pub enum SceneError {
    /// Handle was never issued by this table or its value was removed
    #[error("Invalid {kind} handle: id {id}, generation {generation}")]
    InvalidHandle {
        /// Table the handle was used with
        kind: ResourceKind,
        /// Slot id carried by the handle
        id: u32,
        /// Generation carried by the handle
        generation: u32,
    },

    /// Table storage could not grow
    #[error("{kind} table exhausted: could not grow to {requested} elements")]
    ResourceExhausted {
        /// Table that failed to grow
        kind: ResourceKind,
        /// Capacity that was requested
        requested: usize,
    },

    /// No texture format exists for the requested channel count
    #[error("No texture format for {channels} channels")]
    UnsupportedFormat {
        /// Requested channel count
        channels: u8,
    },

    /// Asset loader failed; the scene is unchanged
    #[error("Load failure: {0}")]
    LoadFailure(#[from] AssetError),

    /// GPU allocator failed
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),

    /// Pinned slot taken before the table layout last changed
    #[error("Stale pinned slot at index {index}: pinned at epoch {pinned}, table at epoch {current}")]
    StaleSlot {
        /// Pinned dense position
        index: usize,
        /// Epoch recorded by the pin
        pinned: u64,
        /// Current table epoch
        current: u64,
    },

    /// Built-in default material or texture cannot be removed
    #[error("The default {0} cannot be removed")]
    DefaultResource(ResourceKind),

    /// Scene configuration was rejected
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The scene has been torn down and accepts no new resources
    #[error("Scene has been torn down")]
    TornDown,
}

impl SceneError {
    /// Attach a resource kind to a collection error
    pub fn from_collection(kind: ResourceKind, err: CollectionError) -> Self {
        match err {
            CollectionError::InvalidHandle { id, generation } => Self::InvalidHandle { kind, id, generation },
            CollectionError::ResourceExhausted { requested } => Self::ResourceExhausted { kind, requested },
        }
    }

    /// Whether the error is an invalid-handle error
    pub fn is_invalid_handle(&self) -> bool {
        matches!(self, Self::InvalidHandle { .. })
    }
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
