//! # Render Resources
//!
//! Value types stored in the scene's resource tables, plus the renderer-side
//! [`sync::FrameSync`] that turns dirty categories into GPU-layout records.
//!
//! ## Architecture
//!
//! - **Primitive**: device geometry + model transform + material binding
//! - **Light**: point or directional light
//! - **Material**: base color, roughness and three texture slots
//! - **Texture**: device image, optionally with its host staging copy
//!
//! Every type implements [`crate::backend::Release`], so a resource table can
//! return its GPU memory when the value is evicted.

pub mod geometry;
pub mod lighting;
pub mod material;
pub mod primitive;
pub mod sync;
pub mod texture;

pub use geometry::Geometry;
pub use lighting::{Light, LightType};
pub use material::Material;
pub use primitive::{Primitive, PrimitiveList};
pub use sync::{CameraRecord, FrameSync, LightRecord, MaterialRecord, PrimitiveRecord, SyncReport};
pub use texture::Texture;

use crate::foundation::collections::Handle;

/// Handle to a primitive in a scene
pub type PrimitiveHandle = Handle<Primitive>;

/// Handle to a light in a scene
pub type LightHandle = Handle<Light>;

/// Handle to a material in a scene
pub type MaterialHandle = Handle<Material>;

/// Handle to a texture in a scene
pub type TextureHandle = Handle<Texture>;
