//! # Scene Runtime
//!
//! Scene storage for a Vulkan renderer: primitives, lights, materials and
//! textures behind stable, generation-stamped handles, with per-category dirty
//! tracking so the renderer only re-uploads what changed.
//!
//! ## Features
//!
//! - **Handle Indirection**: ordered, tightly packed storage that survives growth and removal
//! - **Release Hooks**: GPU memory returned exactly once when a resource leaves its table
//! - **Dirty Tracking**: one bit per category, set by every mutation, cleared by the renderer
//! - **Arcball Camera**: orbit, pan and zoom with explicit controller state
//! - **Headless Backend**: run and test a scene without a device
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_runtime::prelude::*;
//!
//! fn main() -> Result<(), SceneError> {
//!     let mut scene = Scene::new(HeadlessAllocator::new(), 0.01, 100.0)?;
//!     let material = scene.default_material();
//!     scene.add_cube(Mat4::identity(), material, false)?;
//!     scene.create_point_light(Vec3::new(1.0, 1.0, 1.0), Vec3::new(0.0, 4.0, 0.0))?;
//!
//!     let mut sync = FrameSync::new();
//!     let report = sync.sync(&mut scene);
//!     assert!(scene.dirty_flags().is_empty());
//!     println!("synced {:?}", report.synced);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod backend;
pub mod config;
pub mod debug;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for scene users
pub mod prelude {
    pub use crate::{
        assets::{AssetError, AssetLoader, FileGeometry, FileSystemLoader, ImageData},
        backend::{GpuAllocator, GpuError, HeadlessAllocator, Release},
        config::{ArcballConfig, Config, SceneConfig},
        debug::ConsoleCommands,
        foundation::{
            collections::{Handle, SlotMap},
            math::{Mat4, Mat4Ext, Vec3},
        },
        render::{
            FrameSync, Geometry, Light, LightHandle, LightType, Material, MaterialHandle, Primitive, PrimitiveHandle,
            PrimitiveList, Texture, TextureHandle,
        },
        scene::{ArcballController, ArcballInput, Camera, DirtyFlags, PinnedSlot, Scene, SceneError, SceneResult},
    };
}
