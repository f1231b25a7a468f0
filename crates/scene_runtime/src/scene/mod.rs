//! Scene management
//!
//! Handle-based storage for everything the renderer draws, with per-category
//! dirty tracking.
//!
//! ## Architecture
//!
//! ```text
//! Application code
//!      ↓  handles
//! Scene (dirty flags, camera)
//!      ↓
//! ResourceTable<T> × 4 (release hooks)
//!      ↓
//! SlotMap<T> (handle → dense index)
//! ```
//!
//! The renderer reads the dirty flags once per frame, re-uploads the dense
//! arrays of the dirty categories and clears the flags.

mod camera;
mod dirty;
mod error;
mod pinned;
mod resource_table;
#[allow(clippy::module_inception)]
mod scene;


pub use camera::{ArcballController, ArcballInput, Camera};
pub use dirty::DirtyFlags;
pub use error::{ResourceKind, SceneError, SceneResult};
pub use pinned::PinnedSlot;
pub use resource_table::ResourceTable;
pub use scene::Scene;
