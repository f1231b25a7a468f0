//! # Backend Module
//!
//! GPU-facing collaborator interfaces and their implementations.
//!
//! ## Organization
//!
//! - **Memory**: the [`GpuAllocator`] interface the scene allocates and frees
//!   through, the resource descriptors it returns, and the [`Release`] hook
//! - **Headless**: a device-less allocator used for tests and offline runs

pub mod headless;
pub mod memory;

pub use headless::{AllocatorStats, HeadlessAllocator};
pub use memory::{
    texel_size, BufferRegion, GpuAllocator, GpuError, GpuImage, GpuResult, ImageDesc, MemoryType, Release,
    ResourceId,
};
