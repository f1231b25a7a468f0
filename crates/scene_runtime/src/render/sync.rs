//! Per-frame scene synchronization
//!
//! [`FrameSync`] is the renderer's side of the dirty-flag contract: it reads
//! the scene's dirty bits, repacks only the dirty categories into GPU-layout
//! records, and clears the dirt. Records are `#[repr(C)]` and `Pod` so they
//! can be written straight into a uniform or storage buffer with
//! [`bytemuck::cast_slice`].

use crate::backend::{GpuAllocator, ResourceId};
use crate::render::{Light, Material, Primitive, TextureHandle};
use crate::scene::{DirtyFlags, Scene};
use bytemuck::{Pod, Zeroable};

/// Texture index written for an empty or unresolvable texture slot
pub const NO_TEXTURE: u32 = u32::MAX;

/// Light data as seen by shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct LightRecord {
    /// Position (xyz, w = 1)
    pub position: [f32; 4],
    /// Direction (xyz, w = 0)
    pub direction: [f32; 4],
    /// Color (rgb) and intensity (a)
    pub color: [f32; 4],
    /// 0 = point, 1 = directional
    pub kind: u32,
    /// Padding to 16-byte alignment
    pub _padding: [u32; 3],
}

/// Material data as seen by shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct MaterialRecord {
    /// Color (rgb) and roughness (a)
    pub color_roughness: [f32; 4],
    /// Dense texture index of the albedo map, or [`NO_TEXTURE`]
    pub albedo: u32,
    /// Dense texture index of the roughness map, or [`NO_TEXTURE`]
    pub roughness: u32,
    /// Dense texture index of the normal map, or [`NO_TEXTURE`]
    pub normal: u32,
    /// Padding to 16-byte alignment
    pub _padding: u32,
}

/// Per-primitive draw data
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PrimitiveRecord {
    /// Model matrix, column major
    pub xform: [[f32; 4]; 4],
    /// Dense material index
    pub material: u32,
    /// Padding to 16-byte alignment
    pub _padding: [u32; 3],
}

/// Camera matrices, column major
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct CameraRecord {
    /// World to camera
    pub view: [[f32; 4]; 4],
    /// Camera to clip
    pub projection: [[f32; 4]; 4],
    /// Camera to world
    pub xform: [[f32; 4]; 4],
}

/// What one call to [`FrameSync::sync`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Frame counter after this sync
    pub frame: u64,
    /// Dirty bits that were consumed
    pub synced: DirtyFlags,
}

impl SyncReport {
    /// Whether nothing needed re-uploading
    pub fn is_clean(&self) -> bool {
        self.synced.is_empty()
    }
}

/// Renderer-side mirror of the scene in GPU layout
#[derive(Debug, Default)]
pub struct FrameSync {
    primitives: Vec<PrimitiveRecord>,
    lights: Vec<LightRecord>,
    materials: Vec<MaterialRecord>,
    textures: Vec<ResourceId>,
    camera: CameraRecord,
    frame: u64,
}

impl FrameSync {
    /// Create an empty mirror
    pub fn new() -> Self {
        Self::default()
    }

    /// Repack the dirty categories of `scene` and clear its dirt
    pub fn sync<A: GpuAllocator>(&mut self, scene: &mut Scene<A>) -> SyncReport {
        let dirt = scene.dirty_flags();
        let view: &Scene<A> = scene;
        self.frame += 1;

        if dirt.intersects(DirtyFlags::PRIMS | DirtyFlags::XFORMS | DirtyFlags::MATERIALS) {
            // Material removal shifts material indices, so primitives follow materials.
            self.primitives = view.primitives().iter().map(|prim| primitive_record(view, prim)).collect();
        }
        if dirt.contains(DirtyFlags::LIGHTS) {
            self.lights = view.lights().iter().map(light_record).collect();
        }
        if dirt.intersects(DirtyFlags::MATERIALS | DirtyFlags::TEXTURES) {
            self.materials = view.materials().iter().map(|mat| material_record(view, mat)).collect();
        }
        if dirt.contains(DirtyFlags::TEXTURES) {
            self.textures = view.textures().iter().map(|tex| tex.image.id).collect();
        }
        if dirt.intersects(DirtyFlags::CAMERA) {
            let camera = view.camera();
            self.camera = CameraRecord {
                view: camera.view.into(),
                projection: camera.projection.into(),
                xform: camera.xform.into(),
            };
        }

        scene.clear_dirt();
        log::trace!("Frame {} synced {:?}", self.frame, dirt);
        SyncReport {
            frame: self.frame,
            synced: dirt,
        }
    }

    /// Primitive records in dense order
    pub fn primitives(&self) -> &[PrimitiveRecord] {
        &self.primitives
    }

    /// Light records in dense order
    pub fn lights(&self) -> &[LightRecord] {
        &self.lights
    }

    /// Material records in dense order
    pub fn materials(&self) -> &[MaterialRecord] {
        &self.materials
    }

    /// Texture images in dense order
    pub fn texture_images(&self) -> &[ResourceId] {
        &self.textures
    }

    /// Camera record
    pub fn camera(&self) -> &CameraRecord {
        &self.camera
    }

    /// Light records as raw bytes for upload
    pub fn light_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.lights)
    }

    /// Material records as raw bytes for upload
    pub fn material_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.materials)
    }

    /// Primitive records as raw bytes for upload
    pub fn primitive_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.primitives)
    }

    /// Frames synchronized so far
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

fn light_record(light: &Light) -> LightRecord {
    LightRecord {
        position: [light.position.x, light.position.y, light.position.z, 1.0],
        direction: [light.direction.x, light.direction.y, light.direction.z, 0.0],
        color: [light.color.x, light.color.y, light.color.z, light.intensity],
        kind: light.light_type.tag(),
        _padding: [0; 3],
    }
}

fn material_record<A: GpuAllocator>(scene: &Scene<A>, material: &Material) -> MaterialRecord {
    let [albedo, roughness, normal] = material.textures().map(|texture| texture_slot(scene, texture));
    MaterialRecord {
        color_roughness: [material.color[0], material.color[1], material.color[2], material.roughness],
        albedo,
        roughness,
        normal,
        _padding: 0,
    }
}

fn texture_slot<A: GpuAllocator>(scene: &Scene<A>, texture: TextureHandle) -> u32 {
    if texture.is_null() {
        return NO_TEXTURE;
    }
    match scene.texture_index(texture) {
        Ok(index) => index as u32,
        Err(e) => {
            log::warn!("Material samples a removed texture: {}", e);
            NO_TEXTURE
        }
    }
}

fn primitive_record<A: GpuAllocator>(scene: &Scene<A>, prim: &Primitive) -> PrimitiveRecord {
    let material = scene
        .material_index(prim.material)
        .or_else(|e| {
            log::warn!("Primitive bound to a removed material, using default: {}", e);
            scene.material_index(scene.default_material())
        })
        .unwrap_or_else(|e| {
            log::warn!("Default material unresolvable, using index 0: {}", e);
            0
        });
    PrimitiveRecord {
        xform: prim.xform.into(),
        material: material as u32,
        _padding: [0; 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessAllocator;
    use crate::foundation::math::{Mat4, Vec3};

    fn scene() -> Scene<HeadlessAllocator> {
        Scene::new(HeadlessAllocator::new(), 0.01, 100.0).unwrap()
    }

    #[test]
    fn test_first_sync_packs_everything_and_clears_dirt() {
        let mut scene = scene();
        let material = scene.default_material();
        scene.add_cube(Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0)), material, false).unwrap();
        scene.add_point_light(Vec3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 0.5, 0.25), 2.0).unwrap();

        let mut sync = FrameSync::new();
        let report = sync.sync(&mut scene);

        assert_eq!(report.synced, DirtyFlags::all());
        assert!(scene.dirty_flags().is_empty());
        assert_eq!(sync.primitives().len(), 1);
        assert_eq!(sync.primitives()[0].xform[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(sync.lights()[0].color, [1.0, 0.5, 0.25, 2.0]);
        assert_eq!(sync.lights()[0].kind, 0);
        assert_eq!(sync.materials().len(), 1);
        assert_eq!(sync.materials()[0].albedo, 0);
        assert_eq!(sync.materials()[0].normal, NO_TEXTURE);
        assert_eq!(sync.texture_images().len(), 1);
        assert_eq!(sync.light_bytes().len(), std::mem::size_of::<LightRecord>());
    }

    #[test]
    fn test_clean_frame_leaves_records_untouched() {
        let mut scene = scene();
        let mut sync = FrameSync::new();
        sync.sync(&mut scene);

        let report = sync.sync(&mut scene);
        assert!(report.is_clean());
        assert_eq!(report.frame, 2);
    }

    #[test]
    fn test_only_dirty_category_is_repacked() {
        let mut scene = scene();
        let light = scene.create_point_light(Vec3::new(1.0, 1.0, 1.0), Vec3::zeros()).unwrap();
        let mut sync = FrameSync::new();
        sync.sync(&mut scene);

        scene.update_light_intensity(light, 4.0).unwrap();
        let report = sync.sync(&mut scene);

        assert_eq!(report.synced, DirtyFlags::LIGHTS);
        assert_eq!(sync.lights()[0].color[3], 4.0);
    }

    #[test]
    fn test_removed_material_falls_back_to_default() {
        let mut scene = scene();
        let red = scene
            .create_material([1.0, 0.0, 0.0], 0.5, TextureHandle::NULL, TextureHandle::NULL, TextureHandle::NULL)
            .unwrap();
        scene.add_cube(Mat4::identity(), red, true).unwrap();
        scene.remove_material(red).unwrap();

        let mut sync = FrameSync::new();
        sync.sync(&mut scene);
        assert_eq!(sync.primitives()[0].material, 0);
    }

    #[test]
    fn test_sync_after_teardown_packs_nothing() {
        let mut scene = scene();
        scene.add_cube(Mat4::identity(), scene.default_material(), false).unwrap();
        let mut sync = FrameSync::new();
        sync.sync(&mut scene);

        scene.teardown();
        scene.mark_textures_dirty();
        sync.sync(&mut scene);
        assert!(sync.texture_images().is_empty());
        assert!(scene.dirty_flags().is_empty());
    }
}
