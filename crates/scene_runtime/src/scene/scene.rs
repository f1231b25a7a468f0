//! # Scene
//!
//! Owns the four resource tables, the camera and the dirty flags.
//!
//! Application code mutates the scene through handles; every successful
//! mutation marks its category dirty. The renderer reads [`Scene::dirty_flags`],
//! re-synchronizes the dense arrays of the dirty categories, and calls
//! [`Scene::clear_dirt`].
//!
//! ```text
//! add/update/remove ──► ResourceTable ──► SlotMap
//!         │                  └─ release hook ──► GpuAllocator
//!         └─► dirt |= CATEGORY
//! ```

use super::camera::{ArcballController, ArcballInput, Camera};
use super::dirty::DirtyFlags;
use super::error::{ResourceKind, SceneError, SceneResult};
use super::pinned::PinnedSlot;
use super::resource_table::ResourceTable;
use crate::assets::{AssetError, AssetLoader, FileGeometry};
use crate::backend::{GpuAllocator, GpuImage, ImageDesc, Release};
use crate::config::{ConfigError, SceneConfig};
use crate::foundation::math::{Mat4, Vec3};
use crate::render::{
    Geometry, Light, LightHandle, Material, MaterialHandle, Primitive, PrimitiveHandle, Texture, TextureHandle,
};
use ash::vk;
use std::path::Path;

/// Scene graph storage
///
/// Generic over the allocator that backs primitive geometry and texture images.
/// All live resources are released by [`Scene::teardown`], which also runs on drop.
pub struct Scene<A: GpuAllocator> {
    allocator: A,
    primitives: ResourceTable<Primitive>,
    lights: ResourceTable<Light>,
    materials: ResourceTable<Material>,
    textures: ResourceTable<Texture>,
    camera: Camera,
    dirt: DirtyFlags,
    default_material: MaterialHandle,
    default_texture: TextureHandle,
    torn_down: bool,
}

impl<A: GpuAllocator> Scene<A> {
    /// Create a scene with default settings and the given clip planes
    pub fn new(allocator: A, near_clip: f32, far_clip: f32) -> SceneResult<Self> {
        Self::with_config(allocator, &SceneConfig::default().with_clip(near_clip, far_clip))
    }

    /// Create a scene from a configuration
    ///
    /// Installs the default texture (solid white, host copy retained) and the
    /// default material sampling it, then marks every category dirty. The
    /// configuration is validated first.
    pub fn with_config(allocator: A, config: &SceneConfig) -> SceneResult<Self> {
        config.validate()?;
        let capacities = &config.capacities;
        let mut scene = Self {
            allocator,
            primitives: ResourceTable::new(ResourceKind::Primitive, capacities.primitives),
            lights: ResourceTable::new(ResourceKind::Light, capacities.lights),
            materials: ResourceTable::new(ResourceKind::Material, capacities.materials),
            textures: ResourceTable::new(ResourceKind::Texture, capacities.textures),
            camera: Camera::new(&config.camera, config.near_clip, config.far_clip),
            dirt: DirtyFlags::empty(),
            default_material: MaterialHandle::NULL,
            default_texture: TextureHandle::NULL,
            torn_down: false,
        };

        let dim = config.default_material.texture_dim;
        let desc = ImageDesc::sampled_color(dim, dim, vk::Format::R8G8B8A8_UNORM);
        let size = usize::try_from(desc.byte_size()?)
            .map_err(|_| ConfigError::Invalid(format!("default texture {dim}x{dim} does not fit in memory")))?;
        let white = vec![u8::MAX; size];
        let (image, host_buffer) = scene.allocator.upload_image(&desc, &white, true)?;
        scene.default_texture = scene.add_texture(Texture { image, host_buffer })?;

        let material = &config.default_material;
        scene.default_material =
            scene.add_material(Material::new(material.color, material.roughness).with_albedo(scene.default_texture))?;

        scene.dirt = DirtyFlags::all();
        log::info!(
            "Scene created (near {}, far {}, capacities {}/{}/{}/{})",
            config.near_clip,
            config.far_clip,
            capacities.primitives,
            capacities.lights,
            capacities.materials,
            capacities.textures
        );
        Ok(scene)
    }

    // ========================================================================
    // Primitives
    // ========================================================================

    /// Add a primitive from uploaded geometry
    ///
    /// On failure the geometry is released and the scene is unchanged.
    pub fn add_primitive(&mut self, geometry: Geometry, xform: Mat4, material: MaterialHandle) -> SceneResult<PrimitiveHandle> {
        if let Err(e) = self.ensure_live().and_then(|()| self.materials.index_of(material).map(|_| ())) {
            self.free_geometry_quietly(&geometry);
            return Err(e);
        }
        let regions = geometry.clone();
        match self.primitives.add(Primitive::new(geometry, xform, material)) {
            Ok(handle) => {
                self.dirt |= DirtyFlags::PRIMS;
                Ok(handle)
            }
            Err(e) => {
                self.free_geometry_quietly(&regions);
                Err(e)
            }
        }
    }

    /// Add a primitive with no geometry yet
    ///
    /// Geometry can be attached later through [`Scene::set_geometry_at`].
    pub fn reserve_primitive(&mut self, xform: Mat4, material: MaterialHandle) -> SceneResult<PrimitiveHandle> {
        self.ensure_live()?;
        self.materials.index_of(material)?;
        let handle = self.primitives.add(Primitive::empty(xform, material))?;
        self.dirt |= DirtyFlags::PRIMS;
        Ok(handle)
    }

    /// Load a geometry file, upload it and add it as a primitive
    ///
    /// Any load or upload failure leaves the scene unchanged.
    pub fn load_primitive(
        &mut self,
        loader: &dyn AssetLoader,
        path: impl AsRef<Path>,
        xform: Mat4,
        material: MaterialHandle,
    ) -> SceneResult<PrimitiveHandle> {
        let path = path.as_ref();
        self.ensure_live()?;
        self.materials.index_of(material)?;
        let file_geometry = loader.load_geometry(path)?;
        let geometry = Geometry::upload(&mut self.allocator, &file_geometry)?;
        let handle = self.add_primitive(geometry, xform, material)?;
        log::info!("Loaded primitive at {}", path.display());
        Ok(handle)
    }

    /// Add the built-in unit cube
    pub fn add_cube(&mut self, xform: Mat4, material: MaterialHandle, clockwise: bool) -> SceneResult<PrimitiveHandle> {
        self.ensure_live()?;
        self.materials.index_of(material)?;
        let geometry = Geometry::upload(&mut self.allocator, &FileGeometry::cube(clockwise))?;
        self.add_primitive(geometry, xform, material)
    }

    /// Remove a primitive, releasing its geometry
    pub fn remove_primitive(&mut self, handle: PrimitiveHandle) -> SceneResult<()> {
        self.primitives.remove(handle, &mut self.allocator)?;
        self.dirt |= DirtyFlags::PRIMS;
        Ok(())
    }

    /// Post-multiply a primitive's transform by `delta`
    pub fn update_primitive_xform(&mut self, handle: PrimitiveHandle, delta: &Mat4) -> SceneResult<()> {
        self.primitives.update(handle, |prim| prim.xform *= delta)?;
        self.dirt |= DirtyFlags::PRIMS | DirtyFlags::XFORMS;
        Ok(())
    }

    /// Bind a primitive to a material
    pub fn bind_primitive_to_material(&mut self, primitive: PrimitiveHandle, material: MaterialHandle) -> SceneResult<()> {
        self.materials.index_of(material)?;
        self.primitives.update(primitive, |prim| prim.material = material)?;
        self.dirt |= DirtyFlags::PRIMS;
        Ok(())
    }

    // ========================================================================
    // Lights
    // ========================================================================

    /// Add a light
    pub fn add_light(&mut self, light: Light) -> SceneResult<LightHandle> {
        self.ensure_live()?;
        let handle = self.lights.add(light)?;
        self.dirt |= DirtyFlags::LIGHTS;
        Ok(handle)
    }

    /// Add a point light
    pub fn add_point_light(&mut self, position: Vec3, color: Vec3, intensity: f32) -> SceneResult<LightHandle> {
        self.add_light(Light::point(position, color, intensity))
    }

    /// Add a directional light
    pub fn add_direction_light(&mut self, direction: Vec3, color: Vec3, intensity: f32) -> SceneResult<LightHandle> {
        self.add_light(Light::directional(direction, color, intensity))
    }

    /// Add a point light of unit intensity
    pub fn create_point_light(&mut self, color: Vec3, position: Vec3) -> SceneResult<LightHandle> {
        self.add_point_light(position, color, 1.0)
    }

    /// Add a directional light of unit intensity
    pub fn create_direction_light(&mut self, color: Vec3, direction: Vec3) -> SceneResult<LightHandle> {
        self.add_direction_light(direction, color, 1.0)
    }

    /// Remove a light
    pub fn remove_light(&mut self, handle: LightHandle) -> SceneResult<()> {
        self.lights.remove(handle, &mut self.allocator)?;
        self.dirt |= DirtyFlags::LIGHTS;
        Ok(())
    }

    /// Set a light's color
    pub fn update_light_color(&mut self, handle: LightHandle, color: Vec3) -> SceneResult<()> {
        self.lights.update(handle, |light| light.color = color)?;
        self.dirt |= DirtyFlags::LIGHTS;
        Ok(())
    }

    /// Set a light's position
    ///
    /// Only point lights are affected visually; a directional light stores the
    /// position but keeps its direction.
    pub fn update_light_position(&mut self, handle: LightHandle, position: Vec3) -> SceneResult<()> {
        self.lights.update(handle, |light| light.position = position)?;
        self.dirt |= DirtyFlags::LIGHTS;
        Ok(())
    }

    /// Set a light's intensity
    pub fn update_light_intensity(&mut self, handle: LightHandle, intensity: f32) -> SceneResult<()> {
        self.lights.update(handle, |light| light.intensity = intensity)?;
        self.dirt |= DirtyFlags::LIGHTS;
        Ok(())
    }

    // ========================================================================
    // Materials
    // ========================================================================

    /// Add a material
    ///
    /// Every non-null texture slot must refer to a live texture.
    pub fn add_material(&mut self, material: Material) -> SceneResult<MaterialHandle> {
        self.ensure_live()?;
        for texture in material.textures() {
            if !texture.is_null() {
                self.textures.index_of(texture)?;
            }
        }
        let handle = self.materials.add(material)?;
        self.dirt |= DirtyFlags::MATERIALS;
        Ok(handle)
    }

    /// Add a material from its parts
    pub fn create_material(
        &mut self,
        color: [f32; 3],
        roughness: f32,
        albedo: TextureHandle,
        roughness_texture: TextureHandle,
        normal: TextureHandle,
    ) -> SceneResult<MaterialHandle> {
        self.add_material(
            Material::new(color, roughness)
                .with_albedo(albedo)
                .with_roughness_texture(roughness_texture)
                .with_normal(normal),
        )
    }

    /// Remove a material
    ///
    /// The default material cannot be removed. Primitives still bound to the
    /// removed material fail to resolve it afterwards.
    pub fn remove_material(&mut self, handle: MaterialHandle) -> SceneResult<()> {
        if handle == self.default_material {
            return Err(SceneError::DefaultResource(ResourceKind::Material));
        }
        self.materials.remove(handle, &mut self.allocator)?;
        self.dirt |= DirtyFlags::MATERIALS;
        Ok(())
    }

    // ========================================================================
    // Textures
    // ========================================================================

    /// Add a texture
    ///
    /// A torn-down scene releases the texture instead of storing it.
    pub fn add_texture(&mut self, mut texture: Texture) -> SceneResult<TextureHandle> {
        if let Err(e) = self.ensure_live() {
            if let Err(free_err) = texture.release(&mut self.allocator) {
                log::warn!("Failed to release texture {:?}: {}", texture.image.id, free_err);
            }
            return Err(e);
        }
        let handle = self.textures.add(texture)?;
        self.dirt |= DirtyFlags::TEXTURES;
        Ok(handle)
    }

    /// Add a texture wrapping an existing device image
    pub fn create_texture(&mut self, image: GpuImage) -> SceneResult<TextureHandle> {
        self.add_texture(Texture::new(image))
    }

    /// Load an image file into a new sampled texture
    ///
    /// One channel maps to `R8_UNORM`; three or four channels map to
    /// `R8G8B8A8_UNORM`, with RGB data expanded to opaque RGBA. Other channel
    /// counts fail with `UnsupportedFormat` before the file is read.
    pub fn load_texture(&mut self, loader: &dyn AssetLoader, path: impl AsRef<Path>, channels: u8) -> SceneResult<TextureHandle> {
        let path = path.as_ref();
        self.ensure_live()?;
        let format = match channels {
            1 => vk::Format::R8_UNORM,
            3 | 4 => vk::Format::R8G8B8A8_UNORM,
            _ => return Err(SceneError::UnsupportedFormat { channels }),
        };

        let pixels = loader.load_image(path, channels)?.into_rgba_if_rgb();
        let desc = ImageDesc::sampled_color(pixels.width, pixels.height, format);
        let expected = desc.byte_size()?;
        if pixels.size_bytes() as u64 != expected {
            return Err(AssetError::InvalidData(format!(
                "{} decoded to {} bytes, expected {}",
                path.display(),
                pixels.size_bytes(),
                expected
            ))
            .into());
        }

        let (image, _) = self.allocator.upload_image(&desc, &pixels.data, false)?;
        let id = image.id;
        match self.add_texture(Texture::new(image.clone())) {
            Ok(handle) => {
                log::info!("Loaded texture {} ({}x{}, {:?})", path.display(), image.width, image.height, id);
                Ok(handle)
            }
            Err(e) => {
                if let Err(free_err) = self.allocator.free_image(&image) {
                    log::warn!("Failed to free image {:?} after texture add error: {}", id, free_err);
                }
                Err(e)
            }
        }
    }

    /// Like [`Scene::load_texture`], but an unsupported channel count yields
    /// [`TextureHandle::NULL`] instead of an error
    pub fn load_texture_or_null(
        &mut self,
        loader: &dyn AssetLoader,
        path: impl AsRef<Path>,
        channels: u8,
    ) -> SceneResult<TextureHandle> {
        match self.load_texture(loader, path, channels) {
            Err(SceneError::UnsupportedFormat { channels }) => {
                log::warn!("Channel count {} not supported, using null texture", channels);
                Ok(TextureHandle::NULL)
            }
            other => other,
        }
    }

    /// Remove a texture, releasing its image
    ///
    /// The default texture cannot be removed. Materials still sampling the
    /// removed texture fail to resolve it afterwards.
    pub fn remove_texture(&mut self, handle: TextureHandle) -> SceneResult<()> {
        if handle == self.default_texture {
            return Err(SceneError::DefaultResource(ResourceKind::Texture));
        }
        self.textures.remove(handle, &mut self.allocator)?;
        self.dirt |= DirtyFlags::TEXTURES;
        Ok(())
    }

    /// Force the renderer to re-synchronize textures
    pub fn mark_textures_dirty(&mut self) {
        self.dirt |= DirtyFlags::TEXTURES;
    }

    // ========================================================================
    // Camera
    // ========================================================================

    /// Place the camera at `eye` looking at `target`
    pub fn update_camera_look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.camera.look_at(eye, target, up);
        self.dirt |= DirtyFlags::CAMERA_VIEW;
        log::trace!("Camera look-at eye {:?} target {:?}", eye, target);
    }

    /// Apply one frame of arcball input to the camera
    pub fn update_camera_arcball(&mut self, controller: &mut ArcballController, input: &ArcballInput) {
        let (eye, target, up) = controller.update(&self.camera.xform, input);
        self.update_camera_look_at(eye, target, up);
    }

    /// Replace the view matrix
    ///
    /// A singular matrix is ignored with a warning.
    pub fn set_camera_view(&mut self, view: Mat4) {
        if self.camera.set_view(view) {
            self.dirt |= DirtyFlags::CAMERA_VIEW;
        } else {
            log::warn!("Ignoring singular camera view matrix");
        }
    }

    /// Replace the projection matrix
    pub fn set_camera_projection(&mut self, projection: Mat4) {
        self.camera.projection = projection;
        self.dirt |= DirtyFlags::CAMERA_PROJECTION;
    }

    /// Change the field of view and aspect ratio
    pub fn set_camera_lens(&mut self, fov_y: f32, aspect: f32) {
        self.camera.set_lens(fov_y, aspect);
        self.dirt |= DirtyFlags::CAMERA_PROJECTION;
    }

    /// Camera record
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// World-to-camera matrix
    pub fn camera_view(&self) -> Mat4 {
        self.camera.view
    }

    /// Projection matrix
    pub fn camera_projection(&self) -> Mat4 {
        self.camera.projection
    }

    // ========================================================================
    // Dirty tracking
    // ========================================================================

    /// Categories changed since the last [`Scene::clear_dirt`]
    pub fn dirty_flags(&self) -> DirtyFlags {
        self.dirt
    }

    /// Clear every dirty bit
    pub fn clear_dirt(&mut self) {
        self.dirt = DirtyFlags::empty();
    }

    // ========================================================================
    // Renderer read side
    // ========================================================================

    /// Live primitives in dense order
    pub fn primitives(&self) -> &[Primitive] {
        self.primitives.as_slice()
    }

    /// Live lights in dense order
    pub fn lights(&self) -> &[Light] {
        self.lights.as_slice()
    }

    /// Live materials in dense order
    pub fn materials(&self) -> &[Material] {
        self.materials.as_slice()
    }

    /// Live textures in dense order
    pub fn textures(&self) -> &[Texture] {
        self.textures.as_slice()
    }

    /// Primitive table
    pub fn primitive_table(&self) -> &ResourceTable<Primitive> {
        &self.primitives
    }

    /// Light table
    pub fn light_table(&self) -> &ResourceTable<Light> {
        &self.lights
    }

    /// Material table
    pub fn material_table(&self) -> &ResourceTable<Material> {
        &self.materials
    }

    /// Texture table
    pub fn texture_table(&self) -> &ResourceTable<Texture> {
        &self.textures
    }

    /// Primitive for `handle`
    pub fn primitive(&self, handle: PrimitiveHandle) -> SceneResult<&Primitive> {
        self.primitives.get(handle)
    }

    /// Light for `handle`
    pub fn light(&self, handle: LightHandle) -> SceneResult<&Light> {
        self.lights.get(handle)
    }

    /// Material for `handle`
    pub fn material(&self, handle: MaterialHandle) -> SceneResult<&Material> {
        self.materials.get(handle)
    }

    /// Texture for `handle`
    pub fn texture(&self, handle: TextureHandle) -> SceneResult<&Texture> {
        self.textures.get(handle)
    }

    /// Dense position of a material
    pub fn material_index(&self, handle: MaterialHandle) -> SceneResult<usize> {
        self.materials.index_of(handle)
    }

    /// Dense position of a texture
    pub fn texture_index(&self, handle: TextureHandle) -> SceneResult<usize> {
        self.textures.index_of(handle)
    }

    /// Material installed at creation
    pub fn default_material(&self) -> MaterialHandle {
        self.default_material
    }

    /// Texture installed at creation
    pub fn default_texture(&self) -> TextureHandle {
        self.default_texture
    }

    /// Allocator backing the scene
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Mutable allocator, e.g. for uploading geometry before [`Scene::add_primitive`]
    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    // ========================================================================
    // Pinned slots
    // ========================================================================

    /// Pin the current dense position of a primitive
    ///
    /// The pin is honoured until the next insert or remove on the primitive table.
    pub fn pin_primitive(&self, handle: PrimitiveHandle) -> SceneResult<PinnedSlot> {
        let index = self.primitives.index_of(handle)?;
        Ok(PinnedSlot::new(index, self.primitives.epoch()))
    }

    /// Attach geometry to the pinned primitive, releasing any it had
    ///
    /// If the pin is stale or the scene torn down, the geometry is released and
    /// an error returned. A failure to free the replaced geometry is logged and
    /// the new geometry is still installed.
    pub fn set_geometry_at(&mut self, pin: PinnedSlot, geometry: Geometry) -> SceneResult<()> {
        let index = match self.ensure_live().and_then(|()| pin.resolve(self.primitives.slots())) {
            Ok(index) => index,
            Err(e) => {
                self.free_geometry_quietly(&geometry);
                return Err(e);
            }
        };
        let Self {
            primitives, allocator, ..
        } = self;
        if let Some(prim) = primitives.slots_mut().get_at_mut(index) {
            if let Err(e) = prim.free_geometry(allocator) {
                log::warn!("Failed to release replaced geometry at index {}: {}", index, e);
            }
            prim.geometry = Some(geometry);
        }
        self.dirt |= DirtyFlags::PRIMS;
        Ok(())
    }

    /// Whether the pinned primitive has geometry
    pub fn has_geometry_at(&self, pin: PinnedSlot) -> SceneResult<bool> {
        let index = pin.resolve(self.primitives.slots())?;
        Ok(self.primitives.as_slice()[index].geometry.is_some())
    }

    /// Release the pinned primitive's geometry, leaving it empty
    pub fn free_geometry_at(&mut self, pin: PinnedSlot) -> SceneResult<()> {
        let index = pin.resolve(self.primitives.slots())?;
        let Self {
            primitives, allocator, ..
        } = self;
        if let Some(prim) = primitives.slots_mut().get_at_mut(index) {
            prim.free_geometry(allocator)?;
        }
        self.dirt |= DirtyFlags::PRIMS;
        Ok(())
    }

    /// Bind the pinned primitive to a material
    pub fn bind_primitive_to_material_at(&mut self, pin: PinnedSlot, material: MaterialHandle) -> SceneResult<()> {
        let index = pin.resolve(self.primitives.slots())?;
        self.materials.index_of(material)?;
        if let Some(prim) = self.primitives.slots_mut().get_at_mut(index) {
            prim.material = material;
        }
        self.dirt |= DirtyFlags::PRIMS;
        Ok(())
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Release every live resource and empty all tables
    ///
    /// Idempotent; also called on drop. Afterwards every operation that would
    /// add a resource fails with `TornDown`.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        let allocator = &mut self.allocator;
        let primitives = self.primitives.release_all(allocator);
        let lights = self.lights.release_all(allocator);
        let materials = self.materials.release_all(allocator);
        let textures = self.textures.release_all(allocator);
        self.default_material = MaterialHandle::NULL;
        self.default_texture = TextureHandle::NULL;
        self.torn_down = true;
        log::info!(
            "Scene torn down: released {} primitives, {} lights, {} materials, {} textures",
            primitives,
            lights,
            materials,
            textures
        );
    }

    /// Whether [`Scene::teardown`] has run
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    fn ensure_live(&self) -> SceneResult<()> {
        if self.torn_down {
            Err(SceneError::TornDown)
        } else {
            Ok(())
        }
    }

    fn free_geometry_quietly(&mut self, geometry: &Geometry) {
        if let Err(e) = geometry.free(&mut self.allocator) {
            log::warn!("Failed to release geometry: {}", e);
        }
    }
}

impl<A: GpuAllocator> Drop for Scene<A> {
    fn drop(&mut self) {
        self.teardown();
    }
}
