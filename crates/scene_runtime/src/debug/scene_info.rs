//! Text dumps of scene tables
//!
//! Each dump lists the dense array of one category followed by its
//! id → index map, which is what you want to look at when a handle resolves
//! to the wrong object.

use crate::backend::GpuAllocator;
use crate::foundation::collections::SlotMap;
use crate::render::LightType;
use crate::scene::Scene;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Console command: renders some view of a scene as text
pub type SceneCommand<A> = fn(&Scene<A>) -> String;

/// Named debug commands over a scene
pub struct ConsoleCommands<A: GpuAllocator> {
    commands: BTreeMap<String, SceneCommand<A>>,
}

impl<A: GpuAllocator> ConsoleCommands<A> {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }

    /// Registry with `priminfo`, `texinfo` and `lightinfo`
    pub fn with_scene_commands() -> Self {
        let mut commands = Self::new();
        commands.register("priminfo", primitive_info::<A>);
        commands.register("texinfo", texture_info::<A>);
        commands.register("lightinfo", light_info::<A>);
        commands
    }

    /// Add or replace a command
    pub fn register(&mut self, name: impl Into<String>, command: SceneCommand<A>) {
        self.commands.insert(name.into(), command);
    }

    /// Run a command by name, `None` if it is not registered
    pub fn run(&self, name: &str, scene: &Scene<A>) -> Option<String> {
        self.commands.get(name).map(|command| command(scene))
    }

    /// Registered command names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }
}

impl<A: GpuAllocator> Default for ConsoleCommands<A> {
    fn default() -> Self {
        Self::with_scene_commands()
    }
}

/// Primitives with their material and transform
pub fn primitive_info<A: GpuAllocator>(scene: &Scene<A>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "====== Scene: primitive info =======");
    let _ = writeln!(out, "Prim count: {}", scene.primitives().len());
    for (i, prim) in scene.primitives().iter().enumerate() {
        let _ = writeln!(out, "Prim {} material {:?}", i, prim.material);
        match scene.material(prim.material) {
            Ok(mat) => {
                let _ = writeln!(
                    out,
                    "Material: color {:?} roughness {} albedo {:?}",
                    mat.color, mat.roughness, mat.albedo_texture
                );
            }
            Err(e) => {
                let _ = writeln!(out, "Material: {}", e);
            }
        }
        match &prim.geometry {
            Some(geo) => {
                let _ = writeln!(out, "Geometry: {} vertices, {} indices", geo.vertex_count, geo.index_count);
            }
            None => {
                let _ = writeln!(out, "Geometry: none");
            }
        }
        let _ = write!(out, "{}", prim.xform);
    }
    write_id_map(&mut out, "Prim map", scene.primitive_table().slots());
    out
}

/// Textures with their image extent and format
pub fn texture_info<A: GpuAllocator>(scene: &Scene<A>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "====== Scene: texture info =======");
    let _ = writeln!(out, "Texture count: {}", scene.textures().len());
    for (i, tex) in scene.textures().iter().enumerate() {
        let image = &tex.image;
        let _ = writeln!(out, "Texture index {}", i);
        let _ = writeln!(out, "Width {} Height {} Size {}", image.width, image.height, image.size);
        let _ = writeln!(out, "Format {:?}", image.format);
    }
    write_id_map(&mut out, "Texture map", scene.texture_table().slots());
    out
}

/// Lights with position or direction, color and intensity
pub fn light_info<A: GpuAllocator>(scene: &Scene<A>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "====== Scene: light info =======");
    let _ = writeln!(out, "Light count: {}", scene.lights().len());
    for (i, light) in scene.lights().iter().enumerate() {
        let (label, v) = match light.light_type {
            LightType::Point => ("P", light.position),
            LightType::Directional => ("D", light.direction),
        };
        let _ = writeln!(
            out,
            "Light index {} {} [{}, {}, {}] C [{}, {}, {}] I {}",
            i, label, v.x, v.y, v.z, light.color.x, light.color.y, light.color.z, light.intensity
        );
    }
    write_id_map(&mut out, "Light map", scene.light_table().slots());
    out
}

fn write_id_map<T>(out: &mut String, label: &str, map: &SlotMap<T>) {
    let _ = write!(out, "{}:", label);
    for (id, index) in map.id_map() {
        match index {
            Some(index) => {
                let _ = write!(out, " {}:{}", id, index);
            }
            None => {
                let _ = write!(out, " {}:-", id);
            }
        }
    }
    out.push('\n');
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
    fn test_light_info_shows_vacant_ids() {
        let mut scene = scene();
        let a = scene.add_point_light(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 1.0, 1.0), 1.0).unwrap();
        scene.add_direction_light(Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 1.0), 0.5).unwrap();
        scene.remove_light(a).unwrap();

        let info = light_info(&scene);
        assert!(info.contains("Light count: 1"));
        assert!(info.contains("Light index 0 D [0, -1, 0]"));
        assert!(info.ends_with("Light map: 0:- 1:0\n"));
    }

    #[test]
    fn test_console_runs_registered_commands() {
        let mut scene = scene();
        scene.add_cube(Mat4::identity(), scene.default_material(), false).unwrap();
        let console = ConsoleCommands::with_scene_commands();

        assert_eq!(console.names().collect::<Vec<_>>(), vec!["lightinfo", "priminfo", "texinfo"]);
        let prims = console.run("priminfo", &scene).unwrap();
        assert!(prims.contains("Prim count: 1"));
        assert!(prims.contains("Geometry: 24 vertices, 36 indices"));
        assert!(prims.ends_with("Prim map: 0:0\n"));

        let textures = console.run("texinfo", &scene).unwrap();
        assert!(textures.contains("Width 4 Height 4 Size 64"));
        assert!(console.run("nope", &scene).is_none());
    }
}
