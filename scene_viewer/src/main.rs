//! Headless scene viewer
//!
//! Builds a small scene on the headless allocator (a cube, an optional OBJ
//! model and texture, two lights), orbits the camera with the arcball for a
//! number of frames while synchronizing dirty categories, then tears the scene
//! down and reports what the allocator saw.
//!
//! ```text
//! scene_viewer [CONFIG.toml|CONFIG.ron] [--frames N] [--model FILE.obj] [--texture FILE.png] [--dump]
//! ```

use clap::Parser;
use scene_runtime::config::ConfigError;
use scene_runtime::foundation::logging;
use scene_runtime::prelude::*;
use std::path::PathBuf;
use thiserror::Error;

const SCREEN_WIDTH: u32 = 800;
const SCREEN_HEIGHT: u32 = 600;
const FRAME_TIME: f32 = 1.0 / 60.0;

#[derive(Error, Debug)]
enum ViewerError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Drive a headless scene for a number of frames
#[derive(Parser, Debug)]
#[command(name = "scene_viewer")]
struct Options {
    /// Scene configuration (.toml or .ron); defaults are used when the file is missing
    #[arg(value_name = "CONFIG")]
    config: Option<String>,

    /// Number of frames to run
    #[arg(long, default_value_t = 120)]
    frames: u32,

    /// OBJ model placed above the cube
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Image applied to the cube as its albedo texture
    #[arg(long, value_name = "FILE")]
    texture: Option<PathBuf>,

    /// Print the priminfo, texinfo and lightinfo dumps before teardown
    #[arg(long)]
    dump: bool,
}

struct ViewerApp {
    scene: Scene<HeadlessAllocator>,
    arcball: ArcballController,
    sync: FrameSync,
    console: ConsoleCommands<HeadlessAllocator>,
    draw_list: PrimitiveList,
    cube: PrimitiveHandle,
    key_light: LightHandle,
}

impl ViewerApp {
    fn new(config: &SceneConfig) -> Result<Self, ViewerError> {
        log::info!("Creating headless scene...");
        let mut scene = Scene::with_config(HeadlessAllocator::new(), config)?;

        let material = scene.default_material();
        let cube = scene.add_cube(Mat4::identity(), material, false)?;
        let key_light = scene.add_point_light(Vec3::new(2.0, 3.0, 2.0), Vec3::new(1.0, 0.9, 0.7), 1.0)?;
        scene.create_direction_light(Vec3::new(1.0, 1.0, 0.9), Vec3::new(-0.2, -1.0, -0.3))?;

        let mut draw_list = PrimitiveList::new();
        draw_list.push(cube);

        Ok(Self {
            scene,
            arcball: ArcballController::new(config.arcball.clone(), config.camera.target()),
            sync: FrameSync::new(),
            console: ConsoleCommands::with_scene_commands(),
            draw_list,
            cube,
            key_light,
        })
    }

    fn initialize(&mut self, options: &Options) -> Result<(), ViewerError> {
        let loader = FileSystemLoader::default();

        if let Some(path) = &options.texture {
            let texture = self.scene.load_texture_or_null(&loader, path, 4)?;
            if !texture.is_null() {
                let material = self.scene.create_material(
                    [1.0, 1.0, 1.0],
                    0.5,
                    texture,
                    TextureHandle::NULL,
                    TextureHandle::NULL,
                )?;
                self.scene.bind_primitive_to_material(self.cube, material)?;
            }
        }

        if let Some(path) = &options.model {
            let xform = Mat4::new_translation(&Vec3::new(0.0, 1.5, 0.0));
            let model = self.scene.load_primitive(&loader, path, xform, self.scene.default_material())?;
            self.draw_list.push(model);
        }

        // A renderer-owned slot filled through a pinned position.
        let floor_xform = Mat4::new_translation(&Vec3::new(0.0, -1.0, 0.0)) * Mat4::new_nonuniform_scaling(&Vec3::new(4.0, 0.1, 4.0));
        let floor = self.scene.reserve_primitive(floor_xform, self.scene.default_material())?;
        let pin = self.scene.pin_primitive(floor)?;
        let geometry = Geometry::upload(self.scene.allocator_mut(), &FileGeometry::cube(false)).map_err(SceneError::from)?;
        self.scene.set_geometry_at(pin, geometry)?;
        self.draw_list.push(floor);

        log::info!("Scene initialized with {} primitives", self.draw_list.len());
        Ok(())
    }

    fn frame(&mut self, index: u32) -> Result<(), ViewerError> {
        let center = (SCREEN_WIDTH as i32 / 2, SCREEN_HEIGHT as i32 / 2);
        let input = ArcballInput {
            screen_width: SCREEN_WIDTH,
            screen_height: SCREEN_HEIGHT,
            dt: FRAME_TIME,
            previous: center,
            current: (center.0 + 4, center.1),
            tumbling: index > 0,
            home: index == 0,
            ..ArcballInput::default()
        };
        self.scene.update_camera_arcball(&mut self.arcball, &input);

        self.scene.update_primitive_xform(self.cube, &Mat4::new_rotation(Vec3::new(0.0, FRAME_TIME, 0.0)))?;

        if index % 10 == 0 {
            let pulse = 1.0 + 0.5 * (index as f32 * 0.1).sin();
            self.scene.update_light_intensity(self.key_light, pulse)?;
        }

        let report = self.sync.sync(&mut self.scene);
        log::debug!(
            "Frame {}: synced {:?} ({} prims, {} lights)",
            report.frame,
            report.synced,
            self.sync.primitives().len(),
            self.sync.lights().len()
        );
        Ok(())
    }

    fn cleanup(&mut self, dump: bool) {
        if dump {
            for name in ["priminfo", "texinfo", "lightinfo"] {
                if let Some(text) = self.console.run(name, &self.scene) {
                    println!("{text}");
                }
            }
        }

        let drawn = self.draw_list.iter().filter(|&handle| self.scene.primitive(handle).is_ok()).count();
        log::info!("{} of {} listed primitives still live", drawn, self.draw_list.len());

        self.scene.teardown();
        let stats = self.scene.allocator().stats();
        log::info!(
            "Allocator: {} buffers ({} freed), {} images ({} freed), {} bytes in use, {} invalid frees",
            stats.buffers_allocated,
            stats.buffers_freed,
            stats.images_created,
            stats.images_freed,
            stats.bytes_in_use,
            stats.invalid_frees
        );
    }
}

fn run() -> Result<(), ViewerError> {
    let options = Options::parse();

    let config = match &options.config {
        Some(path) => SceneConfig::load_or_default(path)?,
        None => SceneConfig::default(),
    };
    config.validate()?;
    logging::init_with_level(&config.log_level);
    log::info!("Starting scene viewer for {} frames", options.frames);

    let mut app = ViewerApp::new(&config)?;
    app.initialize(&options)?;
    for index in 0..options.frames {
        app.frame(index)?;
    }
    app.cleanup(options.dump);
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("scene_viewer: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        let options = Options::try_parse_from(["scene_viewer", "viewer.toml", "--frames", "3", "--dump"]).unwrap();
        assert_eq!(options.config.as_deref(), Some("viewer.toml"));
        assert_eq!(options.frames, 3);
        assert!(options.dump);
        assert!(options.model.is_none());

        let defaults = Options::try_parse_from(["scene_viewer"]).unwrap();
        assert_eq!(defaults.frames, 120);
        assert!(defaults.config.is_none());

        assert!(Options::try_parse_from(["scene_viewer", "--frames"]).is_err());
        assert!(Options::try_parse_from(["scene_viewer", "--frames", "many"]).is_err());
        assert!(Options::try_parse_from(["scene_viewer", "--bogus"]).is_err());
    }

    #[test]
    fn test_viewer_runs_and_releases_everything() {
        let mut app = ViewerApp::new(&SceneConfig::default()).unwrap();
        let options = Options::try_parse_from(["scene_viewer"]).unwrap();
        app.initialize(&options).unwrap();
        for index in 0..5 {
            app.frame(index).unwrap();
        }
        assert_eq!(app.sync.frame(), 5);
        assert_eq!(app.sync.primitives().len(), 2);

        app.cleanup(false);
        let stats = app.scene.allocator().stats();
        assert_eq!(stats.bytes_in_use, 0);
        assert_eq!(stats.invalid_frees, 0);
    }
}
