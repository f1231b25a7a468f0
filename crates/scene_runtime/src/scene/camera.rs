//! # Scene camera
//!
//! [`Camera`] is the record the renderer reads: camera-to-world transform, view
//! and projection matrices. [`ArcballController`] turns mouse drags into new
//! look-at poses for it; all controller state (rates, home pose, current orbit
//! target) lives on the controller, and the caller passes it in explicitly.

use crate::config::{ArcballConfig, CameraStartConfig};
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use nalgebra::{Unit, UnitQuaternion};

/// Camera transform and lens
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera-to-world transform
    pub xform: Mat4,
    /// World-to-camera transform (inverse of `xform`)
    pub view: Mat4,
    /// Projection matrix
    pub projection: Mat4,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Viewport aspect ratio
    pub aspect: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
}

impl Camera {
    /// Camera at the configured start pose with a perspective lens
    pub fn new(start: &CameraStartConfig, near: f32, far: f32) -> Self {
        let fov_y = utils::deg_to_rad(start.fov_degrees);
        let xform = Mat4::look_at_xform(start.eye(), start.target(), start.up());
        Self {
            xform,
            view: xform.rigid_inverse(),
            projection: Mat4::perspective(fov_y, start.aspect, near, far),
            fov_y,
            aspect: start.aspect,
            near,
            far,
        }
    }

    /// Place the camera at `eye` looking at `target`
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.xform = Mat4::look_at_xform(eye, target, up);
        self.view = self.xform.rigid_inverse();
    }

    /// Replace the view matrix, keeping `xform` its inverse
    ///
    /// Returns false (and leaves the camera untouched) if `view` is singular.
    pub fn set_view(&mut self, view: Mat4) -> bool {
        match view.try_inverse() {
            Some(xform) => {
                self.view = view;
                self.xform = xform;
                true
            }
            None => false,
        }
    }

    /// Change the lens and rebuild the projection
    pub fn set_lens(&mut self, fov_y: f32, aspect: f32) {
        self.fov_y = fov_y;
        self.aspect = aspect;
        self.projection = Mat4::perspective(fov_y, aspect, self.near, self.far);
    }

    /// Camera position in world space
    pub fn position(&self) -> Vec3 {
        self.xform.translation()
    }

    /// Camera up axis in world space
    pub fn up(&self) -> Vec3 {
        self.xform.local_y()
    }
}

/// One frame of pointer input for the arcball
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArcballInput {
    /// Viewport width in pixels
    pub screen_width: u32,
    /// Viewport height in pixels
    pub screen_height: u32,
    /// Frame time in seconds
    pub dt: f32,
    /// Pointer position last frame
    pub previous: (i32, i32),
    /// Pointer position this frame
    pub current: (i32, i32),
    /// Pan button held
    pub panning: bool,
    /// Tumble button held
    pub tumbling: bool,
    /// Zoom button held; horizontal motion zooms
    pub zooming: bool,
    /// Return to the home pose before applying motion
    pub home: bool,
}

/// Orbit, pan and zoom around a target point
#[derive(Debug, Clone, PartialEq)]
pub struct ArcballController {
    config: ArcballConfig,
    target: Vec3,
}

/// Closest the eye may zoom toward the target
const MIN_DISTANCE: f32 = 1e-3;

impl ArcballController {
    /// Controller orbiting `target`
    pub fn new(config: ArcballConfig, target: Vec3) -> Self {
        Self { config, target }
    }

    /// Current orbit target
    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Move the orbit target without moving the camera
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Compute the next `(eye, target, up)` from the current camera transform
    pub fn update(&mut self, xform: &Mat4, input: &ArcballInput) -> (Vec3, Vec3, Vec3) {
        let mut eye = xform.translation();
        let mut up = xform.local_y();

        if input.home {
            eye = Vec3::from(self.config.home_eye);
            self.target = Vec3::from(self.config.home_target);
            up = Vec3::from(self.config.home_up);
        }

        if input.tumbling && input.previous != input.current {
            (eye, up) = self.tumble(eye, up, input);
        }

        if input.panning {
            let dx = (input.current.0 - input.previous.0) as f32;
            let dy = (input.current.1 - input.previous.1) as f32;
            let forward = self.target - eye;
            let distance = forward.norm();
            if let Some(right) = forward.cross(&up).try_normalize(f32::EPSILON) {
                let offset = (right * -dx + up * dy) * self.config.pan_rate * input.dt * distance;
                eye += offset;
                self.target += offset;
            }
        }

        if input.zooming {
            let ticks = (input.current.0 - input.previous.0) as f32;
            let to_target = self.target - eye;
            let distance = to_target.norm();
            if distance > MIN_DISTANCE {
                let step = (ticks * self.config.zoom_rate).min(1.0 - MIN_DISTANCE / distance);
                eye += to_target * step;
            }
        }

        (eye, self.target, up)
    }

    /// Rotate the eye around the target by the drag projected onto a virtual sphere
    fn tumble(&self, eye: Vec3, up: Vec3, input: &ArcballInput) -> (Vec3, Vec3) {
        let from = sphere_point(input.previous, input.screen_width, input.screen_height);
        let to = sphere_point(input.current, input.screen_width, input.screen_height);

        let back = (eye - self.target).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z);
        let Some(right) = up.cross(&back).try_normalize(f32::EPSILON) else {
            return (eye, up);
        };
        let camera_up = back.cross(&right);

        let axis_camera = from.cross(&to);
        let axis = right * axis_camera.x + camera_up * axis_camera.y + back * axis_camera.z;
        let Some(axis) = Unit::try_new(axis, f32::EPSILON) else {
            return (eye, up);
        };
        let angle = from.dot(&to).clamp(-1.0, 1.0).acos() * self.config.tumble_rate;

        // Dragging the scene one way orbits the camera the other way.
        let rotation = UnitQuaternion::from_axis_angle(&axis, -angle);
        let eye = self.target + rotation * (eye - self.target);
        (eye, rotation * camera_up)
    }
}

/// Map a pixel position onto the unit arcball sphere in camera space
fn sphere_point((x, y): (i32, i32), width: u32, height: u32) -> Vec3 {
    let width = width.max(1) as f32;
    let height = height.max(1) as f32;
    let px = (2.0 * x as f32 - width) / width;
    let py = (height - 2.0 * y as f32) / height;
    let r2 = px * px + py * py;
    if r2 <= 1.0 {
        Vec3::new(px, py, (1.0 - r2).sqrt())
    } else {
        Vec3::new(px, py, 0.0).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn drag(from: (i32, i32), to: (i32, i32)) -> ArcballInput {
        ArcballInput {
            screen_width: 800,
            screen_height: 600,
            dt: 0.016,
            previous: from,
            current: to,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_camera_view_inverts_xform() {
        let camera = Camera::new(&CameraStartConfig::default(), 0.01, 100.0);
        assert_relative_eq!(camera.view * camera.xform, Mat4::identity(), epsilon = 1e-5);
        assert_relative_eq!(camera.position(), Vec3::new(1.0, 1.0, 2.0), epsilon = 1e-6);
    }

    #[test]
    fn test_set_view_rejects_singular_matrix() {
        let mut camera = Camera::new(&CameraStartConfig::default(), 0.01, 100.0);
        let before = camera.clone();
        assert!(!camera.set_view(Mat4::zeros()));
        assert_eq!(camera, before);
    }

    #[test]
    fn test_home_restores_home_pose() {
        let mut controller = ArcballController::new(ArcballConfig::default(), Vec3::new(5.0, 0.0, 0.0));
        let xform = Mat4::look_at_xform(Vec3::new(3.0, 4.0, 5.0), Vec3::new(5.0, 0.0, 0.0), Vec3::y());
        let input = ArcballInput {
            home: true,
            ..drag((0, 0), (0, 0))
        };

        let (eye, target, up) = controller.update(&xform, &input);
        assert_eq!(eye, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(target, Vec3::zeros());
        assert_eq!(up, Vec3::y());
        assert_eq!(controller.target(), Vec3::zeros());
    }

    #[test]
    fn test_tumble_keeps_distance_to_target() {
        let mut controller = ArcballController::new(ArcballConfig::default(), Vec3::zeros());
        let xform = Mat4::look_at_xform(Vec3::new(0.0, 0.0, 3.0), Vec3::zeros(), Vec3::y());
        let input = ArcballInput {
            tumbling: true,
            ..drag((400, 300), (460, 280))
        };

        let (eye, target, _) = controller.update(&xform, &input);
        assert_relative_eq!((eye - target).norm(), 3.0, epsilon = 1e-4);
        assert!((eye - Vec3::new(0.0, 0.0, 3.0)).norm() > 1e-3);
    }

    #[test]
    fn test_pan_moves_eye_and_target_together() {
        let mut controller = ArcballController::new(ArcballConfig::default(), Vec3::zeros());
        let xform = Mat4::look_at_xform(Vec3::new(0.0, 0.0, 2.0), Vec3::zeros(), Vec3::y());
        let input = ArcballInput {
            panning: true,
            ..drag((100, 100), (110, 100))
        };

        let (eye, target, _) = controller.update(&xform, &input);
        assert_relative_eq!(eye - target, Vec3::new(0.0, 0.0, 2.0), epsilon = 1e-5);
        assert!(target.x < 0.0);
    }

    #[test]
    fn test_zoom_moves_toward_target_without_passing_it() {
        let mut controller = ArcballController::new(ArcballConfig::default(), Vec3::zeros());
        let xform = Mat4::look_at_xform(Vec3::new(0.0, 0.0, 2.0), Vec3::zeros(), Vec3::y());

        let (eye, _, _) = controller.update(&xform, &ArcballInput { zooming: true, ..drag((0, 0), (100, 0)) });
        assert_relative_eq!(eye.z, 1.0, epsilon = 1e-5);

        let (eye, _, _) = controller.update(&xform, &ArcballInput { zooming: true, ..drag((0, 0), (10_000, 0)) });
        assert!(eye.z > 0.0);
    }
}
