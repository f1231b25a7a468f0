//! Math utilities and types
//!
//! Provides the vector and matrix aliases used by the scene and camera code.

pub use nalgebra::{Matrix3, Matrix4, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

/// Extension trait for Mat4 with camera and transform helpers
pub trait Mat4Ext {
    /// Create a perspective projection matrix (depth mapped to [0, 1])
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a look-at view matrix (world to camera)
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Create the camera-to-world transform for a camera at `eye` looking at `target`.
    ///
    /// This is the inverse of [`Mat4Ext::look_at`]: the columns are the camera's
    /// right, up and backward axes followed by its position.
    fn look_at_xform(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Invert a rotation + translation matrix without a general inverse.
    fn rigid_inverse(&self) -> Mat4;

    /// Translation column of the matrix
    fn translation(&self) -> Vec3;

    /// Local Y axis (second column) of the matrix
    fn local_y(&self) -> Vec3;

    /// Local Z axis (third column) of the matrix
    fn local_z(&self) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();

        // P = [a⁻¹/tan(φ/2)    0              0                    0           ]
        //     [0               1/tan(φ/2)     0                    0           ]
        //     [0               0              f/(f-n)              -nf/(f-n)   ]
        //     [0               0              1                    0           ]
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = far / (far - near);
        result[(2, 3)] = -(near * far) / (far - near);
        result[(3, 2)] = 1.0;

        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new(
            1.0, 0.0, 0.0, -eye.x,
            0.0, 1.0, 0.0, -eye.y,
            0.0, 0.0, 1.0, -eye.z,
            0.0, 0.0, 0.0, 1.0,
        );

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }

    fn look_at_xform(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        Mat4::new(
            right.x, camera_up.x, -forward.x, eye.x,
            right.y, camera_up.y, -forward.y, eye.y,
            right.z, camera_up.z, -forward.z, eye.z,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn rigid_inverse(&self) -> Mat4 {
        let rotation_t: Mat3 = self.fixed_view::<3, 3>(0, 0).transpose();
        let translation = -(rotation_t * self.translation());

        let mut result = Mat4::identity();
        result.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation_t);
        result.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
        result
    }

    fn translation(&self) -> Vec3 {
        Vec3::new(self.m14, self.m24, self.m34)
    }

    fn local_y(&self) -> Vec3 {
        Vec3::new(self.m12, self.m22, self.m32)
    }

    fn local_z(&self) -> Vec3 {
        Vec3::new(self.m13, self.m23, self.m33)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_look_at_xform_inverts_view() {
        let eye = Vec3::new(1.0, 1.0, 2.0);
        let target = Vec3::zeros();
        let up = Vec3::y();

        let view = Mat4::look_at(eye, target, up);
        let xform = Mat4::look_at_xform(eye, target, up);

        assert_relative_eq!(view * xform, Mat4::identity(), epsilon = 1e-5);
        assert_relative_eq!(xform.translation(), eye, epsilon = 1e-6);
    }

    #[test]
    fn test_rigid_inverse_matches_general_inverse() {
        let xform = Mat4::look_at_xform(Vec3::new(3.0, -2.0, 5.0), Vec3::new(0.0, 1.0, 0.0), Vec3::y());
        let general = xform.try_inverse().unwrap();

        assert_relative_eq!(xform.rigid_inverse(), general, epsilon = 1e-5);
    }

    #[test]
    fn test_local_axes() {
        let xform = Mat4::look_at_xform(Vec3::new(0.0, 0.0, 4.0), Vec3::zeros(), Vec3::y());
        assert_relative_eq!(xform.local_y(), Vec3::y(), epsilon = 1e-6);
        // Camera looks down -Z, so its backward axis is +Z.
        assert_relative_eq!(xform.local_z(), Vec3::z(), epsilon = 1e-6);
    }
}
