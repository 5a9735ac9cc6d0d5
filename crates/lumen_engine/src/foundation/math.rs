//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the handful of helpers the renderer needs
//! to move matrices into GPU-facing `#[repr(C)]` structs.

pub use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

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

    /// Wrap an angle into `[0, 2π)`
    pub fn wrap_angle(radians: f32) -> f32 {
        radians.rem_euclid(constants::TAU)
    }
}

/// Extension trait for Mat4 with GPU upload helpers
pub trait Mat4Ext {
    /// Rotation of `angle` radians around an arbitrary (non-normalized) axis
    fn rotation_about(axis: Vec3, angle: f32) -> Mat4;

    /// Column-major array layout expected by GLSL `mat4`
    fn to_cols_array(&self) -> [[f32; 4]; 4];
}

impl Mat4Ext for Mat4 {
    fn rotation_about(axis: Vec3, angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&nalgebra::Unit::new_normalize(axis), angle)
    }

    fn to_cols_array(&self) -> [[f32; 4]; 4] {
        (*self).into()
    }
}

/// Pad a normal matrix to the `mat4` layout used in uniform blocks
pub fn mat3_to_cols_array(m: &Mat3) -> [[f32; 4]; 4] {
    let mut out = [[0.0; 4]; 4];
    for (col, dst) in out.iter_mut().take(3).enumerate() {
        for row in 0..3 {
            dst[row] = m[(row, col)];
        }
    }
    out[3][3] = 1.0;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wrap_angle() {
        assert_relative_eq!(utils::wrap_angle(-constants::PI * 0.5), constants::PI * 1.5, epsilon = 1e-5);
        assert_relative_eq!(utils::wrap_angle(constants::TAU + 0.25), 0.25, epsilon = 1e-5);
    }

    #[test]
    fn test_cols_array_is_column_major() {
        let m = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let cols = m.to_cols_array();
        assert_eq!(cols[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(cols[0], [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mat3_padding() {
        let m = Mat3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        let cols = mat3_to_cols_array(&m);
        assert_eq!(cols[0], [1.0, 4.0, 7.0, 0.0]);
        assert_eq!(cols[2], [3.0, 6.0, 9.0, 0.0]);
        assert_eq!(cols[3], [0.0, 0.0, 0.0, 1.0]);
    }
}
