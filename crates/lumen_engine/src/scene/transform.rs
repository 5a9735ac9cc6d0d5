//! Object transform
//!
//! Rotation is stored as Tait-Bryan angles applied Y, then X, then Z, so the
//! model matrix is `Translate * Ry * Rx * Rz * Scale`. Both matrices are
//! built in closed form; the normal matrix never needs a general inverse.

use crate::foundation::math::{Mat3, Mat4, Vec3, Vec4};

/// Translation, scale and rotation of a scene object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// World space position
    pub translation: Vec3,

    /// Per-axis scale factors
    pub scale: Vec3,

    /// Tait-Bryan angles in radians (x = pitch, y = yaw, z = roll)
    pub rotation: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            rotation: Vec3::zeros(),
        }
    }
}

impl Transform {
    /// Create from position only
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Columns of `Ry * Rx * Rz`
    fn rotation_columns(&self) -> [Vec3; 3] {
        let (s3, c3) = self.rotation.z.sin_cos();
        let (s2, c2) = self.rotation.x.sin_cos();
        let (s1, c1) = self.rotation.y.sin_cos();
        [
            Vec3::new(c1 * c3 + s1 * s2 * s3, c2 * s3, c1 * s2 * s3 - c3 * s1),
            Vec3::new(c3 * s1 * s2 - c1 * s3, c2 * c3, c1 * c3 * s2 + s1 * s3),
            Vec3::new(c2 * s1, -s2, c1 * c2),
        ]
    }

    /// Model matrix: `Translate * Ry * Rx * Rz * Scale`
    pub fn matrix(&self) -> Mat4 {
        let [x, y, z] = self.rotation_columns();
        Mat4::from_columns(&[
            (x * self.scale.x).push(0.0),
            (y * self.scale.y).push(0.0),
            (z * self.scale.z).push(0.0),
            Vec4::new(self.translation.x, self.translation.y, self.translation.z, 1.0),
        ])
    }

    /// Inverse-transpose of the upper 3x3 of [`Self::matrix`]
    ///
    /// For a rotation `R` and scale `S` this is `R * S⁻¹`. Scale components
    /// must be non-zero.
    pub fn normal_matrix(&self) -> Mat3 {
        let [x, y, z] = self.rotation_columns();
        let inv_scale = self.scale.map(|s| 1.0 / s);
        Mat3::from_columns(&[x * inv_scale.x, y * inv_scale.y, z * inv_scale.z])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    fn samples() -> Vec<Transform> {
        let mut out = Vec::new();
        let angles = [-2.7, -0.4, 0.0, 0.9, 3.1];
        let scales = [Vec3::new(1.0, 1.0, 1.0), Vec3::new(0.5, 2.0, 3.0), Vec3::new(-1.0, 0.25, 4.0)];
        for (i, &ax) in angles.iter().enumerate() {
            for &ay in &angles {
                for (k, scale) in scales.iter().enumerate() {
                    out.push(Transform {
                        translation: Vec3::new(i as f32 - 2.0, ay, k as f32 * 0.5),
                        scale: *scale,
                        rotation: Vec3::new(ax, ay, ax * 0.5 - ay),
                    });
                }
            }
        }
        out
    }

    fn euler_yxz(rotation: Vec3) -> Mat3 {
        let ry = nalgebra::Rotation3::from_axis_angle(&Vec3::y_axis(), rotation.y).into_inner();
        let rx = nalgebra::Rotation3::from_axis_angle(&Vec3::x_axis(), rotation.x).into_inner();
        let rz = nalgebra::Rotation3::from_axis_angle(&Vec3::z_axis(), rotation.z).into_inner();
        ry * rx * rz
    }

    #[test]
    fn test_identity_transform() {
        let transform = Transform::default();
        assert_relative_eq!(transform.matrix(), Mat4::identity(), epsilon = EPSILON);
        assert_relative_eq!(transform.normal_matrix(), Mat3::identity(), epsilon = EPSILON);
    }

    #[test]
    fn test_matrix_matches_composition() {
        for t in samples() {
            let expected = Mat4::new_translation(&t.translation)
                * euler_yxz(t.rotation).to_homogeneous()
                * Mat4::new_nonuniform_scaling(&t.scale);
            assert_relative_eq!(t.matrix(), expected, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_matrix_decomposes_back() {
        for t in samples() {
            let m = t.matrix();
            assert_relative_eq!(m.fixed_view::<3, 1>(0, 3).into_owned(), t.translation, epsilon = EPSILON);

            let upper: Mat3 = m.fixed_view::<3, 3>(0, 0).into_owned();
            let rotation = Mat3::from_columns(&[
                upper.column(0) / t.scale.x,
                upper.column(1) / t.scale.y,
                upper.column(2) / t.scale.z,
            ]);
            for (c, s) in t.scale.iter().enumerate() {
                assert_relative_eq!(upper.column(c).norm(), s.abs(), epsilon = EPSILON);
            }
            assert_relative_eq!(rotation, euler_yxz(t.rotation), epsilon = EPSILON);
        }
    }

    #[test]
    fn test_normal_matrix_is_inverse_transpose() {
        for t in samples() {
            let upper: Mat3 = t.matrix().fixed_view::<3, 3>(0, 0).into_owned();
            let expected = upper.try_inverse().expect("non-degenerate scale").transpose();
            assert_relative_eq!(t.normal_matrix(), expected, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_translation_applies_after_scale() {
        let t = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            scale: Vec3::new(2.0, 2.0, 2.0),
            rotation: Vec3::zeros(),
        };
        let p = t.matrix() * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p, Vec4::new(3.0, 2.0, 3.0, 1.0), epsilon = EPSILON);
    }
}
