//! Transform component for the entity store
//!
//! Rotation is stored as Tait-Bryan angles applied in Y (yaw), X (pitch),
//! Z (roll) order. The model matrix is `T * Ry * Rx * Rz * S`, written out
//! in closed form so no intermediate matrices are built per entity per frame.

use crate::ecs::Component;
use crate::foundation::math::{Mat4, Vec3, Vec4};

/// World-space placement of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct TransformComponent {
    /// World space position
    pub translation: Vec3,

    /// Scale factors per axis
    pub scale: Vec3,

    /// Rotation in radians around X (pitch), Y (yaw) and Z (roll)
    pub rotation: Vec3,
}

impl Component for TransformComponent {}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            rotation: Vec3::zeros(),
        }
    }
}

impl TransformComponent {
    /// Transform placed at `translation`
    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    /// Builder-style scale override
    #[must_use]
    pub const fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Builder-style rotation override
    #[must_use]
    pub const fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Model matrix `translate * Ry * Rx * Rz * scale`
    #[must_use]
    pub fn mat4(&self) -> Mat4 {
        let [col0, col1, col2] = self.rotation_columns(self.scale);
        Mat4::from_columns(&[
            col0.push(0.0),
            col1.push(0.0),
            col2.push(0.0),
            Vec4::new(self.translation.x, self.translation.y, self.translation.z, 1.0),
        ])
    }

    /// Inverse-transpose of the model matrix's upper 3x3, padded to 4x4
    ///
    /// For a rotation `R` and scale `S`, `(R * S)^-T = R * S^-1`.
    #[must_use]
    pub fn normal_matrix(&self) -> Mat4 {
        let inverse_scale = self.scale.map(|s| 1.0 / s);
        let [col0, col1, col2] = self.rotation_columns(inverse_scale);
        Mat4::from_columns(&[col0.push(0.0), col1.push(0.0), col2.push(0.0), Vec4::w()])
    }

    fn rotation_columns(&self, scale: Vec3) -> [Vec3; 3] {
        let (s1, c1) = self.rotation.y.sin_cos();
        let (s2, c2) = self.rotation.x.sin_cos();
        let (s3, c3) = self.rotation.z.sin_cos();
        [
            Vec3::new(c1 * c3 + s1 * s2 * s3, c2 * s3, c1 * s2 * s3 - c3 * s1) * scale.x,
            Vec3::new(c3 * s1 * s2 - c1 * s3, c2 * c3, c1 * c3 * s2 + s1 * s3) * scale.y,
            Vec3::new(c2 * s1, -s2, c1 * c2) * scale.z,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{constants::PI, Mat3};
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    fn composed(transform: &TransformComponent) -> Mat4 {
        let r = transform.rotation;
        Mat4::new_translation(&transform.translation)
            * Mat4::new_rotation(Vec3::new(0.0, r.y, 0.0))
            * Mat4::new_rotation(Vec3::new(r.x, 0.0, 0.0))
            * Mat4::new_rotation(Vec3::new(0.0, 0.0, r.z))
            * Mat4::new_nonuniform_scaling(&transform.scale)
    }

    #[test]
    fn test_identity_matrix() {
        let transform = TransformComponent::default();
        assert_relative_eq!(transform.mat4(), Mat4::identity(), epsilon = EPSILON);
        assert_relative_eq!(transform.normal_matrix(), Mat4::identity(), epsilon = EPSILON);
    }

    #[test]
    fn test_matrix_matches_yxz_composition() {
        let transform = TransformComponent::from_translation(Vec3::new(1.5, -2.0, 3.0))
            .with_scale(Vec3::new(2.0, 0.5, 1.25))
            .with_rotation(Vec3::new(0.3, -1.1, PI / 5.0));
        assert_relative_eq!(transform.mat4(), composed(&transform), epsilon = EPSILON);
    }

    #[test]
    fn test_yaw_only_rotates_around_y() {
        let transform = TransformComponent::default().with_rotation(Vec3::new(0.0, PI / 2.0, 0.0));
        let rotated = transform.mat4().transform_vector(&Vec3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(rotated, Vec3::new(1.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_normal_matrix_is_inverse_transpose() {
        let transform = TransformComponent::from_translation(Vec3::new(4.0, 5.0, 6.0))
            .with_scale(Vec3::new(3.0, 1.0, 0.25))
            .with_rotation(Vec3::new(-0.7, 0.2, 1.3));

        let upper: Mat3 = transform.mat4().fixed_view::<3, 3>(0, 0).into_owned();
        let expected = upper.try_inverse().map(|m| m.transpose()).unwrap();
        let normal: Mat3 = transform.normal_matrix().fixed_view::<3, 3>(0, 0).into_owned();
        assert_relative_eq!(normal, expected, epsilon = EPSILON);
        assert_relative_eq!(transform.normal_matrix()[(3, 3)], 1.0);
    }
}
