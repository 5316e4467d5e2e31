//! Camera matrices
//!
//! View space follows the renderer's convention: +X right, +Y down, +Z into
//! the screen. Projections map depth to Vulkan's `0..1` range.

use crate::foundation::math::{Mat4, Vec3};

/// Projection, view and inverse view for one viewpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    projection: Mat4,
    view: Mat4,
    inverse_view: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: Mat4::identity(),
            view: Mat4::identity(),
            inverse_view: Mat4::identity(),
        }
    }
}

impl Camera {
    /// Camera at the origin looking down +Z with identity projection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Orthographic box projection
    pub fn set_orthographic_projection(&mut self, left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) {
        #[rustfmt::skip]
        let projection = Mat4::new(
            2.0 / (right - left), 0.0,                  0.0,                -(right + left) / (right - left),
            0.0,                  2.0 / (bottom - top), 0.0,                -(bottom + top) / (bottom - top),
            0.0,                  0.0,                  1.0 / (far - near), -near / (far - near),
            0.0,                  0.0,                  0.0,                1.0,
        );
        self.projection = projection;
    }

    /// Perspective projection with vertical field of view `fovy` in radians
    ///
    /// # Panics
    /// Panics when `aspect` is zero.
    pub fn set_perspective_projection(&mut self, fovy: f32, aspect: f32, near: f32, far: f32) {
        assert!(aspect.abs() > f32::EPSILON, "Aspect ratio must be non-zero");
        let tan_half_fovy = (fovy / 2.0).tan();
        #[rustfmt::skip]
        let projection = Mat4::new(
            1.0 / (aspect * tan_half_fovy), 0.0,                 0.0,                0.0,
            0.0,                            1.0 / tan_half_fovy, 0.0,                0.0,
            0.0,                            0.0,                 far / (far - near), -(far * near) / (far - near),
            0.0,                            0.0,                 1.0,                0.0,
        );
        self.projection = projection;
    }

    /// Look from `position` along `direction`
    pub fn set_view_direction(&mut self, position: Vec3, direction: Vec3, up: Vec3) {
        let w = direction.normalize();
        let u = w.cross(&up).normalize();
        let v = w.cross(&u);
        self.set_basis(position, u, v, w);
    }

    /// Look from `position` towards `target`
    ///
    /// # Panics
    /// Panics when `position` and `target` coincide.
    pub fn set_view_target(&mut self, position: Vec3, target: Vec3, up: Vec3) {
        let direction = target - position;
        assert!(direction.norm_squared() > f32::EPSILON, "Camera target equals its position");
        self.set_view_direction(position, direction, up);
    }

    /// Orient with Tait-Bryan angles applied in Y, X, Z order
    pub fn set_view_yxz(&mut self, position: Vec3, rotation: Vec3) {
        let (s1, c1) = rotation.y.sin_cos();
        let (s2, c2) = rotation.x.sin_cos();
        let (s3, c3) = rotation.z.sin_cos();
        let u = Vec3::new(c1 * c3 + s1 * s2 * s3, c2 * s3, c1 * s2 * s3 - c3 * s1);
        let v = Vec3::new(c3 * s1 * s2 - c1 * s3, c2 * c3, c1 * c3 * s2 + s1 * s3);
        let w = Vec3::new(c2 * s1, -s2, c1 * c2);
        self.set_basis(position, u, v, w);
    }

    /// Projection matrix
    #[must_use]
    pub const fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// World-to-view matrix
    #[must_use]
    pub const fn view(&self) -> &Mat4 {
        &self.view
    }

    /// View-to-world matrix
    #[must_use]
    pub const fn inverse_view(&self) -> &Mat4 {
        &self.inverse_view
    }

    /// Camera position in world space
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.inverse_view.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Orthonormal basis `u`, `v`, `w` becomes the view rotation
    fn set_basis(&mut self, position: Vec3, u: Vec3, v: Vec3, w: Vec3) {
        #[rustfmt::skip]
        let view = Mat4::new(
            u.x, u.y, u.z, -u.dot(&position),
            v.x, v.y, v.z, -v.dot(&position),
            w.x, w.y, w.z, -w.dot(&position),
            0.0, 0.0, 0.0, 1.0,
        );
        #[rustfmt::skip]
        let inverse_view = Mat4::new(
            u.x, v.x, w.x, position.x,
            u.y, v.y, w.y, position.y,
            u.z, v.z, w.z, position.z,
            0.0, 0.0, 0.0, 1.0,
        );
        self.view = view;
        self.inverse_view = inverse_view;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_inverse_view_inverts_view() {
        let mut camera = Camera::new();
        camera.set_view_yxz(Vec3::new(1.0, -2.0, 3.0), Vec3::new(0.3, -1.1, 0.2));
        assert_relative_eq!(camera.view() * camera.inverse_view(), Mat4::identity(), epsilon = EPSILON);
        assert_relative_eq!(camera.position(), Vec3::new(1.0, -2.0, 3.0), epsilon = EPSILON);
    }

    #[test]
    fn test_zero_rotation_matches_forward_direction() {
        let position = Vec3::new(0.0, -1.0, -2.5);
        let mut yxz = Camera::new();
        yxz.set_view_yxz(position, Vec3::zeros());

        let mut direction = Camera::new();
        direction.set_view_direction(position, Vec3::z(), Vec3::new(0.0, -1.0, 0.0));

        assert_relative_eq!(*yxz.view(), *direction.view(), epsilon = EPSILON);
    }

    #[test]
    fn test_view_target_puts_target_on_forward_axis() {
        let mut camera = Camera::new();
        let target = Vec3::new(2.0, 0.0, 4.0);
        camera.set_view_target(Vec3::zeros(), target, Vec3::new(0.0, -1.0, 0.0));

        let in_view = camera.view() * Vec4::new(target.x, target.y, target.z, 1.0);
        assert_relative_eq!(in_view.x, 0.0, epsilon = EPSILON);
        assert_relative_eq!(in_view.y, 0.0, epsilon = EPSILON);
        assert_relative_eq!(in_view.z, target.norm(), epsilon = EPSILON);
    }

    #[test]
    fn test_perspective_maps_near_and_far_to_unit_depth() {
        let mut camera = Camera::new();
        camera.set_perspective_projection(50f32.to_radians(), 1.5, 0.1, 100.0);

        let near = camera.projection() * Vec4::new(0.0, 0.0, 0.1, 1.0);
        let far = camera.projection() * Vec4::new(0.0, 0.0, 100.0, 1.0);
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = EPSILON);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_orthographic_maps_box_to_clip_volume() {
        let mut camera = Camera::new();
        camera.set_orthographic_projection(-2.0, 2.0, -1.0, 1.0, 0.0, 10.0);

        let corner = camera.projection() * Vec4::new(2.0, 1.0, 10.0, 1.0);
        assert_relative_eq!(corner, Vec4::new(1.0, 1.0, 1.0, 1.0), epsilon = EPSILON);
    }

    #[test]
    #[should_panic(expected = "target equals its position")]
    fn test_degenerate_target_panics() {
        Camera::new().set_view_target(Vec3::zeros(), Vec3::zeros(), Vec3::y());
    }
}
