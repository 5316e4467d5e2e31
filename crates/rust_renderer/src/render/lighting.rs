//! Global uniform data shared by every pipeline

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Mat4;

/// Point lights the global UBO can hold; matches the shaders' array size
pub const MAX_LIGHTS: usize = 10;

/// One point light in std140 layout
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PointLight {
    /// World position, w = 1
    pub position: [f32; 4],
    /// RGB color, w = intensity
    pub color: [f32; 4],
}

/// Set 0, binding 0 of every pipeline
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlobalUbo {
    /// Camera projection
    pub projection: [[f32; 4]; 4],
    /// World-to-view
    pub view: [[f32; 4]; 4],
    /// View-to-world, used for the camera position in specular terms
    pub inverse_view: [[f32; 4]; 4],
    /// RGB ambient color, w = intensity
    pub ambient_light_color: [f32; 4],
    /// Active lights occupy `..num_lights`
    pub point_lights: [PointLight; MAX_LIGHTS],
    /// Number of active lights
    pub num_lights: i32,
    _padding: [i32; 3],
}

impl Default for GlobalUbo {
    fn default() -> Self {
        Self {
            ambient_light_color: [1.0, 1.0, 1.0, 0.02],
            ..Self::zeroed()
        }
    }
}

impl GlobalUbo {
    /// Copy the camera matrices in
    pub fn set_camera(&mut self, projection: &Mat4, view: &Mat4, inverse_view: &Mat4) {
        self.projection = (*projection).into();
        self.view = (*view).into();
        self.inverse_view = (*inverse_view).into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_layout_matches_std140() {
        assert_eq!(size_of::<PointLight>(), 32);
        assert_eq!(offset_of!(GlobalUbo, ambient_light_color), 192);
        assert_eq!(offset_of!(GlobalUbo, point_lights), 208);
        assert_eq!(offset_of!(GlobalUbo, num_lights), 208 + 32 * MAX_LIGHTS);
        assert_eq!(size_of::<GlobalUbo>(), 544);
    }

    #[test]
    fn test_default_has_dim_white_ambient_and_no_lights() {
        let ubo = GlobalUbo::default();
        assert_eq!(ubo.ambient_light_color, [1.0, 1.0, 1.0, 0.02]);
        assert_eq!(ubo.num_lights, 0);
    }

    #[test]
    fn test_camera_matrices_are_column_major() {
        let mut ubo = GlobalUbo::default();
        let translation = Mat4::new_translation(&crate::foundation::math::Vec3::new(1.0, 2.0, 3.0));
        ubo.set_camera(&Mat4::identity(), &translation, &Mat4::identity());
        assert_eq!(ubo.view[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
