//! Point light component

use crate::ecs::Component;
use crate::foundation::math::Vec3;

/// Point light emitted from the entity's transform translation
///
/// The billboard radius is read from the transform's `scale.x`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLightComponent {
    /// Scalar intensity multiplier
    pub light_intensity: f32,
    /// Linear RGB color
    pub color: Vec3,
}

impl Component for PointLightComponent {}

impl Default for PointLightComponent {
    fn default() -> Self {
        Self {
            light_intensity: 1.0,
            color: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}
