//! Helpers for building scenes out of the standard components

use super::components::{PointLightComponent, RendererComponent, TagComponent, TransformComponent};
use super::{Entity, EntityManager};
use crate::core::ComponentCapacities;
use crate::foundation::math::Vec3;

/// Register the transform, tag, point light and renderer pools
pub fn register_scene_components(manager: &mut EntityManager, capacities: &ComponentCapacities) {
    manager.register_component::<TransformComponent>(capacities.transform);
    manager.register_component::<TagComponent>(capacities.tag);
    manager.register_component::<PointLightComponent>(capacities.point_light);
    manager.register_component::<RendererComponent>(capacities.renderer);
}

/// New entity with a default transform and a tag named `name`
pub fn create_game_object(manager: &mut EntityManager, name: &str) -> Entity {
    let entity = manager.create_entity();
    manager.add_component::<TransformComponent>(entity);
    manager.add_component::<TagComponent>(entity).set_name(name);
    entity
}

/// New game object carrying a point light
///
/// `radius` sizes the light's billboard through the transform's `scale.x`.
pub fn create_point_light(manager: &mut EntityManager, intensity: f32, radius: f32, color: Vec3) -> Entity {
    let entity = create_game_object(manager, "point light");
    manager.get_component_mut::<TransformComponent>(entity).scale.x = radius;
    manager.insert_component(
        entity,
        PointLightComponent {
            light_intensity: intensity,
            color,
        },
    );
    entity
}

/// Point light with the stock intensity (10), radius (0.1) and white color
pub fn create_default_point_light(manager: &mut EntityManager) -> Entity {
    create_point_light(manager, 10.0, 0.1, Vec3::new(1.0, 1.0, 1.0))
}
