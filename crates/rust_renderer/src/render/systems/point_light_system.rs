//! Point light billboards and the light array of the global UBO

use ash::{vk, Device};
use bytemuck::{Pod, Zeroable};

use crate::core::ShaderConfig;
use crate::ecs::components::{PointLightComponent, TransformComponent};
use crate::ecs::EntityManager;
use crate::render::frame_info::FrameInfo;
use crate::render::lighting::{GlobalUbo, PointLight, MAX_LIGHTS};
use crate::render::vulkan::{GraphicsPipeline, PipelineConfig, ShaderModule, VulkanResult};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct PointLightPushConstants {
    position: [f32; 4],
    color: [f32; 4],
    radius: f32,
    _padding: [f32; 3],
}

impl PointLightPushConstants {
    fn new(transform: &TransformComponent, light: &PointLightComponent) -> Self {
        Self {
            position: world_position(transform),
            color: light_color(light),
            radius: transform.scale.x,
            _padding: [0.0; 3],
        }
    }
}

/// Draws a camera-facing disc per light and fills the UBO light array
pub struct PointLightSystem {
    device: Device,
    pipeline: GraphicsPipeline,
}

impl PointLightSystem {
    /// Build the billboard pipeline
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        global_set_layout: vk::DescriptorSetLayout,
        shaders: &ShaderConfig,
    ) -> VulkanResult<Self> {
        let vertex = ShaderModule::from_file(device.clone(), shaders.path(&shaders.point_light_vertex))?;
        let fragment = ShaderModule::from_file(device.clone(), shaders.path(&shaders.point_light_fragment))?;

        let config = PipelineConfig {
            set_layouts: vec![global_set_layout],
            push_constant_ranges: vec![push_constant_range()],
            ..PipelineConfig::default()
        }
        .with_alpha_blending();

        let pipeline = GraphicsPipeline::new(device.clone(), render_pass, &vertex, &fragment, &config)?;
        Ok(Self { device, pipeline })
    }

    /// Copy every light into `ubo` in ascending entity order
    ///
    /// `max_lights` is the configured limit and may be lower than the UBO's
    /// [`MAX_LIGHTS`] slots.
    ///
    /// # Panics
    /// Panics when `max_lights` exceeds [`MAX_LIGHTS`] or the scene holds more
    /// than `max_lights` lights.
    pub fn update(entity_manager: &EntityManager, ubo: &mut GlobalUbo, max_lights: usize) {
        assert!(
            max_lights <= MAX_LIGHTS,
            "Configured light limit {max_lights} exceeds UBO capacity {MAX_LIGHTS}"
        );
        let lights = entity_manager.entities::<PointLightComponent>();
        assert!(
            lights.len() <= max_lights,
            "Point lights exceed maximum specified ({} > {max_lights})",
            lights.len()
        );

        for (slot, &entity) in lights.iter().enumerate() {
            let transform = entity_manager.get_component::<TransformComponent>(entity);
            let light = entity_manager.get_component::<PointLightComponent>(entity);
            ubo.point_lights[slot] = PointLight {
                position: world_position(transform),
                color: light_color(light),
            };
        }
        ubo.num_lights = i32::try_from(lights.len()).unwrap_or(i32::MAX);
    }

    /// Draw one billboard per light
    pub fn render(&self, frame_info: &FrameInfo<'_>) {
        let command_buffer = frame_info.command_buffer;
        self.pipeline.bind(command_buffer);
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.layout(),
                0,
                &[frame_info.global_descriptor_set],
                &[],
            );
        }

        let scene = frame_info.entity_manager;
        for &entity in scene.entities::<PointLightComponent>() {
            let push = PointLightPushConstants::new(
                scene.get_component::<TransformComponent>(entity),
                scene.get_component::<PointLightComponent>(entity),
            );
            unsafe {
                self.device.cmd_push_constants(
                    command_buffer,
                    self.pipeline.layout(),
                    vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                    0,
                    bytemuck::bytes_of(&push),
                );
                self.device.cmd_draw(command_buffer, 6, 1, 0, 0);
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn push_constant_range() -> vk::PushConstantRange {
    vk::PushConstantRange {
        stage_flags: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
        offset: 0,
        size: std::mem::size_of::<PointLightPushConstants>() as u32,
    }
}

fn world_position(transform: &TransformComponent) -> [f32; 4] {
    let t = transform.translation;
    [t.x, t.y, t.z, 1.0]
}

fn light_color(light: &PointLightComponent) -> [f32; 4] {
    let c = light.color;
    [c.x, c.y, c.z, light.light_intensity]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ComponentCapacities;
    use crate::ecs::spawn::{create_point_light, register_scene_components};
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-6;

    fn scene() -> EntityManager {
        let mut manager = EntityManager::new(100);
        let capacities = ComponentCapacities {
            point_light: 20,
            ..ComponentCapacities::default()
        };
        register_scene_components(&mut manager, &capacities);
        manager
    }

    #[test]
    fn test_update_copies_lights_in_entity_order() {
        let mut manager = scene();
        let red = create_point_light(&mut manager, 0.5, 0.1, Vec3::new(1.0, 0.0, 0.0));
        let blue = create_point_light(&mut manager, 2.0, 0.1, Vec3::new(0.0, 0.0, 1.0));
        manager.get_component_mut::<TransformComponent>(blue).translation = Vec3::new(3.0, -1.0, 2.0);
        assert!(red < blue);

        let mut ubo = GlobalUbo::default();
        PointLightSystem::update(&manager, &mut ubo, MAX_LIGHTS);

        assert_eq!(ubo.num_lights, 2);
        assert_eq!(ubo.point_lights[0].color, [1.0, 0.0, 0.0, 0.5]);
        assert_eq!(ubo.point_lights[1].position, [3.0, -1.0, 2.0, 1.0]);
        assert_relative_eq!(ubo.point_lights[1].color[3], 2.0, epsilon = EPSILON);
    }

    #[test]
    fn test_destroyed_light_is_not_copied() {
        let mut manager = scene();
        let first = create_point_light(&mut manager, 1.0, 0.1, Vec3::new(1.0, 1.0, 1.0));
        create_point_light(&mut manager, 3.0, 0.1, Vec3::new(1.0, 1.0, 1.0));
        manager.destroy_entity(first);

        let mut ubo = GlobalUbo::default();
        PointLightSystem::update(&manager, &mut ubo, MAX_LIGHTS);
        assert_eq!(ubo.num_lights, 1);
        assert_relative_eq!(ubo.point_lights[0].color[3], 3.0, epsilon = EPSILON);
    }

    #[test]
    fn test_push_constants_carry_radius() {
        let transform = TransformComponent::default().with_scale(Vec3::new(0.25, 1.0, 1.0));
        let push = PointLightPushConstants::new(&transform, &PointLightComponent::default());
        assert_relative_eq!(push.radius, 0.25, epsilon = EPSILON);
        assert_eq!(push_constant_range().size, 48);
    }

    #[test]
    #[should_panic(expected = "Point lights exceed maximum specified")]
    fn test_too_many_lights_panics() {
        let mut manager = scene();
        for _ in 0..=MAX_LIGHTS {
            create_point_light(&mut manager, 1.0, 0.1, Vec3::new(1.0, 1.0, 1.0));
        }
        PointLightSystem::update(&manager, &mut GlobalUbo::default(), MAX_LIGHTS);
    }

    #[test]
    #[should_panic(expected = "Point lights exceed maximum specified (8 > 6)")]
    fn test_configured_limit_below_ubo_capacity_is_enforced() {
        let mut manager = scene();
        for _ in 0..8 {
            create_point_light(&mut manager, 1.0, 0.1, Vec3::new(1.0, 1.0, 1.0));
        }
        PointLightSystem::update(&manager, &mut GlobalUbo::default(), 6);
    }

    #[test]
    fn test_lights_at_configured_limit_are_accepted() {
        let mut manager = scene();
        for _ in 0..6 {
            create_point_light(&mut manager, 1.0, 0.1, Vec3::new(1.0, 1.0, 1.0));
        }
        let mut ubo = GlobalUbo::default();
        PointLightSystem::update(&manager, &mut ubo, 6);
        assert_eq!(ubo.num_lights, 6);
    }

    #[test]
    #[should_panic(expected = "exceeds UBO capacity")]
    fn test_limit_above_ubo_capacity_panics() {
        PointLightSystem::update(&scene(), &mut GlobalUbo::default(), MAX_LIGHTS + 1);
    }
}
