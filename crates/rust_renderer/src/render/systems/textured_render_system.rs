//! Lit, textured meshes
//!
//! Every entity with a transform and a complete [`RendererComponent`] gets a
//! transient set 1 built from the frame's descriptor pool: its slice of the
//! object buffer at binding 0 and its diffuse map at binding 1.

use ash::{vk, Device};

use crate::core::ShaderConfig;
use crate::ecs::components::{RendererComponent, TransformComponent};
use crate::render::frame_info::FrameInfo;
use crate::render::object_manager::{MirrorBuffer, ObjectManager};
use crate::render::vulkan::model::{vertex_attributes, vertex_bindings};
use crate::render::vulkan::{
    DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorWriter, GraphicsPipeline, PipelineConfig,
    ShaderModule, VulkanResult,
};

/// Draws every renderable entity with the textured pipeline
pub struct TexturedRenderSystem {
    device: Device,
    object_set_layout: DescriptorSetLayout,
    pipeline: GraphicsPipeline,
}

impl TexturedRenderSystem {
    /// Build the per-object set layout and the pipeline
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        global_set_layout: vk::DescriptorSetLayout,
        shaders: &ShaderConfig,
    ) -> VulkanResult<Self> {
        let object_set_layout = object_set_layout_builder().build(&device)?;

        let vertex = ShaderModule::from_file(device.clone(), shaders.path(&shaders.textured_vertex))?;
        let fragment = ShaderModule::from_file(device.clone(), shaders.path(&shaders.textured_fragment))?;

        let config = PipelineConfig {
            vertex_bindings: vertex_bindings(),
            vertex_attributes: vertex_attributes(),
            set_layouts: vec![global_set_layout, object_set_layout.handle()],
            ..PipelineConfig::default()
        };
        let pipeline = GraphicsPipeline::new(device.clone(), render_pass, &vertex, &fragment, &config)?;

        Ok(Self {
            device,
            object_set_layout,
            pipeline,
        })
    }

    /// Layout of set 1
    #[must_use]
    pub const fn object_set_layout(&self) -> &DescriptorSetLayout {
        &self.object_set_layout
    }

    /// Record draws for every drawable entity, in ascending entity order
    ///
    /// `objects` must already hold this frame's transforms.
    pub fn render<B: MirrorBuffer>(&self, frame_info: &FrameInfo<'_>, objects: &ObjectManager<B>) -> VulkanResult<()> {
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
        let mut drawn = 0usize;
        for &entity in scene.entities::<RendererComponent>() {
            if !scene.has_component::<TransformComponent>(entity) {
                continue;
            }
            let renderer = scene.get_component::<RendererComponent>(entity);
            let (Some(model), Some(diffuse_map)) = (&renderer.model, &renderer.diffuse_map) else {
                continue;
            };

            let object_set = DescriptorWriter::new(&self.object_set_layout)
                .write_buffer(0, objects.get_buffer_info_for_game_object(frame_info.frame_index, entity))
                .write_image(1, diffuse_map.descriptor_info())
                .build(frame_info.frame_descriptor_pool)?;

            unsafe {
                self.device.cmd_bind_descriptor_sets(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.pipeline.layout(),
                    1,
                    &[object_set],
                    &[],
                );
            }
            model.bind(command_buffer);
            model.draw(command_buffer);
            drawn += 1;
        }

        log::trace!("Frame {}: {drawn} textured draws", frame_info.frame_index);
        Ok(())
    }
}

fn object_set_layout_builder() -> DescriptorSetLayoutBuilder {
    DescriptorSetLayoutBuilder::new()
        .add_binding(
            0,
            vk::DescriptorType::UNIFORM_BUFFER,
            vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
        )
        .add_binding(
            1,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            vk::ShaderStageFlags::FRAGMENT,
        )
}
