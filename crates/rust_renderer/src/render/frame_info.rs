//! Data handed to render systems for one frame

use ash::vk;

use super::camera::Camera;
use super::vulkan::DescriptorPool;
use crate::ecs::EntityManager;

/// Everything a render system needs to record its draws
pub struct FrameInfo<'a> {
    /// In-flight frame slot
    pub frame_index: usize,
    /// Seconds since the previous frame
    pub frame_time: f32,
    /// Command buffer inside the swapchain render pass
    pub command_buffer: vk::CommandBuffer,
    /// Active camera
    pub camera: &'a Camera,
    /// Set 0: this frame's global UBO
    pub global_descriptor_set: vk::DescriptorSet,
    /// This frame's pool, already reset, for transient per-draw sets
    pub frame_descriptor_pool: &'a DescriptorPool,
    /// Scene being drawn
    pub entity_manager: &'a EntityManager,
}
