//! Vulkan backend
//!
//! RAII wrappers over `ash`. Every wrapper holds a clone of the logical
//! device and destroys its handle on drop; the [`VulkanContext`] must outlive
//! all of them.

pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor_set;
pub mod framebuffer;
pub mod image;
pub mod model;
pub mod pipeline;
pub mod presenter;
pub mod render_pass;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod window;

pub use buffer::{object_alignment, Buffer, HostBuffer};
pub use commands::CommandPool;
pub use context::{LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult};
pub use descriptor_set::{
    DescriptorPool, DescriptorPoolBuilder, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorWriter,
};
pub use framebuffer::{DepthBuffer, Framebuffer};
pub use image::Image;
pub use model::Model;
pub use pipeline::{GraphicsPipeline, PipelineConfig, ShaderModule};
pub use presenter::VulkanPresenter;
pub use render_pass::RenderPass;
pub use swapchain::{aspect_ratio, Swapchain};
pub use sync::{Fence, FrameSync, Semaphore};
pub use texture::Texture;
pub use window::{Window, WindowError, WindowResult};
