//! Per-swapchain-image render targets

use ash::{vk, Device};

use super::image::Image;
use super::{VulkanContext, VulkanResult};

/// Framebuffer binding one color view and one depth view
pub struct Framebuffer {
    device: Device,
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Create a framebuffer compatible with `render_pass`
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe { device.create_framebuffer(&create_info, None)? };
        Ok(Self { device, framebuffer })
    }

    /// Raw handle
    #[must_use]
    pub const fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}

/// Depth attachment sized to the swapchain
pub struct DepthBuffer {
    image: Image,
}

impl DepthBuffer {
    /// Allocate a depth image of `format` and `extent`
    pub fn new(context: &VulkanContext, format: vk::Format, extent: vk::Extent2D) -> VulkanResult<Self> {
        let image = Image::new(
            context,
            extent,
            format,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::ImageAspectFlags::DEPTH,
        )?;
        Ok(Self { image })
    }

    /// View used as the framebuffer's depth attachment
    #[must_use]
    pub const fn image_view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Depth format
    #[must_use]
    pub const fn format(&self) -> vk::Format {
        self.image.format()
    }
}
