//! Vulkan implementation of the frame backend
//!
//! Owns the swapchain and every resource sized to it: depth buffers,
//! framebuffers and one command buffer per image. Synchronization follows
//! the usual pattern of one [`FrameSync`] per frame slot plus a table of the
//! fence last used with each swapchain image. Acquire waits on that fence
//! before returning, so an image's command buffer is never reset while an
//! earlier frame still has it pending.

use std::sync::Arc;

use ash::vk;

use super::commands::CommandPool;
use super::framebuffer::{DepthBuffer, Framebuffer};
use super::render_pass::RenderPass;
use super::swapchain::Swapchain;
use super::sync::FrameSync;
use super::{VulkanContext, VulkanResult};
use crate::render::frame::{AcquireOutcome, ChainInfo, FrameBackend, ImageFences, PresentOutcome};

/// Swapchain presenter
pub struct VulkanPresenter {
    frame_sync: Vec<FrameSync>,
    images_in_flight: ImageFences<vk::Fence>,
    command_buffers: Vec<vk::CommandBuffer>,
    command_pool: CommandPool,
    framebuffers: Vec<Framebuffer>,
    depth_buffers: Vec<DepthBuffer>,
    render_pass: RenderPass,
    swapchain: Swapchain,
    depth_format: vk::Format,
    clear_color: [f32; 4],
    context: Arc<VulkanContext>,
}

impl VulkanPresenter {
    /// Build the chain for `extent` with `max_frames_in_flight` frame slots
    pub fn new(
        context: Arc<VulkanContext>,
        extent: vk::Extent2D,
        max_frames_in_flight: usize,
        clear_color: [f32; 4],
    ) -> VulkanResult<Self> {
        let device = context.device().clone();
        let swapchain = Swapchain::new(&context, extent, None)?;
        let depth_format = context.find_depth_format()?;
        let render_pass = RenderPass::new_forward_pass(device.clone(), swapchain.format().format, depth_format)?;
        let (depth_buffers, framebuffers) =
            create_targets(&context, &swapchain, &render_pass, depth_format)?;

        let command_pool = CommandPool::new(device.clone(), context.graphics_queue_family())?;
        let command_buffers = command_pool.allocate_command_buffers(image_count_u32(&swapchain))?;

        let frame_sync = (0..max_frames_in_flight)
            .map(|_| FrameSync::new(&device))
            .collect::<VulkanResult<Vec<_>>>()?;

        Ok(Self {
            frame_sync,
            images_in_flight: ImageFences::new(swapchain.image_count()),
            command_buffers,
            command_pool,
            framebuffers,
            depth_buffers,
            render_pass,
            swapchain,
            depth_format,
            clear_color,
            context,
        })
    }

    /// Shared device context
    #[must_use]
    pub const fn context(&self) -> &Arc<VulkanContext> {
        &self.context
    }

    /// Render pass every pipeline must be compatible with
    #[must_use]
    pub const fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    /// Pool used for one-shot upload commands
    #[must_use]
    pub const fn command_pool(&self) -> &CommandPool {
        &self.command_pool
    }

    /// Current swapchain
    #[must_use]
    pub const fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }
}

impl FrameBackend for VulkanPresenter {
    type CommandBuffer = vk::CommandBuffer;

    fn chain_info(&self) -> ChainInfo {
        ChainInfo {
            color_format: self.swapchain.format().format,
            depth_format: self.depth_format,
            image_count: self.swapchain.image_count(),
            extent: self.swapchain.extent(),
        }
    }

    fn acquire_next_image(&mut self, frame_index: usize) -> VulkanResult<AcquireOutcome> {
        let sync = &self.frame_sync[frame_index];
        sync.in_flight.wait(u64::MAX)?;
        let frame_fence = sync.in_flight.handle();

        let result = unsafe {
            self.swapchain.loader().acquire_next_image(
                self.swapchain.handle(),
                u64::MAX,
                sync.image_available.handle(),
                vk::Fence::null(),
            )
        };
        match result {
            Ok((image_index, suboptimal)) => {
                if let Some(previous) = self.images_in_flight.claim(image_index, frame_fence) {
                    unsafe { self.context.device().wait_for_fences(&[previous], true, u64::MAX)? };
                }
                Ok(AcquireOutcome::Acquired { image_index, suboptimal })
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(e.into()),
        }
    }

    fn begin_command_buffer(&mut self, image_index: u32) -> VulkanResult<vk::CommandBuffer> {
        let command_buffer = self.command_buffers[image_index as usize];
        let device = self.context.device();
        let begin_info = vk::CommandBufferBeginInfo::builder();
        unsafe {
            device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;
            device.begin_command_buffer(command_buffer, &begin_info)?;
        }
        Ok(command_buffer)
    }

    fn end_command_buffer(&mut self, command_buffer: vk::CommandBuffer) -> VulkanResult<()> {
        unsafe { self.context.device().end_command_buffer(command_buffer)? };
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn begin_render_pass(&mut self, command_buffer: vk::CommandBuffer, image_index: u32) {
        let extent = self.swapchain.extent();
        let render_area = vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent,
        };
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];
        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.render_pass.handle())
            .framebuffer(self.framebuffers[image_index as usize].handle())
            .render_area(render_area)
            .clear_values(&clear_values);

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        let device = self.context.device();
        unsafe {
            device.cmd_begin_render_pass(command_buffer, &begin_info, vk::SubpassContents::INLINE);
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(command_buffer, 0, &[render_area]);
        }
    }

    fn end_render_pass(&mut self, command_buffer: vk::CommandBuffer) {
        unsafe { self.context.device().cmd_end_render_pass(command_buffer) };
    }

    fn submit_and_present(
        &mut self,
        frame_index: usize,
        image_index: u32,
        command_buffer: vk::CommandBuffer,
    ) -> VulkanResult<PresentOutcome> {
        let device = self.context.device();
        let sync = &self.frame_sync[frame_index];

        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [sync.render_finished.handle()];
        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        sync.in_flight.reset()?;
        unsafe {
            device.queue_submit(self.context.graphics_queue(), &[submit_info], sync.in_flight.handle())?;
        }

        let swapchains = [self.swapchain.handle()];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.swapchain
                .loader()
                .queue_present(self.context.present_queue(), &present_info)
        };
        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(e.into()),
        }
    }

    fn wait_idle(&self) -> VulkanResult<()> {
        self.context.wait_idle()
    }

    fn recreate_chain(&mut self, extent: vk::Extent2D) -> VulkanResult<ChainInfo> {
        let swapchain = Swapchain::new(&self.context, extent, Some(&self.swapchain))?;

        // Targets reference the old image views
        self.framebuffers.clear();
        self.depth_buffers.clear();
        self.swapchain = swapchain;

        self.depth_format = self.context.find_depth_format()?;
        let (depth_buffers, framebuffers) =
            create_targets(&self.context, &self.swapchain, &self.render_pass, self.depth_format)?;
        self.depth_buffers = depth_buffers;
        self.framebuffers = framebuffers;
        self.images_in_flight = ImageFences::new(self.swapchain.image_count());

        Ok(self.chain_info())
    }

    fn recreate_command_buffers(&mut self, image_count: usize) -> VulkanResult<()> {
        self.command_pool.free_command_buffers(&self.command_buffers);
        self.command_buffers.clear();
        let count = u32::try_from(image_count).unwrap_or(u32::MAX);
        self.command_buffers = self.command_pool.allocate_command_buffers(count)?;
        Ok(())
    }
}

impl Drop for VulkanPresenter {
    fn drop(&mut self) {
        if let Err(e) = self.context.wait_idle() {
            log::error!("Device wait failed during presenter shutdown: {e}");
        }
    }
}

fn image_count_u32(swapchain: &Swapchain) -> u32 {
    u32::try_from(swapchain.image_count()).unwrap_or(u32::MAX)
}

fn create_targets(
    context: &VulkanContext,
    swapchain: &Swapchain,
    render_pass: &RenderPass,
    depth_format: vk::Format,
) -> VulkanResult<(Vec<DepthBuffer>, Vec<Framebuffer>)> {
    let extent = swapchain.extent();
    let mut depth_buffers = Vec::with_capacity(swapchain.image_count());
    let mut framebuffers = Vec::with_capacity(swapchain.image_count());

    for &color_view in swapchain.image_views() {
        let depth = DepthBuffer::new(context, depth_format, extent)?;
        framebuffers.push(Framebuffer::new(
            context.device().clone(),
            render_pass.handle(),
            &[color_view, depth.image_view()],
            extent,
        )?);
        depth_buffers.push(depth);
    }
    Ok((depth_buffers, framebuffers))
}
