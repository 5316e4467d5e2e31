//! Frame orchestration
//!
//! [`FrameOrchestrator`] drives the acquire / record / submit / present cycle
//! over a [`FrameBackend`] and owns the policy for rebuilding the swapchain:
//!
//! - an out-of-date acquire rebuilds immediately and yields no frame
//! - an out-of-date or suboptimal present, or a window resize, rebuilds after
//!   presenting
//! - a rebuild waits out a zero-sized (minimized) window, idles the device and
//!   rejects a change of color or depth format
//!
//! The backend is a trait so the state machine can be exercised without a GPU.

use ash::vk;

use super::vulkan::{VulkanError, VulkanResult};

/// What the orchestrator needs from the window
pub trait SurfaceWindow {
    /// Current drawable size in pixels
    fn extent(&self) -> vk::Extent2D;
    /// Whether a resize happened since the flag was last reset
    fn was_window_resized(&self) -> bool;
    /// Clear the resize flag
    fn reset_window_resized_flag(&mut self);
    /// Block until at least one platform event arrives
    fn wait_events(&mut self);
}

/// Result of acquiring a swapchain image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is ready to be rendered into
    Acquired {
        /// Index of the acquired image
        image_index: u32,
        /// The chain still works but no longer matches the surface exactly
        suboptimal: bool,
    },
    /// The chain no longer matches the surface and must be rebuilt
    OutOfDate,
}

/// Result of presenting an image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Presented normally
    Presented,
    /// Presented, but the chain should be rebuilt
    Suboptimal,
    /// Not presented; the chain must be rebuilt
    OutOfDate,
}

/// Configuration of the current swapchain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainInfo {
    /// Swapchain image format
    pub color_format: vk::Format,
    /// Depth attachment format
    pub depth_format: vk::Format,
    /// Number of swapchain images
    pub image_count: usize,
    /// Image size
    pub extent: vk::Extent2D,
}

/// GPU-side operations of a frame
///
/// Implemented by [`super::vulkan::VulkanPresenter`]. Command buffers are
/// per swapchain image, so an acquired image's command buffer may still be
/// pending from another frame slot until the acquire has waited for it.
pub trait FrameBackend {
    /// Handle to a recordable command buffer
    type CommandBuffer: Copy + PartialEq + std::fmt::Debug;

    /// Configuration of the live chain
    fn chain_info(&self) -> ChainInfo;

    /// Wait until frame slot `frame_index` is free, then acquire an image
    /// signaling that slot's image-available token
    ///
    /// Returns only once any earlier submission that used the acquired image
    /// has completed, so its command buffer can be reset.
    fn acquire_next_image(&mut self, frame_index: usize) -> VulkanResult<AcquireOutcome>;

    /// Reset and begin the command buffer for `image_index`
    fn begin_command_buffer(&mut self, image_index: u32) -> VulkanResult<Self::CommandBuffer>;

    /// Finish recording
    fn end_command_buffer(&mut self, command_buffer: Self::CommandBuffer) -> VulkanResult<()>;

    /// Begin the swapchain render pass targeting `image_index`
    fn begin_render_pass(&mut self, command_buffer: Self::CommandBuffer, image_index: u32);

    /// End the swapchain render pass
    fn end_render_pass(&mut self, command_buffer: Self::CommandBuffer);

    /// Submit with a wait on image-available and a signal on render-finished,
    /// then present gated on render-finished
    fn submit_and_present(
        &mut self,
        frame_index: usize,
        image_index: u32,
        command_buffer: Self::CommandBuffer,
    ) -> VulkanResult<PresentOutcome>;

    /// Block until the device has no work in flight
    fn wait_idle(&self) -> VulkanResult<()>;

    /// Replace the chain and every resource sized to it
    fn recreate_chain(&mut self, extent: vk::Extent2D) -> VulkanResult<ChainInfo>;

    /// Reallocate one command buffer per image
    fn recreate_command_buffers(&mut self, image_count: usize) -> VulkanResult<()>;
}

/// Fence of the frame slot that last claimed each swapchain image
///
/// Acquire order is up to the driver, so an image may come back to a
/// different slot than the one that last rendered into it.
#[derive(Clone, Debug, Default)]
pub struct ImageFences<F> {
    owners: Vec<Option<F>>,
}

impl<F: Copy + PartialEq> ImageFences<F> {
    /// No image claimed yet
    #[must_use]
    pub fn new(image_count: usize) -> Self {
        Self {
            owners: vec![None; image_count],
        }
    }

    /// Hand `image_index` to `frame_fence`
    ///
    /// Returns the previous owner when it is another fence; the caller must
    /// wait on it before touching the image's resources.
    ///
    /// # Panics
    /// Panics when `image_index` is out of range.
    pub fn claim(&mut self, image_index: u32, frame_fence: F) -> Option<F> {
        let count = self.owners.len();
        let owner = self
            .owners
            .get_mut(image_index as usize)
            .unwrap_or_else(|| panic!("Image index {image_index} out of range ({count} images)"));
        owner.replace(frame_fence).filter(|previous| *previous != frame_fence)
    }

    /// Number of tracked images
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether no images are tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Per-frame state machine over a [`FrameBackend`]
pub struct FrameOrchestrator<B: FrameBackend> {
    backend: B,
    chain: ChainInfo,
    max_frames_in_flight: usize,
    current_frame_index: usize,
    current_image_index: u32,
    current_command_buffer: Option<B::CommandBuffer>,
    rebuild_count: usize,
}

impl<B: FrameBackend> FrameOrchestrator<B> {
    /// Wrap `backend`, rotating over `max_frames_in_flight` frame slots
    ///
    /// # Panics
    /// Panics when `max_frames_in_flight` is zero.
    pub fn new(backend: B, max_frames_in_flight: usize) -> Self {
        assert!(max_frames_in_flight > 0, "At least one frame must be in flight");
        let chain = backend.chain_info();
        Self {
            backend,
            chain,
            max_frames_in_flight,
            current_frame_index: 0,
            current_image_index: 0,
            current_command_buffer: None,
            rebuild_count: 0,
        }
    }

    /// Acquire an image and begin its command buffer
    ///
    /// Returns `Ok(None)` when the chain was out of date; it has been rebuilt
    /// and the caller must skip this iteration.
    ///
    /// # Panics
    /// Panics when a frame is already in progress.
    pub fn begin_frame<W: SurfaceWindow>(&mut self, window: &mut W) -> VulkanResult<Option<B::CommandBuffer>> {
        assert!(
            !self.is_frame_in_progress(),
            "Can't call begin_frame while a frame is already in progress"
        );

        let image_index = match self.backend.acquire_next_image(self.current_frame_index)? {
            AcquireOutcome::OutOfDate => {
                log::warn!("Swapchain out of date on acquire, rebuilding");
                self.rebuild(window)?;
                return Ok(None);
            }
            AcquireOutcome::Acquired { image_index, suboptimal } => {
                if suboptimal {
                    log::debug!("Acquired image {image_index} from a suboptimal swapchain");
                }
                image_index
            }
        };

        let command_buffer = self.backend.begin_command_buffer(image_index)?;
        self.current_image_index = image_index;
        self.current_command_buffer = Some(command_buffer);
        Ok(Some(command_buffer))
    }

    /// Submit and present the current frame, rebuilding the chain if needed
    ///
    /// # Panics
    /// Panics when no frame is in progress.
    pub fn end_frame<W: SurfaceWindow>(&mut self, window: &mut W) -> VulkanResult<()> {
        let command_buffer = self
            .current_command_buffer
            .take()
            .unwrap_or_else(|| panic!("Can't call end_frame while no frame is in progress"));

        self.backend.end_command_buffer(command_buffer)?;
        let outcome =
            self.backend
                .submit_and_present(self.current_frame_index, self.current_image_index, command_buffer)?;

        if outcome != PresentOutcome::Presented || window.was_window_resized() {
            log::warn!(
                "Rebuilding swapchain after present ({outcome:?}, resized: {})",
                window.was_window_resized()
            );
            window.reset_window_resized_flag();
            self.rebuild(window)?;
        }

        self.current_frame_index = (self.current_frame_index + 1) % self.max_frames_in_flight;
        Ok(())
    }

    /// Begin the swapchain render pass on the current frame's command buffer
    ///
    /// # Panics
    /// Panics when no frame is in progress or `command_buffer` belongs to
    /// another frame.
    pub fn begin_render_pass(&mut self, command_buffer: B::CommandBuffer) {
        self.assert_current(command_buffer, "begin");
        self.backend.begin_render_pass(command_buffer, self.current_image_index);
    }

    /// End the swapchain render pass
    ///
    /// # Panics
    /// Same conditions as [`Self::begin_render_pass`].
    pub fn end_render_pass(&mut self, command_buffer: B::CommandBuffer) {
        self.assert_current(command_buffer, "end");
        self.backend.end_render_pass(command_buffer);
    }

    /// Rebuild the chain for the window's current size
    ///
    /// Blocks on platform events while the window has zero area, then idles
    /// the device before anything is destroyed.
    pub fn rebuild<W: SurfaceWindow>(&mut self, window: &mut W) -> VulkanResult<()> {
        let mut extent = window.extent();
        while extent.width == 0 || extent.height == 0 {
            window.wait_events();
            extent = window.extent();
        }

        self.backend.wait_idle()?;

        let old = self.chain;
        let new = self.backend.recreate_chain(extent)?;
        if old.color_format != new.color_format || old.depth_format != new.depth_format {
            return Err(VulkanError::IncompatibleSwapchain {
                old: (old.color_format, old.depth_format),
                new: (new.color_format, new.depth_format),
            });
        }
        if new.image_count != old.image_count {
            log::info!("Swapchain image count changed {} -> {}", old.image_count, new.image_count);
            self.backend.recreate_command_buffers(new.image_count)?;
        }

        self.chain = new;
        self.rebuild_count += 1;
        Ok(())
    }

    /// Block until the device is idle
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.backend.wait_idle()
    }

    /// Width over height of the current chain
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        super::vulkan::aspect_ratio(self.chain.extent)
    }

    /// Frame slot in `0..max_frames_in_flight`
    #[must_use]
    pub const fn frame_index(&self) -> usize {
        self.current_frame_index
    }

    /// Swapchain image of the frame in progress
    ///
    /// # Panics
    /// Panics when no frame is in progress.
    #[must_use]
    pub fn image_index(&self) -> u32 {
        assert!(self.is_frame_in_progress(), "Cannot get image index when frame not in progress");
        self.current_image_index
    }

    /// Whether `begin_frame` succeeded and `end_frame` has not run yet
    #[must_use]
    pub const fn is_frame_in_progress(&self) -> bool {
        self.current_command_buffer.is_some()
    }

    /// Number of in-flight frame slots
    #[must_use]
    pub const fn max_frames_in_flight(&self) -> usize {
        self.max_frames_in_flight
    }

    /// How many times the chain has been rebuilt
    #[must_use]
    pub const fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }

    /// Live chain configuration
    #[must_use]
    pub const fn chain(&self) -> ChainInfo {
        self.chain
    }

    /// The wrapped backend
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The wrapped backend, mutably
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn assert_current(&self, command_buffer: B::CommandBuffer, action: &str) {
        match self.current_command_buffer {
            None => panic!("Can't {action} render pass when frame not in progress"),
            Some(current) => assert!(
                current == command_buffer,
                "Can't {action} render pass on command buffer from a different frame"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 800,
        height: 600,
    };

    fn chain(image_count: usize) -> ChainInfo {
        ChainInfo {
            color_format: vk::Format::B8G8R8A8_SRGB,
            depth_format: vk::Format::D32_SFLOAT,
            image_count,
            extent: EXTENT,
        }
    }

    #[derive(Default)]
    struct MockBackend {
        chain: Option<ChainInfo>,
        acquires: VecDeque<AcquireOutcome>,
        presents: VecDeque<PresentOutcome>,
        next_chains: VecDeque<ChainInfo>,
        calls: Vec<String>,
        recreated_extents: Vec<vk::Extent2D>,
        submitted_frames: Vec<usize>,
        command_buffer_sets: usize,
        image_fences: ImageFences<usize>,
        /// (frame slot, image) of submissions the GPU may still be running
        pending: Vec<(usize, u32)>,
    }

    impl MockBackend {
        fn new(image_count: usize) -> Self {
            Self {
                chain: Some(chain(image_count)),
                image_fences: ImageFences::new(image_count),
                ..Self::default()
            }
        }

        fn count(&self, call: &str) -> usize {
            self.calls.iter().filter(|c| *c == call).count()
        }
    }

    impl FrameBackend for MockBackend {
        type CommandBuffer = u32;

        fn chain_info(&self) -> ChainInfo {
            self.chain.unwrap()
        }

        fn acquire_next_image(&mut self, frame_index: usize) -> VulkanResult<AcquireOutcome> {
            self.calls.push("acquire".into());
            self.pending.retain(|&(slot, _)| slot != frame_index);
            let outcome = self.acquires.pop_front().unwrap_or(AcquireOutcome::Acquired {
                image_index: u32::try_from(frame_index).unwrap(),
                suboptimal: false,
            });
            if let AcquireOutcome::Acquired { image_index, .. } = outcome {
                if let Some(owner) = self.image_fences.claim(image_index, frame_index) {
                    self.calls.push("wait_image".into());
                    self.pending.retain(|&(slot, _)| slot != owner);
                }
            }
            Ok(outcome)
        }

        fn begin_command_buffer(&mut self, image_index: u32) -> VulkanResult<u32> {
            assert!(
                self.pending.iter().all(|&(_, image)| image != image_index),
                "Command buffer for image {image_index} reset while still pending"
            );
            self.calls.push("begin_cb".into());
            Ok(100 + image_index)
        }

        fn end_command_buffer(&mut self, _command_buffer: u32) -> VulkanResult<()> {
            self.calls.push("end_cb".into());
            Ok(())
        }

        fn begin_render_pass(&mut self, _command_buffer: u32, _image_index: u32) {
            self.calls.push("begin_pass".into());
        }

        fn end_render_pass(&mut self, _command_buffer: u32) {
            self.calls.push("end_pass".into());
        }

        fn submit_and_present(&mut self, frame_index: usize, image: u32, _cb: u32) -> VulkanResult<PresentOutcome> {
            self.calls.push("present".into());
            self.submitted_frames.push(frame_index);
            self.pending.push((frame_index, image));
            Ok(self.presents.pop_front().unwrap_or(PresentOutcome::Presented))
        }

        fn wait_idle(&self) -> VulkanResult<()> {
            Ok(())
        }

        fn recreate_chain(&mut self, extent: vk::Extent2D) -> VulkanResult<ChainInfo> {
            self.calls.push("recreate".into());
            self.recreated_extents.push(extent);
            let next = self.next_chains.pop_front().unwrap_or_else(|| self.chain.unwrap());
            self.chain = Some(next);
            self.pending.clear();
            self.image_fences = ImageFences::new(next.image_count);
            Ok(next)
        }

        fn recreate_command_buffers(&mut self, _image_count: usize) -> VulkanResult<()> {
            self.command_buffer_sets += 1;
            Ok(())
        }
    }

    struct MockWindow {
        extents: VecDeque<vk::Extent2D>,
        resized: bool,
        waits: usize,
    }

    impl MockWindow {
        fn new() -> Self {
            Self {
                extents: VecDeque::new(),
                resized: false,
                waits: 0,
            }
        }
    }

    impl SurfaceWindow for MockWindow {
        fn extent(&self) -> vk::Extent2D {
            self.extents.front().copied().unwrap_or(EXTENT)
        }

        fn was_window_resized(&self) -> bool {
            self.resized
        }

        fn reset_window_resized_flag(&mut self) {
            self.resized = false;
        }

        fn wait_events(&mut self) {
            self.waits += 1;
            self.extents.pop_front();
        }
    }

    #[test]
    fn test_regular_frame_cycle() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(3), 2);
        let mut window = MockWindow::new();

        let cb = frames.begin_frame(&mut window).unwrap().unwrap();
        assert!(frames.is_frame_in_progress());
        frames.begin_render_pass(cb);
        frames.end_render_pass(cb);
        frames.end_frame(&mut window).unwrap();

        assert!(!frames.is_frame_in_progress());
        assert_eq!(frames.frame_index(), 1);
        assert_eq!(frames.rebuild_count(), 0);
        assert_eq!(
            frames.backend().calls,
            vec!["acquire", "begin_cb", "begin_pass", "end_pass", "end_cb", "present"]
        );
    }

    #[test]
    fn test_frame_index_wraps_at_max_frames_in_flight() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(3), 3);
        let mut window = MockWindow::new();

        for _ in 0..7 {
            frames.begin_frame(&mut window).unwrap().unwrap();
            frames.end_frame(&mut window).unwrap();
        }
        assert_eq!(frames.backend().submitted_frames, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(frames.frame_index(), 1);
    }

    #[test]
    fn test_image_from_other_slot_is_waited_before_reset() {
        let mut backend = MockBackend::new(3);
        for image_index in [0, 1, 1] {
            backend.acquires.push_back(AcquireOutcome::Acquired {
                image_index,
                suboptimal: false,
            });
        }
        let mut frames = FrameOrchestrator::new(backend, 2);
        let mut window = MockWindow::new();

        for _ in 0..3 {
            frames.begin_frame(&mut window).unwrap().unwrap();
            frames.end_frame(&mut window).unwrap();
        }

        let calls = &frames.backend().calls;
        assert_eq!(frames.backend().count("wait_image"), 1);
        let wait = calls.iter().position(|c| c == "wait_image").unwrap();
        let last_reset = calls.iter().rposition(|c| c == "begin_cb").unwrap();
        assert!(wait < last_reset);
        assert_eq!(calls[wait - 1], "acquire");
    }

    #[test]
    fn test_image_fences_claim() {
        let mut fences = ImageFences::new(3);
        assert_eq!(fences.len(), 3);
        assert_eq!(fences.claim(1, 0_usize), None);
        assert_eq!(fences.claim(1, 0), None);
        assert_eq!(fences.claim(1, 1), Some(0));
        assert_eq!(fences.claim(2, 1), None);
        assert_eq!(fences.claim(1, 0), Some(1));
    }

    #[test]
    #[should_panic(expected = "Image index 3 out of range")]
    fn test_image_fences_out_of_range_panics() {
        ImageFences::new(3).claim(3, 0_usize);
    }

    #[test]
    fn test_out_of_date_acquire_rebuilds_once_and_skips_frame() {
        let mut backend = MockBackend::new(3);
        backend.acquires.push_back(AcquireOutcome::OutOfDate);
        let mut frames = FrameOrchestrator::new(backend, 2);
        let mut window = MockWindow::new();

        assert!(frames.begin_frame(&mut window).unwrap().is_none());
        assert_eq!(frames.rebuild_count(), 1);
        assert_eq!(frames.backend().count("recreate"), 1);
        assert!(!frames.is_frame_in_progress());
        assert_eq!(frames.frame_index(), 0);
        assert_eq!(frames.backend().count("begin_cb"), 0);

        assert!(frames.begin_frame(&mut window).unwrap().is_some());
        assert_eq!(frames.rebuild_count(), 1);
    }

    #[test]
    fn test_suboptimal_acquire_still_renders() {
        let mut backend = MockBackend::new(2);
        backend.acquires.push_back(AcquireOutcome::Acquired {
            image_index: 1,
            suboptimal: true,
        });
        let mut frames = FrameOrchestrator::new(backend, 2);
        let mut window = MockWindow::new();

        assert_eq!(frames.begin_frame(&mut window).unwrap(), Some(101));
        assert_eq!(frames.image_index(), 1);
        assert_eq!(frames.rebuild_count(), 0);
    }

    #[test]
    fn test_suboptimal_or_out_of_date_present_rebuilds() {
        let mut backend = MockBackend::new(2);
        backend.presents.push_back(PresentOutcome::Suboptimal);
        backend.presents.push_back(PresentOutcome::OutOfDate);
        let mut frames = FrameOrchestrator::new(backend, 2);
        let mut window = MockWindow::new();

        for expected in 1..=3 {
            frames.begin_frame(&mut window).unwrap().unwrap();
            frames.end_frame(&mut window).unwrap();
            assert_eq!(frames.rebuild_count(), expected.min(2));
        }
        assert_eq!(frames.frame_index(), 1);
    }

    #[test]
    fn test_resize_flag_triggers_rebuild_and_is_reset() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(2), 2);
        let mut window = MockWindow::new();
        window.resized = true;

        frames.begin_frame(&mut window).unwrap().unwrap();
        frames.end_frame(&mut window).unwrap();

        assert_eq!(frames.rebuild_count(), 1);
        assert!(!window.was_window_resized());
    }

    #[test]
    fn test_zero_extent_waits_for_events() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(2), 2);
        let mut window = MockWindow::new();
        let minimized = vk::Extent2D { width: 0, height: 0 };
        window.extents.extend([minimized, vk::Extent2D { width: 640, height: 0 }]);

        frames.rebuild(&mut window).unwrap();

        assert_eq!(window.waits, 2);
        assert_eq!(frames.backend().recreated_extents, vec![EXTENT]);
    }

    #[test]
    fn test_image_count_change_recreates_command_buffers() {
        let mut backend = MockBackend::new(2);
        backend.next_chains.push_back(chain(2));
        backend.next_chains.push_back(chain(3));
        let mut frames = FrameOrchestrator::new(backend, 2);
        let mut window = MockWindow::new();

        frames.rebuild(&mut window).unwrap();
        assert_eq!(frames.backend().command_buffer_sets, 0);

        frames.rebuild(&mut window).unwrap();
        assert_eq!(frames.backend().command_buffer_sets, 1);
        assert_eq!(frames.chain().image_count, 3);
    }

    #[test]
    fn test_format_change_is_rejected() {
        let mut backend = MockBackend::new(2);
        backend.next_chains.push_back(ChainInfo {
            depth_format: vk::Format::D24_UNORM_S8_UINT,
            ..chain(2)
        });
        let mut frames = FrameOrchestrator::new(backend, 2);
        let mut window = MockWindow::new();

        let err = frames.rebuild(&mut window).unwrap_err();
        assert!(matches!(err, VulkanError::IncompatibleSwapchain { .. }));
        assert_eq!(frames.rebuild_count(), 0);
    }

    #[test]
    #[should_panic(expected = "already in progress")]
    fn test_begin_frame_twice_panics() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(2), 2);
        let mut window = MockWindow::new();
        frames.begin_frame(&mut window).unwrap();
        let _ = frames.begin_frame(&mut window);
    }

    #[test]
    #[should_panic(expected = "no frame is in progress")]
    fn test_end_frame_without_begin_panics() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(2), 2);
        let _ = frames.end_frame(&mut MockWindow::new());
    }

    #[test]
    #[should_panic(expected = "different frame")]
    fn test_render_pass_on_foreign_command_buffer_panics() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(2), 2);
        let mut window = MockWindow::new();
        let cb = frames.begin_frame(&mut window).unwrap().unwrap();
        frames.begin_render_pass(cb + 1);
    }

    #[test]
    #[should_panic(expected = "frame not in progress")]
    fn test_render_pass_outside_frame_panics() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(2), 2);
        frames.begin_render_pass(100);
    }
}
