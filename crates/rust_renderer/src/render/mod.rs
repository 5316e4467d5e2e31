//! # Rendering
//!
//! Frame orchestration, per-frame GPU mirrors and the render systems, on top
//! of the Vulkan backend in [`vulkan`].
//!
//! ## Frame flow
//!
//! 1. [`FrameOrchestrator::begin_frame`] waits for the frame slot, acquires a
//!    swapchain image and begins its command buffer. An out-of-date chain is
//!    rebuilt and the frame is skipped.
//! 2. The application writes the global UBO, refreshes the
//!    [`ObjectManager`] mirror and resets the frame's descriptor pool.
//! 3. Render systems record into the render pass.
//! 4. [`FrameOrchestrator::end_frame`] submits, presents and advances the
//!    frame index.

pub mod camera;
pub mod frame;
pub mod frame_descriptors;
pub mod frame_info;
pub mod lighting;
pub mod object_manager;
pub mod systems;
pub mod vulkan;

pub use camera::Camera;
pub use frame::{
    AcquireOutcome, ChainInfo, FrameBackend, FrameOrchestrator, ImageFences, PresentOutcome, SurfaceWindow,
};
pub use frame_descriptors::{FrameDescriptorPools, ResettablePool};
pub use frame_info::FrameInfo;
pub use lighting::{GlobalUbo, PointLight, MAX_LIGHTS};
pub use object_manager::{MirrorBuffer, ObjectManager, ObjectRecord};
pub use systems::{PointLightSystem, TexturedRenderSystem};
