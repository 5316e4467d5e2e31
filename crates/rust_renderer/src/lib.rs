//! # Rust Renderer
//!
//! A small Vulkan renderer driven by a sparse-array entity/component store.
//!
//! ## Features
//!
//! - **ECS**: fixed-capacity component pools with O(1) entity lookup
//! - **Frames in flight**: per-frame object mirrors and descriptor pools
//! - **Swapchain recovery**: out-of-date and resized surfaces rebuilt in place
//! - **Lighting**: up to [`render::MAX_LIGHTS`] point lights with billboards
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rust_renderer::prelude::*;
//!
//! let mut scene = EntityManager::new(1000);
//! register_scene_components(&mut scene, &ComponentCapacities::default());
//!
//! let vase = create_game_object(&mut scene, "vase");
//! scene.get_component_mut::<TransformComponent>(vase).translation = Vec3::new(0.0, 0.5, 0.0);
//! create_point_light(&mut scene, 0.2, 0.1, Vec3::new(1.0, 0.1, 0.1));
//!
//! let mut ubo = GlobalUbo::default();
//! PointLightSystem::update(&scene, &mut ubo, MAX_LIGHTS);
//! assert_eq!(ubo.num_lights, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod core;
pub mod ecs;
pub mod foundation;
pub mod render;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        assets::{ImageData, MeshData, ObjLoader, Vertex},
        config::{Config, ConfigError},
        core::{ApplicationConfig, ComponentCapacities, RendererConfig, ShaderConfig, WindowConfig},
        ecs::{
            components::{PointLightComponent, RendererComponent, TagComponent, TransformComponent},
            spawn::{create_default_point_light, create_game_object, create_point_light, register_scene_components},
            Component, Entity, EntityManager,
        },
        foundation::math::{Mat4, Vec3, Vec4},
        render::{
            Camera, FrameDescriptorPools, FrameInfo, FrameOrchestrator, GlobalUbo, ObjectManager, PointLightSystem,
            TexturedRenderSystem, MAX_LIGHTS,
        },
    };
}
