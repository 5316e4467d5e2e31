//! Render systems that turn scene queries into draw commands

pub mod point_light_system;
pub mod textured_render_system;

pub use point_light_system::PointLightSystem;
pub use textured_render_system::TexturedRenderSystem;
