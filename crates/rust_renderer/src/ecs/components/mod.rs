//! Components understood by the renderer

pub mod lighting;
pub mod renderer;
pub mod tag;
pub mod transform;

pub use lighting::PointLightComponent;
pub use renderer::RendererComponent;
pub use tag::TagComponent;
pub use transform::TransformComponent;
