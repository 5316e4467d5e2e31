//! Drawable mesh + texture pair

use std::sync::Arc;

use crate::ecs::Component;
use crate::render::vulkan::{Model, Texture};

/// Marks an entity as drawn by the textured render system
///
/// Both resources are shared and immutable; they live as long as the longest
/// holder of the `Arc`. Entities missing either one are skipped when drawing.
#[derive(Debug, Clone, Default)]
pub struct RendererComponent {
    /// Vertex and index buffers
    pub model: Option<Arc<Model>>,
    /// Diffuse color texture
    pub diffuse_map: Option<Arc<Texture>>,
}

impl Component for RendererComponent {}

impl RendererComponent {
    /// Renderable with both resources set
    #[must_use]
    pub const fn new(model: Arc<Model>, diffuse_map: Arc<Texture>) -> Self {
        Self {
            model: Some(model),
            diffuse_map: Some(diffuse_map),
        }
    }

    /// Whether both resources are present
    #[must_use]
    pub const fn is_drawable(&self) -> bool {
        self.model.is_some() && self.diffuse_map.is_some()
    }
}
