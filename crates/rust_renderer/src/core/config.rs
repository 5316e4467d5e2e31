//! # Renderer Configuration
//!
//! Construction-time settings for the renderer and the viewer application.
//! Nothing in here is reconfigurable once the renderer has been built: entity
//! capacity, light capacity and the number of in-flight frames size GPU
//! buffers and descriptor pools up front.
//!
//! All structs are `#[serde(default)]`, so a config file only has to list the
//! values it changes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use crate::config::{Config, ConfigError};
use crate::render::lighting::MAX_LIGHTS;

/// Core renderer limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name reported to the Vulkan driver
    pub application_name: String,
    /// Maximum number of simultaneously allocated entities
    pub max_entities: usize,
    /// Maximum number of point lights written to the global UBO per frame
    pub max_lights: usize,
    /// Number of frames the CPU may record ahead of the GPU
    pub max_frames_in_flight: usize,
    /// Enable the Khronos validation layer
    pub enable_validation: bool,
    /// Clear color of the swapchain render pass
    pub clear_color: [f32; 4],
}

impl RendererConfig {
    /// Create a configuration with default limits
    #[must_use]
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            max_entities: 1000,
            max_lights: 10,
            max_frames_in_flight: 2,
            enable_validation: cfg!(debug_assertions),
            clear_color: [0.01, 0.01, 0.01, 1.0],
        }
    }

    /// Override the entity capacity
    #[must_use]
    pub const fn with_max_entities(mut self, max_entities: usize) -> Self {
        self.max_entities = max_entities;
        self
    }

    /// Override the light capacity
    #[must_use]
    pub const fn with_max_lights(mut self, max_lights: usize) -> Self {
        self.max_lights = max_lights;
        self
    }

    /// Override the number of frames in flight
    #[must_use]
    pub const fn with_max_frames_in_flight(mut self, frames: usize) -> Self {
        self.max_frames_in_flight = frames;
        self
    }

    /// Enable or disable validation layers
    #[must_use]
    pub const fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = enabled;
        self
    }

    /// Check that every limit is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Parse("Application name cannot be empty".to_string()));
        }
        if self.max_entities == 0 {
            return Err(ConfigError::Parse("max_entities must be at least 1".to_string()));
        }
        if self.max_lights > MAX_LIGHTS {
            return Err(ConfigError::Parse(format!(
                "max_lights ({}) exceeds the global UBO capacity ({MAX_LIGHTS})",
                self.max_lights
            )));
        }
        if !(1..=8).contains(&self.max_frames_in_flight) {
            return Err(ConfigError::Parse(format!(
                "max_frames_in_flight must be within 1..=8, got {}",
                self.max_frames_in_flight
            )));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("Rust Renderer")
    }
}

/// Pool capacity per component type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentCapacities {
    /// Transform pool size
    pub transform: usize,
    /// Tag pool size
    pub tag: usize,
    /// Point light pool size
    pub point_light: usize,
    /// Renderable pool size
    pub renderer: usize,
}

impl Default for ComponentCapacities {
    fn default() -> Self {
        Self {
            transform: 100,
            tag: 100,
            point_light: 20,
            renderer: 20,
        }
    }
}

/// Initial window settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Width in screen coordinates
    pub width: u32,
    /// Height in screen coordinates
    pub height: u32,
    /// Title bar text
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Rust Renderer".to_string(),
        }
    }
}

/// Locations of the compiled SPIR-V modules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Directory holding the `.spv` files
    pub directory: PathBuf,
    /// Textured mesh vertex stage
    pub textured_vertex: String,
    /// Textured mesh fragment stage
    pub textured_fragment: String,
    /// Point light billboard vertex stage
    pub point_light_vertex: String,
    /// Point light billboard fragment stage
    pub point_light_fragment: String,
}

impl ShaderConfig {
    /// Resolve a shader file name against the shader directory
    #[must_use]
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.directory.join(file_name)
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("target/shaders"),
            textured_vertex: "textured.vert.spv".to_string(),
            textured_fragment: "textured.frag.spv".to_string(),
            point_light_vertex: "point_light.vert.spv".to_string(),
            point_light_fragment: "point_light.frag.spv".to_string(),
        }
    }
}

/// Asset locations used by the viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Root directory for models and textures
    pub assets_dir: PathBuf,
    /// Models placed in a row, relative to `assets_dir`
    pub models: Vec<String>,
    /// Model stretched under the row as a floor
    pub floor: Option<String>,
    /// Diffuse texture shared by the models, relative to `assets_dir`
    pub diffuse_texture: Option<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("resources"),
            models: vec![
                "models/cube.obj".to_string(),
                "models/pyramid.obj".to_string(),
            ],
            floor: Some("models/quad.obj".to_string()),
            diffuse_texture: Some("textures/diffuse.png".to_string()),
        }
    }
}

/// Top level configuration of a viewer application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Renderer limits
    pub renderer: RendererConfig,
    /// Component pool capacities
    pub components: ComponentCapacities,
    /// Window settings
    pub window: WindowConfig,
    /// Shader locations
    pub shaders: ShaderConfig,
    /// Asset locations
    pub assets: AssetConfig,
}

impl ApplicationConfig {
    /// Validate all nested sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.renderer.validate()?;
        let caps = &self.components;
        if caps.point_light > self.renderer.max_entities || caps.transform > self.renderer.max_entities {
            return Err(ConfigError::Parse(
                "component pool larger than the entity capacity".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config for ApplicationConfig {}
impl Config for RendererConfig {}
