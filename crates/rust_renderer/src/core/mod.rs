//! Core renderer settings shared by the library and applications

pub mod config;

pub use config::{
    ApplicationConfig, AssetConfig, ComponentCapacities, RendererConfig, ShaderConfig, WindowConfig,
};
