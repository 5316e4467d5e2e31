//! Asset loading
//!
//! CPU-side mesh and image data plus the loaders that produce them. GPU
//! upload lives in [`crate::render::vulkan`].

pub mod image_loader;
pub mod mesh;
pub mod obj_loader;

pub use image_loader::ImageData;
pub use mesh::{MeshData, Vertex};
pub use obj_loader::{ObjError, ObjLoader};

use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to load or decode an asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// Mesh file was malformed
    #[error("Parse error: {0}")]
    Parse(#[from] ObjError),
}
