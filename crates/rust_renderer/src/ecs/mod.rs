//! Sparse-array entity/component store
//!
//! Entities are plain ids handed out by an [`EntityManager`]. Each registered
//! component type lives in its own fixed-capacity [`ComponentPool`]; the
//! manager forwards typed access to the right pool and keeps every pool's
//! entity table in step with entity creation.

pub mod component;
pub mod components;
pub mod entity;
pub mod manager;
pub mod pool;
pub mod sparse_array;
pub mod spawn;

pub use component::Component;
pub use entity::Entity;
pub use manager::{ComponentId, EntityManager};
pub use pool::{AnyPool, ComponentPool};
pub use sparse_array::SparseArray;
