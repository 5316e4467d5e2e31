//! Component trait

/// Marker trait for components
///
/// Pools default-construct a component when it is added to an entity, so every
/// component type must implement [`Default`].
pub trait Component: 'static + Send + Sync + Default {}
