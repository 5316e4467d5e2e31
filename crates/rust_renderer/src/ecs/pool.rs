//! Per-type component storage
//!
//! A [`ComponentPool`] pairs a [`SparseArray`] of components with an
//! entity-indexed redirection table and the set of entities owning a
//! component. All three are updated together; a pool never holds two slots
//! for the same entity.
//!
//! Contract violations (adding twice, touching a missing component, going
//! past capacity) are caller bugs and panic.

use std::any::{type_name, Any};
use std::collections::BTreeSet;

use super::{Component, Entity, SparseArray};

/// Dense fixed-capacity store for one component type
#[derive(Debug)]
pub struct ComponentPool<T> {
    components: SparseArray<T>,
    slot_of: Vec<Option<usize>>,
    owners: BTreeSet<Entity>,
}

impl<T: Component> ComponentPool<T> {
    /// Create a pool holding at most `capacity` components, with a
    /// redirection table covering `entity_count` entities
    #[must_use]
    pub fn new(capacity: usize, entity_count: usize) -> Self {
        Self {
            components: SparseArray::new(capacity),
            slot_of: vec![None; entity_count],
            owners: BTreeSet::new(),
        }
    }

    /// Attach a default component to `entity`
    ///
    /// # Panics
    /// Panics when the entity already owns this component, when the entity is
    /// outside the redirection table, or when the pool is full.
    pub fn add(&mut self, entity: Entity) -> &mut T {
        assert!(
            entity.index() < self.slot_of.len(),
            "{entity} is outside the {} pool's entity table",
            type_name::<T>()
        );
        assert!(
            !self.has(entity),
            "{entity} already has a {} component",
            type_name::<T>()
        );
        assert!(
            !self.components.is_full(),
            "{} pool is full (capacity {})",
            type_name::<T>(),
            self.capacity()
        );

        let slot = self.components.add(T::default());
        self.slot_of[entity.index()] = Some(slot);
        self.owners.insert(entity);
        self.slot_mut(slot)
    }

    /// Detach and return the component of `entity`
    ///
    /// # Panics
    /// Panics when the entity has no component in this pool.
    pub fn remove(&mut self, entity: Entity) -> T {
        let slot = self.slot_or_panic(entity);
        self.slot_of[entity.index()] = None;
        self.owners.remove(&entity);
        self.components.remove_at(slot)
    }

    /// Detach the component of `entity` if there is one
    pub fn remove_if_exist(&mut self, entity: Entity) -> bool {
        if self.has(entity) {
            self.remove(entity);
            true
        } else {
            false
        }
    }

    /// Component of `entity`
    ///
    /// # Panics
    /// Panics when the entity has no component in this pool.
    #[must_use]
    pub fn get(&self, entity: Entity) -> &T {
        let slot = self.slot_or_panic(entity);
        match self.components.get(slot) {
            Some(component) => component,
            None => unreachable!("redirection table points at a free slot"),
        }
    }

    /// Mutable component of `entity`
    ///
    /// # Panics
    /// Panics when the entity has no component in this pool.
    pub fn get_mut(&mut self, entity: Entity) -> &mut T {
        let slot = self.slot_or_panic(entity);
        self.slot_mut(slot)
    }

    /// Component of `entity`, added first when missing
    pub fn get_or_add(&mut self, entity: Entity) -> &mut T {
        if self.has(entity) {
            self.get_mut(entity)
        } else {
            self.add(entity)
        }
    }

    /// Iterate `(entity, component)` pairs in entity order
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.owners.iter().map(|&entity| (entity, self.get(entity)))
    }

    /// Drop every component and clear all redirections
    pub fn reset(&mut self) {
        self.components.reset();
        self.slot_of.iter_mut().for_each(|slot| *slot = None);
        self.owners.clear();
    }

    /// Same as [`Self::reset`]
    pub fn reset_pool(&mut self) {
        self.reset();
    }

    fn slot_or_panic(&self, entity: Entity) -> usize {
        match self.slot_of.get(entity.index()).copied().flatten() {
            Some(slot) => slot,
            None => panic!("{entity} has no {} component", type_name::<T>()),
        }
    }

    fn slot_mut(&mut self, slot: usize) -> &mut T {
        match self.components.get_mut(slot) {
            Some(component) => component,
            None => unreachable!("redirection table points at a free slot"),
        }
    }
}

impl<T> ComponentPool<T> {
    /// Whether `entity` owns a component here
    #[must_use]
    pub fn has(&self, entity: Entity) -> bool {
        matches!(self.slot_of.get(entity.index()), Some(Some(_)))
    }

    /// Entities owning a component here
    #[must_use]
    pub const fn owners(&self) -> &BTreeSet<Entity> {
        &self.owners
    }

    /// Number of live components
    #[must_use]
    pub const fn len(&self) -> usize {
        self.components.len()
    }

    /// True when no component is live
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Maximum number of components
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.components.capacity()
    }
}

/// Type-erased view of a [`ComponentPool`] used by the entity manager
pub trait AnyPool: Any + Send + Sync {
    /// Whether `entity` owns a component in this pool
    fn has(&self, entity: Entity) -> bool;

    /// Detach the component of `entity` if there is one
    fn remove_if_exist(&mut self, entity: Entity) -> bool;

    /// Drop every component
    fn reset(&mut self);

    /// Resize the redirection table to cover `entity_count` entities
    fn resize_entity_table(&mut self, entity_count: usize);

    /// Number of live components
    fn len(&self) -> usize;

    /// Name of the stored component type
    fn component_name(&self) -> &'static str;

    /// Upcast for downcasting to the concrete pool
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete pool
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyPool for ComponentPool<T> {
    fn has(&self, entity: Entity) -> bool {
        Self::has(self, entity)
    }

    fn remove_if_exist(&mut self, entity: Entity) -> bool {
        Self::remove_if_exist(self, entity)
    }

    fn reset(&mut self) {
        Self::reset(self);
    }

    fn resize_entity_table(&mut self, entity_count: usize) {
        debug_assert!(
            self.owners.iter().all(|entity| entity.index() < entity_count),
            "shrinking the entity table would orphan components"
        );
        self.slot_of.resize(entity_count, None);
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn component_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Health(i32);
    impl Component for Health {}

    fn entity(id: u32) -> Entity {
        Entity::new(id)
    }

    #[test]
    fn test_add_then_get_returns_same_component() {
        let mut pool = ComponentPool::<Health>::new(4, 8);
        pool.add(entity(3)).0 = 42;
        assert_eq!(pool.get(entity(3)), &Health(42));

        pool.get_mut(entity(3)).0 += 1;
        assert_eq!(pool.get(entity(3)).0, 43);
    }

    #[test]
    fn test_owners_and_redirection_stay_consistent() {
        let mut pool = ComponentPool::<Health>::new(4, 8);
        pool.add(entity(1));
        pool.add(entity(5));
        pool.remove(entity(1));

        assert!(!pool.has(entity(1)));
        assert!(pool.has(entity(5)));
        assert_eq!(pool.owners().iter().copied().collect::<Vec<_>>(), vec![entity(5)]);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_get_or_add_never_fails() {
        let mut pool = ComponentPool::<Health>::new(2, 2);
        pool.get_or_add(entity(0)).0 = 7;
        assert_eq!(pool.get_or_add(entity(0)).0, 7);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_remove_if_exist() {
        let mut pool = ComponentPool::<Health>::new(2, 2);
        assert!(!pool.remove_if_exist(entity(0)));
        pool.add(entity(0));
        assert!(pool.remove_if_exist(entity(0)));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_reset_twice_is_safe() {
        let mut pool = ComponentPool::<Health>::new(3, 3);
        pool.add(entity(0));
        pool.add(entity(2));
        pool.reset_pool();
        assert_eq!(pool.len(), 0);
        pool.reset_pool();
        assert_eq!(pool.len(), 0);
        assert!(!pool.has(entity(2)));
        assert!(pool.owners().is_empty());
    }

    #[test]
    fn test_fill_to_capacity() {
        let mut pool = ComponentPool::<Health>::new(3, 10);
        for id in 0..3 {
            pool.add(entity(id));
        }
        assert_eq!(pool.len(), pool.capacity());
    }

    #[test]
    #[should_panic(expected = "pool is full")]
    fn test_add_past_capacity_panics() {
        let mut pool = ComponentPool::<Health>::new(3, 10);
        for id in 0..4 {
            pool.add(entity(id));
        }
    }

    #[test]
    #[should_panic(expected = "already has a")]
    fn test_double_add_panics() {
        let mut pool = ComponentPool::<Health>::new(2, 2);
        pool.add(entity(1));
        pool.add(entity(1));
    }

    #[test]
    #[should_panic(expected = "has no")]
    fn test_get_missing_panics() {
        let pool = ComponentPool::<Health>::new(2, 2);
        let _ = pool.get(entity(0));
    }

    #[test]
    #[should_panic(expected = "has no")]
    fn test_remove_missing_panics() {
        let mut pool = ComponentPool::<Health>::new(2, 2);
        pool.remove(entity(1));
    }

    #[test]
    fn test_erased_pool_grows_entity_table() {
        let mut pool = ComponentPool::<Health>::new(2, 0);
        AnyPool::resize_entity_table(&mut pool, 1);
        pool.add(entity(0));
        assert!(AnyPool::has(&pool, entity(0)));
        assert!(AnyPool::component_name(&pool).ends_with("Health"));
    }
}
