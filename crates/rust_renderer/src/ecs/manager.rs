//! Entity allocation and component pool ownership
//!
//! The [`EntityManager`] hands out entity ids, owns one [`ComponentPool`] per
//! registered component type and forwards typed component access to the
//! matching pool.
//!
//! Ids are recycled through a free list threaded through the entity table: a
//! live slot stores its own id, a free slot stores the id of the next free
//! slot (or [`END_OF_FREE_LIST`]). An entity is therefore valid exactly when
//! its slot points at itself.
//!
//! Component type ids are assigned by the manager at registration, in
//! registration order, and kept in a per-manager registry keyed by
//! [`TypeId`]. Two managers never share type ids.

use std::any::{type_name, TypeId};
use std::collections::{BTreeSet, HashMap};

use super::{AnyPool, Component, ComponentPool, Entity};

/// Index of a registered component type within one manager
pub type ComponentId = usize;

const END_OF_FREE_LIST: u32 = u32::MAX;

/// Owns entity ids and the component pools
pub struct EntityManager {
    entities: Vec<u32>,
    next_free: Option<u32>,
    free_count: usize,
    max_entities: usize,
    pools: Vec<Box<dyn AnyPool>>,
    registry: HashMap<TypeId, ComponentId>,
}

impl EntityManager {
    /// Create a manager that can hold up to `max_entities` live entities
    #[must_use]
    pub fn new(max_entities: usize) -> Self {
        Self {
            entities: Vec::with_capacity(max_entities),
            next_free: None,
            free_count: 0,
            max_entities,
            pools: Vec::new(),
            registry: HashMap::new(),
        }
    }

    /// Register component type `T` with a pool of `max_count` slots
    ///
    /// # Panics
    /// Panics when `T` is already registered.
    pub fn register_component<T: Component>(&mut self, max_count: usize) -> ComponentId {
        let type_id = TypeId::of::<T>();
        assert!(
            !self.registry.contains_key(&type_id),
            "Component {} registered twice",
            type_name::<T>()
        );

        let id = self.pools.len();
        self.pools
            .push(Box::new(ComponentPool::<T>::new(max_count, self.entities.len())));
        self.registry.insert(type_id, id);
        log::debug!("Registered component {} as #{id} with capacity {max_count}", type_name::<T>());
        id
    }

    /// Whether `T` has been registered
    #[must_use]
    pub fn is_registered<T: Component>(&self) -> bool {
        self.registry.contains_key(&TypeId::of::<T>())
    }

    /// Id assigned to `T` at registration
    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.registry.get(&TypeId::of::<T>()).copied()
    }

    /// Allocate an entity, reusing the most recently destroyed id first
    ///
    /// # Panics
    /// Panics when `max_entities` entities are already live.
    pub fn create_entity(&mut self) -> Entity {
        if let Some(id) = self.next_free {
            let link = self.entities[id as usize];
            self.next_free = (link != END_OF_FREE_LIST).then_some(link);
            self.entities[id as usize] = id;
            self.free_count -= 1;
            log::trace!("Reused entity {id}");
            return Entity::new(id);
        }

        assert!(
            self.entities.len() < self.max_entities,
            "Entity capacity ({}) exceeded",
            self.max_entities
        );
        let id = u32::try_from(self.entities.len())
            .unwrap_or_else(|_| panic!("entity id space exhausted"));
        self.entities.push(id);
        for pool in &mut self.pools {
            pool.resize_entity_table(self.entities.len());
        }
        log::trace!("Created entity {id}");
        Entity::new(id)
    }

    /// Remove every component of `entity` and recycle its id
    ///
    /// # Panics
    /// Panics when `entity` is not valid.
    pub fn destroy_entity(&mut self, entity: Entity) {
        assert!(self.is_valid(entity), "Destroying invalid {entity}");
        for pool in &mut self.pools {
            pool.remove_if_exist(entity);
        }
        self.entities[entity.index()] = self.next_free.unwrap_or(END_OF_FREE_LIST);
        self.next_free = Some(entity.id());
        self.free_count += 1;
        log::trace!("Destroyed {entity}");
    }

    /// Destroy every entity and clear every pool
    pub fn reset(&mut self) {
        for pool in &mut self.pools {
            pool.reset();
            pool.resize_entity_table(0);
        }
        self.entities.clear();
        self.next_free = None;
        self.free_count = 0;
    }

    /// Whether `entity` is currently live
    #[must_use]
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.entities.get(entity.index()) == Some(&entity.id())
    }

    /// Number of live entities
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len() - self.free_count
    }

    /// True when no entity is live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of live entities
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.max_entities
    }

    /// Attach a default `T` to `entity`
    ///
    /// # Panics
    /// Panics when `entity` is invalid, already owns a `T`, or the pool is full.
    pub fn add_component<T: Component>(&mut self, entity: Entity) -> &mut T {
        self.assert_valid(entity);
        self.pool_mut::<T>().add(entity)
    }

    /// Attach `value` to `entity`
    ///
    /// # Panics
    /// Same as [`Self::add_component`].
    pub fn insert_component<T: Component>(&mut self, entity: Entity, value: T) -> &mut T {
        let component = self.add_component::<T>(entity);
        *component = value;
        component
    }

    /// Detach `T` from `entity`
    ///
    /// # Panics
    /// Panics when `entity` has no `T`.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> T {
        self.pool_mut::<T>().remove(entity)
    }

    /// Whether `entity` owns a `T`
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.pool::<T>().has(entity)
    }

    /// The `T` owned by `entity`
    ///
    /// # Panics
    /// Panics when `entity` has no `T`.
    #[must_use]
    pub fn get_component<T: Component>(&self, entity: Entity) -> &T {
        self.pool::<T>().get(entity)
    }

    /// The `T` owned by `entity`, mutably
    ///
    /// # Panics
    /// Panics when `entity` has no `T`.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        self.pool_mut::<T>().get_mut(entity)
    }

    /// The `T` owned by `entity`, added first when missing
    pub fn get_or_add_component<T: Component>(&mut self, entity: Entity) -> &mut T {
        self.assert_valid(entity);
        self.pool_mut::<T>().get_or_add(entity)
    }

    /// Ids of every registered component type `entity` owns
    #[must_use]
    pub fn component_ids(&self, entity: Entity) -> Vec<ComponentId> {
        self.pools
            .iter()
            .enumerate()
            .filter_map(|(id, pool)| pool.has(entity).then_some(id))
            .collect()
    }

    /// Entities owning a `T`, in ascending id order
    #[must_use]
    pub fn entities<T: Component>(&self) -> &BTreeSet<Entity> {
        self.pool::<T>().owners()
    }

    /// The pool storing `T`
    ///
    /// # Panics
    /// Panics when `T` is not registered.
    #[must_use]
    pub fn pool<T: Component>(&self) -> &ComponentPool<T> {
        let id = self.registered_id::<T>();
        match self.pools[id].as_any().downcast_ref::<ComponentPool<T>>() {
            Some(pool) => pool,
            None => unreachable!("registry maps {} to a foreign pool", type_name::<T>()),
        }
    }

    /// The pool storing `T`, mutably
    ///
    /// # Panics
    /// Panics when `T` is not registered.
    pub fn pool_mut<T: Component>(&mut self) -> &mut ComponentPool<T> {
        let id = self.registered_id::<T>();
        match self.pools[id].as_any_mut().downcast_mut::<ComponentPool<T>>() {
            Some(pool) => pool,
            None => unreachable!("registry maps {} to a foreign pool", type_name::<T>()),
        }
    }

    fn registered_id<T: Component>(&self) -> ComponentId {
        match self.component_id::<T>() {
            Some(id) => id,
            None => panic!("Component {} is not registered", type_name::<T>()),
        }
    }

    fn assert_valid(&self, entity: Entity) {
        assert!(self.is_valid(entity), "Invalid {entity}");
    }
}

impl std::fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityManager")
            .field("live", &self.len())
            .field("capacity", &self.max_entities)
            .field(
                "pools",
                &self
                    .pools
                    .iter()
                    .map(|pool| (pool.component_name(), pool.len()))
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Position(f32, f32);
    impl Component for Position {}

    #[derive(Debug, Default)]
    struct Marker;
    impl Component for Marker {}

    fn manager() -> EntityManager {
        let mut manager = EntityManager::new(16);
        manager.register_component::<Position>(8);
        manager.register_component::<Marker>(4);
        manager
    }

    #[test]
    fn test_registration_order_assigns_ids() {
        let manager = manager();
        assert_eq!(manager.component_id::<Position>(), Some(0));
        assert_eq!(manager.component_id::<Marker>(), Some(1));
    }

    #[test]
    fn test_destroy_invalidates_and_clears_pools() {
        let mut manager = manager();
        let a = manager.create_entity();
        let b = manager.create_entity();
        manager.add_component::<Position>(a);
        manager.add_component::<Marker>(a);
        manager.add_component::<Position>(b);

        manager.destroy_entity(a);
        assert!(!manager.is_valid(a));
        assert!(!manager.has_component::<Position>(a));
        assert!(!manager.has_component::<Marker>(a));
        assert!(manager.is_valid(b));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_destroy_in_any_order() {
        let mut manager = manager();
        let entities: Vec<_> = (0..6).map(|_| manager.create_entity()).collect();
        for &entity in &entities {
            manager.add_component::<Position>(entity);
        }
        for &index in &[3, 0, 5, 1, 4, 2] {
            manager.destroy_entity(entities[index]);
        }
        for &entity in &entities {
            assert!(!manager.is_valid(entity));
            assert!(!manager.has_component::<Position>(entity));
        }
        assert!(manager.is_empty());
    }

    #[test]
    fn test_destroyed_id_is_reused_first() {
        let mut manager = manager();
        let _a = manager.create_entity();
        let b = manager.create_entity();
        let c = manager.create_entity();
        manager.destroy_entity(b);
        manager.destroy_entity(c);

        assert_eq!(manager.create_entity(), c);
        assert_eq!(manager.create_entity(), b);
        assert_eq!(manager.create_entity().id(), 3);
    }

    #[test]
    fn test_add_get_identity() {
        let mut manager = manager();
        let e = manager.create_entity();
        *manager.add_component::<Position>(e) = Position(1.0, 2.0);
        manager.get_component_mut::<Position>(e).0 = 5.0;
        assert_eq!(manager.get_component::<Position>(e), &Position(5.0, 2.0));
    }

    #[test]
    fn test_component_ids() {
        let mut manager = manager();
        let e = manager.create_entity();
        manager.add_component::<Marker>(e);
        assert_eq!(manager.component_ids(e), vec![1]);
        manager.get_or_add_component::<Position>(e);
        assert_eq!(manager.component_ids(e), vec![0, 1]);
    }

    #[test]
    fn test_reset_twice() {
        let mut manager = manager();
        let e = manager.create_entity();
        manager.add_component::<Position>(e);
        manager.reset();
        manager.reset();
        assert_eq!(manager.len(), 0);
        assert_eq!(manager.pool::<Position>().len(), 0);
        assert!(!manager.is_valid(e));

        let fresh = manager.create_entity();
        assert_eq!(fresh.id(), 0);
        manager.add_component::<Position>(fresh);
    }

    #[test]
    fn test_late_registration_covers_existing_entities() {
        let mut manager = EntityManager::new(4);
        let e = manager.create_entity();
        manager.register_component::<Marker>(2);
        manager.add_component::<Marker>(e);
        assert!(manager.has_component::<Marker>(e));
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_registration_panics() {
        let mut manager = manager();
        manager.register_component::<Position>(1);
    }

    #[test]
    #[should_panic(expected = "is not registered")]
    fn test_unregistered_type_panics() {
        let mut manager = EntityManager::new(2);
        let e = manager.create_entity();
        manager.add_component::<Position>(e);
    }

    #[test]
    #[should_panic(expected = "Destroying invalid")]
    fn test_double_destroy_panics() {
        let mut manager = manager();
        let e = manager.create_entity();
        manager.destroy_entity(e);
        manager.destroy_entity(e);
    }

    #[test]
    #[should_panic(expected = "Entity capacity (2) exceeded")]
    fn test_entity_capacity_panics() {
        let mut manager = EntityManager::new(2);
        for _ in 0..3 {
            manager.create_entity();
        }
    }

    #[test]
    #[should_panic(expected = "Invalid")]
    fn test_add_to_destroyed_entity_panics() {
        let mut manager = manager();
        let e = manager.create_entity();
        manager.destroy_entity(e);
        manager.add_component::<Marker>(e);
    }
}
