//! Entity/component storage.
//!
//! [`ComponentStore`] is a thin facade over a `bevy_ecs` [`World`]: entities
//! are integer identities handed out by the world, components live in the
//! world's archetype tables, and queries iterate every entity holding the
//! requested component set. Entities are never removed.
//!
//! Query iteration follows table order, which for entities that are only
//! ever spawned (never despawned or restructured) is spawn order. That keeps
//! per-frame iteration stable across runs with the same seed.

use bevy_ecs::prelude::*;
use bevy_ecs::query::QueryData;

use crate::error::StoreError;

#[derive(Default)]
pub struct ComponentStore {
    world: World,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self {
            world: World::new(),
        }
    }

    /// Create a new entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        self.world.spawn_empty().id()
    }

    /// Attach (or replace) a component on an existing entity.
    pub fn attach<C: Component>(&mut self, entity: Entity, component: C) -> Result<(), StoreError> {
        let mut entity_mut = self
            .world
            .get_entity_mut(entity)
            .map_err(|_| StoreError::NoSuchEntity(entity))?;
        entity_mut.insert(component);
        Ok(())
    }

    /// Whether `entity` has been created by this store.
    pub fn contains(&self, entity: Entity) -> bool {
        self.world.get_entity(entity).is_ok()
    }

    /// Read one component of an entity.
    pub fn get<C: Component>(&self, entity: Entity) -> Option<&C> {
        self.world.get::<C>(entity)
    }

    /// Prepare a query over every entity holding the component set `D`.
    ///
    /// ```ignore
    /// let mut query = store.query::<(&Velocity, &VisualHandle)>();
    /// for (velocity, handle) in query.iter(store.world()) { /* ... */ }
    /// ```
    pub fn query<D: QueryData>(&mut self) -> QueryState<D> {
        self.world.query::<D>()
    }

    pub fn insert_resource<R: Resource>(&mut self, resource: R) {
        self.world.insert_resource(resource);
    }

    pub fn resource<R: Resource>(&self) -> &R {
        self.world.resource::<R>()
    }

    pub fn resource_mut<R: Resource>(&mut self) -> Mut<'_, R> {
        self.world.resource_mut::<R>()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Component, Debug, PartialEq)]
    struct Speed(f32);

    #[derive(Component, Debug, PartialEq)]
    struct Label(&'static str);

    #[test]
    fn attach_and_query_intersects_component_sets() {
        let mut store = ComponentStore::new();
        let both = store.create_entity();
        let speed_only = store.create_entity();
        store.attach(both, Speed(1.0)).unwrap();
        store.attach(both, Label("both")).unwrap();
        store.attach(speed_only, Speed(2.0)).unwrap();

        let mut query = store.query::<(Entity, &Speed, &Label)>();
        let hits: Vec<_> = query.iter(store.world()).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, both);
        assert_eq!(hits[0].2, &Label("both"));

        let mut speeds = store.query::<&Speed>();
        assert_eq!(speeds.iter(store.world()).count(), 2);
    }

    #[test]
    fn query_without_matches_is_empty() {
        let mut store = ComponentStore::new();
        store.create_entity();
        let mut query = store.query::<&Speed>();
        assert_eq!(query.iter(store.world()).count(), 0);
    }

    #[test]
    fn attach_replaces_existing_component() {
        let mut store = ComponentStore::new();
        let e = store.create_entity();
        store.attach(e, Speed(1.0)).unwrap();
        store.attach(e, Speed(3.0)).unwrap();
        assert_eq!(store.get::<Speed>(e), Some(&Speed(3.0)));
    }

    #[test]
    fn attach_to_unknown_entity_is_an_error() {
        let mut store = ComponentStore::new();
        let e = store.create_entity();
        // an id minted by a different world with no live counterpart here
        let stray = {
            let mut third = ComponentStore::new();
            for _ in 0..10 {
                third.create_entity();
            }
            third.create_entity()
        };
        assert!(store.contains(e));
        assert!(!store.contains(stray));
        assert_eq!(
            store.attach(stray, Speed(1.0)),
            Err(StoreError::NoSuchEntity(stray))
        );
    }

    #[test]
    fn query_order_follows_spawn_order() {
        let mut store = ComponentStore::new();
        let ids: Vec<Entity> = (0..5)
            .map(|i| {
                let e = store.create_entity();
                store.attach(e, Speed(i as f32)).unwrap();
                e
            })
            .collect();
        let mut query = store.query::<(Entity, &Speed)>();
        let seen: Vec<Entity> = query.iter(store.world()).map(|(e, _)| e).collect();
        assert_eq!(seen, ids);
    }
}
