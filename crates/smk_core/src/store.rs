//! Depth-ordered entity container.
//!
//! Entities live in an arena of slots so their `EntityId` stays valid across
//! moves. Paint order is kept in a separate `BTreeSet` of `(SortKey, EntityId)`
//! pairs. Because the key is derived from position, any change to an entity's
//! bounds or name has to go through `update`, which pulls the entry out of the
//! index, applies the change, and reinserts it under the new key.

use std::collections::BTreeSet;

use crate::entity::{Entity, SortKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<(Entity, SortKey)>,
}

#[derive(Debug, Default)]
pub struct EntityStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: BTreeSet<(SortKey, EntityId)>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let key = entity.sort_key();
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some((entity, key.clone()));
                EntityId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some((entity, key.clone())),
                });
                EntityId {
                    index,
                    generation: 0,
                }
            }
        };
        self.order.insert((key, id));
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref().map(|(entity, _)| entity)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let (entity, key) = slot.entry.take()?;
        // Bumping the generation invalidates every copy of the old id.
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.order.remove(&(key, id));
        Some(entity)
    }

    /// Remove the first entity (in paint order) that satisfies `predicate`.
    pub fn remove_matching<F>(&mut self, predicate: F) -> Option<(EntityId, Entity)>
    where
        F: Fn(&Entity) -> bool,
    {
        let (id, _) = self.find(predicate)?;
        self.remove(id).map(|entity| (id, entity))
    }

    /// Apply `f` to the entity and re-sort it. The id is preserved.
    pub fn update<R, F>(&mut self, id: EntityId, f: F) -> Option<R>
    where
        F: FnOnce(&mut Entity) -> R,
    {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let (entity, key) = slot.entry.as_mut()?;
        self.order.remove(&(key.clone(), id));
        let result = f(entity);
        *key = entity.sort_key();
        self.order.insert((key.clone(), id));
        Some(result)
    }

    pub fn find<F>(&self, predicate: F) -> Option<(EntityId, &Entity)>
    where
        F: Fn(&Entity) -> bool,
    {
        self.iter_ordered().find(|(_, entity)| predicate(entity))
    }

    /// Ascending paint order: back to front. Reverse it for topmost-first.
    pub fn iter_ordered(&self) -> impl DoubleEndedIterator<Item = (EntityId, &Entity)> + '_ {
        self.order.iter().filter_map(move |(_, id)| {
            self.slots[id.index as usize]
                .entry
                .as_ref()
                .map(|(entity, _)| (*id, entity))
        })
    }

    /// Snapshot of ids in paint order, for passes that mutate while walking.
    pub fn ids_ordered(&self) -> Vec<EntityId> {
        self.order.iter().map(|(_, id)| *id).collect()
    }

    /// Empty the store. Slots are kept and their generations bumped, so ids
    /// handed out before the clear never resolve again.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.entry.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free.push(index as u32);
        }
        self.order.clear();
    }
}
