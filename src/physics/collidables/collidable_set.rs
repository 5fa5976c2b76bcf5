use slab::Slab;

use crate::physics::handles::CollidableHandle;

use super::collidable::Collidable;

/// Storage for every collidable known to the narrow phase, addressed by stable handles.
/// Handles of removed collidables are reused by later additions.
#[derive(Debug, Default)]
pub struct CollidableSet {
    collidables: Slab<Collidable>,
}

impl CollidableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collidable and returns its handle.
    pub fn add(&mut self, collidable: Collidable) -> CollidableHandle {
        CollidableHandle(self.collidables.insert(collidable) as i32)
    }

    /// Removes a collidable. Any pairs involving it should be removed from the narrow phase first.
    pub fn remove(&mut self, handle: CollidableHandle) -> Option<Collidable> {
        self.collidables.try_remove(handle.0 as usize)
    }

    #[inline]
    pub fn get(&self, handle: CollidableHandle) -> Option<&Collidable> {
        self.collidables.get(handle.0 as usize)
    }

    #[inline]
    pub fn get_mut(&mut self, handle: CollidableHandle) -> Option<&mut Collidable> {
        self.collidables.get_mut(handle.0 as usize)
    }

    #[inline]
    pub fn contains(&self, handle: CollidableHandle) -> bool {
        self.collidables.contains(handle.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CollidableHandle, &Collidable)> {
        self.collidables
            .iter()
            .map(|(index, collidable)| (CollidableHandle(index as i32), collidable))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (CollidableHandle, &mut Collidable)> {
        self.collidables
            .iter_mut()
            .map(|(index, collidable)| (CollidableHandle(index as i32), collidable))
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.collidables.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.collidables.is_empty()
    }
}

impl std::ops::Index<CollidableHandle> for CollidableSet {
    type Output = Collidable;

    /// # Panics
    /// Panics if the handle does not refer to a live collidable.
    fn index(&self, handle: CollidableHandle) -> &Collidable {
        match self.get(handle) {
            Some(collidable) => collidable,
            None => panic!("{handle} does not refer to a live collidable"),
        }
    }
}
