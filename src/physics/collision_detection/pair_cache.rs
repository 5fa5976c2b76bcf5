use std::collections::HashMap;
use std::fmt;

use slab::Slab;

use crate::physics::collidables::collidable_reference::CollidableReference;
use crate::physics::handles::{CollidableHandle, PairHandle};

use super::pair_handlers::{PairContext, PairHandler, PendingSolverChanges};

/// Unordered pair of collidable references, stored with the smaller reference first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollidablePair {
    pub a: CollidableReference,
    pub b: CollidableReference,
}

impl CollidablePair {
    /// Creates the pair in sorted order, so `(x, y)` and `(y, x)` compare equal.
    #[inline]
    pub fn new(a: CollidableReference, b: CollidableReference) -> Self {
        if b < a {
            Self { a: b, b: a }
        } else {
            Self { a, b }
        }
    }

    /// Gets whether either side is the given reference.
    #[inline]
    pub fn involves(&self, reference: &CollidableReference) -> bool {
        self.a == *reference || self.b == *reference
    }
}

impl fmt::Display for CollidablePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>", self.a, self.b)
    }
}

/// A top-level pair tracked by the narrow phase: its handler and the solver changes it raised this tick.
#[derive(Debug)]
pub struct NarrowPhasePair {
    pair: CollidablePair,
    pub(crate) handler: Box<PairHandler>,
    pub(crate) pending: PendingSolverChanges,
}

impl NarrowPhasePair {
    #[inline(always)]
    pub fn pair(&self) -> &CollidablePair {
        &self.pair
    }

    #[inline(always)]
    pub fn handler(&self) -> &PairHandler {
        &self.handler
    }

    /// Gets the handler mutably, for solvers writing back accumulated impulses.
    #[inline(always)]
    pub fn handler_mut(&mut self) -> &mut PairHandler {
        &mut self.handler
    }

    /// Updates the handler if its rule allows narrow phase updates. Solver changes land in `pending`.
    pub(crate) fn update(&mut self, dt: f32, ctx: PairContext) {
        if self.handler.collision_rule().allows_narrow_phase_update() {
            self.handler.update_collision(dt, ctx, &mut self.pending);
        }
    }
}

/// Storage for the narrow phase's top-level pairs, addressable by handle and by collidable pair.
#[derive(Debug, Default)]
pub struct PairCache {
    pairs: Slab<NarrowPhasePair>,
    mapping: HashMap<CollidablePair, PairHandle>,
}

impl PairCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Finds the handle of the pair for two references in either order.
    #[inline]
    pub fn find(&self, pair: &CollidablePair) -> Option<PairHandle> {
        self.mapping.get(pair).copied()
    }

    #[inline]
    pub fn contains(&self, pair: &CollidablePair) -> bool {
        self.mapping.contains_key(pair)
    }

    #[inline]
    pub fn get(&self, handle: PairHandle) -> Option<&NarrowPhasePair> {
        usize::try_from(handle.0).ok().and_then(|index| self.pairs.get(index))
    }

    #[inline]
    pub fn get_mut(&mut self, handle: PairHandle) -> Option<&mut NarrowPhasePair> {
        usize::try_from(handle.0).ok().and_then(|index| self.pairs.get_mut(index))
    }

    /// Adds a pair. The caller guarantees the pair is not already present.
    pub(crate) fn insert(&mut self, pair: CollidablePair, handler: Box<PairHandler>) -> PairHandle {
        debug_assert!(!self.mapping.contains_key(&pair), "pair {pair} inserted twice");
        let index = self.pairs.insert(NarrowPhasePair {
            pair: pair.clone(),
            handler,
            pending: PendingSolverChanges::default(),
        });
        let handle = PairHandle(index as i32);
        self.mapping.insert(pair, handle);
        handle
    }

    pub(crate) fn remove(&mut self, handle: PairHandle) -> Option<NarrowPhasePair> {
        let index = usize::try_from(handle.0).ok()?;
        let removed = self.pairs.try_remove(index)?;
        self.mapping.remove(&removed.pair);
        Some(removed)
    }

    /// Iterates pairs in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (PairHandle, &NarrowPhasePair)> {
        self.pairs.iter().map(|(index, pair)| (PairHandle(index as i32), pair))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (PairHandle, &mut NarrowPhasePair)> {
        self.pairs.iter_mut().map(|(index, pair)| (PairHandle(index as i32), pair))
    }

    /// Collects mutable references to every pair in handle order, for fanning work out to threads.
    pub(crate) fn pairs_mut(&mut self) -> Vec<&mut NarrowPhasePair> {
        self.pairs.iter_mut().map(|(_, pair)| pair).collect()
    }

    /// Handles of every pair with a side on the given root collidable, in handle order.
    pub fn pairs_involving(&self, root: CollidableHandle) -> Vec<PairHandle> {
        let mut handles: Vec<PairHandle> = self
            .mapping
            .iter()
            .filter(|(pair, _)| pair.a.root_handle() == root || pair.b.root_handle() == root)
            .map(|(_, handle)| *handle)
            .collect();
        handles.sort_unstable();
        handles
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = NarrowPhasePair> + '_ {
        self.mapping.clear();
        self.pairs.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_order_independent() {
        let x = CollidableReference::root(CollidableHandle(4));
        let y = CollidableReference::root(CollidableHandle(1)).child(2);
        assert_eq!(CollidablePair::new(x.clone(), y.clone()), CollidablePair::new(y.clone(), x.clone()));
        let pair = CollidablePair::new(x.clone(), y);
        assert_eq!(pair.a.root_handle(), CollidableHandle(1));
        assert!(pair.involves(&x));
        assert_eq!(pair.to_string(), "<CollidableHandle<1>/2, CollidableHandle<4>>");
    }
}
