use indexmap::IndexSet;
use log::{debug, trace, warn};

use crate::physics::collidables::collidable_reference::CollidableReference;
use crate::physics::collidables::collidable_set::CollidableSet;
use crate::physics::handles::{CollidableHandle, ConstraintHandle, PairHandle};
use crate::physics::solver::ISolver;

use super::broad_phase_overlap::{BroadPhaseOverlap, CollisionRule};
use super::error::NarrowPhaseError;
use super::pair_cache::{CollidablePair, NarrowPhasePair, PairCache};
use super::pair_handler_pool::PairHandlerFactories;
use super::pair_handlers::{ContactInformation, PairContext, PairHandler, SolverUpdateableChange};
use super::settings::CollisionDetectionSettings;

/// Solver attach and detach requests waiting for the single-threaded flush.
///
/// A request that reverses a still-pending request cancels it, so each queue holds at most one
/// entry per item and an item is never in both.
#[derive(Debug, Default)]
struct SolverUpdateableQueues {
    generated: IndexSet<ConstraintHandle>,
    removed: IndexSet<ConstraintHandle>,
}

impl SolverUpdateableQueues {
    fn enqueue_generated(&mut self, item: ConstraintHandle) {
        if !self.removed.shift_remove(&item) {
            self.generated.insert(item);
        }
    }

    fn enqueue_removed(&mut self, item: ConstraintHandle) {
        if !self.generated.shift_remove(&item) {
            self.removed.insert(item);
        }
    }

    fn apply(&mut self, change: SolverUpdateableChange) {
        match change {
            SolverUpdateableChange::Add(item) => self.enqueue_generated(item),
            SolverUpdateableChange::Remove(item) => self.enqueue_removed(item),
        }
    }

    fn drain_pending(&mut self, pair: &mut NarrowPhasePair) {
        for change in pair.pending.drain() {
            self.apply(change);
        }
    }
}

/// Owns the top-level pairs created from broad phase overlaps, updates them each tick and
/// forwards the solver changes they produce.
pub struct NarrowPhase {
    factories: PairHandlerFactories,
    settings: CollisionDetectionSettings,
    pair_cache: PairCache,
    queues: SolverUpdateableQueues,
}

impl NarrowPhase {
    pub fn new(factories: PairHandlerFactories, settings: CollisionDetectionSettings) -> Self {
        Self {
            factories,
            settings,
            pair_cache: PairCache::new(),
            queues: SolverUpdateableQueues::default(),
        }
    }

    #[inline(always)]
    pub fn factories(&self) -> &PairHandlerFactories {
        &self.factories
    }

    #[inline(always)]
    pub fn settings(&self) -> &CollisionDetectionSettings {
        &self.settings
    }

    /// Settings changes apply to the next update. Existing pairs keep their blended materials until
    /// [`NarrowPhase::update_material_properties`] is called for them.
    #[inline(always)]
    pub fn settings_mut(&mut self) -> &mut CollisionDetectionSettings {
        &mut self.settings
    }

    #[inline(always)]
    pub fn pair_cache(&self) -> &PairCache {
        &self.pair_cache
    }

    #[inline]
    pub fn pair_count(&self) -> usize {
        self.pair_cache.len()
    }

    /// Builds the context handlers read while this narrow phase works on them.
    #[inline]
    pub fn context<'a>(&'a self, collidables: &'a CollidableSet) -> PairContext<'a> {
        PairContext::new(collidables, &self.factories, &self.settings)
    }

    #[inline]
    pub fn pair(&self, handle: PairHandle) -> Option<&PairHandler> {
        self.pair_cache.get(handle).map(NarrowPhasePair::handler)
    }

    /// Gets a pair's handler mutably, for solvers writing back accumulated impulses.
    #[inline]
    pub fn pair_mut(&mut self, handle: PairHandle) -> Option<&mut PairHandler> {
        self.pair_cache.get_mut(handle).map(NarrowPhasePair::handler_mut)
    }

    /// Finds the pair between two collidables in either order.
    pub fn find_pair(&self, a: CollidableHandle, b: CollidableHandle) -> Option<PairHandle> {
        self.pair_cache
            .find(&CollidablePair::new(CollidableReference::root(a), CollidableReference::root(b)))
    }

    /// Handles of every pair involving a collidable, in handle order.
    pub fn pairs_of(&self, collidable: CollidableHandle) -> Vec<PairHandle> {
        self.pair_cache.pairs_involving(collidable)
    }

    /// Creates the pair for a new broad phase overlap.
    ///
    /// The overlap's rule is combined with the configured default and with both collidables' own
    /// rules. Returns `Ok(None)` when the combined rule forbids a narrow phase pair.
    pub fn overlap_created(
        &mut self,
        collidables: &CollidableSet,
        a: CollidableHandle,
        b: CollidableHandle,
        rule: CollisionRule,
    ) -> Result<Option<PairHandle>, NarrowPhaseError> {
        let collidable_a = collidables.get(a).ok_or(NarrowPhaseError::UnknownCollidable(a))?;
        let collidable_b = collidables.get(b).ok_or(NarrowPhaseError::UnknownCollidable(b))?;
        let pair = CollidablePair::new(CollidableReference::root(a), CollidableReference::root(b));
        if self.pair_cache.contains(&pair) {
            return Err(NarrowPhaseError::DuplicateOverlap(pair));
        }
        let rule = rule
            .combine(self.settings.default_collision_rule)
            .combine(collidable_a.collision_rule)
            .combine(collidable_b.collision_rule);
        if !rule.allows_narrow_phase_pair() {
            trace!("{pair} is excluded from the narrow phase by {rule:?}");
            return Ok(None);
        }

        let (kind_a, kind_b) = (collidable_a.shape.kind(), collidable_b.shape.kind());
        let mut handler = self.factories.acquire(kind_a, kind_b).map_err(|error| {
            warn!("cannot create a pair for {pair}: {error}");
            error
        })?;
        let ctx = PairContext::new(collidables, &self.factories, &self.settings);
        handler.initialize(BroadPhaseOverlap::new(pair.a.clone(), pair.b.clone(), rule), None, ctx);
        let handle = self.pair_cache.insert(pair.clone(), handler);
        debug!("created {handle} for {pair} ({kind_a:?} against {kind_b:?}, {rule:?})");
        Ok(Some(handle))
    }

    /// Cleans up the pair for a retracted broad phase overlap and returns its handler to its pool.
    /// Solver detachments raised by the clean up are queued for the next flush.
    pub fn overlap_removed(&mut self, collidables: &CollidableSet, handle: PairHandle) -> Result<(), NarrowPhaseError> {
        let mut removed = self
            .pair_cache
            .remove(handle)
            .ok_or(NarrowPhaseError::UnknownPair(handle))?;
        let ctx = PairContext::new(collidables, &self.factories, &self.settings);
        removed.handler.clean_up(ctx, &mut removed.pending);
        self.queues.drain_pending(&mut removed);
        debug!("removed {handle} for {}", removed.pair());
        self.factories.release(removed.handler);
        Ok(())
    }

    /// Removes every pair involving a collidable. Returns the removed handles.
    pub fn remove_pairs_of(&mut self, collidables: &CollidableSet, collidable: CollidableHandle) -> Vec<PairHandle> {
        let handles = self.pair_cache.pairs_involving(collidable);
        for &handle in &handles {
            let removed = self.overlap_removed(collidables, handle);
            debug_assert!(removed.is_ok(), "cached pair {handle} could not be removed: {removed:?}");
        }
        handles
    }

    /// Updates every pair for the coming step, in parallel when the `parallel` feature is on.
    ///
    /// Solver changes are gathered in pair handle order once every pair has been updated, so the
    /// queued order does not depend on thread scheduling.
    pub fn update(&mut self, collidables: &CollidableSet, dt: f32) {
        let ctx = PairContext::new(collidables, &self.factories, &self.settings);
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            self.pair_cache
                .pairs_mut()
                .into_par_iter()
                .for_each(|pair| pair.update(dt, ctx));
        }
        #[cfg(not(feature = "parallel"))]
        for (_, pair) in self.pair_cache.iter_mut() {
            pair.update(dt, ctx);
        }
        for (_, pair) in self.pair_cache.iter_mut() {
            self.queues.drain_pending(pair);
        }
    }

    /// Queues an item to enter the solver at the next flush. Cancels a pending removal of the same item.
    pub fn enqueue_generated_solver_updateable(&mut self, item: ConstraintHandle) {
        self.queues.enqueue_generated(item);
    }

    /// Queues an item to leave the solver at the next flush. Cancels a pending addition of the same item.
    pub fn enqueue_removed_solver_updateable(&mut self, item: ConstraintHandle) {
        self.queues.enqueue_removed(item);
    }

    /// Items waiting to enter the solver, in the order they were queued.
    pub fn generated_solver_updateables(&self) -> impl Iterator<Item = ConstraintHandle> + '_ {
        self.queues.generated.iter().copied()
    }

    /// Items waiting to leave the solver, in the order they were queued.
    pub fn removed_solver_updateables(&self) -> impl Iterator<Item = ConstraintHandle> + '_ {
        self.queues.removed.iter().copied()
    }

    /// Applies the queued solver changes. Removals are applied before additions.
    pub fn flush_solver_updateables(&mut self, solver: &mut dyn ISolver) {
        let removed = self.queues.removed.len();
        let generated = self.queues.generated.len();
        for item in self.queues.removed.drain(..) {
            solver.remove_solver_updateable(item);
        }
        for item in self.queues.generated.drain(..) {
            solver.add_solver_updateable(item);
        }
        if removed + generated > 0 {
            debug!("flushed {generated} solver additions and {removed} solver removals");
        }
    }

    /// Recomputes the time of impact of every pair involving `requester` and returns the minimum.
    pub fn update_time_of_impact(
        &mut self,
        collidables: &CollidableSet,
        requester: CollidableHandle,
        dt: f32,
    ) -> Result<f32, NarrowPhaseError> {
        if !collidables.contains(requester) {
            return Err(NarrowPhaseError::UnknownCollidable(requester));
        }
        let ctx = PairContext::new(collidables, &self.factories, &self.settings);
        let mut time_of_impact = 1.0f32;
        for handle in self.pair_cache.pairs_involving(requester) {
            if let Some(pair) = self.pair_cache.get_mut(handle) {
                pair.handler.update_time_of_impact(requester, dt, ctx);
                time_of_impact = time_of_impact.min(pair.handler.time_of_impact());
            }
        }
        Ok(time_of_impact)
    }

    /// Computes the time of impact of every active continuous collidable, in collidable handle order.
    pub fn continuous_update(&mut self, collidables: &CollidableSet, dt: f32) -> Vec<(CollidableHandle, f32)> {
        let mut times = Vec::new();
        for (handle, collidable) in collidables.iter() {
            if !collidable.is_active || !collidable.continuity.is_continuous() {
                continue;
            }
            if let Ok(time_of_impact) = self.update_time_of_impact(collidables, handle, dt) {
                times.push((handle, time_of_impact));
            }
        }
        times
    }

    /// Re-blends a pair's material properties from its collidables' current materials.
    pub fn update_material_properties(
        &mut self,
        collidables: &CollidableSet,
        handle: PairHandle,
    ) -> Result<(), NarrowPhaseError> {
        let ctx = PairContext::new(collidables, &self.factories, &self.settings);
        let pair = self
            .pair_cache
            .get_mut(handle)
            .ok_or(NarrowPhaseError::UnknownPair(handle))?;
        pair.handler.update_material_properties(ctx);
        Ok(())
    }

    pub fn contact_count(&self, handle: PairHandle) -> Result<usize, NarrowPhaseError> {
        self.pair(handle)
            .map(PairHandler::contact_count)
            .ok_or(NarrowPhaseError::UnknownPair(handle))
    }

    /// Gets information about one contact of a pair.
    ///
    /// # Panics
    /// Panics if the index is not less than the pair's contact count.
    pub fn get_contact_information(
        &self,
        collidables: &CollidableSet,
        handle: PairHandle,
        index: usize,
    ) -> Result<ContactInformation, NarrowPhaseError> {
        let handler = self.pair(handle).ok_or(NarrowPhaseError::UnknownPair(handle))?;
        Ok(handler.get_contact_information(index, self.context(collidables)))
    }

    /// Gets information about one contact of a pair, returning an error for an out of range index.
    pub fn try_get_contact_information(
        &self,
        collidables: &CollidableSet,
        handle: PairHandle,
        index: usize,
    ) -> Result<ContactInformation, NarrowPhaseError> {
        let handler = self.pair(handle).ok_or(NarrowPhaseError::UnknownPair(handle))?;
        handler.try_get_contact_information(index, self.context(collidables))
    }

    /// Removes every pair. Solver detachments are queued for the next flush.
    pub fn clear(&mut self, collidables: &CollidableSet) {
        let ctx = PairContext::new(collidables, &self.factories, &self.settings);
        let mut count = 0usize;
        for mut removed in self.pair_cache.drain() {
            removed.handler.clean_up(ctx, &mut removed.pending);
            self.queues.drain_pending(&mut removed);
            self.factories.release(removed.handler);
            count += 1;
        }
        debug!("cleared {count} pairs");
    }
}

impl std::fmt::Debug for NarrowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrowPhase")
            .field("pairs", &self.pair_cache.len())
            .field("generated", &self.queues.generated.len())
            .field("removed", &self.queues.removed.len())
            .field("settings", &self.settings)
            .finish()
    }
}
