use crate::physics::collidables::collidable_reference::CollidableReference;
use crate::physics::collidables::collidable_set::CollidableSet;
use crate::physics::collision_detection::broad_phase_overlap::{BroadPhaseOverlap, CollisionRule};
use crate::physics::collision_detection::narrow_phase_callbacks::ICollisionEventListener;
use crate::physics::collision_detection::pair_cache::CollidablePair;
use crate::physics::collision_detection::pair_handler_pool::{FactoryId, PairHandlerFactories};
use crate::physics::collision_detection::settings::CollisionDetectionSettings;
use crate::physics::handles::ConstraintHandle;

use super::parent::{IPairHandlerParent, ParentLink};

/// Shared state a pair handler reads while initializing, updating or cleaning up.
#[derive(Clone, Copy)]
pub struct PairContext<'a> {
    pub collidables: &'a CollidableSet,
    pub factories: &'a PairHandlerFactories,
    pub settings: &'a CollisionDetectionSettings,
}

impl<'a> PairContext<'a> {
    pub fn new(
        collidables: &'a CollidableSet,
        factories: &'a PairHandlerFactories,
        settings: &'a CollisionDetectionSettings,
    ) -> Self {
        Self {
            collidables,
            factories,
            settings,
        }
    }
}

/// Lifecycle stage of a pair handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairHandlerState {
    /// Sitting in a pool, or freshly created.
    Pooled,
    /// Bound to an overlap but not yet updated.
    Initialized,
    /// Updated at least once.
    Active,
    /// Cleaned up and waiting to be released to its pool.
    CleanedUp,
}

/// State and transition logic shared by every pair handler variant.
#[derive(Debug)]
pub struct CollidablePairHandler {
    factory: FactoryId,
    overlap: Option<BroadPhaseOverlap>,
    previous_contact_count: usize,
    pub(crate) suppress_events: bool,
    pub(crate) time_of_impact: f32,
    parent: Option<ParentLink>,
    state: PairHandlerState,
}

impl CollidablePairHandler {
    pub(crate) fn new(factory: FactoryId) -> Self {
        Self {
            factory,
            overlap: None,
            previous_contact_count: 0,
            suppress_events: false,
            time_of_impact: 1.0,
            parent: None,
            state: PairHandlerState::Pooled,
        }
    }

    #[inline(always)]
    pub fn factory_id(&self) -> FactoryId {
        self.factory
    }

    #[inline(always)]
    pub fn state(&self) -> PairHandlerState {
        self.state
    }

    /// Gets the overlap the handler is bound to, with sides in the handler's canonical order.
    #[inline]
    pub fn try_overlap(&self) -> Option<&BroadPhaseOverlap> {
        self.overlap.as_ref()
    }

    /// Gets the overlap the handler is bound to.
    ///
    /// # Panics
    /// Panics if the handler is not bound.
    #[inline]
    pub fn overlap(&self) -> &BroadPhaseOverlap {
        match &self.overlap {
            Some(overlap) => overlap,
            None => panic!("pair handler is not bound to an overlap"),
        }
    }

    #[inline]
    pub fn collision_rule(&self) -> CollisionRule {
        self.overlap().collision_rule
    }

    #[inline(always)]
    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    /// Gets whether the handler is owned directly by the narrow phase rather than by a group.
    #[inline(always)]
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    #[inline(always)]
    pub fn previous_contact_count(&self) -> usize {
        self.previous_contact_count
    }

    #[inline(always)]
    pub fn suppress_events(&self) -> bool {
        self.suppress_events
    }

    #[inline(always)]
    pub fn time_of_impact(&self) -> f32 {
        self.time_of_impact
    }

    /// Gets the pair identity of the bound overlap.
    #[inline]
    pub fn pair(&self) -> CollidablePair {
        let overlap = self.overlap();
        CollidablePair::new(overlap.a.clone(), overlap.b.clone())
    }

    /// Binds the handler to an overlap. The overlap must already be in canonical order.
    pub(crate) fn bind(&mut self, overlap: BroadPhaseOverlap, parent: Option<ParentLink>) {
        assert_eq!(
            self.state,
            PairHandlerState::Pooled,
            "pair handler must be pooled before it is initialized"
        );
        self.overlap = Some(overlap);
        self.parent = parent;
        self.state = PairHandlerState::Initialized;
    }

    /// Guards against cleaning up a handler twice or cleaning up an unbound handler.
    pub(crate) fn begin_clean_up(&self) {
        assert!(
            matches!(self.state, PairHandlerState::Initialized | PairHandlerState::Active),
            "pair handler cleaned up while {:?}; double clean-up or use after release",
            self.state
        );
    }

    /// Records the top-level pair on both root collidables' pair lists.
    pub(crate) fn register_with_collidables(&self, ctx: PairContext) {
        if !self.is_top_level() {
            return;
        }
        let pair = self.pair();
        for side in [&pair.a, &pair.b] {
            if let Some(owner) = ctx.collidables.get(side.root_handle()) {
                owner.register_pair(pair.clone());
            }
        }
    }

    pub(crate) fn unregister_from_collidables(&self, ctx: PairContext) {
        if !self.is_top_level() {
            return;
        }
        let pair = self.pair();
        for side in [&pair.a, &pair.b] {
            if let Some(owner) = ctx.collidables.get(side.root_handle()) {
                owner.unregister_pair(&pair);
            }
        }
    }

    /// Invokes a notification on each side's listener with that side as the sender.
    /// Skipped entirely while events are suppressed. Only top-level pairs notify; contacts of
    /// pairs owned by a group surface through the group.
    pub(crate) fn fire<F>(&self, ctx: PairContext, notify: F)
    where
        F: Fn(&dyn ICollisionEventListener, &CollidableReference, &CollidableReference),
    {
        if self.suppress_events || !self.is_top_level() {
            return;
        }
        let Some(overlap) = &self.overlap else {
            return;
        };
        for (sender, other) in [(&overlap.a, &overlap.b), (&overlap.b, &overlap.a)] {
            if !sender.is_root() {
                continue;
            }
            if let Some(listener) = ctx
                .collidables
                .get(sender.root_handle())
                .and_then(|owner| owner.events.as_deref())
            {
                notify(listener, sender, other);
            }
        }
    }

    /// Applies the touching-state transition for this tick's contact count.
    ///
    /// `solver_item` is the handler's own constraint and its attachment flag. It enters the solver
    /// through the parent while the count is nonzero and leaves when the count drops to zero.
    /// Handlers whose rule excludes the solver pass `None`.
    pub(crate) fn update_touching_state(
        &mut self,
        contact_count: usize,
        solver_item: Option<(ConstraintHandle, &mut bool)>,
        ctx: PairContext,
        parent: &mut dyn IPairHandlerParent,
    ) {
        if let Some((handle, attached)) = solver_item {
            if contact_count > 0 && !*attached {
                parent.add_solver_updateable(handle);
                *attached = true;
            } else if contact_count == 0 && *attached {
                parent.remove_solver_updateable(handle);
                *attached = false;
            }
        }
        if self.previous_contact_count == 0 && contact_count > 0 {
            self.fire(ctx, |listener, sender, other| {
                listener.on_initial_collision_detected(sender, other)
            });
        } else if self.previous_contact_count > 0 && contact_count == 0 {
            self.fire(ctx, |listener, sender, other| listener.on_collision_ended(sender, other));
        }
        self.fire(ctx, |listener, sender, other| listener.on_pair_updated(sender, other));
        if contact_count > 0 {
            self.fire(ctx, |listener, sender, other| listener.on_pair_touching(sender, other));
        }
        self.previous_contact_count = contact_count;
        self.state = PairHandlerState::Active;
    }

    /// Clears every reference and counter after the variant-specific clean-up has run.
    pub(crate) fn finish_clean_up(&mut self) {
        self.overlap = None;
        self.parent = None;
        self.previous_contact_count = 0;
        self.time_of_impact = 1.0;
        self.suppress_events = false;
        self.state = PairHandlerState::CleanedUp;
    }

    /// Returns a cleaned up handler to the pooled state.
    pub(crate) fn reset(&mut self) {
        debug_assert!(self.overlap.is_none() && self.parent.is_none());
        self.previous_contact_count = 0;
        self.time_of_impact = 1.0;
        self.suppress_events = false;
        self.state = PairHandlerState::Pooled;
    }
}
