pub mod collidable_pair_handler;
pub mod group_pair_handler;
pub mod parent;
pub mod standard_pair_handler;

pub use collidable_pair_handler::{CollidablePairHandler, PairContext, PairHandlerState};
pub use group_pair_handler::{GroupKind, GroupPairHandler, SubPairKey};
pub use parent::{IPairHandlerParent, ParentLink, PendingSolverChanges, SolverUpdateableChange};
pub use standard_pair_handler::{ContactInformation, LeafKind, StandardPairHandler};

use crate::physics::collision_detection::broad_phase_overlap::{BroadPhaseOverlap, CollisionRule};
use crate::physics::collision_detection::error::NarrowPhaseError;
use crate::physics::collision_detection::pair_handler_pool::FactoryId;
use crate::physics::handles::{CollidableHandle, ConstraintHandle};

/// A pair handler of any variant. Leaf pairs own a manifold and a contact constraint; group pairs own child pairs.
pub enum PairHandler {
    Standard(StandardPairHandler),
    Group(GroupPairHandler),
}

macro_rules! dispatch {
    ($self:expr, $handler:ident => $body:expr) => {
        match $self {
            PairHandler::Standard($handler) => $body,
            PairHandler::Group($handler) => $body,
        }
    };
}

impl PairHandler {
    #[inline]
    pub fn base(&self) -> &CollidablePairHandler {
        dispatch!(self, handler => &handler.base)
    }

    #[inline]
    fn base_mut(&mut self) -> &mut CollidablePairHandler {
        dispatch!(self, handler => &mut handler.base)
    }

    #[inline]
    pub fn factory_id(&self) -> FactoryId {
        self.base().factory_id()
    }

    #[inline]
    pub fn state(&self) -> PairHandlerState {
        self.base().state()
    }

    /// Gets the overlap the handler is bound to.
    ///
    /// # Panics
    /// Panics if the handler is not bound.
    #[inline]
    pub fn overlap(&self) -> &BroadPhaseOverlap {
        self.base().overlap()
    }

    #[inline]
    pub fn collision_rule(&self) -> CollisionRule {
        self.base().collision_rule()
    }

    #[inline]
    pub fn time_of_impact(&self) -> f32 {
        self.base().time_of_impact()
    }

    #[inline]
    pub fn suppress_events(&self) -> bool {
        self.base().suppress_events()
    }

    /// Silences event notifications for this pair. Groups pass the flag on to children they create.
    #[inline]
    pub fn set_suppress_events(&mut self, suppress: bool) {
        self.base_mut().suppress_events = suppress;
    }

    /// Handle of the item this pair puts into the solver: its contact constraint or its constraint group.
    #[inline]
    pub fn solver_updateable(&self) -> ConstraintHandle {
        match self {
            PairHandler::Standard(handler) => handler.constraint().handle(),
            PairHandler::Group(handler) => handler.constraint_group().handle(),
        }
    }

    /// Gets whether this pair's solver item is currently attached.
    #[inline]
    pub fn is_solver_attached(&self) -> bool {
        match self {
            PairHandler::Standard(handler) => handler.constraint().is_solver_attached(),
            PairHandler::Group(handler) => handler.constraint_group().is_solver_attached(),
        }
    }

    /// Binds the handler to an overlap. `parent` is `None` for pairs owned by the narrow phase.
    pub(crate) fn initialize(&mut self, overlap: BroadPhaseOverlap, parent: Option<ParentLink>, ctx: PairContext) {
        dispatch!(self, handler => handler.initialize(overlap, parent, ctx))
    }

    pub(crate) fn update_collision(&mut self, dt: f32, ctx: PairContext, parent: &mut dyn IPairHandlerParent) {
        dispatch!(self, handler => handler.update_collision(dt, ctx, parent))
    }

    pub(crate) fn clean_up(&mut self, ctx: PairContext, parent: &mut dyn IPairHandlerParent) {
        dispatch!(self, handler => handler.clean_up(ctx, parent))
    }

    pub(crate) fn update_material_properties(&mut self, ctx: PairContext) {
        dispatch!(self, handler => handler.update_material_properties(ctx))
    }

    pub(crate) fn update_time_of_impact(&mut self, requester: CollidableHandle, dt: f32, ctx: PairContext) {
        dispatch!(self, handler => handler.update_time_of_impact(requester, dt, ctx))
    }

    pub(crate) fn reset(&mut self) {
        dispatch!(self, handler => handler.reset())
    }

    #[inline]
    pub fn contact_count(&self) -> usize {
        dispatch!(self, handler => handler.contact_count())
    }

    pub fn try_get_contact_information(
        &self,
        index: usize,
        ctx: PairContext,
    ) -> Result<ContactInformation, NarrowPhaseError> {
        dispatch!(self, handler => handler.try_get_contact_information(index, ctx))
    }

    /// # Panics
    /// Panics if the index is not less than the contact count.
    pub fn get_contact_information(&self, index: usize, ctx: PairContext) -> ContactInformation {
        dispatch!(self, handler => handler.get_contact_information(index, ctx))
    }

    #[inline]
    pub fn as_standard(&self) -> Option<&StandardPairHandler> {
        match self {
            PairHandler::Standard(handler) => Some(handler),
            PairHandler::Group(_) => None,
        }
    }

    #[inline]
    pub fn as_standard_mut(&mut self) -> Option<&mut StandardPairHandler> {
        match self {
            PairHandler::Standard(handler) => Some(handler),
            PairHandler::Group(_) => None,
        }
    }

    #[inline]
    pub fn as_group(&self) -> Option<&GroupPairHandler> {
        match self {
            PairHandler::Group(handler) => Some(handler),
            PairHandler::Standard(_) => None,
        }
    }

    #[inline]
    pub fn as_group_mut(&mut self) -> Option<&mut GroupPairHandler> {
        match self {
            PairHandler::Group(handler) => Some(handler),
            PairHandler::Standard(_) => None,
        }
    }
}

impl std::fmt::Debug for PairHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            PairHandler::Standard(_) => "Standard",
            PairHandler::Group(_) => "Group",
        };
        f.debug_struct("PairHandler")
            .field("variant", &variant)
            .field("state", &self.state())
            .field("overlap", &self.base().try_overlap())
            .field("contact_count", &self.contact_count())
            .finish()
    }
}
