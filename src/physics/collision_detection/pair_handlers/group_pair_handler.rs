use indexmap::{IndexMap, IndexSet};
use log::{trace, warn};

use crate::physics::collidables::collidable_reference::CollidableReference;
use crate::physics::collidables::shape::ShapeKind;
use crate::physics::collision_detection::broad_phase_overlap::BroadPhaseOverlap;
use crate::physics::collision_detection::contact_constraint::ConstraintGroup;
use crate::physics::collision_detection::contact_manifold::Contact;
use crate::physics::collision_detection::error::NarrowPhaseError;
use crate::physics::collision_detection::pair_handler_pool::FactoryId;
use crate::physics::collision_detection::time_of_impact::requires_time_of_impact;
use crate::physics::handles::{CollidableHandle, ConstraintHandle};

use super::collidable_pair_handler::{CollidablePairHandler, PairContext};
use super::parent::{IPairHandlerParent, ParentLink};
use super::standard_pair_handler::ContactInformation;
use super::PairHandler;

/// Which composite a group handler decomposes. The composite is always side A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// A compound against anything. Children of the compound are paired with side B.
    Compound,
    /// A mesh or instanced mesh against a non-mesh. Triangles of the mesh are paired with side B.
    Mesh,
}

impl GroupKind {
    #[inline]
    fn accepts(self, a: ShapeKind, b: ShapeKind) -> bool {
        match self {
            GroupKind::Compound => a == ShapeKind::Compound,
            GroupKind::Mesh => a.is_mesh() && !b.is_mesh(),
        }
    }
}

/// Identity of a sub-pair inside a group: the part of the composite and the part it is tested against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubPairKey {
    pub a: CollidableReference,
    pub b: CollidableReference,
}

#[derive(Debug)]
struct GroupAggregate {
    constraint_group: ConstraintGroup,
    contact_count: usize,
}

/// Pair handler representing a composite pair as a set of child pairs, one per overlapping part.
pub struct GroupPairHandler {
    pub(crate) base: CollidablePairHandler,
    kind: GroupKind,
    sub_pairs: IndexMap<SubPairKey, Box<PairHandler>>,
    contained: IndexSet<SubPairKey>,
    overlaps: Vec<i32>,
    stale: Vec<SubPairKey>,
    aggregate: GroupAggregate,
}

/// Parent protocol implementation handed to a group's children while the group is being processed.
struct GroupParent<'a> {
    base: &'a CollidablePairHandler,
    ctx: PairContext<'a>,
    aggregate: &'a mut GroupAggregate,
    outer: &'a mut dyn IPairHandlerParent,
}

impl IPairHandlerParent for GroupParent<'_> {
    fn add_solver_updateable(&mut self, item: ConstraintHandle) {
        if self.aggregate.constraint_group.add_member(item) == 1 {
            let group = self.aggregate.constraint_group.handle();
            self.outer.add_solver_updateable(group);
            self.aggregate.constraint_group.solver_attached = true;
        }
    }

    fn remove_solver_updateable(&mut self, item: ConstraintHandle) {
        if self.aggregate.constraint_group.remove_member(item) == 0 {
            let group = self.aggregate.constraint_group.handle();
            self.outer.remove_solver_updateable(group);
            self.aggregate.constraint_group.solver_attached = false;
        }
    }

    fn on_contact_added(&mut self, contact: &Contact) {
        self.aggregate.contact_count += 1;
        self.base.fire(self.ctx, |listener, sender, other| {
            listener.on_contact_created(sender, other, contact)
        });
        self.outer.on_contact_added(contact);
    }

    fn on_contact_removed(&mut self, contact: &Contact) {
        debug_assert!(self.aggregate.contact_count > 0, "group contact count underflow");
        self.aggregate.contact_count = self.aggregate.contact_count.saturating_sub(1);
        self.base.fire(self.ctx, |listener, sender, other| {
            listener.on_contact_removed(sender, other, contact)
        });
        self.outer.on_contact_removed(contact);
    }
}

impl GroupPairHandler {
    pub(crate) fn new(factory: FactoryId, kind: GroupKind, constraint_handle: ConstraintHandle) -> Self {
        Self {
            base: CollidablePairHandler::new(factory),
            kind,
            sub_pairs: IndexMap::new(),
            contained: IndexSet::new(),
            overlaps: Vec::new(),
            stale: Vec::new(),
            aggregate: GroupAggregate {
                constraint_group: ConstraintGroup::new(constraint_handle),
                contact_count: 0,
            },
        }
    }

    #[inline(always)]
    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    #[inline(always)]
    pub fn constraint_group(&self) -> &ConstraintGroup {
        &self.aggregate.constraint_group
    }

    /// Gets the number of child pairs currently owned by the group.
    #[inline(always)]
    pub fn sub_pair_count(&self) -> usize {
        self.sub_pairs.len()
    }

    /// Iterates child pairs in map order.
    pub fn sub_pairs(&self) -> impl Iterator<Item = (&SubPairKey, &PairHandler)> {
        self.sub_pairs.iter().map(|(key, child)| (key, &**child))
    }

    pub fn sub_pair(&self, key: &SubPairKey) -> Option<&PairHandler> {
        self.sub_pairs.get(key).map(|child| &**child)
    }

    /// Gets a child pair mutably, for solvers writing back accumulated impulses.
    pub fn sub_pair_mut(&mut self, key: &SubPairKey) -> Option<&mut PairHandler> {
        self.sub_pairs.get_mut(key).map(|child| &mut **child)
    }

    /// Sums the contacts of every child pair.
    pub fn contact_count(&self) -> usize {
        self.sub_pairs.values().map(|child| child.contact_count()).sum()
    }

    /// Binds the handler to an overlap with the composite on side A.
    ///
    /// # Panics
    /// Panics if neither ordering of the overlap puts an accepted composite on side A.
    pub(crate) fn initialize(&mut self, overlap: BroadPhaseOverlap, parent: Option<ParentLink>, ctx: PairContext) {
        let kind_a = overlap.a.resolve(ctx.collidables).kind();
        let kind_b = overlap.b.resolve(ctx.collidables).kind();
        let overlap = if self.kind.accepts(kind_a, kind_b) {
            overlap
        } else if self.kind.accepts(kind_b, kind_a) {
            overlap.swapped()
        } else {
            panic!(
                "{:?} group pair handler cannot handle {kind_a:?} against {kind_b:?}; the dispatch table is inconsistent",
                self.kind
            );
        };
        self.base.bind(overlap, parent);
        self.base.register_with_collidables(ctx);
        self.base
            .fire(ctx, |listener, sender, other| listener.on_pair_created(sender, other));
    }

    fn child_link(&self) -> ParentLink {
        ParentLink {
            owner: self.base.pair(),
            depth: self.base.parent().map_or(1, |link| link.depth + 1),
        }
    }

    /// Brings the set of child pairs in line with the parts that overlap side B during the next `dt`.
    ///
    /// When either side is continuous, side B's bounds are swept by its motion relative to the
    /// composite so parts it could reach this step get a pair before time of impact is estimated.
    fn update_contained_pairs(&mut self, dt: f32, ctx: PairContext, parent: &mut dyn IPairHandlerParent) {
        let overlap = self.base.overlap().clone();
        let composite = overlap.a.resolve(ctx.collidables);
        let other = overlap.b.resolve(ctx.collidables);
        let mut other_bounds = other.bounds();
        if requires_time_of_impact(&composite, &other) {
            let motion = (other.velocity.linear - composite.velocity.linear) * dt;
            other_bounds = other_bounds.swept(motion);
        }

        self.overlaps.clear();
        composite.find_child_overlaps(&other_bounds, &mut self.overlaps);
        self.contained.clear();
        let link = self.child_link();

        for &index in &self.overlaps {
            let key = SubPairKey {
                a: overlap.a.child(index),
                b: overlap.b.clone(),
            };
            if self.sub_pairs.contains_key(&key) {
                self.contained.insert(key);
                continue;
            }
            let Some(part) = key.a.try_resolve(ctx.collidables) else {
                continue;
            };
            let rule = overlap
                .collision_rule
                .combine(part.collision_rule)
                .combine(other.collision_rule);
            if !rule.allows_narrow_phase_pair() {
                continue;
            }
            let mut child = match ctx.factories.acquire(part.kind(), other.kind()) {
                Ok(child) => child,
                Err(error) => {
                    warn!("skipping part {} of {}: {error}", key.a, overlap);
                    continue;
                }
            };
            child.set_suppress_events(self.base.suppress_events());
            child.initialize(
                BroadPhaseOverlap::new(key.a.clone(), key.b.clone(), rule),
                Some(link.clone()),
                ctx,
            );
            trace!("{} gained sub-pair <{}, {}>", overlap, key.a, key.b);
            self.sub_pairs.insert(key.clone(), child);
            self.contained.insert(key);
        }

        self.stale.clear();
        self.stale.extend(
            self.sub_pairs
                .keys()
                .filter(|key| !self.contained.contains(*key))
                .cloned(),
        );
        if self.stale.is_empty() {
            return;
        }
        let mut group_parent = GroupParent {
            base: &self.base,
            ctx,
            aggregate: &mut self.aggregate,
            outer: parent,
        };
        for key in self.stale.drain(..) {
            if let Some(mut child) = self.sub_pairs.shift_remove(&key) {
                trace!("{} lost sub-pair <{}, {}>", overlap, key.a, key.b);
                child.clean_up(ctx, &mut group_parent);
                ctx.factories.release(child);
            }
        }
    }

    /// Synchronizes the child pairs, updates each of them and applies the touching-state
    /// transition on the aggregate contact count.
    pub(crate) fn update_collision(&mut self, dt: f32, ctx: PairContext, parent: &mut dyn IPairHandlerParent) {
        self.update_contained_pairs(dt, ctx, parent);
        {
            let mut group_parent = GroupParent {
                base: &self.base,
                ctx,
                aggregate: &mut self.aggregate,
                outer: &mut *parent,
            };
            for child in self.sub_pairs.values_mut() {
                if child.collision_rule().allows_narrow_phase_update() {
                    child.update_collision(dt, ctx, &mut group_parent);
                }
            }
        }
        let count = self.aggregate.contact_count;
        debug_assert_eq!(count, self.contact_count(), "group contact count out of sync with its children");
        self.base.update_touching_state(count, None, ctx, parent);
    }

    /// Cleans up and releases every child pair in reverse order, then unbinds the handler.
    ///
    /// # Panics
    /// Panics if the handler was already cleaned up.
    pub(crate) fn clean_up(&mut self, ctx: PairContext, parent: &mut dyn IPairHandlerParent) {
        self.base.begin_clean_up();
        let had_contacts = self.aggregate.contact_count > 0 || self.base.previous_contact_count() > 0;
        {
            let mut group_parent = GroupParent {
                base: &self.base,
                ctx,
                aggregate: &mut self.aggregate,
                outer: &mut *parent,
            };
            while let Some((_, mut child)) = self.sub_pairs.pop() {
                child.clean_up(ctx, &mut group_parent);
                ctx.factories.release(child);
            }
        }
        debug_assert!(
            !self.aggregate.constraint_group.is_solver_attached(),
            "constraint group still attached after every child was removed"
        );
        if had_contacts {
            self.base
                .fire(ctx, |listener, sender, other| listener.on_collision_ended(sender, other));
        }
        self.base.unregister_from_collidables(ctx);
        self.base
            .fire(ctx, |listener, sender, other| listener.on_pair_removed(sender, other));
        self.contained.clear();
        self.aggregate.contact_count = 0;
        self.base.finish_clean_up();
    }

    pub(crate) fn update_material_properties(&mut self, ctx: PairContext) {
        for child in self.sub_pairs.values_mut() {
            child.update_material_properties(ctx);
        }
    }

    /// Computes the minimum time of impact over the child pairs.
    ///
    /// Children come from the last [`update_collision`](Self::update_collision), whose part query
    /// already covers the step's relative motion.
    pub(crate) fn update_time_of_impact(&mut self, requester: CollidableHandle, dt: f32, ctx: PairContext) {
        let mut time_of_impact = 1.0f32;
        for child in self.sub_pairs.values_mut() {
            child.update_time_of_impact(requester, dt, ctx);
            time_of_impact = time_of_impact.min(child.time_of_impact());
        }
        self.base.time_of_impact = time_of_impact;
    }

    /// Gets information about a contact, indexing across children in map order.
    pub fn try_get_contact_information(
        &self,
        index: usize,
        ctx: PairContext,
    ) -> Result<ContactInformation, NarrowPhaseError> {
        let mut remaining = index;
        for child in self.sub_pairs.values() {
            let count = child.contact_count();
            if remaining < count {
                return child.try_get_contact_information(remaining, ctx);
            }
            remaining -= count;
        }
        Err(NarrowPhaseError::ContactIndexOutOfRange {
            index,
            count: self.contact_count(),
        })
    }

    /// Gets information about a contact, indexing across children in map order.
    ///
    /// # Panics
    /// Panics if the index is not less than the total contact count.
    pub fn get_contact_information(&self, index: usize, ctx: PairContext) -> ContactInformation {
        match self.try_get_contact_information(index, ctx) {
            Ok(information) => information,
            Err(error) => panic!("{error}"),
        }
    }

    pub(crate) fn reset(&mut self) {
        debug_assert!(self.sub_pairs.is_empty());
        self.contained.clear();
        self.overlaps.clear();
        self.stale.clear();
        self.aggregate.constraint_group.reset();
        self.aggregate.contact_count = 0;
        self.base.reset();
    }
}
