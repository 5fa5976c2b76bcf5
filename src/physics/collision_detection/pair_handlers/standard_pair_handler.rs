use glam::Vec3;

use crate::physics::collidables::collidable_reference::ResolvedCollidable;
use crate::physics::collidables::shape::ShapeKind;
use crate::physics::collision_detection::broad_phase_overlap::BroadPhaseOverlap;
use crate::physics::collision_detection::contact_constraint::ContactConstraint;
use crate::physics::collision_detection::contact_manifold::{Contact, IContactManifold, ManifoldChanges};
use crate::physics::collision_detection::error::NarrowPhaseError;
use crate::physics::collision_detection::pair_handler_pool::FactoryId;
use crate::physics::collision_detection::time_of_impact::compute_time_of_impact;
use crate::physics::handles::{CollidableHandle, ConstraintHandle};

use super::collidable_pair_handler::{CollidablePairHandler, PairContext};
use super::parent::{IPairHandlerParent, ParentLink};

/// Which shape combinations a leaf handler accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafKind {
    /// Any two convex primitives.
    Convex,
    /// A triangle, standalone or from a mesh, against a convex primitive. The triangle is side A.
    TriangleConvex,
}

impl LeafKind {
    #[inline]
    fn accepts(self, a: ShapeKind, b: ShapeKind) -> bool {
        match self {
            LeafKind::Convex => a.is_convex() && b.is_convex(),
            LeafKind::TriangleConvex => a == ShapeKind::Triangle && b.is_convex(),
        }
    }
}

/// Snapshot of one contact of a pair, for gameplay queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactInformation {
    pub contact: Contact,
    /// Normal impulse the solver accumulated at this contact during the last solve.
    pub normal_impulse: f32,
    /// Approximate share of the pair's friction impulse attributed to this contact.
    ///
    /// Friction is solved at the manifold center, so this distributes the central sliding impulse
    /// and the twisting impulse (scaled by the contact's distance from the center) in proportion
    /// to the contact's share of the total normal impulse. It is not an exact per-contact value.
    pub friction_impulse: f32,
    /// Velocity of A's surface relative to B's surface at the contact position.
    pub relative_velocity: Vec3,
}

/// Pair handler owning one contact manifold and one contact constraint.
pub struct StandardPairHandler {
    pub(crate) base: CollidablePairHandler,
    kind: LeafKind,
    manifold: Box<dyn IContactManifold>,
    constraint: ContactConstraint,
    changes: ManifoldChanges,
}

impl StandardPairHandler {
    pub(crate) fn new(
        factory: FactoryId,
        kind: LeafKind,
        manifold: Box<dyn IContactManifold>,
        constraint_handle: ConstraintHandle,
    ) -> Self {
        Self {
            base: CollidablePairHandler::new(factory),
            kind,
            manifold,
            constraint: ContactConstraint::new(constraint_handle),
            changes: ManifoldChanges::default(),
        }
    }

    #[inline(always)]
    pub fn kind(&self) -> LeafKind {
        self.kind
    }

    #[inline(always)]
    pub fn constraint(&self) -> &ContactConstraint {
        &self.constraint
    }

    /// Gets the constraint for solvers writing back accumulated impulses.
    #[inline(always)]
    pub fn constraint_mut(&mut self) -> &mut ContactConstraint {
        &mut self.constraint
    }

    #[inline(always)]
    pub fn contact_count(&self) -> usize {
        self.constraint.contact_count()
    }

    /// Gets the contacts currently reported by the manifold.
    pub fn contacts(&self) -> &[Contact] {
        self.manifold.contacts()
    }

    /// Binds the handler to an overlap, initializes the manifold and blends materials.
    ///
    /// # Panics
    /// Panics if neither ordering of the overlap matches the shapes this handler accepts.
    pub(crate) fn initialize(&mut self, overlap: BroadPhaseOverlap, parent: Option<ParentLink>, ctx: PairContext) {
        let (kind_a, kind_b) = {
            let a = overlap.a.resolve(ctx.collidables);
            let b = overlap.b.resolve(ctx.collidables);
            (a.kind(), b.kind())
        };
        let overlap = if self.kind.accepts(kind_a, kind_b) {
            overlap
        } else if self.kind.accepts(kind_b, kind_a) {
            overlap.swapped()
        } else {
            panic!(
                "{:?} pair handler cannot handle {kind_a:?} against {kind_b:?}; the dispatch table is inconsistent",
                self.kind
            );
        };
        let a = overlap.a.resolve(ctx.collidables);
        let b = overlap.b.resolve(ctx.collidables);
        self.manifold.initialize(&a, &b);
        self.constraint
            .update_material_properties(&a.material, &b.material, ctx.settings.material_blender);
        self.base.bind(overlap, parent);
        self.base.register_with_collidables(ctx);
        self.base
            .fire(ctx, |listener, sender, other| listener.on_pair_created(sender, other));
    }

    /// Advances the manifold and applies the resulting contact and solver transitions.
    pub(crate) fn update_collision(&mut self, dt: f32, ctx: PairContext, parent: &mut dyn IPairHandlerParent) {
        let overlap = self.base.overlap();
        let a = overlap.a.resolve(ctx.collidables);
        let b = overlap.b.resolve(ctx.collidables);
        self.changes.clear();
        self.manifold.update(&a, &b, dt, &mut self.changes);

        for contact in &self.changes.removed {
            self.constraint.remove_contact(contact);
            self.base.fire(ctx, |listener, sender, other| {
                listener.on_contact_removed(sender, other, contact)
            });
            parent.on_contact_removed(contact);
        }
        for contact in &self.changes.added {
            self.constraint.add_contact(*contact);
            self.base.fire(ctx, |listener, sender, other| {
                listener.on_contact_created(sender, other, contact)
            });
            parent.on_contact_added(contact);
        }
        // Persisting contacts move every tick.
        for contact in self.manifold.contacts() {
            self.constraint.add_contact(*contact);
        }
        debug_assert_eq!(
            self.constraint.contact_count(),
            self.manifold.contacts().len(),
            "manifold reported changes inconsistent with its contacts"
        );

        let count = self.constraint.contact_count();
        let constraint_handle = self.constraint.handle();
        let solver_item = self
            .base
            .collision_rule()
            .allows_solver()
            .then_some((constraint_handle, &mut self.constraint.solver_attached));
        self.base.update_touching_state(count, solver_item, ctx, parent);
    }

    /// Removes every contact, detaches from the solver and unbinds the handler.
    ///
    /// # Panics
    /// Panics if the handler was already cleaned up.
    pub(crate) fn clean_up(&mut self, ctx: PairContext, parent: &mut dyn IPairHandlerParent) {
        self.base.begin_clean_up();
        let had_contacts = self.constraint.contact_count() > 0 || self.base.previous_contact_count() > 0;
        while let Some(removed) = self.constraint.penetration_constraints.pop() {
            let contact = removed.contact;
            self.base.fire(ctx, |listener, sender, other| {
                listener.on_contact_removed(sender, other, &contact)
            });
            parent.on_contact_removed(&contact);
        }
        if self.constraint.solver_attached {
            parent.remove_solver_updateable(self.constraint.handle());
            self.constraint.solver_attached = false;
        }
        if had_contacts {
            self.base
                .fire(ctx, |listener, sender, other| listener.on_collision_ended(sender, other));
        }
        self.manifold.clean_up();
        self.base.unregister_from_collidables(ctx);
        self.base
            .fire(ctx, |listener, sender, other| listener.on_pair_removed(sender, other));
        self.constraint.reset();
        self.changes.clear();
        self.base.finish_clean_up();
    }

    /// Re-blends the pair's material properties from both sides. Contacts are untouched.
    pub(crate) fn update_material_properties(&mut self, ctx: PairContext) {
        let overlap = self.base.overlap();
        let a = overlap.a.resolve(ctx.collidables);
        let b = overlap.b.resolve(ctx.collidables);
        self.constraint
            .update_material_properties(&a.material, &b.material, ctx.settings.material_blender);
    }

    /// Recomputes the pair's time of impact for the requesting collidable.
    pub(crate) fn update_time_of_impact(&mut self, requester: CollidableHandle, dt: f32, ctx: PairContext) {
        let overlap = self.base.overlap();
        let a = overlap.a.resolve(ctx.collidables);
        let b = overlap.b.resolve(ctx.collidables);
        self.base.time_of_impact = compute_time_of_impact(&a, &b, requester, dt, ctx.settings);
    }

    /// Gets information about the contact at the given index.
    pub fn try_get_contact_information(
        &self,
        index: usize,
        ctx: PairContext,
    ) -> Result<ContactInformation, NarrowPhaseError> {
        let count = self.constraint.contact_count();
        let Some(penetration) = self.constraint.penetration_constraints.get(index) else {
            return Err(NarrowPhaseError::ContactIndexOutOfRange { index, count });
        };
        let contact = penetration.contact;
        let total_normal_impulse = self.constraint.total_normal_impulse();
        let friction_impulse = if total_normal_impulse > 0.0 {
            let lever = contact.position.distance(self.constraint.manifold_center());
            penetration.accumulated_impulse / total_normal_impulse
                * (self.constraint.sliding_friction_impulse.length()
                    + self.constraint.twist_friction_impulse.abs() * lever)
        } else {
            0.0
        };
        let overlap = self.base.overlap();
        let a = overlap.a.resolve(ctx.collidables);
        let b = overlap.b.resolve(ctx.collidables);
        Ok(ContactInformation {
            contact,
            normal_impulse: penetration.accumulated_impulse,
            friction_impulse,
            relative_velocity: relative_velocity(&a, &b, contact.position),
        })
    }

    /// Gets information about the contact at the given index.
    ///
    /// # Panics
    /// Panics if the index is not less than the contact count.
    pub fn get_contact_information(&self, index: usize, ctx: PairContext) -> ContactInformation {
        match self.try_get_contact_information(index, ctx) {
            Ok(information) => information,
            Err(error) => panic!("{error}"),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.constraint.reset();
        self.changes.clear();
        self.base.reset();
    }
}

#[inline]
fn relative_velocity(a: &ResolvedCollidable, b: &ResolvedCollidable, point: Vec3) -> Vec3 {
    a.velocity_at(point) - b.velocity_at(point)
}
