use smallvec::SmallVec;

use crate::physics::collision_detection::contact_manifold::Contact;
use crate::physics::collision_detection::pair_cache::CollidablePair;
use crate::physics::handles::ConstraintHandle;

/// Receives notifications from a pair handler about its solver state and contacts.
///
/// Top-level pairs report to the narrow phase's per-pair pending buffer. Pairs owned by a group
/// report to the group, which aggregates them and forwards to its own parent.
pub trait IPairHandlerParent {
    /// Requests that a solver-updateable enter the solver.
    fn add_solver_updateable(&mut self, item: ConstraintHandle);

    /// Requests that a solver-updateable leave the solver.
    fn remove_solver_updateable(&mut self, item: ConstraintHandle);

    /// A child gained a contact.
    fn on_contact_added(&mut self, contact: &Contact);

    /// A child lost a contact.
    fn on_contact_removed(&mut self, contact: &Contact);
}

/// Non-owning link from a pair handler to the group pair that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParentLink {
    /// Parts bound by the owning group.
    pub owner: CollidablePair,
    /// Number of groups above the handler. Direct children of a top-level group have depth 1.
    pub depth: u32,
}

/// Solver attach or detach request produced while updating a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverUpdateableChange {
    Add(ConstraintHandle),
    Remove(ConstraintHandle),
}

/// Solver changes raised by one top-level pair during a parallel update, in the order they occurred.
/// Drained into the narrow phase's queues once the parallel pass completes.
#[derive(Debug, Clone, Default)]
pub struct PendingSolverChanges {
    changes: SmallVec<[SolverUpdateableChange; 2]>,
}

impl PendingSolverChanges {
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SolverUpdateableChange> {
        self.changes.iter()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = SolverUpdateableChange> + '_ {
        self.changes.drain(..)
    }
}

impl IPairHandlerParent for PendingSolverChanges {
    #[inline]
    fn add_solver_updateable(&mut self, item: ConstraintHandle) {
        self.changes.push(SolverUpdateableChange::Add(item));
    }

    #[inline]
    fn remove_solver_updateable(&mut self, item: ConstraintHandle) {
        self.changes.push(SolverUpdateableChange::Remove(item));
    }

    #[inline(always)]
    fn on_contact_added(&mut self, _contact: &Contact) {}

    #[inline(always)]
    fn on_contact_removed(&mut self, _contact: &Contact) {}
}
