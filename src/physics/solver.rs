use crate::physics::handles::ConstraintHandle;

/// Receives solver-updateable objects from the narrow phase.
///
/// The narrow phase never calls these from worker threads. Attach and detach requests raised
/// during a parallel update are queued and delivered by
/// [`NarrowPhase::flush_solver_updateables`](crate::physics::collision_detection::narrow_phase::NarrowPhase::flush_solver_updateables).
pub trait ISolver {
    /// Adds a contact constraint or constraint group to the set of objects solved each step.
    fn add_solver_updateable(&mut self, item: ConstraintHandle);

    /// Removes a contact constraint or constraint group from the set of objects solved each step.
    fn remove_solver_updateable(&mut self, item: ConstraintHandle);
}
