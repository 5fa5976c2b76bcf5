//! Narrow phase pair management for rigid body simulation.
//!
//! Broad phase overlaps become pooled pair handlers. Leaf handlers drive a user supplied
//! [`IContactManifold`](physics::collision_detection::contact_manifold::IContactManifold) and
//! attach their contact constraint to the solver while they have contacts. Group handlers split
//! compounds and meshes into child pairs that report through the group. The
//! [`NarrowPhase`](physics::collision_detection::narrow_phase::NarrowPhase) owns the pairs,
//! updates them and queues solver changes for a single-threaded flush.

pub mod physics;
pub mod utilities;

pub use physics::body_properties::{BodyVelocity, RigidPose};
pub use physics::collidables::collidable::{Collidable, ContinuousDetectionMode};
pub use physics::collidables::collidable_reference::{CollidableReference, ResolvedCollidable};
pub use physics::collidables::collidable_set::CollidableSet;
pub use physics::collidables::shape::{Shape, ShapeKind};
pub use physics::collision_detection::broad_phase_overlap::{BroadPhaseOverlap, CollisionRule};
pub use physics::collision_detection::contact_manifold::{
    Contact, IContactManifold, IContactManifoldFactory, ManifoldChanges,
};
pub use physics::collision_detection::error::NarrowPhaseError;
pub use physics::collision_detection::narrow_phase::NarrowPhase;
pub use physics::collision_detection::narrow_phase_callbacks::{ICollisionEventListener, Material, MaterialBlender};
pub use physics::collision_detection::pair_handler_pool::PairHandlerFactories;
pub use physics::collision_detection::settings::CollisionDetectionSettings;
pub use physics::handles::{CollidableHandle, ConstraintHandle, PairHandle};
pub use physics::solver::ISolver;

#[cfg(test)]
pub(crate) mod test_support;
