use crate::physics::collidables::shape::ShapeKind;
use crate::physics::handles::{CollidableHandle, PairHandle};

use super::pair_cache::CollidablePair;

/// Errors returned by the narrow phase for recoverable misuse.
///
/// Violated internal invariants are not represented here; they panic.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum NarrowPhaseError {
    #[error("no pair handler factory is registered for {0:?} against {1:?}")]
    UnmappedPair(ShapeKind, ShapeKind),
    #[error("a pair handler factory is already registered for {0:?} against {1:?}")]
    DuplicateFactory(ShapeKind, ShapeKind),
    #[error("{0} does not refer to a live pair")]
    UnknownPair(PairHandle),
    #[error("{0} does not refer to a live collidable")]
    UnknownCollidable(CollidableHandle),
    #[error("a pair already exists for {0}")]
    DuplicateOverlap(CollidablePair),
    #[error("contact index {index} is out of range for a pair with {count} contacts")]
    ContactIndexOutOfRange { index: usize, count: usize },
}
