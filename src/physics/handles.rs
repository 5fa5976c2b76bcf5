use std::hash::Hash;

// Newtype Pattern for enhanced type safety
/// Identifies a collidable within a [`CollidableSet`](crate::physics::collidables::collidable_set::CollidableSet).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CollidableHandle(pub i32);

/// Identifies a solver-updateable object: a leaf pair's contact constraint or a group pair's constraint group.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ConstraintHandle(pub i32);

/// Identifies a live pair in the narrow phase's pair cache.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PairHandle(pub i32);

// Simple implementations for Display for user-friendliness
impl std::fmt::Display for CollidableHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "CollidableHandle<{}>", self.0)
    }
}

impl std::fmt::Display for ConstraintHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "ConstraintHandle<{}>", self.0)
    }
}

impl std::fmt::Display for PairHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "PairHandle<{}>", self.0)
    }
}
