use std::fmt;

use crate::physics::collidables::collidable_reference::CollidableReference;

/// Filtering applied to a pair of collidables. Variants are ordered from least to most restrictive,
/// and combining rules keeps the most restrictive one.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CollisionRule {
    /// Contacts are generated and handed to the solver.
    #[default]
    Normal = 0,
    /// Contacts are generated and events fire, but the constraint never enters the solver.
    NoSolver = 1,
    /// A pair handler exists but its contacts are never updated.
    NoNarrowPhaseUpdate = 2,
    /// No pair handler is created.
    NoNarrowPhasePair = 3,
}

impl CollisionRule {
    /// Combines two rules by keeping the most restrictive.
    #[inline(always)]
    pub fn combine(self, other: CollisionRule) -> CollisionRule {
        self.max(other)
    }

    #[inline(always)]
    pub fn allows_solver(self) -> bool {
        self == CollisionRule::Normal
    }

    #[inline(always)]
    pub fn allows_narrow_phase_update(self) -> bool {
        self <= CollisionRule::NoSolver
    }

    #[inline(always)]
    pub fn allows_narrow_phase_pair(self) -> bool {
        self <= CollisionRule::NoNarrowPhaseUpdate
    }
}

/// Ordered pair of collidable parts reported overlapping by a broad phase, plus the rule governing the pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BroadPhaseOverlap {
    pub a: CollidableReference,
    pub b: CollidableReference,
    pub collision_rule: CollisionRule,
}

impl BroadPhaseOverlap {
    #[inline]
    pub fn new(a: CollidableReference, b: CollidableReference, collision_rule: CollisionRule) -> Self {
        Self { a, b, collision_rule }
    }

    /// Gets the same overlap with its sides exchanged.
    #[inline]
    pub fn swapped(&self) -> Self {
        Self {
            a: self.b.clone(),
            b: self.a.clone(),
            collision_rule: self.collision_rule,
        }
    }
}

impl fmt::Display for BroadPhaseOverlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}> ({:?})", self.a, self.b, self.collision_rule)
    }
}
