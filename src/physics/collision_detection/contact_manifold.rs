use std::fmt;

use glam::Vec3;
use smallvec::SmallVec;

use crate::physics::collidables::collidable_reference::ResolvedCollidable;

/// Information about a single contact.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// World position of the contact.
    pub position: Vec3,
    /// Surface normal of the contact. Points from collidable B to collidable A.
    pub normal: Vec3,
    /// Penetration depth between the two collidables at this contact. Negative values represent separation.
    pub penetration_depth: f32,
    /// Id of the features involved in the collision that generated this contact.
    /// Persistent across ticks while the same features stay in contact.
    pub id: i32,
}

impl Contact {
    #[inline(always)]
    pub fn new(position: Vec3, normal: Vec3, penetration_depth: f32, id: i32) -> Self {
        Self {
            position,
            normal,
            penetration_depth,
            id,
        }
    }
}

impl Default for Contact {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            penetration_depth: 0.0,
            id: 0,
        }
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} at {} along {} (depth {})",
            self.id, self.position, self.normal, self.penetration_depth
        )
    }
}

/// Contacts added to and removed from a manifold during one update.
#[derive(Debug, Clone, Default)]
pub struct ManifoldChanges {
    pub added: SmallVec<[Contact; 4]>,
    pub removed: SmallVec<[Contact; 4]>,
}

impl ManifoldChanges {
    #[inline]
    pub fn clear(&mut self) {
        self.added.clear();
        self.removed.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Contact generation for one shape pair. Implementations own the geometric test;
/// pair handlers only consume the reported contact transitions.
///
/// Both collidables are passed in the pair handler's canonical order, which for triangle
/// pairs puts the triangle first. Contact normals point from `b` to `a`.
pub trait IContactManifold: Send {
    /// Prepares the manifold for a newly bound pair.
    fn initialize(&mut self, a: &ResolvedCollidable, b: &ResolvedCollidable);

    /// Brings the manifold up to date with the pair's current state. Every contact that
    /// appeared is pushed to `changes.added`, and every contact that disappeared to `changes.removed`.
    fn update(&mut self, a: &ResolvedCollidable, b: &ResolvedCollidable, dt: f32, changes: &mut ManifoldChanges);

    /// Gets the contacts currently in the manifold.
    fn contacts(&self) -> &[Contact];

    /// Forgets all contacts and pair state so the manifold can be reused.
    fn clean_up(&mut self);
}

/// Creates contact manifolds for a registered shape pair.
pub trait IContactManifoldFactory: Send + Sync {
    fn create(&self) -> Box<dyn IContactManifold>;
}

impl<F> IContactManifoldFactory for F
where
    F: Fn() -> Box<dyn IContactManifold> + Send + Sync,
{
    #[inline]
    fn create(&self) -> Box<dyn IContactManifold> {
        self()
    }
}

/// Replaces a manifold's contacts with a freshly generated candidate set, matching contacts by id.
///
/// Contacts whose ids disappear are reported as removed; candidates with new ids are reported
/// as added. Contacts that persist are updated in place.
pub fn reconcile_contacts(current: &mut Vec<Contact>, candidates: &[Contact], changes: &mut ManifoldChanges) {
    for contact in current.iter() {
        if !candidates.iter().any(|c| c.id == contact.id) {
            changes.removed.push(*contact);
        }
    }
    for candidate in candidates {
        if !current.iter().any(|c| c.id == candidate.id) {
            changes.added.push(*candidate);
        }
    }
    current.clear();
    current.extend_from_slice(candidates);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_matches_ids() {
        let mut current = vec![
            Contact::new(Vec3::ZERO, Vec3::Y, 0.1, 1),
            Contact::new(Vec3::X, Vec3::Y, 0.1, 2),
        ];
        let candidates = [
            Contact::new(Vec3::X, Vec3::Y, 0.2, 2),
            Contact::new(Vec3::Z, Vec3::Y, 0.2, 3),
        ];
        let mut changes = ManifoldChanges::default();
        reconcile_contacts(&mut current, &candidates, &mut changes);
        assert_eq!(changes.removed.len(), 1);
        assert_eq!(changes.removed[0].id, 1);
        assert_eq!(changes.added.len(), 1);
        assert_eq!(changes.added[0].id, 3);
        assert_eq!(current.len(), 2);
        assert_eq!(current[0].penetration_depth, 0.2);
    }
}
