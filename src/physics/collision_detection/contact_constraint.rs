use glam::Vec3;
use smallvec::SmallVec;

use crate::physics::handles::ConstraintHandle;

use super::contact_manifold::Contact;
use super::narrow_phase_callbacks::{Material, MaterialBlender, PairMaterialProperties};

/// Normal constraint for one contact, with the impulse the solver accumulated for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenetrationConstraint {
    pub contact: Contact,
    /// Accumulated normal impulse. Kept across ticks while the contact persists for warm starting.
    pub accumulated_impulse: f32,
}

/// Solver-facing constraint wrapping one leaf pair's contacts.
///
/// Friction is modeled centrally: one sliding impulse and one twisting impulse act at the
/// manifold center rather than per contact.
#[derive(Debug, Clone)]
pub struct ContactConstraint {
    handle: ConstraintHandle,
    pub penetration_constraints: SmallVec<[PenetrationConstraint; 4]>,
    /// Accumulated sliding friction impulse at the manifold center.
    pub sliding_friction_impulse: Vec3,
    /// Accumulated twisting friction impulse about the manifold normal.
    pub twist_friction_impulse: f32,
    pub material: PairMaterialProperties,
    pub(crate) solver_attached: bool,
}

impl ContactConstraint {
    pub fn new(handle: ConstraintHandle) -> Self {
        Self {
            handle,
            penetration_constraints: SmallVec::new(),
            sliding_friction_impulse: Vec3::ZERO,
            twist_friction_impulse: 0.0,
            material: PairMaterialProperties::default(),
            solver_attached: false,
        }
    }

    #[inline(always)]
    pub fn handle(&self) -> ConstraintHandle {
        self.handle
    }

    /// Gets whether the constraint is currently in the solver.
    #[inline(always)]
    pub fn is_solver_attached(&self) -> bool {
        self.solver_attached
    }

    #[inline(always)]
    pub fn contact_count(&self) -> usize {
        self.penetration_constraints.len()
    }

    /// Adds a contact. A contact with an id already present replaces the stored contact but keeps its impulse.
    pub fn add_contact(&mut self, contact: Contact) {
        match self
            .penetration_constraints
            .iter_mut()
            .find(|c| c.contact.id == contact.id)
        {
            Some(existing) => existing.contact = contact,
            None => self.penetration_constraints.push(PenetrationConstraint {
                contact,
                accumulated_impulse: 0.0,
            }),
        }
    }

    /// Removes the contact with the same id. Returns false if no such contact was present.
    pub fn remove_contact(&mut self, contact: &Contact) -> bool {
        let Some(index) = self
            .penetration_constraints
            .iter()
            .position(|c| c.contact.id == contact.id)
        else {
            return false;
        };
        self.penetration_constraints.remove(index);
        if self.penetration_constraints.is_empty() {
            self.sliding_friction_impulse = Vec3::ZERO;
            self.twist_friction_impulse = 0.0;
        }
        true
    }

    /// Sets the accumulated normal impulse of the contact at the given index.
    pub fn set_accumulated_impulse(&mut self, index: usize, impulse: f32) {
        self.penetration_constraints[index].accumulated_impulse = impulse;
    }

    /// Sets the accumulated central friction impulses.
    pub fn set_friction_impulses(&mut self, sliding: Vec3, twist: f32) {
        self.sliding_friction_impulse = sliding;
        self.twist_friction_impulse = twist;
    }

    pub fn total_normal_impulse(&self) -> f32 {
        self.penetration_constraints
            .iter()
            .map(|c| c.accumulated_impulse)
            .sum()
    }

    /// Gets the average position of the constraint's contacts.
    pub fn manifold_center(&self) -> Vec3 {
        if self.penetration_constraints.is_empty() {
            return Vec3::ZERO;
        }
        let sum: Vec3 = self
            .penetration_constraints
            .iter()
            .map(|c| c.contact.position)
            .sum();
        sum / self.penetration_constraints.len() as f32
    }

    /// Recomputes the blended material properties. Contacts are untouched.
    pub fn update_material_properties(&mut self, a: &Material, b: &Material, blender: MaterialBlender) {
        self.material = PairMaterialProperties::blend(a, b, blender);
    }

    /// Returns the constraint to its freshly created state. The handle is kept.
    pub fn reset(&mut self) {
        self.penetration_constraints.clear();
        self.sliding_friction_impulse = Vec3::ZERO;
        self.twist_friction_impulse = 0.0;
        self.material = PairMaterialProperties::default();
        self.solver_attached = false;
    }
}

/// Solver-facing aggregate of the constraints of a group pair's children.
/// The group enters the solver while any member is attached.
#[derive(Debug, Clone)]
pub struct ConstraintGroup {
    handle: ConstraintHandle,
    members: Vec<ConstraintHandle>,
    pub(crate) solver_attached: bool,
}

impl ConstraintGroup {
    pub fn new(handle: ConstraintHandle) -> Self {
        Self {
            handle,
            members: Vec::new(),
            solver_attached: false,
        }
    }

    #[inline(always)]
    pub fn handle(&self) -> ConstraintHandle {
        self.handle
    }

    #[inline(always)]
    pub fn is_solver_attached(&self) -> bool {
        self.solver_attached
    }

    /// Gets the solver-attached constraints of the group's children.
    pub fn members(&self) -> &[ConstraintHandle] {
        &self.members
    }

    /// Adds a member and returns the new member count.
    pub(crate) fn add_member(&mut self, member: ConstraintHandle) -> usize {
        debug_assert!(
            !self.members.contains(&member),
            "{member} is already a member of {}",
            self.handle
        );
        self.members.push(member);
        self.members.len()
    }

    /// Removes a member and returns the new member count.
    pub(crate) fn remove_member(&mut self, member: ConstraintHandle) -> usize {
        let index = self.members.iter().position(|m| *m == member);
        debug_assert!(index.is_some(), "{member} is not a member of {}", self.handle);
        if let Some(index) = index {
            self.members.remove(index);
        }
        self.members.len()
    }

    pub fn reset(&mut self) {
        self.members.clear();
        self.solver_attached = false;
    }
}
