use crate::physics::collidables::collidable_reference::CollidableReference;

use super::contact_manifold::Contact;

/// Surface properties of a collidable.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    /// Friction coefficient of the surface.
    pub friction: f32,
    /// Restitution of the surface, from 0 (inelastic) to 1.
    pub bounciness: f32,
}

impl Material {
    #[inline(always)]
    pub fn new(friction: f32, bounciness: f32) -> Self {
        Self { friction, bounciness }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.6,
            bounciness: 0.0,
        }
    }
}

/// Chooses how two materials combine into the properties of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MaterialBlender {
    #[default]
    Average,
    Multiply,
    Min,
    Max,
}

impl MaterialBlender {
    #[inline]
    pub fn blend(self, a: f32, b: f32) -> f32 {
        match self {
            MaterialBlender::Average => (a + b) * 0.5,
            MaterialBlender::Multiply => a * b,
            MaterialBlender::Min => a.min(b),
            MaterialBlender::Max => a.max(b),
        }
    }
}

/// Material properties governing the interaction between colliding bodies.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PairMaterialProperties {
    /// Coefficient of friction to apply for the constraint.
    /// Maximum friction force will be equal to the normal force times the friction coefficient.
    pub friction_coefficient: f32,
    /// Restitution applied along the contact normals.
    pub bounciness: f32,
}

impl PairMaterialProperties {
    /// Blends two materials into a pair's material properties.
    #[inline]
    pub fn blend(a: &Material, b: &Material, blender: MaterialBlender) -> Self {
        Self {
            friction_coefficient: blender.blend(a.friction, b.friction),
            bounciness: blender.blend(a.bounciness, b.bounciness),
        }
    }
}

/// Receives contact and pair lifecycle notifications for a collidable.
///
/// `sender` is the collidable the listener is attached to and `other` is the opposing side of the pair.
/// Contacts found between parts of composite collidables are reported through the top-level pair.
/// All notifications default to no-ops. They may be invoked from worker threads during a parallel update.
#[allow(unused_variables)]
pub trait ICollisionEventListener: Send + Sync {
    /// A pair handler was initialized for the collidable.
    fn on_pair_created(&self, sender: &CollidableReference, other: &CollidableReference) {}

    /// A contact was added to a pair involving the collidable.
    fn on_contact_created(&self, sender: &CollidableReference, other: &CollidableReference, contact: &Contact) {}

    /// A contact was removed from a pair involving the collidable.
    fn on_contact_removed(&self, sender: &CollidableReference, other: &CollidableReference, contact: &Contact) {}

    /// A pair went from having no contacts to having contacts.
    fn on_initial_collision_detected(&self, sender: &CollidableReference, other: &CollidableReference) {}

    /// A pair went from having contacts to having none.
    fn on_collision_ended(&self, sender: &CollidableReference, other: &CollidableReference) {}

    /// A pair was updated. Fires every tick.
    fn on_pair_updated(&self, sender: &CollidableReference, other: &CollidableReference) {}

    /// A pair with contacts was updated. Fires every tick while touching.
    fn on_pair_touching(&self, sender: &CollidableReference, other: &CollidableReference) {}

    /// A pair handler involving the collidable was cleaned up.
    fn on_pair_removed(&self, sender: &CollidableReference, other: &CollidableReference) {}
}
