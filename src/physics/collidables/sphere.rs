use glam::Vec3;

use super::shape::IConvexShape;

/// Collision shape representing a sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sphere {
    /// Radius of the sphere.
    pub radius: f32,
}

impl Sphere {
    /// Creates a sphere shape.
    #[inline(always)]
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }
}

impl IConvexShape for Sphere {
    #[inline]
    fn local_support(&self, direction: Vec3) -> Vec3 {
        direction.normalize_or_zero() * self.radius
    }

    #[inline(always)]
    fn minimum_radius(&self) -> f32 {
        self.radius
    }

    #[inline(always)]
    fn maximum_radius(&self) -> f32 {
        self.radius
    }
}
