use glam::Vec3;

use super::shape::IConvexShape;

/// Collision shape representing a sphere-expanded line segment along the local Y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capsule {
    /// Spherical expansion applied to the internal line segment.
    pub radius: f32,
    /// Half of the length of the internal line segment.
    pub half_length: f32,
}

impl Capsule {
    /// Creates a capsule shape.
    #[inline]
    pub fn new(radius: f32, length: f32) -> Self {
        Self {
            radius,
            half_length: length * 0.5,
        }
    }

    /// Gets the length of the capsule's internal line segment.
    pub fn length(&self) -> f32 {
        self.half_length * 2.0
    }
}

impl IConvexShape for Capsule {
    #[inline]
    fn local_support(&self, direction: Vec3) -> Vec3 {
        let segment_end = if direction.y < 0.0 {
            -self.half_length
        } else {
            self.half_length
        };
        Vec3::new(0.0, segment_end, 0.0) + direction.normalize_or_zero() * self.radius
    }

    #[inline(always)]
    fn minimum_radius(&self) -> f32 {
        self.radius
    }

    #[inline(always)]
    fn maximum_radius(&self) -> f32 {
        self.radius + self.half_length
    }
}
