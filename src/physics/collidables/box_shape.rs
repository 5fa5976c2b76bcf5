use glam::Vec3;

use super::shape::IConvexShape;

/// Collision shape representing a solid cuboid.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoxShape {
    /// Half of the box's width along its local X axis.
    pub half_width: f32,
    /// Half of the box's height along its local Y axis.
    pub half_height: f32,
    /// Half of the box's length along its local Z axis.
    pub half_length: f32,
}

impl BoxShape {
    /// Creates a box shape from full extents.
    #[inline]
    pub fn new(width: f32, height: f32, length: f32) -> Self {
        Self {
            half_width: width * 0.5,
            half_height: height * 0.5,
            half_length: length * 0.5,
        }
    }

    /// Gets the half extents of the box as a vector.
    #[inline(always)]
    pub fn half_extents(&self) -> Vec3 {
        Vec3::new(self.half_width, self.half_height, self.half_length)
    }

    pub fn width(&self) -> f32 {
        self.half_width * 2.0
    }

    pub fn height(&self) -> f32 {
        self.half_height * 2.0
    }

    pub fn length(&self) -> f32 {
        self.half_length * 2.0
    }
}

impl IConvexShape for BoxShape {
    #[inline]
    fn local_support(&self, direction: Vec3) -> Vec3 {
        let half = self.half_extents();
        Vec3::select(direction.cmplt(Vec3::ZERO), -half, half)
    }

    #[inline]
    fn minimum_radius(&self) -> f32 {
        self.half_width.min(self.half_height).min(self.half_length)
    }

    #[inline]
    fn maximum_radius(&self) -> f32 {
        self.half_extents().length()
    }
}
