use crate::physics::body_properties::RigidPose;
use glam::Vec3;
use std::fmt;

/// Provides simple axis-aligned bounding box functionality.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Location with the lowest X, Y, and Z coordinates in the axis-aligned bounding box.
    pub min: Vec3,
    /// Location with the highest X, Y, and Z coordinates in the axis-aligned bounding box.
    pub max: Vec3,
}

impl BoundingBox {
    /// A box containing nothing. Merging anything into it yields the other box.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    /// Constructs a bounding box from the specified minimum and maximum.
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Constructs a bounding box centered on a point with the given half extents.
    #[inline]
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Determines if a bounding box intersects another bounding box.
    #[inline]
    pub fn intersects(a: &Self, b: &Self) -> bool {
        Self::intersects_bounds(a.min, a.max, b.min, b.max)
    }

    /// Determines if a bounding box intersects another bounding box.
    #[inline]
    pub fn intersects_bounds(min_a: Vec3, max_a: Vec3, min_b: Vec3, max_b: Vec3) -> bool {
        let no_intersection_on_axes = max_a.cmplt(min_b) | max_b.cmplt(min_a);
        !no_intersection_on_axes.any()
    }

    /// Computes the volume of the bounding box.
    #[inline]
    pub fn compute_volume(&self) -> f32 {
        let diagonal = self.max - self.min;
        diagonal.x * diagonal.y * diagonal.z
    }

    /// Computes a bounding box which contains two other bounding boxes.
    #[inline]
    pub fn create_merged(a: &Self, b: &Self) -> Self {
        Self {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    /// Expands the box by the given margin on every side.
    #[inline]
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    /// Expands the box to also contain itself translated by `motion`.
    #[inline]
    pub fn swept(&self, motion: Vec3) -> Self {
        Self {
            min: self.min + motion.min(Vec3::ZERO),
            max: self.max + motion.max(Vec3::ZERO),
        }
    }

    /// Gets the eight corners of the box.
    pub fn corners(&self) -> [Vec3; 8] {
        let (l, h) = (self.min, self.max);
        [
            Vec3::new(l.x, l.y, l.z),
            Vec3::new(h.x, l.y, l.z),
            Vec3::new(l.x, h.y, l.z),
            Vec3::new(h.x, h.y, l.z),
            Vec3::new(l.x, l.y, h.z),
            Vec3::new(h.x, l.y, h.z),
            Vec3::new(l.x, h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
        ]
    }

    /// Computes the box bounding this box after it has been scaled and then transformed by the pose.
    pub fn transform(&self, scale: Vec3, pose: &RigidPose) -> Self {
        let mut result = Self::EMPTY;
        for corner in self.corners() {
            let p = pose.transform(corner * scale);
            result.min = result.min.min(p);
            result.max = result.max.max(p);
        }
        result
    }

    /// Computes the box bounding this box after the inverse of the pose and then the inverse of the scale are applied.
    /// Zero scale components are treated as one.
    pub fn transform_by_inverse(&self, scale: Vec3, pose: &RigidPose) -> Self {
        let inverse_scale = Vec3::select(scale.cmpeq(Vec3::ZERO), Vec3::ONE, scale.recip());
        let mut result = Self::EMPTY;
        for corner in self.corners() {
            let p = pose.transform_by_inverse(corner) * inverse_scale;
            result.min = result.min.min(p);
            result.max = result.max.max(p);
        }
        result
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.min, self.max)
    }
}
