use glam::{Quat, Vec3};
use std::fmt;

/// Represents a rigid transformation.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidPose {
    /// Orientation of the pose.
    pub orientation: Quat,
    /// Position of the pose.
    pub position: Vec3,
}

impl Default for RigidPose {
    #[inline(always)]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidPose {
    /// Returns a pose with a position at (0,0,0) and identity orientation.
    pub const IDENTITY: Self = Self {
        orientation: Quat::IDENTITY,
        position: Vec3::ZERO,
    };

    /// Creates a rigid pose with the given position and orientation.
    #[inline(always)]
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Creates a rigid pose with the given position and identity orientation.
    #[inline(always)]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Transforms a point by the rigid pose: orientation * v + position.
    #[inline(always)]
    pub fn transform(&self, v: Vec3) -> Vec3 {
        self.orientation * v + self.position
    }

    /// Transforms a point by the inverse of the rigid pose: orientation^-1 * (v - position).
    #[inline(always)]
    pub fn transform_by_inverse(&self, v: Vec3) -> Vec3 {
        self.orientation.conjugate() * (v - self.position)
    }

    /// Inverts the rigid transformation of the pose.
    #[inline(always)]
    pub fn inverse(&self) -> Self {
        let orientation = self.orientation.conjugate();
        Self {
            orientation,
            position: orientation * -self.position,
        }
    }

    /// Concatenates one rigid transform with another. The resulting transform is equivalent
    /// to performing transform `a` followed by transform `b`.
    #[inline(always)]
    pub fn multiply(a: &RigidPose, b: &RigidPose) -> RigidPose {
        RigidPose {
            orientation: (b.orientation * a.orientation).normalize(),
            position: b.orientation * a.position + b.position,
        }
    }
}

impl From<Vec3> for RigidPose {
    fn from(position: Vec3) -> Self {
        Self::from_position(position)
    }
}

impl From<(Vec3, Quat)> for RigidPose {
    fn from((position, orientation): (Vec3, Quat)) -> Self {
        Self::new(position, orientation)
    }
}

impl fmt::Display for RigidPose {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}, {}", self.position, self.orientation)
    }
}

/// Linear and angular velocity of a collidable's owner, measured at its pose position.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyVelocity {
    /// Linear velocity associated with the body.
    pub linear: Vec3,
    /// Angular velocity associated with the body.
    pub angular: Vec3,
}

impl BodyVelocity {
    /// Creates a body velocity from linear and angular components.
    #[inline(always)]
    pub fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }

    /// Creates a purely linear velocity.
    #[inline(always)]
    pub fn linear(linear: Vec3) -> Self {
        Self {
            linear,
            angular: Vec3::ZERO,
        }
    }

    /// Computes the velocity of a point rigidly attached to the body, given the point's offset from the pose position.
    #[inline(always)]
    pub fn velocity_at_offset(&self, offset: Vec3) -> Vec3 {
        self.linear + self.angular.cross(offset)
    }
}

impl fmt::Display for BodyVelocity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Linear: {}, Angular: {}", self.linear, self.angular)
    }
}
