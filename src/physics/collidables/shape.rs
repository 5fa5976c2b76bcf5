use glam::Vec3;

use crate::physics::body_properties::RigidPose;
use crate::utilities::bounding_box::BoundingBox;

use super::box_shape::BoxShape;
use super::capsule::Capsule;
use super::compound::Compound;
use super::mesh::{InstancedMesh, Mesh};
use super::sphere::Sphere;
use super::triangle::Triangle;

/// Payload-free discriminant of a [`Shape`]. Pair handler dispatch is keyed by pairs of these.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShapeKind {
    Sphere = 0,
    Box = 1,
    Capsule = 2,
    Triangle = 3,
    Compound = 4,
    Mesh = 5,
    InstancedMesh = 6,
}

impl ShapeKind {
    /// Every shape kind, in discriminant order.
    pub const ALL: [ShapeKind; 7] = [
        ShapeKind::Sphere,
        ShapeKind::Box,
        ShapeKind::Capsule,
        ShapeKind::Triangle,
        ShapeKind::Compound,
        ShapeKind::Mesh,
        ShapeKind::InstancedMesh,
    ];

    /// Gets whether shapes of this kind implement [`IConvexShape`].
    #[inline(always)]
    pub fn is_convex(self) -> bool {
        (self as u8) <= ShapeKind::Triangle as u8
    }

    /// Gets whether shapes of this kind are triangle meshes.
    #[inline(always)]
    pub fn is_mesh(self) -> bool {
        matches!(self, ShapeKind::Mesh | ShapeKind::InstancedMesh)
    }
}

/// Defines functions available on all convex shapes.
/// Convex shapes have no hollowed out regions; any line passing through a convex shape
/// will never enter and exit more than once.
pub trait IConvexShape: Send + Sync {
    /// Computes the point on the shape, in its local space, that is furthest along a local direction.
    /// The direction does not need to be normalized.
    fn local_support(&self, direction: Vec3) -> Vec3;

    /// Radius of the largest sphere centered on the local origin that fits entirely inside the shape.
    fn minimum_radius(&self) -> f32;

    /// Radius of the smallest sphere centered on the local origin that contains the shape.
    fn maximum_radius(&self) -> f32;

    /// Computes the point on the shape furthest along a world space direction.
    #[inline]
    fn support(&self, pose: &RigidPose, direction: Vec3) -> Vec3 {
        pose.transform(self.local_support(pose.orientation.conjugate() * direction))
    }

    /// Computes the world space bounding box of the shape at the given pose.
    fn compute_bounds(&self, pose: &RigidPose) -> BoundingBox {
        let mut min = Vec3::ZERO;
        let mut max = Vec3::ZERO;
        for axis in 0..3 {
            let mut direction = Vec3::ZERO;
            direction[axis] = 1.0;
            max[axis] = self.support(pose, direction)[axis];
            min[axis] = self.support(pose, -direction)[axis];
        }
        BoundingBox::new(min, max)
    }
}

/// Collision shape attached to a collidable. Convex primitives, compounds and triangle meshes.
#[derive(Debug, Clone)]
pub enum Shape {
    Sphere(Sphere),
    Box(BoxShape),
    Capsule(Capsule),
    Triangle(Triangle),
    Compound(Compound),
    Mesh(Mesh),
    InstancedMesh(InstancedMesh),
}

impl Shape {
    /// Gets the kind of the shape.
    #[inline(always)]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Sphere(_) => ShapeKind::Sphere,
            Shape::Box(_) => ShapeKind::Box,
            Shape::Capsule(_) => ShapeKind::Capsule,
            Shape::Triangle(_) => ShapeKind::Triangle,
            Shape::Compound(_) => ShapeKind::Compound,
            Shape::Mesh(_) => ShapeKind::Mesh,
            Shape::InstancedMesh(_) => ShapeKind::InstancedMesh,
        }
    }

    /// Gets the shape as a convex shape, if it is one.
    #[inline]
    pub fn as_convex(&self) -> Option<&dyn IConvexShape> {
        match self {
            Shape::Sphere(s) => Some(s),
            Shape::Box(s) => Some(s),
            Shape::Capsule(s) => Some(s),
            Shape::Triangle(s) => Some(s),
            _ => None,
        }
    }

    /// Computes the world space bounding box of the shape at the given pose.
    pub fn compute_bounds(&self, pose: &RigidPose) -> BoundingBox {
        match self {
            Shape::Compound(compound) => compound.compute_bounds(pose),
            Shape::Mesh(mesh) => mesh.compute_bounds(Vec3::ONE, pose),
            Shape::InstancedMesh(instance) => instance.mesh.compute_bounds(instance.scale, pose),
            convex => match convex.as_convex() {
                Some(shape) => shape.compute_bounds(pose),
                None => unreachable!("every non-composite shape is convex"),
            },
        }
    }
}

impl From<Sphere> for Shape {
    fn from(shape: Sphere) -> Self {
        Shape::Sphere(shape)
    }
}

impl From<BoxShape> for Shape {
    fn from(shape: BoxShape) -> Self {
        Shape::Box(shape)
    }
}

impl From<Capsule> for Shape {
    fn from(shape: Capsule) -> Self {
        Shape::Capsule(shape)
    }
}

impl From<Triangle> for Shape {
    fn from(shape: Triangle) -> Self {
        Shape::Triangle(shape)
    }
}

impl From<Compound> for Shape {
    fn from(shape: Compound) -> Self {
        Shape::Compound(shape)
    }
}

impl From<Mesh> for Shape {
    fn from(shape: Mesh) -> Self {
        Shape::Mesh(shape)
    }
}

impl From<InstancedMesh> for Shape {
    fn from(shape: InstancedMesh) -> Self {
        Shape::InstancedMesh(shape)
    }
}
