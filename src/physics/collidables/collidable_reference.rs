use std::fmt;

use glam::Vec3;
use smallvec::SmallVec;

use crate::physics::body_properties::{BodyVelocity, RigidPose};
use crate::physics::collision_detection::broad_phase_overlap::CollisionRule;
use crate::physics::collision_detection::narrow_phase_callbacks::Material;
use crate::physics::handles::CollidableHandle;
use crate::utilities::bounding_box::BoundingBox;

use super::collidable::{Collidable, ContinuousDetectionMode};
use super::collidable_set::CollidableSet;
use super::shape::{IConvexShape, Shape, ShapeKind};
use super::triangle::Triangle;

/// Refers to a collidable, or to a part of a composite collidable.
///
/// The path lists child indices walked from the root collidable's shape: compound child
/// indices, optionally terminated by a mesh triangle index.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollidableReference {
    root: CollidableHandle,
    path: SmallVec<[i32; 2]>,
}

impl CollidableReference {
    /// Creates a reference to a whole collidable.
    #[inline]
    pub fn root(handle: CollidableHandle) -> Self {
        Self {
            root: handle,
            path: SmallVec::new(),
        }
    }

    /// Creates a reference to a child of the referenced part.
    #[inline]
    pub fn child(&self, index: i32) -> Self {
        let mut path = self.path.clone();
        path.push(index);
        Self {
            root: self.root,
            path,
        }
    }

    /// Gets the handle of the collidable that owns the referenced part.
    #[inline(always)]
    pub fn root_handle(&self) -> CollidableHandle {
        self.root
    }

    /// Gets whether the reference refers to a whole collidable rather than a part of one.
    #[inline(always)]
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Gets the number of composite levels between the root collidable and the referenced part.
    #[inline(always)]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn path(&self) -> &[i32] {
        &self.path
    }

    /// Resolves the referenced part into its current world state.
    ///
    /// # Panics
    /// Panics if the root collidable no longer exists or the path does not match its shape.
    pub fn resolve<'a>(&self, collidables: &'a CollidableSet) -> ResolvedCollidable<'a> {
        match self.try_resolve(collidables) {
            Some(resolved) => resolved,
            None => panic!("{self} does not refer to a live collidable part"),
        }
    }

    /// Resolves the referenced part, returning `None` if the root is gone or the path is stale.
    pub fn try_resolve<'a>(&self, collidables: &'a CollidableSet) -> Option<ResolvedCollidable<'a>> {
        let owner = collidables.get(self.root)?;
        let root_velocity = owner.velocity;
        let mut resolved = ResolvedCollidable {
            handle: self.root,
            owner,
            shape: ResolvedShape::Shape(&owner.shape),
            pose: owner.pose,
            velocity: root_velocity,
            material: owner.material,
            continuity: owner.continuity,
            collision_rule: owner.collision_rule,
            is_active: owner.is_active,
        };
        for (depth, &index) in self.path.iter().enumerate() {
            let ResolvedShape::Shape(shape) = resolved.shape else {
                // Triangles have no children.
                return None;
            };
            let index = usize::try_from(index).ok()?;
            match shape {
                Shape::Compound(compound) => {
                    let child = compound.child(index)?;
                    resolved.pose = child.world_pose(&resolved.pose);
                    resolved.velocity = BodyVelocity::new(
                        root_velocity.velocity_at_offset(resolved.pose.position - owner.pose.position),
                        root_velocity.angular,
                    );
                    if let Some(material) = child.material {
                        resolved.material = material;
                    }
                    resolved.collision_rule = resolved.collision_rule.max(child.collision_rule);
                    resolved.shape = ResolvedShape::Shape(&child.shape);
                }
                Shape::Mesh(_) | Shape::InstancedMesh(_) => {
                    if depth + 1 != self.path.len() {
                        return None;
                    }
                    let (mesh, scale) = match shape {
                        Shape::Mesh(mesh) => (mesh, Vec3::ONE),
                        Shape::InstancedMesh(instance) => (&*instance.mesh, instance.scale),
                        _ => unreachable!(),
                    };
                    if index >= mesh.triangle_count() {
                        return None;
                    }
                    let local = mesh.triangle(index, scale);
                    let centroid = local.centroid();
                    let mut triangle = Triangle::new(local.a - centroid, local.b - centroid, local.c - centroid);
                    triangle.sidedness = local.sidedness;
                    resolved.pose = RigidPose::new(resolved.pose.transform(centroid), resolved.pose.orientation);
                    resolved.velocity = BodyVelocity::new(
                        root_velocity.velocity_at_offset(resolved.pose.position - owner.pose.position),
                        root_velocity.angular,
                    );
                    resolved.shape = ResolvedShape::Triangle(triangle);
                }
                _ => return None,
            }
        }
        Some(resolved)
    }
}

impl From<CollidableHandle> for CollidableReference {
    fn from(handle: CollidableHandle) -> Self {
        Self::root(handle)
    }
}

impl fmt::Debug for CollidableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for CollidableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for index in &self.path {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

/// Shape of a resolved collidable part.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedShape<'a> {
    Shape(&'a Shape),
    /// A mesh triangle, centered on the resolved pose.
    Triangle(Triangle),
}

impl ResolvedShape<'_> {
    #[inline]
    pub fn kind(&self) -> ShapeKind {
        match self {
            ResolvedShape::Shape(shape) => shape.kind(),
            ResolvedShape::Triangle(_) => ShapeKind::Triangle,
        }
    }

    #[inline]
    pub fn as_convex(&self) -> Option<&dyn IConvexShape> {
        match self {
            ResolvedShape::Shape(shape) => shape.as_convex(),
            ResolvedShape::Triangle(triangle) => Some(triangle),
        }
    }

    /// Gets the triangle, if the part is a triangle.
    #[inline]
    pub fn as_triangle(&self) -> Option<&Triangle> {
        match self {
            ResolvedShape::Shape(Shape::Triangle(triangle)) => Some(triangle),
            ResolvedShape::Triangle(triangle) => Some(triangle),
            _ => None,
        }
    }
}

/// World state of a collidable or one of its parts, with composite ancestry folded in.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedCollidable<'a> {
    /// Handle of the root collidable owning the part.
    pub handle: CollidableHandle,
    /// The root collidable owning the part.
    pub owner: &'a Collidable,
    pub shape: ResolvedShape<'a>,
    pub pose: RigidPose,
    /// Velocity of the part at its pose position.
    pub velocity: BodyVelocity,
    pub material: Material,
    pub continuity: ContinuousDetectionMode,
    pub collision_rule: CollisionRule,
    pub is_active: bool,
}

impl ResolvedCollidable<'_> {
    #[inline(always)]
    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    #[inline(always)]
    pub fn convex(&self) -> Option<&dyn IConvexShape> {
        self.shape.as_convex()
    }

    /// Computes the world bounds of the part.
    pub fn bounds(&self) -> BoundingBox {
        match &self.shape {
            ResolvedShape::Shape(shape) => shape.compute_bounds(&self.pose),
            ResolvedShape::Triangle(triangle) => triangle.compute_bounds(&self.pose),
        }
    }

    /// Computes the velocity of a world space point rigidly attached to the part.
    #[inline]
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.velocity.velocity_at_offset(point - self.pose.position)
    }

    /// Collects the indices of the part's children whose bounds intersect the given world bounds.
    /// Returns false if the part is not composite.
    pub fn find_child_overlaps(&self, bounds: &BoundingBox, overlaps: &mut Vec<i32>) -> bool {
        match &self.shape {
            ResolvedShape::Shape(Shape::Compound(compound)) => {
                compound.find_overlaps(&self.pose, bounds, overlaps);
                true
            }
            ResolvedShape::Shape(Shape::Mesh(mesh)) => {
                mesh.find_overlaps(Vec3::ONE, &self.pose, bounds, overlaps);
                true
            }
            ResolvedShape::Shape(Shape::InstancedMesh(instance)) => {
                instance.mesh.find_overlaps(instance.scale, &self.pose, bounds, overlaps);
                true
            }
            _ => false,
        }
    }
}
