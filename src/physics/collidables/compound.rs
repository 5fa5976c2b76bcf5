use std::fmt;

use glam::Vec3;
use rstar::RTree;

use crate::physics::body_properties::RigidPose;
use crate::physics::collision_detection::broad_phase_overlap::CollisionRule;
use crate::physics::collision_detection::narrow_phase_callbacks::Material;
use crate::utilities::bounding_box::BoundingBox;

use super::mesh::{bounds_leaf, BoundsLeaf, IntersectingEnvelope};
use super::shape::Shape;

/// Slack added to child queries after they are carried into the compound's local space.
const LOCAL_QUERY_MARGIN: f32 = 1e-4;

/// Shape and pose of a child within a compound.
#[derive(Debug, Clone)]
pub struct CompoundChild {
    /// Shape of the child. May itself be a compound or a mesh.
    pub shape: Shape,
    /// Pose of the child relative to the compound's local space.
    pub local_pose: RigidPose,
    /// Material override for the child. `None` inherits the compound owner's material.
    pub material: Option<Material>,
    /// Collision rule of the child. Pairs involving the child use the most restrictive of the child's and its ancestors' rules.
    pub collision_rule: CollisionRule,
}

impl CompoundChild {
    /// Creates a child with no material override and the default collision rule.
    pub fn new(shape: impl Into<Shape>, local_pose: RigidPose) -> Self {
        Self {
            shape: shape.into(),
            local_pose,
            material: None,
            collision_rule: CollisionRule::Normal,
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_collision_rule(mut self, rule: CollisionRule) -> Self {
        self.collision_rule = rule;
        self
    }

    /// Computes the world pose of the child given the compound's world pose.
    #[inline]
    pub fn world_pose(&self, compound_pose: &RigidPose) -> RigidPose {
        RigidPose::multiply(&self.local_pose, compound_pose)
    }
}

/// Shape composed of a set of child shapes, each with its own local pose.
/// Children are indexed by an R-tree over their local bounds.
#[derive(Clone)]
pub struct Compound {
    children: Vec<CompoundChild>,
    tree: RTree<BoundsLeaf>,
}

impl Compound {
    pub fn new(children: Vec<CompoundChild>) -> Self {
        let leaves = children
            .iter()
            .enumerate()
            .map(|(index, child)| bounds_leaf(&child.shape.compute_bounds(&child.local_pose), index))
            .collect();
        Self {
            children,
            tree: RTree::bulk_load(leaves),
        }
    }

    #[inline(always)]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn children(&self) -> &[CompoundChild] {
        &self.children
    }

    #[inline]
    pub fn child(&self, index: usize) -> Option<&CompoundChild> {
        self.children.get(index)
    }

    /// Computes the world space bounds of the compound as the union of its children's bounds.
    pub fn compute_bounds(&self, pose: &RigidPose) -> BoundingBox {
        self.children
            .iter()
            .fold(BoundingBox::EMPTY, |bounds, child| {
                BoundingBox::create_merged(&bounds, &child.shape.compute_bounds(&child.world_pose(pose)))
            })
    }

    /// Collects the indices of children whose world bounds intersect the query bounds, in ascending order.
    pub fn find_overlaps(&self, pose: &RigidPose, bounds: &BoundingBox, overlaps: &mut Vec<i32>) {
        let local = bounds.transform_by_inverse(Vec3::ONE, pose).expanded(LOCAL_QUERY_MARGIN);
        let start = overlaps.len();
        overlaps.extend(
            self.tree
                .locate_with_selection_function(IntersectingEnvelope::new(&local))
                .filter(|leaf| {
                    let child = &self.children[leaf.data];
                    BoundingBox::intersects(&child.shape.compute_bounds(&child.world_pose(pose)), bounds)
                })
                .map(|leaf| leaf.data as i32),
        );
        overlaps[start..].sort_unstable();
    }
}

impl Default for Compound {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compound").field("children", &self.children).finish()
    }
}
