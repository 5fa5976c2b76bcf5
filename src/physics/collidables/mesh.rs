use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{Envelope, RTree, RTreeObject, SelectionFunction, AABB};

use crate::physics::body_properties::RigidPose;
use crate::utilities::bounding_box::BoundingBox;

use super::triangle::{Triangle, TriangleSidedness};

/// Local bounds of a mesh triangle or compound child, tagged with its index.
pub(super) type BoundsLeaf = GeomWithData<Rectangle<[f32; 3]>, usize>;

pub(super) fn bounds_leaf(bounds: &BoundingBox, index: usize) -> BoundsLeaf {
    GeomWithData::new(Rectangle::from_corners(bounds.min.to_array(), bounds.max.to_array()), index)
}

/// Selects every leaf whose envelope intersects the query box.
pub(super) struct IntersectingEnvelope(AABB<[f32; 3]>);

impl IntersectingEnvelope {
    pub(super) fn new(bounds: &BoundingBox) -> Self {
        Self(AABB::from_corners(bounds.min.to_array(), bounds.max.to_array()))
    }
}

impl SelectionFunction<BoundsLeaf> for IntersectingEnvelope {
    fn should_unpack_parent(&self, envelope: &AABB<[f32; 3]>) -> bool {
        envelope.intersects(&self.0)
    }

    fn should_unpack_leaf(&self, leaf: &BoundsLeaf) -> bool {
        leaf.envelope().intersects(&self.0)
    }
}

/// Triangle mesh shape. Triangles are indexed into a shared vertex buffer and
/// accelerated by an R-tree over their local bounds.
#[derive(Clone)]
pub struct Mesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    /// Sidedness applied to every triangle of the mesh.
    pub sidedness: TriangleSidedness,
    local_bounds: BoundingBox,
    tree: RTree<BoundsLeaf>,
}

impl Mesh {
    /// Builds a mesh and its acceleration structure.
    ///
    /// # Panics
    /// Panics if a triangle references a vertex outside the vertex buffer.
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        let mut local_bounds = BoundingBox::EMPTY;
        let leaves = triangles
            .iter()
            .enumerate()
            .map(|(index, indices)| {
                let [a, b, c] = indices.map(|i| vertices[i as usize]);
                let bounds = BoundingBox::new(a.min(b).min(c), a.max(b).max(c));
                local_bounds = BoundingBox::create_merged(&local_bounds, &bounds);
                bounds_leaf(&bounds, index)
            })
            .collect();
        Self {
            vertices,
            triangles,
            sidedness: TriangleSidedness::DoubleSided,
            local_bounds,
            tree: RTree::bulk_load(leaves),
        }
    }

    pub fn with_sidedness(mut self, sidedness: TriangleSidedness) -> Self {
        self.sidedness = sidedness;
        self
    }

    #[inline(always)]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Gets a triangle of the mesh in the mesh's local space, scaled.
    #[inline]
    pub fn triangle(&self, index: usize, scale: Vec3) -> Triangle {
        let [a, b, c] = self.triangles[index].map(|i| self.vertices[i as usize] * scale);
        let mut triangle = Triangle::new(a, b, c);
        // Mirroring scales flip the winding.
        let sidedness = match self.sidedness {
            TriangleSidedness::Clockwise if scale.x * scale.y * scale.z < 0.0 => {
                TriangleSidedness::Counterclockwise
            }
            TriangleSidedness::Counterclockwise if scale.x * scale.y * scale.z < 0.0 => {
                TriangleSidedness::Clockwise
            }
            other => other,
        };
        triangle.sidedness = sidedness;
        triangle
    }

    /// Computes the world space bounds of the mesh with the given scale and pose.
    pub fn compute_bounds(&self, scale: Vec3, pose: &RigidPose) -> BoundingBox {
        if self.triangles.is_empty() {
            return BoundingBox::new(pose.position, pose.position);
        }
        self.local_bounds.transform(scale, pose)
    }

    /// Collects the indices of triangles whose local bounds intersect the world space query bounds.
    pub fn find_overlaps(&self, scale: Vec3, pose: &RigidPose, bounds: &BoundingBox, overlaps: &mut Vec<i32>) {
        let query = IntersectingEnvelope::new(&bounds.transform_by_inverse(scale, pose));
        let start = overlaps.len();
        overlaps.extend(
            self.tree
                .locate_with_selection_function(query)
                .map(|leaf| leaf.data as i32),
        );
        overlaps[start..].sort_unstable();
    }
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("vertex_count", &self.vertices.len())
            .field("triangle_count", &self.triangles.len())
            .field("sidedness", &self.sidedness)
            .field("local_bounds", &self.local_bounds)
            .finish()
    }
}

/// Shared mesh with a per-instance scale.
#[derive(Debug, Clone)]
pub struct InstancedMesh {
    pub mesh: Arc<Mesh>,
    pub scale: Vec3,
}

impl InstancedMesh {
    pub fn new(mesh: Arc<Mesh>, scale: Vec3) -> Self {
        Self { mesh, scale }
    }
}
