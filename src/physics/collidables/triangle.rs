use glam::Vec3;

use super::shape::IConvexShape;

/// Which faces of a triangle can generate contacts and impacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TriangleSidedness {
    /// Both faces collide.
    #[default]
    DoubleSided,
    /// Only the face from which the vertices appear clockwise collides. The front normal is -(b-a)x(c-a).
    Clockwise,
    /// Only the face from which the vertices appear counterclockwise collides. The front normal is (b-a)x(c-a).
    Counterclockwise,
}

/// Collision shape representing a triangle. Vertices are expressed in the triangle's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub sidedness: TriangleSidedness,
}

impl Triangle {
    /// Creates a double sided triangle shape.
    #[inline]
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self {
            a,
            b,
            c,
            sidedness: TriangleSidedness::DoubleSided,
        }
    }

    /// Returns the triangle with the given sidedness.
    #[inline]
    pub fn with_sidedness(mut self, sidedness: TriangleSidedness) -> Self {
        self.sidedness = sidedness;
        self
    }

    /// Computes the local normal (b-a)x(c-a), normalized. Degenerate triangles produce zero.
    #[inline]
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a).normalize_or_zero()
    }

    /// Computes the local front facing normal, if the triangle has exactly one colliding face.
    #[inline]
    pub fn front_normal(&self) -> Option<Vec3> {
        match self.sidedness {
            TriangleSidedness::DoubleSided => None,
            TriangleSidedness::Counterclockwise => Some(self.normal()),
            TriangleSidedness::Clockwise => Some(-self.normal()),
        }
    }

    /// Gets the average of the triangle's vertices.
    #[inline]
    pub fn centroid(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }
}

impl IConvexShape for Triangle {
    #[inline]
    fn local_support(&self, direction: Vec3) -> Vec3 {
        let da = self.a.dot(direction);
        let db = self.b.dot(direction);
        let dc = self.c.dot(direction);
        if da >= db && da >= dc {
            self.a
        } else if db >= dc {
            self.b
        } else {
            self.c
        }
    }

    /// Triangles have no volume.
    #[inline(always)]
    fn minimum_radius(&self) -> f32 {
        0.0
    }

    #[inline]
    fn maximum_radius(&self) -> f32 {
        self.a.length().max(self.b.length()).max(self.c.length())
    }
}
