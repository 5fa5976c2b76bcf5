use glam::Vec3;
use smallvec::SmallVec;

use crate::physics::body_properties::RigidPose;
use crate::physics::collidables::shape::IConvexShape;

use super::settings::CollisionDetectionSettings;

type Simplex = SmallVec<[Vec3; 4]>;

const CONTAINMENT_EPSILON: f32 = 1e-7;

/// Closest point on a convex shape to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    /// World position of the closest point on the shape. Equal to the query point if it is contained.
    pub location: Vec3,
    /// Whether the query point is inside or touching the shape.
    pub contained: bool,
}

/// Result of a successful sphere cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereCastHit {
    /// Fraction of the motion at which the sphere reaches the target.
    pub t: f32,
    /// World position on the target closest to the sphere at impact.
    pub location: Vec3,
    /// Surface normal of the target at the impact, pointing toward the sphere. Zero if the sphere started inside.
    pub normal: Vec3,
}

/// Finds the point on a convex shape closest to a world space point using GJK over the
/// shape's Minkowski difference with the point.
pub fn closest_point(shape: &dyn IConvexShape, pose: &RigidPose, point: Vec3, maximum_iterations: u32) -> ClosestPoint {
    let q = pose.transform_by_inverse(point);
    let mut simplex = Simplex::new();
    let mut v = shape.local_support(Vec3::X) - q;
    simplex.push(v);
    for _ in 0..maximum_iterations {
        let v_squared = v.length_squared();
        if v_squared < CONTAINMENT_EPSILON {
            return ClosestPoint {
                location: point,
                contained: true,
            };
        }
        let w = shape.local_support(-v) - q;
        // No further progress toward the origin is possible along -v.
        if v_squared - v.dot(w) <= 1e-6 * v_squared || simplex.iter().any(|p| p.distance_squared(w) < CONTAINMENT_EPSILON) {
            break;
        }
        simplex.push(w);
        match reduce(&mut simplex) {
            Some(closest) => v = closest,
            None => {
                return ClosestPoint {
                    location: point,
                    contained: true,
                }
            }
        }
    }
    ClosestPoint {
        location: pose.transform(v + q),
        contained: false,
    }
}

/// Reduces the simplex to the smallest subset supporting its closest point to the origin and returns that point.
/// Returns `None` if a tetrahedral simplex contains the origin.
fn reduce(simplex: &mut Simplex) -> Option<Vec3> {
    match simplex.len() {
        1 => Some(simplex[0]),
        2 => Some(reduce_segment(simplex)),
        3 => Some(reduce_triangle(simplex)),
        _ => reduce_tetrahedron(simplex),
    }
}

fn reduce_segment(simplex: &mut Simplex) -> Vec3 {
    let (a, b) = (simplex[0], simplex[1]);
    let ab = b - a;
    let length_squared = ab.length_squared();
    if length_squared < CONTAINMENT_EPSILON {
        simplex.truncate(1);
        return a;
    }
    let t = -a.dot(ab) / length_squared;
    if t <= 0.0 {
        simplex.truncate(1);
        a
    } else if t >= 1.0 {
        simplex.swap_remove(0);
        b
    } else {
        a + ab * t
    }
}

/// Closest point on triangle abc to the origin, following the Voronoi region walk from Ericson's
/// Real-Time Collision Detection. The simplex keeps only the vertices of the closest feature.
fn reduce_triangle(simplex: &mut Simplex) -> Vec3 {
    let (a, b, c) = (simplex[0], simplex[1], simplex[2]);
    let ab = b - a;
    let ac = c - a;
    let d1 = ab.dot(-a);
    let d2 = ac.dot(-a);
    if d1 <= 0.0 && d2 <= 0.0 {
        keep(simplex, &[a]);
        return a;
    }
    let d3 = ab.dot(-b);
    let d4 = ac.dot(-b);
    if d3 >= 0.0 && d4 <= d3 {
        keep(simplex, &[b]);
        return b;
    }
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        keep(simplex, &[a, b]);
        return a + ab * v;
    }
    let d5 = ab.dot(-c);
    let d6 = ac.dot(-c);
    if d6 >= 0.0 && d5 <= d6 {
        keep(simplex, &[c]);
        return c;
    }
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        keep(simplex, &[a, c]);
        return a + ac * w;
    }
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        keep(simplex, &[b, c]);
        return b + (c - b) * w;
    }
    let sum = va + vb + vc;
    if sum.abs() < CONTAINMENT_EPSILON {
        // Degenerate triangle; fall back to its best edge.
        let mut best: Option<(Simplex, Vec3)> = None;
        for pair in [[a, b], [a, c], [b, c]] {
            let mut edge = Simplex::from_slice(&pair);
            let closest = reduce_segment(&mut edge);
            if best
                .as_ref()
                .map_or(true, |(_, p)| closest.length_squared() < p.length_squared())
            {
                best = Some((edge, closest));
            }
        }
        let (edge, closest) = best.unwrap_or_else(|| (Simplex::from_slice(&[a]), a));
        *simplex = edge;
        return closest;
    }
    let denominator = 1.0 / sum;
    a + ab * (vb * denominator) + ac * (vc * denominator)
}

fn reduce_tetrahedron(simplex: &mut Simplex) -> Option<Vec3> {
    let [a, b, c, d] = [simplex[0], simplex[1], simplex[2], simplex[3]];
    let faces = [([a, b, c], d), ([a, b, d], c), ([a, c, d], b), ([b, c, d], a)];
    let volume = (b - a).dot((c - a).cross(d - a));
    let scale = (b - a).length_squared().max((c - a).length_squared()).max((d - a).length_squared());
    // Flat simplices cannot enclose the origin; every face is a candidate.
    let flat = volume.abs() <= 1e-6 * scale * scale.sqrt();
    let mut best: Option<(Simplex, Vec3)> = None;
    for ([p0, p1, p2], opposite) in faces {
        let normal = (p1 - p0).cross(p2 - p0);
        let origin_side = normal.dot(-p0);
        let opposite_side = normal.dot(opposite - p0);
        // The origin is outside this face if it lies on the other side from the opposite vertex.
        if !flat && origin_side * opposite_side >= 0.0 {
            continue;
        }
        let mut face = Simplex::from_slice(&[p0, p1, p2]);
        let closest = reduce_triangle(&mut face);
        if best
            .as_ref()
            .map_or(true, |(_, p)| closest.length_squared() < p.length_squared())
        {
            best = Some((face, closest));
        }
    }
    let (face, closest) = best?;
    *simplex = face;
    Some(closest)
}

#[inline]
fn keep(simplex: &mut Simplex, points: &[Vec3]) {
    simplex.clear();
    simplex.extend_from_slice(points);
}

/// Sweeps a sphere along a motion vector against a convex shape by conservative advancement.
///
/// Each step advances by the current gap divided by the closing speed along the separating
/// direction, which never passes the first contact for a convex target. Returns `None` if the
/// sphere moves away from the target or does not reach it within `maximum_t` of the motion.
/// If iterations run out, the last conservative time is reported.
pub fn sphere_cast(
    origin: Vec3,
    motion: Vec3,
    radius: f32,
    target: &dyn IConvexShape,
    target_pose: &RigidPose,
    maximum_t: f32,
    settings: &CollisionDetectionSettings,
) -> Option<SphereCastHit> {
    let mut t = 0.0f32;
    let mut last = None;
    for _ in 0..settings.sweep_maximum_iterations {
        let center = origin + motion * t;
        let closest = closest_point(target, target_pose, center, settings.gjk_maximum_iterations);
        if closest.contained {
            return Some(SphereCastHit {
                t,
                location: closest.location,
                normal: Vec3::ZERO,
            });
        }
        let offset = center - closest.location;
        let distance = offset.length();
        let normal = offset / distance;
        let gap = distance - radius;
        if gap <= settings.sweep_convergence_epsilon {
            return Some(SphereCastHit {
                t,
                location: closest.location,
                normal,
            });
        }
        let closing_speed = -motion.dot(normal);
        if closing_speed <= 0.0 {
            return None;
        }
        t += gap / closing_speed;
        if t > maximum_t {
            return None;
        }
        last = Some(SphereCastHit {
            t,
            location: closest.location,
            normal,
        });
    }
    last
}
