use glam::Vec3;
use log::trace;

use crate::physics::collidables::collidable_reference::ResolvedCollidable;
use crate::physics::handles::CollidableHandle;

use super::gjk_toolbox::sphere_cast;
use super::settings::CollisionDetectionSettings;

/// Gets whether a pair needs a time of impact: one side must be continuous and one side must be moving.
#[inline]
pub fn requires_time_of_impact(a: &ResolvedCollidable, b: &ResolvedCollidable) -> bool {
    (a.continuity.is_continuous() || b.continuity.is_continuous()) && (a.is_active || b.is_active)
}

/// Estimates the fraction of the next `dt` at which the two convex parts first touch.
///
/// Each continuous side moving against a non-continuous side sweeps its core sphere along the relative
/// motion. When both sides are continuous only the requester sweeps. Returns 1 when no earlier impact
/// was found, including when the core spheres already touch at the start of the step.
pub fn compute_time_of_impact(
    a: &ResolvedCollidable,
    b: &ResolvedCollidable,
    requester: CollidableHandle,
    dt: f32,
    settings: &CollisionDetectionSettings,
) -> f32 {
    if !requires_time_of_impact(a, b) {
        return 1.0;
    }
    let motion = (a.velocity.linear - b.velocity.linear) * dt;
    let mut time_of_impact = 1.0f32;
    if is_mover(a, b, requester) {
        if let Some(t) = sweep(a, b, motion, settings) {
            time_of_impact = time_of_impact.min(t);
        }
    }
    if is_mover(b, a, requester) {
        if let Some(t) = sweep(b, a, -motion, settings) {
            time_of_impact = time_of_impact.min(t);
        }
    }
    normalize_time_of_impact(time_of_impact)
}

/// Clamps a time of impact into [0, 1]. Zero means the pair already touches, which is reported as no earlier impact.
#[inline]
pub fn normalize_time_of_impact(t: f32) -> f32 {
    if t > 0.0 {
        t.min(1.0)
    } else {
        1.0
    }
}

#[inline]
fn is_mover(side: &ResolvedCollidable, other: &ResolvedCollidable, requester: CollidableHandle) -> bool {
    side.continuity.is_continuous() && (!other.continuity.is_continuous() || side.handle == requester)
}

fn sweep(
    mover: &ResolvedCollidable,
    target: &ResolvedCollidable,
    motion: Vec3,
    settings: &CollisionDetectionSettings,
) -> Option<f32> {
    let (Some(mover_shape), Some(target_shape)) = (mover.convex(), target.convex()) else {
        return None;
    };
    let core_radius = mover_shape.minimum_radius() * settings.core_shape_scaling;
    // Motion shorter than the core cannot skip past the target.
    if motion.length_squared() <= core_radius * core_radius {
        return None;
    }
    let offset = mover.pose.position - target.pose.position;
    let (t0, _) = get_sphere_cast_interval(offset, motion, core_radius + target_shape.maximum_radius())?;
    if t0 > 1.0 {
        return None;
    }
    let hit = sphere_cast(mover.pose.position, motion, core_radius, target_shape, &target.pose, 1.0, settings)?;
    if hit.t <= 0.0 {
        return None;
    }
    if hit.normal.length_squared() < 1e-12 {
        trace!("skipping impact with a degenerate normal at t = {}", hit.t);
        return None;
    }
    if let Some(front) = target.shape.as_triangle().and_then(|triangle| triangle.front_normal()) {
        let front = target.pose.orientation * front;
        if hit.normal.dot(front) <= 0.0 {
            return None;
        }
    }
    Some(hit.t)
}

/// Computes the interval of the ray `origin + direction * t` that lies within a sphere at the origin.
/// Returns `None` if the ray misses the sphere or the sphere is entirely behind the ray.
fn get_sphere_cast_interval(origin: Vec3, direction: Vec3, radius: f32) -> Option<(f32, f32)> {
    let d_length = direction.length();
    if d_length == 0.0 {
        return (origin.length_squared() <= radius * radius).then_some((0.0, f32::MAX));
    }
    let inverse_d_length = 1.0 / d_length;
    let d = direction * inverse_d_length;

    // Move the origin up to the earliest possible impact time.
    let t_offset = (-origin.dot(d) - radius).max(0.0);
    let o = origin + d * t_offset;
    let b = o.dot(d);
    let c = o.dot(o) - radius * radius;
    if b > 0.0 && c > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let interval_radius = discriminant.sqrt();
    let t0 = (t_offset - interval_radius - b) * inverse_d_length;
    let t1 = (t_offset + interval_radius - b) * inverse_d_length;
    Some((t0, t1))
}
