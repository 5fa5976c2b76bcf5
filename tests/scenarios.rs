mod common;

use std::sync::Arc;

use approx::assert_relative_eq;
use glam::Vec3;
use rust_bepuphysics_narrowphase::physics::collidables::box_shape::BoxShape;
use rust_bepuphysics_narrowphase::physics::collidables::compound::{Compound, CompoundChild};
use rust_bepuphysics_narrowphase::physics::collidables::mesh::Mesh;
use rust_bepuphysics_narrowphase::physics::collidables::sphere::Sphere;
use rust_bepuphysics_narrowphase::utilities::BoundingBox;
use rust_bepuphysics_narrowphase::{
    BodyVelocity, Collidable, CollidableHandle, CollidableSet, CollisionDetectionSettings, CollisionRule,
    ContinuousDetectionMode, Material, NarrowPhase, RigidPose,
};

use common::{factories, BruteForceBroadPhase, CountingListener, RecordingSolver};

const DT: f32 = 1.0 / 60.0;
const GRAVITY: f32 = -9.81;

struct World {
    set: CollidableSet,
    broad_phase: BruteForceBroadPhase,
    narrow_phase: NarrowPhase,
    solver: RecordingSolver,
}

impl World {
    fn new() -> Self {
        Self {
            set: CollidableSet::new(),
            broad_phase: BruteForceBroadPhase::default(),
            narrow_phase: NarrowPhase::new(factories(), CollisionDetectionSettings::default()),
            solver: RecordingSolver::default(),
        }
    }

    fn add_ground(&mut self) -> CollidableHandle {
        let mut ground = Collidable::new(BoxShape::new(10.0, 1.0, 10.0), RigidPose::IDENTITY);
        ground.is_active = false;
        self.set.add(ground)
    }

    /// Adds a static square of two triangles, `2 * half_width` wide, lying in the xz plane at height `y`.
    fn add_ground_mesh(&mut self, half_width: f32, y: f32) -> CollidableHandle {
        let h = half_width;
        let mesh = Mesh::new(
            vec![
                Vec3::new(-h, 0.0, -h),
                Vec3::new(h, 0.0, -h),
                Vec3::new(h, 0.0, h),
                Vec3::new(-h, 0.0, h),
            ],
            vec![[0, 2, 1], [0, 3, 2]],
        );
        let mut ground = Collidable::new(mesh, RigidPose::from_position(Vec3::new(0.0, y, 0.0)));
        ground.is_active = false;
        self.set.add(ground)
    }

    /// Moves a body under gravity, stopping it dead once its center reaches `rest_y`.
    fn fall(&mut self, body: CollidableHandle, rest_y: f32) {
        let collidable = self.set.get_mut(body).unwrap();
        let velocity = collidable.velocity.linear.y + GRAVITY * DT;
        let y = collidable.pose.position.y + velocity * DT;
        if y <= rest_y {
            collidable.pose.position.y = rest_y;
            collidable.velocity = BodyVelocity::default();
        } else {
            collidable.pose.position.y = y;
            collidable.velocity = BodyVelocity::linear(Vec3::new(0.0, velocity, 0.0));
        }
    }

    fn step(&mut self) {
        self.broad_phase.update(&self.set, &mut self.narrow_phase);
        self.narrow_phase.update(&self.set, DT);
        self.narrow_phase.flush_solver_updateables(&mut self.solver);
    }
}

#[test]
fn box_settles_on_ground_with_one_attachment() {
    let mut world = World::new();
    let listener = Arc::new(CountingListener::default());
    let ground = world.add_ground();
    let body = world.set.add(
        Collidable::new(BoxShape::new(1.0, 1.0, 1.0), RigidPose::from_position(Vec3::new(0.0, 5.0, 0.0)))
            .with_events(listener.clone()),
    );

    let mut landed_at = None;
    for tick in 0..180 {
        world.fall(body, 1.0);
        world.step();
        if landed_at.is_none() && !world.solver.attached.is_empty() {
            landed_at = Some(tick);
            assert_eq!(world.solver.added.len(), 1);
            assert_eq!(listener.count("initial_collision_detected"), 1);
        }
    }

    assert!(landed_at.is_some(), "the box never touched the ground");
    let pair = world.broad_phase.pair(ground, body).unwrap();
    assert_eq!(world.narrow_phase.contact_count(pair), Ok(4));
    assert_eq!(world.solver.added.len(), 1);
    assert!(world.solver.removed.is_empty());
    assert_eq!(world.solver.attached, vec![world.narrow_phase.pair(pair).unwrap().solver_updateable()]);
    assert_eq!(listener.count("initial_collision_detected"), 1);
    assert_eq!(listener.count("contact_created"), 4);
    assert_eq!(listener.count("contact_removed"), 0);
    assert_eq!(listener.count("collision_ended"), 0);
    assert_eq!(listener.count("pair_created"), 1);
}

#[test]
fn resting_contact_information() {
    let mut world = World::new();
    let body = world.set.add(
        Collidable::new(BoxShape::new(1.0, 1.0, 1.0), RigidPose::from_position(Vec3::new(0.0, 1.0, 0.0)))
            .with_velocity(BodyVelocity::linear(Vec3::X)),
    );
    let ground = world.add_ground();
    world.step();
    let pair = world.broad_phase.pair(body, ground).unwrap();
    assert_eq!(world.narrow_phase.pair(pair).unwrap().overlap().a.root_handle(), body);

    let constraint = world
        .narrow_phase
        .pair_mut(pair)
        .and_then(|handler| handler.as_standard_mut())
        .unwrap()
        .constraint_mut();
    for index in 0..4 {
        constraint.set_accumulated_impulse(index, 1.0);
    }
    constraint.set_friction_impulses(Vec3::new(3.0, 0.0, 4.0), 2.0);

    let lever = 0.5f32.sqrt();
    for index in 0..4 {
        let information = world.narrow_phase.get_contact_information(&world.set, pair, index).unwrap();
        assert_relative_eq!(information.normal_impulse, 1.0);
        assert_relative_eq!(information.friction_impulse, 0.25 * (5.0 + 2.0 * lever), epsilon = 1e-5);
        assert_relative_eq!(information.relative_velocity.distance(Vec3::X), 0.0, epsilon = 1e-5);
        assert_relative_eq!(information.contact.position.y, 0.5);
    }
}

#[test]
fn compound_children_pair_independently() {
    let mut world = World::new();
    let listener = Arc::new(CountingListener::default());
    let ground = world.add_ground();
    let compound = Compound::new(
        [-2.0, 0.0, 2.0]
            .into_iter()
            .map(|x| CompoundChild::new(BoxShape::new(1.0, 1.0, 1.0), RigidPose::from_position(Vec3::new(x, 0.0, 0.0))))
            .collect(),
    );
    let body = world.set.add(
        Collidable::new(compound, RigidPose::from_position(Vec3::new(0.0, 3.0, 0.0))).with_events(listener.clone()),
    );

    // Drop until all three children land on the same tick.
    let mut ticks = 0;
    while world.solver.attached.is_empty() {
        world.fall(body, 1.0);
        world.step();
        ticks += 1;
        assert!(ticks < 180, "the compound never touched the ground");
    }
    let pair = world.broad_phase.pair(ground, body).unwrap();
    let group_item = world.narrow_phase.pair(pair).unwrap().solver_updateable();
    {
        let group = world.narrow_phase.pair(pair).unwrap().as_group().unwrap();
        assert_eq!(group.sub_pair_count(), 3);
        assert_eq!(group.constraint_group().members().len(), 3);
        assert!(group.sub_pairs().all(|(_, child)| child.is_solver_attached()));
        assert_eq!(group.contact_count(), 12);
    }
    assert_eq!(world.solver.added, vec![group_item]);
    assert_eq!(listener.count("initial_collision_detected"), 1);

    // Slide off the +x edge; children leave one at a time.
    let ground_bounds = world.set[ground].shape.compute_bounds(&world.set[ground].pose);
    let mut previous = 3;
    while world.broad_phase.pair(ground, body).is_some() {
        world.set.get_mut(body).unwrap().pose.position.x += 0.25;
        world.step();
        let Some(pair) = world.broad_phase.pair(ground, body) else {
            break;
        };
        let group = world.narrow_phase.pair(pair).unwrap().as_group().unwrap();
        for (key, _) in group.sub_pairs() {
            let child_bounds = key.a.resolve(&world.set).bounds();
            assert!(BoundingBox::intersects(&child_bounds, &ground_bounds));
        }
        let count = group.sub_pair_count();
        assert!(count <= previous && previous - count <= 1);
        assert_eq!(group.constraint_group().members().len(), count);
        if count > 0 {
            assert!(world.solver.removed.is_empty());
        }
        previous = count;
    }

    assert_eq!(world.solver.added, vec![group_item]);
    assert_eq!(world.solver.removed, vec![group_item]);
    assert!(world.solver.attached.is_empty());
    assert_eq!(listener.count("collision_ended"), 1);
    assert_eq!(listener.count("pair_removed"), 1);
    assert_eq!(listener.count("contact_created"), listener.count("contact_removed"));
}

#[test]
fn fast_sphere_does_not_tunnel_through_thin_box() {
    let mut world = World::new();
    let slab = world.set.add(Collidable::new(BoxShape::new(4.0, 0.1, 4.0), RigidPose::IDENTITY));
    let sphere = world.set.add(
        Collidable::new(Sphere::new(0.5), RigidPose::from_position(Vec3::new(0.0, 0.9, 0.0)))
            .with_velocity(BodyVelocity::linear(Vec3::new(0.0, -50.0, 0.0)))
            .with_continuity(ContinuousDetectionMode::Continuous),
    );
    world.set.get_mut(slab).unwrap().is_active = false;
    // A continuous broad phase would report the swept bounds overlap.
    let pair = world
        .narrow_phase
        .overlap_created(&world.set, sphere, slab, CollisionRule::Normal)
        .unwrap()
        .unwrap();

    let time_of_impact = world.narrow_phase.update_time_of_impact(&world.set, sphere, DT).unwrap();
    assert!(time_of_impact > 0.0 && time_of_impact < 1.0);
    assert_eq!(world.narrow_phase.pair(pair).unwrap().time_of_impact(), time_of_impact);

    // The swept sphere stops short of passing through: its core stays above the slab's top face.
    let velocity = world.set[sphere].velocity.linear;
    let swept = world.set[sphere].pose.position + velocity * DT * time_of_impact;
    let core_radius = 0.5 * world.narrow_phase.settings().core_shape_scaling;
    assert!(swept.y - 0.05 >= core_radius - 1e-3);

    assert_eq!(world.narrow_phase.continuous_update(&world.set, DT), vec![(sphere, time_of_impact)]);

    // Discrete movers are not swept.
    world.set.get_mut(sphere).unwrap().continuity = ContinuousDetectionMode::Discrete;
    assert_eq!(world.narrow_phase.update_time_of_impact(&world.set, sphere, DT), Ok(1.0));
}

fn row_of_boxes(heights: [f32; 3]) -> Compound {
    Compound::new(
        [-2.0, 0.0, 2.0]
            .into_iter()
            .zip(heights)
            .map(|(x, y)| CompoundChild::new(BoxShape::new(1.0, 1.0, 1.0), RigidPose::from_position(Vec3::new(x, y, 0.0))))
            .collect(),
    )
}

#[test]
fn fast_box_does_not_tunnel_through_thin_mesh() {
    let mut world = World::new();
    let ground = world.add_ground_mesh(1.0, 0.0);
    let body = world.set.add(
        Collidable::new(BoxShape::new(1.0, 1.0, 1.0), RigidPose::from_position(Vec3::new(0.3, 0.9, -0.3)))
            .with_velocity(BodyVelocity::linear(Vec3::new(0.0, -120.0, 0.0)))
            .with_continuity(ContinuousDetectionMode::Continuous),
    );
    let pair = world
        .narrow_phase
        .overlap_created(&world.set, body, ground, CollisionRule::Normal)
        .unwrap()
        .unwrap();

    // The box ends the step 1.1 below the surface, so only the swept query finds the triangles.
    world.narrow_phase.update(&world.set, DT);
    assert_eq!(world.narrow_phase.pair(pair).unwrap().as_group().unwrap().sub_pair_count(), 2);

    let time_of_impact = world.narrow_phase.update_time_of_impact(&world.set, body, DT).unwrap();
    // Core sphere of radius 0.4 starting 0.9 above the surface, moving 2 units this step.
    assert_relative_eq!(time_of_impact, 0.25, epsilon = 1e-2);
    let group = world.narrow_phase.pair(pair).unwrap();
    assert_eq!(group.time_of_impact(), time_of_impact);
    // The core passes 0.42 from the far triangle and never reaches it.
    let mut children: Vec<f32> = group.as_group().unwrap().sub_pairs().map(|(_, child)| child.time_of_impact()).collect();
    children.sort_by(f32::total_cmp);
    assert_eq!(children, vec![time_of_impact, 1.0]);
}

#[test]
fn group_time_of_impact_is_the_earliest_child() {
    let mut world = World::new();
    let ground = world.add_ground();
    // The middle child hangs half a unit below the others.
    let body = world.set.add(
        Collidable::new(row_of_boxes([0.0, -0.5, 0.0]), RigidPose::from_position(Vec3::new(0.0, 2.0, 0.0)))
            .with_velocity(BodyVelocity::linear(Vec3::new(0.0, -120.0, 0.0)))
            .with_continuity(ContinuousDetectionMode::Continuous),
    );
    let pair = world
        .narrow_phase
        .overlap_created(&world.set, body, ground, CollisionRule::Normal)
        .unwrap()
        .unwrap();
    world.narrow_phase.update(&world.set, DT);
    let time_of_impact = world.narrow_phase.update_time_of_impact(&world.set, body, DT).unwrap();

    let group = world.narrow_phase.pair(pair).unwrap().as_group().unwrap();
    assert_eq!(group.sub_pair_count(), 3);
    let mut children: Vec<f32> = group.sub_pairs().map(|(_, child)| child.time_of_impact()).collect();
    children.sort_by(f32::total_cmp);
    // Each core sphere of radius 0.4 closes on the top face at y = 0.5 at 2 units per step.
    assert_relative_eq!(children[0], 0.3, epsilon = 1e-2);
    assert_relative_eq!(children[1], 0.55, epsilon = 1e-2);
    assert_relative_eq!(children[2], 0.55, epsilon = 1e-2);
    assert_eq!(time_of_impact, children[0]);
    assert_eq!(world.narrow_phase.pair(pair).unwrap().time_of_impact(), children[0]);
}

#[test]
fn compound_on_ground_mesh_pairs_through_nested_groups() {
    let mut world = World::new();
    let ground = world.add_ground_mesh(10.0, 0.0);
    let body = world.set.add(Collidable::new(
        row_of_boxes([0.0; 3]),
        RigidPose::from_position(Vec3::new(0.0, 0.5, 0.0)),
    ));
    world.step();

    let pair = world.broad_phase.pair(ground, body).unwrap();
    let group_item = world.narrow_phase.pair(pair).unwrap().solver_updateable();
    {
        let group = world.narrow_phase.pair(pair).unwrap().as_group().unwrap();
        assert_eq!(group.sub_pair_count(), 3);
        for (_, child) in group.sub_pairs() {
            let nested = child.as_group().unwrap();
            // Both triangles' bounds cover the whole square.
            assert_eq!(nested.sub_pair_count(), 2);
            assert_eq!(nested.contact_count(), 8);
            assert!(child.is_solver_attached());
        }
        assert_eq!(group.constraint_group().members().len(), 3);
        assert_eq!(group.contact_count(), 24);
    }
    assert_eq!(world.solver.attached, vec![group_item]);

    // Slide until only the first child still overlaps the mesh.
    world.set.get_mut(body).unwrap().pose.position.x = 11.5;
    world.step();
    {
        let group = world.narrow_phase.pair(pair).unwrap().as_group().unwrap();
        assert_eq!(group.sub_pair_count(), 1);
        assert_eq!(group.contact_count(), 8);
    }
    assert_eq!(world.solver.attached, vec![group_item]);
    assert!(world.solver.removed.is_empty());

    // Lift clear of the mesh; every handler returns to its pool.
    world.set.get_mut(body).unwrap().pose.position.y = 5.0;
    world.step();
    assert!(world.broad_phase.pair(ground, body).is_none());
    assert_eq!(world.solver.removed, vec![group_item]);
    assert!(world.solver.attached.is_empty());
    let factories = world.narrow_phase.factories();
    assert_eq!(factories.pooled_count(), factories.created_count());
}

#[test]
fn material_changes_reblend_without_touching_contacts() {
    let mut world = World::new();
    let body = world.set.add(Collidable::new(
        BoxShape::new(1.0, 1.0, 1.0),
        RigidPose::from_position(Vec3::new(0.0, 1.0, 0.0)),
    ));
    let ground = world.add_ground();
    world.step();
    let pair = world.broad_phase.pair(body, ground).unwrap();
    assert_eq!(world.narrow_phase.contact_count(pair), Ok(4));

    let material = Material::new(0.3, 0.5);
    world.set.get_mut(body).unwrap().material = material;
    world.set.get_mut(ground).unwrap().material = material;
    world.narrow_phase.update_material_properties(&world.set, pair).unwrap();

    let constraint = world.narrow_phase.pair(pair).unwrap().as_standard().unwrap().constraint();
    assert_relative_eq!(constraint.material.friction_coefficient, 0.3);
    assert_relative_eq!(constraint.material.bounciness, 0.5);
    assert_eq!(constraint.contact_count(), 4);
    assert_eq!(world.solver.attached.len(), 1);
}
