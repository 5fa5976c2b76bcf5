#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use glam::Vec3;
use rust_bepuphysics_narrowphase::physics::collision_detection::contact_manifold::reconcile_contacts;
use rust_bepuphysics_narrowphase::utilities::BoundingBox;
use rust_bepuphysics_narrowphase::{
    CollidableHandle, CollidableReference, CollidableSet, CollisionRule, ConstraintHandle, Contact,
    ICollisionEventListener, IContactManifold, IContactManifoldFactory, ISolver, ManifoldChanges, NarrowPhase,
    PairHandle, PairHandlerFactories, ResolvedCollidable, ShapeKind,
};

/// Largest vertical gap at which stacked boxes still report contacts.
pub const CONTACT_MARGIN: f32 = 0.01;

/// Contact generation for axis aligned stacks: when one side rests on top of the other, the
/// corners of their horizontal overlap become contacts on the lower side's top face.
#[derive(Default)]
pub struct AabbManifold {
    contacts: Vec<Contact>,
}

impl AabbManifold {
    pub fn factory() -> Arc<dyn IContactManifoldFactory> {
        Arc::new(|| -> Box<dyn IContactManifold> { Box::new(AabbManifold::default()) })
    }
}

impl IContactManifold for AabbManifold {
    fn initialize(&mut self, _a: &ResolvedCollidable, _b: &ResolvedCollidable) {
        self.contacts.clear();
    }

    fn update(&mut self, a: &ResolvedCollidable, b: &ResolvedCollidable, _dt: f32, changes: &mut ManifoldChanges) {
        let (bounds_a, bounds_b) = (a.bounds(), b.bounds());
        let a_on_top = a.pose.position.y >= b.pose.position.y;
        let (top, bottom) = if a_on_top { (bounds_a, bounds_b) } else { (bounds_b, bounds_a) };
        let min = top.min.max(bottom.min);
        let max = top.max.min(bottom.max);
        let gap = top.min.y - bottom.max.y;
        let mut candidates = Vec::new();
        if min.x <= max.x && min.z <= max.z && gap <= CONTACT_MARGIN {
            let normal = if a_on_top { Vec3::Y } else { -Vec3::Y };
            let y = bottom.max.y;
            for (id, (x, z)) in [(min.x, min.z), (max.x, min.z), (max.x, max.z), (min.x, max.z)]
                .into_iter()
                .enumerate()
            {
                candidates.push(Contact::new(Vec3::new(x, y, z), normal, -gap, id as i32));
            }
        }
        reconcile_contacts(&mut self.contacts, &candidates, changes);
    }

    fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    fn clean_up(&mut self) {
        self.contacts.clear();
    }
}

/// Box, sphere and triangle pairs on the stacking manifold, plus compound and mesh groups.
pub fn factories() -> PairHandlerFactories {
    let mut factories = PairHandlerFactories::new();
    for (a, b) in [
        (ShapeKind::Box, ShapeKind::Box),
        (ShapeKind::Box, ShapeKind::Sphere),
        (ShapeKind::Sphere, ShapeKind::Sphere),
    ] {
        factories.register_convex_pair(a, b, AabbManifold::factory()).unwrap();
    }
    factories
        .register_triangle_pair(ShapeKind::Box, AabbManifold::factory())
        .unwrap();
    factories.register_composite_pairs();
    factories
}

/// Brute force broad phase reporting overlaps of expanded collidable bounds.
#[derive(Default)]
pub struct BruteForceBroadPhase {
    overlaps: BTreeMap<(CollidableHandle, CollidableHandle), PairHandle>,
}

impl BruteForceBroadPhase {
    pub fn update(&mut self, set: &CollidableSet, narrow_phase: &mut NarrowPhase) {
        let bounds: Vec<(CollidableHandle, BoundingBox)> = set
            .iter()
            .map(|(handle, collidable)| {
                (handle, collidable.shape.compute_bounds(&collidable.pose).expanded(CONTACT_MARGIN))
            })
            .collect();
        let mut current = BTreeMap::new();
        for (i, (a, bounds_a)) in bounds.iter().enumerate() {
            for (b, bounds_b) in &bounds[i + 1..] {
                if BoundingBox::intersects(bounds_a, bounds_b) {
                    current.insert((*a, *b), ());
                }
            }
        }
        let stale: Vec<_> = self
            .overlaps
            .keys()
            .filter(|key| !current.contains_key(*key))
            .copied()
            .collect();
        for key in stale {
            if let Some(handle) = self.overlaps.remove(&key) {
                narrow_phase.overlap_removed(set, handle).unwrap();
            }
        }
        for (a, b) in current.into_keys() {
            if self.overlaps.contains_key(&(a, b)) {
                continue;
            }
            if let Some(handle) = narrow_phase.overlap_created(set, a, b, CollisionRule::Normal).unwrap() {
                self.overlaps.insert((a, b), handle);
            }
        }
    }

    pub fn pair(&self, a: CollidableHandle, b: CollidableHandle) -> Option<PairHandle> {
        let key = if a < b { (a, b) } else { (b, a) };
        self.overlaps.get(&key).copied()
    }
}

/// Solver recording attach and detach calls, rejecting redundant ones.
#[derive(Debug, Default)]
pub struct RecordingSolver {
    pub attached: Vec<ConstraintHandle>,
    pub added: Vec<ConstraintHandle>,
    pub removed: Vec<ConstraintHandle>,
}

impl ISolver for RecordingSolver {
    fn add_solver_updateable(&mut self, item: ConstraintHandle) {
        assert!(!self.attached.contains(&item), "{item} attached twice");
        self.attached.push(item);
        self.added.push(item);
    }

    fn remove_solver_updateable(&mut self, item: ConstraintHandle) {
        let index = self
            .attached
            .iter()
            .position(|attached| *attached == item)
            .unwrap_or_else(|| panic!("{item} detached while not attached"));
        self.attached.remove(index);
        self.removed.push(item);
    }
}

/// Listener counting notifications by name.
#[derive(Debug, Default)]
pub struct CountingListener {
    events: Mutex<Vec<&'static str>>,
}

impl CountingListener {
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|event| **event == name).count()
    }

    fn record(&self, name: &'static str) {
        self.events.lock().unwrap().push(name);
    }
}

impl ICollisionEventListener for CountingListener {
    fn on_pair_created(&self, _sender: &CollidableReference, _other: &CollidableReference) {
        self.record("pair_created");
    }

    fn on_contact_created(&self, _sender: &CollidableReference, _other: &CollidableReference, _contact: &Contact) {
        self.record("contact_created");
    }

    fn on_contact_removed(&self, _sender: &CollidableReference, _other: &CollidableReference, _contact: &Contact) {
        self.record("contact_removed");
    }

    fn on_initial_collision_detected(&self, _sender: &CollidableReference, _other: &CollidableReference) {
        self.record("initial_collision_detected");
    }

    fn on_collision_ended(&self, _sender: &CollidableReference, _other: &CollidableReference) {
        self.record("collision_ended");
    }

    fn on_pair_removed(&self, _sender: &CollidableReference, _other: &CollidableReference) {
        self.record("pair_removed");
    }
}
