use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use glam::Vec3;

use crate::physics::collidables::collidable_reference::{CollidableReference, ResolvedCollidable};
use crate::physics::collidables::shape::ShapeKind;
use crate::physics::collision_detection::contact_manifold::{
    reconcile_contacts, Contact, IContactManifold, IContactManifoldFactory, ManifoldChanges,
};
use crate::physics::collision_detection::narrow_phase_callbacks::ICollisionEventListener;
use crate::physics::collision_detection::pair_handler_pool::PairHandlerFactories;
use crate::physics::handles::ConstraintHandle;
use crate::physics::solver::ISolver;

type Script = Arc<dyn Fn(&ResolvedCollidable, &ResolvedCollidable) -> usize + Send + Sync>;

/// Manifold reporting however many contacts its script asks for, with ids `0..n`.
struct ScriptedManifold {
    script: Script,
    contacts: Vec<Contact>,
}

impl IContactManifold for ScriptedManifold {
    fn initialize(&mut self, _a: &ResolvedCollidable, _b: &ResolvedCollidable) {
        self.contacts.clear();
    }

    fn update(&mut self, a: &ResolvedCollidable, b: &ResolvedCollidable, _dt: f32, changes: &mut ManifoldChanges) {
        let count = (self.script)(a, b);
        let candidates: Vec<Contact> = (0..count)
            .map(|id| {
                let position = (a.pose.position + b.pose.position) * 0.5 + Vec3::X * id as f32;
                Contact::new(position, Vec3::Y, 0.01, id as i32)
            })
            .collect();
        reconcile_contacts(&mut self.contacts, &candidates, changes);
    }

    fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    fn clean_up(&mut self) {
        self.contacts.clear();
    }
}

pub(crate) fn scripted_manifolds<F>(script: F) -> Arc<dyn IContactManifoldFactory>
where
    F: Fn(&ResolvedCollidable, &ResolvedCollidable) -> usize + Send + Sync + 'static,
{
    let script: Script = Arc::new(script);
    Arc::new(move || -> Box<dyn IContactManifold> {
        Box::new(ScriptedManifold {
            script: script.clone(),
            contacts: Vec::new(),
        })
    })
}

/// Registers every convex and triangle pair of spheres and boxes with one script, plus the composite groups.
pub(crate) fn scripted_factories<F>(script: F) -> PairHandlerFactories
where
    F: Fn(&ResolvedCollidable, &ResolvedCollidable) -> usize + Send + Sync + 'static,
{
    let script: Script = Arc::new(script);
    let manifolds = {
        let script = script.clone();
        scripted_manifolds(move |a, b| script(a, b))
    };
    let mut factories = PairHandlerFactories::new();
    for (a, b) in [
        (ShapeKind::Sphere, ShapeKind::Sphere),
        (ShapeKind::Sphere, ShapeKind::Box),
        (ShapeKind::Box, ShapeKind::Box),
    ] {
        factories.register_convex_pair(a, b, manifolds.clone()).unwrap();
    }
    for convex in [ShapeKind::Sphere, ShapeKind::Box] {
        factories.register_triangle_pair(convex, manifolds.clone()).unwrap();
    }
    factories.register_composite_pairs();
    factories
}

/// Shared contact count a script can read, adjustable between ticks.
#[derive(Clone, Default)]
pub(crate) struct Dial(Arc<AtomicUsize>);

impl Dial {
    pub fn set(&self, value: usize) {
        self.0.store(value, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Solver recording every attach and detach, checking that neither is redundant.
#[derive(Debug, Default)]
pub(crate) struct RecordingSolver {
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

/// Listener recording notification names with their sender and other side.
#[derive(Debug, Default)]
pub(crate) struct RecordingListener {
    events: Mutex<Vec<(&'static str, CollidableReference, CollidableReference)>>,
}

impl RecordingListener {
    fn record(&self, name: &'static str, sender: &CollidableReference, other: &CollidableReference) {
        self.events.lock().unwrap().push((name, sender.clone(), other.clone()));
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|(event, _, _)| *event == name).count()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|(event, _, _)| *event).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl ICollisionEventListener for RecordingListener {
    fn on_pair_created(&self, sender: &CollidableReference, other: &CollidableReference) {
        self.record("pair_created", sender, other);
    }

    fn on_contact_created(&self, sender: &CollidableReference, other: &CollidableReference, _contact: &Contact) {
        self.record("contact_created", sender, other);
    }

    fn on_contact_removed(&self, sender: &CollidableReference, other: &CollidableReference, _contact: &Contact) {
        self.record("contact_removed", sender, other);
    }

    fn on_initial_collision_detected(&self, sender: &CollidableReference, other: &CollidableReference) {
        self.record("initial_collision_detected", sender, other);
    }

    fn on_collision_ended(&self, sender: &CollidableReference, other: &CollidableReference) {
        self.record("collision_ended", sender, other);
    }

    fn on_pair_updated(&self, sender: &CollidableReference, other: &CollidableReference) {
        self.record("pair_updated", sender, other);
    }

    fn on_pair_touching(&self, sender: &CollidableReference, other: &CollidableReference) {
        self.record("pair_touching", sender, other);
    }

    fn on_pair_removed(&self, sender: &CollidableReference, other: &CollidableReference) {
        self.record("pair_removed", sender, other);
    }
}
