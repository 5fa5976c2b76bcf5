use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

use log::debug;

use crate::physics::collidables::shape::ShapeKind;
use crate::physics::handles::ConstraintHandle;
use crate::utilities::spin_lock::SpinLock;

use super::contact_manifold::{IContactManifold, IContactManifoldFactory};
use super::error::NarrowPhaseError;
use super::pair_handlers::{
    GroupKind, GroupPairHandler, LeafKind, PairHandler, PairHandlerState, StandardPairHandler,
};

/// Index of a factory within a [`PairHandlerFactories`] registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactoryId(pub(crate) usize);

impl FactoryId {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0
    }
}

/// The handler variant a factory produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairHandlerKind {
    Convex,
    TriangleConvex,
    CompoundGroup,
    MeshGroup,
}

/// Produces and recycles pair handlers of one variant.
pub struct PairHandlerFactory {
    id: FactoryId,
    kind: PairHandlerKind,
    manifolds: Option<Arc<dyn IContactManifoldFactory>>,
    pool: SpinLock<Vec<Box<PairHandler>>>,
    created: AtomicUsize,
    constraint_ids: Arc<AtomicI32>,
}

impl PairHandlerFactory {
    #[inline(always)]
    pub fn id(&self) -> FactoryId {
        self.id
    }

    #[inline(always)]
    pub fn kind(&self) -> PairHandlerKind {
        self.kind
    }

    /// Number of handlers this factory has ever constructed.
    #[inline]
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Number of handlers currently waiting in the pool.
    #[inline]
    pub fn pooled_count(&self) -> usize {
        self.pool.lock().len()
    }

    /// Takes a pooled handler, or constructs a new one if the pool is empty.
    /// Safe to call from multiple threads.
    pub fn acquire(&self) -> Box<PairHandler> {
        if let Some(handler) = self.pool.lock().pop() {
            return handler;
        }
        self.created.fetch_add(1, Ordering::Relaxed);
        let handle = ConstraintHandle(self.constraint_ids.fetch_add(1, Ordering::Relaxed));
        Box::new(match self.kind {
            PairHandlerKind::Convex => PairHandler::Standard(StandardPairHandler::new(
                self.id,
                LeafKind::Convex,
                self.create_manifold(),
                handle,
            )),
            PairHandlerKind::TriangleConvex => PairHandler::Standard(StandardPairHandler::new(
                self.id,
                LeafKind::TriangleConvex,
                self.create_manifold(),
                handle,
            )),
            PairHandlerKind::CompoundGroup => {
                PairHandler::Group(GroupPairHandler::new(self.id, GroupKind::Compound, handle))
            }
            PairHandlerKind::MeshGroup => PairHandler::Group(GroupPairHandler::new(self.id, GroupKind::Mesh, handle)),
        })
    }

    /// Returns a cleaned up handler to the pool.
    ///
    /// # Panics
    /// Panics if the handler is still bound or belongs to another factory.
    pub fn release(&self, mut handler: Box<PairHandler>) {
        assert_eq!(
            handler.state(),
            PairHandlerState::CleanedUp,
            "pair handlers must be cleaned up before they are released"
        );
        assert_eq!(handler.factory_id(), self.id, "pair handler released to the wrong factory");
        handler.reset();
        self.pool.lock().push(handler);
    }

    fn create_manifold(&self) -> Box<dyn IContactManifold> {
        match &self.manifolds {
            Some(manifolds) => manifolds.create(),
            None => panic!("{:?} factory has no contact manifold factory", self.kind),
        }
    }
}

impl std::fmt::Debug for PairHandlerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairHandlerFactory")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("created", &self.created_count())
            .finish()
    }
}

/// Registry mapping unordered shape kind pairs to pair handler factories.
///
/// Factories are registered up front; lookups and pool traffic afterwards only need shared access.
pub struct PairHandlerFactories {
    factories: Vec<PairHandlerFactory>,
    table: HashMap<(ShapeKind, ShapeKind), FactoryId>,
    constraint_ids: Arc<AtomicI32>,
}

impl Default for PairHandlerFactories {
    fn default() -> Self {
        Self::new()
    }
}

impl PairHandlerFactories {
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
            table: HashMap::new(),
            constraint_ids: Arc::new(AtomicI32::new(0)),
        }
    }

    fn add_factory(
        &mut self,
        kind: PairHandlerKind,
        manifolds: Option<Arc<dyn IContactManifoldFactory>>,
    ) -> FactoryId {
        let id = FactoryId(self.factories.len());
        self.factories.push(PairHandlerFactory {
            id,
            kind,
            manifolds,
            pool: SpinLock::new(Vec::new()),
            created: AtomicUsize::new(0),
            constraint_ids: self.constraint_ids.clone(),
        });
        id
    }

    fn map(&mut self, a: ShapeKind, b: ShapeKind, id: FactoryId) -> Result<(), NarrowPhaseError> {
        if self.table.contains_key(&(a, b)) {
            return Err(NarrowPhaseError::DuplicateFactory(a, b));
        }
        self.table.insert((a, b), id);
        self.table.insert((b, a), id);
        debug!("mapped {a:?} against {b:?} to {:?} factory {}", self.factories[id.0].kind, id.0);
        Ok(())
    }

    /// Registers a contact manifold factory for a pair of convex kinds.
    pub fn register_convex_pair(
        &mut self,
        a: ShapeKind,
        b: ShapeKind,
        manifolds: Arc<dyn IContactManifoldFactory>,
    ) -> Result<FactoryId, NarrowPhaseError> {
        assert!(a.is_convex() && b.is_convex(), "convex pairs need two convex kinds");
        assert!(
            a != ShapeKind::Triangle && b != ShapeKind::Triangle,
            "triangle pairs are registered with register_triangle_pair"
        );
        if self.table.contains_key(&(a, b)) {
            return Err(NarrowPhaseError::DuplicateFactory(a, b));
        }
        let id = self.add_factory(PairHandlerKind::Convex, Some(manifolds));
        self.map(a, b, id)?;
        Ok(id)
    }

    /// Registers a contact manifold factory for triangles, standalone or from meshes, against a convex kind.
    pub fn register_triangle_pair(
        &mut self,
        convex: ShapeKind,
        manifolds: Arc<dyn IContactManifoldFactory>,
    ) -> Result<FactoryId, NarrowPhaseError> {
        assert!(convex.is_convex(), "triangles pair with convex kinds");
        if self.table.contains_key(&(ShapeKind::Triangle, convex)) {
            return Err(NarrowPhaseError::DuplicateFactory(ShapeKind::Triangle, convex));
        }
        let id = self.add_factory(PairHandlerKind::TriangleConvex, Some(manifolds));
        self.map(ShapeKind::Triangle, convex, id)?;
        Ok(id)
    }

    /// Maps every pair involving a compound or a mesh to the matching group factory.
    ///
    /// Compounds take precedence, so a compound against a mesh decomposes the compound first.
    /// Mesh against mesh stays unmapped. Pairs that are already mapped are left alone.
    pub fn register_composite_pairs(&mut self) {
        let compound = self.add_factory(PairHandlerKind::CompoundGroup, None);
        let mesh = self.add_factory(PairHandlerKind::MeshGroup, None);
        for other in ShapeKind::ALL {
            if !self.table.contains_key(&(ShapeKind::Compound, other)) {
                let _ = self.map(ShapeKind::Compound, other, compound);
            }
        }
        for mesh_kind in [ShapeKind::Mesh, ShapeKind::InstancedMesh] {
            for other in ShapeKind::ALL {
                if other.is_mesh() || self.table.contains_key(&(mesh_kind, other)) {
                    continue;
                }
                let _ = self.map(mesh_kind, other, mesh);
            }
        }
    }

    /// Finds the factory for a pair of kinds in either order.
    pub fn lookup(&self, a: ShapeKind, b: ShapeKind) -> Result<FactoryId, NarrowPhaseError> {
        self.table
            .get(&(a, b))
            .copied()
            .ok_or(NarrowPhaseError::UnmappedPair(a, b))
    }

    #[inline]
    pub fn get(&self, id: FactoryId) -> &PairHandlerFactory {
        &self.factories[id.0]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PairHandlerFactory> {
        self.factories.iter()
    }

    /// Acquires a handler for a pair of kinds from the matching factory's pool.
    pub fn acquire(&self, a: ShapeKind, b: ShapeKind) -> Result<Box<PairHandler>, NarrowPhaseError> {
        let id = self.lookup(a, b)?;
        Ok(self.get(id).acquire())
    }

    /// Returns a cleaned up handler to the pool of the factory that created it.
    ///
    /// # Panics
    /// Panics if the handler has not been cleaned up.
    pub fn release(&self, handler: Box<PairHandler>) {
        self.get(handler.factory_id()).release(handler);
    }

    /// Total handlers constructed across every factory.
    pub fn created_count(&self) -> usize {
        self.factories.iter().map(PairHandlerFactory::created_count).sum()
    }

    /// Total handlers waiting in pools across every factory.
    pub fn pooled_count(&self) -> usize {
        self.factories.iter().map(PairHandlerFactory::pooled_count).sum()
    }
}

impl std::fmt::Debug for PairHandlerFactories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairHandlerFactories")
            .field("factories", &self.factories)
            .field("mapped_pairs", &self.table.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scripted_manifolds;

    fn registry() -> PairHandlerFactories {
        let mut factories = PairHandlerFactories::new();
        factories
            .register_convex_pair(ShapeKind::Box, ShapeKind::Sphere, scripted_manifolds(|_, _| 1))
            .unwrap();
        factories
            .register_triangle_pair(ShapeKind::Sphere, scripted_manifolds(|_, _| 1))
            .unwrap();
        factories.register_composite_pairs();
        factories
    }

    #[test]
    fn test_lookup_is_symmetric() {
        let factories = registry();
        assert_eq!(
            factories.lookup(ShapeKind::Box, ShapeKind::Sphere),
            factories.lookup(ShapeKind::Sphere, ShapeKind::Box)
        );
        assert_eq!(
            factories.lookup(ShapeKind::Sphere, ShapeKind::Sphere),
            Err(NarrowPhaseError::UnmappedPair(ShapeKind::Sphere, ShapeKind::Sphere))
        );
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut factories = registry();
        assert_eq!(
            factories.register_convex_pair(ShapeKind::Sphere, ShapeKind::Box, scripted_manifolds(|_, _| 0)),
            Err(NarrowPhaseError::DuplicateFactory(ShapeKind::Sphere, ShapeKind::Box))
        );
    }

    #[test]
    fn test_composite_precedence() {
        let factories = registry();
        let compound_mesh = factories.lookup(ShapeKind::Compound, ShapeKind::Mesh).unwrap();
        assert_eq!(factories.get(compound_mesh).kind(), PairHandlerKind::CompoundGroup);
        let mesh_sphere = factories.lookup(ShapeKind::Sphere, ShapeKind::InstancedMesh).unwrap();
        assert_eq!(factories.get(mesh_sphere).kind(), PairHandlerKind::MeshGroup);
        assert!(factories.lookup(ShapeKind::Mesh, ShapeKind::InstancedMesh).is_err());
        // Explicit registrations are kept.
        let box_sphere = factories.lookup(ShapeKind::Box, ShapeKind::Sphere).unwrap();
        assert_eq!(factories.get(box_sphere).kind(), PairHandlerKind::Convex);
    }

    #[test]
    fn test_fresh_handlers_get_distinct_constraint_handles() {
        let factories = registry();
        let a = factories.acquire(ShapeKind::Box, ShapeKind::Sphere).unwrap();
        let b = factories.acquire(ShapeKind::Compound, ShapeKind::Box).unwrap();
        let c = factories.acquire(ShapeKind::Triangle, ShapeKind::Sphere).unwrap();
        assert_ne!(a.solver_updateable(), b.solver_updateable());
        assert_ne!(b.solver_updateable(), c.solver_updateable());
        assert_eq!(a.state(), PairHandlerState::Pooled);
        assert!(b.as_group().is_some());
        assert_eq!(factories.created_count(), 3);
    }

    #[test]
    fn test_concurrent_acquire_and_release_recycle_handlers() {
        use crate::physics::body_properties::RigidPose;
        use crate::physics::collidables::box_shape::BoxShape;
        use crate::physics::collidables::collidable::Collidable;
        use crate::physics::collidables::collidable_reference::CollidableReference;
        use crate::physics::collidables::collidable_set::CollidableSet;
        use crate::physics::collidables::sphere::Sphere;
        use crate::physics::collision_detection::broad_phase_overlap::{BroadPhaseOverlap, CollisionRule};
        use crate::physics::collision_detection::pair_handlers::{PairContext, PendingSolverChanges};
        use crate::physics::collision_detection::settings::CollisionDetectionSettings;

        const THREADS: usize = 8;
        const HELD: usize = 4;

        let factories = registry();
        let settings = CollisionDetectionSettings::default();
        let mut set = CollidableSet::new();
        let sphere = set.add(Collidable::new(Sphere::new(0.5), RigidPose::IDENTITY));
        let cube = set.add(Collidable::new(BoxShape::new(1.0, 1.0, 1.0), RigidPose::IDENTITY));
        let ctx = PairContext::new(&set, &factories, &settings);

        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    let mut held = Vec::with_capacity(HELD);
                    for round in 0..200 {
                        let mut handler = factories.acquire(ShapeKind::Sphere, ShapeKind::Box).unwrap();
                        assert_eq!(handler.state(), PairHandlerState::Pooled);
                        let overlap = BroadPhaseOverlap::new(
                            CollidableReference::root(sphere),
                            CollidableReference::root(cube),
                            CollisionRule::Normal,
                        );
                        handler.initialize(overlap, None, ctx);
                        held.push(handler);
                        if held.len() == HELD || round % 3 == 0 {
                            for mut handler in held.drain(..) {
                                handler.clean_up(ctx, &mut PendingSolverChanges::default());
                                factories.release(handler);
                            }
                        }
                    }
                    for mut handler in held.drain(..) {
                        handler.clean_up(ctx, &mut PendingSolverChanges::default());
                        factories.release(handler);
                    }
                });
            }
        });

        assert!(set.get(sphere).unwrap().pairs().is_empty());
        let created = factories.created_count();
        assert!(created >= 1 && created <= THREADS * HELD);
        assert_eq!(factories.pooled_count(), created);

        // Every pooled handler kept its own constraint handle.
        let recycled: Vec<_> = (0..created)
            .map(|_| factories.acquire(ShapeKind::Box, ShapeKind::Sphere).unwrap())
            .collect();
        let mut items: Vec<_> = recycled.iter().map(|handler| handler.solver_updateable()).collect();
        items.sort();
        items.dedup();
        assert_eq!(items.len(), created);
        assert_eq!(factories.created_count(), created);
        assert_eq!(factories.pooled_count(), 0);
    }
}
