use std::fmt;
use std::sync::Arc;

use crate::physics::body_properties::{BodyVelocity, RigidPose};
use crate::physics::collision_detection::broad_phase_overlap::CollisionRule;
use crate::physics::collision_detection::narrow_phase_callbacks::{ICollisionEventListener, Material};
use crate::physics::collision_detection::pair_cache::CollidablePair;
use crate::utilities::spin_lock::SpinLock;

use super::shape::Shape;

/// Defines how a collidable will handle collision detection in the presence of velocity.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContinuousDetectionMode {
    /// No time of impact is computed. Pairs involving the collidable are only tested at the end of the step.
    #[default]
    Discrete = 0,
    /// The collidable does not request time of impact calculations itself, but it is treated as a
    /// solid target by continuous collidables sweeping into it.
    Passive = 1,
    /// Pairs involving the collidable compute a time of impact from the collidable's velocity so the
    /// integrator can avoid tunneling through thin objects.
    Continuous = 2,
}

impl ContinuousDetectionMode {
    #[inline(always)]
    pub fn is_continuous(self) -> bool {
        self == ContinuousDetectionMode::Continuous
    }
}

/// Collision-relevant state of an object registered with the narrow phase.
pub struct Collidable {
    /// Shape of the collidable.
    pub shape: Arc<Shape>,
    /// World pose of the collidable.
    pub pose: RigidPose,
    /// Velocity of the collidable's owner at the pose position.
    pub velocity: BodyVelocity,
    /// Material used to compute blended friction and bounciness for pairs.
    pub material: Material,
    /// Continuous collision detection mode.
    pub continuity: ContinuousDetectionMode,
    /// Personal collision rule. Combined with the other side and the overlap's rule by taking the most restrictive.
    pub collision_rule: CollisionRule,
    /// Whether the collidable's owner is awake and moving. Time of impact is only computed for pairs with an active side.
    pub is_active: bool,
    /// Receives contact and pair lifecycle events involving this collidable.
    pub events: Option<Arc<dyn ICollisionEventListener>>,
    pairs: SpinLock<Vec<CollidablePair>>,
}

impl Collidable {
    /// Creates an active, discrete collidable at the given pose.
    pub fn new(shape: impl Into<Shape>, pose: RigidPose) -> Self {
        Self::from_shared(Arc::new(shape.into()), pose)
    }

    /// Creates an active, discrete collidable that shares its shape with other collidables.
    pub fn from_shared(shape: Arc<Shape>, pose: RigidPose) -> Self {
        Self {
            shape,
            pose,
            velocity: BodyVelocity::default(),
            material: Material::default(),
            continuity: ContinuousDetectionMode::Discrete,
            collision_rule: CollisionRule::Normal,
            is_active: true,
            events: None,
            pairs: SpinLock::new(Vec::new()),
        }
    }

    pub fn with_velocity(mut self, velocity: BodyVelocity) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_continuity(mut self, continuity: ContinuousDetectionMode) -> Self {
        self.continuity = continuity;
        self
    }

    pub fn with_collision_rule(mut self, rule: CollisionRule) -> Self {
        self.collision_rule = rule;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn ICollisionEventListener>) -> Self {
        self.events = Some(events);
        self
    }

    /// Records a top-level pair involving this collidable. Safe to call from worker threads.
    pub(crate) fn register_pair(&self, pair: CollidablePair) {
        let mut pairs = self.pairs.lock();
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }

    /// Forgets a top-level pair involving this collidable.
    pub(crate) fn unregister_pair(&self, pair: &CollidablePair) {
        let mut pairs = self.pairs.lock();
        if let Some(index) = pairs.iter().position(|p| p == pair) {
            pairs.swap_remove(index);
        }
    }

    /// Gets a snapshot of the top-level pairs this collidable currently participates in.
    pub fn pairs(&self) -> Vec<CollidablePair> {
        self.pairs.lock().clone()
    }
}

impl fmt::Debug for Collidable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collidable")
            .field("shape", &self.shape.kind())
            .field("pose", &self.pose)
            .field("velocity", &self.velocity)
            .field("material", &self.material)
            .field("continuity", &self.continuity)
            .field("collision_rule", &self.collision_rule)
            .field("is_active", &self.is_active)
            .field("has_events", &self.events.is_some())
            .finish()
    }
}
