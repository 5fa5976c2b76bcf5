use super::broad_phase_overlap::CollisionRule;
use super::narrow_phase_callbacks::MaterialBlender;

/// Tuning values shared by every pair handler of a narrow phase.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionDetectionSettings {
    /// Fraction of a shape's minimum radius used as the swept core sphere during time of impact estimation.
    /// Motion shorter than the core radius cannot tunnel and skips the sweep.
    pub core_shape_scaling: f32,
    /// Maximum number of conservative advancement steps taken by a sphere cast.
    pub sweep_maximum_iterations: u32,
    /// Distance at which a sphere cast considers the sphere to be touching the target.
    pub sweep_convergence_epsilon: f32,
    /// Maximum number of iterations of the point distance query used by sphere casts.
    pub gjk_maximum_iterations: u32,
    /// Baseline rule combined into every new pair's rule.
    pub default_collision_rule: CollisionRule,
    /// How the two sides' materials combine.
    pub material_blender: MaterialBlender,
}

impl Default for CollisionDetectionSettings {
    fn default() -> Self {
        Self {
            core_shape_scaling: 0.8,
            sweep_maximum_iterations: 32,
            sweep_convergence_epsilon: 1e-4,
            gjk_maximum_iterations: 64,
            default_collision_rule: CollisionRule::Normal,
            material_blender: MaterialBlender::Average,
        }
    }
}
