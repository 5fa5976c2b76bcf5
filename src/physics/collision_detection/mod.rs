pub mod broad_phase_overlap;
pub mod contact_constraint;
pub mod contact_manifold;
pub mod error;
pub mod gjk_toolbox;
pub mod narrow_phase;
pub mod narrow_phase_callbacks;
pub mod pair_cache;
pub mod pair_handler_pool;
pub mod pair_handlers;
pub mod settings;
pub mod time_of_impact;
