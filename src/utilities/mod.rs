pub mod bounding_box;
pub mod spin_lock;

pub use self::bounding_box::BoundingBox;
pub use self::spin_lock::{SpinLock, SpinLockGuard};
