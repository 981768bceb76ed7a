//! Feature cache.
//!
//! - [`SpatialCache`] stores point features behind an R-tree for bounding-box queries
//! - [`CacheState`] adds the per-tile bookkeeping the scheduler needs
//!   (loaded, failed and in-flight tiles)

mod spatial;
mod state;

pub use spatial::{SpatialCache, DEFAULT_COLLISION_EPSILON};
pub use state::{CacheState, InflightRequest};
