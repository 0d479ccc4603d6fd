//! Surface Cache Library
//!
//! Two-level keyed cache for expensive-to-paint drawable surfaces with
//! generation-based garbage collection. Surfaces are built on demand by a
//! caller-supplied generator and released back to a [`SurfaceAllocator`]
//! once they go unused for a full sweep interval.

pub mod allocator;
pub mod clock;
pub mod config;
pub mod error;
pub mod maintainer;
pub mod report;

pub use allocator::{
    AllocOptions, AllocationError, HeapAllocator, PixelSurface, PoolStats, RasterContext,
    SurfaceAllocator,
};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ConfigError, SurfaceCacheConfig, GC_INTERVAL_SECONDS};
pub use error::{BoxError, SurfaceError};
pub use maintainer::SurfaceCache;
pub use report::{SurfaceCacheStats, SweepReport};
