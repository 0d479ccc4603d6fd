//! Cache statistics and the per-sweep summary

use std::fmt;

use crate::allocator::PoolStats;

/// Counters describing cache activity since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceCacheStats {
    /// Lookups served from the cache
    pub hits: u64,

    /// Lookups that constructed a new surface
    pub misses: u64,

    /// Completed garbage-collection sweeps
    pub sweeps: u64,

    /// Entries released by sweeps
    pub evictions: u64,

    /// Entries currently cached
    pub entries: usize,

    /// Current generation
    pub generation: u64,
}

impl SurfaceCacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Outcome of one sweep, logged once per sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepReport {
    /// Generation that ended with this sweep
    pub generation: u64,
    /// Entries evicted by this sweep
    pub removed: usize,
    /// Entries that survived
    pub retained: usize,
    /// Allocator stats after trimming the backlog
    pub pool: PoolStats,
}

impl SweepReport {
    /// Estimated megabytes held by the allocator, rounded to one decimal
    pub fn megabytes(&self) -> f64 {
        self.pool.megabytes()
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GC: Remove {:>4}, Remain {:>4} ({:>4} total) ({:>4} backlog) VRAM: {:>6.1} MB",
            self.removed,
            self.retained,
            self.pool.live_surface_count,
            self.pool.backlog_size,
            self.megabytes(),
        )
    }
}
