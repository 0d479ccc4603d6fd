//! Two-level surface cache with generation-based garbage collection
//!
//! Surfaces are addressed by a primary key and a sub key. Every lookup tags
//! the entry with the current generation. A sweep runs at most once per
//! configured interval, evicts every entry that was not touched since the
//! previous sweep and then starts a new generation. An untouched entry thus
//! survives exactly one sweep after its last use.

use std::collections::HashMap;

use tracing::{debug, info, trace};

use crate::allocator::{AllocOptions, SurfaceAllocator};
use crate::clock::Clock;
use crate::config::SurfaceCacheConfig;
use crate::error::{BoxError, SurfaceError};
use crate::report::{SurfaceCacheStats, SweepReport};

/// A cached surface and the generation it was last used in
struct CachedSurface<S, C> {
    surface: S,
    context: C,
    last_used: u64,
}

type SubCache<S, C> = HashMap<String, CachedSurface<S, C>>;

/// Lazily built, periodically collected cache of drawable surfaces
///
/// Owned by the host session and driven from a single thread: rendering code
/// calls [`get`](Self::get) whenever it needs a surface and the frame loop
/// calls [`tick`](Self::tick) (or [`poll`](Self::poll)) once per frame.
/// Dropping the cache releases every surface it still holds.
///
/// # Example
///
/// ```
/// use surface_cache::{HeapAllocator, SurfaceCache};
///
/// let mut cache = SurfaceCache::new(HeapAllocator::new());
///
/// let surface = cache
///     .get("tileset", "0_0", 64, 64, 1.0, |surface, _ctx, _w, _h, _scale, color: &[u8; 4]| {
///         surface.fill(*color);
///         Ok::<_, std::convert::Infallible>(())
///     }, &[255, 0, 0, 255])
///     .unwrap();
/// assert_eq!(surface.width(), 64);
///
/// // Once per frame
/// cache.tick(0.016);
/// ```
pub struct SurfaceCache<A: SurfaceAllocator> {
    allocator: A,
    config: SurfaceCacheConfig,
    groups: HashMap<String, SubCache<A::Surface, A::Context>>,
    generation: u64,
    last_sweep: f64,
    stats: SurfaceCacheStats,
}

impl<A: SurfaceAllocator> SurfaceCache<A> {
    /// Create a cache with the default configuration
    pub fn new(allocator: A) -> Self {
        Self::with_config(allocator, SurfaceCacheConfig::default())
    }

    /// Create a cache with the given configuration
    pub fn with_config(allocator: A, config: SurfaceCacheConfig) -> Self {
        Self {
            allocator,
            config,
            groups: HashMap::new(),
            generation: 1,
            last_sweep: 0.0,
            stats: SurfaceCacheStats {
                generation: 1,
                ..Default::default()
            },
        }
    }

    /// Return the surface for `(key, sub_key)`, painting it first if absent
    ///
    /// On a hit the cached surface is returned as is; nothing about it is
    /// compared against `width`, `height` or `scale`, so `sub_key` must encode
    /// every parameter that affects appearance.
    ///
    /// On a miss a reusable surface of `round(width * scale) x round(height * scale)`
    /// pixels is allocated and `generator` is called once with the logical
    /// size, scale and `params` to paint it. The entry is only stored once the
    /// generator returns successfully; if it fails the fresh surface goes back
    /// to the allocator and the error is returned.
    ///
    /// `generator` must not call back into this cache for the same key pair.
    #[allow(clippy::too_many_arguments)]
    pub fn get<P, F, E>(
        &mut self,
        key: &str,
        sub_key: &str,
        width: u32,
        height: u32,
        scale: f32,
        generator: F,
        params: &P,
    ) -> Result<&A::Surface, SurfaceError>
    where
        P: ?Sized,
        F: FnOnce(&mut A::Surface, &mut A::Context, u32, u32, f32, &P) -> Result<(), E>,
        E: Into<BoxError>,
    {
        let generation = self.generation;
        let hit = match self.groups.get_mut(key).and_then(|group| group.get_mut(sub_key)) {
            Some(cached) => {
                cached.last_used = generation;
                true
            }
            None => false,
        };
        if hit {
            self.stats.hits += 1;
            return Ok(&self.groups[key][sub_key].surface);
        }

        self.stats.misses += 1;
        let pixel_width = scaled(width, scale);
        let pixel_height = scaled(height, scale);
        trace!(key, sub_key, pixel_width, pixel_height, "surface cache miss");

        let options = AllocOptions::reusable(format!(
            "{}{}/{}",
            self.config.label_prefix, key, sub_key
        ))
        .with_smooth(self.config.smooth);
        let (mut surface, mut context) =
            self.allocator.allocate(pixel_width, pixel_height, &options)?;

        let painted = generator(&mut surface, &mut context, width, height, scale, params);
        if let Err(err) = painted {
            debug!(key, sub_key, "surface generator failed, releasing surface");
            self.allocator.release(surface, context);
            return Err(SurfaceError::Generator(err.into()));
        }

        // Nothing touches the map until the surface is fully painted
        self.stats.entries += 1;
        let group = self.groups.entry(key.to_owned()).or_default();
        let cached = group.entry(sub_key.to_owned()).or_insert(CachedSurface {
            surface,
            context,
            last_used: generation,
        });
        Ok(&cached.surface)
    }

    /// Look up a surface without marking it used or constructing it
    pub fn peek(&self, key: &str, sub_key: &str) -> Option<&A::Surface> {
        self.groups
            .get(key)
            .and_then(|group| group.get(sub_key))
            .map(|cached| &cached.surface)
    }

    /// Check whether a surface is cached, without marking it used
    pub fn contains(&self, key: &str, sub_key: &str) -> bool {
        self.peek(key, sub_key).is_some()
    }

    /// Advance cache time, sweeping when more than the interval has elapsed
    ///
    /// `now` is a monotonic timestamp in seconds. Must be called more often
    /// than the sweep interval (e.g. once per frame); a late call delays the
    /// sweep but never skips it. Returns the report of the sweep, if one ran.
    pub fn tick(&mut self, now: f64) -> Option<SweepReport> {
        if now - self.last_sweep > self.config.gc_interval_secs {
            self.last_sweep = now;
            Some(self.collect())
        } else {
            None
        }
    }

    /// [`tick`](Self::tick) with the current reading of `clock`
    pub fn poll(&mut self, clock: &impl Clock) -> Option<SweepReport> {
        self.tick(clock.now())
    }

    /// Evict every entry not used during the current generation, then start the next one
    ///
    /// Surfaces the allocator reports as lost are evicted as well.
    pub fn collect(&mut self) -> SweepReport {
        let boundary = self.generation;
        let allocator = &mut self.allocator;
        let mut removed = 0;
        let mut retained = 0;

        for group in self.groups.values_mut() {
            let stale: Vec<String> = group
                .iter()
                .filter(|(_, cached)| {
                    cached.last_used < boundary || allocator.is_lost(&cached.surface)
                })
                .map(|(sub_key, _)| sub_key.clone())
                .collect();

            for sub_key in stale {
                if let Some(cached) = group.remove(&sub_key) {
                    allocator.release(cached.surface, cached.context);
                    removed += 1;
                }
            }
            retained += group.len();
        }

        if self.config.prune_empty_groups {
            self.groups.retain(|_, group| !group.is_empty());
        }

        allocator.trim_backlog();
        let report = SweepReport {
            generation: boundary,
            removed,
            retained,
            pool: allocator.report_stats(),
        };
        info!(
            target: "surface_cache::gc",
            generation = report.generation,
            removed = report.removed,
            retained = report.retained,
            live_surfaces = report.pool.live_surface_count,
            backlog = report.pool.backlog_size,
            megabytes = report.megabytes(),
            "{report}"
        );

        self.generation += 1;
        self.stats.generation = self.generation;
        self.stats.sweeps += 1;
        self.stats.evictions += removed as u64;
        self.stats.entries = retained;
        report
    }

    /// Release every cached surface
    ///
    /// The generation counter and statistics are kept.
    pub fn clear(&mut self) {
        let mut released = 0usize;
        for (_, group) in self.groups.drain() {
            for (_, cached) in group {
                self.allocator.release(cached.surface, cached.context);
                released += 1;
            }
        }
        self.stats.entries = 0;
        if released > 0 {
            debug!(released, "surface cache cleared");
        }
    }

    /// Number of cached surfaces
    pub fn len(&self) -> usize {
        self.stats.entries
    }

    /// Returns true if no surface is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of primary keys, including ones whose sub-cache is empty
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Current generation (starts at 1, +1 per sweep)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Get current cache statistics
    pub fn stats(&self) -> SurfaceCacheStats {
        self.stats
    }

    pub fn config(&self) -> &SurfaceCacheConfig {
        &self.config
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    #[cfg(test)]
    fn last_used(&self, key: &str, sub_key: &str) -> Option<u64> {
        self.groups
            .get(key)
            .and_then(|group| group.get(sub_key))
            .map(|cached| cached.last_used)
    }
}

impl<A: SurfaceAllocator> Drop for SurfaceCache<A> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Pixel extent of a logical length at the given scale
fn scaled(logical: u32, scale: f32) -> u32 {
    let px = (logical as f64 * scale as f64).round();
    if px.is_finite() && px > 0.0 {
        px.min(u32::MAX as f64) as u32
    } else {
        0
    }
}
