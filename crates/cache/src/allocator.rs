//! Surface allocation boundary
//!
//! The cache never creates or frees drawable surfaces itself. It asks a
//! [`SurfaceAllocator`] for a surface/context pair on a miss and hands the
//! pair back on eviction. Pooling and backlog limits live entirely on the
//! allocator side.

/// Options passed along with every allocation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocOptions {
    /// Whether the allocator may recycle the surface after release
    pub reusable: bool,

    /// Human readable label, used by allocators for diagnostics
    pub label: String,

    /// Whether the drawing context should use smoothed (filtered) scaling
    pub smooth: bool,
}

impl AllocOptions {
    /// Create options for a reusable surface with the given label
    pub fn reusable(label: impl Into<String>) -> Self {
        Self {
            reusable: true,
            label: label.into(),
            smooth: true,
        }
    }

    /// Set smoothing on the drawing context
    pub fn with_smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }
}

/// Pool-wide usage figures reported by an allocator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Estimated memory held by live surfaces (bytes)
    pub total_bytes_used: usize,

    /// Number of surfaces currently handed out
    pub live_surface_count: usize,

    /// Number of released surfaces waiting for reuse or disposal
    pub backlog_size: usize,
}

impl PoolStats {
    /// Estimated memory in megabytes, rounded to one decimal place
    pub fn megabytes(&self) -> f64 {
        let mb = self.total_bytes_used as f64 / (1024.0 * 1024.0);
        (mb * 10.0).round() / 10.0
    }
}

/// Errors raised when a surface cannot be produced
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("cannot allocate an empty surface")]
    EmptySurface,
    #[error("surface {width}x{height} exceeds the maximum dimension {max}")]
    TooLarge { width: u32, height: u32, max: u32 },
    #[error("allocator backend error: {0}")]
    Backend(String),
}

/// Source and sink of drawable surfaces
///
/// `Surface` and `Context` are opaque to the cache. A context is paired 1:1
/// with its surface and both are moved back into [`SurfaceAllocator::release`]
/// together.
pub trait SurfaceAllocator {
    type Surface;
    type Context;

    /// Allocate a surface of the given pixel size together with its drawing context
    fn allocate(
        &mut self,
        pixel_width: u32,
        pixel_height: u32,
        options: &AllocOptions,
    ) -> Result<(Self::Surface, Self::Context), AllocationError>;

    /// Return a surface/context pair to the free path
    fn release(&mut self, surface: Self::Surface, context: Self::Context);

    /// Report pool-wide usage
    fn report_stats(&self) -> PoolStats;

    /// Enforce the allocator's own backlog cap
    fn trim_backlog(&mut self);

    /// Whether the backing store of `surface` has been lost and must be rebuilt
    fn is_lost(&self, _surface: &Self::Surface) -> bool {
        false
    }
}

/// RGBA8 pixel buffer handed out by [`HeapAllocator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSurface {
    id: u64,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelSurface {
    /// Allocator-unique id of this surface
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw pixel data (RGBA format)
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable pixel data (RGBA format)
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Fill every pixel with one RGBA color
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Get the memory size of this surface in bytes
    pub fn memory_size(&self) -> usize {
        self.pixels.len()
    }
}

/// Drawing state paired with a [`PixelSurface`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterContext {
    /// Label the surface was allocated under
    pub label: String,
    /// Whether scaled draws should be filtered
    pub smooth: bool,
}

/// Non-pooling allocator backed by heap pixel buffers
///
/// Every release frees immediately, so the backlog is always empty.
#[derive(Debug)]
pub struct HeapAllocator {
    max_dimension: u32,
    next_id: u64,
    bytes_used: usize,
    live: usize,
}

impl HeapAllocator {
    /// Default maximum edge length of a surface in pixels
    pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

    /// Create an allocator with the default size limit
    pub fn new() -> Self {
        Self::with_max_dimension(Self::DEFAULT_MAX_DIMENSION)
    }

    /// Create an allocator rejecting surfaces wider or taller than `max_dimension`
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension,
            next_id: 1,
            bytes_used: 0,
            live: 0,
        }
    }
}

impl Default for HeapAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceAllocator for HeapAllocator {
    type Surface = PixelSurface;
    type Context = RasterContext;

    fn allocate(
        &mut self,
        pixel_width: u32,
        pixel_height: u32,
        options: &AllocOptions,
    ) -> Result<(PixelSurface, RasterContext), AllocationError> {
        if pixel_width == 0 || pixel_height == 0 {
            return Err(AllocationError::EmptySurface);
        }
        if pixel_width > self.max_dimension || pixel_height > self.max_dimension {
            return Err(AllocationError::TooLarge {
                width: pixel_width,
                height: pixel_height,
                max: self.max_dimension,
            });
        }

        let len = pixel_width as usize * pixel_height as usize * 4;
        let surface = PixelSurface {
            id: self.next_id,
            width: pixel_width,
            height: pixel_height,
            pixels: vec![0; len],
        };
        self.next_id += 1;
        self.bytes_used += surface.memory_size();
        self.live += 1;

        let context = RasterContext {
            label: options.label.clone(),
            smooth: options.smooth,
        };
        Ok((surface, context))
    }

    fn release(&mut self, surface: PixelSurface, _context: RasterContext) {
        self.bytes_used = self.bytes_used.saturating_sub(surface.memory_size());
        self.live = self.live.saturating_sub(1);
    }

    fn report_stats(&self) -> PoolStats {
        PoolStats {
            total_bytes_used: self.bytes_used,
            live_surface_count: self.live,
            backlog_size: 0,
        }
    }

    fn trim_backlog(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_allocate_and_release() {
        let mut alloc = HeapAllocator::new();
        let (surface, context) = alloc
            .allocate(64, 32, &AllocOptions::reusable("buffer-a/b"))
            .unwrap();

        assert_eq!(surface.width(), 64);
        assert_eq!(surface.height(), 32);
        assert_eq!(surface.memory_size(), 64 * 32 * 4);
        assert_eq!(context.label, "buffer-a/b");
        assert!(context.smooth);

        let stats = alloc.report_stats();
        assert_eq!(stats.live_surface_count, 1);
        assert_eq!(stats.total_bytes_used, 64 * 32 * 4);

        alloc.release(surface, context);
        assert_eq!(alloc.report_stats(), PoolStats::default());
    }

    #[test]
    fn test_heap_unique_ids() {
        let mut alloc = HeapAllocator::new();
        let opts = AllocOptions::reusable("x");
        let (a, _) = alloc.allocate(1, 1, &opts).unwrap();
        let (b, _) = alloc.allocate(1, 1, &opts).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_heap_rejects_empty() {
        let mut alloc = HeapAllocator::new();
        let err = alloc
            .allocate(0, 16, &AllocOptions::reusable("empty"))
            .unwrap_err();
        assert_eq!(err, AllocationError::EmptySurface);
        assert_eq!(alloc.report_stats().live_surface_count, 0);
    }

    #[test]
    fn test_heap_rejects_oversized() {
        let mut alloc = HeapAllocator::with_max_dimension(128);
        let err = alloc
            .allocate(256, 16, &AllocOptions::reusable("big"))
            .unwrap_err();
        assert_eq!(
            err,
            AllocationError::TooLarge {
                width: 256,
                height: 16,
                max: 128
            }
        );
    }

    #[test]
    fn test_fill() {
        let mut alloc = HeapAllocator::new();
        let (mut surface, _) = alloc
            .allocate(2, 2, &AllocOptions::reusable("fill").with_smooth(false))
            .unwrap();
        surface.fill([1, 2, 3, 4]);
        assert_eq!(surface.pixels(), [1u8, 2, 3, 4].repeat(4).as_slice());
    }

    #[test]
    fn test_megabytes_rounding() {
        let stats = PoolStats {
            total_bytes_used: 1024 * 1024 + 200 * 1024,
            live_surface_count: 1,
            backlog_size: 0,
        };
        // 1.195 MB
        assert_eq!(stats.megabytes(), 1.2);
        assert_eq!(PoolStats::default().megabytes(), 0.0);
    }
}
