//! End-to-end behavior of a cache driven like a game session

use std::cell::Cell;
use std::convert::Infallible;

use surface_cache::{
    HeapAllocator, ManualClock, PixelSurface, RasterContext, SurfaceCache, SurfaceAllocator, SurfaceCacheConfig,
    SurfaceError,
};

fn checker(
    surface: &mut PixelSurface,
    _ctx: &mut RasterContext,
    _w: u32,
    _h: u32,
    _scale: f32,
    painted: &Cell<u32>,
) -> Result<(), Infallible> {
    painted.set(painted.get() + 1);
    surface.fill([0x20, 0x80, 0x20, 0xff]);
    Ok(())
}

#[test]
fn tileset_lifecycle() {
    let mut cache = SurfaceCache::new(HeapAllocator::new());
    let painted = Cell::new(0);

    let surface = cache
        .get("tileset", "0_0", 64, 64, 1.0, checker, &painted)
        .unwrap();
    assert_eq!((surface.width(), surface.height()), (64, 64));
    assert_eq!(&surface.pixels()[..4], &[0x20, 0x80, 0x20, 0xff]);
    let first_id = surface.id();
    assert_eq!(painted.get(), 1);
    assert_eq!(cache.allocator().report_stats().live_surface_count, 1);

    let again = cache
        .get("tileset", "0_0", 64, 64, 1.0, checker, &painted)
        .unwrap();
    assert_eq!(again.id(), first_id);
    assert_eq!(painted.get(), 1);
    assert_eq!(cache.allocator().report_stats().live_surface_count, 1);

    cache.collect();
    assert!(cache.contains("tileset", "0_0"));
    cache.collect();
    assert!(!cache.contains("tileset", "0_0"));
    assert_eq!(cache.allocator().report_stats().live_surface_count, 0);

    let rebuilt = cache
        .get("tileset", "0_0", 64, 64, 1.0, checker, &painted)
        .unwrap();
    assert_ne!(rebuilt.id(), first_id);
    assert_eq!(painted.get(), 2);
}

#[test]
fn frame_loop_evicts_unused_surfaces() {
    let mut cache = SurfaceCache::new(HeapAllocator::new());
    let clock = ManualClock::new(0.0);
    let painted = Cell::new(0);

    // 60 fps for 10 seconds; "hud" is drawn every frame, "splash" only in the first second
    let mut sweeps = Vec::new();
    for frame in 0..600 {
        cache
            .get("hud", "score", 128, 32, 2.0, checker, &painted)
            .unwrap();
        if frame < 60 {
            cache
                .get("splash", "logo", 256, 256, 1.0, checker, &painted)
                .unwrap();
        }
        if let Some(report) = cache.poll(&clock) {
            sweeps.push(report);
        }
        clock.advance(1.0 / 60.0);
    }

    assert!(cache.contains("hud", "score"));
    assert!(!cache.contains("splash", "logo"));
    assert_eq!(painted.get(), 2);
    assert_eq!(sweeps.iter().map(|r| r.removed).sum::<usize>(), 1);
    assert_eq!(sweeps.last().map(|r| r.retained), Some(1));

    let hud_bytes = 256 * 64 * 4;
    assert_eq!(cache.allocator().report_stats().total_bytes_used, hud_bytes);
}

#[test]
fn allocation_failure_reaches_caller() {
    let mut cache = SurfaceCache::with_config(
        HeapAllocator::with_max_dimension(100),
        SurfaceCacheConfig::default(),
    );
    let painted = Cell::new(0);

    let err = cache
        .get("atlas", "full", 64, 64, 2.0, checker, &painted)
        .unwrap_err();
    assert!(matches!(err, SurfaceError::Allocation(_)));
    assert_eq!(painted.get(), 0);
    assert!(cache.is_empty());
    assert_eq!(cache.group_count(), 0);
}

#[test]
fn clearing_the_cache_releases_surfaces() {
    let mut cache = SurfaceCache::new(HeapAllocator::new());
    let painted = Cell::new(0);
    for i in 0..5 {
        cache
            .get("icons", &i.to_string(), 16, 16, 1.0, checker, &painted)
            .unwrap();
    }
    assert_eq!(cache.allocator().report_stats().live_surface_count, 5);

    cache.clear();
    assert_eq!(cache.allocator().report_stats().live_surface_count, 0);
    assert_eq!(cache.stats().misses, 5);
}
