//! Criterion benchmarks for Spritelight critical paths
//!
//! Benchmarks the core performance-critical operations:
//! - Color: CSS color parsing for config and scene files
//! - Lights: packing the light block uploaded every frame
//! - Renderer: shading a full on-screen frame
//! - Export: per-layer and full-canvas exports

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::Vec2;
use image::{Rgba, RgbaImage};
use spritelight::color::{parse_color, Color};
use spritelight::coords::Viewport;
use spritelight::device::{LightBlock, SoftwareDevice};
use spritelight::export::{export, ExportRequest};
use spritelight::layer::{MapSet, SpriteMaps};
use spritelight::light::{LightManager, LightSettings};
use spritelight::renderer::SceneRenderer;
use spritelight::scene::{Scene, ShadingParams};

// =============================================================================
// Test Data Generators
// =============================================================================

/// A layer with diffuse and normal maps of the given size
fn make_maps(size: u32) -> SpriteMaps {
    let diffuse = RgbaImage::from_fn(size, size, |x, y| Rgba([(x * 7) as u8, (y * 5) as u8, 128, 255]));
    let normal = RgbaImage::from_fn(size, size, |x, y| {
        Rgba([128 + ((x % 16) as u8) * 4, 128 + ((y % 16) as u8) * 4, 255, 255])
    });
    let mut maps = MapSet::with_diffuse(diffuse);
    maps.normal = Some(normal);
    SpriteMaps::new(maps)
}

/// `count` lights spread along the canvas diagonal
fn make_lights(count: usize) -> Vec<LightSettings> {
    (0..count)
        .map(|i| {
            let t = i as f32 / count.max(1) as f32 * 2.0 - 1.0;
            LightSettings { position: [t, -t, 0.3], ..LightSettings::default() }
        })
        .collect()
}

fn make_scene(layers: usize, size: u32, lights: usize) -> Scene {
    let manager = LightManager::with_sample_lights(LightSettings::default(), &make_lights(lights));
    let mut scene = Scene::new(ShadingParams::default(), manager);
    for i in 0..layers {
        let index = scene.add_layer(format!("layer{}.png", i), make_maps(size), &[]);
        if let Ok(layer) = scene.layer_mut(index) {
            layer.position = Vec2::new(i as f32 * 0.2 - 0.5, 0.0);
        }
    }
    scene
}

// =============================================================================
// Color Benchmarks
// =============================================================================

fn bench_color(c: &mut Criterion) {
    let mut group = c.benchmark_group("color");

    group.bench_function("parse_hex_6", |b| b.iter(|| parse_color(black_box("#FF0000"))));

    group.bench_function("parse_rgb", |b| b.iter(|| parse_color(black_box("rgb(255, 0, 0)"))));

    group.bench_function("parse_named", |b| b.iter(|| parse_color(black_box("white"))));

    group.finish();
}

// =============================================================================
// Light Block Benchmarks
// =============================================================================

fn bench_lights(c: &mut Criterion) {
    let mut group = c.benchmark_group("lights");

    for count in [1usize, 8, 32, 64].iter() {
        let manager = LightManager::with_sample_lights(LightSettings::default(), &make_lights(*count));
        let lights: Vec<_> = manager.sample().iter().collect();
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("pack", count), &lights, |b, lights| {
            b.iter(|| LightBlock::pack(black_box(lights), Color::WHITE, 0.8))
        });
    }

    group.finish();
}

// =============================================================================
// Renderer Benchmarks
// =============================================================================

fn bench_renderer(c: &mut Criterion) {
    let mut group = c.benchmark_group("renderer");
    group.sample_size(20);

    for size in [32u32, 128, 256].iter() {
        let scene = make_scene(1, *size, 4);
        let viewport = Viewport::new(640, 480);
        let Ok(mut renderer) = SceneRenderer::with_default_icon(SoftwareDevice::new()) else {
            return;
        };
        group.throughput(Throughput::Elements((*size * *size) as u64));
        group.bench_with_input(BenchmarkId::new("frame", size), &scene, |b, scene| {
            b.iter(|| renderer.render(&scene.context(None), black_box(viewport)))
        });
    }

    let mut toon = make_scene(4, 64, 8);
    toon.set_toon(true);
    toon.set_pixelated(true);
    let viewport = Viewport::new(640, 480);
    if let Ok(mut renderer) = SceneRenderer::with_default_icon(SoftwareDevice::new()) {
        group.bench_function("frame_4_layers_toon", |b| {
            b.iter(|| renderer.render(&toon.context(None), black_box(viewport)))
        });
    }

    group.finish();
}

// =============================================================================
// Export Benchmarks
// =============================================================================

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    group.sample_size(20);

    let scene = make_scene(4, 64, 4);
    let viewport = Viewport::new(640, 480);
    let Ok(mut renderer) = SceneRenderer::with_default_icon(SoftwareDevice::new()) else {
        return;
    };

    let per_layer = ExportRequest::default();
    group.bench_function("per_layer_4x64", |b| {
        b.iter(|| export(&mut renderer, &scene.context(None), viewport, black_box(&per_layer)))
    });

    let full = ExportRequest { full_canvas: true, ..Default::default() };
    group.bench_function("full_canvas_4x64", |b| {
        b.iter(|| export(&mut renderer, &scene.context(None), viewport, black_box(&full)))
    });

    group.finish();
}

criterion_group!(benches, bench_color, bench_lights, bench_renderer, bench_export);
criterion_main!(benches);
