//! Off-screen export of the shaded scene
//!
//! Two modes share the renderer's shading path:
//! - per layer: every layer alone, in a buffer the size of its texture, lit as
//!   it is on the canvas
//! - full canvas: all layers in a viewport-sized buffer, cropped to the union
//!   of their footprints
//!
//! Exports always shade in preview mode: no selection highlight, no markers,
//! no cursor.

use std::path::PathBuf;

use glam::{Mat4, Vec2, Vec3};
use image::RgbaImage;
use thiserror::Error;

use crate::coords::{layer_footprint_px, LayerTransform, PixelRect, Viewport};
use crate::device::{LayerUniforms, RenderDevice};
use crate::layer::Layer;
use crate::output::{autosave_path, save_png, OutputError};
use crate::renderer::{FrameReport, RenderError, SceneRenderer, Warning};
use crate::scene::{SceneContext, ViewMode};

/// Error type for exports
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: OutputError,
    },
}

/// What to export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportRequest {
    /// One cropped composite instead of one image per layer
    pub full_canvas: bool,
    /// Write each per-layer image next to its source or into `export_dir`
    pub autosave: bool,
    pub export_dir: Option<PathBuf>,
}

/// One exported image
#[derive(Debug, Clone)]
pub struct ExportedImage {
    /// Layer name, or `"canvas"` for a full-canvas export
    pub name: String,
    pub image: RgbaImage,
    /// Where it was autosaved
    pub saved_to: Option<PathBuf>,
}

/// Result of an export
#[derive(Debug, Clone, Default)]
pub struct ExportOutput {
    pub images: Vec<ExportedImage>,
    pub warnings: Vec<Warning>,
}

impl ExportOutput {
    /// The last image produced; for a per-layer export, the top layer.
    pub fn last_image(&self) -> Option<&RgbaImage> {
        self.images.last().map(|i| &i.image)
    }

    pub fn into_last_image(self) -> Option<RgbaImage> {
        self.images.into_iter().last().map(|i| i.image)
    }

    pub fn saved_paths(&self) -> Vec<&PathBuf> {
        self.images.iter().filter_map(|i| i.saved_to.as_ref()).collect()
    }

    /// Add warnings, skipping any already recorded.
    pub fn extend_warnings(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        for warning in warnings {
            if !self.warnings.contains(&warning) {
                self.warnings.push(warning);
            }
        }
    }
}

/// Render `ctx` off-screen according to `request`.
///
/// `viewport` is the on-screen canvas size; it fixes where each layer sits
/// relative to the lights.
pub fn export<D: RenderDevice>(
    renderer: &mut SceneRenderer<D>,
    ctx: &SceneContext<'_>,
    viewport: Viewport,
    request: &ExportRequest,
) -> Result<ExportOutput, ExportError> {
    let output = if request.full_canvas {
        export_full_canvas(renderer, ctx, viewport)?
    } else {
        export_layers(renderer, ctx, viewport, request)?
    };
    log::debug!("exported {} image(s), full canvas: {}", output.images.len(), request.full_canvas);
    Ok(output)
}

fn export_layers<D: RenderDevice>(
    renderer: &mut SceneRenderer<D>,
    ctx: &SceneContext<'_>,
    viewport: Viewport,
    request: &ExportRequest,
) -> Result<ExportOutput, ExportError> {
    let mut output = ExportOutput::default();
    for layer in ctx.layers {
        let (w, h) = layer.texture_size();
        if w == 0 || h == 0 {
            output.warnings.push(Warning::new(format!("layer '{}' has an empty texture, skipped", layer.name())));
            continue;
        }
        let image = render_layer_alone(renderer, ctx, layer, viewport, &mut output)?;

        let saved_to = if request.autosave {
            let path = autosave_path(layer.name(), request.export_dir.as_deref());
            save_png(&image, &path).map_err(|source| ExportError::Output { path: path.clone(), source })?;
            log::info!("saved {}", path.display());
            Some(path)
        } else {
            None
        };
        output.images.push(ExportedImage { name: layer.name().to_string(), image, saved_to });
    }
    Ok(output)
}

/// Off-screen target space to canvas device space for one layer: the unit
/// quad maps onto the layer's on-screen footprint.
fn layer_target_mapping(layer: &Layer, viewport: Viewport) -> Vec2 {
    if viewport.is_empty() {
        return Vec2::ONE;
    }
    let (w, h) = layer.texture_size();
    let size = viewport.size();
    Vec2::new(w as f32 / size.x, h as f32 / size.y) * layer.zoom()
}

fn render_layer_alone<D: RenderDevice>(
    renderer: &mut SceneRenderer<D>,
    ctx: &SceneContext<'_>,
    layer: &Layer,
    viewport: Viewport,
    output: &mut ExportOutput,
) -> Result<RgbaImage, ExportError> {
    let (w, h) = layer.texture_size();
    renderer.begin_offscreen(w, h)?;

    let view_pos = Vec3::new(-layer.position.x, -layer.position.y, 1.0);
    let mut report = FrameReport::default();
    renderer.begin_shading(ctx, ViewMode::Preview, view_pos, &mut report)?;
    output.extend_warnings(report.warnings);

    let uniforms = LayerUniforms {
        transform: Mat4::IDENTITY,
        pixels: (w, h),
        pixel_size: ctx.shading.pixel_size,
        selected: false,
        zoom: layer.zoom(),
        ratio: Vec2::ONE,
        parallax: layer.parallax,
        target_scale: layer_target_mapping(layer, viewport),
        target_offset: layer.position,
    };
    renderer.draw_layer(layer, ctx.shading.pixelated, uniforms)?;
    Ok(renderer.read_pixels()?)
}

fn export_full_canvas<D: RenderDevice>(
    renderer: &mut SceneRenderer<D>,
    ctx: &SceneContext<'_>,
    viewport: Viewport,
) -> Result<ExportOutput, ExportError> {
    let mut output = ExportOutput::default();
    if viewport.is_empty() {
        log::warn!("full canvas export with an empty viewport");
        output.warnings.push(Warning::new("empty viewport, nothing exported"));
        return Ok(output);
    }

    renderer.begin_offscreen(viewport.width, viewport.height)?;
    let mut report = FrameReport::default();
    renderer.begin_shading(ctx, ViewMode::Preview, Vec3::Z, &mut report)?;
    output.extend_warnings(report.warnings);

    for layer in ctx.layers {
        let Some(t) = LayerTransform::compute(layer.position, layer.zoom(), layer.tiling, layer.texture_size(), viewport, 0.0)
        else {
            continue;
        };
        let uniforms = LayerUniforms {
            transform: t.matrix(),
            pixels: layer.texture_size(),
            pixel_size: ctx.shading.pixel_size,
            selected: false,
            zoom: layer.zoom(),
            ratio: t.ratio,
            parallax: layer.parallax && ctx.view_mode == ViewMode::Preview,
            target_scale: Vec2::ONE,
            target_offset: Vec2::ZERO,
        };
        renderer.draw_layer(layer, ctx.shading.pixelated, uniforms)?;
    }

    let canvas = renderer.read_pixels()?;
    let image = match crop_rect(ctx.layers, viewport) {
        Some(rect) => crop(&canvas, rect),
        None => RgbaImage::new(0, 0),
    };
    output.images.push(ExportedImage { name: "canvas".to_string(), image, saved_to: None });
    Ok(output)
}

/// Union of the layers' screen footprints, in viewport pixels.
///
/// A tiled axis spans the whole viewport. `None` when there are no layers.
pub fn crop_rect(layers: &[Layer], viewport: Viewport) -> Option<PixelRect> {
    let full = PixelRect { x0: 0, y0: 0, x1: viewport.width as i32, y1: viewport.height as i32 };
    layers
        .iter()
        .filter_map(|layer| {
            let mut rect = layer_footprint_px(layer.position, layer.zoom(), layer.texture_size(), viewport)?;
            if layer.tiling.x {
                rect.x0 = full.x0;
                rect.x1 = full.x1;
            }
            if layer.tiling.y {
                rect.y0 = full.y0;
                rect.y1 = full.y1;
            }
            Some(rect)
        })
        .reduce(|a, b| a.union(&b))
}

/// Copy `rect` out of `image`; parts outside the image are transparent.
pub fn crop(image: &RgbaImage, rect: PixelRect) -> RgbaImage {
    let (iw, ih) = (image.width() as i32, image.height() as i32);
    RgbaImage::from_fn(rect.width(), rect.height(), |x, y| {
        let sx = rect.x0 + x as i32;
        let sy = rect.y0 + y as i32;
        if sx >= 0 && sy >= 0 && sx < iw && sy < ih {
            *image.get_pixel(sx as u32, sy as u32)
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{SoftwareDevice, MAX_LIGHTS};
    use crate::layer::{MapSet, SpriteMaps};
    use crate::light::{LightManager, LightSettings};
    use crate::scene::{Scene, ShadingParams};
    use image::Rgba;

    fn maps(w: u32, h: u32) -> SpriteMaps {
        SpriteMaps::new(MapSet::with_diffuse(RgbaImage::from_pixel(w, h, Rgba([200, 200, 200, 255]))))
    }

    #[test]
    fn test_crop_rect_union_ignores_draw_order() {
        let vp = Viewport::new(100, 100);
        let mut a = Scene::default();
        a.add_layer("left", maps(10, 10), &[]);
        a.layer_mut(0).unwrap().position = Vec2::new(-0.5, 0.0);
        a.add_layer("right", maps(20, 10), &[]);
        a.layer_mut(1).unwrap().position = Vec2::new(0.5, 0.5);

        let mut b = Scene::default();
        b.add_layer("right", maps(20, 10), &[]);
        b.layer_mut(0).unwrap().position = Vec2::new(0.5, 0.5);
        b.add_layer("left", maps(10, 10), &[]);
        b.layer_mut(1).unwrap().position = Vec2::new(-0.5, 0.0);

        let ra = crop_rect(a.layers().as_slice(), vp).unwrap();
        let rb = crop_rect(b.layers().as_slice(), vp).unwrap();
        assert_eq!(ra, rb);
        // left: x 20..30, y 45..55; right: x 65..85, y 20..30
        assert_eq!(ra, PixelRect { x0: 20, y0: 20, x1: 85, y1: 55 });
    }

    #[test]
    fn test_crop_rect_tiled_axis_spans_viewport() {
        let vp = Viewport::new(100, 80);
        let mut scene = Scene::default();
        scene.add_layer("floor", maps(10, 10), &[]);
        scene.layer_mut(0).unwrap().tiling.x = true;
        let r = crop_rect(scene.layers().as_slice(), vp).unwrap();
        assert_eq!((r.x0, r.x1), (0, 100));
        assert_eq!((r.y0, r.y1), (35, 45));
    }

    #[test]
    fn test_crop_rect_no_layers() {
        assert!(crop_rect(&[], Viewport::new(10, 10)).is_none());
    }

    #[test]
    fn test_crop_outside_is_transparent() {
        let image = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        let out = crop(&image, PixelRect { x0: 2, y0: 2, x1: 6, y1: 5 });
        assert_eq!(out.dimensions(), (4, 3));
        assert_eq!(out.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
        assert_eq!(out.get_pixel(3, 2), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_per_layer_export_matches_texture_size() {
        let mut r = SceneRenderer::with_default_icon(SoftwareDevice::new()).unwrap();
        let mut scene = Scene::default();
        scene.add_layer("a.png", maps(13, 7), &[]);
        scene.add_layer("b.png", maps(5, 9), &[]);
        scene.set_zoom(3.0).unwrap();
        let out = export(&mut r, &scene.context(None), Viewport::new(64, 64), &ExportRequest::default()).unwrap();
        assert_eq!(out.images.len(), 2);
        assert_eq!(out.images[0].image.dimensions(), (13, 7));
        assert_eq!(out.images[1].image.dimensions(), (5, 9));
        assert!(out.saved_paths().is_empty());
    }

    #[test]
    fn test_per_layer_export_is_not_highlighted() {
        let mut r = SceneRenderer::with_default_icon(SoftwareDevice::new()).unwrap();
        let mut scene = Scene::default();
        scene.set_blend_factor(100);
        scene.add_layer("a.png", maps(4, 4), &[]);
        scene.set_layer_selected(0, true).unwrap();
        let out = export(&mut r, &scene.context(None), Viewport::new(64, 64), &ExportRequest::default()).unwrap();
        assert_eq!(out.images[0].image.get_pixel(1, 1), &Rgba([200, 200, 200, 255]));
    }

    #[test]
    fn test_full_canvas_without_layers_is_empty() {
        let mut r = SceneRenderer::with_default_icon(SoftwareDevice::new()).unwrap();
        let scene = Scene::default();
        let req = ExportRequest { full_canvas: true, ..ExportRequest::default() };
        let out = export(&mut r, &scene.context(None), Viewport::new(32, 32), &req).unwrap();
        assert_eq!(out.last_image().unwrap().dimensions(), (0, 0));
    }

    #[test]
    fn test_light_overflow_warned_once_per_export() {
        let mut r = SceneRenderer::with_default_icon(SoftwareDevice::new()).unwrap();
        let lights = vec![LightSettings::default(); MAX_LIGHTS + 3];
        let mut scene = Scene::new(ShadingParams::default(), LightManager::with_sample_lights(LightSettings::default(), &lights));
        scene.add_layer("a.png", maps(4, 4), &[]);
        scene.add_layer("b.png", maps(4, 4), &[]);
        let out = export(&mut r, &scene.context(None), Viewport::new(64, 64), &ExportRequest::default()).unwrap();
        assert_eq!(out.images.len(), 2);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].message.contains("35 lights requested"));
    }
}
