//! A CPU render device
//!
//! Renders into a straight-alpha `Rgba32FImage`. Quads are rasterized by
//! mapping each covered pixel center back through the inverse quad transform;
//! rows are shaded in parallel with rayon.

use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec3, Vec4};
use image::{Rgba32FImage, RgbaImage};
use rayon::prelude::*;

use super::sampler::SamplerState;
use super::shader::{shade_cursor, shade_layer, shade_marker, BoundMaps, ShadingInputs};
use super::uniforms::{GlobalUniforms, LightBlock, QuadUniforms};
use super::{DeviceError, ProgramHandle, ProgramKind, RenderDevice, RenderTarget, TextureHandle, TEXTURE_UNITS};
use crate::color::Color;

/// Counters for inspecting what a frame did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub clears: usize,
    pub layer_draws: usize,
    pub marker_draws: usize,
    pub cursor_draws: usize,
    pub textures_created: usize,
    pub textures_destroyed: usize,
}

impl DeviceStats {
    pub fn draw_calls(&self) -> usize {
        self.layer_draws + self.marker_draws + self.cursor_draws
    }
}

struct Pass {
    target: RenderTarget,
    color: Rgba32FImage,
}

/// CPU implementation of [`RenderDevice`]
pub struct SoftwareDevice {
    programs: Vec<ProgramKind>,
    program: Option<ProgramKind>,
    textures: HashMap<u32, RgbaImage>,
    next_texture: u32,
    units: [Option<TextureHandle>; TEXTURE_UNITS],
    sampler: SamplerState,
    globals: GlobalUniforms,
    lights: LightBlock,
    pass: Option<Pass>,
    stats: DeviceStats,
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareDevice {
    pub fn new() -> Self {
        Self {
            programs: Vec::new(),
            program: None,
            textures: HashMap::new(),
            next_texture: 1,
            units: [None; TEXTURE_UNITS],
            sampler: SamplerState::default(),
            globals: GlobalUniforms::default(),
            lights: LightBlock::default(),
            pass: None,
            stats: DeviceStats::default(),
        }
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = DeviceStats::default();
    }

    /// Number of textures currently alive.
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// The texture bound to `unit`, if any.
    pub fn bound_texture(&self, unit: usize) -> Option<TextureHandle> {
        self.units.get(unit).copied().flatten()
    }

    pub fn sampler(&self) -> SamplerState {
        self.sampler
    }

    pub fn globals(&self) -> &GlobalUniforms {
        &self.globals
    }

    pub fn lights(&self) -> &LightBlock {
        &self.lights
    }

    /// Target of the current pass.
    pub fn target(&self) -> Option<RenderTarget> {
        self.pass.as_ref().map(|p| p.target)
    }

    /// Float color of one pixel of the current target.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let pass = self.pass.as_ref()?;
        if x >= pass.color.width() || y >= pass.color.height() {
            return None;
        }
        let p = pass.color.get_pixel(x, y);
        Some(Color::rgba(p[0], p[1], p[2], p[3]))
    }
}

fn bound_maps<'a>(textures: &'a HashMap<u32, RgbaImage>, units: &[Option<TextureHandle>; TEXTURE_UNITS]) -> BoundMaps<'a> {
    let mut maps: BoundMaps<'a> = [None; TEXTURE_UNITS];
    for (slot, unit) in maps.iter_mut().zip(units.iter()) {
        *slot = unit.and_then(|h| textures.get(&h.0));
    }
    maps
}

/// Source-over compositing of a straight-alpha color onto a straight-alpha pixel.
fn blend_over(dst: &mut [f32], src: Vec4) {
    let src_alpha = src.w.clamp(0.0, 1.0);
    let dst_alpha = dst[3];
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
    if out_alpha <= 0.0 {
        dst.copy_from_slice(&[0.0; 4]);
        return;
    }
    for c in 0..3 {
        dst[c] = (src[c] * src_alpha + dst[c] * dst_alpha * (1.0 - src_alpha)) / out_alpha;
    }
    dst[3] = out_alpha;
}

/// Pixel-space bounds `[x0, x1) x [y0, y1)` covered by the transformed unit quad.
fn quad_bounds(transform: &Mat4, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let corners = [Vec2::new(-1.0, -1.0), Vec2::new(1.0, -1.0), Vec2::new(-1.0, 1.0), Vec2::new(1.0, 1.0)];
    let mut min = Vec2::splat(f32::INFINITY);
    let mut max = Vec2::splat(f32::NEG_INFINITY);
    for c in corners {
        let d = transform.transform_point3(c.extend(0.0));
        let px = Vec2::new((d.x + 1.0) * 0.5 * width as f32, (1.0 - d.y) * 0.5 * height as f32);
        min = min.min(px);
        max = max.max(px);
    }
    if !min.is_finite() || !max.is_finite() {
        return None;
    }
    let x0 = min.x.floor().max(0.0) as u32;
    let y0 = min.y.floor().max(0.0) as u32;
    let x1 = (max.x.ceil().max(0.0) as u32).min(width);
    let y1 = (max.y.ceil().max(0.0) as u32).min(height);
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

impl RenderDevice for SoftwareDevice {
    fn create_program(&mut self, kind: ProgramKind) -> Result<ProgramHandle, DeviceError> {
        self.programs.push(kind);
        Ok(ProgramHandle(self.programs.len() as u32 - 1))
    }

    fn create_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle, DeviceError> {
        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(handle.0, image.clone());
        self.stats.textures_created += 1;
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture.0).is_some() {
            self.stats.textures_destroyed += 1;
        }
        for unit in self.units.iter_mut().filter(|u| **u == Some(texture)) {
            *unit = None;
        }
    }

    fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures.get(&texture.0).map(|t| t.dimensions())
    }

    fn begin_pass(&mut self, target: RenderTarget) {
        let (w, h) = target.size();
        self.pass = Some(Pass { target, color: Rgba32FImage::new(w, h) });
    }

    fn clear(&mut self, color: Color) -> Result<(), DeviceError> {
        let pass = self.pass.as_mut().ok_or(DeviceError::NoPass)?;
        let value = color.to_array();
        for p in pass.color.pixels_mut() {
            p.0 = value;
        }
        self.stats.clears += 1;
        Ok(())
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), DeviceError> {
        let kind = self.programs.get(program.0 as usize).copied().ok_or(DeviceError::UnknownProgram(program))?;
        self.program = Some(kind);
        Ok(())
    }

    fn set_globals(&mut self, globals: &GlobalUniforms) {
        self.globals = *globals;
    }

    fn upload_lights(&mut self, block: &LightBlock) {
        self.lights = *block;
    }

    fn bind_texture(&mut self, unit: usize, texture: TextureHandle) -> Result<(), DeviceError> {
        if !self.textures.contains_key(&texture.0) {
            return Err(DeviceError::UnknownTexture(texture));
        }
        if let Some(slot) = self.units.get_mut(unit) {
            *slot = Some(texture);
        }
        Ok(())
    }

    fn set_sampler(&mut self, sampler: SamplerState) {
        self.sampler = sampler;
    }

    fn draw_quad(&mut self, uniforms: &QuadUniforms) -> Result<(), DeviceError> {
        let program = self.program.ok_or(DeviceError::NoProgram)?;
        if uniforms.program() != program {
            return Err(DeviceError::UniformMismatch { program, uniforms: uniforms.program() });
        }
        match uniforms {
            QuadUniforms::Layer(_) => self.stats.layer_draws += 1,
            QuadUniforms::Marker(_) => self.stats.marker_draws += 1,
            QuadUniforms::Cursor(_) => self.stats.cursor_draws += 1,
        }

        let maps = bound_maps(&self.textures, &self.units);
        let sampler = self.sampler;
        let globals = &self.globals;
        let lights = &self.lights;
        let pass = self.pass.as_mut().ok_or(DeviceError::NoPass)?;
        let (width, height) = pass.color.dimensions();

        let transform = uniforms.transform();
        let det = transform.determinant();
        if det == 0.0 || !det.is_finite() {
            return Ok(());
        }
        let inverse = transform.inverse();
        let Some((x0, y0, x1, y1)) = quad_bounds(&transform, width, height) else {
            return Ok(());
        };

        let fragment = |p: Vec2, uv: Vec2| -> Option<Vec4> {
            match uniforms {
                QuadUniforms::Layer(layer) => {
                    let inputs = ShadingInputs { globals, lights, layer, maps, sampler };
                    shade_layer(&inputs, uv, p)
                }
                QuadUniforms::Marker(u) => shade_marker(maps[0], sampler, u, uv),
                QuadUniforms::Cursor(u) => shade_cursor(maps[0], sampler, u, uv),
            }
        };

        let row_len = width as usize * 4;
        let buffer: &mut [f32] = &mut pass.color;
        buffer
            .par_chunks_mut(row_len)
            .enumerate()
            .filter(|(y, _)| (*y as u32) >= y0 && (*y as u32) < y1)
            .for_each(|(y, row)| {
                let dy = 1.0 - (y as f32 + 0.5) / height as f32 * 2.0;
                for x in x0..x1 {
                    let dx = (x as f32 + 0.5) / width as f32 * 2.0 - 1.0;
                    let p = Vec2::new(dx, dy);
                    let local = inverse.transform_point3(Vec3::new(dx, dy, 0.0));
                    if local.x.abs() > 1.0 || local.y.abs() > 1.0 {
                        continue;
                    }
                    let uv = Vec2::new((local.x + 1.0) * 0.5, (1.0 - local.y) * 0.5);
                    if let Some(color) = fragment(p, uv) {
                        let i = x as usize * 4;
                        blend_over(&mut row[i..i + 4], color);
                    }
                }
            });
        Ok(())
    }

    fn read_pixels(&self) -> Result<RgbaImage, DeviceError> {
        let pass = self.pass.as_ref().ok_or(DeviceError::NoPass)?;
        let (w, h) = pass.color.dimensions();
        Ok(RgbaImage::from_fn(w, h, |x, y| {
            let p = pass.color.get_pixel(x, y);
            Color::rgba(p[0], p[1], p[2], p[3]).to_rgba8()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Viewport;
    use crate::device::uniforms::{CursorUniforms, MarkerUniforms};
    use crate::device::{Filter, Wrap};
    use image::Rgba;

    fn device_with_pass(w: u32, h: u32) -> SoftwareDevice {
        let mut d = SoftwareDevice::new();
        d.begin_pass(RenderTarget::Screen(Viewport::new(w, h)));
        d
    }

    #[test]
    fn test_clear_fills_target() {
        let mut d = device_with_pass(3, 2);
        d.clear(Color::rgb(0.5, 0.25, 1.0)).unwrap();
        assert_eq!(d.pixel(2, 1), Some(Color::rgb(0.5, 0.25, 1.0)));
        assert_eq!(d.stats().clears, 1);
    }

    #[test]
    fn test_clear_without_pass_fails() {
        let mut d = SoftwareDevice::new();
        assert_eq!(d.clear(Color::BLACK), Err(DeviceError::NoPass));
    }

    #[test]
    fn test_destroy_unbinds() {
        let mut d = SoftwareDevice::new();
        let t = d.create_texture(&RgbaImage::new(2, 2)).unwrap();
        d.bind_texture(3, t).unwrap();
        assert_eq!(d.bound_texture(3), Some(t));
        d.destroy_texture(t);
        assert_eq!(d.bound_texture(3), None);
        assert_eq!(d.live_textures(), 0);
        assert_eq!(d.bind_texture(0, t), Err(DeviceError::UnknownTexture(t)));
    }

    #[test]
    fn test_uniform_mismatch_rejected() {
        let mut d = device_with_pass(4, 4);
        let p = d.create_program(ProgramKind::Shading).unwrap();
        d.use_program(p).unwrap();
        let u = QuadUniforms::Cursor(CursorUniforms { transform: Mat4::IDENTITY, pixelated: false });
        assert!(matches!(d.draw_quad(&u), Err(DeviceError::UniformMismatch { .. })));
    }

    #[test]
    fn test_marker_quad_covers_transformed_area() {
        let mut d = device_with_pass(10, 10);
        d.clear(Color::BLACK).unwrap();
        let p = d.create_program(ProgramKind::LightMarker).unwrap();
        d.use_program(p).unwrap();
        let icon = d.create_texture(&RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]))).unwrap();
        d.bind_texture(0, icon).unwrap();
        // Left half of the viewport
        let transform = Mat4::from_translation(Vec3::new(-0.5, 0.0, 0.0)) * Mat4::from_scale(Vec3::new(0.5, 1.0, 1.0));
        let u = MarkerUniforms { transform, light_color: Color::rgb(1.0, 0.0, 0.0), selected: false };
        d.draw_quad(&QuadUniforms::Marker(u)).unwrap();
        assert_eq!(d.pixel(2, 5), Some(Color::rgb(1.0, 0.0, 0.0)));
        assert_eq!(d.pixel(7, 5), Some(Color::BLACK));
        assert_eq!(d.stats().marker_draws, 1);
    }

    #[test]
    fn test_tiny_quad_still_covers_its_pixel() {
        let mut d = device_with_pass(1000, 1000);
        d.clear(Color::BLACK).unwrap();
        let p = d.create_program(ProgramKind::LightMarker).unwrap();
        d.use_program(p).unwrap();
        let icon = d.create_texture(&RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]))).unwrap();
        d.bind_texture(0, icon).unwrap();
        d.set_sampler(SamplerState { min_filter: Filter::Nearest, mag_filter: Filter::Nearest, wrap: Wrap::Repeat });
        // A twentieth of a pixel, centered on pixel (500, 500)
        let transform = Mat4::from_translation(Vec3::new(0.001, -0.001, 0.0)) * Mat4::from_scale(Vec3::new(1e-4, 1e-4, 1.0));
        assert!(transform.determinant() < f32::EPSILON);
        let u = MarkerUniforms { transform, light_color: Color::rgb(0.0, 0.0, 1.0), selected: false };
        d.draw_quad(&QuadUniforms::Marker(u)).unwrap();
        assert_eq!(d.pixel(500, 500), Some(Color::rgb(0.0, 0.0, 1.0)));
        assert_eq!(d.pixel(501, 500), Some(Color::BLACK));
    }

    #[test]
    fn test_degenerate_quad_is_skipped() {
        let mut d = device_with_pass(8, 8);
        d.clear(Color::BLACK).unwrap();
        let p = d.create_program(ProgramKind::LightMarker).unwrap();
        d.use_program(p).unwrap();
        let icon = d.create_texture(&RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]))).unwrap();
        d.bind_texture(0, icon).unwrap();
        let transform = Mat4::from_scale(Vec3::new(0.0, 1.0, 1.0));
        let u = MarkerUniforms { transform, light_color: Color::WHITE, selected: false };
        d.draw_quad(&QuadUniforms::Marker(u)).unwrap();
        assert_eq!(d.pixel(4, 4), Some(Color::BLACK));
    }

    #[test]
    fn test_blend_over_transparent_keeps_source() {
        let mut dst = [0.0; 4];
        blend_over(&mut dst, Vec4::new(1.0, 0.5, 0.0, 0.5));
        assert_eq!(dst, [1.0, 0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_read_pixels_converts() {
        let mut d = device_with_pass(2, 2);
        d.clear(Color::rgba(1.0, 0.0, 0.0, 1.0)).unwrap();
        let img = d.read_pixels().unwrap();
        assert_eq!(img.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
    }
}
