//! Texture sampling state and a CPU sampler
//!
//! Coordinates are normalized with `(0, 0)` at the top-left texel corner.
//! Border wrap returns transparent black outside `[0, 1)`, which keeps sprite
//! edges from bleeding the way clamp-to-edge would.

use glam::{Vec2, Vec4};
use image::RgbaImage;

/// Texture filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapLinear,
}

impl Filter {
    /// The filter used on the base level.
    pub fn base(self) -> Filter {
        match self {
            Filter::Nearest | Filter::NearestMipmapNearest => Filter::Nearest,
            Filter::Linear | Filter::LinearMipmapLinear => Filter::Linear,
        }
    }
}

/// Texture wrap mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    Repeat,
    ClampToBorder,
}

/// Filtering and wrapping for the textures of a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerState {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub wrap: Wrap,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self { min_filter: Filter::Linear, mag_filter: Filter::Linear, wrap: Wrap::ClampToBorder }
    }
}

impl SamplerState {
    /// Sampler for a sprite layer.
    ///
    /// Pixelated shading samples nearest texels; any tiled axis makes both
    /// axes repeat.
    pub fn for_layer(pixelated: bool, tiled: bool) -> Self {
        let (min_filter, mag_filter) = if pixelated {
            (Filter::NearestMipmapNearest, Filter::Nearest)
        } else {
            (Filter::LinearMipmapLinear, Filter::Linear)
        };
        let wrap = if tiled { Wrap::Repeat } else { Wrap::ClampToBorder };
        Self { min_filter, mag_filter, wrap }
    }
}

/// Sample `image` at `uv`, returning RGBA in `0.0..=1.0`.
pub fn sample(image: &RgbaImage, uv: Vec2, sampler: SamplerState) -> Vec4 {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Vec4::ZERO;
    }
    let x = uv.x * w as f32;
    let y = uv.y * h as f32;
    match sampler.mag_filter.base() {
        Filter::Linear => {
            let (x, y) = (x - 0.5, y - 0.5);
            let (x0, y0) = (x.floor(), y.floor());
            let (fx, fy) = (x - x0, y - y0);
            let (x0, y0) = (x0 as i64, y0 as i64);
            let t00 = texel(image, x0, y0, sampler.wrap);
            let t10 = texel(image, x0 + 1, y0, sampler.wrap);
            let t01 = texel(image, x0, y0 + 1, sampler.wrap);
            let t11 = texel(image, x0 + 1, y0 + 1, sampler.wrap);
            let top = t00.lerp(t10, fx);
            let bottom = t01.lerp(t11, fx);
            top.lerp(bottom, fy)
        }
        _ => texel(image, x.floor() as i64, y.floor() as i64, sampler.wrap),
    }
}

fn texel(image: &RgbaImage, x: i64, y: i64, wrap: Wrap) -> Vec4 {
    let (w, h) = (image.width() as i64, image.height() as i64);
    let (x, y) = match wrap {
        Wrap::Repeat => (x.rem_euclid(w), y.rem_euclid(h)),
        Wrap::ClampToBorder => {
            if x < 0 || y < 0 || x >= w || y >= h {
                return Vec4::ZERO;
            }
            (x, y)
        }
    };
    let p = image.get_pixel(x as u32, y as u32);
    Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker() -> RgbaImage {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        img.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        img.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        img
    }

    #[test]
    fn test_layer_sampler_selection() {
        let s = SamplerState::for_layer(true, false);
        assert_eq!(s.min_filter, Filter::NearestMipmapNearest);
        assert_eq!(s.mag_filter, Filter::Nearest);
        assert_eq!(s.wrap, Wrap::ClampToBorder);
        let s = SamplerState::for_layer(false, true);
        assert_eq!(s.min_filter, Filter::LinearMipmapLinear);
        assert_eq!(s.wrap, Wrap::Repeat);
    }

    #[test]
    fn test_nearest_sampling() {
        let img = checker();
        let s = SamplerState::for_layer(true, false);
        assert_eq!(sample(&img, Vec2::new(0.25, 0.25), s), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(sample(&img, Vec2::new(0.75, 0.75), s), Vec4::ONE);
    }

    #[test]
    fn test_border_is_transparent() {
        let img = checker();
        let s = SamplerState::for_layer(true, false);
        assert_eq!(sample(&img, Vec2::new(1.25, 0.25), s), Vec4::ZERO);
        assert_eq!(sample(&img, Vec2::new(-0.1, 0.25), s), Vec4::ZERO);
    }

    #[test]
    fn test_repeat_wraps() {
        let img = checker();
        let s = SamplerState::for_layer(true, true);
        assert_eq!(sample(&img, Vec2::new(1.25, 0.25), s), sample(&img, Vec2::new(0.25, 0.25), s));
        assert_eq!(sample(&img, Vec2::new(-0.25, 0.25), s), Vec4::new(0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn test_linear_at_texel_center_is_exact() {
        let img = checker();
        let s = SamplerState::for_layer(false, false);
        let c = sample(&img, Vec2::new(0.75, 0.25), s);
        assert!((c - Vec4::new(0.0, 1.0, 0.0, 1.0)).abs().max_element() < 1e-6);
        // Halfway between red and green
        let c = sample(&img, Vec2::new(0.5, 0.25), s);
        assert!((c.x - 0.5).abs() < 1e-6 && (c.y - 0.5).abs() < 1e-6);
    }
}
