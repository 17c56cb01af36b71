//! Conversions between screen pixels, device space and sprite texel space
//!
//! Three spaces are in play:
//! - screen: pixels, origin top-left, y down
//! - device: `[-1, 1] x [-1, 1]`, origin at the viewport center, y up
//! - sprite local: source-image texels, origin top-left of the sprite, y down
//!
//! A tiled axis ignores the layer's pan offset and zoom when it is drawn: the
//! quad covers the whole viewport on that axis and the texture repeats.
//! Every function here returns `None` for an empty viewport so callers can skip
//! the frame instead of dividing by zero.

use glam::{Mat4, Vec2, Vec3};

/// Size of the render target in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// Per-axis tiling flags of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tiling {
    pub x: bool,
    pub y: bool,
}

impl Tiling {
    pub const NONE: Tiling = Tiling { x: false, y: false };
    pub const BOTH: Tiling = Tiling { x: true, y: true };

    pub fn new(x: bool, y: bool) -> Self {
        Self { x, y }
    }

    /// True when at least one axis repeats.
    pub fn any(&self) -> bool {
        self.x || self.y
    }
}

/// Convert a screen pixel position to device space.
///
/// `x = 2·px/w - 1`, `y = -2·py/h + 1`.
pub fn screen_to_device(px: f32, py: f32, viewport: Viewport) -> Option<Vec2> {
    if viewport.is_empty() {
        return None;
    }
    let size = viewport.size();
    Some(Vec2::new(2.0 * px / size.x - 1.0, -2.0 * py / size.y + 1.0))
}

/// Convert a device-space position to screen pixels. Inverse of [`screen_to_device`].
pub fn device_to_screen(p: Vec2, viewport: Viewport) -> Option<Vec2> {
    if viewport.is_empty() {
        return None;
    }
    let size = viewport.size();
    Some(Vec2::new((p.x + 1.0) * size.x * 0.5, (1.0 - p.y) * size.y * 0.5))
}

/// Map a device-space point into the texel space of a layer.
///
/// Non-tiled axes undo the pan offset and the zoom. Tiled axes treat the layer
/// as covering the whole viewport: the pan offset is ignored and the result
/// wraps into the texture.
pub fn device_to_sprite_local(
    p: Vec2,
    position: Vec2,
    zoom: f32,
    tiling: Tiling,
    texture_size: (u32, u32),
    viewport: Viewport,
) -> Option<Vec2> {
    if zoom <= 0.0 || !zoom.is_finite() {
        return None;
    }
    let screen = device_to_screen(p, viewport)?;
    let size = viewport.size();
    let (tw, th) = (texture_size.0 as f32, texture_size.1 as f32);

    let u = if tiling.x {
        wrap(screen.x / zoom, tw)
    } else {
        (screen.x - ((position.x + 1.0) * size.x - tw * zoom) * 0.5) / zoom
    };
    let v = if tiling.y {
        wrap(screen.y / zoom, th)
    } else {
        (screen.y - ((-position.y + 1.0) * size.y - th * zoom) * 0.5) / zoom
    };
    Some(Vec2::new(u, v))
}

fn wrap(value: f32, period: f32) -> f32 {
    if period > 0.0 {
        value.rem_euclid(period)
    } else {
        value
    }
}

/// The quad transform of one layer, split into its factors.
///
/// The composed matrix is `translate · scale · zoom · rotate`. The `ratio`
/// vector is what a tiled axis feeds the shader so the texture repeats at its
/// native texel size instead of stretching over the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerTransform {
    /// Pan offset in device space, zero on tiled axes
    pub translation: Vec2,
    /// Texel-to-device ratio, 1 on tiled axes
    pub scale: Vec2,
    /// Layer zoom, 1 on tiled axes
    pub zoom: Vec2,
    /// Rotation around the quad center in radians
    pub rotation: f32,
    /// Texture coordinate multiplier, `1/(ratio·zoom)` on tiled axes, 1 otherwise
    pub ratio: Vec2,
}

impl LayerTransform {
    /// Compute the draw transform for a layer of `texture_size` texels.
    pub fn compute(
        position: Vec2,
        zoom: f32,
        tiling: Tiling,
        texture_size: (u32, u32),
        viewport: Viewport,
        rotation: f32,
    ) -> Option<Self> {
        if viewport.is_empty() {
            return None;
        }
        let size = viewport.size();
        let texel = Vec2::new(texture_size.0 as f32 / size.x, texture_size.1 as f32 / size.y);

        let translation = Vec2::new(
            if tiling.x { 0.0 } else { position.x },
            if tiling.y { 0.0 } else { position.y },
        );
        let scale = Vec2::new(if tiling.x { 1.0 } else { texel.x }, if tiling.y { 1.0 } else { texel.y });
        let zoom_axes = Vec2::new(if tiling.x { 1.0 } else { zoom }, if tiling.y { 1.0 } else { zoom });

        let ratio_axis = |tiled: bool, t: f32| {
            let k = t * zoom;
            if tiled && k > 0.0 {
                1.0 / k
            } else {
                1.0
            }
        };
        let ratio = Vec2::new(ratio_axis(tiling.x, texel.x), ratio_axis(tiling.y, texel.y));

        Some(Self { translation, scale, zoom: zoom_axes, rotation, ratio })
    }

    /// Compose the transform into a matrix mapping quad space to device space.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation.extend(0.0))
            * Mat4::from_scale(Vec3::new(self.scale.x, self.scale.y, 1.0))
            * Mat4::from_scale(Vec3::new(self.zoom.x, self.zoom.y, 1.0))
            * Mat4::from_rotation_z(self.rotation)
    }
}

/// Transform that places a billboard of `icon_size` pixels at `center`,
/// scaled by `factor` relative to its viewport-relative size.
pub fn billboard_matrix(center: Vec2, icon_size: (u32, u32), factor: f32, viewport: Viewport) -> Option<Mat4> {
    if viewport.is_empty() {
        return None;
    }
    let size = viewport.size();
    let rel = Vec2::new(icon_size.0 as f32 / size.x, icon_size.1 as f32 / size.y) * factor;
    Some(Mat4::from_translation(center.extend(0.0)) * Mat4::from_scale(Vec3::new(rel.x, rel.y, 1.0)))
}

/// Device-space half extents of a layer, as used for picking.
///
/// Tiled axes cover the whole viewport and report a half extent of 2.
pub fn layer_half_extents(zoom: f32, tiling: Tiling, texture_size: (u32, u32), viewport: Viewport) -> Option<Vec2> {
    if viewport.is_empty() {
        return None;
    }
    let size = viewport.size();
    Some(Vec2::new(
        if tiling.x { 2.0 } else { zoom * texture_size.0 as f32 / size.x },
        if tiling.y { 2.0 } else { zoom * texture_size.1 as f32 / size.y },
    ))
}

/// A half-open pixel rectangle `[x0, x1) x [y0, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        (self.x1 - self.x0).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y1 - self.y0).max(0) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &PixelRect) -> PixelRect {
        PixelRect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Screen-pixel footprint of a non-tiled layer drawn at its pan offset and zoom.
pub fn layer_footprint_px(position: Vec2, zoom: f32, texture_size: (u32, u32), viewport: Viewport) -> Option<PixelRect> {
    if viewport.is_empty() {
        return None;
    }
    let size = viewport.size();
    let cx = 0.5 * (position.x + 1.0) * size.x;
    let cy = 0.5 * (-position.y + 1.0) * size.y;
    let hw = texture_size.0 as f32 / 2.0 * zoom;
    let hh = texture_size.1 as f32 / 2.0 * zoom;
    Some(PixelRect {
        x0: (cx - hw) as i32,
        y0: (cy - hh) as i32,
        x1: (cx + hw) as i32,
        y1: (cy + hh) as i32,
    })
}
