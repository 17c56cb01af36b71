//! CPU versions of the three programs
//!
//! Each function is one fragment invocation: it gets the quad-local texture
//! coordinate and the target device position of the fragment and returns a
//! straight-alpha color, or `None` to discard.

use glam::{Vec2, Vec3, Vec4, Vec4Swizzles};
use image::RgbaImage;

use super::sampler::{sample, SamplerState};
use super::uniforms::{CursorUniforms, GlobalUniforms, LayerUniforms, LightBlock, MarkerUniforms};
use crate::layer::MapKind;
use crate::scene::ViewMode;

/// Tint mixed into selected layers in edit mode
const SELECTION_TINT: Vec3 = Vec3::new(0.3, 0.5, 1.0);
const SELECTION_MIX: f32 = 0.25;
/// Brightening applied to the current light's marker
const MARKER_HIGHLIGHT: f32 = 0.5;
/// Diffuse bands of the toon ramp
const TOON_BANDS: f32 = 4.0;

/// Textures bound to the five units, in unit order
pub(crate) type BoundMaps<'a> = [Option<&'a RgbaImage>; 5];

/// Everything the shading program reads besides the fragment inputs
pub(crate) struct ShadingInputs<'a> {
    pub globals: &'a GlobalUniforms,
    pub lights: &'a LightBlock,
    pub layer: &'a LayerUniforms,
    pub maps: BoundMaps<'a>,
    pub sampler: SamplerState,
}

impl ShadingInputs<'_> {
    fn map(&self, kind: MapKind, uv: Vec2) -> Option<Vec4> {
        self.maps[kind.unit()].map(|img| sample(img, uv, self.sampler))
    }
}

fn toon_ramp(x: f32) -> f32 {
    (x * TOON_BANDS).ceil() / TOON_BANDS
}

/// Lit sprite shading.
pub(crate) fn shade_layer(inputs: &ShadingInputs<'_>, uv: Vec2, p: Vec2) -> Option<Vec4> {
    let g = inputs.globals;
    let layer = inputs.layer;
    let mut uv = uv * layer.ratio;

    if g.pixelated && layer.pixel_size > 1 && layer.pixels.0 > 0 && layer.pixels.1 > 0 {
        let cell = Vec2::new(
            layer.pixel_size as f32 / layer.pixels.0 as f32,
            layer.pixel_size as f32 / layer.pixels.1 as f32,
        );
        uv = ((uv / cell).floor() + 0.5) * cell;
    }

    // Lighting happens in canvas device space.
    let offset = p * layer.target_scale;
    let frag = offset + layer.target_offset;
    let view = (g.view_pos - offset.extend(0.0)).normalize_or_zero();
    let view = if view == Vec3::ZERO { Vec3::Z } else { view };

    if layer.parallax {
        let height = inputs.map(MapKind::Parallax, uv).map_or(0.0, |h| h.x);
        let z = view.z.max(0.05);
        // Texture v grows downward, device y upward.
        let shift = Vec2::new(view.x, -view.y) / z * height * g.height_scale;
        uv -= shift;
    }

    let diffuse = inputs.map(MapKind::Diffuse, uv).unwrap_or(Vec4::ZERO);
    if diffuse.w <= 0.0 {
        return None;
    }
    let albedo = diffuse.xyz();

    let normal = inputs
        .map(MapKind::Normal, uv)
        .map(|n| (n.xyz() * 2.0 - Vec3::ONE).normalize_or_zero())
        .filter(|n| *n != Vec3::ZERO)
        .unwrap_or(Vec3::Z);
    let gloss = inputs.map(MapKind::Specular, uv).map_or(0.0, |s| s.x);
    let occlusion = inputs.map(MapKind::Occlusion, uv).map_or(1.0, |o| o.x);

    let lights = inputs.lights;
    let mut lit = albedo * lights.ambient_color() * lights.ambient_intensity() * occlusion;
    for light in lights.lights() {
        let to_light = (light.position() - frag.extend(0.0)).normalize_or_zero();
        let mut diff = normal.dot(to_light).max(0.0);
        if g.toon {
            diff = toon_ramp(diff);
        }
        lit += albedo * light.diffuse_color() * light.diffuse_intensity() * diff;

        let half = (to_light + view).normalize_or_zero();
        let mut spec = normal.dot(half).max(0.0).powf(light.specular_scatter().max(1.0));
        if g.toon {
            spec = if spec > 0.5 { 1.0 } else { 0.0 };
        }
        lit += light.specular_color() * light.specular_intensity() * spec * gloss;
    }

    let mut color = lit.lerp(albedo, g.blend_factor.clamp(0.0, 1.0));
    if g.toon && diffuse.w < 1.0 {
        let outline = Vec3::from_array(g.outline_color.rgb_array());
        color = outline.lerp(color, diffuse.w);
    }
    if g.view_mode == ViewMode::Edit && layer.selected {
        color = color.lerp(SELECTION_TINT, SELECTION_MIX);
    }
    Some(color.clamp(Vec3::ZERO, Vec3::ONE).extend(diffuse.w))
}

/// Light marker billboard: the icon tinted by the light color.
pub(crate) fn shade_marker(icon: Option<&RgbaImage>, sampler: SamplerState, u: &MarkerUniforms, uv: Vec2) -> Option<Vec4> {
    let texel = sample(icon?, uv, sampler);
    if texel.w <= 0.0 {
        return None;
    }
    let tint = Vec3::from_array(u.light_color.rgb_array());
    let mut color = texel.xyz() * tint;
    if u.selected {
        color = color.lerp(Vec3::ONE, MARKER_HIGHLIGHT);
    }
    Some(color.extend(texel.w))
}

/// Brush cursor: the cursor sprite as is.
pub(crate) fn shade_cursor(sprite: Option<&RgbaImage>, sampler: SamplerState, _u: &CursorUniforms, uv: Vec2) -> Option<Vec4> {
    let texel = sample(sprite?, uv, sampler);
    (texel.w > 0.0).then_some(texel)
}
