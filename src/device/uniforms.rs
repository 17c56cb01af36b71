//! The uniform contract between the renderer and a device
//!
//! Lights travel as one fixed-capacity block instead of per-index named
//! uniforms. The block is plain old data so a GPU backend can upload it as a
//! uniform buffer with `bytemuck::bytes_of`.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

use crate::color::Color;
use crate::light::LightSource;
use crate::scene::ViewMode;

/// Capacity of the light array in the shading program
pub const MAX_LIGHTS: usize = 32;

/// One light as the shading program sees it, std140-friendly.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct LightParams {
    /// xyz position, w unused
    pub position: [f32; 4],
    /// rgb diffuse color, w diffuse intensity
    pub diffuse: [f32; 4],
    /// rgb specular color, w specular intensity
    pub specular: [f32; 4],
    /// x specular scatter exponent, yzw unused
    pub scatter: [f32; 4],
}

impl LightParams {
    pub fn from_light(light: &LightSource) -> Self {
        let [r, g, b] = light.diffuse_color.rgb_array();
        let [sr, sg, sb] = light.specular_color.rgb_array();
        Self {
            position: [light.position.x, light.position.y, light.position.z, 0.0],
            diffuse: [r, g, b, light.diffuse_intensity],
            specular: [sr, sg, sb, light.specular_intensity],
            scatter: [light.specular_scatter, 0.0, 0.0, 0.0],
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.position[0], self.position[1], self.position[2])
    }

    pub fn diffuse_color(&self) -> Vec3 {
        Vec3::new(self.diffuse[0], self.diffuse[1], self.diffuse[2])
    }

    pub fn diffuse_intensity(&self) -> f32 {
        self.diffuse[3]
    }

    pub fn specular_color(&self) -> Vec3 {
        Vec3::new(self.specular[0], self.specular[1], self.specular[2])
    }

    pub fn specular_intensity(&self) -> f32 {
        self.specular[3]
    }

    pub fn specular_scatter(&self) -> f32 {
        self.scatter[0]
    }
}

/// More lights were requested than the block holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightOverflow {
    pub requested: usize,
    pub uploaded: usize,
}

impl std::fmt::Display for LightOverflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} lights requested, only the first {} are shaded", self.requested, self.uploaded)
    }
}

/// The light array plus the shared ambient term
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightBlock {
    lights: [LightParams; MAX_LIGHTS],
    /// rgb ambient color, w ambient intensity
    ambient: [f32; 4],
    count: u32,
    _pad: [u32; 3],
}

impl Default for LightBlock {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl LightBlock {
    /// Pack lights in order, truncating at [`MAX_LIGHTS`].
    pub fn pack(lights: &[&LightSource], ambient: Color, ambient_intensity: f32) -> (Self, Option<LightOverflow>) {
        let mut block = Self::zeroed();
        let uploaded = lights.len().min(MAX_LIGHTS);
        for (slot, light) in block.lights.iter_mut().zip(lights.iter().take(uploaded)) {
            *slot = LightParams::from_light(light);
        }
        let [r, g, b] = ambient.rgb_array();
        block.ambient = [r, g, b, ambient_intensity];
        block.count = uploaded as u32;

        let overflow = (lights.len() > MAX_LIGHTS).then_some(LightOverflow { requested: lights.len(), uploaded });
        (block, overflow)
    }

    pub fn count(&self) -> usize {
        self.count as usize
    }

    /// The populated part of the array.
    pub fn lights(&self) -> &[LightParams] {
        &self.lights[..self.count().min(MAX_LIGHTS)]
    }

    pub fn ambient_color(&self) -> Vec3 {
        Vec3::new(self.ambient[0], self.ambient[1], self.ambient[2])
    }

    pub fn ambient_intensity(&self) -> f32 {
        self.ambient[3]
    }
}

/// Per-pass uniforms of the shading program
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalUniforms {
    pub view_mode: ViewMode,
    pub pixelated: bool,
    pub toon: bool,
    /// Color translucent edges fade into
    pub outline_color: Color,
    /// Camera position in canvas device space
    pub view_pos: Vec3,
    pub height_scale: f32,
    /// 0..=1
    pub blend_factor: f32,
}

impl Default for GlobalUniforms {
    fn default() -> Self {
        Self {
            view_mode: ViewMode::Edit,
            pixelated: false,
            toon: false,
            outline_color: Color::BLACK,
            view_pos: Vec3::Z,
            height_scale: 0.0,
            blend_factor: 0.0,
        }
    }
}

/// Per-layer uniforms of the shading program
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerUniforms {
    /// Quad to target device space
    pub transform: Mat4,
    /// Texture size in texels
    pub pixels: (u32, u32),
    /// Pixelation cell size in texels
    pub pixel_size: u32,
    pub selected: bool,
    pub zoom: f32,
    /// Texture coordinate multiplier for tiled axes
    pub ratio: Vec2,
    pub parallax: bool,
    /// Target device space to canvas device space: `canvas = p · scale + offset`.
    /// Identity on screen; export passes use it to light an off-screen sprite
    /// as if it were at its canvas position.
    pub target_scale: Vec2,
    pub target_offset: Vec2,
}

/// Uniforms of the light marker program
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerUniforms {
    pub transform: Mat4,
    pub light_color: Color,
    pub selected: bool,
}

/// Uniforms of the brush cursor program
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorUniforms {
    pub transform: Mat4,
    pub pixelated: bool,
}

/// Uniforms for one quad draw, tagged by program
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuadUniforms {
    Layer(LayerUniforms),
    Marker(MarkerUniforms),
    Cursor(CursorUniforms),
}

impl QuadUniforms {
    pub fn program(&self) -> super::ProgramKind {
        match self {
            QuadUniforms::Layer(_) => super::ProgramKind::Shading,
            QuadUniforms::Marker(_) => super::ProgramKind::LightMarker,
            QuadUniforms::Cursor(_) => super::ProgramKind::Cursor,
        }
    }

    pub fn transform(&self) -> Mat4 {
        match self {
            QuadUniforms::Layer(u) => u.transform,
            QuadUniforms::Marker(u) => u.transform,
            QuadUniforms::Cursor(u) => u.transform,
        }
    }
}
