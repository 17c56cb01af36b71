//! The GPU seam: a small render device interface and its CPU implementation
//!
//! The scene renderer drives a [`RenderDevice`] through a fixed uniform
//! contract (see [`uniforms`]). Programs are opaque: a device is asked for a
//! program of a given [`ProgramKind`] and is free to implement it however it
//! likes. [`SoftwareDevice`] implements every program on the CPU so frames can
//! be rendered and inspected without a GPU.

mod sampler;
mod shader;
mod software;
pub mod uniforms;

pub use sampler::{sample, Filter, SamplerState, Wrap};
pub use software::{DeviceStats, SoftwareDevice};
pub use uniforms::{
    CursorUniforms, GlobalUniforms, LayerUniforms, LightBlock, LightOverflow, LightParams, MarkerUniforms,
    QuadUniforms, MAX_LIGHTS,
};

use image::RgbaImage;
use thiserror::Error;

use crate::color::Color;
use crate::coords::Viewport;

/// Number of texture units the shading program samples from
pub const TEXTURE_UNITS: usize = 5;

/// The three programs the renderer needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Lit sprite shading
    Shading,
    /// Light marker billboards
    LightMarker,
    /// Brush cursor overlay
    Cursor,
}

impl std::fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramKind::Shading => write!(f, "shading"),
            ProgramKind::LightMarker => write!(f, "light marker"),
            ProgramKind::Cursor => write!(f, "cursor"),
        }
    }
}

/// Stage of program construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Link,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
            ShaderStage::Link => write!(f, "link"),
        }
    }
}

/// Errors reported by a render device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// A program failed to compile or link
    #[error("{program} program failed at the {stage} stage: {log}")]
    ProgramLink { program: ProgramKind, stage: ShaderStage, log: String },
    /// A texture handle that was never created or was already destroyed
    #[error("unknown texture {0:?}")]
    UnknownTexture(TextureHandle),
    /// A program handle this device did not create
    #[error("unknown program {0:?}")]
    UnknownProgram(ProgramHandle),
    /// Drawing without a bound program
    #[error("no program in use")]
    NoProgram,
    /// Drawing or clearing before `begin_pass`
    #[error("no render pass in progress")]
    NoPass,
    /// Uniforms that do not belong to the program in use
    #[error("{uniforms} uniforms do not match the {program} program")]
    UniformMismatch { program: ProgramKind, uniforms: ProgramKind },
    /// Texture creation failed
    #[error("texture allocation failed: {0}")]
    Texture(String),
}

/// Opaque program handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Opaque texture handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Where a pass renders to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// The on-screen framebuffer
    Screen(Viewport),
    /// A fresh off-screen buffer of the given size
    Offscreen { width: u32, height: u32 },
}

impl RenderTarget {
    pub fn size(&self) -> (u32, u32) {
        match *self {
            RenderTarget::Screen(vp) => (vp.width, vp.height),
            RenderTarget::Offscreen { width, height } => (width, height),
        }
    }
}

/// Operations the scene renderer needs from a GPU.
///
/// All state set through these calls persists until changed, like GL state.
/// A device must only be used from the thread that renders frames.
pub trait RenderDevice {
    /// Compile and link a program.
    fn create_program(&mut self, kind: ProgramKind) -> Result<ProgramHandle, DeviceError>;

    /// Upload an image as a new texture (with mipmaps where supported).
    fn create_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle, DeviceError>;

    /// Release a texture. Units it was bound to become unbound.
    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Dimensions of a live texture.
    fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)>;

    /// Start rendering into `target`. Off-screen targets start zeroed.
    fn begin_pass(&mut self, target: RenderTarget);

    fn clear(&mut self, color: Color) -> Result<(), DeviceError>;

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), DeviceError>;

    fn set_globals(&mut self, globals: &GlobalUniforms);

    /// Upload the light array as one block.
    fn upload_lights(&mut self, block: &LightBlock);

    fn bind_texture(&mut self, unit: usize, texture: TextureHandle) -> Result<(), DeviceError>;

    fn set_sampler(&mut self, sampler: SamplerState);

    /// Draw the unit quad `[-1, 1]²` with the program in use.
    fn draw_quad(&mut self, uniforms: &QuadUniforms) -> Result<(), DeviceError>;

    /// Read back the current target as 8-bit RGBA, top row first.
    fn read_pixels(&self) -> Result<RgbaImage, DeviceError>;
}
