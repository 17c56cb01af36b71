//! Scene renderer: draws a [`SceneContext`] through a [`RenderDevice`]
//!
//! A frame is, in order:
//! 1. clear to the ambient-tinted background
//! 2. global shading uniforms
//! 3. the light block
//! 4. one lit quad per layer, in draw order
//! 5. light markers (edit mode, when shown)
//! 6. the brush cursor (edit mode, when a brush is active)
//!
//! The renderer owns every device resource. Layer maps share five texture
//! slots; a slot is replaced (destroyed, then recreated) only when the layer
//! has an image for it, otherwise the previous texture stays bound.

use glam::{Mat4, Vec2, Vec3};
use image::{Rgba, RgbaImage};
use thiserror::Error;

use crate::coords::{billboard_matrix, LayerTransform, Viewport};
use crate::device::{
    CursorUniforms, DeviceError, GlobalUniforms, LayerUniforms, LightBlock, LightOverflow, MarkerUniforms,
    ProgramHandle, ProgramKind, QuadUniforms, RenderDevice, RenderTarget, SamplerState, TextureHandle, TEXTURE_UNITS,
};
use crate::layer::{Layer, MapKind};
use crate::light::MARKER_SCALE;
use crate::scene::{CursorOverlay, SceneContext, ViewMode};

/// Size of the generated light marker icon
const DEFAULT_MARKER_SIZE: u32 = 64;

/// A warning generated during rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub message: String,
}

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Error type for rendering
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Device(#[from] DeviceError),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// What one frame did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// The viewport was empty and nothing was drawn
    pub skipped: bool,
    pub sprites_drawn: usize,
    pub markers_drawn: usize,
    pub cursor_drawn: bool,
    /// Lights uploaded to the shading program
    pub lights_shaded: usize,
    pub light_overflow: Option<LightOverflow>,
    pub warnings: Vec<Warning>,
}

impl FrameReport {
    fn skipped() -> Self {
        Self { skipped: true, ..Self::default() }
    }
}

/// Default light marker: a soft white disc with a darker rim.
pub fn default_marker_icon() -> RgbaImage {
    let size = DEFAULT_MARKER_SIZE;
    let center = (size as f32 - 1.0) / 2.0;
    let radius = size as f32 / 2.0;
    RgbaImage::from_fn(size, size, |x, y| {
        let d = Vec2::new(x as f32 - center, y as f32 - center).length() / radius;
        if d > 1.0 {
            Rgba([0, 0, 0, 0])
        } else if d > 0.8 {
            Rgba([96, 96, 96, 255])
        } else {
            let v = (255.0 * (1.0 - 0.3 * d)) as u8;
            Rgba([v, v, v, 255])
        }
    })
}

struct Programs {
    shading: ProgramHandle,
    marker: ProgramHandle,
    cursor: ProgramHandle,
}

/// Draws scenes through a device it owns
pub struct SceneRenderer<D: RenderDevice> {
    device: D,
    programs: Programs,
    slots: [TextureHandle; TEXTURE_UNITS],
    marker_icon: TextureHandle,
    marker_size: (u32, u32),
    cursor_texture: Option<TextureHandle>,
}

/// 1x1 texture a slot holds before any layer supplied a map
fn slot_default(kind: MapKind) -> RgbaImage {
    let pixel = match kind {
        MapKind::Diffuse => Rgba([0, 0, 0, 0]),
        MapKind::Normal => Rgba([128, 128, 255, 255]),
        MapKind::Parallax | MapKind::Specular => Rgba([0, 0, 0, 255]),
        MapKind::Occlusion => Rgba([255, 255, 255, 255]),
    };
    RgbaImage::from_pixel(1, 1, pixel)
}

impl<D: RenderDevice> SceneRenderer<D> {
    /// Link the programs and allocate the default textures.
    ///
    /// # Errors
    ///
    /// A program that fails to link is fatal; the error names the program and
    /// the failing stage.
    pub fn new(mut device: D, marker_icon: &RgbaImage) -> Result<Self> {
        let programs = Programs {
            shading: device.create_program(ProgramKind::Shading)?,
            marker: device.create_program(ProgramKind::LightMarker)?,
            cursor: device.create_program(ProgramKind::Cursor)?,
        };
        let mut slots = Vec::with_capacity(TEXTURE_UNITS);
        for kind in MapKind::ALL {
            slots.push(device.create_texture(&slot_default(kind))?);
        }
        let slots = [slots[0], slots[1], slots[2], slots[3], slots[4]];
        let marker = device.create_texture(marker_icon)?;
        Ok(Self {
            device,
            programs,
            slots,
            marker_icon: marker,
            marker_size: marker_icon.dimensions(),
            cursor_texture: None,
        })
    }

    /// A renderer using [`default_marker_icon`].
    pub fn with_default_icon(device: D) -> Result<Self> {
        Self::new(device, &default_marker_icon())
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Pixel size of the light marker icon.
    pub fn marker_size(&self) -> (u32, u32) {
        self.marker_size
    }

    /// Texture currently holding the map of `kind`.
    pub fn slot(&self, kind: MapKind) -> TextureHandle {
        self.slots[kind.unit()]
    }

    /// Read back the target of the last pass.
    pub fn read_pixels(&self) -> Result<RgbaImage> {
        Ok(self.device.read_pixels()?)
    }

    /// Render one frame of `ctx` on screen.
    pub fn render(&mut self, ctx: &SceneContext<'_>, viewport: Viewport) -> Result<FrameReport> {
        if viewport.is_empty() {
            log::warn!("skipping frame for empty viewport {}x{}", viewport.width, viewport.height);
            return Ok(FrameReport::skipped());
        }
        let mut report = FrameReport::default();

        let clear = ctx.shading.clear_color();
        self.device.begin_pass(RenderTarget::Screen(viewport));
        self.device.clear(clear)?;

        self.begin_shading(ctx, ctx.view_mode, Vec3::Z, &mut report)?;

        for layer in ctx.layers {
            let Some(t) = LayerTransform::compute(layer.position, layer.zoom(), layer.tiling, layer.texture_size(), viewport, 0.0)
            else {
                continue;
            };
            let uniforms = LayerUniforms {
                transform: t.matrix(),
                pixels: layer.texture_size(),
                pixel_size: ctx.shading.pixel_size,
                selected: layer.is_selected(),
                zoom: layer.zoom(),
                ratio: t.ratio,
                parallax: layer.parallax && ctx.view_mode == ViewMode::Preview,
                target_scale: Vec2::ONE,
                target_offset: Vec2::ZERO,
            };
            self.draw_layer(layer, ctx.shading.pixelated, uniforms)?;
            report.sprites_drawn += 1;
        }

        if ctx.view_mode == ViewMode::Edit && ctx.show_lights {
            report.markers_drawn = self.draw_markers(ctx, viewport)?;
        }

        if ctx.view_mode == ViewMode::Edit {
            if let Some(cursor) = &ctx.cursor {
                report.cursor_drawn = self.draw_cursor(cursor, ctx.shading.pixelated, viewport)?;
            }
        }

        log::debug!(
            "frame {}x{}: {} sprites, {} markers, {} lights",
            viewport.width,
            viewport.height,
            report.sprites_drawn,
            report.markers_drawn,
            report.lights_shaded
        );
        Ok(report)
    }

    /// Bind the shading program and upload globals and lights.
    ///
    /// The outline color is the frame clear color so translucent edges fade
    /// into the canvas background.
    pub(crate) fn begin_shading(
        &mut self,
        ctx: &SceneContext<'_>,
        view_mode: ViewMode,
        view_pos: Vec3,
        report: &mut FrameReport,
    ) -> Result<()> {
        self.device.use_program(self.programs.shading)?;
        let globals = GlobalUniforms {
            view_mode,
            pixelated: ctx.shading.pixelated,
            toon: ctx.shading.toon,
            outline_color: ctx.shading.clear_color(),
            view_pos,
            height_scale: ctx.shading.parallax_height,
            blend_factor: ctx.shading.blend(),
        };
        self.device.set_globals(&globals);

        let (block, overflow) = LightBlock::pack(&ctx.lights, ctx.shading.ambient_color, ctx.shading.ambient_intensity);
        if let Some(overflow) = overflow {
            log::warn!("light array full: {}", overflow);
            report.warnings.push(Warning::new(overflow.to_string()));
            report.light_overflow = Some(overflow);
        }
        report.lights_shaded = block.count();
        self.device.upload_lights(&block);
        Ok(())
    }

    /// Bind a layer's maps and sampler, then draw its quad.
    pub(crate) fn draw_layer(&mut self, layer: &Layer, pixelated: bool, uniforms: LayerUniforms) -> Result<()> {
        for kind in MapKind::ALL {
            if let Some(image) = layer.map(kind) {
                self.replace_slot(kind, image)?;
            }
            self.device.bind_texture(kind.unit(), self.slots[kind.unit()])?;
        }
        self.device.set_sampler(SamplerState::for_layer(pixelated, layer.tiling.any()));
        self.device.draw_quad(&QuadUniforms::Layer(uniforms))?;
        Ok(())
    }

    fn replace_slot(&mut self, kind: MapKind, image: &RgbaImage) -> Result<()> {
        let unit = kind.unit();
        self.device.destroy_texture(self.slots[unit]);
        self.slots[unit] = self.device.create_texture(image)?;
        Ok(())
    }

    fn draw_markers(&mut self, ctx: &SceneContext<'_>, viewport: Viewport) -> Result<usize> {
        self.device.use_program(self.programs.marker)?;
        self.device.bind_texture(0, self.marker_icon)?;
        self.device.set_sampler(SamplerState::default());
        let mut drawn = 0;
        for light in &ctx.lights {
            let center = Vec2::new(light.position.x, light.position.y);
            let Some(transform) = billboard_matrix(center, self.marker_size, MARKER_SCALE, viewport) else {
                continue;
            };
            let uniforms = MarkerUniforms {
                transform,
                light_color: light.diffuse_color,
                selected: light.id() == ctx.current_light,
            };
            self.device.draw_quad(&QuadUniforms::Marker(uniforms))?;
            drawn += 1;
        }
        Ok(drawn)
    }

    fn draw_cursor(&mut self, cursor: &CursorOverlay<'_>, pixelated: bool, viewport: Viewport) -> Result<bool> {
        let (w, h) = cursor.sprite.dimensions();
        if w == 0 || h == 0 {
            return Ok(false);
        }
        if let Some(old) = self.cursor_texture.take() {
            self.device.destroy_texture(old);
        }
        let texture = self.device.create_texture(cursor.sprite)?;
        self.cursor_texture = Some(texture);

        self.device.use_program(self.programs.cursor)?;
        self.device.bind_texture(0, texture)?;
        self.device.set_sampler(SamplerState::for_layer(pixelated, false));
        let size = viewport.size();
        let scale = Vec2::new(w as f32 / size.x, h as f32 / size.y) * cursor.zoom;
        let transform = Mat4::from_translation(cursor.position.extend(0.0)) * Mat4::from_scale(scale.extend(1.0));
        self.device.draw_quad(&QuadUniforms::Cursor(CursorUniforms { transform, pixelated }))?;
        Ok(true)
    }

    pub(crate) fn begin_offscreen(&mut self, width: u32, height: u32) -> Result<()> {
        self.device.begin_pass(RenderTarget::Offscreen { width, height });
        self.device.clear(crate::color::Color::TRANSPARENT)?;
        Ok(())
    }
}
