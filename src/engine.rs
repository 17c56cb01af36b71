//! The preview engine: scene, renderer and frame loop behind one facade
//!
//! The editor mutates the scene through [`PreviewEngine::scene_mut`] or the
//! pointer handlers, calls [`PreviewEngine::tick`] from its timer, and asks for
//! exports with [`PreviewEngine::get_preview`]. Exports are serviced inside a
//! frame, like any other redraw, and the call blocks until that frame ran.

use std::path::Path;
use std::time::Instant;

use glam::Vec2;
use image::RgbaImage;

use crate::brush::Brush;
use crate::config::PreviewConfig;
use crate::coords::{device_to_sprite_local, screen_to_device, Viewport};
use crate::device::RenderDevice;
use crate::event::EditorEvent;
use crate::export::{export, ExportError, ExportOutput, ExportRequest};
use crate::light::marker_half_extents;
use crate::renderer::{FrameReport, RenderError, SceneRenderer};
use crate::scene::{CursorOverlay, Scene, ViewMode};
use crate::schedule::FrameClock;

/// Interactive preview of a scene
pub struct PreviewEngine<D: RenderDevice> {
    pub(crate) scene: Scene,
    renderer: SceneRenderer<D>,
    clock: FrameClock,
    pub(crate) viewport: Viewport,
    pub(crate) brush: Option<Box<dyn Brush>>,
    /// Last pointer position in screen pixels
    pub(crate) pointer: Option<Vec2>,
    pub(crate) adding_light: bool,
    pub(crate) dragging_light: bool,
    pub(crate) last_brush_texel: Vec2,
    pending_export: Option<ExportRequest>,
    export_result: Option<Result<ExportOutput, ExportError>>,
    last_frame: Option<FrameReport>,
}

fn cursor_overlay<'a>(
    brush: Option<&'a dyn Brush>,
    pointer: Option<Vec2>,
    scene: &Scene,
    viewport: Viewport,
) -> Option<CursorOverlay<'a>> {
    let brush = brush.filter(|b| b.is_active())?;
    if scene.view_mode() != ViewMode::Edit {
        return None;
    }
    let pointer = pointer?;
    let position = screen_to_device(pointer.x, pointer.y, viewport)?;
    Some(CursorOverlay { sprite: brush.cursor_sprite(), position, zoom: scene.zoom() })
}

impl<D: RenderDevice> PreviewEngine<D> {
    pub fn new(scene: Scene, renderer: SceneRenderer<D>, config: &PreviewConfig) -> Self {
        Self {
            scene,
            renderer,
            clock: FrameClock::new(config.refresh_hz),
            viewport: Viewport::new(config.width, config.height),
            brush: None,
            pointer: None,
            adding_light: false,
            dragging_light: false,
            last_brush_texel: Vec2::ZERO,
            pending_export: None,
            export_result: None,
            last_frame: None,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable scene access. Scene setters mark the scene dirty themselves.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn renderer(&self) -> &SceneRenderer<D> {
        &self.renderer
    }

    pub fn device(&self) -> &D {
        self.renderer.device()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Report of the last frame drawn.
    pub fn last_frame(&self) -> Option<&FrameReport> {
        self.last_frame.as_ref()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height);
        self.scene.mark_dirty();
    }

    /// Zoom the current layer to fit the viewport and center it.
    pub fn fit_zoom(&mut self) {
        self.scene.fit_zoom(self.viewport);
    }

    pub fn set_brush(&mut self, brush: Option<Box<dyn Brush>>) {
        self.brush = brush;
        self.scene.mark_dirty();
    }

    pub fn brush(&self) -> Option<&dyn Brush> {
        self.brush.as_deref()
    }

    pub fn brush_mut(&mut self) -> Option<&mut (dyn Brush + 'static)> {
        self.brush.as_deref_mut()
    }

    pub fn is_adding_light(&self) -> bool {
        self.adding_light
    }

    /// Device-space half extents of a light marker in the current viewport.
    pub fn marker_half_extents(&self) -> Option<Vec2> {
        marker_half_extents(self.renderer.marker_size(), self.viewport)
    }

    /// Pointer position in the texel space of the current layer.
    pub(crate) fn texel_under(&self, p: Vec2) -> Option<Vec2> {
        let layer = self.scene.layers().current()?;
        device_to_sprite_local(p, layer.position, layer.zoom(), layer.tiling, layer.texture_size(), self.viewport)
    }

    /// Timer callback: redraw if the scene is dirty and a frame slot is due.
    pub fn tick(&mut self, now: Instant) -> Result<Option<FrameReport>, RenderError> {
        if !self.scene.is_dirty() && self.pending_export.is_none() {
            return Ok(None);
        }
        if !self.clock.due(now) {
            return Ok(None);
        }
        self.frame()
    }

    /// Redraw now, dirty or not.
    pub fn redraw(&mut self) -> Result<FrameReport, RenderError> {
        self.scene.mark_dirty();
        let report = self.frame()?;
        Ok(report.unwrap_or_default())
    }

    /// One frame: the on-screen redraw plus any requested export.
    fn frame(&mut self) -> Result<Option<FrameReport>, RenderError> {
        let dirty = self.scene.take_dirty();
        if !dirty && self.pending_export.is_none() {
            return Ok(None);
        }
        let cursor = cursor_overlay(self.brush.as_deref(), self.pointer, &self.scene, self.viewport);
        let ctx = self.scene.context(cursor);
        // The screen pass runs last and stays on the device.
        let exported = self.pending_export.take().map(|request| export(&mut self.renderer, &ctx, self.viewport, &request));
        let report = self.renderer.render(&ctx, self.viewport)?;
        if exported.is_some() {
            self.export_result = exported;
        }
        self.last_frame = Some(report.clone());
        Ok(Some(report))
    }

    /// Render the on-screen frame and read it back.
    pub fn render_to_image(&mut self) -> Result<RgbaImage, RenderError> {
        self.redraw()?;
        self.renderer.read_pixels()
    }

    /// Export and wait for the result.
    pub fn export(&mut self, request: ExportRequest) -> Result<ExportOutput, ExportError> {
        self.pending_export = Some(request);
        loop {
            if let Err(e) = self.frame() {
                self.pending_export = None;
                return Err(e.into());
            }
            if let Some(result) = self.export_result.take() {
                return result;
            }
        }
    }

    /// The single export entry point of the editor.
    ///
    /// Returns the full-canvas composite, or the top layer's image in per-layer
    /// mode (every layer is still rendered and, with `autosave`, written).
    /// `export_dir` of `None` autosaves next to each layer's source.
    pub fn get_preview(
        &mut self,
        full_canvas: bool,
        autosave: bool,
        export_dir: Option<&Path>,
    ) -> Result<RgbaImage, ExportError> {
        let request = ExportRequest { full_canvas, autosave, export_dir: export_dir.map(Path::to_path_buf) };
        let output = self.export(request)?;
        Ok(output.into_last_image().unwrap_or_else(|| RgbaImage::new(0, 0)))
    }

    /// Notifications queued since the last call.
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        self.scene.drain_events()
    }
}
