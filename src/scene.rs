//! Scene state: layers, lights, shading parameters and the dirty flag
//!
//! Every mutator marks the scene dirty so the next frame tick redraws once,
//! however many changes happened in between. Rendering never reads the scene
//! directly; it gets a [`SceneContext`] built for that frame.

use glam::Vec2;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::coords::{layer_half_extents, Viewport};
use crate::event::EditorEvent;
use crate::layer::{Layer, LayerError, LayerStack, MapSource};
use crate::light::{LightError, LightId, LightListMode, LightManager, LightSettings, LightSource};

/// Zoom factor applied per wheel notch when zooming in
const WHEEL_ZOOM_IN: f32 = 1.1;
/// Zoom factor applied per wheel notch when zooming out
const WHEEL_ZOOM_OUT: f32 = 0.9;

/// How the canvas is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Editing: selection highlight, light markers and brush cursor
    #[default]
    Edit,
    /// What an export would produce
    Preview,
}

/// Global shading parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadingParams {
    #[serde(default = "default_background")]
    pub background: Color,
    #[serde(default)]
    pub ambient_color: Color,
    #[serde(default = "default_ambient_intensity")]
    pub ambient_intensity: f32,
    #[serde(default)]
    pub pixelated: bool,
    #[serde(default)]
    pub toon: bool,
    /// Size of a pixelation cell in texels
    #[serde(default = "default_pixel_size")]
    pub pixel_size: u32,
    /// Parallax height scale
    #[serde(default = "default_parallax_height")]
    pub parallax_height: f32,
    /// 0..=100, blend of the lit result toward the unshaded diffuse
    #[serde(default)]
    pub blend_factor: u8,
}

fn default_background() -> Color {
    Color::rgb(0.2, 0.2, 0.3)
}

fn default_ambient_intensity() -> f32 {
    0.8
}

fn default_pixel_size() -> u32 {
    3
}

fn default_parallax_height() -> f32 {
    0.03
}

impl Default for ShadingParams {
    fn default() -> Self {
        Self {
            background: default_background(),
            ambient_color: Color::WHITE,
            ambient_intensity: default_ambient_intensity(),
            pixelated: false,
            toon: false,
            pixel_size: default_pixel_size(),
            parallax_height: default_parallax_height(),
            blend_factor: 0,
        }
    }
}

impl ShadingParams {
    /// Canvas clear color: background tinted by the ambient light, opaque.
    pub fn clear_color(&self) -> Color {
        self.background.mul(self.ambient_color).scale(self.ambient_intensity).with_alpha(1.0)
    }

    /// Blend factor mapped to `0.0..=1.0`
    pub fn blend(&self) -> f32 {
        self.blend_factor.min(100) as f32 / 100.0
    }
}

/// Brush cursor overlay for one frame
#[derive(Debug, Clone, Copy)]
pub struct CursorOverlay<'a> {
    pub sprite: &'a RgbaImage,
    /// Pointer position in device space
    pub position: Vec2,
    /// Zoom of the layer being painted
    pub zoom: f32,
}

/// Everything the renderer needs for one frame, borrowed from the scene.
#[derive(Debug, Clone)]
pub struct SceneContext<'a> {
    /// Layers in draw order
    pub layers: &'a [Layer],
    /// Lights shading this frame, in upload order
    pub lights: Vec<&'a LightSource>,
    pub current_light: LightId,
    pub shading: &'a ShadingParams,
    pub view_mode: ViewMode,
    pub show_lights: bool,
    pub cursor: Option<CursorOverlay<'a>>,
}

/// The editable scene
#[derive(Debug)]
pub struct Scene {
    layers: LayerStack,
    lights: LightManager,
    shading: ShadingParams,
    view_mode: ViewMode,
    show_lights: bool,
    dirty: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(ShadingParams::default(), LightManager::new(LightSettings::default()))
    }
}

impl Scene {
    pub fn new(shading: ShadingParams, lights: LightManager) -> Self {
        Self { layers: LayerStack::new(), lights, shading, view_mode: ViewMode::Edit, show_lights: true, dirty: true }
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn lights(&self) -> &LightManager {
        &self.lights
    }

    pub fn shading(&self) -> &ShadingParams {
        &self.shading
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn show_lights(&self) -> bool {
        self.show_lights
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clear the dirty flag, returning whether it was set.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Build the per-frame render context.
    pub fn context<'a>(&'a self, cursor: Option<CursorOverlay<'a>>) -> SceneContext<'a> {
        SceneContext {
            layers: self.layers.as_slice(),
            lights: self.lights.shading_lights(&self.layers),
            current_light: self.lights.current_id(),
            shading: &self.shading,
            view_mode: self.view_mode,
            show_lights: self.show_lights,
            cursor,
        }
    }

    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        self.lights.drain_events()
    }

    // ----- layers -----

    /// Add a layer on top and make it current.
    ///
    /// `lights` seeds the layer's own light list; empty means one default light.
    pub fn add_layer(&mut self, name: impl Into<String>, maps: impl MapSource + 'static, lights: &[LightSettings]) -> usize {
        let list = self.lights.new_list(lights);
        let index = self.layers.push(Layer::new(name, maps, list));
        self.lights.current_layer_changed(&self.layers);
        self.dirty = true;
        index
    }

    pub fn layer_mut(&mut self, index: usize) -> Result<&mut Layer, LayerError> {
        self.dirty = true;
        self.layers.get_mut(index).ok_or(LayerError::UnknownLayer(index))
    }

    /// Remove every layer.
    pub fn clear_layers(&mut self) {
        self.set_all_layers_selected(false);
        self.layers.clear();
        self.dirty = true;
    }

    pub fn set_current_layer(&mut self, index: usize) -> Result<(), LayerError> {
        self.layers.set_current(index)?;
        self.lights.current_layer_changed(&self.layers);
        self.dirty = true;
        Ok(())
    }

    pub fn set_layer_selected(&mut self, index: usize, selected: bool) -> Result<(), LayerError> {
        let layer = self.layers.get_mut(index).ok_or(LayerError::UnknownLayer(index))?;
        layer.set_selected(selected);
        self.lights.notify(EditorEvent::LayerSelected { index, selected });
        self.dirty = true;
        Ok(())
    }

    pub fn set_all_layers_selected(&mut self, selected: bool) {
        for index in 0..self.layers.len() {
            // Indices are in range by construction.
            let _ = self.set_layer_selected(index, selected);
        }
    }

    pub fn selected_layers(&self) -> Vec<usize> {
        self.layers.selected_indices()
    }

    /// Reorder a layer; later positions draw on top.
    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<(), LayerError> {
        self.layers.move_layer(from, to)?;
        self.dirty = true;
        Ok(())
    }

    /// Top-most layer whose quad contains `point`.
    pub fn layer_at(&self, point: Vec2, viewport: Viewport) -> Option<usize> {
        self.layers.iter().enumerate().rev().find_map(|(index, layer)| {
            let half = layer_half_extents(layer.zoom(), layer.tiling, layer.texture_size(), viewport)?;
            let d = (point - layer.position).abs();
            (d.x < half.x && d.y < half.y).then_some(index)
        })
    }

    /// Remember where the pointer grabbed each selected layer.
    pub(crate) fn begin_layer_drag(&mut self, point: Vec2) {
        for layer in self.layers.iter_mut().filter(|l| l.is_selected()) {
            layer.drag_offset = point - layer.position;
        }
    }

    /// Move the selected layers with the pointer. Tiled axes stay put.
    pub(crate) fn drag_selected_layers(&mut self, point: Vec2) {
        self.for_selected(|l| {
            let target = point - l.drag_offset;
            if !l.tiling.x {
                l.position.x = target.x;
            }
            if !l.tiling.y {
                l.position.y = target.y;
            }
        });
    }

    fn for_selected(&mut self, mut f: impl FnMut(&mut Layer)) {
        for layer in self.layers.iter_mut().filter(|l| l.is_selected()) {
            f(layer);
        }
        self.dirty = true;
    }

    pub fn set_tile_x(&mut self, tile: bool) {
        self.for_selected(|l| l.tiling.x = tile);
    }

    pub fn set_tile_y(&mut self, tile: bool) {
        self.for_selected(|l| l.tiling.y = tile);
    }

    pub fn set_parallax(&mut self, parallax: bool) {
        self.for_selected(|l| l.parallax = parallax);
    }

    /// Set the zoom of the current layer.
    pub fn set_zoom(&mut self, zoom: f32) -> Result<(), LayerError> {
        if let Some(layer) = self.layers.current_mut() {
            layer.set_zoom(zoom)?;
            self.dirty = true;
        }
        Ok(())
    }

    /// Zoom of the current layer, 1 when there is none.
    pub fn zoom(&self) -> f32 {
        self.layers.current().map_or(1.0, Layer::zoom)
    }

    /// Zoom the selected layers by wheel notches (positive zooms in).
    pub fn wheel_zoom(&mut self, notches: i32) {
        if notches == 0 {
            return;
        }
        let factor = if notches > 0 { WHEEL_ZOOM_IN } else { WHEEL_ZOOM_OUT };
        let factor = factor.powi(notches.abs());
        self.for_selected(|l| {
            // A product of positive factors stays positive.
            let _ = l.set_zoom(l.zoom() * factor);
        });
    }

    /// Zoom 1 and centered for the current layer.
    pub fn reset_zoom(&mut self) {
        if let Some(layer) = self.layers.current_mut() {
            layer.position = Vec2::ZERO;
            let _ = layer.set_zoom(1.0);
            self.dirty = true;
        }
    }

    /// Zoom the current layer so it fits the viewport, and center it.
    pub fn fit_zoom(&mut self, viewport: Viewport) {
        if viewport.is_empty() {
            return;
        }
        if let Some(layer) = self.layers.current_mut() {
            let (w, h) = layer.texture_size();
            let size = viewport.size();
            let s = (w as f32 / size.x).max(h as f32 / size.y);
            if s > 0.0 {
                let _ = layer.set_zoom(1.0 / s);
            }
            layer.position = Vec2::ZERO;
            self.dirty = true;
        }
    }

    // ----- lights -----

    /// Add a light copying the current one, in the active list.
    pub fn add_light(&mut self) -> Result<LightId, LightError> {
        let id = self.lights.add_light_like_current(&mut self.layers)?;
        self.dirty = true;
        Ok(id)
    }

    /// Add a copy of `base` to the active list.
    pub fn add_light_from(&mut self, base: &LightSource) -> Result<LightId, LightError> {
        let id = self.lights.add_light(&mut self.layers, base)?;
        self.dirty = true;
        Ok(id)
    }

    pub fn remove_light(&mut self, id: LightId) -> Result<(), LightError> {
        self.lights.remove_light(&mut self.layers, id)?;
        self.dirty = true;
        Ok(())
    }

    pub fn select_light(&mut self, id: LightId) -> Result<(), LightError> {
        self.lights.select_light(&mut self.layers, id)?;
        self.dirty = true;
        Ok(())
    }

    pub fn set_light_mode(&mut self, mode: LightListMode) {
        self.lights.set_mode(&self.layers, mode);
        self.dirty = true;
    }

    pub fn light_at(&self, point: Vec2, half_extents: Vec2) -> Option<LightId> {
        self.lights.light_at(&self.layers, point, half_extents)
    }

    pub(crate) fn light_at_excluding(&self, point: Vec2, half_extents: Vec2, skip: Option<LightId>) -> Option<LightId> {
        self.lights.light_at_excluding(&self.layers, point, half_extents, skip)
    }

    pub fn current_light(&self) -> Option<&LightSource> {
        self.lights.current_light(&self.layers)
    }

    pub(crate) fn move_current_light(&mut self, point: Vec2, half_extents: Vec2) {
        self.lights.move_current_light(&mut self.layers, point, half_extents);
        self.dirty = true;
    }

    pub(crate) fn notify(&mut self, event: EditorEvent) {
        self.lights.notify(event);
    }

    fn edit_current_light(&mut self, f: impl FnOnce(&mut LightSource)) {
        if let Some(light) = self.lights.current_light_mut(&mut self.layers) {
            f(light);
        }
        self.dirty = true;
    }

    pub fn set_light_color(&mut self, color: Color) {
        self.edit_current_light(|l| l.diffuse_color = color);
    }

    pub fn set_specular_color(&mut self, color: Color) {
        self.edit_current_light(|l| l.specular_color = color);
    }

    pub fn set_light_height(&mut self, height: f32) {
        self.edit_current_light(|l| l.set_height(height));
    }

    pub fn set_light_intensity(&mut self, intensity: f32) {
        self.edit_current_light(|l| l.diffuse_intensity = intensity);
    }

    pub fn set_specular_intensity(&mut self, intensity: f32) {
        self.edit_current_light(|l| l.specular_intensity = intensity);
    }

    pub fn set_specular_scatter(&mut self, scatter: f32) {
        self.edit_current_light(|l| l.specular_scatter = scatter);
    }

    // ----- shading -----

    pub fn set_background(&mut self, color: Color) {
        self.shading.background = color;
        self.dirty = true;
    }

    pub fn set_ambient_color(&mut self, color: Color) {
        self.shading.ambient_color = color;
        self.dirty = true;
    }

    pub fn set_ambient_intensity(&mut self, intensity: f32) {
        self.shading.ambient_intensity = intensity;
        self.dirty = true;
    }

    pub fn set_pixelated(&mut self, pixelated: bool) {
        self.shading.pixelated = pixelated;
        self.dirty = true;
    }

    pub fn set_toon(&mut self, toon: bool) {
        self.shading.toon = toon;
        self.dirty = true;
    }

    pub fn set_pixel_size(&mut self, size: u32) {
        self.shading.pixel_size = size.max(1);
        self.dirty = true;
    }

    /// Parallax height from a slider value in thousandths.
    pub fn set_parallax_height(&mut self, height: i32) {
        self.shading.parallax_height = height as f32 / 1000.0;
        self.dirty = true;
    }

    /// Blend factor, clamped to 0..=100.
    pub fn set_blend_factor(&mut self, factor: u8) {
        self.shading.blend_factor = factor.min(100);
        self.dirty = true;
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
        self.dirty = true;
    }

    pub fn set_show_lights(&mut self, show: bool) {
        self.show_lights = show;
        self.dirty = true;
    }
}
