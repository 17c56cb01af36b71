//! Sprite layers: the per-sprite maps and placement the preview consumes
//!
//! The image processing that derives normal, specular, parallax and occlusion
//! maps lives elsewhere. A layer only exposes the current frame's maps through
//! [`MapSource`], together with its placement on the canvas and its own lights.

use glam::Vec2;
use image::RgbaImage;
use thiserror::Error;

use crate::coords::Tiling;
use crate::light::LightList;

/// Error for layer mutations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayerError {
    /// Zoom must be finite and strictly positive
    #[error("invalid zoom {0}, must be a finite value > 0")]
    InvalidZoom(f32),
    /// Layer index out of range
    #[error("no layer at index {0}")]
    UnknownLayer(usize),
}

/// The five lighting maps, in texture-unit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKind {
    Diffuse,
    Normal,
    Parallax,
    Specular,
    Occlusion,
}

impl MapKind {
    pub const ALL: [MapKind; 5] =
        [MapKind::Diffuse, MapKind::Normal, MapKind::Parallax, MapKind::Specular, MapKind::Occlusion];

    /// Fixed texture unit of this map
    pub fn unit(self) -> usize {
        match self {
            MapKind::Diffuse => 0,
            MapKind::Normal => 1,
            MapKind::Parallax => 2,
            MapKind::Specular => 3,
            MapKind::Occlusion => 4,
        }
    }
}

/// Access to the maps of a sprite's current animation frame.
///
/// Returning `None` means "no image for this slot in this frame"; the renderer
/// then keeps whatever texture was bound before.
pub trait MapSource {
    fn map(&self, kind: MapKind) -> Option<&RgbaImage>;
}

/// The maps of one frame. Any slot may be absent.
#[derive(Debug, Clone, Default)]
pub struct MapSet {
    pub diffuse: Option<RgbaImage>,
    pub normal: Option<RgbaImage>,
    pub specular: Option<RgbaImage>,
    pub parallax: Option<RgbaImage>,
    pub occlusion: Option<RgbaImage>,
}

impl MapSet {
    pub fn with_diffuse(diffuse: RgbaImage) -> Self {
        Self { diffuse: Some(diffuse), ..Default::default() }
    }

    pub fn get(&self, kind: MapKind) -> Option<&RgbaImage> {
        match kind {
            MapKind::Diffuse => self.diffuse.as_ref(),
            MapKind::Normal => self.normal.as_ref(),
            MapKind::Specular => self.specular.as_ref(),
            MapKind::Parallax => self.parallax.as_ref(),
            MapKind::Occlusion => self.occlusion.as_ref(),
        }
    }

    pub fn set(&mut self, kind: MapKind, image: Option<RgbaImage>) {
        let slot = match kind {
            MapKind::Diffuse => &mut self.diffuse,
            MapKind::Normal => &mut self.normal,
            MapKind::Specular => &mut self.specular,
            MapKind::Parallax => &mut self.parallax,
            MapKind::Occlusion => &mut self.occlusion,
        };
        *slot = image;
    }
}

/// In-memory frames of a sprite with a current frame cursor
#[derive(Debug, Clone)]
pub struct SpriteMaps {
    frames: Vec<MapSet>,
    current: usize,
}

impl SpriteMaps {
    pub fn new(frame: MapSet) -> Self {
        Self { frames: vec![frame], current: 0 }
    }

    /// Build from a frame sequence. An empty sequence becomes one empty frame.
    pub fn from_frames(frames: Vec<MapSet>) -> Self {
        if frames.is_empty() {
            return Self::new(MapSet::default());
        }
        Self { frames, current: 0 }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> usize {
        self.current
    }

    /// Step to the next frame, wrapping at the end.
    pub fn advance_frame(&mut self) {
        self.current = (self.current + 1) % self.frames.len();
    }

    pub fn set_frame(&mut self, index: usize) {
        self.current = index % self.frames.len();
    }
}

impl MapSource for SpriteMaps {
    fn map(&self, kind: MapKind) -> Option<&RgbaImage> {
        self.frames[self.current].get(kind)
    }
}

/// One sprite on the canvas.
pub struct Layer {
    name: String,
    maps: Box<dyn MapSource>,
    /// Pan offset in device space
    pub position: Vec2,
    zoom: f32,
    pub tiling: Tiling,
    /// Parallax mapping requested for this layer
    pub parallax: bool,
    selected: bool,
    /// Pointer offset captured when a drag starts
    pub(crate) drag_offset: Vec2,
    lights: LightList,
    fallback_size: (u32, u32),
}

impl Layer {
    /// Create a layer at the canvas center, zoom 1, untiled.
    pub fn new(name: impl Into<String>, maps: impl MapSource + 'static, lights: LightList) -> Self {
        let fallback_size = maps.map(MapKind::Diffuse).map(|i| i.dimensions()).unwrap_or((1, 1));
        Self {
            name: name.into(),
            maps: Box::new(maps),
            position: Vec2::ZERO,
            zoom: 1.0,
            tiling: Tiling::NONE,
            parallax: false,
            selected: false,
            drag_offset: Vec2::ZERO,
            lights,
            fallback_size,
        }
    }

    /// Display name; usually the diffuse source path, used for autosave naming.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn map(&self, kind: MapKind) -> Option<&RgbaImage> {
        self.maps.map(kind)
    }

    /// Texel size of the current diffuse map, or the last known size.
    pub fn texture_size(&self) -> (u32, u32) {
        self.maps.map(MapKind::Diffuse).map(|i| i.dimensions()).unwrap_or(self.fallback_size)
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) -> Result<(), LayerError> {
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(LayerError::InvalidZoom(zoom));
        }
        self.zoom = zoom;
        Ok(())
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn lights(&self) -> &LightList {
        &self.lights
    }

    pub(crate) fn lights_mut(&mut self) -> &mut LightList {
        &mut self.lights
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("zoom", &self.zoom)
            .field("tiling", &self.tiling)
            .field("parallax", &self.parallax)
            .field("selected", &self.selected)
            .field("lights", &self.lights.len())
            .finish()
    }
}

/// Layers in draw order (later entries on top) plus the current layer.
#[derive(Debug, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
    current: Option<usize>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer on top and make it current. Returns its index.
    pub fn push(&mut self, layer: Layer) -> usize {
        self.layers.push(layer);
        let index = self.layers.len() - 1;
        self.current = Some(index);
        index
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.current = None;
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Layer> {
        self.layers.iter_mut()
    }

    pub fn as_slice(&self) -> &[Layer] {
        &self.layers
    }

    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&Layer> {
        self.current.and_then(|i| self.layers.get(i))
    }

    pub fn current_mut(&mut self) -> Option<&mut Layer> {
        self.current.and_then(move |i| self.layers.get_mut(i))
    }

    pub fn set_current(&mut self, index: usize) -> Result<(), LayerError> {
        if index >= self.layers.len() {
            return Err(LayerError::UnknownLayer(index));
        }
        self.current = Some(index);
        Ok(())
    }

    /// Indices of all selected layers, in draw order.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.layers.iter().enumerate().filter(|(_, l)| l.is_selected()).map(|(i, _)| i).collect()
    }

    /// Move a layer to a new draw position. The current layer follows its layer.
    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<(), LayerError> {
        if from >= self.layers.len() {
            return Err(LayerError::UnknownLayer(from));
        }
        if to >= self.layers.len() {
            return Err(LayerError::UnknownLayer(to));
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        self.current = self.current.map(|c| {
            if c == from {
                to
            } else if from < c && c <= to {
                c - 1
            } else if to <= c && c < from {
                c + 1
            } else {
                c
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::{LightId, LightSettings, LightSource};

    fn layer(name: &str, w: u32, h: u32) -> Layer {
        let maps = SpriteMaps::new(MapSet::with_diffuse(RgbaImage::new(w, h)));
        let lights = LightList::new(LightSource::from_settings(LightId(0), &LightSettings::default()));
        Layer::new(name, maps, lights)
    }

    #[test]
    fn test_zoom_must_be_positive() {
        let mut l = layer("a", 4, 4);
        assert_eq!(l.set_zoom(0.0), Err(LayerError::InvalidZoom(0.0)));
        assert!(l.set_zoom(-1.0).is_err());
        assert!(l.set_zoom(f32::NAN).is_err());
        assert_eq!(l.zoom(), 1.0);
        l.set_zoom(2.5).unwrap();
        assert_eq!(l.zoom(), 2.5);
    }

    #[test]
    fn test_texture_size_falls_back_when_frame_lacks_diffuse() {
        let frames = vec![MapSet::with_diffuse(RgbaImage::new(8, 6)), MapSet::default()];
        let lights = LightList::new(LightSource::from_settings(LightId(0), &LightSettings::default()));
        let mut maps = SpriteMaps::from_frames(frames);
        maps.advance_frame();
        let l = Layer::new("anim", maps, lights);
        assert!(l.map(MapKind::Diffuse).is_none());
        assert_eq!(l.texture_size(), (8, 6));
    }

    #[test]
    fn test_sprite_maps_wraps_frames() {
        let mut maps = SpriteMaps::from_frames(vec![MapSet::default(), MapSet::default()]);
        maps.advance_frame();
        maps.advance_frame();
        assert_eq!(maps.current_frame(), 0);
        assert_eq!(SpriteMaps::from_frames(vec![]).frame_count(), 1);
    }

    #[test]
    fn test_stack_push_sets_current() {
        let mut stack = LayerStack::new();
        assert_eq!(stack.push(layer("a", 2, 2)), 0);
        assert_eq!(stack.push(layer("b", 2, 2)), 1);
        assert_eq!(stack.current().map(Layer::name), Some("b"));
        stack.clear();
        assert!(stack.current().is_none());
    }

    #[test]
    fn test_move_layer_tracks_current() {
        let mut stack = LayerStack::new();
        stack.push(layer("a", 2, 2));
        stack.push(layer("b", 2, 2));
        stack.push(layer("c", 2, 2));
        stack.set_current(0).unwrap();
        stack.move_layer(0, 2).unwrap();
        let names: Vec<_> = stack.iter().map(Layer::name).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
        assert_eq!(stack.current_index(), Some(2));
        assert!(stack.move_layer(5, 0).is_err());
    }

    #[test]
    fn test_map_kind_units_are_fixed() {
        let units: Vec<_> = MapKind::ALL.iter().map(|k| k.unit()).collect();
        assert_eq!(units, vec![0, 1, 2, 3, 4]);
    }
}
