//! Ownership of light lists and the current light selection
//!
//! Two mutually exclusive modes decide which lights are edited and shaded:
//! - `Shared`: one sample list lights every layer
//! - `PerLayer`: each layer carries its own list; the current layer's list is
//!   the edit target and the concatenation of all lists is shaded
//!
//! Switching modes never touches a light. It only re-targets edits and, when
//! needed, moves the selection into the newly active list.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::list::LightList;
use super::source::{LightId, LightSettings, LightSource};
use super::LightError;
use crate::event::{EditorEvent, EventQueue};
use crate::layer::LayerStack;

/// Which light lists are active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LightListMode {
    /// One sample list shared by all layers
    #[default]
    Shared,
    /// Every layer uses its own list
    PerLayer,
}

/// Owns the sample list, the selection and the id allocator.
#[derive(Debug)]
pub struct LightManager {
    sample: LightList,
    mode: LightListMode,
    current: LightId,
    next_id: u64,
    template: LightSettings,
    events: EventQueue,
}

impl LightManager {
    /// A manager whose sample list holds one light built from `template`.
    pub fn new(template: LightSettings) -> Self {
        Self::with_sample_lights(template, &[])
    }

    /// A manager whose sample list holds `lights` (or one template light if empty).
    /// The last light starts selected.
    pub fn with_sample_lights(template: LightSettings, lights: &[LightSettings]) -> Self {
        let mut next_id = 0;
        let sample = Self::build_list(&mut next_id, &template, lights);
        let current = sample.last().id();
        Self { sample, mode: LightListMode::Shared, current, next_id, template, events: EventQueue::default() }
    }

    fn build_list(next_id: &mut u64, template: &LightSettings, lights: &[LightSettings]) -> LightList {
        let mut alloc = || {
            let id = LightId(*next_id);
            *next_id += 1;
            id
        };
        let mut settings = lights.iter();
        let first = settings.next().unwrap_or(template);
        let mut list = LightList::new(LightSource::from_settings(alloc(), first));
        for s in settings {
            list.push(LightSource::from_settings(alloc(), s));
        }
        list
    }

    /// A fresh list for a new layer, from `lights` or one template light.
    pub fn new_list(&mut self, lights: &[LightSettings]) -> LightList {
        Self::build_list(&mut self.next_id, &self.template, lights)
    }

    fn allocate_id(&mut self) -> LightId {
        let id = LightId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn mode(&self) -> LightListMode {
        self.mode
    }

    pub fn sample(&self) -> &LightList {
        &self.sample
    }

    pub fn current_id(&self) -> LightId {
        self.current
    }

    pub fn template(&self) -> &LightSettings {
        &self.template
    }

    /// The list `add_light` and selection target in the current mode.
    pub fn active_list<'a>(&'a self, layers: &'a LayerStack) -> Option<&'a LightList> {
        match self.mode {
            LightListMode::Shared => Some(&self.sample),
            LightListMode::PerLayer => layers.current().map(|l| l.lights()),
        }
    }

    /// Every light that shades the scene, in upload order.
    pub fn shading_lights<'a>(&'a self, layers: &'a LayerStack) -> Vec<&'a LightSource> {
        match self.mode {
            LightListMode::Shared => self.sample.iter().collect(),
            LightListMode::PerLayer => layers.iter().flat_map(|l| l.lights().iter()).collect(),
        }
    }

    /// The current light, if it is reachable in the current mode.
    pub fn current_light<'a>(&'a self, layers: &'a LayerStack) -> Option<&'a LightSource> {
        match self.mode {
            LightListMode::Shared => self.sample.get(self.current),
            LightListMode::PerLayer => layers.iter().find_map(|l| l.lights().get(self.current)),
        }
    }

    pub fn current_light_mut<'a>(&'a mut self, layers: &'a mut LayerStack) -> Option<&'a mut LightSource> {
        let current = self.current;
        match self.mode {
            LightListMode::Shared => self.sample.get_mut(current),
            LightListMode::PerLayer => layers.iter_mut().find_map(|l| l.lights_mut().get_mut(current)),
        }
    }

    /// Append a copy of `base` to the active list and select it.
    pub fn add_light(&mut self, layers: &mut LayerStack, base: &LightSource) -> Result<LightId, LightError> {
        if self.mode == LightListMode::PerLayer && layers.current().is_none() {
            return Err(LightError::NoActiveList);
        }
        let id = self.allocate_id();
        let light = base.copy_settings(id);
        match self.mode {
            LightListMode::Shared => self.sample.push(light),
            LightListMode::PerLayer => {
                if let Some(layer) = layers.current_mut() {
                    layer.lights_mut().push(light);
                }
            }
        }
        self.set_current(id);
        Ok(id)
    }

    /// Add a light copying the current light's settings (or the template).
    pub fn add_light_like_current(&mut self, layers: &mut LayerStack) -> Result<LightId, LightError> {
        let base = match self.current_light(layers) {
            Some(l) => l.clone(),
            None => LightSource::from_settings(self.current, &self.template),
        };
        self.add_light(layers, &base)
    }

    /// Remove a light from the list that owns it.
    ///
    /// Fails without side effects when that list has a single member. When the
    /// removed light was selected, the list's last remaining light is selected.
    pub fn remove_light(&mut self, layers: &mut LayerStack, id: LightId) -> Result<(), LightError> {
        let list = match self.mode {
            LightListMode::Shared => &mut self.sample,
            LightListMode::PerLayer => layers
                .iter_mut()
                .map(|l| l.lights_mut())
                .find(|list| list.contains(id))
                .ok_or(LightError::UnknownLight(id))?,
        };
        list.remove(id)?;
        let fallback = list.last().id();
        log::debug!("removed {}", id);
        if self.current == id {
            self.set_current(fallback);
        }
        Ok(())
    }

    /// Make `id` the current light.
    ///
    /// In per-layer mode the layer owning the light becomes the current layer
    /// so the selection stays inside the active list.
    pub fn select_light(&mut self, layers: &mut LayerStack, id: LightId) -> Result<(), LightError> {
        match self.mode {
            LightListMode::Shared => {
                if !self.sample.contains(id) {
                    return Err(LightError::UnknownLight(id));
                }
            }
            LightListMode::PerLayer => {
                let owner =
                    layers.iter().position(|l| l.lights().contains(id)).ok_or(LightError::UnknownLight(id))?;
                if layers.current_index() != Some(owner) {
                    // Index comes from the stack itself.
                    let _ = layers.set_current(owner);
                }
            }
        }
        self.set_current(id);
        Ok(())
    }

    /// Switch between the shared list and per-layer lists.
    pub fn set_mode(&mut self, layers: &LayerStack, mode: LightListMode) {
        self.mode = mode;
        self.repair_selection(layers);
    }

    /// Re-target after the current layer changed: in per-layer mode the new
    /// layer's last light becomes current.
    pub fn current_layer_changed(&mut self, layers: &LayerStack) {
        if self.mode == LightListMode::PerLayer {
            if let Some(layer) = layers.current() {
                let last = layer.lights().last().id();
                self.set_current(last);
            }
        }
    }

    fn repair_selection(&mut self, layers: &LayerStack) {
        let repair = self.active_list(layers).filter(|l| !l.contains(self.current)).map(|l| l.last().id());
        if let Some(id) = repair {
            self.set_current(id);
        }
    }

    fn set_current(&mut self, id: LightId) {
        self.current = id;
        self.events.push(EditorEvent::LightSelected(id));
    }

    /// First light whose marker contains `point`, searching in list order.
    pub fn light_at(&self, layers: &LayerStack, point: Vec2, half_extents: Vec2) -> Option<LightId> {
        self.light_at_excluding(layers, point, half_extents, None)
    }

    /// Like [`LightManager::light_at`], ignoring the light `skip`.
    pub fn light_at_excluding(
        &self,
        layers: &LayerStack,
        point: Vec2,
        half_extents: Vec2,
        skip: Option<LightId>,
    ) -> Option<LightId> {
        match self.mode {
            LightListMode::Shared => self.sample.hit_test_excluding(point, half_extents, skip),
            LightListMode::PerLayer => {
                layers.iter().find_map(|l| l.lights().hit_test_excluding(point, half_extents, skip))
            }
        }
    }

    /// Move the current light to `point`, keeping its marker inside the viewport.
    pub fn move_current_light(&mut self, layers: &mut LayerStack, point: Vec2, half_extents: Vec2) {
        let Some(light) = self.current_light_mut(layers) else {
            return;
        };
        let (w, h) = (half_extents.x, half_extents.y);
        light.position.x = if point.x >= 1.0 - w / 2.0 {
            1.0 - w / 2.0
        } else if point.x < -1.0 + w / 2.0 {
            -1.0 + w / 2.0
        } else {
            point.x
        };
        light.position.y = if point.y > 1.0 - h / 2.0 {
            1.0 - h / 2.0
        } else if point.y < -1.0 + h / 2.0 {
            -1.0 + h / 2.0
        } else {
            point.y
        };
    }

    /// Queue a UI notification.
    pub(crate) fn notify(&mut self, event: EditorEvent) {
        self.events.push(event);
    }

    /// Take all queued notifications.
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        self.events.drain()
    }
}
