//! Pointer handling for the preview canvas
//!
//! Positions arrive in screen pixels (origin top-left). A press picks, in
//! priority order: the brush, the add-light commit, a light marker, then the
//! top-most layer under the pointer.

use glam::Vec2;

use crate::coords::screen_to_device;
use crate::device::RenderDevice;
use crate::engine::PreviewEngine;
use crate::event::EditorEvent;
use crate::light::LightError;
use crate::scene::ViewMode;

/// Mouse buttons the canvas reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Middle,
    Right,
}

/// Buttons held during a move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Buttons {
    pub left: bool,
    pub middle: bool,
    pub right: bool,
}

impl Buttons {
    pub const NONE: Buttons = Buttons { left: false, middle: false, right: false };
    pub const LEFT: Buttons = Buttons { left: true, middle: false, right: false };
}

/// Keyboard modifiers relevant to picking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Add to the layer selection instead of replacing it
    pub multi_select: bool,
}

impl<D: RenderDevice> PreviewEngine<D> {
    fn brush_painting(&self) -> bool {
        self.brush.as_ref().is_some_and(|b| b.is_active())
    }

    fn half_marker(&self) -> Vec2 {
        self.marker_half_extents().unwrap_or(Vec2::ZERO)
    }

    /// Enter or leave add-light mode.
    ///
    /// Entering adds a copy of the current light that follows the pointer.
    /// Calling it again while adding commits that light and starts another.
    /// Leaving discards the provisional light.
    pub fn set_add_light(&mut self, add: bool) -> Result<(), LightError> {
        if add {
            self.scene.add_light()?;
            let pointer = self.pointer.and_then(|p| screen_to_device(p.x, p.y, self.viewport));
            if let Some(p) = pointer {
                let half = self.half_marker();
                self.scene.move_current_light(p, half);
            }
        } else if self.adding_light {
            let provisional = self.scene.lights().current_id();
            match self.scene.remove_light(provisional) {
                Ok(()) | Err(LightError::CannotRemoveLast) => {}
                Err(e) => return Err(e),
            }
        }
        self.adding_light = add;
        Ok(())
    }

    /// A button went down at screen position `(x, y)`.
    pub fn pointer_press(&mut self, x: f32, y: f32, button: PointerButton, modifiers: Modifiers) -> Result<(), LightError> {
        self.pointer = Some(Vec2::new(x, y));
        let Some(p) = screen_to_device(x, y, self.viewport) else {
            return Ok(());
        };
        let half = self.half_marker();

        match button {
            PointerButton::Left | PointerButton::Middle => {
                if button == PointerButton::Left && self.brush_painting() && !self.adding_light {
                    if let Some(texel) = self.texel_under(p) {
                        self.last_brush_texel = texel;
                        if let Some(brush) = self.brush.as_mut() {
                            brush.press(texel);
                        }
                        self.scene.mark_dirty();
                    }
                    return Ok(());
                }
                if self.adding_light {
                    return self.set_add_light(true);
                }
                let lights_visible = self.scene.show_lights() && self.scene.view_mode() == ViewMode::Edit;
                if let Some(id) = lights_visible.then(|| self.scene.light_at(p, half)).flatten() {
                    self.scene.select_light(id)?;
                    self.dragging_light = true;
                    self.scene.notify(EditorEvent::LightControlsEnabled(true));
                    return Ok(());
                }

                self.scene.notify(EditorEvent::LightControlsEnabled(false));
                if !modifiers.multi_select {
                    self.scene.set_all_layers_selected(false);
                }
                if let Some(index) = self.scene.layer_at(p, self.viewport) {
                    // Index comes from the scene itself.
                    let _ = self.scene.set_current_layer(index);
                    let _ = self.scene.set_layer_selected(index, true);
                }
                self.scene.begin_layer_drag(p);
            }
            PointerButton::Right => {
                let skip = self.adding_light.then(|| self.scene.lights().current_id());
                match self.scene.light_at_excluding(p, half, skip) {
                    Some(id) => match self.scene.remove_light(id) {
                        Ok(()) | Err(LightError::CannotRemoveLast) => {}
                        Err(e) => return Err(e),
                    },
                    None if self.adding_light => self.set_add_light(false)?,
                    None => {}
                }
            }
        }
        self.scene.mark_dirty();
        Ok(())
    }

    /// The pointer moved to `(x, y)` with `buttons` held.
    pub fn pointer_move(&mut self, x: f32, y: f32, buttons: Buttons) {
        self.pointer = Some(Vec2::new(x, y));
        let Some(p) = screen_to_device(x, y, self.viewport) else {
            return;
        };

        if self.adding_light {
            let half = self.half_marker();
            self.scene.move_current_light(p, half);
            return;
        }

        let painting = self.brush_painting();
        if buttons.left || buttons.middle {
            if self.dragging_light {
                let half = self.half_marker();
                self.scene.move_current_light(p, half);
            } else if painting && buttons.left {
                if let Some(texel) = self.texel_under(p) {
                    let from = self.last_brush_texel;
                    if let Some(brush) = self.brush.as_mut() {
                        brush.stroke(from, texel);
                    }
                    self.last_brush_texel = texel;
                }
            } else {
                self.scene.drag_selected_layers(p);
            }
        }
        if painting {
            // The cursor follows the pointer.
            self.scene.mark_dirty();
        }
    }

    /// A button was released.
    pub fn pointer_release(&mut self, _button: PointerButton) {
        self.dragging_light = false;
    }

    /// Mouse wheel over the canvas; positive notches zoom in.
    pub fn wheel(&mut self, notches: i32) {
        self.scene.wheel_zoom(notches);
    }
}
