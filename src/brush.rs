//! The painting tool seam
//!
//! Brushes are implemented by the editor. The preview only forwards pointer
//! positions to them, in the texel space of the current layer, and draws
//! their cursor sprite.

use glam::Vec2;
use image::RgbaImage;

/// A painting tool driven by the preview's pointer input
pub trait Brush {
    /// Whether the tool is selected and painting
    fn is_active(&self) -> bool;

    /// Sprite drawn under the pointer while the brush is active
    fn cursor_sprite(&self) -> &RgbaImage;

    /// A stroke starts at `at`, in current-layer texels.
    fn press(&mut self, at: Vec2);

    /// The pointer moved from `from` to `to` while painting.
    fn stroke(&mut self, from: Vec2, to: Vec2);
}
