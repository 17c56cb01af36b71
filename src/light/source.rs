//! A single point light

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Stable identity of a light across list edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(pub(crate) u64);

impl std::fmt::Display for LightId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "light#{}", self.0)
    }
}

/// Serializable light attributes, as found in config and scene files
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightSettings {
    /// `[x, y, height]`, x and y in device space
    #[serde(default = "default_position")]
    pub position: [f32; 3],
    #[serde(default = "default_light_color")]
    pub diffuse_color: Color,
    #[serde(default = "default_light_color")]
    pub specular_color: Color,
    #[serde(default = "default_intensity")]
    pub diffuse_intensity: f32,
    #[serde(default = "default_intensity")]
    pub specular_intensity: f32,
    /// Specular exponent
    #[serde(default = "default_scatter")]
    pub specular_scatter: f32,
}

fn default_position() -> [f32; 3] {
    [0.7, 0.7, 0.3]
}

fn default_light_color() -> Color {
    Color::rgb(0.0, 1.0, 0.7)
}

fn default_intensity() -> f32 {
    0.6
}

fn default_scatter() -> f32 {
    32.0
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            position: default_position(),
            diffuse_color: default_light_color(),
            specular_color: default_light_color(),
            diffuse_intensity: default_intensity(),
            specular_intensity: default_intensity(),
            specular_scatter: default_scatter(),
        }
    }
}

/// A point light. `position.z` is the height above the sprite plane.
#[derive(Debug, Clone, PartialEq)]
pub struct LightSource {
    id: LightId,
    pub position: Vec3,
    pub diffuse_color: Color,
    pub specular_color: Color,
    pub diffuse_intensity: f32,
    pub specular_intensity: f32,
    pub specular_scatter: f32,
}

impl LightSource {
    pub(crate) fn from_settings(id: LightId, s: &LightSettings) -> Self {
        Self {
            id,
            position: Vec3::from_array(s.position),
            diffuse_color: s.diffuse_color,
            specular_color: s.specular_color,
            diffuse_intensity: s.diffuse_intensity,
            specular_intensity: s.specular_intensity,
            specular_scatter: s.specular_scatter,
        }
    }

    pub fn id(&self) -> LightId {
        self.id
    }

    /// A new light carrying every setting of `self` under a fresh id.
    pub(crate) fn copy_settings(&self, id: LightId) -> Self {
        Self { id, ..self.clone() }
    }

    pub fn settings(&self) -> LightSettings {
        LightSettings {
            position: self.position.to_array(),
            diffuse_color: self.diffuse_color,
            specular_color: self.specular_color,
            diffuse_intensity: self.diffuse_intensity,
            specular_intensity: self.specular_intensity,
            specular_scatter: self.specular_scatter,
        }
    }

    pub fn height(&self) -> f32 {
        self.position.z
    }

    pub fn set_height(&mut self, height: f32) {
        self.position.z = height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_settings_keeps_everything_but_id() {
        let a = LightSource::from_settings(LightId(1), &LightSettings::default());
        let b = a.copy_settings(LightId(2));
        assert_eq!(b.id(), LightId(2));
        assert_eq!(a.settings(), b.settings());
    }

    #[test]
    fn test_settings_defaults_from_toml() {
        let s: LightSettings = toml::from_str("diffuse_intensity = 0.9").unwrap();
        assert_eq!(s.diffuse_intensity, 0.9);
        assert_eq!(s.specular_scatter, 32.0);
        assert_eq!(s.position, [0.7, 0.7, 0.3]);
    }
}
