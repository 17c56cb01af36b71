//! Configuration schema types for `spritelight.toml`
//!
//! Every section is optional; a missing file or section yields the defaults
//! the editor starts with.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::light::{LightListMode, LightSettings};
use crate::scene::{ShadingParams, ViewMode};
use crate::schedule::DEFAULT_REFRESH_HZ;

/// Initial scene state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Ambient, background and shading switches
    #[serde(flatten)]
    pub shading: ShadingParams,
    /// Draw light markers in edit mode
    #[serde(default = "default_show_lights")]
    pub show_lights: bool,
    #[serde(default)]
    pub light_mode: LightListMode,
    #[serde(default)]
    pub view_mode: ViewMode,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            shading: ShadingParams::default(),
            show_lights: default_show_lights(),
            light_mode: LightListMode::default(),
            view_mode: ViewMode::default(),
        }
    }
}

fn default_show_lights() -> bool {
    true
}

/// Interactive preview settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Redraw rate of the frame clock
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: f32,
    /// Viewport width in pixels
    #[serde(default = "default_width")]
    pub width: u32,
    /// Viewport height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
    /// Light marker icon; the built-in disc when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_icon: Option<PathBuf>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            refresh_hz: default_refresh_hz(),
            width: default_width(),
            height: default_height(),
            marker_icon: None,
        }
    }
}

fn default_refresh_hz() -> f32 {
    DEFAULT_REFRESH_HZ
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

/// Export defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Autosave directory; next to each source image when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// Write exported images to disk
    #[serde(default)]
    pub autosave: bool,
    /// Export the composited canvas instead of one image per layer
    #[serde(default)]
    pub full_canvas: bool,
}

/// Complete `spritelight.toml` configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpritelightConfig {
    #[serde(default)]
    pub scene: SceneConfig,
    /// Template for new lights and the first sample light
    #[serde(default)]
    pub light: LightSettings,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "scene.ambient_intensity")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spritelight.toml: '{}' {}", self.field, self.message)
    }
}

fn error(field: &str, message: &str) -> ConfigValidationError {
    ConfigValidationError { field: field.to_string(), message: message.to_string() }
}

impl SpritelightConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let shading = &self.scene.shading;

        if !shading.ambient_intensity.is_finite() || shading.ambient_intensity < 0.0 {
            errors.push(error("scene.ambient_intensity", "must be a non-negative number"));
        }
        if shading.pixel_size == 0 {
            errors.push(error("scene.pixel_size", "must be a positive integer"));
        }
        if shading.blend_factor > 100 {
            errors.push(error("scene.blend_factor", "must be between 0 and 100"));
        }
        if !shading.parallax_height.is_finite() {
            errors.push(error("scene.parallax_height", "must be a finite number"));
        }

        let light = &self.light;
        if !light.position.iter().all(|c| c.is_finite()) {
            errors.push(error("light.position", "must contain finite numbers"));
        }
        if light.diffuse_intensity < 0.0 {
            errors.push(error("light.diffuse_intensity", "must be non-negative"));
        }
        if light.specular_intensity < 0.0 {
            errors.push(error("light.specular_intensity", "must be non-negative"));
        }
        if !light.specular_scatter.is_finite() || light.specular_scatter <= 0.0 {
            errors.push(error("light.specular_scatter", "must be positive"));
        }

        if !self.preview.refresh_hz.is_finite() || self.preview.refresh_hz <= 0.0 {
            errors.push(error("preview.refresh_hz", "must be a positive number"));
        }
        if self.preview.width == 0 || self.preview.height == 0 {
            errors.push(error("preview", "viewport dimensions must be positive"));
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: SpritelightConfig = toml::from_str("").unwrap();
        assert_eq!(config, SpritelightConfig::default());
        assert!(config.scene.show_lights);
        assert_eq!(config.preview.width, 800);
        assert_eq!(config.preview.height, 600);
        assert_eq!(config.preview.refresh_hz, 30.0);
        assert!(config.is_valid());
    }

    #[test]
    fn test_scene_section_is_flat() {
        let config: SpritelightConfig = toml::from_str(
            r##"
[scene]
background = "#ff0000"
ambient_intensity = 0.5
toon = true
light_mode = "per-layer"
view_mode = "preview"
"##,
        )
        .unwrap();
        assert_eq!(config.scene.shading.background, Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(config.scene.shading.ambient_intensity, 0.5);
        assert!(config.scene.shading.toon);
        assert_eq!(config.scene.shading.pixel_size, 3);
        assert_eq!(config.scene.light_mode, LightListMode::PerLayer);
        assert_eq!(config.scene.view_mode, ViewMode::Preview);
    }

    #[test]
    fn test_light_section() {
        let config: SpritelightConfig = toml::from_str(
            r#"
[light]
position = [0.0, 0.5, 0.2]
diffuse_color = "white"
"#,
        )
        .unwrap();
        assert_eq!(config.light.position, [0.0, 0.5, 0.2]);
        assert_eq!(config.light.diffuse_color, Color::WHITE);
        assert_eq!(config.light.specular_scatter, 32.0);
    }

    #[test]
    fn test_validate_reports_every_field() {
        let mut config = SpritelightConfig::default();
        config.scene.shading.pixel_size = 0;
        config.scene.shading.blend_factor = 150;
        config.preview.refresh_hz = 0.0;
        config.light.specular_scatter = 0.0;

        let fields: Vec<String> = config.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["scene.pixel_size", "scene.blend_factor", "light.specular_scatter", "preview.refresh_hz"]
        );
    }

    #[test]
    fn test_serialized_config_loads_back() {
        let mut config = SpritelightConfig::default();
        config.export.directory = Some(PathBuf::from("out"));
        config.scene.shading.toon = true;
        let text = toml::to_string_pretty(&config).unwrap();
        let back: SpritelightConfig = toml::from_str(&text).unwrap();
        // Colors are written as 8-bit hex
        assert_eq!(back.export, config.export);
        assert_eq!(back.preview, config.preview);
        assert!(back.scene.shading.toon);
        assert!(back.is_valid());
    }
}
