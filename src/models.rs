//! Scene description files
//!
//! A scene file lists the layers to preview, each with its lighting maps,
//! placement and own lights, plus the sample lights and shading overrides.
//! TOML and JSON are accepted, chosen by file extension:
//!
//! ```toml
//! light_mode = "per-layer"
//!
//! [shading]
//! toon = true
//!
//! [[lights]]
//! position = [0.5, 0.5, 0.3]
//! diffuse_color = "white"
//!
//! [[layers]]
//! diffuse = "hero.png"
//! normal = "hero_n.png"
//! position = [-0.2, 0.0]
//! zoom = 2.0
//! ```
//!
//! Map paths are relative to the scene file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::color::Color;
use crate::config::{resolve_path, SpritelightConfig};
use crate::layer::{LayerError, MapKind, MapSet, SpriteMaps};
use crate::light::{LightListMode, LightManager, LightSettings};
use crate::scene::{Scene, ShadingParams, ViewMode};

/// Error loading a scene file
#[derive(Debug, Error)]
pub enum SceneFileError {
    #[error("Cannot read scene file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid TOML scene: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid JSON scene: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cannot load image '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Unsupported scene format '{0}' (expected .toml or .json)")]
    UnsupportedFormat(PathBuf),
    #[error(transparent)]
    Layer(#[from] LayerError),
}

/// Scene file syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneFormat {
    Toml,
    Json,
}

impl SceneFormat {
    /// Format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Shading values overriding the configured ones
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShadingOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambient_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambient_intensity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixelated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toon: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallax_height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend_factor: Option<u8>,
}

impl ShadingOverrides {
    /// `base` with every present override applied.
    pub fn apply(&self, base: ShadingParams) -> ShadingParams {
        ShadingParams {
            background: self.background.unwrap_or(base.background),
            ambient_color: self.ambient_color.unwrap_or(base.ambient_color),
            ambient_intensity: self.ambient_intensity.unwrap_or(base.ambient_intensity),
            pixelated: self.pixelated.unwrap_or(base.pixelated),
            toon: self.toon.unwrap_or(base.toon),
            pixel_size: self.pixel_size.unwrap_or(base.pixel_size).max(1),
            parallax_height: self.parallax_height.unwrap_or(base.parallax_height),
            blend_factor: self.blend_factor.unwrap_or(base.blend_factor).min(100),
        }
    }
}

/// One layer of a scene file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Diffuse map; also names the layer for autosave
    pub diffuse: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallax_map: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occlusion: Option<PathBuf>,
    /// Device-space offset from the canvas center
    #[serde(default)]
    pub position: [f32; 2],
    #[serde(default = "default_zoom")]
    pub zoom: f32,
    #[serde(default)]
    pub tile_x: bool,
    #[serde(default)]
    pub tile_y: bool,
    /// Enable parallax mapping for this layer
    #[serde(default)]
    pub parallax: bool,
    /// The layer's own light list; one template light when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lights: Vec<LightSettings>,
}

fn default_zoom() -> f32 {
    1.0
}

impl LayerSpec {
    fn map_paths(&self) -> [(MapKind, Option<&PathBuf>); 5] {
        [
            (MapKind::Diffuse, Some(&self.diffuse)),
            (MapKind::Normal, self.normal.as_ref()),
            (MapKind::Specular, self.specular.as_ref()),
            (MapKind::Parallax, self.parallax_map.as_ref()),
            (MapKind::Occlusion, self.occlusion.as_ref()),
        ]
    }
}

/// Top level of a scene file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_mode: Option<LightListMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_mode: Option<ViewMode>,
    #[serde(default)]
    pub shading: ShadingOverrides,
    /// Sample lights shared by all layers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lights: Vec<LightSettings>,
    /// Layers in draw order, bottom first
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
}

/// Parse scene file text.
pub fn parse_scene(text: &str, format: SceneFormat) -> Result<SceneFile, SceneFileError> {
    Ok(match format {
        SceneFormat::Toml => toml::from_str(text)?,
        SceneFormat::Json => serde_json::from_str(text)?,
    })
}

/// Read and parse a scene file.
pub fn read_scene_file(path: &Path) -> Result<SceneFile, SceneFileError> {
    let format = SceneFormat::from_path(path).ok_or_else(|| SceneFileError::UnsupportedFormat(path.to_path_buf()))?;
    let text = fs::read_to_string(path).map_err(|source| SceneFileError::Io { path: path.to_path_buf(), source })?;
    parse_scene(&text, format)
}

fn load_image(path: &Path) -> Result<image::RgbaImage, SceneFileError> {
    let img = image::open(path).map_err(|source| SceneFileError::Image { path: path.to_path_buf(), source })?;
    Ok(img.to_rgba8())
}

/// Build a scene from a parsed file. Relative map paths resolve against `base_dir`.
pub fn build_scene(file: &SceneFile, base_dir: &Path, config: &SpritelightConfig) -> Result<Scene, SceneFileError> {
    let shading = file.shading.apply(config.scene.shading);
    let lights = LightManager::with_sample_lights(config.light, &file.lights);
    let mut scene = Scene::new(shading, lights);
    scene.set_show_lights(config.scene.show_lights);
    scene.set_view_mode(file.view_mode.unwrap_or(config.scene.view_mode));

    for spec in &file.layers {
        let mut maps = MapSet::default();
        for (kind, path) in spec.map_paths() {
            if let Some(path) = path {
                maps.set(kind, Some(load_image(&resolve_path(base_dir, path))?));
            }
        }
        let name = resolve_path(base_dir, &spec.diffuse).to_string_lossy().into_owned();
        let index = scene.add_layer(name, SpriteMaps::new(maps), &spec.lights);
        let layer = scene.layer_mut(index)?;
        layer.position = spec.position.into();
        layer.tiling.x = spec.tile_x;
        layer.tiling.y = spec.tile_y;
        layer.parallax = spec.parallax;
        layer.set_zoom(spec.zoom)?;
    }
    log::debug!("built scene with {} layers", scene.layers().len());

    scene.set_light_mode(file.light_mode.unwrap_or(config.scene.light_mode));
    Ok(scene)
}

/// Load a scene file and every image it names.
pub fn load_scene(path: &Path, config: &SpritelightConfig) -> Result<Scene, SceneFileError> {
    let file = read_scene_file(path)?;
    let base_dir = path.parent().unwrap_or(Path::new(""));
    build_scene(&file, base_dir, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32) {
        RgbaImage::from_pixel(w, h, Rgba([200, 100, 50, 255])).save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SceneFormat::from_path(Path::new("a.toml")), Some(SceneFormat::Toml));
        assert_eq!(SceneFormat::from_path(Path::new("a.JSON")), Some(SceneFormat::Json));
        assert_eq!(SceneFormat::from_path(Path::new("a.yaml")), None);
        assert_eq!(SceneFormat::from_path(Path::new("scene")), None);
    }

    #[test]
    fn test_parse_toml_scene() {
        let file = parse_scene(
            r#"
light_mode = "per-layer"

[shading]
toon = true
blend_factor = 40

[[lights]]
position = [0.1, 0.2, 0.3]

[[layers]]
diffuse = "a.png"
normal = "a_n.png"
zoom = 2.0
tile_x = true
"#,
            SceneFormat::Toml,
        )
        .unwrap();
        assert_eq!(file.light_mode, Some(LightListMode::PerLayer));
        assert_eq!(file.shading.toon, Some(true));
        assert_eq!(file.lights.len(), 1);
        assert_eq!(file.layers.len(), 1);
        assert_eq!(file.layers[0].normal, Some(PathBuf::from("a_n.png")));
        assert_eq!(file.layers[0].position, [0.0, 0.0]);
        assert!(file.layers[0].tile_x);
    }

    #[test]
    fn test_parse_json_scene() {
        let file = parse_scene(
            r#"{"layers": [{"diffuse": "a.png", "position": [0.5, -0.5]}], "view_mode": "preview"}"#,
            SceneFormat::Json,
        )
        .unwrap();
        assert_eq!(file.view_mode, Some(ViewMode::Preview));
        assert_eq!(file.layers[0].position, [0.5, -0.5]);
        assert_eq!(file.layers[0].zoom, 1.0);
    }

    #[test]
    fn test_overrides_apply_on_top_of_base() {
        let overrides = ShadingOverrides { toon: Some(true), blend_factor: Some(250), ..Default::default() };
        let base = ShadingParams { pixelated: true, ..ShadingParams::default() };
        let shading = overrides.apply(base);
        assert!(shading.toon);
        assert!(shading.pixelated);
        assert_eq!(shading.blend_factor, 100);
    }

    #[test]
    fn test_load_scene_builds_layers() {
        let temp = TempDir::new().unwrap();
        write_png(temp.path(), "a.png", 8, 4);
        write_png(temp.path(), "a_n.png", 8, 4);
        write_png(temp.path(), "b.png", 3, 3);
        let path = temp.path().join("scene.toml");
        fs::write(
            &path,
            r#"
[[layers]]
diffuse = "a.png"
normal = "a_n.png"
position = [0.25, 0.0]

[[layers]]
diffuse = "b.png"
zoom = 3.0
tile_y = true
parallax = true

[[layers.lights]]
diffuse_intensity = 1.0

[[layers.lights]]
diffuse_intensity = 0.5
"#,
        )
        .unwrap();

        let scene = load_scene(&path, &SpritelightConfig::default()).unwrap();
        let layers = scene.layers();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers.current_index(), Some(1));

        let a = layers.get(0).unwrap();
        assert_eq!(a.name(), temp.path().join("a.png").to_string_lossy());
        assert!(a.map(MapKind::Normal).is_some());
        assert!(a.map(MapKind::Specular).is_none());
        assert_eq!(a.position.x, 0.25);

        let b = layers.get(1).unwrap();
        assert_eq!(b.texture_size(), (3, 3));
        assert_eq!(b.zoom(), 3.0);
        assert!(b.tiling.y && !b.tiling.x);
        assert!(b.parallax);
        assert_eq!(b.lights().len(), 2);
    }

    #[test]
    fn test_load_scene_missing_image() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scene.json");
        fs::write(&path, r#"{"layers": [{"diffuse": "missing.png"}]}"#).unwrap();

        let err = load_scene(&path, &SpritelightConfig::default()).unwrap_err();
        assert!(matches!(err, SceneFileError::Image { .. }));
        assert!(err.to_string().contains("missing.png"));
    }

    #[test]
    fn test_load_scene_invalid_zoom() {
        let temp = TempDir::new().unwrap();
        write_png(temp.path(), "a.png", 2, 2);
        let path = temp.path().join("scene.toml");
        fs::write(&path, "[[layers]]\ndiffuse = \"a.png\"\nzoom = 0.0\n").unwrap();

        let err = load_scene(&path, &SpritelightConfig::default()).unwrap_err();
        assert!(matches!(err, SceneFileError::Layer(LayerError::InvalidZoom(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = read_scene_file(Path::new("scene.yaml")).unwrap_err();
        assert!(matches!(err, SceneFileError::UnsupportedFormat(_)));
    }
}
