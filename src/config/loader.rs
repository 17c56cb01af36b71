//! Configuration loading and discovery for `spritelight.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::SpritelightConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "spritelight.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse spritelight.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override viewport width
    pub width: Option<u32>,
    /// Override viewport height
    pub height: Option<u32>,
    /// Override autosave directory
    pub export_dir: Option<PathBuf>,
    /// Enable autosave
    pub autosave: Option<bool>,
    /// Export the full canvas
    pub full_canvas: Option<bool>,
}

/// Find spritelight.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for spritelight.toml
/// 2. Check XDG_CONFIG_HOME/spritelight/spritelight.toml (or ~/.config/spritelight/spritelight.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find spritelight.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("spritelight").join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find spritelight.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a spritelight.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration. Relative paths in the file are resolved against the
/// directory holding it.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("assets/spritelight.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<SpritelightConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<SpritelightConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let mut config: SpritelightConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    if let Some(root) = project_root(path) {
        resolve_config_paths(&mut config, root);
    }
    log::debug!("loaded config from {}", path.display());

    Ok(config)
}

/// Configuration used when no spritelight.toml is found.
pub fn default_config() -> SpritelightConfig {
    SpritelightConfig::default()
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut SpritelightConfig, overrides: &CliOverrides) {
    if let Some(width) = overrides.width {
        config.preview.width = width;
    }
    if let Some(height) = overrides.height {
        config.preview.height = height;
    }

    if let Some(ref dir) = overrides.export_dir {
        config.export.directory = Some(dir.clone());
    }
    if let Some(autosave) = overrides.autosave {
        config.export.autosave = autosave;
    }
    if let Some(full_canvas) = overrides.full_canvas {
        config.export.full_canvas = full_canvas;
    }
}

fn resolve_config_paths(config: &mut SpritelightConfig, root: &Path) {
    if let Some(icon) = config.preview.marker_icon.as_mut() {
        *icon = resolve_path(root, icon);
    }
    if let Some(dir) = config.export.directory.as_mut() {
        *dir = resolve_path(root, dir);
    }
}

/// Get the directory holding a config file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::LightListMode;
    use serial_test::serial;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(contents.as_bytes())
            .expect("should write config content");
        config_path
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "[scene]\ntoon = true");

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "");

        let subdir = temp.path().join("art").join("sprites");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, None);
    }

    #[test]
    #[serial]
    fn test_find_xdg_config() {
        let temp = TempDir::new().expect("should create temp dir");
        let dir = temp.path().join("spritelight");
        fs::create_dir_all(&dir).expect("should create xdg dir");
        let config_path = write_config(&dir, "");

        let previous = env::var_os("XDG_CONFIG_HOME");
        env::set_var("XDG_CONFIG_HOME", temp.path());
        let found = find_xdg_config();
        match previous {
            Some(v) => env::set_var("XDG_CONFIG_HOME", v),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }

        assert_eq!(found, Some(config_path));
    }

    #[test]
    #[serial]
    fn test_find_xdg_config_missing() {
        let temp = TempDir::new().expect("should create temp dir");

        let previous = env::var_os("XDG_CONFIG_HOME");
        env::set_var("XDG_CONFIG_HOME", temp.path());
        let found = find_xdg_config();
        match previous {
            Some(v) => env::set_var("XDG_CONFIG_HOME", v),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }

        assert_eq!(found, None);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(
            temp.path(),
            r#"
[scene]
ambient_intensity = 0.4
pixelated = true
light_mode = "per-layer"

[preview]
refresh_hz = 60.0
width = 320
height = 240
marker_icon = "icons/bulb.png"

[export]
directory = "out"
autosave = true
"#,
        );

        let config = load_config(Some(&config_path)).expect("should load valid config");
        assert_eq!(config.scene.shading.ambient_intensity, 0.4);
        assert!(config.scene.shading.pixelated);
        assert_eq!(config.scene.light_mode, LightListMode::PerLayer);
        assert_eq!(config.preview.refresh_hz, 60.0);
        assert_eq!(config.preview.width, 320);
        assert_eq!(config.preview.marker_icon, Some(temp.path().join("icons/bulb.png")));
        assert_eq!(config.export.directory, Some(temp.path().join("out")));
        assert!(config.export.autosave);
        assert!(!config.export.full_canvas);
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join("nonexistent.toml");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "this is not valid toml {{{");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_bad_color_is_parse_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "[scene]\nbackground = \"not-a-color\"");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(
            temp.path(),
            r#"
[scene]
pixel_size = 0

[preview]
refresh_hz = -1.0
"#,
        );

        match load_config(Some(&config_path)) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(errors[0].contains("scene.pixel_size"));
                assert!(errors[1].contains("preview.refresh_hz"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_cli_overrides_viewport() {
        let mut config = default_config();
        let overrides = CliOverrides { width: Some(64), height: Some(32), ..Default::default() };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.preview.width, 64);
        assert_eq!(config.preview.height, 32);
    }

    #[test]
    fn test_merge_cli_overrides_export() {
        let mut config = default_config();
        let overrides = CliOverrides {
            export_dir: Some(PathBuf::from("dist")),
            autosave: Some(true),
            full_canvas: Some(true),
            ..Default::default()
        };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.export.directory, Some(PathBuf::from("dist")));
        assert!(config.export.autosave);
        assert!(config.export.full_canvas);
    }

    #[test]
    fn test_merge_cli_overrides_empty_keeps_config() {
        let mut config = default_config();
        config.export.autosave = true;

        merge_cli_overrides(&mut config, &CliOverrides::default());
        assert!(config.export.autosave);
        assert_eq!(config.preview.width, 800);
    }

    #[test]
    fn test_resolve_path_absolute() {
        let root = Path::new("/project");
        let absolute = Path::new("/other/path");
        assert_eq!(resolve_path(root, absolute), PathBuf::from("/other/path"));
    }

    #[test]
    fn test_resolve_path_relative() {
        let root = Path::new("/project");
        let relative = Path::new("icons/bulb.png");
        assert_eq!(resolve_path(root, relative), PathBuf::from("/project/icons/bulb.png"));
    }

    #[test]
    fn test_project_root() {
        let config_path = Path::new("/project/spritelight.toml");
        assert_eq!(project_root(config_path), Some(Path::new("/project")));
    }
}
