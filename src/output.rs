//! PNG output and export file naming

use image::RgbaImage;
use std::io;
use std::path::{Path, PathBuf};

/// Error type for output operations
#[derive(Debug)]
pub enum OutputError {
    /// IO error during file operations
    Io(io::Error),
    /// Image encoding error
    Image(image::ImageError),
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::Io(e) => write!(f, "IO error: {}", e),
            OutputError::Image(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Io(e) => Some(e),
            OutputError::Image(e) => Some(e),
        }
    }
}

impl From<io::Error> for OutputError {
    fn from(e: io::Error) -> Self {
        OutputError::Io(e)
    }
}

impl From<image::ImageError> for OutputError {
    fn from(e: image::ImageError) -> Self {
        OutputError::Image(e)
    }
}

/// Save an RGBA image, creating parent directories as needed.
///
/// The format follows the file extension.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    image.save(path)?;
    Ok(())
}

/// Split a file name at its first dot: `"hero.n.png"` is `("hero", "n.png")`.
///
/// An empty suffix becomes `png`.
fn split_name(name: &Path) -> (String, String) {
    let file = name.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();
    match file.split_once('.') {
        Some((base, suffix)) if !suffix.is_empty() => (base.to_string(), suffix.to_string()),
        Some((base, _)) => (base.to_string(), "png".to_string()),
        None => (file, "png".to_string()),
    }
}

/// Where an autosaved export of the layer called `name` is written.
///
/// # Naming Rules
///
/// | Scenario | Output |
/// |----------|--------|
/// | No export directory, `art/hero.png` | `art/hero_v.png` |
/// | No extension, `art/hero` | `art/hero_v.png` |
/// | Export directory `out/` | `out/hero_v.png` |
/// | `out/hero_v.png` exists | `out/hero(2)_v.png`, then `(3)`, ... |
///
/// Only the export directory rule avoids collisions; a sibling export replaces
/// the previous one.
pub fn autosave_path(name: &str, export_dir: Option<&Path>) -> PathBuf {
    let name = Path::new(name);
    let (base, suffix) = split_name(name);
    match export_dir {
        None => {
            let parent = name.parent().unwrap_or(Path::new(""));
            parent.join(format!("{}_v.{}", base, suffix))
        }
        Some(dir) => {
            let first = dir.join(format!("{}_v.{}", base, suffix));
            if !first.exists() {
                return first;
            }
            (2u32..)
                .map(|i| dir.join(format!("{}({})_v.{}", base, i, suffix)))
                .find(|p| !p.exists())
                .unwrap_or(first)
        }
    }
}

/// Output path for one exported layer of a scene rendered from the CLI.
///
/// | Scenario | Output |
/// |----------|--------|
/// | Single layer, no `-o` | `scene_{layer}.png` |
/// | With `-o out.png`, single layer or full canvas | `out.png` |
/// | With `-o out.png`, several layers | `out_{layer}.png` |
/// | With `-o dir/` | `dir/{layer}.png` |
pub fn generate_output_path(scene: &Path, layer_name: &str, output_arg: Option<&Path>, is_single: bool) -> PathBuf {
    let layer_stem = Path::new(layer_name).file_stem().and_then(|s| s.to_str()).unwrap_or(layer_name);
    match output_arg {
        Some(output) => {
            let is_dir = output.as_os_str().to_string_lossy().ends_with('/') || output.is_dir();

            if is_dir {
                output.join(format!("{}.png", layer_stem))
            } else if is_single {
                output.to_path_buf()
            } else {
                let stem = output.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
                let parent = output.parent().unwrap_or(Path::new(""));
                parent.join(format!("{}_{}.png", stem, layer_stem))
            }
        }
        None => {
            let scene_stem = scene.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
            let parent = scene.parent().unwrap_or(Path::new(""));
            parent.join(format!("{}_{}.png", scene_stem, layer_stem))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::tempdir;

    #[test]
    fn test_autosave_sibling() {
        assert_eq!(autosave_path("art/hero.png", None), PathBuf::from("art/hero_v.png"));
        assert_eq!(autosave_path("hero.tga", None), PathBuf::from("hero_v.tga"));
    }

    #[test]
    fn test_autosave_sibling_without_extension() {
        assert_eq!(autosave_path("art/hero", None), PathBuf::from("art/hero_v.png"));
    }

    #[test]
    fn test_autosave_keeps_complete_suffix() {
        assert_eq!(autosave_path("art/hero.n.png", None), PathBuf::from("art/hero_v.n.png"));
    }

    #[test]
    fn test_autosave_directory_first_free_name() {
        let dir = tempdir().unwrap();
        let first = autosave_path("art/sprite.png", Some(dir.path()));
        assert_eq!(first, dir.path().join("sprite_v.png"));

        std::fs::write(&first, b"x").unwrap();
        let second = autosave_path("art/sprite.png", Some(dir.path()));
        assert_eq!(second, dir.path().join("sprite(2)_v.png"));

        std::fs::write(&second, b"x").unwrap();
        let third = autosave_path("art/sprite.png", Some(dir.path()));
        assert_eq!(third, dir.path().join("sprite(3)_v.png"));
    }

    #[test]
    fn test_generate_output_path_default() {
        let path = generate_output_path(Path::new("scenes/level.toml"), "art/hero.png", None, true);
        assert_eq!(path, PathBuf::from("scenes/level_hero.png"));
    }

    #[test]
    fn test_generate_output_path_explicit_file() {
        let single = generate_output_path(Path::new("level.toml"), "hero", Some(Path::new("out.png")), true);
        assert_eq!(single, PathBuf::from("out.png"));
        let multi = generate_output_path(Path::new("level.toml"), "hero", Some(Path::new("out.png")), false);
        assert_eq!(multi, PathBuf::from("out_hero.png"));
    }

    #[test]
    fn test_generate_output_path_directory() {
        let path = generate_output_path(Path::new("level.toml"), "hero", Some(Path::new("renders/")), false);
        assert_eq!(path, PathBuf::from("renders/hero.png"));
    }

    #[test]
    fn test_save_png_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.png");

        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([0, 0, 0, 0]));

        save_png(&image, &path).unwrap();
        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(*loaded.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*loaded.get_pixel(1, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_save_png_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dirs/test.png");
        save_png(&RgbaImage::new(1, 1), &path).unwrap();
        assert!(path.exists());
    }
}
