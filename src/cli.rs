//! Command-line interface implementation

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::{load_config, merge_cli_overrides, CliOverrides, SpritelightConfig};
use crate::device::SoftwareDevice;
use crate::engine::PreviewEngine;
use crate::export::ExportRequest;
use crate::models::{load_scene, SceneFileError};
use crate::output::{generate_output_path, save_png};
use crate::renderer::{default_marker_icon, SceneRenderer};

const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// Spritelight - render lit previews of sprites from their lighting maps
#[derive(Parser)]
#[command(name = "spl")]
#[command(about = "Spritelight - render lit previews of sprites from their lighting maps")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the layers of a scene file to PNG
    Render {
        /// Scene file (.toml or .json)
        scene: PathBuf,

        /// Output file or directory.
        /// If omitted: {scene}_{layer}.png
        /// If file (single image): output.png
        /// If file (multiple): output_{layer}.png
        /// If directory (ends with /): dir/{layer}.png
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export the composited canvas, cropped to the layers
        #[arg(long)]
        full: bool,

        /// Save each layer as {name}_v.png next to its source or in --export-dir
        #[arg(long)]
        autosave: bool,

        /// Directory for autosaved images
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Canvas width in pixels
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        width: Option<u32>,

        /// Canvas height in pixels
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        height: Option<u32>,

        /// Config file; discovered from the working directory when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the resolved configuration as TOML
    Config {
        /// Config file; discovered from the working directory when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render { scene, output, full, autosave, export_dir, width, height, config } => {
            let overrides = CliOverrides {
                width,
                height,
                export_dir,
                autosave: autosave.then_some(true),
                full_canvas: full.then_some(true),
            };
            run_render(&scene, output.as_deref(), config.as_deref(), &overrides)
        }
        Commands::Config { config } => run_config(config.as_deref()),
    }
}

fn resolved_config(path: Option<&Path>) -> Result<SpritelightConfig, ExitCode> {
    load_config(path).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_ERROR)
    })
}

fn run_config(path: Option<&Path>) -> ExitCode {
    let config = match resolved_config(path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    match toml::to_string_pretty(&config) {
        Ok(text) => {
            print!("{}", text);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: Cannot serialize config: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Execute the render command
fn run_render(scene_path: &Path, output: Option<&Path>, config_path: Option<&Path>, overrides: &CliOverrides) -> ExitCode {
    let mut config = match resolved_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    merge_cli_overrides(&mut config, overrides);

    let scene = match load_scene(scene_path, &config) {
        Ok(s) => s,
        Err(e @ (SceneFileError::Io { .. } | SceneFileError::UnsupportedFormat(_))) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if scene.layers().is_empty() {
        eprintln!("Error: No layers found in scene file");
        return ExitCode::from(EXIT_ERROR);
    }

    let icon = match &config.preview.marker_icon {
        Some(path) => match image::open(path) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                eprintln!("Error: Cannot load marker icon '{}': {}", path.display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
        },
        None => default_marker_icon(),
    };
    let renderer = match SceneRenderer::new(SoftwareDevice::new(), &icon) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let mut engine = PreviewEngine::new(scene, renderer, &config.preview);

    let request = ExportRequest {
        full_canvas: config.export.full_canvas,
        autosave: config.export.autosave,
        export_dir: config.export.directory.clone(),
    };
    let mut exported = match engine.export(request) {
        Ok(out) => out,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    for path in exported.saved_paths() {
        println!("Saved: {}", path.display());
    }

    // Autosave already placed the files unless an explicit output was given
    let write_outputs = output.is_some() || exported.saved_paths().is_empty();
    if write_outputs {
        let is_single = exported.images.len() == 1;
        for image in &exported.images {
            let output_path = generate_output_path(scene_path, &image.name, output, is_single);
            if let Err(e) = save_png(&image.image, &output_path) {
                eprintln!("Error: Failed to save '{}': {}", output_path.display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
            println!("Saved: {}", output_path.display());
        }
    }

    if let Some(report) = engine.last_frame() {
        exported.extend_warnings(report.warnings.iter().cloned());
    }
    for warning in &exported.warnings {
        eprintln!("Warning: {}", warning.message);
    }

    ExitCode::from(EXIT_SUCCESS)
}
