//! Spritelight - real-time lighting preview for sprite lighting maps
//!
//! This library provides functionality to:
//! - Shade sprite layers from their diffuse, normal, specular, parallax and
//!   occlusion maps under a list of point lights
//! - Edit lights and layers interactively through a frame-coalescing engine
//! - Export each layer, or the cropped composite canvas, to PNG
//!
//! The shading contract is expressed through the [`device::RenderDevice`]
//! trait; [`device::SoftwareDevice`] is the CPU implementation.

pub mod brush;
pub mod cli;
pub mod color;
pub mod config;
pub mod coords;
pub mod device;
pub mod engine;
pub mod event;
pub mod export;
pub mod input;
pub mod layer;
pub mod light;
pub mod models;
pub mod output;
pub mod renderer;
pub mod scene;
pub mod schedule;
