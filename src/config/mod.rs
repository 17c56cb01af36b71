//! Configuration for the preview engine and the `spl` tool
//!
//! Provides types and parsing for `spritelight.toml`.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
