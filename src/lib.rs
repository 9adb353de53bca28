//! pica3d - fixed-function textured mesh renderer
//!
//! - `engine_core`: vertex layout, materials, projection math, growable storage
//! - `engine_render`: GPU backend trait, headless backend, renderer, mesh packs

pub mod logging;

pub use engine_core;
pub use engine_render;
