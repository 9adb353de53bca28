//! Engine Core - plain data shared by the renderer and its callers
//!
//! Vertex and material layouts, mesh handles, transforms, projection math and
//! the growable storage backing meshes and per-frame requests. Nothing here
//! talks to the GPU.

pub mod components;
pub mod storage;
pub mod transform;
pub mod vertex;

pub use components::*;
pub use storage::*;
pub use transform::*;
pub use vertex::*;
