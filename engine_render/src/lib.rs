//! Engine Render - fixed-function mesh renderer
//!
//! Registers textured meshes, queues per-frame draw requests and issues draw
//! calls through a [`GpuBackend`]. The headless [`RecordingGpu`] backend
//! stands in for the hardware in tests and tools.

mod error;

pub mod fatal;
pub mod gpu;
pub mod mesh;
pub mod pack;
pub mod recording;
pub mod renderer;
pub mod shader;

pub use error::*;
pub use gpu::*;
pub use mesh::*;
pub use pack::*;
pub use recording::*;
pub use renderer::*;
pub use shader::*;
