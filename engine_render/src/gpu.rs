//! GPU capability interface
//!
//! Everything the renderer asks of the graphics hardware goes through
//! [`GpuBackend`]. Binding state (program, texture unit, buffer descriptor,
//! texture environment) lives behind this trait instead of in globals, so the
//! renderer can run against [`crate::RecordingGpu`] without a console.

use engine_core::VertexAttribute;

use crate::error::RenderError;

/// Compiled and loaded shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// GPU texture resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Vertex buffer descriptor (stride, attribute count, permutation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufInfoHandle(pub u32);

/// Constant register a uniform is uploaded to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub i32);

/// Region of GPU-visible ("linear") memory.
///
/// Ordinary heap memory cannot be read by the GPU on this class of hardware;
/// vertex and index data must be copied into one of these first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinearBuffer {
    pub id: u32,
    pub len: usize,
}

/// Value written to a vertex shader uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    /// One float register
    Vec4([f32; 4]),
    /// Four consecutive registers, one row each
    Mat4([[f32; 4]; 4]),
}

/// Primitive topology for draw calls. Meshes are always triangle lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Triangles,
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexFilter {
    Nearest,
    Linear,
}

/// Texture environment stage configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexEnv {
    /// Texture unit 0 multiplied by the interpolated vertex color
    ModulateTexture,
    /// Interpolated vertex color only
    VertexColor,
}

/// Graphics hardware capability.
///
/// All calls are synchronous and happen on the thread that owns the
/// renderer.
pub trait GpuBackend {
    /// Parses a compiled shader binary and builds a program from its first
    /// vertex shader entry.
    fn load_program(&mut self, binary: &[u8]) -> Result<ProgramHandle, RenderError>;

    fn bind_program(&mut self, program: ProgramHandle) -> Result<(), RenderError>;

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Configures the attribute loaders shared by every vertex buffer
    fn set_attr_info(&mut self, attributes: &[VertexAttribute]);

    fn set_tex_env(&mut self, stage: u8, env: TexEnv);

    /// Copies `bytes` into freshly allocated GPU-visible memory
    fn alloc_linear(&mut self, bytes: &[u8]) -> Result<LinearBuffer, RenderError>;

    /// Decodes an encoded texture container into a GPU texture.
    ///
    /// Any intermediate decode state is released before returning.
    fn import_texture(&mut self, data: &[u8]) -> Result<TextureHandle, RenderError>;

    fn set_texture_filter(&mut self, texture: TextureHandle, mag: TexFilter, min: TexFilter);

    fn create_buf_info(
        &mut self,
        buffer: LinearBuffer,
        stride: usize,
        attribute_count: u8,
        permutation: u64,
    ) -> BufInfoHandle;

    fn set_buf_info(&mut self, info: BufInfoHandle);

    fn set_uniform(&mut self, location: UniformLocation, value: Uniform);

    fn bind_texture(&mut self, unit: u8, texture: TextureHandle);

    fn draw_arrays(&mut self, primitive: Primitive, first: usize, count: usize);

    /// Indexed draw; `indices` holds `count` little-endian `u16`s
    fn draw_elements(&mut self, primitive: Primitive, indices: LinearBuffer, count: usize);

    /// Starts a frame and clears the target to an RGBA8 color
    fn begin_frame(&mut self, clear_color: u32);

    fn end_frame(&mut self);
}
