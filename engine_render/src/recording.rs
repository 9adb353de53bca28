//! Headless GPU backend that records every call
//!
//! `RecordingGpu` keeps GPU-visible memory in a byte arena, decodes textures
//! with the `image` crate and logs each call as a [`GpuCommand`]. Draw calls
//! additionally snapshot the bound state into a [`DrawRecord`] so tests can
//! check exactly what a draw would have seen.

use std::collections::BTreeMap;

use engine_core::VertexAttribute;

use crate::error::RenderError;
use crate::gpu::{
    BufInfoHandle, GpuBackend, LinearBuffer, Primitive, ProgramHandle, TexEnv, TexFilter,
    TextureHandle, Uniform, UniformLocation,
};
use crate::shader::{DVLB_MAGIC, STANDARD_UNIFORMS};

/// Smallest blob [`RecordingGpu`] accepts as a shader binary: the `DVLB`
/// magic followed by a single entry count.
pub const HEADLESS_SHADER: &[u8] = b"DVLB\x01\x00\x00\x00";

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    LoadProgram(ProgramHandle),
    BindProgram(ProgramHandle),
    SetAttrInfo(Vec<VertexAttribute>),
    SetTexEnv { stage: u8, env: TexEnv },
    AllocLinear(LinearBuffer),
    ImportTexture(TextureHandle),
    SetTextureFilter {
        texture: TextureHandle,
        mag: TexFilter,
        min: TexFilter,
    },
    CreateBufInfo(BufInfoHandle),
    SetBufInfo(BufInfoHandle),
    SetUniform {
        location: UniformLocation,
        value: Uniform,
    },
    BindTexture { unit: u8, texture: TextureHandle },
    DrawArrays {
        primitive: Primitive,
        first: usize,
        count: usize,
    },
    DrawElements {
        primitive: Primitive,
        indices: LinearBuffer,
        count: usize,
    },
    BeginFrame { clear_color: u32 },
    EndFrame,
}

/// Decoded texture held by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTexture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub filter: Option<(TexFilter, TexFilter)>,
}

/// Vertex buffer descriptor as the backend stored it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufInfo {
    pub buffer: LinearBuffer,
    pub stride: usize,
    pub attribute_count: u8,
    pub permutation: u64,
}

/// State seen by a single draw call
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub primitive: Primitive,
    pub first: usize,
    pub count: usize,
    pub indices: Option<LinearBuffer>,
    pub buf_info: Option<BufInfoHandle>,
    pub texture: Option<TextureHandle>,
    pub tex_env: Option<TexEnv>,
    pub uniforms: BTreeMap<UniformLocation, Uniform>,
}

impl DrawRecord {
    pub fn uniform(&self, location: UniformLocation) -> Option<Uniform> {
        self.uniforms.get(&location).copied()
    }
}

/// Headless [`GpuBackend`]
#[derive(Debug)]
pub struct RecordingGpu {
    uniform_table: Vec<(String, UniformLocation)>,
    commands: Vec<GpuCommand>,
    draws: Vec<DrawRecord>,
    linear: Vec<Vec<u8>>,
    textures: Vec<DecodedTexture>,
    buf_infos: Vec<BufInfo>,
    programs: u32,
    frames: u32,

    bound_program: Option<ProgramHandle>,
    bound_buf_info: Option<BufInfoHandle>,
    bound_textures: [Option<TextureHandle>; 3],
    tex_env: Option<TexEnv>,
    uniforms: BTreeMap<UniformLocation, Uniform>,

    fail_next_alloc: bool,
}

impl Default for RecordingGpu {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingGpu {
    /// Backend whose shaders expose the standard uniform interface
    pub fn new() -> Self {
        Self {
            uniform_table: STANDARD_UNIFORMS
                .iter()
                .map(|(name, reg)| (name.to_string(), UniformLocation(*reg)))
                .collect(),
            commands: Vec::new(),
            draws: Vec::new(),
            linear: Vec::new(),
            textures: Vec::new(),
            buf_infos: Vec::new(),
            programs: 0,
            frames: 0,
            bound_program: None,
            bound_buf_info: None,
            bound_textures: [None; 3],
            tex_env: None,
            uniforms: BTreeMap::new(),
            fail_next_alloc: false,
        }
    }

    /// Drops `name` from the uniform table, as if the loaded shader did not
    /// declare it
    pub fn without_uniform(mut self, name: &str) -> Self {
        self.uniform_table.retain(|(n, _)| n != name);
        self
    }

    /// Makes the next [`GpuBackend::alloc_linear`] fail
    pub fn fail_next_alloc(&mut self) {
        self.fail_next_alloc = true;
    }

    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Forgets recorded commands and draws; resources stay alive
    pub fn clear_log(&mut self) {
        self.commands.clear();
        self.draws.clear();
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn linear_bytes(&self, buffer: LinearBuffer) -> Option<&[u8]> {
        self.linear.get(buffer.id as usize).map(Vec::as_slice)
    }

    /// Total bytes of GPU-visible memory handed out so far
    pub fn linear_allocated(&self) -> usize {
        self.linear.iter().map(Vec::len).sum()
    }

    pub fn texture(&self, texture: TextureHandle) -> Option<&DecodedTexture> {
        self.textures.get(texture.0 as usize)
    }

    pub fn buf_info(&self, info: BufInfoHandle) -> Option<&BufInfo> {
        self.buf_infos.get(info.0 as usize)
    }

    pub fn bound_program(&self) -> Option<ProgramHandle> {
        self.bound_program
    }

    fn record_draw(
        &mut self,
        primitive: Primitive,
        first: usize,
        count: usize,
        indices: Option<LinearBuffer>,
    ) {
        self.draws.push(DrawRecord {
            primitive,
            first,
            count,
            indices,
            buf_info: self.bound_buf_info,
            texture: self.bound_textures[0],
            tex_env: self.tex_env,
            uniforms: self.uniforms.clone(),
        });
    }
}

impl GpuBackend for RecordingGpu {
    fn load_program(&mut self, binary: &[u8]) -> Result<ProgramHandle, RenderError> {
        if binary.len() < 8 || binary[..4] != DVLB_MAGIC {
            return Err(RenderError::ShaderParse("missing DVLB header".into()));
        }
        let entries = u32::from_le_bytes([binary[4], binary[5], binary[6], binary[7]]);
        if entries == 0 {
            return Err(RenderError::ShaderParse("container has no shader entries".into()));
        }

        let program = ProgramHandle(self.programs);
        self.programs += 1;
        self.commands.push(GpuCommand::LoadProgram(program));
        Ok(program)
    }

    fn bind_program(&mut self, program: ProgramHandle) -> Result<(), RenderError> {
        if program.0 >= self.programs {
            return Err(RenderError::ProgramBind(format!("unknown program {}", program.0)));
        }
        self.bound_program = Some(program);
        self.commands.push(GpuCommand::BindProgram(program));
        Ok(())
    }

    fn uniform_location(&self, _program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.uniform_table
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, loc)| *loc)
    }

    fn set_attr_info(&mut self, attributes: &[VertexAttribute]) {
        self.commands.push(GpuCommand::SetAttrInfo(attributes.to_vec()));
    }

    fn set_tex_env(&mut self, stage: u8, env: TexEnv) {
        if stage == 0 {
            self.tex_env = Some(env);
        }
        self.commands.push(GpuCommand::SetTexEnv { stage, env });
    }

    fn alloc_linear(&mut self, bytes: &[u8]) -> Result<LinearBuffer, RenderError> {
        if std::mem::take(&mut self.fail_next_alloc) {
            return Err(RenderError::LinearAlloc { bytes: bytes.len() });
        }

        let buffer = LinearBuffer {
            id: self.linear.len() as u32,
            len: bytes.len(),
        };
        self.linear.push(bytes.to_vec());
        self.commands.push(GpuCommand::AllocLinear(buffer));
        Ok(buffer)
    }

    fn import_texture(&mut self, data: &[u8]) -> Result<TextureHandle, RenderError> {
        let rgba = image::load_from_memory(data)
            .map_err(|e| RenderError::TextureImport(e.to_string()))?
            .to_rgba8();

        let texture = TextureHandle(self.textures.len() as u32);
        self.textures.push(DecodedTexture {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
            filter: None,
        });
        self.commands.push(GpuCommand::ImportTexture(texture));
        Ok(texture)
    }

    fn set_texture_filter(&mut self, texture: TextureHandle, mag: TexFilter, min: TexFilter) {
        if let Some(tex) = self.textures.get_mut(texture.0 as usize) {
            tex.filter = Some((mag, min));
        }
        self.commands
            .push(GpuCommand::SetTextureFilter { texture, mag, min });
    }

    fn create_buf_info(
        &mut self,
        buffer: LinearBuffer,
        stride: usize,
        attribute_count: u8,
        permutation: u64,
    ) -> BufInfoHandle {
        let info = BufInfoHandle(self.buf_infos.len() as u32);
        self.buf_infos.push(BufInfo {
            buffer,
            stride,
            attribute_count,
            permutation,
        });
        self.commands.push(GpuCommand::CreateBufInfo(info));
        info
    }

    fn set_buf_info(&mut self, info: BufInfoHandle) {
        self.bound_buf_info = Some(info);
        self.commands.push(GpuCommand::SetBufInfo(info));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: Uniform) {
        self.uniforms.insert(location, value);
        self.commands.push(GpuCommand::SetUniform { location, value });
    }

    fn bind_texture(&mut self, unit: u8, texture: TextureHandle) {
        if let Some(slot) = self.bound_textures.get_mut(unit as usize) {
            *slot = Some(texture);
        }
        self.commands.push(GpuCommand::BindTexture { unit, texture });
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: usize, count: usize) {
        self.record_draw(primitive, first, count, None);
        self.commands.push(GpuCommand::DrawArrays {
            primitive,
            first,
            count,
        });
    }

    fn draw_elements(&mut self, primitive: Primitive, indices: LinearBuffer, count: usize) {
        self.record_draw(primitive, 0, count, Some(indices));
        self.commands.push(GpuCommand::DrawElements {
            primitive,
            indices,
            count,
        });
    }

    fn begin_frame(&mut self, clear_color: u32) {
        self.commands.push(GpuCommand::BeginFrame { clear_color });
    }

    fn end_frame(&mut self) {
        self.frames += 1;
        self.commands.push(GpuCommand::EndFrame);
    }
}
