//! Renderer - registers meshes and draws queued requests
//!
//! Meshes are registered once and referred to by [`MeshId`]. Each frame the
//! caller submits any number of `(mesh, model matrix)` requests and then calls
//! [`Renderer::render`], which issues one draw per request in submission order
//! and empties the queue.

use engine_core::{
    DenseVec, DirectionalLight, GrowthPolicy, Material, MeshId, ProjectionConfig, Vertex,
    VERTEX_ATTRIBUTES, VERTEX_PERMUTATION, matrix_rows,
};
use glam::Mat4;

use crate::error::{RenderError, require};
use crate::gpu::{GpuBackend, Primitive, ProgramHandle, TexEnv, TexFilter, TextureHandle, Uniform};
use crate::mesh::{IndexBuffer, Mesh, MeshData};
use crate::pack::MeshPack;
use crate::shader::UniformLocations;

/// Renderer configuration, fixed at initialization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    pub projection: ProjectionConfig,
    /// RGBA8, red in the high byte
    pub clear_color: u32,
    pub mesh_growth: GrowthPolicy,
    pub request_growth: GrowthPolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionConfig::default(),
            clear_color: 0x68b0d8ff,
            mesh_growth: GrowthPolicy::DEFAULT,
            request_growth: GrowthPolicy::DEFAULT,
        }
    }
}

/// One queued draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub mesh: MeshId,
    pub model: Mat4,
}

/// What a call to [`Renderer::render`] issued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draw_calls: u32,
    pub vertices: u64,
}

pub struct Renderer<G: GpuBackend> {
    gpu: G,
    config: RenderConfig,
    projection: Mat4,
    light: DirectionalLight,
    program: ProgramHandle,
    uniforms: UniformLocations,
    tex_env: TexEnv,
    meshes: DenseVec<Mesh>,
    requests: DenseVec<RenderRequest>,
}

impl<G: GpuBackend> Renderer<G> {
    /// Loads the shader and sets up the state shared by every draw.
    pub fn new(mut gpu: G, config: RenderConfig, shader: &[u8]) -> Result<Self, RenderError> {
        let program = gpu.load_program(shader)?;
        gpu.bind_program(program)?;
        let uniforms = UniformLocations::resolve(&gpu, program)?;

        gpu.set_attr_info(&VERTEX_ATTRIBUTES);
        let tex_env = TexEnv::ModulateTexture;
        gpu.set_tex_env(0, tex_env);

        log::info!(
            "renderer ready: program {}, fov {}°, clear #{:08x}",
            program.0,
            config.projection.fov_y_degrees,
            config.clear_color
        );

        Ok(Self {
            gpu,
            config,
            projection: config.projection.matrix(),
            light: DirectionalLight::FIXED,
            program,
            uniforms,
            tex_env,
            meshes: DenseVec::new(config.mesh_growth),
            requests: DenseVec::new(config.request_growth),
        })
    }

    /// Registers a non-indexed, textured mesh.
    ///
    /// `texture` is an encoded texture container, decoded by the backend.
    pub fn register_mesh(
        &mut self,
        vertices: &[Vertex],
        texture: &[u8],
        material: Material,
    ) -> Result<MeshId, RenderError> {
        require!(!vertices.is_empty(), "vertices must not be empty");
        require!(!texture.is_empty(), "texture data must not be empty");
        self.register_indexed_mesh(vertices, None, Some(texture), material)
    }

    /// Registers a mesh with optional indices and an optional texture.
    ///
    /// Empty `indices` draw the vertices in order. Without a texture the mesh
    /// is shaded with vertex color only. Nothing is registered if any step
    /// fails.
    pub fn register_indexed_mesh(
        &mut self,
        vertices: &[Vertex],
        indices: Option<&[u16]>,
        texture: Option<&[u8]>,
        material: Material,
    ) -> Result<MeshId, RenderError> {
        require!(!vertices.is_empty(), "vertices must not be empty");
        require!(
            texture.is_none_or(|t| !t.is_empty()),
            "texture data must not be empty"
        );
        let indices = indices.filter(|ix| !ix.is_empty());
        if let Some(bad) = indices.and_then(|ix| ix.iter().find(|&&i| i as usize >= vertices.len())) {
            return Err(RenderError::IndexOutOfRange {
                index: *bad,
                vertex_count: vertices.len(),
            });
        }

        if self.meshes.reserve_one()? {
            log::debug!("mesh storage grown to {}", self.meshes.capacity());
        }

        let vertex_buffer = self.gpu.alloc_linear(bytemuck::cast_slice(vertices))?;

        let texture = match texture {
            Some(data) => {
                let tex = self.gpu.import_texture(data)?;
                self.gpu
                    .set_texture_filter(tex, TexFilter::Linear, TexFilter::Nearest);
                Some(tex)
            }
            None => None,
        };

        let indices = match indices {
            Some(ix) => Some(IndexBuffer {
                buffer: self.gpu.alloc_linear(bytemuck::cast_slice(ix))?,
                count: ix.len(),
            }),
            None => None,
        };

        let buf_info = self.gpu.create_buf_info(
            vertex_buffer,
            Vertex::STRIDE,
            VERTEX_ATTRIBUTES.len() as u8,
            VERTEX_PERMUTATION,
        );

        let index = self.meshes.push(Mesh {
            material,
            vertices: vertex_buffer,
            vertex_count: vertices.len(),
            buf_info,
            texture,
            indices,
        })?;
        let id = MeshId::from_index(index);

        log::debug!(
            "registered {id}: {} vertices, {} indices, {}",
            vertices.len(),
            indices.map_or(0, |ix| ix.count),
            if texture.is_some() { "textured" } else { "untextured" }
        );
        Ok(id)
    }

    /// Registers one CPU-side mesh
    pub fn register_mesh_data(&mut self, mesh: &MeshData) -> Result<MeshId, RenderError> {
        self.register_indexed_mesh(
            &mesh.vertices,
            Some(&mesh.indices),
            mesh.texture.as_deref(),
            mesh.material,
        )
    }

    /// Registers every mesh of a pack, returning ids in pack order.
    ///
    /// Stops at the first failure; meshes before it stay registered.
    pub fn register_pack(&mut self, pack: &MeshPack) -> Result<Vec<MeshId>, RenderError> {
        pack.meshes
            .iter()
            .map(|mesh| self.register_mesh_data(mesh))
            .collect()
    }

    /// Queues a draw of `mesh` for the next frame.
    ///
    /// The id is not checked here; [`Renderer::render`] rejects unknown ids.
    pub fn submit(&mut self, mesh: MeshId, model: Mat4) -> Result<(), RenderError> {
        if self.requests.reserve_one()? {
            log::debug!("request queue grown to {}", self.requests.capacity());
        }
        self.requests.push(RenderRequest { mesh, model })?;
        Ok(())
    }

    /// Draws every queued request in submission order and empties the queue.
    ///
    /// If any request names an unregistered mesh, nothing is drawn and the
    /// queue is still emptied.
    pub fn render(&mut self) -> Result<FrameStats, RenderError> {
        if let Some(bad) = self
            .requests
            .iter()
            .find(|req| req.mesh.index() >= self.meshes.len())
        {
            let err = RenderError::UnknownMesh {
                id: bad.mesh,
                registered: self.meshes.len(),
            };
            self.requests.clear();
            return Err(err);
        }

        self.gpu.begin_frame(self.config.clear_color);

        let mut stats = FrameStats::default();
        let projection = matrix_rows(&self.projection);
        let light = self.light;

        for request in self.requests.iter() {
            let Some(mesh) = self.meshes.get(request.mesh.index()) else {
                continue; // validated above
            };
            let loc = self.uniforms;

            self.gpu
                .set_uniform(loc.projection, Uniform::Mat4(projection));
            self.gpu
                .set_uniform(loc.model_view, Uniform::Mat4(matrix_rows(&request.model)));
            self.gpu
                .set_uniform(loc.material, Uniform::Mat4(mesh.material.as_rows()));
            self.gpu
                .set_uniform(loc.light_vec, Uniform::Vec4(light.direction));
            self.gpu
                .set_uniform(loc.light_half_vec, Uniform::Vec4(light.half_vector));
            self.gpu
                .set_uniform(loc.light_color, Uniform::Vec4(light.color));

            let wanted = match mesh.texture {
                Some(_) => TexEnv::ModulateTexture,
                None => TexEnv::VertexColor,
            };
            if wanted != self.tex_env {
                self.gpu.set_tex_env(0, wanted);
                self.tex_env = wanted;
            }

            self.gpu.set_buf_info(mesh.buf_info);
            if let Some(texture) = mesh.texture {
                self.gpu.bind_texture(0, texture);
            }

            match mesh.indices {
                Some(ix) => self.gpu.draw_elements(Primitive::Triangles, ix.buffer, ix.count),
                None => self.gpu.draw_arrays(Primitive::Triangles, 0, mesh.vertex_count),
            }
            log::trace!("draw {} ({} vertices)", request.mesh, mesh.draw_count());

            stats.draw_calls += 1;
            stats.vertices += mesh.draw_count() as u64;
        }

        self.gpu.end_frame();
        self.requests.clear();
        Ok(stats)
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    pub fn uniform_locations(&self) -> UniformLocations {
        self.uniforms
    }

    /// Projection uploaded with every draw
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.index())
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn mesh_capacity(&self) -> usize {
        self.meshes.capacity()
    }

    /// Texture of a registered mesh, if it has one
    pub fn mesh_texture(&self, id: MeshId) -> Option<TextureHandle> {
        self.mesh(id).and_then(|m| m.texture)
    }

    pub fn queued_requests(&self) -> &[RenderRequest] {
        self.requests.as_slice()
    }

    pub fn request_capacity(&self) -> usize {
        self.requests.capacity()
    }
}
