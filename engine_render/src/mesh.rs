//! Mesh data structures and file loading
//!
//! [`MeshData`] is CPU-side geometry plus its encoded texture and material,
//! as read from model files or mesh packs. [`Mesh`] is what the renderer keeps
//! after registration: handles to GPU-visible buffers and the decoded texture.

use std::io::Cursor;
use std::path::Path;

use engine_core::{Material, Vertex};
use glam::{Mat3, Mat4, Vec2, Vec3};

use crate::error::AssetError;
use crate::gpu::{BufInfoHandle, LinearBuffer, TextureHandle};

/// Index data uploaded next to a mesh's vertices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBuffer {
    pub buffer: LinearBuffer,
    pub count: usize,
}

/// A registered mesh. Never mutated or freed after registration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mesh {
    pub material: Material,
    pub vertices: LinearBuffer,
    pub vertex_count: usize,
    pub buf_info: BufInfoHandle,
    pub texture: Option<TextureHandle>,
    pub indices: Option<IndexBuffer>,
}

impl Mesh {
    /// Number of vertices one draw of this mesh processes
    pub fn draw_count(&self) -> usize {
        match self.indices {
            Some(indices) => indices.count,
            None => self.vertex_count,
        }
    }
}

/// CPU-side mesh, ready to be registered
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
    /// Triangle-list indices; empty means the vertices are drawn in order
    pub indices: Vec<u16>,
    /// Encoded texture container, if any
    pub texture: Option<Vec<u8>>,
    pub material: Material,
}

impl Default for MeshData {
    fn default() -> Self {
        Self {
            name: String::new(),
            vertices: Vec::new(),
            indices: Vec::new(),
            texture: None,
            material: Material::DEFAULT,
        }
    }
}

impl MeshData {
    /// Loads every triangle mesh in a model file (.obj, .gltf, .glb).
    ///
    /// Each OBJ model and each glTF primitive becomes one `MeshData`.
    pub fn load_from_file(path: &Path) -> Result<Vec<Self>, AssetError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| AssetError::UnsupportedFormat("no file extension".into()))?;

        match ext.as_str() {
            "obj" => Self::load_obj(path),
            "gltf" | "glb" => Self::load_gltf(path),
            _ => Err(AssetError::UnsupportedFormat(ext)),
        }
    }

    fn load_obj(path: &Path) -> Result<Vec<Self>, AssetError> {
        let load_options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ignore_points: true,
            ignore_lines: true,
        };
        let (models, materials) = tobj::load_obj(path, &load_options)?;
        let materials = materials.unwrap_or_else(|e| {
            log::warn!("{}: ignoring materials: {e}", path.display());
            Vec::new()
        });
        let base_dir = path.parent().unwrap_or(Path::new("."));

        let mut meshes = Vec::with_capacity(models.len());
        for model in models {
            let mesh = &model.mesh;
            let vertex_count = mesh.positions.len() / 3;

            let mut vertices = Vec::with_capacity(vertex_count);
            for i in 0..vertex_count {
                let position = [
                    mesh.positions[i * 3],
                    mesh.positions[i * 3 + 1],
                    mesh.positions[i * 3 + 2],
                ];
                let normal = if mesh.normals.len() >= (i + 1) * 3 {
                    [
                        mesh.normals[i * 3],
                        mesh.normals[i * 3 + 1],
                        mesh.normals[i * 3 + 2],
                    ]
                } else {
                    [0.0; 3] // filled in by ensure_normals
                };
                let texcoord = if mesh.texcoords.len() >= (i + 1) * 2 {
                    [mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]]
                } else {
                    [0.0; 2]
                };
                vertices.push(Vertex::new(position, texcoord, normal));
            }

            let indices = to_u16_indices(mesh.indices.iter().copied(), vertex_count)?;

            let obj_material = mesh.material_id.and_then(|id| materials.get(id));
            let material = obj_material
                .and_then(|m| m.diffuse)
                .map(|[r, g, b]| Material::with_diffuse([r, g, b, 1.0]))
                .unwrap_or_default();
            let texture = match obj_material.and_then(|m| m.diffuse_texture.as_ref()) {
                Some(file) => Some(std::fs::read(base_dir.join(file))?),
                None => None,
            };

            let mut data = Self {
                name: model.name,
                vertices,
                indices,
                texture,
                material,
            };
            data.ensure_normals();
            meshes.push(data);
        }

        Ok(meshes)
    }

    fn load_gltf(path: &Path) -> Result<Vec<Self>, AssetError> {
        let (document, buffers, images) = gltf::import(path)?;

        let roots: Vec<gltf::Node<'_>> =
            match document.default_scene().or_else(|| document.scenes().next()) {
                Some(scene) => scene.nodes().collect(),
                None => document.nodes().collect(),
            };

        let mut meshes = Vec::new();
        for node in roots {
            collect_gltf_node(&node, Mat4::IDENTITY, &buffers, &images, &mut meshes)?;
        }
        Ok(meshes)
    }

    /// Cube of edge 1 centered on the origin, one texture per face
    pub fn cube() -> Self {
        // (normal, u axis, v axis) with u x v == normal
        let faces = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        ];
        let corners = [
            (-1.0, -1.0, Vec2::new(0.0, 0.0)),
            (1.0, -1.0, Vec2::new(1.0, 0.0)),
            (1.0, 1.0, Vec2::new(1.0, 1.0)),
            (-1.0, 1.0, Vec2::new(0.0, 1.0)),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in faces {
            let base = vertices.len() as u16;
            for (su, sv, uv) in corners {
                let position = (normal + u * su + v * sv) * 0.5;
                vertices.push(Vertex::from_glam(position, uv, normal));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self {
            name: "Cube".to_string(),
            vertices,
            indices,
            ..Default::default()
        }
    }

    /// Expands the index buffer into a plain triangle list.
    ///
    /// Triangles with an index past the vertex array are dropped, as is a
    /// trailing partial triangle.
    pub fn to_triangle_list(&self) -> Vec<Vertex> {
        if self.indices.is_empty() {
            return self.vertices.clone();
        }
        self.indices
            .chunks_exact(3)
            .filter_map(|tri| {
                let a = self.vertices.get(tri[0] as usize)?;
                let b = self.vertices.get(tri[1] as usize)?;
                let c = self.vertices.get(tri[2] as usize)?;
                Some([*a, *b, *c])
            })
            .flatten()
            .collect()
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of indices; 0 for non-indexed meshes
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Non-empty, and every index points at a vertex
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty()
            && self
                .indices
                .iter()
                .all(|&i| (i as usize) < self.vertices.len())
    }

    /// Makes sure every vertex has a usable normal.
    ///
    /// If any normal is zero, all normals are rebuilt by accumulating face
    /// normals (area weighted) per vertex.
    pub fn ensure_normals(&mut self) {
        let has_zero_normals = self
            .vertices
            .iter()
            .any(|v| Vec3::from(v.normal).length_squared() < 1e-6);

        if !has_zero_normals {
            return;
        }

        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        for [i0, i1, i2] in self.triangles() {
            if i0 >= normals.len() || i1 >= normals.len() || i2 >= normals.len() {
                continue;
            }
            let p0 = Vec3::from(self.vertices[i0].position);
            let p1 = Vec3::from(self.vertices[i1].position);
            let p2 = Vec3::from(self.vertices[i2].position);
            // not normalized: the magnitude weights by triangle area
            let face_normal = (p1 - p0).cross(p2 - p0);
            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for (v, n) in self.vertices.iter_mut().zip(normals) {
            let len = n.length();
            v.normal = if len > 1e-6 { n / len } else { Vec3::Y }.to_array();
        }
    }

    fn triangles(&self) -> Vec<[usize; 3]> {
        if self.indices.is_empty() {
            (0..self.vertices.len() / 3)
                .map(|t| [t * 3, t * 3 + 1, t * 3 + 2])
                .collect()
        } else {
            self.indices
                .chunks_exact(3)
                .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
                .collect()
        }
    }
}

fn collect_gltf_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
    out: &mut Vec<MeshData>,
) -> Result<(), AssetError> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();

    if let Some(mesh) = node.mesh() {
        for (i, primitive) in mesh.primitives().enumerate() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!("skipping non-triangle primitive {i} of mesh {}", mesh.index());
                continue;
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
            let Some(positions) = reader.read_positions() else {
                continue;
            };

            let mut vertices: Vec<Vertex> = positions
                .map(|p| {
                    let p = world.transform_point3(Vec3::from(p));
                    Vertex::from_glam(p, Vec2::ZERO, Vec3::ZERO)
                })
                .collect();

            if let Some(normals) = reader.read_normals() {
                for (v, n) in vertices.iter_mut().zip(normals) {
                    v.normal = (normal_matrix * Vec3::from(n)).normalize_or_zero().to_array();
                }
            }

            if let Some(texcoords) = reader.read_tex_coords(0) {
                for (v, uv) in vertices.iter_mut().zip(texcoords.into_f32()) {
                    v.texcoord = uv;
                }
            }

            let indices = match reader.read_indices() {
                Some(indices) => to_u16_indices(indices.into_u32(), vertices.len())?,
                None => Vec::new(),
            };

            let pbr = primitive.material().pbr_metallic_roughness();
            let material = Material::with_diffuse(pbr.base_color_factor());
            let texture = match pbr.base_color_texture() {
                Some(info) => images
                    .get(info.texture().source().index())
                    .map(encode_png)
                    .transpose()?
                    .flatten(),
                None => None,
            };

            let name = mesh.name().or(node.name()).unwrap_or("mesh");
            let mut data = MeshData {
                name: format!("{name}#{i}"),
                vertices,
                indices,
                texture,
                material,
            };
            data.ensure_normals();
            out.push(data);
        }
    }

    for child in node.children() {
        collect_gltf_node(&child, world, buffers, images, out)?;
    }
    Ok(())
}

/// Re-encodes decoded glTF image data as PNG bytes.
///
/// Pixel formats other than 8-bit RGB/RGBA are dropped with a warning.
fn encode_png(data: &gltf::image::Data) -> Result<Option<Vec<u8>>, AssetError> {
    use gltf::image::Format;

    let rgba = match data.format {
        Format::R8G8B8A8 => image::RgbaImage::from_raw(data.width, data.height, data.pixels.clone()),
        Format::R8G8B8 => image::RgbImage::from_raw(data.width, data.height, data.pixels.clone())
            .map(|rgb| image::DynamicImage::ImageRgb8(rgb).to_rgba8()),
        other => {
            log::warn!("unsupported glTF image format {other:?}; dropping texture");
            return Ok(None);
        }
    }
    .ok_or_else(|| AssetError::UnsupportedFormat("image size does not match its pixels".into()))?;

    let mut out = Cursor::new(Vec::new());
    rgba.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(Some(out.into_inner()))
}

fn to_u16_indices(
    indices: impl Iterator<Item = u32>,
    vertex_count: usize,
) -> Result<Vec<u16>, AssetError> {
    if vertex_count > u16::MAX as usize + 1 {
        return Err(AssetError::TooLarge {
            what: "vertex",
            count: vertex_count,
        });
    }
    indices
        .map(|i| {
            u16::try_from(i)
                .ok()
                .filter(|&ix| (ix as usize) < vertex_count)
                .ok_or(AssetError::IndexOutOfRange {
                    index: i,
                    vertex_count,
                })
        })
        .collect()
}
