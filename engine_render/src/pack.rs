//! Mesh pack files
//!
//! Little-endian layout:
//!
//! ```text
//! "MESH"            magic
//! u32               mesh count
//! per mesh:
//!   [f32; 4]        diffuse color
//!   u32             vertex count
//!   [f32; 8] * n    position, texcoord, normal
//!   u32             index count
//!   u16 * n         indices
//!   u32             texture byte length (0 = untextured)
//!   u8 * n          encoded texture container
//! ```
//!
//! Only the diffuse color of a material is stored; the other channels come
//! back as [`Material::DEFAULT`].

use std::io::{Read, Write};

use engine_core::{Material, Vertex};

use crate::error::AssetError;
use crate::mesh::MeshData;

pub const PACK_MAGIC: [u8; 4] = *b"MESH";

/// Collection of meshes stored in one pack file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshPack {
    pub meshes: Vec<MeshData>,
}

impl MeshPack {
    pub fn new(meshes: Vec<MeshData>) -> Self {
        Self { meshes }
    }

    pub fn read(reader: impl Read) -> Result<Self, AssetError> {
        let mut r = PackReader(reader);

        let magic = r.bytes::<4>()?;
        if magic != PACK_MAGIC {
            return Err(AssetError::BadMagic(magic));
        }

        let count = r.u32()? as usize;
        // counts come from the file; don't trust them for preallocation
        let mut meshes = Vec::with_capacity(count.min(64));
        for i in 0..count {
            let diffuse = [r.f32()?, r.f32()?, r.f32()?, r.f32()?];

            let vertex_count = r.u32()? as usize;
            let mut vertices = Vec::with_capacity(vertex_count.min(1 << 16));
            for _ in 0..vertex_count {
                let mut packed = [0.0f32; 8];
                for value in &mut packed {
                    *value = r.f32()?;
                }
                vertices.push(bytemuck::cast::<[f32; 8], Vertex>(packed));
            }

            let index_count = r.u32()? as usize;
            let mut indices = Vec::with_capacity(index_count.min(1 << 16));
            for _ in 0..index_count {
                indices.push(r.u16()?);
            }

            let texture_len = r.u32()? as usize;
            let texture = if texture_len == 0 {
                None
            } else {
                let mut data = Vec::new();
                (&mut r.0).take(texture_len as u64).read_to_end(&mut data)?;
                if data.len() != texture_len {
                    return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
                }
                Some(data)
            };

            meshes.push(MeshData {
                name: format!("mesh{i}"),
                vertices,
                indices,
                texture,
                material: Material::with_diffuse(diffuse),
            });
        }

        Ok(Self { meshes })
    }

    pub fn write(&self, writer: impl Write) -> Result<(), AssetError> {
        let mut w = writer;

        w.write_all(&PACK_MAGIC)?;
        w.write_all(&count_u32("mesh", self.meshes.len())?.to_le_bytes())?;

        for mesh in &self.meshes {
            for channel in mesh.material.diffuse {
                w.write_all(&channel.to_le_bytes())?;
            }

            w.write_all(&count_u32("vertex", mesh.vertices.len())?.to_le_bytes())?;
            for vertex in &mesh.vertices {
                for value in vertex.to_packed() {
                    w.write_all(&value.to_le_bytes())?;
                }
            }

            w.write_all(&count_u32("index", mesh.indices.len())?.to_le_bytes())?;
            for index in &mesh.indices {
                w.write_all(&index.to_le_bytes())?;
            }

            match &mesh.texture {
                Some(texture) => {
                    w.write_all(&count_u32("texture byte", texture.len())?.to_le_bytes())?;
                    w.write_all(texture)?;
                }
                None => w.write_all(&0u32.to_le_bytes())?,
            }
        }

        w.flush()?;
        Ok(())
    }
}

fn count_u32(what: &'static str, count: usize) -> Result<u32, AssetError> {
    u32::try_from(count).map_err(|_| AssetError::TooLarge { what, count })
}

struct PackReader<R>(R);

impl<R: Read> PackReader<R> {
    fn bytes<const N: usize>(&mut self) -> std::io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.0.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn u16(&mut self) -> std::io::Result<u16> {
        self.bytes().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> std::io::Result<u32> {
        self.bytes().map(u32::from_le_bytes)
    }

    fn f32(&mut self) -> std::io::Result<f32> {
        self.bytes().map(f32::from_le_bytes)
    }
}
