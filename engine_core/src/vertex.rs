//! Fixed vertex layout shared by every mesh
//!
//! Layout: `[px, py, pz, u, v, nx, ny, nz]`, 32 bytes per vertex. Attribute
//! register 0 is the position, 1 the texcoord, 2 the normal.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Vertex data for rendering
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub texcoord: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex {
    /// Stride of a single vertex in bytes: pos(12) + uv(8) + normal(12) = 32
    pub const STRIDE: usize = std::mem::size_of::<Vertex>();

    pub const fn new(position: [f32; 3], texcoord: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            position,
            texcoord,
            normal,
        }
    }

    pub fn from_glam(position: Vec3, texcoord: Vec2, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            texcoord: texcoord.to_array(),
            normal: normal.to_array(),
        }
    }

    /// Packs the vertex into the eight floats the GPU reads
    pub fn to_packed(&self) -> [f32; 8] {
        bytemuck::cast(*self)
    }
}

const _: () = assert!(Vertex::STRIDE == 32);

/// Component type of a vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrFormat {
    Float,
}

/// One attribute loader: shader input register, component type and count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub register: u8,
    pub format: AttrFormat,
    pub components: u8,
}

/// The attribute loaders for [`Vertex`], in slot order.
pub const VERTEX_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute {
        register: 0,
        format: AttrFormat::Float,
        components: 3,
    }, // v0=position
    VertexAttribute {
        register: 1,
        format: AttrFormat::Float,
        components: 2,
    }, // v1=texcoord
    VertexAttribute {
        register: 2,
        format: AttrFormat::Float,
        components: 3,
    }, // v2=normal
];

/// Attribute permutation for a buffer that feeds registers 0, 1, 2 in order.
///
/// One nibble per attribute, lowest nibble first.
pub const VERTEX_PERMUTATION: u64 = 0x210;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_matches_attribute_sizes() {
        let floats: usize = VERTEX_ATTRIBUTES
            .iter()
            .map(|a| a.components as usize)
            .sum();
        assert_eq!(floats * std::mem::size_of::<f32>(), Vertex::STRIDE);
    }

    #[test]
    fn packed_order_is_position_texcoord_normal() {
        let v = Vertex::new([1.0, 2.0, 3.0], [4.0, 5.0], [6.0, 7.0, 8.0]);
        assert_eq!(v.to_packed(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn permutation_lists_registers_in_slot_order() {
        for (slot, attr) in VERTEX_ATTRIBUTES.iter().enumerate() {
            let nibble = (VERTEX_PERMUTATION >> (slot * 4)) & 0xf;
            assert_eq!(nibble, attr.register as u64);
        }
    }
}
