//! Core components: mesh handles, materials and the scene light

use bytemuck::{Pod, Zeroable};

/// Handle to a registered mesh.
///
/// Ids are dense indices handed out in registration order, starting at 0,
/// and stay valid for the lifetime of the renderer that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(usize);

impl MeshId {
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for MeshId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mesh#{}", self.0)
    }
}

/// Per-mesh lighting material.
///
/// Each channel is an `[x, y, z, w]` vector. The struct is uploaded to the
/// vertex shader's `material` uniform as four consecutive registers, one row
/// per channel, in declaration order. The layout is `#[repr(C)]` and must
/// stay exactly sixteen floats; see [`Material::as_rows`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Material {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub emission: [f32; 4],
}

const _: () = assert!(std::mem::size_of::<Material>() == 16 * std::mem::size_of::<f32>());

impl Material {
    /// Dim gray used when a mesh brings no material of its own.
    pub const DEFAULT: Self = Self {
        ambient: [0.2, 0.2, 0.2, 0.0],
        diffuse: [0.2, 0.2, 0.2, 0.0],
        specular: [0.2, 0.2, 0.2, 0.0],
        emission: [0.2, 0.2, 0.2, 0.0],
    };

    pub const fn new(
        ambient: [f32; 4],
        diffuse: [f32; 4],
        specular: [f32; 4],
        emission: [f32; 4],
    ) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
            emission,
        }
    }

    /// Default material with the diffuse channel replaced
    pub fn with_diffuse(diffuse: [f32; 4]) -> Self {
        Self {
            diffuse,
            ..Self::DEFAULT
        }
    }

    /// The material as the four uniform rows the shader reads:
    /// ambient, diffuse, specular, emission.
    pub fn as_rows(&self) -> [[f32; 4]; 4] {
        bytemuck::cast(*self)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Directional light fed to the vertex shader.
///
/// The renderer uses a single fixed light; it is not configurable per mesh or
/// per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub direction: [f32; 4],
    pub half_vector: [f32; 4],
    pub color: [f32; 4],
}

impl DirectionalLight {
    /// White light shining down the view axis.
    pub const FIXED: Self = Self {
        direction: [0.0, 0.0, -1.0, 0.0],
        half_vector: [0.0, 0.0, -1.0, 0.0],
        color: [1.0, 1.0, 1.0, 1.0],
    };
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::FIXED
    }
}
