//! Error types for the renderer and the asset pipeline

use std::fmt;

use engine_core::{CoreError, MeshId};
use thiserror::Error;

/// Where a precondition was checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Renderer errors.
///
/// None of these are recoverable inside the renderer; callers either report
/// them or hand them to [`crate::fatal`].
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{location}: {condition}")]
    Precondition {
        condition: &'static str,
        location: SourceLocation,
    },

    #[error("out of GPU-visible memory allocating {bytes} bytes")]
    LinearAlloc { bytes: usize },

    #[error(transparent)]
    Storage(#[from] CoreError),

    #[error("failed to parse shader binary: {0}")]
    ShaderParse(String),

    #[error("failed to bind shader program: {0}")]
    ProgramBind(String),

    #[error("shader has no uniform named `{0}`")]
    MissingUniform(&'static str),

    #[error("importing texture failed: {0}")]
    TextureImport(String),

    #[error("{id} is not registered ({registered} meshes)")]
    UnknownMesh { id: MeshId, registered: usize },

    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u16, vertex_count: usize },
}

/// Errors reading, writing or importing mesh assets
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a mesh pack (magic {0:02x?})")]
    BadMagic([u8; 4]),

    #[error("{what} count {count} does not fit the pack format")]
    TooLarge { what: &'static str, count: usize },

    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("failed to load OBJ: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("failed to load glTF: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Returns a [`RenderError::Precondition`] from the enclosing function when
/// `cond` does not hold.
macro_rules! require {
    ($cond:expr, $what:literal) => {
        if !$cond {
            return Err($crate::error::RenderError::Precondition {
                condition: $what,
                location: $crate::error::SourceLocation {
                    file: file!(),
                    line: line!(),
                },
            });
        }
    };
}

pub(crate) use require;
