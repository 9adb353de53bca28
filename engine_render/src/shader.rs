//! Vertex shader interface for the lit, textured mesh program
//!
//! The shader itself is an external compiled artifact (a `DVLB` container
//! assembled from [`VERTEX_SHADER_SOURCE`]). This module names the uniforms
//! the renderer writes and resolves their locations once at startup.

use crate::error::RenderError;
use crate::gpu::{GpuBackend, ProgramHandle, UniformLocation};

/// Magic at the start of every compiled shader container
pub const DVLB_MAGIC: [u8; 4] = *b"DVLB";

/// Per-vertex Blinn-Phong style lighting
///
/// Inputs: v0 position, v1 texcoord, v2 normal.
///
/// Uniforms (float registers):
///   - projection[4]  c0..c3
///   - modelView[4]   c4..c7
///   - lightVec       c8
///   - lightHalfVec   c9
///   - lightClr       c10
///   - material[4]    c11..c14 (ambient, diffuse, specular, emission)
pub const VERTEX_SHADER_SOURCE: &str = r#"
; Uniforms
.fvec projection[4], modelView[4]
.fvec lightVec, lightHalfVec, lightClr, material[4]
.alias mat_amb material[0]
.alias mat_dif material[1]
.alias mat_spe material[2]
.alias mat_emi material[3]

; Constants
.constf myconst(0.0, 1.0, -1.0, -0.5)
.alias  zeros myconst.xxxx
.alias  ones  myconst.yyyy

; Outputs
.out outpos position
.out outtc0 texcoord0
.out outclr color

; Inputs
.alias inpos v0
.alias intex v1
.alias innrm v2

.proc main
    ; r0 = (inpos, 1)
    mov r0.xyz, inpos
    mov r0.w, ones

    ; r1 = modelView * r0
    dp4 r1.x, modelView[0], r0
    dp4 r1.y, modelView[1], r0
    dp4 r1.z, modelView[2], r0
    dp4 r1.w, modelView[3], r0

    ; outpos = projection * r1
    dp4 outpos.x, projection[0], r1
    dp4 outpos.y, projection[1], r1
    dp4 outpos.z, projection[2], r1
    dp4 outpos.w, projection[3], r1

    mov outtc0, intex

    ; r14 = normalize(modelView * innrm)
    dp3 r14.x, modelView[0], innrm
    dp3 r14.y, modelView[1], innrm
    dp3 r14.z, modelView[2], innrm
    dp3 r6.x, r14, r14
    rsq r6.x, r6.x
    mul r14.xyz, r14.xyz, r6.x

    ; r0 = emission + ambient
    mov r0, mat_emi
    add r0, mat_amb, r0

    ; r0 += diffuse * max(0, -lightVec . n)
    dp3 r1.x, lightVec, r14
    max r1.x, zeros, -r1.x
    mul r1, mat_dif, r1.x
    add r0, r0, r1

    ; r0 += specular * max(0, -lightHalfVec . n)^2
    dp3 r1.x, lightHalfVec, r14
    max r1.x, zeros, -r1.x
    mul r1.x, r1.x, r1.x
    mul r1, mat_spe, r1.x
    add r0, r0, r1

    min r0, ones, r0
    mul outclr, lightClr, r0

    end
.end
"#;

pub const UNIFORM_PROJECTION: &str = "projection";
pub const UNIFORM_MODEL_VIEW: &str = "modelView";
pub const UNIFORM_LIGHT_VEC: &str = "lightVec";
pub const UNIFORM_LIGHT_HALF_VEC: &str = "lightHalfVec";
pub const UNIFORM_LIGHT_COLOR: &str = "lightClr";
pub const UNIFORM_MATERIAL: &str = "material";

/// Uniform names and their registers in [`VERTEX_SHADER_SOURCE`]
pub const STANDARD_UNIFORMS: [(&str, i32); 6] = [
    (UNIFORM_PROJECTION, 0),
    (UNIFORM_MODEL_VIEW, 4),
    (UNIFORM_LIGHT_VEC, 8),
    (UNIFORM_LIGHT_HALF_VEC, 9),
    (UNIFORM_LIGHT_COLOR, 10),
    (UNIFORM_MATERIAL, 11),
];

/// Uniform locations cached at renderer startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocations {
    pub projection: UniformLocation,
    pub model_view: UniformLocation,
    pub light_vec: UniformLocation,
    pub light_half_vec: UniformLocation,
    pub light_color: UniformLocation,
    pub material: UniformLocation,
}

impl UniformLocations {
    /// Looks up every uniform the renderer writes.
    ///
    /// A missing uniform means the binary does not match this interface.
    pub fn resolve<G: GpuBackend + ?Sized>(
        gpu: &G,
        program: ProgramHandle,
    ) -> Result<Self, RenderError> {
        let find = |name: &'static str| {
            gpu.uniform_location(program, name)
                .ok_or(RenderError::MissingUniform(name))
        };

        Ok(Self {
            projection: find(UNIFORM_PROJECTION)?,
            model_view: find(UNIFORM_MODEL_VIEW)?,
            light_vec: find(UNIFORM_LIGHT_VEC)?,
            light_half_vec: find(UNIFORM_LIGHT_HALF_VEC)?,
            light_color: find(UNIFORM_LIGHT_COLOR)?,
            material: find(UNIFORM_MATERIAL)?,
        })
    }
}
