//! Transforms and the fixed projection
//!
//! Matrices are glam `Mat4` on the CPU side and go to the shader as four row
//! registers (see [`matrix_rows`]).

use glam::{Mat4, Quat, Vec3, Vec4};

/// Position, rotation and scale of a drawable
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            ..Default::default()
        }
    }

    /// Get the model matrix
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Rotate by quat
    pub fn rotate(&mut self, rotation: Quat) {
        self.rotation = rotation * self.rotation;
    }
}

/// Screen aspect ratio of the target console
pub struct AspectRatio;

impl AspectRatio {
    /// 400x240 top panel
    pub const TOP_SCREEN: f32 = 400.0 / 240.0;
}

/// Perspective parameters, fixed at renderer initialization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionConfig {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 80.0,
            aspect: AspectRatio::TOP_SCREEN,
            near: 0.01,
            far: 1000.0,
        }
    }
}

impl ProjectionConfig {
    pub fn matrix(&self) -> Mat4 {
        perspective_tilt(self.fov_y_degrees.to_radians(), self.aspect, self.near, self.far)
    }
}

/// Right-handed perspective for a framebuffer mounted rotated by 90 degrees.
///
/// Clip-space depth runs from -1 at the near plane to 0 at the far plane, and
/// the x/y axes are swapped so the image comes out upright on the rotated
/// panel. `fov` spans the world y axis; world x is widened by `aspect`.
pub fn perspective_tilt(fov: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let tan = (fov * 0.5).tan();
    let w_sign = -1.0;

    let rows = [
        [0.0, -1.0 / tan, 0.0, 0.0],
        [1.0 / (tan * aspect), 0.0, 0.0, 0.0],
        [0.0, 0.0, -w_sign * near / (near - far), far * near / (near - far)],
        [0.0, 0.0, w_sign, 0.0],
    ];
    Mat4::from_cols_array_2d(&rows).transpose()
}

/// Row-major view of a matrix, one `[x, y, z, w]` per uniform register
pub fn matrix_rows(m: &Mat4) -> [[f32; 4]; 4] {
    [
        m.row(0).to_array(),
        m.row(1).to_array(),
        m.row(2).to_array(),
        m.row(3).to_array(),
    ]
}

/// Inverse of [`matrix_rows`]
pub fn matrix_from_rows(rows: [[f32; 4]; 4]) -> Mat4 {
    Mat4::from_cols(
        Vec4::from_array(rows[0]),
        Vec4::from_array(rows[1]),
        Vec4::from_array(rows[2]),
        Vec4::from_array(rows[3]),
    )
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn depth_at(proj: &Mat4, z: f32) -> f32 {
        let clip = *proj * Vec4::new(0.0, 0.0, z, 1.0);
        clip.z / clip.w
    }

    #[test]
    fn near_plane_maps_to_minus_one() {
        let cfg = ProjectionConfig::default();
        let proj = cfg.matrix();
        assert_relative_eq!(depth_at(&proj, -cfg.near), -1.0, epsilon = 1e-4);
    }

    #[test]
    fn far_plane_maps_to_zero() {
        let cfg = ProjectionConfig::default();
        let proj = cfg.matrix();
        assert_relative_eq!(depth_at(&proj, -cfg.far), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn tilt_swaps_axes() {
        let proj = ProjectionConfig::default().matrix();
        // A point to the right ends up on the clip-space y axis.
        let clip = proj * Vec4::new(1.0, 0.0, -1.0, 1.0);
        assert_relative_eq!(clip.x, 0.0);
        assert!(clip.y > 0.0);
        let clip = proj * Vec4::new(0.0, 1.0, -1.0, 1.0);
        assert!(clip.x < 0.0);
        assert_relative_eq!(clip.y, 0.0);
    }

    #[test]
    fn horizontal_axis_is_wider_by_aspect() {
        let cfg = ProjectionConfig::default();
        let proj = cfg.matrix();
        let tan = (cfg.fov_y_degrees.to_radians() * 0.5).tan();

        let vertical = (proj * Vec4::new(0.0, 1.0, -1.0, 1.0)).x.abs();
        let horizontal = (proj * Vec4::new(1.0, 0.0, -1.0, 1.0)).y.abs();
        assert_relative_eq!(vertical, 1.0 / tan, epsilon = 1e-5);
        assert_relative_eq!(horizontal, 1.0 / (tan * AspectRatio::TOP_SCREEN), epsilon = 1e-5);
        assert_relative_eq!(vertical / horizontal, AspectRatio::TOP_SCREEN, epsilon = 1e-4);
    }

    #[test]
    fn rows_roundtrip() {
        let m = Transform::from_translation(1.0, 2.0, 3.0).to_mat4();
        let rows = matrix_rows(&m);
        assert_eq!(rows[0][3], 1.0);
        assert_eq!(rows[1][3], 2.0);
        assert_eq!(rows[2][3], 3.0);
        assert_eq!(matrix_from_rows(rows), m);
    }

    #[test]
    fn identity_rows() {
        let rows = matrix_rows(&Mat4::IDENTITY);
        for (i, row) in rows.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                assert_eq!(*v, if i == j { 1.0 } else { 0.0 });
            }
        }
    }
}
