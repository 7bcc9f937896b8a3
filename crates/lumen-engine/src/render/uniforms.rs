//! Uniform blocks shared by the built-in shader programs.
//!
//! Field order and padding must match the `Frame` / `Object` structs in
//! `shader/wgsl/*.wgsl`.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::color::Color;

use super::{Camera, DirectionalLight};

/// Group 0, binding 0.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    /// xyz: light direction, w: ambient.
    pub light: [f32; 4],
    /// x: near, y: far.
    pub depth_range: [f32; 4],
}

impl FrameUniform {
    pub const SIZE: u64 = std::mem::size_of::<FrameUniform>() as u64;

    pub fn new(camera: &Camera, light: &DirectionalLight, aspect: f32) -> Self {
        Self {
            view_proj: camera.view_proj(aspect).to_cols_array_2d(),
            view: camera.view().to_cols_array_2d(),
            camera_pos: camera.eye.extend(1.0).to_array(),
            light: light.direction.extend(light.ambient).to_array(),
            depth_range: [camera.near, camera.far, 0.0, 0.0],
        }
    }
}

/// Group 1, binding 0.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl ObjectUniform {
    pub const SIZE: u64 = std::mem::size_of::<ObjectUniform>() as u64;

    pub fn new(model: Mat4, color: Color) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix(model).to_cols_array_2d(),
            color: color.to_array(),
        }
    }
}

impl Default for ObjectUniform {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Color::WHITE)
    }
}

/// Inverse-transpose of `model`; identity for singular matrices.
fn normal_matrix(model: Mat4) -> Mat4 {
    if model.determinant().abs() <= f32::EPSILON {
        Mat4::IDENTITY
    } else {
        model.inverse().transpose()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn sizes_match_wgsl_layout() {
        assert_eq!(FrameUniform::SIZE, 176);
        assert_eq!(ObjectUniform::SIZE, 144);
    }

    #[test]
    fn non_uniform_scale_keeps_normals_perpendicular() {
        let model = Mat4::from_scale(Vec3::new(4.0, 1.0, 1.0));
        let n = normal_matrix(model);
        // A surface tangent (1,1,0) scaled by the model stays perpendicular to the
        // normal (1,-1,0) transformed by the normal matrix.
        let t = model.transform_vector3(Vec3::new(1.0, 1.0, 0.0));
        let nn = n.transform_vector3(Vec3::new(1.0, -1.0, 0.0));
        assert!(t.dot(nn).abs() < 1e-5);
    }

    #[test]
    fn singular_model_falls_back_to_identity() {
        let model = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(normal_matrix(model), Mat4::IDENTITY);
    }

    #[test]
    fn frame_uniform_packs_light_and_depth() {
        let cam = Camera::default();
        let light = DirectionalLight::default();
        let u = FrameUniform::new(&cam, &light, 1.5);
        assert_eq!(u.light[3], light.ambient);
        assert_eq!(u.depth_range[..2], [cam.near, cam.far]);
        assert_eq!(u.camera_pos[3], 1.0);
    }
}
