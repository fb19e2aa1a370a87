//! Graphics device collaborator.
//!
//! The engine core computes matrices and decides what to draw; a
//! `GraphicsDevice` turns those decisions into API calls. Shader compilation
//! and uniform layout are the device's business.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

use crate::resource::{Material, Mesh, Texture};

/// Per-frame camera block, laid out for direct upload.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    /// xyz = world position, w unused.
    pub camera_position: [f32; 4],
}

impl CameraUniforms {
    pub fn new(view: Mat4, proj: Mat4, view_proj: Mat4, camera_position: Vec3) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            view_proj: view_proj.to_cols_array_2d(),
            camera_position: camera_position.extend(1.0).to_array(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for CameraUniforms {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO)
    }
}

/// One mesh draw with its resolved matrices.
#[derive(Debug, Clone)]
pub struct MeshDrawCall {
    pub mesh: Arc<Mesh>,
    pub material: Arc<Material>,
    pub model: Mat4,
    pub mvp: Mat4,
}

/// Image-based lighting state bound once per frame, before any draw.
#[derive(Debug, Clone, PartialEq)]
pub struct LightingBindings {
    pub environment: Option<Arc<Texture>>,
    pub irradiance: Option<Arc<Texture>>,
    /// Prefiltered specular cubemap.
    pub specular: Option<Arc<Texture>>,
    pub brdf_lut: Option<Arc<Texture>>,
    pub exposure: f32,
}

impl Default for LightingBindings {
    fn default() -> Self {
        Self {
            environment: None,
            irradiance: None,
            specular: None,
            brdf_lut: None,
            exposure: 1.0,
        }
    }
}

pub trait GraphicsDevice {
    fn begin_frame(&mut self, clear_color: [f32; 4]);

    fn set_depth_test(&mut self, enabled: bool);

    fn upload_camera(&mut self, uniforms: &CameraUniforms);

    fn bind_lighting(&mut self, lighting: &LightingBindings);

    fn draw_mesh(&mut self, call: &MeshDrawCall);

    /// `view_rotation` is the view matrix with its translation removed.
    fn draw_skybox(&mut self, cubemap: &Texture, view_rotation: Mat3, proj: Mat4);

    fn end_frame(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_uniforms_layout() {
        let u = CameraUniforms::new(
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            Vec3::new(4.0, 5.0, 6.0),
        );
        assert_eq!(u.as_bytes().len(), 3 * 64 + 16);
        assert_eq!(u.view[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(u.camera_position, [4.0, 5.0, 6.0, 1.0]);
    }
}
