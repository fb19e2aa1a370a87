use std::fmt;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use lumen_common::{Aabb, GraphicsDevice, Material, Mesh, MeshDrawCall};

use crate::light::LightSample;

/// Camera matrices shared by every draw in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMatrices {
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
    pub camera_position: Vec3,
}

impl Default for FrameMatrices {
    /// Degraded mode used when no camera is registered.
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            view_proj: Mat4::IDENTITY,
            camera_position: Vec3::ZERO,
        }
    }
}

/// Everything a drawable needs to issue its draw calls for one frame.
pub struct DrawContext<'a> {
    pub frame: FrameMatrices,
    /// Global matrix of the node being drawn.
    pub model: Mat4,
    /// Final clip-space transform for this draw.
    pub mvp: Mat4,
    pub lights: &'a [LightSample],
    pub device: &'a mut dyn GraphicsDevice,
    triangles: &'a mut u64,
}

impl<'a> DrawContext<'a> {
    pub fn new(
        frame: FrameMatrices,
        model: Mat4,
        mvp: Mat4,
        lights: &'a [LightSample],
        device: &'a mut dyn GraphicsDevice,
        triangles: &'a mut u64,
    ) -> Self {
        Self {
            frame,
            model,
            mvp,
            lights,
            device,
            triangles,
        }
    }

    /// Adds to the frame's drawn-triangle counter.
    pub fn report_triangles(&mut self, count: u64) {
        *self.triangles += count;
    }
}

/// Something that issues draw calls when its node survives culling.
pub trait Drawable: fmt::Debug {
    fn draw(&self, ctx: &mut DrawContext<'_>);

    /// Sort key; drawables with equal keys share GPU state. Lower draws first.
    fn render_key(&self) -> u64 {
        0
    }

    /// Bounds in node-local space. `None` opts out of culling.
    fn local_bounds(&self) -> Option<Aabb> {
        None
    }

    fn box_clone(&self) -> Box<dyn Drawable>;
}

/// A shared mesh drawn with a shared material.
#[derive(Debug, Clone)]
pub struct MeshDrawable {
    pub mesh: Arc<Mesh>,
    pub material: Arc<Material>,
    pub render_key: u64,
}

impl MeshDrawable {
    pub fn new(mesh: Arc<Mesh>, material: Arc<Material>) -> Self {
        Self {
            mesh,
            material,
            render_key: 0,
        }
    }

    pub fn with_render_key(mut self, render_key: u64) -> Self {
        self.render_key = render_key;
        self
    }
}

impl Drawable for MeshDrawable {
    fn draw(&self, ctx: &mut DrawContext<'_>) {
        ctx.device.draw_mesh(&MeshDrawCall {
            mesh: Arc::clone(&self.mesh),
            material: Arc::clone(&self.material),
            model: ctx.model,
            mvp: ctx.mvp,
        });
        ctx.report_triangles(self.mesh.triangle_count() as u64);
    }

    fn render_key(&self) -> u64 {
        self.render_key
    }

    fn local_bounds(&self) -> Option<Aabb> {
        Some(self.mesh.bounds())
    }

    fn box_clone(&self) -> Box<dyn Drawable> {
        Box::new(self.clone())
    }
}

/// GUI layer drawn after the 3D scene without depth testing.
///
/// A screen-overlayed canvas draws with an identity MVP; otherwise it sits in
/// the world and uses `view_proj * global_matrix`.
#[derive(Debug)]
pub struct GuiCanvas {
    pub screen_overlayed: bool,
    pub content: Box<dyn Drawable>,
}

impl GuiCanvas {
    pub fn overlay(content: impl Drawable + 'static) -> Self {
        Self {
            screen_overlayed: true,
            content: Box::new(content),
        }
    }

    pub fn in_world(content: impl Drawable + 'static) -> Self {
        Self {
            screen_overlayed: false,
            content: Box::new(content),
        }
    }
}

impl Clone for GuiCanvas {
    fn clone(&self) -> Self {
        Self {
            screen_overlayed: self.screen_overlayed,
            content: self.content.box_clone(),
        }
    }
}
