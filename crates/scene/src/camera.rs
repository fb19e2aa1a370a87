//! Camera parameters and the view / projection / frustum derivation.
//!
//! The three matrices are cached independently:
//! - view: invalidated by translation or rotation changes of the camera node,
//!   and rebuilt whenever the global pose differs from the one it came from
//!   (an ancestor moved);
//! - projection: invalidated by field of view, aspect ratio, near or far
//!   changes, including a new framebuffer aspect in automatic mode;
//! - view-projection: invalidated whenever either source is rebuilt.
//!
//! The camera looks along its local +Z axis with +Y up.

use std::cell::Cell;

use glam::{Mat4, Quat, UVec2, Vec3};
use lumen_common::Frustum;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ViewCache {
    position: Vec3,
    rotation: Quat,
    matrix: Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ProjCache {
    aspect_ratio: f32,
    matrix: Mat4,
}

/// How many times each cached matrix was rebuilt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraRecomputations {
    pub view: u64,
    pub proj: u64,
    pub view_proj: u64,
}

#[derive(Debug)]
pub struct Camera {
    field_of_view: f32,
    manual_aspect_ratio: Option<f32>,
    near_distance: f32,
    far_distance: f32,
    view: Cell<Option<ViewCache>>,
    proj: Cell<Option<ProjCache>>,
    view_proj: Cell<Option<Mat4>>,
    recomputations: Cell<CameraRecomputations>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(90f32.to_radians(), 0.1, 100.0)
    }
}

impl Clone for Camera {
    /// Copies the parameters; caches start empty.
    fn clone(&self) -> Self {
        let mut camera = Self::new(self.field_of_view, self.near_distance, self.far_distance);
        camera.manual_aspect_ratio = self.manual_aspect_ratio;
        camera
    }
}

impl Camera {
    /// `field_of_view` is vertical, in radians. Requires `0 < near < far`;
    /// this is not checked.
    pub fn new(field_of_view: f32, near_distance: f32, far_distance: f32) -> Self {
        Self {
            field_of_view,
            manual_aspect_ratio: None,
            near_distance,
            far_distance,
            view: Cell::new(None),
            proj: Cell::new(None),
            view_proj: Cell::new(None),
            recomputations: Cell::new(CameraRecomputations::default()),
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: f32) -> Self {
        self.set_aspect_ratio(aspect_ratio);
        self
    }

    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    pub fn set_field_of_view(&mut self, field_of_view: f32) {
        self.field_of_view = field_of_view;
        self.invalidate_proj();
    }

    pub fn near_distance(&self) -> f32 {
        self.near_distance
    }

    pub fn set_near_distance(&mut self, near_distance: f32) {
        self.near_distance = near_distance;
        self.invalidate_proj();
    }

    pub fn far_distance(&self) -> f32 {
        self.far_distance
    }

    pub fn set_far_distance(&mut self, far_distance: f32) {
        self.far_distance = far_distance;
        self.invalidate_proj();
    }

    pub fn manual_aspect_ratio(&self) -> Option<f32> {
        self.manual_aspect_ratio
    }

    /// Switches to a fixed aspect ratio.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.manual_aspect_ratio = Some(aspect_ratio);
        self.invalidate_proj();
    }

    /// Goes back to following the framebuffer.
    pub fn reset_aspect_ratio(&mut self) {
        self.manual_aspect_ratio = None;
        self.invalidate_proj();
    }

    /// Manual ratio if set, otherwise `width / height`. A framebuffer with a
    /// zero extent (minimised window) yields 1.
    pub fn aspect_ratio(&self, framebuffer_size: UVec2) -> f32 {
        match self.manual_aspect_ratio {
            Some(ratio) => ratio,
            None if framebuffer_size.x == 0 || framebuffer_size.y == 0 => 1.0,
            None => framebuffer_size.x as f32 / framebuffer_size.y as f32,
        }
    }

    pub fn invalidate_view(&mut self) {
        self.view.set(None);
        self.view_proj.set(None);
    }

    pub fn invalidate_proj(&mut self) {
        self.proj.set(None);
        self.view_proj.set(None);
    }

    pub fn recomputations(&self) -> CameraRecomputations {
        self.recomputations.get()
    }

    fn count(&self, bump: impl FnOnce(&mut CameraRecomputations)) {
        let mut counts = self.recomputations.get();
        bump(&mut counts);
        self.recomputations.set(counts);
    }

    /// View matrix for a camera at `position` with `rotation` (both global).
    pub fn view_matrix(&self, position: Vec3, rotation: Quat) -> Mat4 {
        let cached = self
            .view
            .get()
            .filter(|c| c.position == position && c.rotation == rotation);
        if let Some(cache) = cached {
            return cache.matrix;
        }
        let forward = rotation * Vec3::Z;
        let up = rotation * Vec3::Y;
        let matrix = Mat4::look_at_rh(position, position + forward, up);
        self.view.set(Some(ViewCache {
            position,
            rotation,
            matrix,
        }));
        self.view_proj.set(None);
        self.count(|c| c.view += 1);
        tracing::trace!(?position, "camera view rebuilt");
        matrix
    }

    pub fn proj_matrix(&self, framebuffer_size: UVec2) -> Mat4 {
        let aspect_ratio = self.aspect_ratio(framebuffer_size);
        if let Some(cache) = self.proj.get().filter(|c| c.aspect_ratio == aspect_ratio) {
            return cache.matrix;
        }
        let matrix = Mat4::perspective_rh_gl(
            self.field_of_view,
            aspect_ratio,
            self.near_distance,
            self.far_distance,
        );
        self.proj.set(Some(ProjCache {
            aspect_ratio,
            matrix,
        }));
        self.view_proj.set(None);
        self.count(|c| c.proj += 1);
        tracing::trace!(aspect_ratio, "camera projection rebuilt");
        matrix
    }

    pub fn view_proj_matrix(
        &self,
        position: Vec3,
        rotation: Quat,
        framebuffer_size: UVec2,
    ) -> Mat4 {
        let view = self.view_matrix(position, rotation);
        let proj = self.proj_matrix(framebuffer_size);
        if let Some(matrix) = self.view_proj.get() {
            return matrix;
        }
        let matrix = proj * view;
        self.view_proj.set(Some(matrix));
        self.count(|c| c.view_proj += 1);
        matrix
    }

    /// Inward-facing planes in world space for a camera whose global matrix
    /// is `global_matrix`.
    pub fn frustum(&self, global_matrix: &Mat4, framebuffer_size: UVec2) -> Frustum {
        Frustum::from_projection(&self.proj_matrix(framebuffer_size)).transformed(global_matrix)
    }
}
