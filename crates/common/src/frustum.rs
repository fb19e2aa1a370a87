use std::ops::{Index, IndexMut};

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;
use crate::plane::Plane;

/// Six inward-facing planes bounding what a camera can see.
///
/// Indexed access follows the order top, bottom, left, right, far, near.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Frustum {
    pub top: Plane,
    pub bottom: Plane,
    pub left: Plane,
    pub right: Plane,
    pub far: Plane,
    pub near: Plane,
}

impl Frustum {
    pub const PLANE_COUNT: usize = 6;

    /// Extracts the planes in camera-local space from an OpenGL style
    /// projection (depth range -1..1) whose camera looks along +Z.
    pub fn from_projection(projection: &Mat4) -> Self {
        let r1 = projection.row(0);
        let r2 = projection.row(1);
        let r3 = projection.row(2);
        let r4 = projection.row(3);
        let plane = |v| Plane::from_general_form_vec(v).flipped();
        Self {
            top: plane(r4 + r2),
            bottom: plane(r4 - r2),
            left: plane(r4 + r1),
            right: plane(r4 - r1),
            far: plane(r4 - r3),
            near: plane(r4 + r3),
        }
    }

    pub fn planes(&self) -> [Plane; 6] {
        [
            self.top,
            self.bottom,
            self.left,
            self.right,
            self.far,
            self.near,
        ]
    }

    /// Every plane carried through `matrix`.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            top: self.top.transformed(matrix),
            bottom: self.bottom.transformed(matrix),
            left: self.left.transformed(matrix),
            right: self.right.transformed(matrix),
            far: self.far.transformed(matrix),
            near: self.near.transformed(matrix),
        }
    }

    /// Conservative visibility test.
    ///
    /// The box is rejected only when all eight corners lie strictly behind a
    /// single plane. Corners exactly on a plane count as inside.
    pub fn is_aabb_on_frustum(&self, aabb: &Aabb) -> bool {
        let corners = aabb.vertices();
        self.planes()
            .iter()
            .all(|plane| corners.iter().any(|c| plane.is_facing_the_point(*c)))
    }
}

impl Index<usize> for Frustum {
    type Output = Plane;

    fn index(&self, index: usize) -> &Plane {
        match index {
            0 => &self.top,
            1 => &self.bottom,
            2 => &self.left,
            3 => &self.right,
            4 => &self.far,
            5 => &self.near,
            _ => panic!("frustum plane index {index} out of range"),
        }
    }
}

impl IndexMut<usize> for Frustum {
    fn index_mut(&mut self, index: usize) -> &mut Plane {
        match index {
            0 => &mut self.top,
            1 => &mut self.bottom,
            2 => &mut self.left,
            3 => &mut self.right,
            4 => &mut self.far,
            5 => &mut self.near,
            _ => panic!("frustum plane index {index} out of range"),
        }
    }
}
