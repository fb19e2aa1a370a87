use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box. `point_min <= point_max` componentwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub point_min: Vec3,
    pub point_max: Vec3,
}

impl Aabb {
    pub fn new(point_min: Vec3, point_max: Vec3) -> Self {
        Self {
            point_min,
            point_max,
        }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            point_min: center - half_extents,
            point_max: center + half_extents,
        }
    }

    /// Smallest box containing every point. `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (point_min, point_max) =
            points.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Self {
            point_min,
            point_max,
        })
    }

    pub fn center(&self) -> Vec3 {
        (self.point_min + self.point_max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.point_max - self.point_min) * 0.5
    }

    /// Corner `index` of the box. Bit 0 picks max x, bit 1 max y, bit 2 max z.
    ///
    /// # Panics
    /// If `index >= 8`.
    pub fn get_vertex(&self, index: usize) -> Vec3 {
        assert!(index < 8, "AABB vertex index {index} out of range");
        let pick = |bit: usize, min: f32, max: f32| if index & bit != 0 { max } else { min };
        Vec3::new(
            pick(1, self.point_min.x, self.point_max.x),
            pick(2, self.point_min.y, self.point_max.y),
            pick(4, self.point_min.z, self.point_max.z),
        )
    }

    pub fn vertices(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| self.get_vertex(i))
    }

    /// Box enclosing all eight corners after `matrix` is applied.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let corners = self.vertices().map(|v| matrix.transform_point3(v));
        let mut point_min = corners[0];
        let mut point_max = corners[0];
        for c in &corners[1..] {
            point_min = point_min.min(*c);
            point_max = point_max.max(*c);
        }
        Self::new(point_min, point_max)
    }
}
