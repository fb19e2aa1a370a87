use glam::{Mat3, Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Plane in general form: `dot(normal, p) - distance = 0`.
///
/// `normal` is expected to be unit length for the signed-distance reading of
/// `distance` to hold. Points with `dot(normal, p) - distance >= 0` lie on the
/// side the normal points to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            normal: Vec3::Y,
            distance: 0.0,
        }
    }
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Builds a plane from the coefficients of `a*x + b*y + c*z + d = 0`,
    /// normalised by the length of `(a, b, c)`.
    pub fn from_general_form(a: f32, b: f32, c: f32, d: f32) -> Self {
        let abc = Vec3::new(a, b, c);
        let length = abc.length();
        Self {
            normal: abc / length,
            distance: d / length,
        }
    }

    pub fn from_general_form_vec(coefficients: Vec4) -> Self {
        Self::from_general_form(
            coefficients.x,
            coefficients.y,
            coefficients.z,
            coefficients.w,
        )
    }

    /// Signed distance of `point` from the plane along the normal.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.distance
    }

    /// True when `point` is on the normal side or exactly on the plane.
    pub fn is_facing_the_point(&self, point: Vec3) -> bool {
        self.signed_distance(point) >= 0.0
    }

    /// Same plane with the opposite orientation.
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            distance: -self.distance,
        }
    }

    /// Plane carried through `matrix`.
    ///
    /// The normal goes through the inverse transpose of the upper 3x3 block
    /// and is not renormalised. The reference point `normal * distance` goes
    /// through the full matrix and the distance is recomputed against it.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let point = (*matrix * (self.normal * self.distance).extend(1.0)).truncate();
        let normal = Mat3::from_mat4(*matrix).inverse().transpose() * self.normal;
        Self {
            normal,
            distance: point.dot(normal),
        }
    }

    pub fn abs_diff_eq(&self, other: &Plane, max_abs_diff: f32) -> bool {
        self.normal.abs_diff_eq(other.normal, max_abs_diff)
            && (self.distance - other.distance).abs() <= max_abs_diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    // Rotation built from Euler angles in radians, applied X first, then Y, then Z.
    fn euler(x: f32, y: f32, z: f32) -> Quat {
        Quat::from_rotation_z(z) * Quat::from_rotation_y(y) * Quat::from_rotation_x(x)
    }

    #[test]
    fn general_form_is_normalised() {
        let plane = Plane::from_general_form(0.0, 3.0, 4.0, 10.0);
        assert!(plane.normal.abs_diff_eq(Vec3::new(0.0, 0.6, 0.8), 1e-6));
        assert!((plane.distance - 2.0).abs() < 1e-6);

        let same = Plane::from_general_form_vec(Vec4::new(0.0, 3.0, 4.0, 10.0));
        assert_eq!(plane, same);
    }

    #[test]
    fn facing_is_inclusive() {
        let plane = Plane::new(Vec3::Z, 0.2);
        assert!(plane.is_facing_the_point(Vec3::new(0.0, 0.0, 0.2)));
        assert!(plane.is_facing_the_point(Vec3::new(5.0, -3.0, 1.0)));
        assert!(!plane.is_facing_the_point(Vec3::new(0.0, 0.0, 0.1)));
    }

    #[test]
    fn flipped_reverses_sides() {
        let plane = Plane::new(Vec3::X, 1.0);
        let flipped = plane.flipped();
        assert_eq!(flipped.normal, -Vec3::X);
        assert_eq!(flipped.distance, -1.0);
        assert!(plane.is_facing_the_point(Vec3::new(2.0, 0.0, 0.0)));
        assert!(!flipped.is_facing_the_point(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn translation_moves_distance() {
        let plane = Plane::new(Vec3::Y, 1.0);
        let moved = plane.transformed(&Mat4::from_translation(Vec3::new(7.0, 2.0, -1.0)));
        assert!(moved.normal.abs_diff_eq(Vec3::Y, 1e-6));
        assert!((moved.distance - 3.0).abs() < 1e-6);
    }

    #[test]
    fn transformed_by_rotation_and_translation() {
        let s = std::f32::consts::FRAC_1_SQRT_2;
        let plane = Plane::new(Vec3::new(s, s, 0.0), 2.0);
        let matrix = Mat4::from_translation(Vec3::new(1.5, 2.0, -3.5))
            * Mat4::from_quat(euler(
                30f32.to_radians(),
                45f32.to_radians(),
                (-60f32).to_radians(),
            ));

        let moved = plane.transformed(&matrix);
        assert!(
            moved
                .normal
                .abs_diff_eq(Vec3::new(0.905_330, -0.343_330, -0.250_002), 0.001)
        );
        assert!((moved.distance - 3.546_325).abs() < 0.001);
    }

    #[test]
    fn transform_round_trip() {
        let plane = Plane::from_general_form(1.0, -2.0, 0.5, 3.0);
        let matrix = Mat4::from_rotation_translation(
            euler(0.4, -1.2, 2.0),
            Vec3::new(-4.0, 0.5, 9.0),
        );
        let back = plane
            .transformed(&matrix)
            .transformed(&matrix.inverse());
        assert!(back.abs_diff_eq(&plane, 1e-4));
    }
}
