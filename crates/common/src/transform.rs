use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::ops::{Div, DivAssign, Mul, MulAssign};

/// Spatial transform: translation, scale, rotation.
///
/// `rotation` is expected to be unit length. Nothing here normalizes it; a
/// non-unit rotation produces a skewed matrix rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub scale: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        scale: Vec3::ONE,
        rotation: Quat::IDENTITY,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Self::IDENTITY
        }
    }

    /// Local-to-parent matrix: `translate * scale * rotate`.
    ///
    /// Geometry is rotated first, then scaled, then translated.
    pub fn calculate_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation)
            * Mat4::from_scale(self.scale)
            * Mat4::from_quat(self.rotation)
    }

    /// Combines two transforms field by field, like matrix multiplication:
    /// the effect of `other` is applied first, then `self`.
    pub fn combine(&self, other: &Transform) -> Transform {
        Transform {
            translation: self.translation + other.translation,
            scale: self.scale * other.scale,
            rotation: self.rotation * other.rotation,
        }
    }

    /// Inverse of [`Transform::combine`] with respect to its right operand.
    pub fn divide(&self, other: &Transform) -> Transform {
        Transform {
            translation: self.translation - other.translation,
            scale: self.scale / other.scale,
            rotation: self.rotation * quat_inverse(other.rotation),
        }
    }
}

/// True quaternion inverse. Equals the conjugate for unit quaternions.
fn quat_inverse(q: Quat) -> Quat {
    q.conjugate() / q.length_squared()
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        self.combine(&rhs)
    }
}

impl MulAssign for Transform {
    fn mul_assign(&mut self, rhs: Transform) {
        *self = self.combine(&rhs);
    }
}

impl Div for Transform {
    type Output = Transform;

    fn div(self, rhs: Transform) -> Transform {
        self.divide(&rhs)
    }
}

impl DivAssign for Transform {
    fn div_assign(&mut self, rhs: Transform) {
        *self = self.divide(&rhs);
    }
}
