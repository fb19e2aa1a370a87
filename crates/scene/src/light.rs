use glam::Vec3;

/// Omnidirectional light placed at its node's global position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

impl PointLight {
    pub fn new(color: Vec3, intensity: f32) -> Self {
        Self { color, intensity }
    }

    /// Colour scaled by intensity, as handed to shading.
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}

/// A light resolved for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    pub position: Vec3,
    pub color: Vec3,
}
