//! Shared value types for the lumen engine: transforms, culling geometry,
//! read-only resources and the interfaces of external collaborators.
//!
//! # Invariants
//! - Every type here is a plain value or an immutable resource; none holds
//!   references into the scene.
//! - Quaternions are never normalised behind the caller's back.

pub mod aabb;
pub mod device;
pub mod frustum;
pub mod input;
pub mod plane;
pub mod resource;
pub mod transform;

pub use aabb::Aabb;
pub use device::{CameraUniforms, GraphicsDevice, LightingBindings, MeshDrawCall};
pub use frustum::Frustum;
pub use input::{InputSnapshot, InputState, Key, NoInput};
pub use plane::Plane;
pub use resource::{
    Material, Mesh, ResourceError, Texture, TextureFormat, TextureKind, Vertex,
};
pub use transform::Transform;

pub fn crate_info() -> &'static str {
    "lumen-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
