//! Scene graph: hierarchical transforms, cameras and render registration.
//!
//! # Invariants
//! - A node's local matrix cache is valid whenever its dirty flag is clear.
//! - Global transforms always reflect the current ancestor chain; there is no
//!   refresh step.
//! - The render registry holds a node's handle exactly while that node is
//!   attached to the tree.
//! - Removal requested during the update walk takes effect after the walk.

pub mod behavior;
pub mod camera;
pub mod drawable;
pub mod light;
pub mod node;
pub mod registry;
pub mod tree;

pub use behavior::{Behavior, SpectatorController, UpdateContext};
pub use camera::{Camera, CameraRecomputations};
pub use drawable::{DrawContext, Drawable, FrameMatrices, GuiCanvas, MeshDrawable};
pub use light::{LightSample, PointLight};
pub use node::{Node, NodeId, NodeKind, Spatial};
pub use registry::RenderRegistry;
pub use tree::{CameraView, SceneError, SceneTree};

pub fn crate_info() -> &'static str {
    "lumen-scene v0.1.0"
}
