//! Rendering server: owns the scene and drives the frame loop.
//!
//! # Invariants
//! - The server reads the scene's render registry; it never walks the tree
//!   looking for drawables.
//! - GUI canvases are drawn after every drawable, with depth testing off.
//! - The drawn-triangle counter starts at zero every frame.
//! - Without a camera the frame still runs, with identity matrices.
//!
//! # Backends
//! The GPU and the OS window sit behind the [`GraphicsDevice`] and [`Window`]
//! traits. [`RecordingDevice`] and [`HeadlessWindow`] implement them without
//! a display, for tests and command line runs.
//!
//! [`GraphicsDevice`]: lumen_common::GraphicsDevice

pub mod lighting;
pub mod recording;
pub mod server;
pub mod settings;
pub mod stats;
pub mod window;

use lumen_scene::SceneError;

pub use lighting::LightingEnvironment;
pub use recording::{DeviceCommand, RecordingDevice};
pub use server::{FrameUpdate, RenderingServer};
pub use settings::{ConfigError, RenderSettings};
pub use stats::{FrameStats, FrameTimer};
pub use window::{HeadlessWindow, Window};

/// Errors from the rendering server.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("texture {0:?} is not a cubemap")]
    NotACubemap(String),
    #[error("no camera is registered")]
    MissingCamera,
    #[error(transparent)]
    Scene(#[from] SceneError),
}

pub fn crate_info() -> &'static str {
    "lumen-render v0.1.0"
}
