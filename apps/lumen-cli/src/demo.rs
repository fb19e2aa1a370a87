//! Demo scene used by `lumen-cli run`.

use std::sync::Arc;

use glam::{Quat, Vec2, Vec3};
use lumen_common::{GraphicsDevice, InputSnapshot, Key, Material, Mesh, Texture, TextureKind};
use lumen_render::{HeadlessWindow, RenderError, RenderingServer};
use lumen_scene::{
    Behavior, Camera, GuiCanvas, MeshDrawable, Node, NodeId, PointLight, SpectatorController,
    UpdateContext,
};

/// Spins its node around the local Y axis.
#[derive(Debug, Clone)]
pub struct Spinner {
    /// Radians per second.
    pub speed: f32,
}

impl Behavior for Spinner {
    fn update(&mut self, node: NodeId, ctx: &mut UpdateContext<'_>) {
        let Some(node) = ctx.tree.node_mut(node) else {
            return;
        };
        let rotation = node.transform().rotation * Quat::from_rotation_y(self.speed * ctx.delta_time);
        node.set_rotation(rotation.normalize());
    }

    fn box_clone(&self) -> Box<dyn Behavior> {
        Box::new(self.clone())
    }
}

/// Dims a point light and removes it once it is dark.
#[derive(Debug, Clone)]
pub struct Fader {
    /// Intensity lost per second.
    pub rate: f32,
}

impl Behavior for Fader {
    fn update(&mut self, node: NodeId, ctx: &mut UpdateContext<'_>) {
        let Some(light) = ctx.tree.node_mut(node).and_then(Node::as_point_light_mut) else {
            return;
        };
        light.intensity = (light.intensity - self.rate * ctx.delta_time).max(0.0);
        if light.intensity == 0.0 {
            tracing::info!(?node, "light faded out");
            if let Err(err) = ctx.tree.remove_node(node) {
                tracing::warn!(%err, "could not remove faded light");
            }
        }
    }

    fn box_clone(&self) -> Box<dyn Behavior> {
        Box::new(self.clone())
    }
}

/// Populate the server's scene: a spectator camera, a ring of spinning
/// cubes, a fading light, a HUD overlay and a sky.
pub fn build<D: GraphicsDevice>(
    server: &mut RenderingServer<HeadlessWindow, D>,
    cubes: usize,
) -> Result<(), RenderError> {
    let root = server.scene().root();
    let camera = server.add_node(
        root,
        Node::camera("spectator", Camera::default())
            .with_translation(Vec3::new(0.0, 1.5, -8.0))
            .with_behavior(SpectatorController::default()),
    )?;
    server.scene_mut().make_current_camera(camera)?;

    let cube = Arc::new(Mesh::cube());
    let stone = Arc::new(Material {
        name: "stone".into(),
        ..Material::default()
    });
    let ring = server.add_node(root, Node::spatial("ring"))?;
    for i in 0..cubes {
        let angle = i as f32 / cubes.max(1) as f32 * std::f32::consts::TAU;
        let at = Vec3::new(angle.cos() * 4.0, 0.0, angle.sin() * 4.0);
        server.add_node(
            ring,
            Node::drawable(
                format!("cube{i}"),
                MeshDrawable::new(Arc::clone(&cube), Arc::clone(&stone)).with_render_key(i as u64 % 3),
            )
            .with_translation(at)
            .with_behavior(Spinner { speed: 1.0 + i as f32 * 0.1 }),
        )?;
    }

    server.add_node(
        root,
        Node::point_light("flare", PointLight::new(Vec3::new(1.0, 0.8, 0.6), 2.0))
            .with_translation(Vec3::new(0.0, 3.0, 0.0))
            .with_behavior(Fader { rate: 1.0 }),
    )?;
    server.add_node(root, Node::point_light("sun", PointLight::default()))?;

    let hud = MeshDrawable::new(
        Arc::clone(&cube),
        Arc::new(Material {
            name: "hud".into(),
            ..Material::default()
        }),
    );
    server.add_node(root, Node::gui_canvas("hud", GuiCanvas::overlay(hud)))?;

    server.set_cubemap(Arc::new(Texture::solid(
        "sky",
        TextureKind::Cubemap,
        [90, 120, 200, 255],
    )))?;
    tracing::info!(nodes = server.scene().len(), "demo scene built");
    Ok(())
}

/// Scripted input: walk forward while slowly turning.
pub fn script(window: &mut HeadlessWindow, frames: u64) {
    for _ in 0..frames / 2 {
        window.push_input(
            InputSnapshot::default()
                .with_key(Key::W)
                .with_cursor_delta(Vec2::new(4.0, 0.0)),
        );
    }
}
