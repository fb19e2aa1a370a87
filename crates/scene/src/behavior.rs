use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;

use glam::{Quat, Vec2, Vec3};
use lumen_common::{InputState, Key};

use crate::node::NodeId;
use crate::tree::SceneTree;

/// What a behaviour sees during the update walk.
pub struct UpdateContext<'a> {
    pub tree: &'a mut SceneTree,
    pub delta_time: f32,
    pub input: &'a dyn InputState,
}

/// Per-frame logic attached to a node.
///
/// While a behaviour runs it is detached from its node, so the tree can be
/// mutated freely. Removing any node from inside `update` is deferred until
/// the walk has finished.
pub trait Behavior: fmt::Debug {
    fn update(&mut self, node: NodeId, ctx: &mut UpdateContext<'_>);

    fn box_clone(&self) -> Box<dyn Behavior>;
}

/// Free-flying camera driver: cursor to look, W/A/S/D to move.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectatorController {
    pub yaw: f32,
    pub pitch: f32,
    /// Units per second.
    pub speed: f32,
    /// Radians per pixel of cursor movement.
    pub sensitivity: f32,
}

impl Default for SpectatorController {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            speed: 5.0,
            sensitivity: 0.003,
        }
    }
}

impl SpectatorController {
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    /// Applies a cursor delta. Pitch is clamped to straight up/down and yaw
    /// wraps into `[-PI, PI]`.
    pub fn look(&mut self, cursor_delta: Vec2) {
        self.yaw -= cursor_delta.x * self.sensitivity;
        self.pitch += cursor_delta.y * self.sensitivity;
        self.pitch = self.pitch.clamp(-FRAC_PI_2, FRAC_PI_2);
        if !(-PI..=PI).contains(&self.yaw) {
            self.yaw = (self.yaw + PI).rem_euclid(TAU) - PI;
        }
    }

    /// Unit direction requested by the movement keys, or zero.
    pub fn movement(&self, input: &dyn InputState) -> Vec3 {
        let rotation = self.rotation();
        let forward = rotation * Vec3::Z;
        let right = rotation * Vec3::NEG_X;
        let mut direction = Vec3::ZERO;
        if input.is_key_pressed(Key::W) {
            direction += forward;
        }
        if input.is_key_pressed(Key::S) {
            direction -= forward;
        }
        if input.is_key_pressed(Key::D) {
            direction += right;
        }
        if input.is_key_pressed(Key::A) {
            direction -= right;
        }
        direction.normalize_or_zero()
    }
}

impl Behavior for SpectatorController {
    fn update(&mut self, node: NodeId, ctx: &mut UpdateContext<'_>) {
        self.look(ctx.input.cursor_delta());
        let step = self.movement(ctx.input) * self.speed * ctx.delta_time;
        let rotation = self.rotation();
        if let Some(node) = ctx.tree.node_mut(node) {
            node.set_rotation(rotation);
            if step != Vec3::ZERO {
                node.translate(step);
            }
        }
    }

    fn box_clone(&self) -> Box<dyn Behavior> {
        Box::new(self.clone())
    }
}
