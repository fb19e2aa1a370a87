use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{Mat3, Mat4, Vec3};
use lumen_common::{CameraUniforms, Frustum, GraphicsDevice, InputState, Texture};
use lumen_scene::{DrawContext, FrameMatrices, LightSample, Node, NodeId, SceneTree};

use crate::RenderError;
use crate::lighting::LightingEnvironment;
use crate::settings::RenderSettings;
use crate::stats::{FrameStats, FrameTimer};
use crate::window::Window;

/// Handed to the per-frame update callback.
pub struct FrameUpdate<'a> {
    pub scene: &'a mut SceneTree,
    pub delta_time: f32,
    pub input: &'a dyn InputState,
    stop_requested: &'a mut bool,
}

impl FrameUpdate<'_> {
    /// Run every node behaviour for this frame.
    pub fn update_scene(&mut self) {
        self.scene.update(self.delta_time, self.input);
    }

    /// End the main loop once this frame is presented.
    pub fn stop(&mut self) {
        *self.stop_requested = true;
    }
}

/// Owns the scene, the window and the graphics device, and drives frames.
///
/// Per frame: measure delta time, poll the window, run the update callback,
/// flush queued removals, resolve the camera, bind the lighting maps, draw
/// (culled, optionally sorted) drawables, draw the skybox, draw GUI canvases
/// without depth testing, then present.
///
/// With no camera registered the frame still runs with identity matrices and
/// a zero camera position, and nothing is culled.
pub struct RenderingServer<W, D> {
    window: W,
    device: D,
    scene: SceneTree,
    settings: RenderSettings,
    lighting: LightingEnvironment,
    frame: FrameMatrices,
    triangles: u64,
    stats: FrameStats,
    timer: FrameTimer,
    last_frame: Option<Instant>,
    frames_rendered: u64,
    stop_requested: bool,
}

impl<W: Window, D: GraphicsDevice> RenderingServer<W, D> {
    pub fn new(window: W, device: D, settings: RenderSettings) -> Self {
        let mut scene = SceneTree::new();
        scene.set_framebuffer_size(window.framebuffer_size());
        tracing::info!(title = %settings.window_title, "rendering server created");
        Self {
            window,
            device,
            scene,
            settings,
            lighting: LightingEnvironment::default(),
            frame: FrameMatrices::default(),
            triangles: 0,
            stats: FrameStats::default(),
            timer: FrameTimer::default(),
            last_frame: None,
            frames_rendered: 0,
            stop_requested: false,
        }
    }

    pub fn scene(&self) -> &SceneTree {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneTree {
        &mut self.scene
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }

    pub fn lighting(&self) -> &LightingEnvironment {
        &self.lighting
    }

    pub fn lighting_mut(&mut self) -> &mut LightingEnvironment {
        &mut self.lighting
    }

    /// Stats of the last completed frame.
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Attach a node to the scene owned by this server.
    pub fn add_node(&mut self, parent: NodeId, node: Node) -> Result<NodeId, RenderError> {
        Ok(self.scene.add_child(parent, node)?)
    }

    /// Set the skybox / environment cubemap.
    pub fn set_cubemap(&mut self, cubemap: Arc<Texture>) -> Result<(), RenderError> {
        self.lighting.set_environment(cubemap)
    }

    pub fn current_camera_node(&self) -> Result<NodeId, RenderError> {
        self.scene
            .current_camera()
            .map(|camera| camera.id())
            .ok_or(RenderError::MissingCamera)
    }

    /// View matrix resolved for the last frame.
    pub fn view_matrix(&self) -> Mat4 {
        self.frame.view
    }

    pub fn proj_matrix(&self) -> Mat4 {
        self.frame.proj
    }

    pub fn view_proj_matrix(&self) -> Mat4 {
        self.frame.view_proj
    }

    pub fn camera_position(&self) -> Vec3 {
        self.frame.camera_position
    }

    /// Add to this frame's triangle count. Reset at the start of each frame.
    pub fn report_about_drawn_triangles(&mut self, count: u64) {
        self.triangles += count;
    }

    pub fn drawn_triangles(&self) -> u64 {
        self.triangles
    }

    /// Ask the main loop to finish after the current frame.
    pub fn stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Run frames until stopped, the window closes, or `max_frames` is
    /// reached. Returns the number of frames rendered.
    pub fn main_loop(&mut self, mut update: impl FnMut(&mut FrameUpdate<'_>)) -> u64 {
        let _span = tracing::info_span!("main_loop").entered();
        let start = self.frames_rendered;
        while !self.should_stop(start) {
            self.run_frame(&mut update);
        }
        self.stop_requested = false;
        let frames = self.frames_rendered - start;
        tracing::info!(frames, "main loop finished");
        frames
    }

    fn should_stop(&self, start: u64) -> bool {
        self.stop_requested
            || self.window.should_close()
            || self
                .settings
                .max_frames
                .is_some_and(|max| self.frames_rendered - start >= max)
    }

    /// Render one frame, timing it against the previous call.
    pub fn run_frame(&mut self, update: impl FnOnce(&mut FrameUpdate<'_>)) -> FrameStats {
        let now = Instant::now();
        let delta = self
            .last_frame
            .map(|last| now.duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last_frame = Some(now);
        self.run_frame_with_delta(delta.as_secs_f32(), update)
    }

    /// Render one frame with an explicit delta time in seconds.
    pub fn run_frame_with_delta(
        &mut self,
        delta_time: f32,
        update: impl FnOnce(&mut FrameUpdate<'_>),
    ) -> FrameStats {
        let _span = tracing::info_span!("frame", index = self.frames_rendered).entered();
        self.triangles = 0;

        self.window.poll_events();
        update(&mut FrameUpdate {
            scene: &mut self.scene,
            delta_time,
            input: self.window.input(),
            stop_requested: &mut self.stop_requested,
        });
        self.scene.flush_removals();
        self.scene.set_framebuffer_size(self.window.framebuffer_size());

        let (frame, frustum) = self.resolve_camera();
        self.frame = frame;

        self.device.begin_frame(self.settings.clear_color);
        self.device.set_depth_test(true);
        self.device.upload_camera(&CameraUniforms::new(
            frame.view,
            frame.proj,
            frame.view_proj,
            frame.camera_position,
        ));
        self.device.bind_lighting(&self.lighting.bindings());

        let lights = self.light_samples();
        let mut stats = FrameStats {
            frame_index: self.frames_rendered,
            delta_time,
            ..FrameStats::default()
        };
        self.draw_drawables(&frame, frustum.as_ref(), &lights, &mut stats);
        self.draw_skybox(&frame);
        self.draw_gui_canvases(&frame, &lights, &mut stats);

        self.device.end_frame();
        self.window.swap_buffers();

        stats.triangles = self.triangles;
        self.timer.record(Duration::from_secs_f32(delta_time.max(0.0)));
        self.stats = stats;
        self.frames_rendered += 1;
        tracing::debug!(
            drawn = stats.drawables_drawn,
            culled = stats.drawables_culled,
            canvases = stats.canvases_drawn,
            triangles = stats.triangles,
            "frame rendered"
        );
        stats
    }

    fn resolve_camera(&self) -> (FrameMatrices, Option<Frustum>) {
        match self.scene.current_camera() {
            Some(camera) => {
                let frame = FrameMatrices {
                    view: camera.view_matrix(),
                    proj: camera.proj_matrix(),
                    view_proj: camera.view_proj_matrix(),
                    camera_position: camera.position(),
                };
                (frame, Some(camera.frustum()))
            }
            None => {
                tracing::trace!("no camera registered, drawing with identity matrices");
                (FrameMatrices::default(), None)
            }
        }
    }

    fn light_samples(&self) -> Vec<LightSample> {
        let scene = &self.scene;
        scene
            .registry()
            .point_lights()
            .iter()
            .copied()
            .filter(|&id| scene.is_enabled(id))
            .filter_map(|id| {
                let light = scene.node(id)?.as_point_light()?;
                let position = scene.global_position(id).ok()?;
                Some(LightSample {
                    position,
                    color: light.radiance(),
                })
            })
            .collect()
    }

    fn draw_drawables(
        &mut self,
        frame: &FrameMatrices,
        frustum: Option<&Frustum>,
        lights: &[LightSample],
        stats: &mut FrameStats,
    ) {
        let scene = &self.scene;
        let mut queue: Vec<(u64, NodeId)> = scene
            .registry()
            .drawables()
            .iter()
            .copied()
            .filter(|&id| scene.is_enabled(id))
            .filter_map(|id| {
                let drawable = scene.node(id)?.as_drawable()?;
                Some((drawable.render_key(), id))
            })
            .collect();
        if self.settings.sort_by_render_key {
            queue.sort_by_key(|&(key, _)| key);
        }
        let frustum = frustum.filter(|_| self.settings.frustum_culling);

        for (_, id) in queue {
            let Some(drawable) = scene.node(id).and_then(Node::as_drawable) else {
                continue;
            };
            let Ok(model) = scene.global_matrix(id) else {
                continue;
            };
            stats.drawables_considered += 1;
            let visible = match (frustum, drawable.local_bounds()) {
                (Some(frustum), Some(bounds)) => {
                    frustum.is_aabb_on_frustum(&bounds.transformed(&model))
                }
                _ => true,
            };
            if !visible {
                stats.drawables_culled += 1;
                tracing::trace!(?id, "drawable culled");
                continue;
            }
            let mut ctx = DrawContext::new(
                *frame,
                model,
                frame.view_proj * model,
                lights,
                &mut self.device,
                &mut self.triangles,
            );
            drawable.draw(&mut ctx);
            stats.drawables_drawn += 1;
        }
    }

    fn draw_skybox(&mut self, frame: &FrameMatrices) {
        if let Some(cubemap) = self.lighting.environment() {
            // Only the rotation part of the view, so the sky never moves.
            let view_rotation = Mat3::from_mat4(frame.view);
            self.device.draw_skybox(cubemap, view_rotation, frame.proj);
        }
    }

    fn draw_gui_canvases(
        &mut self,
        frame: &FrameMatrices,
        lights: &[LightSample],
        stats: &mut FrameStats,
    ) {
        let scene = &self.scene;
        if scene.registry().gui_canvases().is_empty() {
            return;
        }
        self.device.set_depth_test(false);
        for &id in scene.registry().gui_canvases() {
            if !scene.is_enabled(id) {
                continue;
            }
            let Some(canvas) = scene.node(id).and_then(Node::as_gui_canvas) else {
                continue;
            };
            let Ok(model) = scene.global_matrix(id) else {
                continue;
            };
            let mvp = if canvas.screen_overlayed {
                Mat4::IDENTITY
            } else {
                frame.view_proj * model
            };
            let mut ctx = DrawContext::new(
                *frame,
                model,
                mvp,
                lights,
                &mut self.device,
                &mut self.triangles,
            );
            canvas.content.draw(&mut ctx);
            stats.canvases_drawn += 1;
        }
        self.device.set_depth_test(true);
    }
}
