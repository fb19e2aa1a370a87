use std::sync::{Arc, Mutex};

use glam::{Mat4, UVec2, Vec3};
use lumen_common::{InputSnapshot, Key, Material, Mesh, Texture, TextureKind};
use lumen_render::{
    DeviceCommand, HeadlessWindow, RecordingDevice, RenderError, RenderSettings, RenderingServer,
};
use lumen_scene::{
    Camera, DrawContext, Drawable, GuiCanvas, MeshDrawable, Node, NodeId, PointLight,
    SpectatorController,
};

type Server = RenderingServer<HeadlessWindow, RecordingDevice>;

fn server_with(settings: RenderSettings) -> Server {
    RenderingServer::new(
        HeadlessWindow::new(UVec2::new(800, 600)),
        RecordingDevice::new(),
        settings,
    )
}

fn server() -> Server {
    server_with(RenderSettings::default())
}

fn named_cube(name: &str, render_key: u64) -> MeshDrawable {
    let mut mesh = Mesh::cube();
    mesh.name = name.to_string();
    MeshDrawable::new(Arc::new(mesh), Arc::new(Material::default())).with_render_key(render_key)
}

fn add_camera(server: &mut Server) -> NodeId {
    let root = server.scene().root();
    server
        .add_node(root, Node::camera("camera", Camera::default()))
        .unwrap()
}

fn add_cube(server: &mut Server, name: &str, at: Vec3) -> NodeId {
    let root = server.scene().root();
    server
        .add_node(root, Node::drawable(name, named_cube(name, 0)).with_translation(at))
        .unwrap()
}

/// Records what it was handed on every draw.
#[derive(Debug, Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<(Mat4, usize)>>>,
}

impl Drawable for Recorder {
    fn draw(&self, ctx: &mut DrawContext<'_>) {
        self.seen.lock().unwrap().push((ctx.mvp, ctx.lights.len()));
        ctx.report_triangles(1);
    }

    fn box_clone(&self) -> Box<dyn Drawable> {
        Box::new(self.clone())
    }
}

#[test]
fn frame_issues_commands_in_order() {
    let mut server = server();
    add_camera(&mut server);
    add_cube(&mut server, "world", Vec3::new(0.0, 0.0, 5.0));
    let root = server.scene().root();
    server
        .add_node(root, Node::gui_canvas("hud", GuiCanvas::overlay(named_cube("hud", 0))))
        .unwrap();
    server
        .set_cubemap(Arc::new(Texture::solid("sky", TextureKind::Cubemap, [90, 120, 200, 255])))
        .unwrap();

    server.run_frame_with_delta(0.016, |_| {});

    let commands = server.device_mut().take_commands();
    assert_eq!(commands.len(), 10);
    assert!(matches!(commands[0], DeviceCommand::BeginFrame { .. }));
    assert_eq!(commands[1], DeviceCommand::SetDepthTest(true));
    assert!(matches!(commands[2], DeviceCommand::UploadCamera(_)));
    assert!(matches!(commands[3], DeviceCommand::BindLighting { .. }));
    assert!(matches!(&commands[4], DeviceCommand::DrawMesh { mesh, .. } if mesh == "world"));
    assert!(matches!(&commands[5], DeviceCommand::DrawSkybox { cubemap, .. } if cubemap == "sky"));
    assert_eq!(commands[6], DeviceCommand::SetDepthTest(false));
    assert!(
        matches!(&commands[7], DeviceCommand::DrawMesh { mesh, mvp, .. } if mesh == "hud" && *mvp == Mat4::IDENTITY)
    );
    assert_eq!(commands[8], DeviceCommand::SetDepthTest(true));
    assert_eq!(commands[9], DeviceCommand::EndFrame);
    assert_eq!(server.window().frames_presented(), 1);
}

#[test]
fn uploaded_uniforms_match_resolved_camera() {
    let mut server = server();
    let camera = add_camera(&mut server);
    server
        .scene_mut()
        .set_translation(camera, Vec3::new(1.0, 2.0, -3.0))
        .unwrap();

    server.run_frame_with_delta(0.016, |_| {});

    assert_eq!(server.current_camera_node().unwrap(), camera);
    assert_eq!(server.camera_position(), Vec3::new(1.0, 2.0, -3.0));
    let uniforms = server
        .device()
        .commands()
        .iter()
        .find_map(|c| match c {
            DeviceCommand::UploadCamera(u) => Some(*u),
            _ => None,
        })
        .unwrap();
    assert_eq!(uniforms.view, server.view_matrix().to_cols_array_2d());
    assert_eq!(uniforms.proj, server.proj_matrix().to_cols_array_2d());
    assert!(
        server
            .view_proj_matrix()
            .abs_diff_eq(server.proj_matrix() * server.view_matrix(), 1e-6)
    );
    assert_eq!(uniforms.camera_position, [1.0, 2.0, -3.0, 1.0]);
}

#[test]
fn drawables_outside_the_frustum_are_culled() {
    let mut server = server();
    add_camera(&mut server);
    add_cube(&mut server, "ahead", Vec3::new(0.0, 0.0, 5.0));
    add_cube(&mut server, "behind", Vec3::new(0.0, 0.0, -5.0));
    add_cube(&mut server, "too_far", Vec3::new(0.0, 0.0, 500.0));

    let stats = server.run_frame_with_delta(0.016, |_| {});

    assert_eq!(server.device().drawn_meshes(), vec!["ahead"]);
    assert_eq!(stats.drawables_considered, 3);
    assert_eq!(stats.drawables_drawn, 1);
    assert_eq!(stats.drawables_culled, 2);
}

#[test]
fn culling_can_be_switched_off() {
    let mut server = server_with(RenderSettings {
        frustum_culling: false,
        ..RenderSettings::default()
    });
    add_camera(&mut server);
    add_cube(&mut server, "ahead", Vec3::new(0.0, 0.0, 5.0));
    add_cube(&mut server, "behind", Vec3::new(0.0, 0.0, -5.0));

    let stats = server.run_frame_with_delta(0.016, |_| {});

    assert_eq!(server.device().drawn_meshes(), vec!["ahead", "behind"]);
    assert_eq!(stats.drawables_culled, 0);
}

#[test]
fn culling_follows_a_moved_camera() {
    let mut server = server();
    let camera = add_camera(&mut server);
    add_cube(&mut server, "behind", Vec3::new(0.0, 0.0, -5.0));

    server.run_frame_with_delta(0.016, |_| {});
    assert!(server.device().drawn_meshes().is_empty());

    server
        .scene_mut()
        .set_translation(camera, Vec3::new(0.0, 0.0, -10.0))
        .unwrap();
    server.device_mut().take_commands();
    server.run_frame_with_delta(0.016, |_| {});
    assert_eq!(server.device().drawn_meshes(), vec!["behind"]);
}

#[test]
fn drawables_sort_by_render_key() {
    let mut server = server();
    add_camera(&mut server);
    let root = server.scene().root();
    let ahead = Vec3::new(0.0, 0.0, 5.0);
    for (name, key) in [("c", 3), ("a1", 1), ("b", 2), ("a2", 1)] {
        server
            .add_node(root, Node::drawable(name, named_cube(name, key)).with_translation(ahead))
            .unwrap();
    }

    server.run_frame_with_delta(0.016, |_| {});

    // Equal keys keep registration order.
    assert_eq!(server.device().drawn_meshes(), vec!["a1", "a2", "b", "c"]);
}

#[test]
fn unsorted_drawables_keep_registration_order() {
    let mut server = server_with(RenderSettings {
        sort_by_render_key: false,
        ..RenderSettings::default()
    });
    add_camera(&mut server);
    let root = server.scene().root();
    let ahead = Vec3::new(0.0, 0.0, 5.0);
    for (name, key) in [("c", 3), ("a", 1), ("b", 2)] {
        server
            .add_node(root, Node::drawable(name, named_cube(name, key)).with_translation(ahead))
            .unwrap();
    }

    server.run_frame_with_delta(0.016, |_| {});

    assert_eq!(server.device().drawn_meshes(), vec!["c", "a", "b"]);
}

#[test]
fn missing_camera_renders_with_identity() {
    let mut server = server();
    add_cube(&mut server, "behind", Vec3::new(0.0, 0.0, -5.0));

    let stats = server.run_frame_with_delta(0.016, |_| {});

    assert!(matches!(
        server.current_camera_node(),
        Err(RenderError::MissingCamera)
    ));
    assert_eq!(server.view_matrix(), Mat4::IDENTITY);
    assert_eq!(server.proj_matrix(), Mat4::IDENTITY);
    assert_eq!(server.camera_position(), Vec3::ZERO);
    // Nothing to cull against.
    assert_eq!(stats.drawables_drawn, 1);
    assert_eq!(server.device().frames(), 1);
}

#[test]
fn in_world_canvas_uses_view_projection() {
    let mut server = server();
    add_camera(&mut server);
    let recorder = Recorder::default();
    let root = server.scene().root();
    let canvas = server
        .add_node(
            root,
            Node::gui_canvas("sign", GuiCanvas::in_world(recorder.clone()))
                .with_translation(Vec3::new(0.0, 1.0, 4.0)),
        )
        .unwrap();

    let stats = server.run_frame_with_delta(0.016, |_| {});

    let model = server.scene().global_matrix(canvas).unwrap();
    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].0.abs_diff_eq(server.view_proj_matrix() * model, 1e-6));
    assert_eq!(stats.canvases_drawn, 1);
    assert!(server.device().depth_test());
}

#[test]
fn disabled_subtrees_are_not_drawn_or_lit() {
    let mut server = server();
    add_camera(&mut server);
    let root = server.scene().root();
    let group = server.add_node(root, Node::spatial("group")).unwrap();
    server
        .add_node(group, Node::drawable("hidden", named_cube("hidden", 0)))
        .unwrap();
    server
        .add_node(group, Node::point_light("lamp", PointLight::default()))
        .unwrap();
    server
        .add_node(root, Node::point_light("sun", PointLight::default()))
        .unwrap();
    let recorder = Recorder::default();
    server
        .add_node(
            root,
            Node::drawable("recorder", recorder.clone()).with_translation(Vec3::new(0.0, 0.0, 5.0)),
        )
        .unwrap();

    server.run_frame_with_delta(0.016, |_| {});
    assert_eq!(recorder.seen.lock().unwrap().last().unwrap().1, 2);

    server.scene_mut().set_enabled(group, false).unwrap();
    server.device_mut().take_commands();
    let stats = server.run_frame_with_delta(0.016, |_| {});

    assert!(server.device().drawn_meshes().is_empty());
    assert_eq!(stats.drawables_drawn, 1);
    assert_eq!(recorder.seen.lock().unwrap().last().unwrap().1, 1);
}

#[test]
fn removal_requested_in_update_applies_before_drawing() {
    let mut server = server();
    add_camera(&mut server);
    let doomed = add_cube(&mut server, "doomed", Vec3::new(0.0, 0.0, 5.0));
    add_cube(&mut server, "kept", Vec3::new(0.0, 0.0, 6.0));

    server.run_frame_with_delta(0.016, |frame| frame.scene.queue_remove(doomed));

    assert_eq!(server.device().drawn_meshes(), vec!["kept"]);
    assert!(!server.scene().contains(doomed));
    assert!(!server.scene().registry().drawables().contains(&doomed));
}

#[test]
fn triangle_counter_resets_every_frame() {
    let mut server = server();
    add_camera(&mut server);
    add_cube(&mut server, "a", Vec3::new(0.0, 0.0, 5.0));
    add_cube(&mut server, "b", Vec3::new(1.0, 0.0, 5.0));

    let first = server.run_frame_with_delta(0.016, |_| {});
    assert_eq!(first.triangles, 24);
    assert_eq!(server.drawn_triangles(), 24);

    server.report_about_drawn_triangles(6);
    assert_eq!(server.drawn_triangles(), 30);

    let second = server.run_frame_with_delta(0.016, |_| {});
    assert_eq!(second.triangles, 24);
    assert_eq!(server.stats().triangles, 24);
}

#[test]
fn main_loop_honours_max_frames() {
    let mut server = server_with(RenderSettings {
        max_frames: Some(3),
        ..RenderSettings::default()
    });
    let mut calls = 0;
    let frames = server.main_loop(|_| calls += 1);

    assert_eq!(frames, 3);
    assert_eq!(calls, 3);
    assert_eq!(server.device().frames(), 3);
    assert_eq!(server.timer().count(), 3);
}

#[test]
fn main_loop_stops_on_request() {
    let mut server = server();
    let mut calls = 0;
    let frames = server.main_loop(|frame| {
        calls += 1;
        if calls == 2 {
            frame.stop();
        }
    });

    assert_eq!(frames, 2);
    assert!(!server.is_stop_requested());
}

#[test]
fn main_loop_ends_when_window_closes() {
    let mut server = server();
    server.window_mut().request_close();
    assert_eq!(server.main_loop(|_| {}), 0);
    assert_eq!(server.device().frames(), 0);
}

#[test]
fn spectator_moves_with_scripted_input() {
    let mut server = server();
    let root = server.scene().root();
    let camera = server
        .add_node(
            root,
            Node::camera("eye", Camera::default()).with_behavior(SpectatorController::default()),
        )
        .unwrap();
    server
        .window_mut()
        .push_input(InputSnapshot::default().with_key(Key::W));

    server.run_frame_with_delta(0.1, |frame| frame.update_scene());

    let position = server.scene().global_position(camera).unwrap();
    assert!(position.abs_diff_eq(Vec3::new(0.0, 0.0, 0.5), 1e-5));
    assert!(server.camera_position().abs_diff_eq(position, 1e-6));
}

#[test]
fn window_resize_changes_projection() {
    let mut server = server();
    add_camera(&mut server);
    server.run_frame_with_delta(0.016, |_| {});
    let before = server.proj_matrix();

    server.window_mut().resize(UVec2::new(600, 600));
    server.run_frame_with_delta(0.016, |_| {});

    assert_eq!(server.scene().framebuffer_size(), UVec2::new(600, 600));
    assert_ne!(server.proj_matrix(), before);
}

#[test]
fn lighting_maps_are_bound_before_drawing() {
    let mut server = server();
    add_camera(&mut server);
    add_cube(&mut server, "lit", Vec3::new(0.0, 0.0, 5.0));
    let cube = |name: &str| Arc::new(Texture::solid(name, TextureKind::Cubemap, [255; 4]));
    server.set_cubemap(cube("sky")).unwrap();
    let lighting = server.lighting_mut();
    lighting.set_irradiance(cube("sky_irradiance")).unwrap();
    lighting.set_specular(cube("sky_specular")).unwrap();
    lighting.set_brdf_lut(Arc::new(Texture::solid("brdf", TextureKind::Flat, [0; 4])));
    lighting.exposure = 1.5;

    server.run_frame_with_delta(0.016, |_| {});

    let commands = server.device().commands();
    let bind = commands
        .iter()
        .position(|c| matches!(c, DeviceCommand::BindLighting { .. }))
        .unwrap();
    let first_draw = commands
        .iter()
        .position(|c| matches!(c, DeviceCommand::DrawMesh { .. }))
        .unwrap();
    assert!(bind < first_draw);
    assert_eq!(
        commands[bind],
        DeviceCommand::BindLighting {
            environment: Some("sky".into()),
            irradiance: Some("sky_irradiance".into()),
            specular: Some("sky_specular".into()),
            brdf_lut: Some("brdf".into()),
            exposure: 1.5,
        }
    );
    assert!(server.device().last_frame_summary().contains("exposure=1.50"));
}

#[test]
fn unset_lighting_binds_empty_slots() {
    let mut server = server();
    server.run_frame_with_delta(0.016, |_| {});

    let bind = server
        .device()
        .commands()
        .iter()
        .find(|c| matches!(c, DeviceCommand::BindLighting { .. }))
        .cloned()
        .unwrap();
    assert_eq!(
        bind,
        DeviceCommand::BindLighting {
            environment: None,
            irradiance: None,
            specular: None,
            brdf_lut: None,
            exposure: 1.0,
        }
    );
}

#[test]
fn flat_texture_is_not_a_skybox() {
    let mut server = server();
    let err = server
        .set_cubemap(Arc::new(Texture::solid("wall", TextureKind::Flat, [0; 4])))
        .unwrap_err();
    assert!(matches!(err, RenderError::NotACubemap(name) if name == "wall"));
    assert!(server.lighting().environment().is_none());
}
