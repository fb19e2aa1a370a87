use glam::{Mat3, Mat4};
use lumen_common::{CameraUniforms, GraphicsDevice, LightingBindings, MeshDrawCall, Texture};

/// One call received by a [`RecordingDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    BeginFrame { clear_color: [f32; 4] },
    SetDepthTest(bool),
    UploadCamera(CameraUniforms),
    /// Texture names of the bound lighting maps.
    BindLighting {
        environment: Option<String>,
        irradiance: Option<String>,
        specular: Option<String>,
        brdf_lut: Option<String>,
        exposure: f32,
    },
    DrawMesh {
        mesh: String,
        material: String,
        triangles: usize,
        model: Mat4,
        mvp: Mat4,
    },
    DrawSkybox {
        cubemap: String,
        view_rotation: Mat3,
        proj: Mat4,
    },
    EndFrame,
}

/// Headless graphics device that records every call.
///
/// Stands in for a GPU backend in tests and command line runs; the command
/// stream is what a real backend would translate into API calls.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    commands: Vec<DeviceCommand>,
    frames: u64,
    depth_test: bool,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Drain the recorded commands.
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Frames closed with `end_frame`.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn depth_test(&self) -> bool {
        self.depth_test
    }

    /// Names of the meshes drawn, in call order.
    pub fn drawn_meshes(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::DrawMesh { mesh, .. } => Some(mesh.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Human-readable dump of the recorded stream.
    pub fn summary(&self) -> String {
        describe(
            &format!(
                "=== Device (frames={}, commands={}) ===",
                self.frames,
                self.commands.len()
            ),
            &self.commands,
        )
    }

    /// Dump of the commands from the most recent `begin_frame` on.
    pub fn last_frame_summary(&self) -> String {
        let start = self
            .commands
            .iter()
            .rposition(|c| matches!(c, DeviceCommand::BeginFrame { .. }))
            .unwrap_or(0);
        let commands = &self.commands[start..];
        describe(
            &format!("=== Frame {} ({} commands) ===", self.frames, commands.len()),
            commands,
        )
    }
}

fn describe(header: &str, commands: &[DeviceCommand]) -> String {
    let mut out = String::new();
    out.push_str(header);
    out.push('\n');
    for command in commands {
        let line = match command {
            DeviceCommand::BeginFrame { clear_color: c } => {
                format!("begin clear=({:.2}, {:.2}, {:.2}, {:.2})", c[0], c[1], c[2], c[3])
            }
            DeviceCommand::SetDepthTest(on) => format!("depth_test={on}"),
            DeviceCommand::UploadCamera(u) => {
                let p = u.camera_position;
                format!("camera pos=({:.2}, {:.2}, {:.2})", p[0], p[1], p[2])
            }
            DeviceCommand::BindLighting {
                environment,
                irradiance,
                specular,
                brdf_lut,
                exposure,
            } => {
                let name = |t: &Option<String>| t.clone().unwrap_or_else(|| "-".to_string());
                format!(
                    "lighting env={} irradiance={} specular={} brdf={} exposure={exposure:.2}",
                    name(environment),
                    name(irradiance),
                    name(specular),
                    name(brdf_lut)
                )
            }
            DeviceCommand::DrawMesh {
                mesh,
                material,
                triangles,
                model,
                ..
            } => {
                let t = model.w_axis;
                format!(
                    "draw {mesh} [{material}] tris={triangles} at=({:.2}, {:.2}, {:.2})",
                    t.x, t.y, t.z
                )
            }
            DeviceCommand::DrawSkybox { cubemap, .. } => format!("skybox {cubemap}"),
            DeviceCommand::EndFrame => "end".to_string(),
        };
        out.push_str("  ");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

impl GraphicsDevice for RecordingDevice {
    fn begin_frame(&mut self, clear_color: [f32; 4]) {
        self.commands.push(DeviceCommand::BeginFrame { clear_color });
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
        self.commands.push(DeviceCommand::SetDepthTest(enabled));
    }

    fn upload_camera(&mut self, uniforms: &CameraUniforms) {
        self.commands.push(DeviceCommand::UploadCamera(*uniforms));
    }

    fn bind_lighting(&mut self, lighting: &LightingBindings) {
        let name = |t: &Option<std::sync::Arc<Texture>>| t.as_ref().map(|t| t.name.clone());
        self.commands.push(DeviceCommand::BindLighting {
            environment: name(&lighting.environment),
            irradiance: name(&lighting.irradiance),
            specular: name(&lighting.specular),
            brdf_lut: name(&lighting.brdf_lut),
            exposure: lighting.exposure,
        });
    }

    fn draw_mesh(&mut self, call: &MeshDrawCall) {
        self.commands.push(DeviceCommand::DrawMesh {
            mesh: call.mesh.name.clone(),
            material: call.material.name.clone(),
            triangles: call.mesh.triangle_count(),
            model: call.model,
            mvp: call.mvp,
        });
    }

    fn draw_skybox(&mut self, cubemap: &Texture, view_rotation: Mat3, proj: Mat4) {
        self.commands.push(DeviceCommand::DrawSkybox {
            cubemap: cubemap.name.clone(),
            view_rotation,
            proj,
        });
    }

    fn end_frame(&mut self) {
        self.frames += 1;
        self.commands.push(DeviceCommand::EndFrame);
    }
}
