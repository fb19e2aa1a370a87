mod demo;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use glam::{UVec2, Vec3};
use lumen_render::{HeadlessWindow, RecordingDevice, RenderSettings, RenderingServer};
use lumen_scene::{Camera, Node, SceneTree};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lumen-cli", about = "CLI tool for lumen scenes and cameras")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version and crate info
    Info,
    /// Print the world-space frustum planes of a camera
    Frustum {
        /// Vertical field of view in degrees
        #[arg(long, default_value = "70")]
        fov: f32,
        /// Width over height; defaults to the framebuffer's
        #[arg(long)]
        aspect: Option<f32>,
        #[arg(long, default_value = "0.2")]
        near: f32,
        #[arg(long, default_value = "15")]
        far: f32,
        /// Camera position as x,y,z
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = [0.0, 0.0, 0.0])]
        position: Vec<f32>,
    },
    /// Render the demo scene headlessly
    Run {
        /// Number of frames to render
        #[arg(short, long, default_value = "120")]
        frames: u64,
        /// JSON render settings file
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Number of cubes in the demo ring
        #[arg(long, default_value = "8")]
        cubes: usize,
        /// Dump the recorded device commands of the last frame
        #[arg(long)]
        dump: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("lumen-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", lumen_common::crate_info());
            println!("scene: {}", lumen_scene::crate_info());
            println!("render: {}", lumen_render::crate_info());
        }
        Commands::Frustum {
            fov,
            aspect,
            near,
            far,
            position,
        } => {
            let mut camera = Camera::new(fov.to_radians(), near, far);
            if let Some(aspect) = aspect {
                camera.set_aspect_ratio(aspect);
            }
            let mut tree = SceneTree::new();
            let root = tree.root();
            let id = tree.add_child(
                root,
                Node::camera("camera", camera).with_translation(position_from_args(&position)?),
            )?;
            let view = tree.camera(id)?;
            println!(
                "camera: fov={fov} aspect={:.4} near={near} far={far}",
                view.aspect_ratio()
            );
            let names = ["top", "bottom", "left", "right", "far", "near"];
            for (name, plane) in names.iter().zip(view.frustum().planes()) {
                let n = plane.normal;
                println!(
                    "{name:>6}: normal=({:.6}, {:.6}, {:.6}) distance={:.6}",
                    n.x, n.y, n.z, plane.distance
                );
            }
        }
        Commands::Run {
            frames,
            settings,
            cubes,
            dump,
        } => {
            let mut settings = match settings {
                Some(path) => RenderSettings::load(&path)?,
                None => RenderSettings::default(),
            };
            settings.max_frames = Some(frames.max(1));
            let [w, h] = settings.window_size;

            let mut window = HeadlessWindow::new(UVec2::new(w, h));
            demo::script(&mut window, frames);
            let mut server = RenderingServer::new(window, RecordingDevice::new(), settings);
            demo::build(&mut server, cubes)?;

            let rendered = server.main_loop(|frame| frame.update_scene());

            let stats = server.stats();
            println!("Rendered {rendered} frames");
            println!(
                "Last frame: drawn={} culled={} canvases={} triangles={}",
                stats.drawables_drawn, stats.drawables_culled, stats.canvases_drawn, stats.triangles
            );
            println!(
                "Timing: avg={:?} max={:?} fps={:.1}",
                server.timer().average(),
                server.timer().max(),
                server.timer().fps()
            );
            let eye = server.camera_position();
            println!(
                "Scene: nodes={} lights={} camera at ({:.2}, {:.2}, {:.2})",
                server.scene().len(),
                server.scene().registry().point_lights().len(),
                eye.x,
                eye.y,
                eye.z
            );
            if dump {
                print!("{}", server.device().last_frame_summary());
            }
        }
    }

    Ok(())
}

fn position_from_args(values: &[f32]) -> anyhow::Result<Vec3> {
    anyhow::ensure!(
        values.len() == 3,
        "--position takes exactly three values (x,y,z), got {}",
        values.len()
    );
    Ok(Vec3::from_slice(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_needs_three_components() {
        assert_eq!(
            position_from_args(&[1.0, -2.0, 3.5]).unwrap(),
            Vec3::new(1.0, -2.0, 3.5)
        );
        assert!(position_from_args(&[1.0, 2.0]).is_err());
        assert!(position_from_args(&[1.0, 2.0, 3.0, 4.0]).is_err());
    }

    #[test]
    fn cli_parses_partial_position_without_panicking() {
        let cli = Cli::try_parse_from(["lumen-cli", "frustum", "--position", "1,2"]).unwrap();
        let Commands::Frustum { position, .. } = cli.command else {
            panic!("expected the frustum command");
        };
        assert!(position_from_args(&position).is_err());
    }
}
