use std::sync::Arc;

use clap::{Parser, Subcommand};
use glam::Vec3;
use tracing::{debug, error, info, instrument};

use xpbdsoft::{
    SoftBody, TetTopology, XpbdParams,
    mesh::{Spatial, primitives::Builtin},
};

#[derive(Parser)]
#[command(name = "xpbdsoft")]
#[command(about = "Extended Position Based Dynamics soft body simulation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a built-in topology to binary format
    Export {
        /// Built-in topology to export
        #[arg(short, long, value_enum, default_value = "cube")]
        mesh: Builtin,
        /// Output binary file path
        #[arg(short, long)]
        output: String,
    },
    /// Run a headless simulation and report progress.
    Run {
        /// Built-in topology, used when no input file is given
        #[arg(short, long, value_enum, default_value = "cube")]
        mesh: Builtin,
        /// Topology exported with `export`
        #[arg(short, long)]
        input: Option<String>,
        /// Number of 60 Hz frames to simulate
        #[arg(short, long, default_value_t = 300)]
        frames: usize,
        /// Substeps per frame
        #[arg(long, default_value_t = 10)]
        substeps: usize,
        /// Edge compliance (inverse stiffness)
        #[arg(long, default_value_t = 5.0)]
        edge_compliance: f32,
        /// Volume compliance (inverse stiffness)
        #[arg(long, default_value_t = 0.0)]
        volume_compliance: f32,
        /// Uniform scale applied to the topology
        #[arg(long, default_value_t = 2.0)]
        scale: f32,
        /// Initial height of the body
        #[arg(long, default_value_t = 4.0)]
        height: f32,
        /// Disable floor and wall collisions
        #[arg(long)]
        no_bounds: bool,
    },
}

const TARGET_FPS: u16 = 60;
const TIME_STEP: f32 = 1.0 / TARGET_FPS as f32;

#[instrument]
fn export_mesh(mesh: Builtin, output_path: &str) -> xpbdsoft::mesh::Result<()> {
    let topology = mesh.topology();
    topology.export_to_bincode(output_path)?;
    Ok(())
}

#[instrument]
fn load_topology(mesh: Builtin, input: Option<&str>) -> xpbdsoft::mesh::Result<TetTopology> {
    match input {
        Some(path) => {
            debug!("Loading as bincode file");
            TetTopology::from_bincode(path)
        }
        None => {
            debug!("Using built-in topology");
            Ok(mesh.topology())
        }
    }
}

/// Largest particle speed, used as a cheap stability indicator.
fn max_speed(body: &SoftBody) -> f32 {
    body.velocities()
        .iter()
        .map(|v| v.length())
        .fold(0.0, f32::max)
}

#[instrument(skip(body))]
fn run_simulation(body: &mut SoftBody, frames: usize) {
    let rest_volume: f32 = body.rest_values().volumes.iter().sum();

    for frame in 1..=frames {
        body.step(TIME_STEP);

        if frame % usize::from(TARGET_FPS) == 0 || frame == frames {
            let (min, max) = body.positions().bounding_box();
            let drift = (body.total_volume() - rest_volume) / rest_volume.max(f32::EPSILON);
            info!(
                frame,
                min_y = %min.y,
                max_y = %max.y,
                center_x = %((min.x + max.x) * 0.5),
                center_z = %((min.z + max.z) * 0.5),
                volume_drift = %drift,
                max_speed = %max_speed(body),
                "Simulation progress"
            );
        }
    }
}

fn main() {
    // Initialize tracing subscriber for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export { mesh, output } => {
            if let Err(e) = export_mesh(mesh, &output) {
                error!(error = %e, "Export failed");
                std::process::exit(1);
            }
        }
        Commands::Run {
            mesh,
            input,
            frames,
            substeps,
            edge_compliance,
            volume_compliance,
            scale,
            height,
            no_bounds,
        } => {
            let topology = match load_topology(mesh, input.as_deref()) {
                Ok(topology) => Arc::new(topology),
                Err(e) => {
                    error!(error = %e, "Failed to load topology");
                    std::process::exit(1);
                }
            };

            let mut params = XpbdParams::default()
                .with_substeps(substeps)
                .with_edge_compliance(edge_compliance)
                .with_volume_compliance(volume_compliance);
            if no_bounds {
                params = params.with_bounds(None);
            }

            let mut body =
                match SoftBody::new(topology, Vec3::new(0.0, height, 0.0), scale, params) {
                    Ok(body) => body,
                    Err(e) => {
                        error!(error = %e, "Invalid topology");
                        std::process::exit(1);
                    }
                };

            run_simulation(&mut body, frames);
        }
    }
}
