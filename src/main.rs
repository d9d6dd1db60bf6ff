//! Offline collision cooker for noise-defined voxel volumes.

mod source;

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use karst_collision::ParryBackend;
use karst_runtime::{CookSettings, CookedVolume, RenderType, VolumeSave, cook_volume};

use crate::source::NoiseSource;

#[derive(Parser)]
#[command(name = "karst", about = "Cook voxel volumes into collision data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cook a volume and write the collision artifact
    Cook {
        /// Render-octree depth; the volume spans 2^depth chunks per axis
        #[arg(long, default_value_t = 3)]
        depth: u32,
        /// Voxel edge length in world units
        #[arg(long, default_value_t = 100.0)]
        voxel_size: f32,
        #[arg(long, default_value_t = 1337)]
        seed: i32,
        #[arg(long, default_value_t = 0.02)]
        frequency: f32,
        /// Optional saved edits to preload before cooking
        #[arg(long)]
        save: Option<PathBuf>,
        /// Produce a clean (non-deformable) collision mesh
        #[arg(long)]
        clean: bool,
        /// Trade cook quality for cook speed
        #[arg(long)]
        fast: bool,
        /// Log per-chunk progress
        #[arg(long)]
        progress: bool,
        /// Output artifact path
        #[arg(short, long, default_value = "volume.karst")]
        out: PathBuf,
    },
    /// Summarize a cooked artifact
    Info { path: PathBuf },
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    match Cli::parse().command {
        Command::Cook {
            depth,
            voxel_size,
            seed,
            frequency,
            save,
            clean,
            fast,
            progress,
            out,
        } => {
            let save = match save {
                Some(path) => Some(VolumeSave::from_bytes(&fs::read(path)?)?),
                None => None,
            };

            let mut settings = CookSettings::for_source(
                Arc::new(NoiseSource::new(seed, frequency)),
                depth,
                voxel_size,
            );
            settings.render_type = RenderType::Cubic;
            settings.clean_collision_mesh = clean;
            settings.fast_collision_cook = fast;
            settings.log_progress = progress;

            let volume = cook_volume(&settings, save.as_ref(), Arc::new(ParryBackend))?;
            fs::write(&out, volume.to_bytes()?)?;
            println!(
                "cooked {} chunks ({} bytes) -> {}",
                volume.len(),
                volume.allocated_size(),
                out.display()
            );
        }
        Command::Info { path } => {
            let volume = CookedVolume::from_bytes(&fs::read(&path)?)?;
            println!(
                "{}: {} chunks, {} bytes of cooked collision",
                path.display(),
                volume.len(),
                volume.allocated_size()
            );
            if let Some(chunk) = volume.chunks.first() {
                println!(
                    "first chunk ({}, {}, {}): {} bytes",
                    chunk.coord.cx,
                    chunk.coord.cy,
                    chunk.coord.cz,
                    chunk.blob.len()
                );
            }
        }
    }
    Ok(())
}
