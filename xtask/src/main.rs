use anyhow::Result;
use burn::config::Config;
use burn::module::Module;
use burn::tensor::{Distribution, Tensor};
use burn_ndarray::NdArray;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use rsdn_core::DecomposerConfig;
use rsdn_model::{io::load_checkpoint, presets, RsdnConfig, SequenceRestorer};

type Backend = NdArray<f32>;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Developer tasks for the RSDN workspace")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Standard,
    Light,
    X2,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a preset configuration and its parameter count
    Describe {
        #[arg(value_enum, default_value = "standard")]
        preset: Preset,
    },

    /// Save a preset configuration as JSON
    WriteConfig {
        #[arg(value_enum, default_value = "standard")]
        preset: Preset,

        /// Output file
        #[arg(short, long, default_value = "rsdn.json")]
        output: PathBuf,
    },

    /// Restore a random clip and report shapes and timing
    Synthetic {
        /// Configuration file; overrides the preset when given
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "light")]
        preset: Preset,

        /// Weights to load (without the .mpk extension)
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        #[arg(long, default_value_t = 4)]
        frames: usize,

        #[arg(long, default_value_t = 1)]
        batch: usize,

        #[arg(long, default_value_t = 32)]
        height: usize,

        #[arg(long, default_value_t = 32)]
        width: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Describe { preset } => {
            describe(preset)?;
        }
        Commands::WriteConfig { preset, output } => {
            write_config(preset, &output)?;
        }
        Commands::Synthetic {
            config,
            preset,
            checkpoint,
            frames,
            batch,
            height,
            width,
        } => {
            let config = match config {
                Some(path) => RsdnConfig::load(&path)
                    .map_err(|e| anyhow::anyhow!("Failed to read {}: {:?}", path.display(), e))?,
                None => preset_config(preset),
            };
            synthetic(&config, checkpoint.as_deref(), frames, [batch, 3, height, width])?;
        }
    }

    Ok(())
}

fn preset_config(preset: Preset) -> RsdnConfig {
    match preset {
        Preset::Standard => presets::standard(),
        Preset::Light => presets::light(),
        Preset::X2 => presets::x2(),
    }
}

fn describe(preset: Preset) -> Result<()> {
    let config = preset_config(preset);
    let device = Default::default();
    let network = config.init::<Backend>(&device)?;

    println!("{}", config);
    println!();
    println!("  blocks:      {}", network.num_blocks());
    println!("  upscale:     x{}", network.upscale_factor());
    println!("  parameters:  {}", network.num_params());
    Ok(())
}

fn write_config(preset: Preset, output: &Path) -> Result<()> {
    let config = preset_config(preset);
    config.validate()?;
    config
        .save(output)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", output.display(), e))?;
    info!("Wrote configuration to {}", output.display());
    Ok(())
}

fn synthetic(
    config: &RsdnConfig,
    checkpoint: Option<&Path>,
    frames: usize,
    shape: [usize; 4],
) -> Result<()> {
    anyhow::ensure!(frames > 0, "At least one frame is required");

    let device = Default::default();
    let network = config.init::<Backend>(&device)?;
    let network = match checkpoint {
        Some(path) => load_checkpoint(network, path, &device)?,
        None => {
            warn!("No checkpoint given, running with freshly initialised weights");
            network
        }
    };

    let clip: Vec<Tensor<Backend, 4>> = (0..frames)
        .map(|_| Tensor::random(shape, Distribution::Uniform(0.0, 1.0), &device))
        .collect();

    let restorer = SequenceRestorer::new(network, DecomposerConfig::new().init());

    let start = Instant::now();
    let restored = restorer.restore(&clip)?;
    let elapsed = start.elapsed();

    for (i, frame) in restored.iter().enumerate() {
        info!("Frame {}: HR {:?}", i, frame.hr_frame.dims());
    }
    info!(
        "Restored {} frames in {:.2?} ({:.2?} per frame)",
        restored.len(),
        elapsed,
        per_frame(elapsed, restored.len())
    );
    Ok(())
}

/// Average time per frame.
fn per_frame(elapsed: Duration, frames: usize) -> Duration {
    if frames == 0 {
        return Duration::ZERO;
    }
    elapsed.div_f64(frames as f64)
}
