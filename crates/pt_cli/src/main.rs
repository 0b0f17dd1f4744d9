//! Headless front end for the progressive path tracer.
//!
//! Runs the same loop an interactive viewer would: size the render image to
//! the window, trace one pass per frame, restart when the camera moves, and
//! finally write the accumulated image as a PNG.

mod demo;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use pt_renderer::{Camera, Environment, PathTracer, Settings};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Window width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Number of frames (passes) to render
    #[arg(long, short = 'n', default_value_t = 64)]
    passes: u32,

    /// Output PNG path
    #[arg(long, short = 'o', value_name = "FILE", default_value = "render.png")]
    output: PathBuf,

    /// JSON settings file; flags below override its values
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Equirectangular environment map (HDR, EXR, PNG, ...)
    #[arg(long, value_name = "FILE")]
    env: Option<PathBuf>,

    /// Scale applied to the environment radiance
    #[arg(long, default_value_t = 1.0)]
    env_multiplier: f32,

    #[arg(long)]
    max_bounces: Option<u32>,

    /// Stop after this many paths per pixel (0 = never)
    #[arg(long)]
    max_paths: Option<u32>,

    #[arg(long)]
    subsampling: Option<u32>,

    /// Render threads (0 = one per core)
    #[arg(long, short = 't')]
    threads: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Disable sub-pixel jitter
    #[arg(long)]
    no_jitter: bool,

    /// Orbit the camera at this frame, restarting accumulation
    #[arg(long, value_name = "FRAME")]
    orbit_at: Option<u32>,

    /// Orbit angle in degrees
    #[arg(long, default_value_t = 30.0)]
    orbit_degrees: f32,

    /// Print the effective settings as JSON and exit
    #[arg(long)]
    print_settings: bool,
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.settings {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read settings {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse settings {}", path.display()))?
            }
            None => Settings::default(),
        };

        if let Some(v) = self.max_bounces {
            settings.max_bounces = v;
        }
        if let Some(v) = self.max_paths {
            settings.max_paths_per_pixel = v;
        }
        if let Some(v) = self.subsampling {
            settings.subsampling = v;
        }
        if let Some(v) = self.threads {
            settings.worker_threads = v;
        }
        if let Some(v) = self.seed {
            settings.seed = v;
        }
        if self.no_jitter {
            settings.jitter = false;
        }
        Ok(settings)
    }

    fn environment(&self) -> Result<Environment> {
        anyhow::ensure!(
            self.env_multiplier >= 0.0,
            "Environment multiplier must not be negative (got {})",
            self.env_multiplier
        );
        let map = match &self.env {
            Some(path) => pt_core::load_texture(path)
                .with_context(|| format!("Failed to load environment {}", path.display()))?,
            None => demo::sky_texture(256, 128)?,
        };
        Ok(Environment::new(Arc::new(map), self.env_multiplier))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let settings = cli.settings()?;
    if cli.print_settings {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let scene = demo::build_scene(cli.environment()?)?;
    let mut camera = Camera::default();

    let mut tracer = PathTracer::new(settings).context("Invalid render settings")?;
    tracer
        .resize(cli.width, cli.height)
        .context("Window too small for the subsampling factor")?;

    let start = Instant::now();
    for frame in 0..cli.passes {
        if cli.orbit_at == Some(frame) {
            camera = camera.orbit(demo::TARGET, cli.orbit_degrees.to_radians());
            tracer.restart();
            log::info!("Frame {}: camera moved to {:?}", frame, camera.position);
        }
        if !tracer.trace_paths(&scene, &camera) {
            log::info!("Frame {}: sample cap reached", frame);
            break;
        }
    }

    let result = tracer.image();
    log::info!(
        "Rendered {} passes at {}x{} in {:.2?}",
        result.number_of_samples(),
        result.width(),
        result.height(),
        start.elapsed()
    );

    let png = image::RgbaImage::from_raw(result.width(), result.height(), result.to_rgba8())
        .context("Image buffer has the wrong size")?;
    png.save(&cli.output)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    log::info!("Saved {}", cli.output.display());

    Ok(())
}
