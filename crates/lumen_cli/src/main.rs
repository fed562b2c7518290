use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::process::ExitCode;
use std::time::Instant;

mod cli;
mod logger;
mod output;

use cli::Args;
use logger::init_logger;
use lumen_core::Scene;
use lumen_gpu::GpuBackend;
use lumen_renderer::{
    DataParallelBackend, ExecutionStrategy, RenderBackend, RenderConfig, SequentialBackend,
};
use output::save_image;

/// Defaults, then the config file, then command line overrides.
fn resolve_config(args: &Args) -> Result<RenderConfig> {
    let base = match &args.config {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RenderConfig::default(),
    };
    let config = args.apply(base);
    config.validate().context("Invalid render configuration")?;
    Ok(config)
}

fn load_scene(args: &Args) -> Result<Scene> {
    match &args.scene {
        Some(path) => {
            Scene::load(path).with_context(|| format!("Failed to load scene {}", path.display()))
        }
        None => Ok(Scene::showcase()),
    }
}

fn select_backend(config: &RenderConfig) -> Result<Box<dyn RenderBackend>> {
    Ok(match config.execution {
        ExecutionStrategy::Sequential => Box::new(SequentialBackend),
        ExecutionStrategy::DataParallel => Box::new(DataParallelBackend),
        ExecutionStrategy::GpuOffload => Box::new(
            GpuBackend::for_config(config).context("GPU offload could not start")?,
        ),
    })
}

fn run(args: &Args) -> Result<()> {
    let config = resolve_config(args)?;
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let scene = load_scene(args)?;
    info!(
        "Image resolution: {}x{}, {} rays per pixel, depth {}",
        config.width,
        config.height,
        config.rays_per_pixel(),
        config.max_bounce_depth
    );
    info!("Scene has {} surfaces", scene.len());

    let backend = select_backend(&config)?;
    info!("Rendering with {} sampling on the {} backend", config.sampling, backend.name());

    let start = Instant::now();
    let output = backend.render(&scene, &config).context("Render failed")?;
    let elapsed = start.elapsed();

    match output.rays {
        Some(rays) => info!(
            "Rendered in {:.2?}: {} rays, {:.2} Mrays/s",
            elapsed,
            rays,
            rays as f64 / elapsed.as_secs_f64().max(1e-9) / 1e6
        ),
        None => info!("Rendered in {:.2?}", elapsed),
    }

    save_image(&output.image, &args.output)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(args.log_level.into());

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
