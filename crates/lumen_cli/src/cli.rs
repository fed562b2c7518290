use clap::{Parser, ValueEnum};
use log::LevelFilter;
use lumen_renderer::{ExecutionStrategy, RenderConfig, SamplingStrategy};
use std::path::PathBuf;

/// Log levels accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Sampling {
    /// Jittered camera rays and a single random path per sample
    Stochastic,
    /// Grid-stratified camera rays, light samples and reflections
    Distributed,
}

impl From<Sampling> for SamplingStrategy {
    fn from(sampling: Sampling) -> Self {
        match sampling {
            Sampling::Stochastic => SamplingStrategy::StochasticPath,
            Sampling::Distributed => SamplingStrategy::StratifiedDistributed,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Execution {
    Sequential,
    Parallel,
    Gpu,
}

impl From<Execution> for ExecutionStrategy {
    fn from(execution: Execution) -> Self {
        match execution {
            Execution::Sequential => ExecutionStrategy::Sequential,
            Execution::Parallel => ExecutionStrategy::DataParallel,
            Execution::Gpu => ExecutionStrategy::GpuOffload,
        }
    }
}

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "lumen")]
#[command(about = "Path tracer and distributed ray tracer for spheres and planes")]
pub struct Args {
    /// JSON render config; command line options override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// JSON scene description (defaults to the built-in showcase scene)
    #[arg(long)]
    pub scene: Option<PathBuf>,

    /// Output image path (.bmp or .png)
    #[arg(short, long, default_value = "output.bmp")]
    pub output: PathBuf,

    /// Image width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Image height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Camera rays per pixel in stochastic mode
    #[arg(long, short = 's')]
    pub samples: Option<u32>,

    /// Maximum bounce depth
    #[arg(long, short = 'd')]
    pub depth: Option<u32>,

    /// Stratification factor for distributed sampling
    #[arg(long, short = 'g')]
    pub grid_size: Option<u32>,

    #[arg(long, value_enum)]
    pub sampling: Option<Sampling>,

    #[arg(long, value_enum)]
    pub execution: Option<Execution>,

    /// Seed for every random stream
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads for parallel execution
    #[arg(long, short = 't')]
    pub threads: Option<usize>,

    /// Also spread each pixel's samples over the thread pool
    #[arg(long)]
    pub parallel_samples: bool,

    /// Print the resolved config as JSON and exit
    #[arg(long)]
    pub print_config: bool,

    /// Set the logging level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

impl Args {
    /// Layer command line overrides on top of `config`.
    pub fn apply(&self, mut config: RenderConfig) -> RenderConfig {
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(samples) = self.samples {
            config.samples_per_pixel = samples;
        }
        if let Some(depth) = self.depth {
            config.max_bounce_depth = depth;
        }
        if let Some(grid_size) = self.grid_size {
            config.grid_size = grid_size;
        }
        if let Some(sampling) = self.sampling {
            config.sampling = sampling.into();
        }
        if let Some(execution) = self.execution {
            config.execution = execution.into();
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if self.parallel_samples {
            config.parallel_samples = true;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let args = Args::parse_from([
            "lumen",
            "--width",
            "64",
            "--sampling",
            "distributed",
            "--execution",
            "gpu",
            "-g",
            "2",
            "--threads",
            "3",
        ]);
        let config = args.apply(RenderConfig::default());

        assert_eq!(config.width, 64);
        assert_eq!(config.height, 512);
        assert_eq!(config.grid_size, 2);
        assert_eq!(config.sampling, SamplingStrategy::StratifiedDistributed);
        assert_eq!(config.execution, ExecutionStrategy::GpuOffload);
        assert_eq!(config.threads, Some(3));
    }

    #[test]
    fn test_no_overrides_keeps_file_values() {
        let args = Args::parse_from(["lumen"]);
        let file = RenderConfig {
            width: 32,
            seed: 5,
            parallel_samples: true,
            ..Default::default()
        };

        assert_eq!(args.apply(file.clone()), file);
        assert_eq!(args.output, PathBuf::from("output.bmp"));
    }
}
