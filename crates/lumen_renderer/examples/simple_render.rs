//! Simple render example.
//!
//! Renders the built-in showcase scene with both integrators and saves
//! each to PPM format.

use lumen_renderer::{
    quantize, DataParallelBackend, ImageBuffer, RenderBackend, RenderConfig, SamplingStrategy,
    Scene,
};
use std::fs::File;
use std::io::{BufWriter, Write};

fn main() {
    println!("Lumen - Simple Example");
    println!("======================");

    let scene = Scene::showcase();
    println!("Scene has {} surfaces", scene.len());

    for (sampling, filename) in [
        (SamplingStrategy::StochasticPath, "stochastic.ppm"),
        (SamplingStrategy::StratifiedDistributed, "distributed.ppm"),
    ] {
        let config = RenderConfig {
            width: 256,
            height: 256,
            samples_per_pixel: 16,
            sampling,
            ..Default::default()
        };

        println!(
            "Rendering {}x{} with {} sampling...",
            config.width, config.height, sampling
        );

        let start = std::time::Instant::now();
        let output = DataParallelBackend
            .render(&scene, &config)
            .expect("Render failed");
        println!(
            "Rendered in {:?} ({} rays)",
            start.elapsed(),
            output.rays.unwrap_or(0)
        );

        save_ppm(&output.image, filename).expect("Failed to save image");
        println!("Saved to {}", filename);
    }
}

fn save_ppm(image: &ImageBuffer, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "P3")?;
    writeln!(writer, "{} {}", image.width, image.height)?;
    writeln!(writer, "255")?;

    for y in 0..image.height {
        for x in 0..image.width {
            let color = image.get(x, y);
            writeln!(
                writer,
                "{} {} {}",
                quantize(color.x),
                quantize(color.y),
                quantize(color.z)
            )?;
        }
    }

    Ok(())
}
