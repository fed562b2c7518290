//! Bucket-based tile rendering.
//!
//! Divides the image into tiles (buckets) that are rendered independently
//! and in parallel using rayon. Every sample draws from its own seeded
//! stream, so the result does not depend on which thread ran which bucket.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::RenderConfig;
use crate::renderer::{ImageBuffer, RenderBackend, RenderContext, RenderError, RenderOutput};
use lumen_core::Scene;
use lumen_math::Color;
use rayon::prelude::*;

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// X coordinate of bucket's top-left corner
    pub x: u32,
    /// Y coordinate of bucket's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Index of this bucket in the render order
    pub index: usize,
}

impl Bucket {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    /// Get the total number of pixels in this bucket.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }
}

/// Tile the image into `bucket_size` squares, nearest to the centre first.
///
/// Edge tiles are clipped to the image. Tiles at equal distance keep
/// row-major order, and `index` is the position in the returned order.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let step = bucket_size.max(1) as usize;
    let mut tiles: Vec<(u32, u32, u32, u32)> = (0..height)
        .step_by(step)
        .flat_map(|y| {
            (0..width).step_by(step).map(move |x| {
                (x, y, bucket_size.min(width - x), bucket_size.min(height - y))
            })
        })
        .collect();

    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let centre_distance = |&(x, y, w, h): &(u32, u32, u32, u32)| {
        let dx = x as f64 + w as f64 / 2.0 - cx;
        let dy = y as f64 + h as f64 / 2.0 - cy;
        dx * dx + dy * dy
    };
    tiles.sort_by(|a, b| centre_distance(a).total_cmp(&centre_distance(b)));

    tiles
        .into_iter()
        .enumerate()
        .map(|(index, (x, y, w, h))| Bucket::new(x, y, w, h, index))
        .collect()
}

/// Result of rendering a bucket.
#[derive(Debug, Clone)]
pub struct BucketResult {
    pub bucket: Bucket,
    /// Finalized pixel colours in row-major order
    pub pixels: Vec<Color>,
    /// Rays traced for this bucket
    pub rays: u64,
}

impl BucketResult {
    /// Copy the bucket's pixels into their place in the image.
    pub fn write_into(&self, image: &mut ImageBuffer) {
        let mut pixels = self.pixels.iter();
        for local_y in 0..self.bucket.height {
            for local_x in 0..self.bucket.width {
                if let Some(color) = pixels.next() {
                    image.set(self.bucket.x + local_x, self.bucket.y + local_y, *color);
                }
            }
        }
    }
}

/// Render a single bucket.
///
/// With `parallel_samples` each pixel's samples are also spread over the pool.
pub fn render_bucket(
    bucket: &Bucket,
    context: &RenderContext<'_>,
    parallel_samples: bool,
) -> BucketResult {
    let mut pixels = Vec::with_capacity(bucket.pixel_count() as usize);
    let mut rays = 0;

    for local_y in 0..bucket.height {
        for local_x in 0..bucket.width {
            let (x, y) = (bucket.x + local_x, bucket.y + local_y);
            let pixel = if parallel_samples {
                context.render_pixel_parallel(x, y)
            } else {
                context.render_pixel(x, y)
            };
            rays += pixel.rays();
            pixels.push(pixel.finalize());
        }
    }

    BucketResult {
        bucket: *bucket,
        pixels,
        rays,
    }
}

/// Buckets spread over a rayon thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataParallelBackend;

impl RenderBackend for DataParallelBackend {
    fn name(&self) -> &'static str {
        "data parallel"
    }

    fn render(&self, scene: &Scene, config: &RenderConfig) -> Result<RenderOutput, RenderError> {
        let context = RenderContext::new(scene, config)?;
        let buckets = generate_buckets(config.width, config.height, config.bucket_size);

        // 0 lets rayon pick one thread per core
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads.unwrap_or(0))
            .build()?;
        log::debug!(
            "Rendering {} buckets on {} threads",
            buckets.len(),
            pool.current_num_threads()
        );

        let completed = AtomicUsize::new(0);
        let results: Vec<BucketResult> = pool.install(|| {
            buckets
                .par_iter()
                .map(|bucket| {
                    let result = render_bucket(bucket, &context, config.parallel_samples);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    log::debug!("Bucket {}/{} done", done, buckets.len());
                    result
                })
                .collect()
        });

        let mut image = ImageBuffer::new(config.width, config.height);
        let mut rays = 0;
        for result in &results {
            result.write_into(&mut image);
            rays += result.rays;
        }

        Ok(RenderOutput {
            image,
            rays: Some(rays),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplingStrategy;
    use crate::renderer::SequentialBackend;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_odd_bucket_size_covers_image_once() {
        let (width, height) = (24, 18);
        let buckets = generate_buckets(width, height, 7);
        // 4 columns (7, 7, 7, 3) by 3 rows (7, 7, 4)
        assert_eq!(buckets.len(), 12);

        let mut covered = vec![0u8; (width * height) as usize];
        for bucket in &buckets {
            assert!(bucket.x + bucket.width <= width);
            assert!(bucket.y + bucket.height <= height);
            for y in bucket.y..bucket.y + bucket.height {
                for x in bucket.x..bucket.x + bucket.width {
                    covered[(y * width + x) as usize] += 1;
                }
            }
        }
        assert!(covered.iter().all(|&count| count == 1));

        let corner = buckets.iter().find(|b| (b.x, b.y) == (21, 14)).unwrap();
        assert_eq!((corner.width, corner.height), (3, 4));
    }

    #[test]
    fn test_bucket_larger_than_image() {
        let buckets = generate_buckets(5, 3, 64);
        assert_eq!(buckets, vec![Bucket::new(0, 0, 5, 3, 0)]);
    }

    #[test]
    fn test_centre_buckets_first() {
        let buckets = generate_buckets(24, 18, 7);
        assert!(buckets.iter().enumerate().all(|(i, b)| b.index == i));

        // The tile holding the image centre (12, 9) leads
        let first = buckets[0];
        assert!((first.x..first.x + first.width).contains(&12));
        assert!((first.y..first.y + first.height).contains(&9));

        let distance = |b: &Bucket| {
            let dx = b.x as f64 + b.width as f64 / 2.0 - 12.0;
            let dy = b.y as f64 + b.height as f64 / 2.0 - 9.0;
            dx * dx + dy * dy
        };
        assert!(buckets.windows(2).all(|w| distance(&w[0]) <= distance(&w[1])));
    }

    #[test]
    fn test_matches_sequential() {
        init_logger();
        let scene = Scene::showcase();

        for sampling in [
            SamplingStrategy::StochasticPath,
            SamplingStrategy::StratifiedDistributed,
        ] {
            let config = RenderConfig {
                width: 24,
                height: 18,
                grid_size: 2,
                bucket_size: 7,
                threads: Some(3),
                sampling,
                ..Default::default()
            };

            let sequential = SequentialBackend.render(&scene, &config).unwrap();
            let parallel = DataParallelBackend.render(&scene, &config).unwrap();

            assert_eq!(sequential.rays, parallel.rays);
            for (a, b) in sequential.image.pixels.iter().zip(&parallel.image.pixels) {
                assert!((*a - *b).length() < 1e-9);
            }
        }
    }

    #[test]
    fn test_parallel_samples_match() {
        let scene = Scene::showcase();
        let config = RenderConfig {
            width: 8,
            height: 8,
            samples_per_pixel: 8,
            ..Default::default()
        };

        let plain = DataParallelBackend.render(&scene, &config).unwrap();
        let fanned = DataParallelBackend
            .render(
                &scene,
                &RenderConfig {
                    parallel_samples: true,
                    ..config
                },
            )
            .unwrap();

        assert_eq!(plain.rays, fanned.rays);
        for (a, b) in plain.image.pixels.iter().zip(&fanned.image.pixels) {
            assert!((*a - *b).length() < 1e-9);
        }
    }

    #[test]
    fn test_independent_seeds_agree_statistically() {
        // Different seeds give different noise but the same expected image
        let scene = Scene::showcase();
        let config = RenderConfig {
            width: 16,
            height: 16,
            samples_per_pixel: 16,
            ..Default::default()
        };

        let a = DataParallelBackend.render(&scene, &config).unwrap();
        let b = DataParallelBackend
            .render(&scene, &RenderConfig { seed: 99, ..config })
            .unwrap();

        let difference = (a.image.mean() - b.image.mean()).abs();
        assert!(difference.max_element() < 5.0, "mean difference {difference:?}");
    }
}
