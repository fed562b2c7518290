//! Image file output.
//!
//! The format follows the file extension: BMP by default, PNG when asked.

use anyhow::{bail, Context, Result};
use image::RgbImage;
use log::info;
use lumen_renderer::ImageBuffer;
use std::path::Path;

const SUPPORTED_EXTENSIONS: [&str; 2] = ["bmp", "png"];

/// Quantize the render to 8-bit RGB.
pub fn to_rgb_image(image: &ImageBuffer) -> Result<RgbImage> {
    RgbImage::from_raw(image.width, image.height, image.to_rgb8())
        .context("Pixel buffer does not match image dimensions")
}

/// Save the render, choosing the encoder from the extension.
pub fn save_image(image: &ImageBuffer, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        bail!(
            "Unsupported output format '{}' (expected .bmp or .png)",
            path.display()
        );
    }

    to_rgb_image(image)?
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Image saved as {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_renderer::Color;

    #[test]
    fn test_to_rgb_image() {
        let mut image = ImageBuffer::new(2, 1);
        image.set(0, 0, Color::new(229.5, 102.0, -3.0));
        image.set(1, 0, Color::new(400.0, 0.4, 254.6));

        let rgb = to_rgb_image(&image).unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [230, 102, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 0, 255]);
    }

    #[test]
    fn test_save_bmp_roundtrip() {
        let mut image = ImageBuffer::new(3, 2);
        image.set(1, 1, Color::new(10.0, 20.0, 30.0));
        let path = std::env::temp_dir().join(format!("lumen_output_{}.bmp", std::process::id()));

        save_image(&image, &path).unwrap();
        let loaded = image::open(&path).unwrap().to_rgb8();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.dimensions(), (3, 2));
        assert_eq!(loaded.get_pixel(1, 1).0, [10, 20, 30]);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let image = ImageBuffer::new(1, 1);
        assert!(save_image(&image, Path::new("render.tga")).is_err());
    }
}
