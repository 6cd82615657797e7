//! Downsizes oversized lesson images to keep packages small for low-bandwidth delivery.

use anyhow::{Context, Result};
use image::{imageops::FilterType, GenericImageView, ImageFormat};
use std::path::Path;
use walkdir::WalkDir;

/// The extensions of the images that are considered for resizing.
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Returns whether the path looks like a resizable image.
fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Returns the dimensions of an image scaled to the given height, keeping the aspect ratio.
pub fn scaled_dimensions(width: u32, height: u32, max_height: u32) -> (u32, u32) {
    let new_width = (f64::from(max_height) / f64::from(height) * f64::from(width)).round() as u32;
    (new_width.max(1), max_height)
}

/// Resizes the image at the given path if it's taller than `max_height`. The image is written
/// back in its original format. Returns whether the image was resized.
pub fn resize_image(path: &Path, max_height: u32) -> Result<bool> {
    let format = ImageFormat::from_path(path)
        .with_context(|| format!("Failed to detect image format: {}", path.display()))?;
    let image =
        image::open(path).with_context(|| format!("Failed to open image: {}", path.display()))?;
    let (width, height) = image.dimensions();
    if height <= max_height {
        return Ok(false);
    }

    let (new_width, new_height) = scaled_dimensions(width, height, max_height);
    tracing::debug!(
        "Resizing {} from {}x{} to {}x{}",
        path.display(),
        width,
        height,
        new_width,
        new_height
    );
    image
        .resize_exact(new_width, new_height, FilterType::Lanczos3)
        .save_with_format(path, format)
        .with_context(|| format!("Failed to save image: {}", path.display()))?;
    Ok(true)
}

/// Resizes every image under the given directory that's taller than `max_height`. A missing
/// directory contains no images. Returns the number of resized images.
pub fn resize_images(dir: &Path, max_height: u32) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut resized = 0;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_image(entry.path()) {
            continue;
        }
        if resize_image(entry.path(), max_height)? {
            resized += 1;
        }
    }
    Ok(resized)
}

#[cfg(test)]
mod test {
    use image::{DynamicImage, RgbImage};
    use std::{fs, path::PathBuf};

    use super::*;

    fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let pixels = RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
        DynamicImage::ImageRgb8(pixels).save(&path).unwrap();
        path
    }

    /// Verifies the computation of the new dimensions.
    #[test]
    fn test_scaled_dimensions() {
        assert_eq!((320, 640), scaled_dimensions(640, 1280, 640));
        assert_eq!((427, 640), scaled_dimensions(1000, 1500, 640));
        assert_eq!((1, 640), scaled_dimensions(1, 5000, 640));
    }

    /// Verifies that tall images are resized and the rest are left untouched.
    #[test]
    fn test_resize_images() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        let tall_png = write_image(temp_dir.path(), "tall.png", 1000, 1500);
        let tall_jpg = write_image(&nested, "tall.JPG", 300, 900);
        let short = write_image(temp_dir.path(), "short.png", 2000, 640);
        let short_bytes = fs::read(&short).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "not an image").unwrap();

        assert_eq!(2, resize_images(temp_dir.path(), 640).unwrap());

        assert_eq!((427, 640), image::open(&tall_png).unwrap().dimensions());
        assert_eq!((213, 640), image::open(&tall_jpg).unwrap().dimensions());
        assert_eq!(
            ImageFormat::Jpeg,
            image::ImageReader::open(&tall_jpg)
                .unwrap()
                .with_guessed_format()
                .unwrap()
                .format()
                .unwrap()
        );
        assert_eq!(short_bytes, fs::read(&short).unwrap());

        // Running again leaves everything untouched.
        assert_eq!(0, resize_images(temp_dir.path(), 640).unwrap());
    }

    /// Verifies that a missing directory is not an error.
    #[test]
    fn test_resize_missing_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert_eq!(0, resize_images(&temp_dir.path().join("assets"), 640).unwrap());
    }

    /// Verifies that a corrupted image is reported.
    #[test]
    fn test_resize_corrupted_image() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("broken.png"), "not a png").unwrap();
        assert!(resize_images(temp_dir.path(), 640).is_err());
    }
}
