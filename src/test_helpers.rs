//! Shared test utilities for the texture-features test suite.
//!
//! Provides synthetic grayscale images and helpers that write them as BMP
//! files into temp directories, so descriptor and pipeline tests run
//! without checked-in fixtures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_image_dir(&["cat1.bmp", "dog2.bmp"]);
//! let pattern = glob_in(tmp.path(), "*.bmp");
//! ```

use image::{GrayImage, ImageFormat, Luma};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =========================================================================
// Synthetic images
// =========================================================================

/// Every pixel set to `value`.
pub fn constant(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// Horizontal ramp with a little vertical texture.
pub fn gradient(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        Luma([((x * 255 / width.max(1)) as u8).wrapping_add((y % 3) as u8 * 7)])
    })
}

/// Black and white squares of `cell` pixels.
pub fn checkerboard(width: u32, height: u32, cell: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Image from row-major pixel values. Panics if the length doesn't match.
pub fn gray_from_pixels(width: u32, height: u32, pixels: &[u8]) -> GrayImage {
    GrayImage::from_raw(width, height, pixels.to_vec())
        .unwrap_or_else(|| panic!("expected {} pixels, got {}", width * height, pixels.len()))
}

// =========================================================================
// Fixture files
// =========================================================================

/// Save `image` as `dir/name` in BMP format and return the path.
pub fn write_gray_bmp(dir: &Path, name: &str, image: &GrayImage) -> PathBuf {
    let path = dir.join(name);
    image.save_with_format(&path, ImageFormat::Bmp).unwrap();
    path
}

/// Temp directory holding one textured 24×20 BMP per name.
///
/// Each image gets a different checkerboard cell size so the descriptors
/// produce distinguishable rows.
pub fn setup_image_dir(names: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (i, name) in names.iter().enumerate() {
        write_gray_bmp(tmp.path(), name, &checkerboard(24, 20, i as u32 + 1));
    }
    tmp
}

/// A glob pattern for `file_pattern` inside `dir`.
pub fn glob_in(dir: &Path, file_pattern: &str) -> String {
    format!("{}/{}", dir.display(), file_pattern)
}
