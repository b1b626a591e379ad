//! Descriptor trait, shared error type, and grayscale loading.
//!
//! The [`Descriptor`] trait is the seam between the batch runner (which
//! decides *which* images to process) and the descriptor math (which turns
//! one grayscale image into a feature array). Production code uses
//! [`DescriptorParams`](super::DescriptorParams); tests swap in mocks that
//! record, delay or fail without touching image files.

use image::{GrayImage, ImageReader};
use ndarray::{Array2, ArrayD};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Invalid descriptor parameter: {0}")]
    Parameter(String),
}

/// Which feature-extraction algorithm a pipeline run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    Glcm,
    Lbp,
    Lpq,
}

impl DescriptorKind {
    pub const ALL: [DescriptorKind; 3] =
        [DescriptorKind::Glcm, DescriptorKind::Lbp, DescriptorKind::Lpq];

    pub fn name(self) -> &'static str {
        match self {
            DescriptorKind::Glcm => "GLCM",
            DescriptorKind::Lbp => "LBP",
            DescriptorKind::Lpq => "LPQ",
        }
    }

    /// Lowercase name, as used for config sections and CLI values.
    pub fn key(self) -> &'static str {
        match self {
            DescriptorKind::Glcm => "glcm",
            DescriptorKind::Lbp => "lbp",
            DescriptorKind::Lpq => "lpq",
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DescriptorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "glcm" => Ok(DescriptorKind::Glcm),
            "lbp" => Ok(DescriptorKind::Lbp),
            "lpq" => Ok(DescriptorKind::Lpq),
            other => Err(format!(
                "unknown descriptor '{other}' (expected glcm, lbp or lpq)"
            )),
        }
    }
}

/// A texture descriptor: one grayscale image in, one feature array out.
///
/// `Sync` because a single descriptor is shared by every rayon worker.
pub trait Descriptor: Sync {
    fn kind(&self) -> DescriptorKind;

    /// Compute features for an already decoded image.
    fn describe(&self, image: &GrayImage) -> Result<ArrayD<f64>, DescriptorError>;

    /// Decode `path` as grayscale and compute its features.
    fn extract(&self, path: &Path) -> Result<ArrayD<f64>, DescriptorError> {
        let image = load_gray(path)?;
        self.describe(&image)
    }
}

/// Open an image and convert it to single-channel 8-bit grayscale.
///
/// The format is sniffed from the file content, so a mislabeled extension
/// still decodes.
pub fn load_gray(path: &Path) -> Result<GrayImage, DescriptorError> {
    let io_err = |source| DescriptorError::Io {
        path: path.to_path_buf(),
        source,
    };
    let image = ImageReader::open(path)
        .map_err(io_err)?
        .with_guessed_format()
        .map_err(io_err)?
        .decode()
        .map_err(|source| DescriptorError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(image.to_luma8())
}

/// Pixel values as a `rows × cols` float array.
pub(crate) fn gray_to_array(image: &GrayImage) -> Array2<f64> {
    let (width, height) = image.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(r, c)| {
        image.get_pixel(c as u32, r as u32)[0] as f64
    })
}
