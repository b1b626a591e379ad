//! Gray-level co-occurrence matrix texture properties.
//!
//! One co-occurrence matrix is built per (distance, angle) pair and reduced
//! to the six Haralick-style properties in [`GlcmProperty::ALL`]. The result
//! is a `properties × (distances · angles)` array with columns in
//! distance-major order.

use super::backend::DescriptorError;
use super::params::GlcmParams;
use image::GrayImage;
use ndarray::Array2;

/// Texture properties derived from a normalized co-occurrence matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlcmProperty {
    Contrast,
    Dissimilarity,
    Homogeneity,
    /// Angular second moment.
    Asm,
    Energy,
    Correlation,
}

impl GlcmProperty {
    /// Row order of [`glcm_features`] output.
    pub const ALL: [GlcmProperty; 6] = [
        GlcmProperty::Contrast,
        GlcmProperty::Dissimilarity,
        GlcmProperty::Homogeneity,
        GlcmProperty::Asm,
        GlcmProperty::Energy,
        GlcmProperty::Correlation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GlcmProperty::Contrast => "contrast",
            GlcmProperty::Dissimilarity => "dissimilarity",
            GlcmProperty::Homogeneity => "homogeneity",
            GlcmProperty::Asm => "ASM",
            GlcmProperty::Energy => "energy",
            GlcmProperty::Correlation => "correlation",
        }
    }
}

/// Pixel offset `(row, col)` for a distance along an angle.
pub fn offset(distance: u32, angle: f64) -> (isize, isize) {
    let d = distance as f64;
    (
        (angle.sin() * d).round() as isize,
        (angle.cos() * d).round() as isize,
    )
}

fn quantize(value: u8, levels: usize) -> usize {
    (value as usize * levels) / 256
}

/// Normalized co-occurrence matrix of `levels × levels` for one offset.
///
/// Pairs whose neighbor falls outside the image are skipped. An image with
/// no valid pair yields an all-zero matrix.
pub fn co_occurrence(
    image: &GrayImage,
    offset: (isize, isize),
    levels: usize,
    symmetric: bool,
) -> Array2<f64> {
    let (width, height) = image.dimensions();
    let (rows, cols) = (height as isize, width as isize);
    let (dr, dc) = offset;
    let mut counts = Array2::<f64>::zeros((levels, levels));

    for r in 0isize.max(-dr)..rows.min(rows - dr) {
        for c in 0isize.max(-dc)..cols.min(cols - dc) {
            let i = quantize(image.get_pixel(c as u32, r as u32)[0], levels);
            let j = quantize(
                image.get_pixel((c + dc) as u32, (r + dr) as u32)[0],
                levels,
            );
            counts[[i, j]] += 1.0;
            if symmetric {
                counts[[j, i]] += 1.0;
            }
        }
    }

    let total = counts.sum();
    if total > 0.0 {
        counts /= total;
    }
    counts
}

/// Reduce a normalized co-occurrence matrix to one property value.
pub fn property(p: &Array2<f64>, prop: GlcmProperty) -> f64 {
    let weighted = |weight: fn(f64, f64) -> f64| -> f64 {
        p.indexed_iter()
            .map(|((i, j), v)| v * weight(i as f64, j as f64))
            .sum()
    };
    match prop {
        GlcmProperty::Contrast => weighted(|i, j| (i - j).powi(2)),
        GlcmProperty::Dissimilarity => weighted(|i, j| (i - j).abs()),
        GlcmProperty::Homogeneity => weighted(|i, j| 1.0 / (1.0 + (i - j).powi(2))),
        GlcmProperty::Asm => p.iter().map(|v| v * v).sum(),
        GlcmProperty::Energy => p.iter().map(|v| v * v).sum::<f64>().sqrt(),
        GlcmProperty::Correlation => correlation(p),
    }
}

fn correlation(p: &Array2<f64>) -> f64 {
    let (mut mu_i, mut mu_j) = (0.0, 0.0);
    for ((i, j), v) in p.indexed_iter() {
        mu_i += i as f64 * v;
        mu_j += j as f64 * v;
    }
    let (mut var_i, mut var_j, mut cov) = (0.0, 0.0, 0.0);
    for ((i, j), v) in p.indexed_iter() {
        let di = i as f64 - mu_i;
        let dj = j as f64 - mu_j;
        var_i += v * di * di;
        var_j += v * dj * dj;
        cov += v * di * dj;
    }
    let (std_i, std_j) = (var_i.sqrt(), var_j.sqrt());
    if std_i < 1e-15 || std_j < 1e-15 {
        return 1.0;
    }
    cov / (std_i * std_j)
}

/// Compute the GLCM property table for an image.
pub fn glcm_features(image: &GrayImage, params: &GlcmParams) -> Result<Array2<f64>, DescriptorError> {
    params.validate()?;
    let levels = params.levels as usize;
    let columns = params.distances.len() * params.angles.len();
    let mut out = Array2::<f64>::zeros((GlcmProperty::ALL.len(), columns));

    let mut col = 0;
    for &distance in &params.distances {
        for &angle in &params.angles {
            let p = co_occurrence(image, offset(distance, angle), levels, params.symmetric);
            for (row, prop) in GlcmProperty::ALL.iter().enumerate() {
                out[[row, col]] = property(&p, *prop);
            }
            col += 1;
        }
    }
    Ok(out)
}
