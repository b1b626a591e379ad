//! Local binary patterns.
//!
//! Each pixel is compared with `P` neighbors sampled on a circle of radius
//! `R` (bilinear interpolation, zero outside the image). The resulting bit
//! pattern is mapped to a code by [`LbpMethod`], and the image is summarized
//! as a normalized code histogram.

use super::backend::{DescriptorError, gray_to_array};
use super::params::{LbpMethod, LbpParams};
use image::GrayImage;
use ndarray::{Array1, Array2};
use std::f64::consts::PI;

/// Histogram bins used for the `var` method.
pub const VAR_BINS: usize = 16;

fn round5(value: f64) -> f64 {
    (value * 1e5).round() / 1e5
}

/// `(row, col)` offsets of the `points` circle neighbors.
pub fn neighbor_offsets(points: u32, radius: f64) -> Vec<(f64, f64)> {
    (0..points)
        .map(|p| {
            let theta = 2.0 * PI * p as f64 / points as f64;
            (round5(-radius * theta.sin()), round5(radius * theta.cos()))
        })
        .collect()
}

/// Bilinear sample at a fractional position; pixels outside the image are 0.
pub fn bilinear(image: &Array2<f64>, r: f64, c: f64) -> f64 {
    let (rows, cols) = image.dim();
    let pixel = |rr: f64, cc: f64| {
        if rr < 0.0 || cc < 0.0 || rr >= rows as f64 || cc >= cols as f64 {
            0.0
        } else {
            image[[rr as usize, cc as usize]]
        }
    };
    let (min_r, min_c) = (r.floor(), c.floor());
    let (max_r, max_c) = (r.ceil(), c.ceil());
    let (dr, dc) = (r - min_r, c - min_c);
    let top = (1.0 - dc) * pixel(min_r, min_c) + dc * pixel(min_r, max_c);
    let bottom = (1.0 - dc) * pixel(max_r, min_c) + dc * pixel(max_r, max_c);
    (1.0 - dr) * top + dr * bottom
}

fn binary_value(bits: &[bool]) -> u64 {
    bits.iter()
        .enumerate()
        .filter(|(_, set)| **set)
        .map(|(i, _)| 1u64 << i)
        .sum()
}

fn rotate_right(value: u64, length: usize) -> u64 {
    (value >> 1) | ((value & 1) << (length - 1))
}

/// Bit changes between consecutive neighbors. The wrap from the last
/// neighbor back to the first is not counted.
fn transitions(bits: &[bool]) -> usize {
    bits.windows(2).filter(|w| w[0] != w[1]).count()
}

/// Map a neighbor bit pattern to its code. `var` is not a bit mapping and
/// is handled by [`sample_variance`].
pub fn pattern_code(bits: &[bool], method: LbpMethod) -> usize {
    let p = bits.len();
    let ones = bits.iter().filter(|b| **b).count();
    match method {
        LbpMethod::Default | LbpMethod::Var => binary_value(bits) as usize,
        LbpMethod::Ror => {
            let mut value = binary_value(bits);
            let mut min = value;
            for _ in 1..p {
                value = rotate_right(value, p);
                min = min.min(value);
            }
            min as usize
        }
        LbpMethod::Uniform => {
            if transitions(bits) <= 2 {
                ones
            } else {
                p + 1
            }
        }
        LbpMethod::NriUniform => {
            if transitions(bits) > 2 {
                p * (p - 1) + 2
            } else if ones == 0 {
                0
            } else if ones == p {
                p * (p - 1) + 1
            } else {
                let first_one = bits.iter().position(|b| *b).unwrap_or(0);
                let first_zero = bits.iter().position(|b| !*b).unwrap_or(0);
                let rotation = if first_one == 0 {
                    ones - first_zero
                } else {
                    p - first_one
                };
                1 + (ones - 1) * p + rotation
            }
        }
    }
}

/// Population variance of the sampled neighbor values.
pub fn sample_variance(samples: &[f64]) -> f64 {
    let n = samples.len() as f64;
    let sum: f64 = samples.iter().sum();
    let sum_sq: f64 = samples.iter().map(|s| s * s).sum();
    (sum_sq - sum * sum / n) / n
}

/// Per-pixel LBP codes (or variances for `var`).
pub fn lbp_codes(image: &Array2<f64>, params: &LbpParams) -> Array2<f64> {
    let offsets = neighbor_offsets(params.points, params.radius);
    let mut samples = vec![0.0; offsets.len()];
    let mut bits = vec![false; offsets.len()];

    Array2::from_shape_fn(image.dim(), |(r, c)| {
        let center = image[[r, c]];
        for (k, (dr, dc)) in offsets.iter().enumerate() {
            samples[k] = bilinear(image, r as f64 + dr, c as f64 + dc);
        }
        if params.method == LbpMethod::Var {
            return sample_variance(&samples);
        }
        for (bit, sample) in bits.iter_mut().zip(&samples) {
            *bit = sample - center >= 0.0;
        }
        pattern_code(&bits, params.method) as f64
    })
}

/// Number of histogram bins produced for a parameter set.
pub fn histogram_bins(params: &LbpParams) -> usize {
    let p = params.points as usize;
    match params.method {
        LbpMethod::Default | LbpMethod::Ror => 1 << p,
        LbpMethod::Uniform => p + 2,
        LbpMethod::NriUniform => p * (p - 1) + 3,
        LbpMethod::Var => VAR_BINS,
    }
}

fn normalize(mut counts: Array1<f64>) -> Array1<f64> {
    let total = counts.sum();
    if total > 0.0 {
        counts /= total;
    }
    counts
}

/// Normalized LBP code histogram of a grayscale image.
pub fn lbp_histogram(image: &GrayImage, params: &LbpParams) -> Result<Array1<f64>, DescriptorError> {
    params.validate()?;
    let codes = lbp_codes(&gray_to_array(image), params);
    let bins = histogram_bins(params);
    let mut counts = Array1::<f64>::zeros(bins);

    if params.method == LbpMethod::Var {
        let min = codes.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = codes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        for v in codes.iter() {
            let bin = if range > 0.0 {
                (((v - min) / range) * bins as f64) as usize
            } else {
                0
            };
            counts[bin.min(bins - 1)] += 1.0;
        }
    } else {
        for code in codes.iter() {
            counts[*code as usize] += 1.0;
        }
    }

    Ok(normalize(counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{constant, gradient};
    use approx::assert_relative_eq;
    use ndarray::array;

    fn bits(pattern: &str) -> Vec<bool> {
        pattern.chars().map(|c| c == '1').collect()
    }

    #[test]
    fn offsets_land_on_grid_for_cardinal_neighbors() {
        let offsets = neighbor_offsets(8, 2.0);
        assert_eq!(offsets.len(), 8);
        assert_eq!(offsets[0], (0.0, 2.0));
        assert_eq!(offsets[2], (-2.0, 0.0));
        assert_eq!(offsets[4], (0.0, -2.0));
        assert_eq!(offsets[6], (2.0, 0.0));
        assert_relative_eq!(offsets[1].0, -1.41421, epsilon = 1e-9);
    }

    #[test]
    fn bilinear_interpolates_and_pads_with_zero() {
        let image = array![[0.0, 10.0], [20.0, 30.0]];
        assert_eq!(bilinear(&image, 0.0, 1.0), 10.0);
        assert_relative_eq!(bilinear(&image, 0.5, 0.5), 15.0);
        assert_relative_eq!(bilinear(&image, 0.0, 1.5), 5.0);
        assert_eq!(bilinear(&image, -1.0, 0.0), 0.0);
    }

    #[test]
    fn default_code_is_binary_value() {
        assert_eq!(pattern_code(&bits("10000000"), LbpMethod::Default), 1);
        assert_eq!(pattern_code(&bits("01000001"), LbpMethod::Default), 130);
    }

    #[test]
    fn ror_code_is_minimum_rotation() {
        assert_eq!(pattern_code(&bits("01000000"), LbpMethod::Ror), 1);
        assert_eq!(pattern_code(&bits("00011000"), LbpMethod::Ror), 3);
    }

    #[test]
    fn uniform_code_counts_ones() {
        assert_eq!(pattern_code(&bits("11100000"), LbpMethod::Uniform), 3);
        assert_eq!(pattern_code(&bits("10100000"), LbpMethod::Uniform), 9);
    }

    #[test]
    fn nri_uniform_mapping() {
        let m = LbpMethod::NriUniform;
        assert_eq!(pattern_code(&bits("00000000"), m), 0);
        assert_eq!(pattern_code(&bits("10000000"), m), 1);
        assert_eq!(pattern_code(&bits("01000000"), m), 8);
        assert_eq!(pattern_code(&bits("11000000"), m), 9);
        assert_eq!(pattern_code(&bits("11111111"), m), 57);
        assert_eq!(pattern_code(&bits("10100000"), m), 58);
    }

    #[test]
    fn variance_of_samples() {
        assert_relative_eq!(sample_variance(&[0.0, 2.0]), 1.0);
        assert_relative_eq!(sample_variance(&[5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn black_image_is_all_ones_pattern() {
        // Zero padding equals the zero center, so every bit is set.
        let image = constant(6, 6, 0);

        let default = lbp_histogram(&image, &LbpParams {
            method: LbpMethod::Default,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(default.len(), 256);
        assert_relative_eq!(default[255], 1.0);

        let nri = lbp_histogram(&image, &LbpParams::default()).unwrap();
        assert_eq!(nri.len(), 59);
        assert_relative_eq!(nri[57], 1.0);

        let uniform = lbp_histogram(&image, &LbpParams {
            method: LbpMethod::Uniform,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(uniform.len(), 10);
        assert_relative_eq!(uniform[8], 1.0);
    }

    #[test]
    fn histograms_are_normalized() {
        let image = gradient(16, 12);
        for method in [
            LbpMethod::Default,
            LbpMethod::Ror,
            LbpMethod::Uniform,
            LbpMethod::NriUniform,
            LbpMethod::Var,
        ] {
            let params = LbpParams {
                method,
                ..Default::default()
            };
            let hist = lbp_histogram(&image, &params).unwrap();
            assert_eq!(hist.len(), histogram_bins(&params));
            assert_relative_eq!(hist.sum(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn bad_radius_is_parameter_error() {
        let params = LbpParams {
            radius: 0.0,
            ..Default::default()
        };
        let result = lbp_histogram(&constant(4, 4, 0), &params);
        assert!(matches!(result, Err(DescriptorError::Parameter(_))));
    }
}
