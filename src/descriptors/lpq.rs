//! Local phase quantization.
//!
//! A short-term Fourier transform over a `window × window` neighborhood is
//! evaluated at four low frequencies with separable "valid" convolutions.
//! The real and imaginary parts of the four responses form an 8-component
//! vector per pixel; the sign of each component is one bit of an 8-bit code.
//!
//! With decorrelation enabled, the components are first whitened under a
//! ρ = 0.9 pixel-correlation model so the bits are closer to statistically
//! independent.

use super::backend::{DescriptorError, gray_to_array};
use super::params::{LpqMode, LpqParams};
use image::GrayImage;
use ndarray::{Array1, Array2, ArrayD};
use std::f64::consts::PI;
use std::ops::{Add, Mul};

/// Correlation coefficient between adjacent pixels in the whitening model.
const RHO: f64 = 0.90;

/// Code histogram size (8 sign bits).
pub const LPQ_BINS: usize = 256;

const COMPONENTS: usize = 8;

type Matrix8 = [[f64; COMPONENTS]; COMPONENTS];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Complex {
    re: f64,
    im: f64,
}

impl Complex {
    const ZERO: Complex = Complex { re: 0.0, im: 0.0 };
    const ONE: Complex = Complex { re: 1.0, im: 0.0 };

    fn from_phase(phase: f64) -> Self {
        Complex {
            re: phase.cos(),
            im: phase.sin(),
        }
    }

    fn conj(self) -> Self {
        Complex {
            re: self.re,
            im: -self.im,
        }
    }

    fn scale(self, k: f64) -> Self {
        Complex {
            re: self.re * k,
            im: self.im * k,
        }
    }
}

impl Add for Complex {
    type Output = Complex;
    fn add(self, o: Complex) -> Complex {
        Complex {
            re: self.re + o.re,
            im: self.im + o.im,
        }
    }
}

impl Mul for Complex {
    type Output = Complex;
    fn mul(self, o: Complex) -> Complex {
        Complex {
            re: self.re * o.re - self.im * o.im,
            im: self.re * o.im + self.im * o.re,
        }
    }
}

/// The three 1D STFT kernels: DC, frequency `+a`, frequency `-a`.
fn stft_kernels(window: usize) -> [Vec<Complex>; 3] {
    let r = (window - 1) as f64 / 2.0;
    let a = 1.0 / window as f64;
    let w0 = vec![Complex::ONE; window];
    let w1: Vec<Complex> = (0..window)
        .map(|k| Complex::from_phase(-2.0 * PI * (k as f64 - r) * a))
        .collect();
    let w2 = w1.iter().map(|c| c.conj()).collect();
    [w0, w1, w2]
}

/// Valid convolution along rows (vertical kernel).
fn convolve_columns(image: &Array2<f64>, kernel: &[Complex]) -> Array2<Complex> {
    let (rows, cols) = image.dim();
    let k = kernel.len();
    Array2::from_shape_fn((rows + 1 - k, cols), |(i, j)| {
        kernel.iter().enumerate().fold(Complex::ZERO, |acc, (t, w)| {
            acc + w.scale(image[[i + k - 1 - t, j]])
        })
    })
}

/// Valid convolution along columns (horizontal kernel).
fn convolve_rows(input: &Array2<Complex>, kernel: &[Complex]) -> Array2<Complex> {
    let (rows, cols) = input.dim();
    let k = kernel.len();
    Array2::from_shape_fn((rows, cols + 1 - k), |(i, j)| {
        kernel
            .iter()
            .enumerate()
            .fold(Complex::ZERO, |acc, (t, w)| acc + input[[i, j + k - 1 - t]] * *w)
    })
}

/// Eigen-decomposition of a symmetric 8×8 matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues and the eigenvector matrix (eigenvectors in columns).
fn symmetric_eigen(mut a: Matrix8) -> ([f64; COMPONENTS], Matrix8) {
    let mut v = [[0.0; COMPONENTS]; COMPONENTS];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for _ in 0..100 {
        let off: f64 = (0..COMPONENTS)
            .flat_map(|p| (0..COMPONENTS).filter(move |q| *q != p).map(move |q| (p, q)))
            .map(|(p, q)| a[p][q] * a[p][q])
            .sum();
        if off < 1e-24 {
            break;
        }
        for p in 0..COMPONENTS {
            for q in p + 1..COMPONENTS {
                if a[p][q].abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..COMPONENTS {
                    let (akp, akq) = (a[k][p], a[k][q]);
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..COMPONENTS {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let (vkp, vkq) = (row[p], row[q]);
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut values = [0.0; COMPONENTS];
    for (i, value) in values.iter_mut().enumerate() {
        *value = a[i][i];
    }
    (values, v)
}

/// Whitening transform for the 8 filter components.
///
/// Rows are the eigenvectors of the response covariance, ordered by
/// descending eigenvalue. Each eigenvector's largest component is positive.
fn whitening_transform(window: usize, kernels: &[Vec<Complex>; 3]) -> Matrix8 {
    let [w0, w1, w2] = kernels;
    let n = window * window;
    let position = |k: usize| ((k / window) as f64, (k % window) as f64);

    let covariance = Array2::from_shape_fn((n, n), |(a, b)| {
        let (ya, xa) = position(a);
        let (yb, xb) = position(b);
        RHO.powf(((ya - yb).powi(2) + (xa - xb).powi(2)).sqrt())
    });

    let filters = [(w0, w1), (w1, w0), (w1, w1), (w1, w2)];
    let mut m = Array2::<f64>::zeros((COMPONENTS, n));
    for (f, (vertical, horizontal)) in filters.iter().enumerate() {
        for k in 0..n {
            let q = vertical[k / window] * horizontal[k % window];
            m[[2 * f, k]] = q.re;
            m[[2 * f + 1, k]] = q.im;
        }
    }
    let d = m.dot(&covariance).dot(&m.t());

    // Slightly distinct weights keep the eigenvalues apart.
    let weights = [
        1.000007, 1.000006, 1.000005, 1.000004, 1.000003, 1.000002, 1.000001, 1.0,
    ];
    let mut scaled = [[0.0; COMPONENTS]; COMPONENTS];
    for (i, row) in scaled.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = weights[i] * d[[i, j]] * weights[j];
        }
    }

    let (values, vectors) = symmetric_eigen(scaled);
    let mut order: Vec<usize> = (0..COMPONENTS).collect();
    order.sort_by(|a, b| values[*b].total_cmp(&values[*a]));

    let mut transform = [[0.0; COMPONENTS]; COMPONENTS];
    for (row, &col) in transform.iter_mut().zip(&order) {
        for (k, cell) in row.iter_mut().enumerate() {
            *cell = vectors[k][col];
        }
        let dominant = row
            .iter()
            .cloned()
            .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
        if dominant < 0.0 {
            row.iter_mut().for_each(|x| *x = -*x);
        }
    }
    transform
}

fn apply(transform: &Matrix8, components: &[f64; COMPONENTS]) -> [f64; COMPONENTS] {
    let mut out = [0.0; COMPONENTS];
    for (o, row) in out.iter_mut().zip(transform) {
        *o = row.iter().zip(components).map(|(t, c)| t * c).sum();
    }
    out
}

/// Per-pixel LPQ codes (0..=255) over the valid region of the image.
pub fn lpq_codes(image: &Array2<f64>, params: &LpqParams) -> Result<Array2<f64>, DescriptorError> {
    params.validate()?;
    let window = params.window as usize;
    let (rows, cols) = image.dim();
    if rows < window || cols < window {
        return Err(DescriptorError::Parameter(format!(
            "lpq window {window} does not fit a {cols}x{rows} image"
        )));
    }

    let kernels = stft_kernels(window);
    let [w0, w1, w2] = &kernels;
    let dc_columns = convolve_columns(image, w0);
    let freq_columns = convolve_columns(image, w1);
    let responses = [
        convolve_rows(&dc_columns, w1),
        convolve_rows(&freq_columns, w0),
        convolve_rows(&freq_columns, w1),
        convolve_rows(&freq_columns, w2),
    ];
    let transform = params
        .decorrelate
        .then(|| whitening_transform(window, &kernels));

    Ok(Array2::from_shape_fn(responses[0].dim(), |(i, j)| {
        let mut components = [0.0; COMPONENTS];
        for (f, response) in responses.iter().enumerate() {
            let z = response[[i, j]];
            components[2 * f] = z.re;
            components[2 * f + 1] = z.im;
        }
        if let Some(t) = &transform {
            components = apply(t, &components);
        }
        components
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0.0)
            .map(|(k, _)| 1u32 << k)
            .sum::<u32>() as f64
    }))
}

/// LPQ descriptor of a grayscale image in the requested output mode.
///
/// Histogram modes always yield 256 values. [`LpqMode::Image`] yields the
/// code image, whose shape depends on the image size.
pub fn lpq_descriptor(image: &GrayImage, params: &LpqParams) -> Result<ArrayD<f64>, DescriptorError> {
    let codes = lpq_codes(&gray_to_array(image), params)?;
    if params.mode == LpqMode::Image {
        return Ok(codes.into_dyn());
    }

    let mut hist = Array1::<f64>::zeros(LPQ_BINS);
    for code in codes.iter() {
        hist[*code as usize] += 1.0;
    }
    if params.mode == LpqMode::NormalizedHistogram {
        let total = hist.sum();
        if total > 0.0 {
            hist /= total;
        }
    }
    Ok(hist.into_dyn())
}
