//! Parameter types for the texture descriptors.
//!
//! These structs describe *what* to compute, not *how*. Each one validates
//! its own domain and reports violations as [`DescriptorError::Parameter`],
//! which the batch runner propagates unchanged.
//!
//! ## Types
//!
//! - [`GlcmParams`]: pixel pair distances and angles (radians), gray levels, symmetry.
//! - [`LbpParams`]: neighbor count and radius, plus the [`LbpMethod`] code mapping.
//! - [`LpqParams`]: STFT window size, decorrelation flag, [`LpqMode`] output.
//! - [`DescriptorParams`]: one of the above, tagged with its [`DescriptorKind`].

use super::backend::{Descriptor, DescriptorError, DescriptorKind};
use super::{glcm, lbp, lpq};
use image::GrayImage;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Convert a list of angles in degrees to radians.
pub fn degrees_to_radians(degrees: &[f64]) -> Vec<f64> {
    degrees.iter().map(|d| d.to_radians()).collect()
}

/// Gray-level co-occurrence parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GlcmParams {
    /// Pixel pair distances.
    pub distances: Vec<u32>,
    /// Pixel pair angles in radians.
    pub angles: Vec<f64>,
    /// Number of gray levels the 8-bit input is quantized to (2..=256).
    pub levels: u32,
    /// Count each pair in both directions.
    pub symmetric: bool,
}

impl Default for GlcmParams {
    fn default() -> Self {
        Self {
            distances: vec![1, 3, 5],
            angles: degrees_to_radians(&[0.0, 90.0, 180.0, 270.0]),
            levels: 256,
            symmetric: false,
        }
    }
}

impl GlcmParams {
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.distances.is_empty() {
            return Err(DescriptorError::Parameter(
                "glcm distances must not be empty".into(),
            ));
        }
        if self.distances.contains(&0) {
            return Err(DescriptorError::Parameter(
                "glcm distances must be positive".into(),
            ));
        }
        if self.angles.is_empty() {
            return Err(DescriptorError::Parameter(
                "glcm angles must not be empty".into(),
            ));
        }
        if self.angles.iter().any(|a| !a.is_finite()) {
            return Err(DescriptorError::Parameter(
                "glcm angles must be finite".into(),
            ));
        }
        if !(2..=256).contains(&self.levels) {
            return Err(DescriptorError::Parameter(format!(
                "glcm levels must be 2-256, got {}",
                self.levels
            )));
        }
        Ok(())
    }
}

/// How LBP neighbor bits are mapped to a pattern code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LbpMethod {
    /// Plain binary pattern, `2^P` codes.
    Default,
    /// Rotation invariant: minimum over bit rotations.
    Ror,
    /// Rotation invariant uniform patterns, `P + 2` codes.
    Uniform,
    /// Non rotation invariant uniform patterns, `P(P-1) + 3` codes.
    NriUniform,
    /// Local variance of the sampled neighbors.
    Var,
}

impl LbpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            LbpMethod::Default => "default",
            LbpMethod::Ror => "ror",
            LbpMethod::Uniform => "uniform",
            LbpMethod::NriUniform => "nri_uniform",
            LbpMethod::Var => "var",
        }
    }
}

impl fmt::Display for LbpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LbpMethod {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(LbpMethod::Default),
            "ror" => Ok(LbpMethod::Ror),
            "uniform" => Ok(LbpMethod::Uniform),
            "nri_uniform" => Ok(LbpMethod::NriUniform),
            "var" => Ok(LbpMethod::Var),
            other => Err(DescriptorError::Parameter(format!(
                "unknown lbp method '{other}' (expected default, ror, uniform, nri_uniform or var)"
            ))),
        }
    }
}

/// Local binary pattern parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LbpParams {
    /// Number of circularly symmetric neighbor points (P).
    pub points: u32,
    /// Radius of the neighbor circle (R).
    pub radius: f64,
    pub method: LbpMethod,
}

impl Default for LbpParams {
    fn default() -> Self {
        Self {
            points: 8,
            radius: 2.0,
            method: LbpMethod::NriUniform,
        }
    }
}

/// Largest P for which a full `2^P` code histogram is allocated.
pub const MAX_FULL_CODE_POINTS: u32 = 24;

impl LbpParams {
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.points == 0 {
            return Err(DescriptorError::Parameter(
                "lbp points must be positive".into(),
            ));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(DescriptorError::Parameter(format!(
                "lbp radius must be positive, got {}",
                self.radius
            )));
        }
        if matches!(self.method, LbpMethod::Default | LbpMethod::Ror)
            && self.points > MAX_FULL_CODE_POINTS
        {
            return Err(DescriptorError::Parameter(format!(
                "lbp method '{}' supports at most {MAX_FULL_CODE_POINTS} points",
                self.method
            )));
        }
        Ok(())
    }
}

/// What the LPQ descriptor returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LpqMode {
    /// Normalized 256-bin code histogram.
    #[serde(rename = "nh")]
    NormalizedHistogram,
    /// Raw 256-bin code histogram.
    #[serde(rename = "h")]
    Histogram,
    /// The per-pixel code image, `(rows - window + 1) × (cols - window + 1)`.
    ///
    /// The shape follows the image size, so a feature file only reads back
    /// as one array when every image has the same dimensions.
    #[serde(rename = "im")]
    Image,
}

impl LpqMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LpqMode::NormalizedHistogram => "nh",
            LpqMode::Histogram => "h",
            LpqMode::Image => "im",
        }
    }
}

impl fmt::Display for LpqMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LpqMode {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nh" => Ok(LpqMode::NormalizedHistogram),
            "h" => Ok(LpqMode::Histogram),
            "im" => Ok(LpqMode::Image),
            other => Err(DescriptorError::Parameter(format!(
                "unknown lpq mode '{other}' (expected nh, h or im)"
            ))),
        }
    }
}

/// Local phase quantization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LpqParams {
    /// Side of the square STFT window; odd, at least 3.
    pub window: u32,
    /// Whiten the filter responses before quantization.
    pub decorrelate: bool,
    pub mode: LpqMode,
}

impl Default for LpqParams {
    fn default() -> Self {
        Self {
            window: 7,
            decorrelate: true,
            mode: LpqMode::NormalizedHistogram,
        }
    }
}

impl LpqParams {
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.window < 3 || self.window % 2 == 0 {
            return Err(DescriptorError::Parameter(format!(
                "lpq window must be odd and at least 3, got {}",
                self.window
            )));
        }
        Ok(())
    }
}

/// A descriptor kind together with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorParams {
    Glcm(GlcmParams),
    Lbp(LbpParams),
    Lpq(LpqParams),
}

impl DescriptorParams {
    /// Default parameters for a kind.
    pub fn defaults(kind: DescriptorKind) -> Self {
        match kind {
            DescriptorKind::Glcm => DescriptorParams::Glcm(GlcmParams::default()),
            DescriptorKind::Lbp => DescriptorParams::Lbp(LbpParams::default()),
            DescriptorKind::Lpq => DescriptorParams::Lpq(LpqParams::default()),
        }
    }

    pub fn validate(&self) -> Result<(), DescriptorError> {
        match self {
            DescriptorParams::Glcm(p) => p.validate(),
            DescriptorParams::Lbp(p) => p.validate(),
            DescriptorParams::Lpq(p) => p.validate(),
        }
    }
}

impl Descriptor for DescriptorParams {
    fn kind(&self) -> DescriptorKind {
        match self {
            DescriptorParams::Glcm(_) => DescriptorKind::Glcm,
            DescriptorParams::Lbp(_) => DescriptorKind::Lbp,
            DescriptorParams::Lpq(_) => DescriptorKind::Lpq,
        }
    }

    fn describe(&self, image: &GrayImage) -> Result<ArrayD<f64>, DescriptorError> {
        match self {
            DescriptorParams::Glcm(p) => glcm::glcm_features(image, p).map(|a| a.into_dyn()),
            DescriptorParams::Lbp(p) => lbp::lbp_histogram(image, p).map(|a| a.into_dyn()),
            DescriptorParams::Lpq(p) => lpq::lpq_descriptor(image, p),
        }
    }
}
