//! Extraction configuration.
//!
//! Handles loading and validating `extract.toml`. Every key is optional:
//! user values are merged on top of stock defaults, and a missing file
//! means "all defaults".
//!
//! ## Configuration Options
//!
//! ```toml
//! images = "BaseDeDados/*.bmp"          # Glob selecting the input images
//! labels = "DadosExtraidos/Y_Resultado.txt"
//! extension = ".bmp"                    # Stripped from filenames for labels
//! delimiter = "|"                       # Record delimiter
//! format = "legacy"                     # or "rows-v1"
//!
//! [processing]
//! max_processes = 4                     # Max parallel workers (omit for all cores)
//! keep_going = false                    # Skip failing images instead of aborting
//! max_failures = 10                     # With keep_going: give up after this many
//!
//! [glcm]
//! enabled = true
//! output = "DadosExtraidos/X_TreinoGLCM.txt"
//! distances = [1, 3, 5]
//! angles = [0.0, 90.0, 180.0, 270.0]    # Degrees
//! levels = 256
//! symmetric = false
//!
//! [lbp]
//! enabled = true
//! output = "DadosExtraidos/X_TreinoLBP.txt"
//! points = 8
//! radius = 2.0
//! method = "nri_uniform"
//!
//! [lpq]
//! enabled = true
//! output = "DadosExtraidos/X_TreinoLPQ.txt"
//! window = 7
//! decorrelate = 1
//! mode = "nh"
//! ```
//!
//! ## Partial Configuration
//!
//! Override only what differs from the defaults:
//!
//! ```toml
//! images = "../dataset/*.png"
//! extension = ".png"
//!
//! [lpq]
//! enabled = false
//! ```
//!
//! ## Validation
//!
//! Unknown keys are rejected, and [`ExtractConfig::validate`] checks every
//! enabled descriptor's parameters before anything runs.

use crate::batch;
use crate::descriptors::{
    DescriptorError, DescriptorKind, DescriptorParams, GlcmParams, LbpMethod, LbpParams, LpqMode,
    LpqParams, degrees_to_radians,
};
use crate::flat::{self, DEFAULT_DELIMITER, FileFormat};
use crate::labels::DEFAULT_EXTENSION;
use crate::pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "extract.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Invalid [{section}] parameters: {source}")]
    Parameter {
        section: &'static str,
        #[source]
        source: DescriptorError,
    },
}

/// Extraction configuration loaded from `extract.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    /// Glob pattern selecting the input images.
    pub images: String,
    /// Label file shared by all descriptor runs.
    pub labels: PathBuf,
    /// Extension removed from filenames when deriving labels.
    pub extension: String,
    /// Record delimiter for label and feature files.
    pub delimiter: String,
    pub format: FileFormat,
    pub processing: ProcessingConfig,
    pub glcm: GlcmConfig,
    pub lbp: LbpConfig,
    pub lpq: LpqConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            images: "BaseDeDados/*.bmp".to_string(),
            labels: PathBuf::from("DadosExtraidos/Y_Resultado.txt"),
            extension: DEFAULT_EXTENSION.to_string(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            format: FileFormat::default(),
            processing: ProcessingConfig::default(),
            glcm: GlcmConfig::default(),
            lbp: LbpConfig::default(),
            lpq: LpqConfig::default(),
        }
    }
}

impl ExtractConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.trim().is_empty() {
            return Err(ConfigError::Validation("images must not be empty".into()));
        }
        flat::check_delimiter(&self.delimiter)
            .map_err(|e| ConfigError::Validation(format!("delimiter: {e}")))?;
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if self.lpq.decorrelate > 1 {
            return Err(ConfigError::Validation(format!(
                "lpq.decorrelate must be 0 or 1, got {}",
                self.lpq.decorrelate
            )));
        }
        for kind in DescriptorKind::ALL {
            if self.is_enabled(kind) {
                self.params(kind)
                    .validate()
                    .map_err(|source| ConfigError::Parameter {
                        section: kind.key(),
                        source,
                    })?;
            }
        }
        Ok(())
    }

    pub fn is_enabled(&self, kind: DescriptorKind) -> bool {
        match kind {
            DescriptorKind::Glcm => self.glcm.enabled,
            DescriptorKind::Lbp => self.lbp.enabled,
            DescriptorKind::Lpq => self.lpq.enabled,
        }
    }

    /// Feature file path for a kind.
    pub fn output(&self, kind: DescriptorKind) -> &Path {
        match kind {
            DescriptorKind::Glcm => &self.glcm.output,
            DescriptorKind::Lbp => &self.lbp.output,
            DescriptorKind::Lpq => &self.lpq.output,
        }
    }

    /// Descriptor parameters for a kind.
    pub fn params(&self, kind: DescriptorKind) -> DescriptorParams {
        match kind {
            DescriptorKind::Glcm => DescriptorParams::Glcm(self.glcm.params()),
            DescriptorKind::Lbp => DescriptorParams::Lbp(self.lbp.params()),
            DescriptorKind::Lpq => DescriptorParams::Lpq(self.lpq.params()),
        }
    }

    /// The pipeline run for one kind.
    pub fn pipeline(&self, kind: DescriptorKind) -> PipelineConfig {
        PipelineConfig {
            image_glob: self.images.clone(),
            label_path: self.labels.clone(),
            output_path: self.output(kind).to_path_buf(),
            descriptor: self.params(kind),
            delimiter: self.delimiter.clone(),
            extension: self.extension.clone(),
            format: self.format,
            keep_going: self.processing.keep_going,
            max_failures: self.processing.max_failures,
        }
    }

    /// Pipelines to run, in GLCM, LBP, LPQ order.
    ///
    /// An empty `requested` list selects every enabled kind. Otherwise the
    /// requested kinds run even when disabled in the file.
    pub fn pipelines(&self, requested: &[DescriptorKind]) -> Vec<PipelineConfig> {
        DescriptorKind::ALL
            .into_iter()
            .filter(|kind| {
                if requested.is_empty() {
                    self.is_enabled(*kind)
                } else {
                    requested.contains(kind)
                }
            })
            .map(|kind| self.pipeline(kind))
            .collect()
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel extraction workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// Skip images that fail to extract instead of aborting the run. The
    /// skipped images get neither a label nor a feature row.
    pub keep_going: bool,
    /// With `keep_going`, stop a run once more images than this have
    /// failed. When absent there is no limit.
    pub max_failures: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    batch::resolve_threads(config.max_processes)
}

/// `[glcm]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlcmConfig {
    pub enabled: bool,
    pub output: PathBuf,
    pub distances: Vec<u32>,
    /// Angles in degrees.
    pub angles: Vec<f64>,
    pub levels: u32,
    pub symmetric: bool,
}

impl Default for GlcmConfig {
    fn default() -> Self {
        let params = GlcmParams::default();
        Self {
            enabled: true,
            output: PathBuf::from("DadosExtraidos/X_TreinoGLCM.txt"),
            distances: params.distances,
            angles: vec![0.0, 90.0, 180.0, 270.0],
            levels: params.levels,
            symmetric: params.symmetric,
        }
    }
}

impl GlcmConfig {
    pub fn params(&self) -> GlcmParams {
        GlcmParams {
            distances: self.distances.clone(),
            angles: degrees_to_radians(&self.angles),
            levels: self.levels,
            symmetric: self.symmetric,
        }
    }
}

/// `[lbp]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LbpConfig {
    pub enabled: bool,
    pub output: PathBuf,
    pub points: u32,
    pub radius: f64,
    pub method: LbpMethod,
}

impl Default for LbpConfig {
    fn default() -> Self {
        let params = LbpParams::default();
        Self {
            enabled: true,
            output: PathBuf::from("DadosExtraidos/X_TreinoLBP.txt"),
            points: params.points,
            radius: params.radius,
            method: params.method,
        }
    }
}

impl LbpConfig {
    pub fn params(&self) -> LbpParams {
        LbpParams {
            points: self.points,
            radius: self.radius,
            method: self.method,
        }
    }
}

/// `[lpq]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LpqConfig {
    pub enabled: bool,
    pub output: PathBuf,
    pub window: u32,
    /// `1` whitens the filter responses, `0` leaves them as is.
    pub decorrelate: u8,
    pub mode: LpqMode,
}

impl Default for LpqConfig {
    fn default() -> Self {
        let params = LpqParams::default();
        Self {
            enabled: true,
            output: PathBuf::from("DadosExtraidos/X_TreinoLPQ.txt"),
            window: params.window,
            decorrelate: u8::from(params.decorrelate),
            mode: params.mode,
        }
    }
}

impl LpqConfig {
    pub fn params(&self) -> LpqParams {
        LpqParams {
            window: self.window,
            decorrelate: self.decorrelate == 1,
            mode: self.mode,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ExtractConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ExtractConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ExtractConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`.
///
/// A missing file yields the validated stock defaults. A file with invalid
/// TOML, unknown keys or out-of-range values is an error.
pub fn load_config(path: &Path) -> Result<ExtractConfig, ConfigError> {
    let overlay = if path.exists() {
        let content = fs::read_to_string(path)?;
        Some(toml::from_str::<toml::Value>(&content)?)
    } else {
        None
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock `extract.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Texture Features Configuration
# ==============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Glob pattern selecting the input images.
images = "BaseDeDados/*.bmp"

# Label file, shared by every descriptor run. One label per image, derived
# from the filename with directory, extension and digits removed
# (granite12.bmp -> granite).
labels = "DadosExtraidos/Y_Resultado.txt"

# Extension stripped from filenames when deriving labels.
extension = ".bmp"

# Record delimiter for label and feature files.
delimiter = "|"

# File layout: "legacy" (delimited array text) or "rows-v1"
# (header line, one comma-separated record per line).
format = "legacy"

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of parallel extraction workers.
# Omit to use all available CPU cores. Values above the core count are
# clamped down.
# max_processes = 4

# Skip images that fail to decode or extract instead of aborting. Skipped
# images are left out of both the label and the feature file, so rows stay
# aligned.
keep_going = false

# With keep_going, give up once more images than this have failed.
# Omit for no limit.
# max_failures = 10

# ---------------------------------------------------------------------------
# Gray-level co-occurrence matrix
# ---------------------------------------------------------------------------
[glcm]
enabled = true
output = "DadosExtraidos/X_TreinoGLCM.txt"

# Pixel pair distances.
distances = [1, 3, 5]

# Pixel pair angles in degrees.
angles = [0.0, 90.0, 180.0, 270.0]

# Gray levels the 8-bit input is quantized to (2-256).
levels = 256

# Count each pixel pair in both directions.
symmetric = false

# ---------------------------------------------------------------------------
# Local binary patterns
# ---------------------------------------------------------------------------
[lbp]
enabled = true
output = "DadosExtraidos/X_TreinoLBP.txt"

# Number of neighbor points on the circle.
points = 8

# Circle radius in pixels.
radius = 2.0

# Code mapping: "default", "ror", "uniform", "nri_uniform" or "var".
method = "nri_uniform"

# ---------------------------------------------------------------------------
# Local phase quantization
# ---------------------------------------------------------------------------
[lpq]
enabled = true
output = "DadosExtraidos/X_TreinoLPQ.txt"

# Side of the square STFT window (odd, at least 3).
window = 7

# 1 whitens the filter responses before quantization, 0 does not.
decorrelate = 1

# Output: "nh" normalized histogram, "h" raw histogram, "im" code image.
# "im" records have the shape of each image minus the window border, so
# every image must have the same size for the feature file to read back.
mode = "nh"
"##
}
