//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Extract
//!
//! ```text
//! GLCM ← BaseDeDados/*.bmp
//!     3 images
//!     Labels: DadosExtraidos/Y_Resultado.txt (3)
//!     002/003 granite2.bmp
//!     001/003 granite1.bmp
//!     003/003 marble1.bmp
//!     Features: DadosExtraidos/X_TreinoGLCM.txt (3 rows)
//! ```
//!
//! Image lines arrive in completion order; the index is the image's position
//! in the glob order. With `keep_going`, failed images show as
//!
//! ```text
//!     002/003 granite2.bmp skipped: <error>
//! ```
//!
//! ## Check
//!
//! ```text
//! Images: BaseDeDados/*.bmp (3 matched)
//!     001 granite1.bmp → granite
//!     002 granite2.bmp → granite
//!     003 marble1.bmp → marble
//! Descriptors
//!     GLCM → DadosExtraidos/X_TreinoGLCM.txt
//!     LBP (disabled)
//!     LPQ → DadosExtraidos/X_TreinoLPQ.txt
//! ```
//!
//! ## Inspect
//!
//! ```text
//! DadosExtraidos/X_TreinoLBP.txt: 3 records × 59 values
//! DadosExtraidos/Y_Resultado.txt: 3 labels, 2 distinct
//!     granite: 2
//!     marble: 1
//! ```
//!
//! `--json` prints the records instead. JSON has no NaN or infinity, so a
//! file holding either is reported as an error rather than printed with
//! `null`s.
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::ExtractConfig;
use crate::descriptors::DescriptorKind;
use crate::flat::FlatData;
use crate::pipeline::PipelineEvent;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// File name of a path, or the whole path when it has none.
fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Extract
// ============================================================================

/// Format a single pipeline progress event as display lines.
pub fn format_pipeline_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::Started { kind, pattern } => {
            vec![format!("{} \u{2190} {}", kind, pattern)]
        }
        PipelineEvent::Enumerated { count, .. } => {
            vec![format!("{}{}", indent(1), plural(*count, "image", "images"))]
        }
        PipelineEvent::LabelsWritten { path, count } => {
            vec![format!("{}Labels: {} ({})", indent(1), path.display(), count)]
        }
        PipelineEvent::ImageExtracted {
            index, total, path, ..
        } => {
            vec![format!(
                "{}{}/{} {}",
                indent(1),
                format_index(index + 1),
                format_index(*total),
                file_label(path)
            )]
        }
        PipelineEvent::ImageSkipped {
            index,
            total,
            path,
            error,
            ..
        } => {
            vec![format!(
                "{}{}/{} {} skipped: {}",
                indent(1),
                format_index(index + 1),
                format_index(*total),
                file_label(path),
                error
            )]
        }
        PipelineEvent::FeaturesWritten { path, rows, .. } => {
            vec![format!(
                "{}Features: {} ({})",
                indent(1),
                path.display(),
                plural(*rows, "row", "rows")
            )]
        }
    }
}

/// Format the result of a labels-only run.
pub fn format_labels_output(path: &Path, labels: &[String]) -> Vec<String> {
    let mut lines = vec![format!("Labels: {} ({})", path.display(), labels.len())];
    lines.extend(label_counts(labels));
    lines
}

pub fn print_labels_output(path: &Path, labels: &[String]) {
    for line in format_labels_output(path, labels) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the matched images and the descriptor plan of a config.
pub fn format_check_output(config: &ExtractConfig, paths: &[PathBuf], labels: &[String]) -> Vec<String> {
    let mut lines = vec![format!(
        "Images: {} ({} matched)",
        config.images,
        paths.len()
    )];
    for (i, (path, label)) in paths.iter().zip(labels).enumerate() {
        lines.push(format!(
            "{}{} {} \u{2192} {}",
            indent(1),
            format_index(i + 1),
            file_label(path),
            if label.is_empty() { "(empty)" } else { label.as_str() }
        ));
    }

    lines.push("Descriptors".to_string());
    for kind in DescriptorKind::ALL {
        if config.is_enabled(kind) {
            lines.push(format!(
                "{}{} \u{2192} {}",
                indent(1),
                kind,
                config.output(kind).display()
            ));
        } else {
            lines.push(format!("{}{} (disabled)", indent(1), kind));
        }
    }
    lines
}

pub fn print_check_output(config: &ExtractConfig, paths: &[PathBuf], labels: &[String]) {
    for line in format_check_output(config, paths, labels) {
        println!("{}", line);
    }
}

// ============================================================================
// Inspect
// ============================================================================

/// Occurrence count per distinct label, alphabetically.
fn label_counts(labels: &[String]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(label, n)| {
            let shown = if label.is_empty() { "(empty)" } else { label };
            format!("{}{}: {}", indent(1), shown, n)
        })
        .collect()
}

/// Summarize a file read back from disk.
pub fn format_inspect_output(path: &Path, data: &FlatData) -> Vec<String> {
    if data.is_empty() {
        return vec![format!("{}: no records", path.display())];
    }
    match data {
        FlatData::Numeric(array) => vec![format!(
            "{}: {} \u{00d7} {}",
            path.display(),
            plural(array.nrows(), "record", "records"),
            plural(array.ncols(), "value", "values")
        )],
        FlatData::Strings(labels) => {
            let distinct = labels
                .iter()
                .collect::<std::collections::BTreeSet<_>>()
                .len();
            let mut lines = vec![format!(
                "{}: {}, {} distinct",
                path.display(),
                plural(labels.len(), "label", "labels"),
                distinct
            )];
            lines.extend(label_counts(labels));
            lines
        }
    }
}

pub fn print_inspect_output(path: &Path, data: &FlatData) {
    for line in format_inspect_output(path, data) {
        println!("{}", line);
    }
}

/// JSON rendering of a file read back from disk: an array of rows for
/// numeric data, an array of strings for labels.
///
/// Fails on NaN or infinite values, which JSON cannot represent.
pub fn inspect_json(data: &FlatData) -> Result<String, serde_json::Error> {
    match data {
        FlatData::Numeric(array) => {
            if let Some(((row, col), value)) = array.indexed_iter().find(|(_, v)| !v.is_finite()) {
                return Err(serde::ser::Error::custom(format!(
                    "record {row} value {col} is {value}, which JSON cannot represent"
                )));
            }
            let rows: Vec<Vec<f64>> = array.rows().into_iter().map(|r| r.to_vec()).collect();
            serde_json::to_string_pretty(&rows)
        }
        FlatData::Strings(labels) => serde_json::to_string_pretty(labels),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    #[test]
    fn index_is_zero_padded() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    // =========================================================================
    // Pipeline event formatting
    // =========================================================================

    #[test]
    fn format_started() {
        let event = PipelineEvent::Started {
            kind: DescriptorKind::Glcm,
            pattern: "BaseDeDados/*.bmp".to_string(),
        };
        assert_eq!(format_pipeline_event(&event), vec!["GLCM \u{2190} BaseDeDados/*.bmp"]);
    }

    #[test]
    fn format_enumerated_pluralizes() {
        let one = PipelineEvent::Enumerated {
            kind: DescriptorKind::Lbp,
            count: 1,
        };
        let none = PipelineEvent::Enumerated {
            kind: DescriptorKind::Lbp,
            count: 0,
        };
        assert_eq!(format_pipeline_event(&one), vec!["    1 image"]);
        assert_eq!(format_pipeline_event(&none), vec!["    0 images"]);
    }

    #[test]
    fn format_image_extracted_uses_one_based_index() {
        let event = PipelineEvent::ImageExtracted {
            kind: DescriptorKind::Lpq,
            index: 0,
            total: 12,
            path: PathBuf::from("BaseDeDados/granite1.bmp"),
        };
        assert_eq!(format_pipeline_event(&event), vec!["    001/012 granite1.bmp"]);
    }

    #[test]
    fn format_files_written() {
        let labels = PipelineEvent::LabelsWritten {
            path: PathBuf::from("out/Y.txt"),
            count: 4,
        };
        let features = PipelineEvent::FeaturesWritten {
            kind: DescriptorKind::Lbp,
            path: PathBuf::from("out/X.txt"),
            rows: 4,
        };
        assert_eq!(format_pipeline_event(&labels), vec!["    Labels: out/Y.txt (4)"]);
        assert_eq!(
            format_pipeline_event(&features),
            vec!["    Features: out/X.txt (4 rows)"]
        );
    }

    // =========================================================================
    // Check
    // =========================================================================

    #[test]
    fn check_lists_images_and_plan() {
        let mut config = ExtractConfig::default();
        config.lbp.enabled = false;
        let paths = vec![PathBuf::from("BaseDeDados/a1.bmp"), PathBuf::from("BaseDeDados/7.bmp")];
        let labels = vec!["a".to_string(), String::new()];

        let lines = format_check_output(&config, &paths, &labels);

        assert_eq!(lines[0], "Images: BaseDeDados/*.bmp (2 matched)");
        assert_eq!(lines[1], "    001 a1.bmp \u{2192} a");
        assert_eq!(lines[2], "    002 7.bmp \u{2192} (empty)");
        assert_eq!(lines[3], "Descriptors");
        assert_eq!(lines[4], "    GLCM \u{2192} DadosExtraidos/X_TreinoGLCM.txt");
        assert_eq!(lines[5], "    LBP (disabled)");
    }

    // =========================================================================
    // Inspect
    // =========================================================================

    #[test]
    fn inspect_numeric_shape() {
        let data = FlatData::Numeric(Array2::zeros((3, 59)));
        assert_eq!(
            format_inspect_output(Path::new("X.txt"), &data),
            vec!["X.txt: 3 records \u{00d7} 59 values"]
        );
    }

    #[test]
    fn inspect_labels_counts_distinct() {
        let data = FlatData::Strings(vec!["b".into(), "a".into(), "b".into()]);
        let lines = format_inspect_output(Path::new("Y.txt"), &data);
        assert_eq!(lines, vec!["Y.txt: 3 labels, 2 distinct", "    a: 1", "    b: 2"]);
    }

    #[test]
    fn inspect_empty_file() {
        let data = FlatData::Numeric(Array2::zeros((0, 0)));
        assert_eq!(format_inspect_output(Path::new("X.txt"), &data), vec!["X.txt: no records"]);
        let data = FlatData::Strings(Vec::new());
        assert_eq!(format_inspect_output(Path::new("Y.txt"), &data), vec!["Y.txt: no records"]);
    }

    #[test]
    fn json_rejects_non_finite_values() {
        let data = FlatData::Numeric(array![[1.0, 2.0], [f64::NAN, 3.0]]);
        let err = inspect_json(&data).unwrap_err();
        assert!(err.to_string().contains("record 1 value 0 is NaN"), "{err}");
        assert!(inspect_json(&FlatData::Numeric(array![[f64::INFINITY]])).is_err());
    }

    #[test]
    fn format_image_skipped() {
        let event = PipelineEvent::ImageSkipped {
            kind: DescriptorKind::Lbp,
            index: 1,
            total: 3,
            path: PathBuf::from("BaseDeDados/b2.bmp"),
            error: "cannot decode".to_string(),
        };
        assert_eq!(
            format_pipeline_event(&event),
            vec!["    002/003 b2.bmp skipped: cannot decode"]
        );
    }

    #[test]
    fn labels_output_summary() {
        let labels = vec!["oak".to_string(), "oak".to_string()];
        let lines = format_labels_output(Path::new("Y.txt"), &labels);
        assert_eq!(lines, vec!["Labels: Y.txt (2)", "    oak: 2"]);
    }

    #[test]
    fn json_rows_and_strings() {
        let numeric = FlatData::Numeric(array![[1.0, 2.5]]);
        let parsed: Vec<Vec<f64>> = serde_json::from_str(&inspect_json(&numeric).unwrap()).unwrap();
        assert_eq!(parsed, vec![vec![1.0, 2.5]]);

        let strings = FlatData::Strings(vec!["a".into()]);
        let parsed: Vec<String> = serde_json::from_str(&inspect_json(&strings).unwrap()).unwrap();
        assert_eq!(parsed, vec!["a"]);
    }
}
