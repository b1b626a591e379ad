//! Flat delimited feature files.
//!
//! Feature matrices and label lists are stored as plain text so that any
//! downstream tool can load them. Two layouts exist:
//!
//! ## Legacy (default)
//!
//! Every record is the textual array form of one vector, followed by the
//! delimiter (default `|`). The last record is followed by a delimiter too,
//! and there is no trailing newline:
//!
//! ```text
//! [0.1 ,0.25,1.  ]|[0.  ,0.5 ,0.75]|
//! ```
//!
//! Arrays are written the way NumPy's `array2string(separator=",")` renders
//! them: one bracket pair per dimension, elements padded to a common width,
//! whole numbers as `1.`, exponent notation when magnitudes are extreme,
//! and lines wrapped at 75 columns. Labels are written quoted: `'granite'|`.
//!
//! Reading splits on the delimiter and drops the final chunk (the empty
//! text after the trailing delimiter). Numeric records lose whitespace and
//! brackets and are split on commas; a 2D record therefore reads back as
//! one flattened row. String reading removes every `'`.
//!
//! ## rows-v1
//!
//! A header line followed by one record per line, values comma-separated
//! in shortest round-trip form:
//!
//! ```text
//! #texture-features rows v1
//! 0.1,0.25,1.0
//! 0.0,0.5,0.75
//! ```
//!
//! Readers detect the header, so both layouts load through the same
//! [`read_numeric`] / [`read_strings`] calls.

use ndarray::{Array2, ArrayBase, ArrayViewD, Data, Dimension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::num::ParseFloatError;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Record delimiter used when none is configured.
pub const DEFAULT_DELIMITER: &str = "|";

/// First line of a rows-v1 file.
pub const ROWS_V1_HEADER: &str = "#texture-features rows v1";

const HEADER_PREFIX: &str = "#texture-features";

/// Column at which array text wraps onto a new line.
const MAX_LINE_WIDTH: usize = 75;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid number '{token}' in record {record}: {source}")]
    Parse {
        record: usize,
        token: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("Record {record} has {found} values, expected {expected}")]
    Ragged {
        record: usize,
        expected: usize,
        found: usize,
    },
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Unsupported file header: {0}")]
    Header(String),
    #[error("Delimiter must not be empty")]
    EmptyDelimiter,
    #[error("Delimiter {delimiter:?} contains {character:?}, which appears inside records")]
    ReservedDelimiter { delimiter: String, character: char },
    #[error("String record {record} ({value:?}) contains a character reserved by the file format")]
    StringRecord { record: usize, value: String },
}

/// Punctuation the legacy writer emits inside a record.
const RECORD_PUNCTUATION: &[char] = &['[', ']', ',', '.', '\'', '+', '-'];

/// Check that `delimiter` can separate legacy records unambiguously.
///
/// Numeric records contain digits, signs, exponents, `nan` and `inf`,
/// padding spaces and wrapping newlines; string records are quoted. None
/// of those may appear in the delimiter.
pub fn check_delimiter(delimiter: &str) -> Result<(), FormatError> {
    if delimiter.is_empty() {
        return Err(FormatError::EmptyDelimiter);
    }
    let reserved = delimiter
        .chars()
        .find(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || RECORD_PUNCTUATION.contains(c));
    match reserved {
        Some(character) => Err(FormatError::ReservedDelimiter {
            delimiter: delimiter.to_string(),
            character,
        }),
        None => Ok(()),
    }
}

/// On-disk layout of a feature or label file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileFormat {
    #[default]
    Legacy,
    RowsV1,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Legacy => f.write_str("legacy"),
            FileFormat::RowsV1 => f.write_str("rows-v1"),
        }
    }
}

/// How to reconstruct records when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// `f`: a 2D float array, one row per record.
    Numeric,
    /// `s`: one string per record.
    Strings,
}

impl FromStr for ReadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "f" => Ok(ReadMode::Numeric),
            "s" => Ok(ReadMode::Strings),
            other => Err(format!("unknown read mode '{other}' (expected f or s)")),
        }
    }
}

/// Contents of a file read back in either mode.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatData {
    Numeric(Array2<f64>),
    Strings(Vec<String>),
}

impl FlatData {
    /// Number of records.
    pub fn len(&self) -> usize {
        match self {
            FlatData::Numeric(a) => a.nrows(),
            FlatData::Strings(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Array text
// ============================================================================

/// NumPy's rule for switching a whole array to exponent notation.
fn use_scientific(values: &[f64]) -> bool {
    let magnitudes: Vec<f64> = values
        .iter()
        .filter(|v| v.is_finite() && **v != 0.0)
        .map(|v| v.abs())
        .collect();
    if magnitudes.is_empty() {
        return false;
    }
    let max = magnitudes.iter().cloned().fold(f64::MIN, f64::max);
    let min = magnitudes.iter().cloned().fold(f64::MAX, f64::min);
    max >= 1e8 || min < 1e-4 || max / min > 1e3
}

fn format_element(v: f64, scientific: bool) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        (if v > 0.0 { "inf" } else { "-inf" }).to_string()
    } else if scientific {
        format!("{v:e}")
    } else if v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.0}.")
    } else {
        format!("{v}")
    }
}

/// Format every element, padded to a common width.
///
/// Positional cells align on the decimal point; exponent cells are
/// left-aligned.
fn format_cells(values: &[f64]) -> Vec<String> {
    let scientific = use_scientific(values);
    let cells: Vec<String> = values
        .iter()
        .map(|v| format_element(*v, scientific))
        .collect();

    if scientific {
        let width = cells.iter().map(String::len).max().unwrap_or(0);
        return cells.into_iter().map(|c| format!("{c:<width$}")).collect();
    }

    let parts: Vec<(&str, &str)> = cells
        .iter()
        .map(|c| match c.find('.') {
            Some(pos) => c.split_at(pos),
            None => (c.as_str(), ""),
        })
        .collect();
    let int_width = parts.iter().map(|(i, _)| i.len()).max().unwrap_or(0);
    let frac_width = parts.iter().map(|(_, f)| f.len()).max().unwrap_or(0);
    parts
        .iter()
        .map(|(i, f)| format!("{i:>int_width$}{f:<frac_width$}"))
        .collect()
}

fn layout(shape: &[usize], cells: &mut impl Iterator<Item = String>, depth: usize, out: &mut String) {
    match shape {
        [] => out.push_str(&cells.next().unwrap_or_default()),
        [n] => {
            out.push('[');
            let mut column = depth + 1;
            for i in 0..*n {
                let cell = cells.next().unwrap_or_default();
                let sep = if i + 1 < *n { "," } else { "" };
                let width = cell.len() + sep.len();
                if i > 0 && column + width >= MAX_LINE_WIDTH {
                    out.push('\n');
                    out.push_str(&" ".repeat(depth + 1));
                    column = depth + 1;
                }
                out.push_str(&cell);
                out.push_str(sep);
                column += width;
            }
            out.push(']');
        }
        [n, rest @ ..] => {
            out.push('[');
            for i in 0..*n {
                if i > 0 {
                    out.push(',');
                    // Blank line between blocks of rank 3 and up.
                    out.push_str(&"\n".repeat(rest.len()));
                    out.push_str(&" ".repeat(depth + 1));
                }
                layout(rest, cells, depth + 1, out);
            }
            out.push(']');
        }
    }
}

/// Render an array of any rank the way NumPy prints it with a `,` separator.
///
/// ```
/// use ndarray::array;
/// use texture_features::flat::array_to_string;
///
/// assert_eq!(array_to_string(&array![1.0, 2.5, 3.0].into_dyn().view()), "[1. ,2.5,3. ]");
/// ```
pub fn array_to_string(array: &ArrayViewD<'_, f64>) -> String {
    let values: Vec<f64> = array.iter().copied().collect();
    let mut cells = format_cells(&values).into_iter();
    let mut out = String::new();
    layout(array.shape(), &mut cells, 0, &mut out);
    out
}

// ============================================================================
// Writing
// ============================================================================

/// Writes records in a chosen [`FileFormat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatWriter {
    pub format: FileFormat,
    pub delimiter: String,
}

impl Default for FlatWriter {
    fn default() -> Self {
        Self::new(FileFormat::Legacy, DEFAULT_DELIMITER)
    }
}

impl FlatWriter {
    pub fn new(format: FileFormat, delimiter: impl Into<String>) -> Self {
        Self {
            format,
            delimiter: delimiter.into(),
        }
    }

    fn check_writable(&self) -> Result<(), FormatError> {
        match self.format {
            FileFormat::Legacy => check_delimiter(&self.delimiter),
            FileFormat::RowsV1 => Ok(()),
        }
    }

    /// Reject strings that would not read back as the same single record.
    fn check_string_records<T: AsRef<str>>(&self, records: &[T]) -> Result<(), FormatError> {
        for (record, value) in records.iter().enumerate() {
            let value = value.as_ref();
            let clashes = match self.format {
                FileFormat::Legacy => value.contains(self.delimiter.as_str()) || value.contains('\''),
                FileFormat::RowsV1 => value.contains(['\n', '\r']),
            };
            if clashes {
                return Err(FormatError::StringRecord {
                    record,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Create or truncate `path` and write one record per array.
    ///
    /// Returns the number of records written.
    pub fn write_arrays<S, D>(&self, path: &Path, records: &[ArrayBase<S, D>]) -> Result<usize, FormatError>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        self.check_writable()?;
        let mut file = BufWriter::new(File::create(path)?);
        match self.format {
            FileFormat::Legacy => {
                for record in records {
                    file.write_all(array_to_string(&record.view().into_dyn()).as_bytes())?;
                    file.write_all(self.delimiter.as_bytes())?;
                }
            }
            FileFormat::RowsV1 => {
                writeln!(file, "{ROWS_V1_HEADER}")?;
                for record in records {
                    let row: Vec<String> = record.iter().map(|v| format!("{v:?}")).collect();
                    writeln!(file, "{}", row.join(","))?;
                }
            }
        }
        file.flush()?;
        Ok(records.len())
    }

    /// Create or truncate `path` and write one record per string.
    ///
    /// Nothing is written when a record contains the delimiter or a quote
    /// (legacy) or a line break (rows-v1).
    pub fn write_strings<T: AsRef<str>>(&self, path: &Path, records: &[T]) -> Result<usize, FormatError> {
        self.check_writable()?;
        self.check_string_records(records)?;
        let mut file = BufWriter::new(File::create(path)?);
        match self.format {
            FileFormat::Legacy => {
                for record in records {
                    write!(file, "'{}'{}", record.as_ref(), self.delimiter)?;
                }
            }
            FileFormat::RowsV1 => {
                writeln!(file, "{ROWS_V1_HEADER}")?;
                for record in records {
                    writeln!(file, "{}", record.as_ref())?;
                }
            }
        }
        file.flush()?;
        Ok(records.len())
    }
}

/// Write arrays in the legacy layout.
pub fn write_arrays<S, D>(path: &Path, records: &[ArrayBase<S, D>], delimiter: &str) -> Result<usize, FormatError>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    FlatWriter::new(FileFormat::Legacy, delimiter).write_arrays(path, records)
}

/// Write strings in the legacy layout.
pub fn write_strings<T: AsRef<str>>(path: &Path, records: &[T], delimiter: &str) -> Result<usize, FormatError> {
    FlatWriter::new(FileFormat::Legacy, delimiter).write_strings(path, records)
}

// ============================================================================
// Reading
// ============================================================================

/// Split off a rows-v1 body, or `None` for legacy content.
fn rows_v1_body(content: &str) -> Result<Option<&str>, FormatError> {
    if !content.starts_with(HEADER_PREFIX) {
        return Ok(None);
    }
    let (header, body) = content.split_once('\n').unwrap_or((content, ""));
    if header.trim_end() != ROWS_V1_HEADER {
        return Err(FormatError::Header(header.to_string()));
    }
    Ok(Some(body))
}

fn parse_token(record: usize, token: &str) -> Result<f64, FormatError> {
    token.parse::<f64>().map_err(|source| FormatError::Parse {
        record,
        token: token.to_string(),
        source,
    })
}

fn rows_to_array(rows: Vec<Vec<f64>>) -> Result<Array2<f64>, FormatError> {
    let Some(first) = rows.first() else {
        return Ok(Array2::zeros((0, 0)));
    };
    let expected = first.len();
    if let Some((record, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
        return Err(FormatError::Ragged {
            record,
            expected,
            found: row.len(),
        });
    }
    let shape = (rows.len(), expected);
    Ok(Array2::from_shape_vec(shape, rows.into_iter().flatten().collect())?)
}

/// Parse legacy or rows-v1 text into a 2D array.
pub fn parse_numeric(content: &str, delimiter: &str) -> Result<Array2<f64>, FormatError> {
    if let Some(body) = rows_v1_body(content)? {
        let rows = body
            .split_terminator('\n')
            .enumerate()
            .map(|(record, line)| {
                line.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(|t| parse_token(record, t))
                    .collect::<Result<Vec<f64>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        return rows_to_array(rows);
    }

    check_delimiter(delimiter)?;
    let mut chunks: Vec<&str> = content.split(delimiter).collect();
    chunks.pop();

    let mut rows = Vec::with_capacity(chunks.len());
    for (record, chunk) in chunks.iter().enumerate() {
        let compact: String = chunk
            .chars()
            .filter(|c| !matches!(c, '\n' | '\r' | ' '))
            .collect();
        let row = compact
            .split(',')
            .map(|t| t.trim_matches(|c| c == '[' || c == ']').trim())
            .filter(|t| !t.is_empty())
            .map(|t| parse_token(record, t))
            .collect::<Result<Vec<f64>, _>>()?;
        rows.push(row);
    }
    rows_to_array(rows)
}

/// Parse legacy or rows-v1 text into strings.
pub fn parse_strings(content: &str, delimiter: &str) -> Result<Vec<String>, FormatError> {
    if let Some(body) = rows_v1_body(content)? {
        return Ok(body.split_terminator('\n').map(str::to_string).collect());
    }
    check_delimiter(delimiter)?;
    let unquoted = content.replace('\'', "");
    let mut chunks: Vec<String> = unquoted.split(delimiter).map(str::to_string).collect();
    chunks.pop();
    Ok(chunks)
}

/// Read a feature file into a 2D array.
pub fn read_numeric(path: &Path, delimiter: &str) -> Result<Array2<f64>, FormatError> {
    parse_numeric(&std::fs::read_to_string(path)?, delimiter)
}

/// Read a label file into strings.
pub fn read_strings(path: &Path, delimiter: &str) -> Result<Vec<String>, FormatError> {
    parse_strings(&std::fs::read_to_string(path)?, delimiter)
}

/// Read a file in the given mode.
pub fn read_file(path: &Path, delimiter: &str, mode: ReadMode) -> Result<FlatData, FormatError> {
    Ok(match mode {
        ReadMode::Numeric => FlatData::Numeric(read_numeric(path, delimiter)?),
        ReadMode::Strings => FlatData::Strings(read_strings(path, delimiter)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, ArrayD, array};
    use tempfile::TempDir;

    fn text(a: ArrayD<f64>) -> String {
        array_to_string(&a.view())
    }

    // =========================================================================
    // Array text
    // =========================================================================

    #[test]
    fn whole_numbers_get_trailing_point_and_padding() {
        assert_eq!(text(array![1.0, 2.5, 3.0].into_dyn()), "[1. ,2.5,3. ]");
    }

    #[test]
    fn negative_values_align_on_the_point() {
        assert_eq!(text(array![-1.5, 2.0].into_dyn()), "[-1.5, 2. ]");
    }

    #[test]
    fn matrix_rows_on_separate_lines() {
        assert_eq!(
            text(array![[1.0, 2.0], [3.0, 4.0]].into_dyn()),
            "[[1.,2.],\n [3.,4.]]"
        );
    }

    #[test]
    fn tiny_values_switch_to_exponent() {
        let s = text(array![1e-5, 1.0].into_dyn());
        assert!(s.contains('e'), "{s}");
        assert_eq!(parse_numeric(&format!("{s}|"), "|").unwrap(), array![[1e-5, 1.0]]);
    }

    #[test]
    fn empty_and_scalar_arrays() {
        assert_eq!(text(Array1::<f64>::zeros(0).into_dyn()), "[]");
        assert_eq!(text(ndarray::arr0(4.0).into_dyn()), "4.");
    }

    #[test]
    fn long_vectors_wrap_at_line_width() {
        let values: Vec<f64> = (0..59).map(|i| i as f64 / 59.0).collect();
        let s = text(Array1::from(values).into_dyn());
        assert!(s.contains('\n'));
        assert!(s.lines().all(|line| line.len() <= MAX_LINE_WIDTH), "{s}");
    }

    // =========================================================================
    // Legacy round trips
    // =========================================================================

    #[test]
    fn two_by_two_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.txt");
        let records = vec![array![1.0, 2.0], array![3.0, 4.0]];

        assert_eq!(write_arrays(&path, &records, "|").unwrap(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1.,2.]|[3.,4.]|");
        assert_eq!(read_numeric(&path, "|").unwrap(), array![[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn arbitrary_values_round_trip_exactly() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.txt");
        let records: Vec<Array1<f64>> = (0..7)
            .map(|r| Array1::from_shape_fn(40, |i| ((r * 40 + i) as f64).sqrt() / 7.0 - 1.3))
            .collect();

        write_arrays(&path, &records, "|").unwrap();
        let back = read_numeric(&path, "|").unwrap();

        assert_eq!(back.nrows(), records.len());
        for (row, record) in back.rows().into_iter().zip(&records) {
            assert_eq!(row, record.view());
        }
    }

    #[test]
    fn matrix_records_read_back_flattened() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("glcm.txt");
        let records = vec![array![[1.0, 2.0], [3.0, 4.0]], array![[5.0, 6.0], [7.0, 8.5]]];

        write_arrays(&path, &records, "|").unwrap();
        let back = read_numeric(&path, "|").unwrap();
        assert_eq!(back, array![[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.5]]);
    }

    #[test]
    fn multi_character_delimiter() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.txt");
        write_arrays(&path, &[array![0.5], array![0.25]], "<>").unwrap();
        assert_eq!(read_numeric(&path, "<>").unwrap(), array![[0.5], [0.25]]);
    }

    #[test]
    fn zero_records_read_as_empty_array() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.txt");
        let records: Vec<Array1<f64>> = Vec::new();

        write_arrays(&path, &records, "|").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
        let back = read_numeric(&path, "|").unwrap();
        assert_eq!(back.len(), 0);
    }

    #[test]
    fn writing_truncates_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.txt");
        write_arrays(&path, &[array![1.0], array![2.0], array![3.0]], "|").unwrap();
        write_arrays(&path, &[array![9.0]], "|").unwrap();
        assert_eq!(read_numeric(&path, "|").unwrap(), array![[9.0]]);
    }

    #[test]
    fn last_chunk_is_always_discarded() {
        // Without the trailing delimiter the final record is lost.
        assert_eq!(parse_numeric("[1.,2.]|[3.,4.]", "|").unwrap(), array![[1.0, 2.0]]);
    }

    #[test]
    fn bad_token_is_parse_error() {
        let result = parse_numeric("[1.,2.]|[3.,x4]|", "|");
        match result {
            Err(FormatError::Parse { record, token, .. }) => {
                assert_eq!(record, 1);
                assert_eq!(token, "x4");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn ragged_records_are_rejected() {
        let result = parse_numeric("[1.,2.]|[3.]|", "|");
        assert!(matches!(
            result,
            Err(FormatError::Ragged {
                record: 1,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn empty_delimiter_is_rejected() {
        assert!(matches!(parse_numeric("[1.]", ""), Err(FormatError::EmptyDelimiter)));
        let tmp = TempDir::new().unwrap();
        let result = write_strings(&tmp.path().join("l.txt"), &["a"], "");
        assert!(matches!(result, Err(FormatError::EmptyDelimiter)));
    }

    #[test]
    fn delimiters_found_inside_records_are_rejected() {
        for delimiter in [",", " ", ".", "[", "-", "e", "1", "\n", "|,"] {
            assert!(
                matches!(check_delimiter(delimiter), Err(FormatError::ReservedDelimiter { .. })),
                "{delimiter:?}"
            );
        }
        for delimiter in ["|", ";", "<>", "#"] {
            assert!(check_delimiter(delimiter).is_ok(), "{delimiter:?}");
        }
    }

    #[test]
    fn reserved_delimiter_fails_before_writing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.txt");

        for delimiter in [",", " ", "."] {
            let result = write_arrays(&path, &[array![1.0, 2.5, 3.0]], delimiter);
            assert!(
                matches!(result, Err(FormatError::ReservedDelimiter { .. })),
                "{delimiter:?}"
            );
            assert!(matches!(
                parse_numeric("[1.,2.],", delimiter),
                Err(FormatError::ReservedDelimiter { .. })
            ));
        }
        assert!(!path.exists());
    }

    #[test]
    fn strings_round_trip_without_quotes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("labels.txt");
        let labels = ["granite", "", "marble"];

        write_strings(&path, &labels, "|").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "'granite'|''|'marble'|");
        assert_eq!(read_strings(&path, "|").unwrap(), vec!["granite", "", "marble"]);
    }

    #[test]
    fn string_containing_delimiter_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("labels.txt");

        let result = write_strings(&path, &["c", "a|b"], "|");

        match result {
            Err(FormatError::StringRecord { record, value }) => {
                assert_eq!(record, 1);
                assert_eq!(value, "a|b");
            }
            other => panic!("expected string record error, got {other:?}"),
        }
        assert!(!path.exists());
        assert!(matches!(
            write_strings(&path, &["it's"], "|"),
            Err(FormatError::StringRecord { record: 0, .. })
        ));
    }

    #[test]
    fn rows_v1_string_with_line_break_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let writer = FlatWriter::new(FileFormat::RowsV1, "|");

        let result = writer.write_strings(&tmp.path().join("labels.txt"), &["a\nb"]);
        assert!(matches!(result, Err(FormatError::StringRecord { record: 0, .. })));

        // The delimiter is not special in rows-v1.
        let path = tmp.path().join("ok.txt");
        writer.write_strings(&path, &["a|b"]).unwrap();
        assert_eq!(read_strings(&path, "|").unwrap(), vec!["a|b"]);
    }

    // =========================================================================
    // rows-v1
    // =========================================================================

    #[test]
    fn rows_v1_round_trips_exact_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rows.txt");
        let writer = FlatWriter::new(FileFormat::RowsV1, "|");
        let records = vec![array![0.1 + 0.2, 1e-20, -3.0], array![f64::MAX, 0.0, 2.5]];

        writer.write_arrays(&path, &records).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(ROWS_V1_HEADER));

        let back = read_numeric(&path, "|").unwrap();
        assert_eq!(back, array![[0.1 + 0.2, 1e-20, -3.0], [f64::MAX, 0.0, 2.5]]);
    }

    #[test]
    fn rows_v1_strings_and_empty_file() {
        let tmp = TempDir::new().unwrap();
        let writer = FlatWriter::new(FileFormat::RowsV1, "|");

        let labels = tmp.path().join("labels.txt");
        writer.write_strings(&labels, &["a", "", "b"]).unwrap();
        assert_eq!(read_strings(&labels, "|").unwrap(), vec!["a", "", "b"]);

        let empty = tmp.path().join("empty.txt");
        let records: Vec<Array1<f64>> = Vec::new();
        writer.write_arrays(&empty, &records).unwrap();
        assert_eq!(read_numeric(&empty, "|").unwrap().len(), 0);
    }

    #[test]
    fn unknown_header_version_is_rejected() {
        let result = parse_numeric("#texture-features rows v9\n1.0\n", "|");
        assert!(matches!(result, Err(FormatError::Header(_))));
    }

    // =========================================================================
    // Read modes
    // =========================================================================

    #[test]
    fn read_mode_flags() {
        assert_eq!("f".parse::<ReadMode>().unwrap(), ReadMode::Numeric);
        assert_eq!("s".parse::<ReadMode>().unwrap(), ReadMode::Strings);
        assert!("x".parse::<ReadMode>().is_err());
    }

    #[test]
    fn read_file_dispatches_on_mode() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("labels.txt");
        write_strings(&path, &["a", "b"], "|").unwrap();

        let data = read_file(&path, "|", ReadMode::Strings).unwrap();
        assert_eq!(data, FlatData::Strings(vec!["a".into(), "b".into()]));
        assert_eq!(data.len(), 2);
    }
}
