//! # Texture Features
//!
//! Batch texture feature extraction for image classification datasets.
//! A glob selects the images, each image becomes one row of texture
//! features, and its filename (minus digits) becomes its class label.
//!
//! # Architecture: One Pipeline per Descriptor
//!
//! ```text
//! BaseDeDados/*.bmp ──► enumerate ──► labels   ──► Y_Resultado.txt
//!                           │
//!                           └──► GLCM / LBP / LPQ (parallel) ──► X_Treino*.txt
//! ```
//!
//! Each descriptor kind runs as an independent pipeline. The label file is
//! rewritten by every run with identical content, so any subset of kinds
//! can be extracted on its own.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`descriptors`] | GLCM, LBP and LPQ on 8-bit grayscale images, behind the [`descriptors::Descriptor`] trait |
//! | [`labels`] | Class labels derived from filenames |
//! | [`batch`] | Glob enumeration and ordered parallel execution on a private rayon pool |
//! | [`flat`] | Delimited text files: NumPy-style legacy layout and `rows-v1` |
//! | [`pipeline`] | Enumerate, label, extract and write for one descriptor kind |
//! | [`config`] | `extract.toml` loading and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Row Order Is Glob Order
//!
//! Workers finish in any order, but feature rows are gathered by input
//! index. Row `i` of every feature file and line `i` of the label file
//! always describe the same image.
//!
//! ## Readable Feature Files
//!
//! The default layout is plain text that prints arrays the way NumPy does,
//! so existing tooling that splits on `|` keeps working. The `rows-v1`
//! layout trades that compatibility for exact round trips and one record
//! per line; readers detect it from its header.
//!
//! ## No Native Dependencies
//!
//! Decoding uses the `image` crate and all descriptor math is plain Rust
//! over `ndarray`, so the binary needs no OpenCV or BLAS.

pub mod batch;
pub mod config;
pub mod descriptors;
pub mod flat;
pub mod labels;
pub mod output;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_helpers;
