//! Texture descriptors computed on 8-bit grayscale images.
//!
//! | Descriptor | Output | Module |
//! |---|---|---|
//! | **GLCM** | `6 × (distances · angles)` property table | [`glcm`] |
//! | **LBP** | normalized code histogram | [`lbp`] |
//! | **LPQ** | 256-bin code histogram, or the code image | [`lpq`] |
//!
//! The module is split into:
//! - **Backend**: [`Descriptor`] trait, [`DescriptorError`], grayscale loading
//! - **Parameters**: per-descriptor parameter structs with validation
//! - **Math**: one module per descriptor, pure functions over pixel data

pub mod backend;
pub mod glcm;
pub mod lbp;
pub mod lpq;
mod params;

pub use backend::{Descriptor, DescriptorError, DescriptorKind, load_gray};
pub use params::{
    DescriptorParams, GlcmParams, LbpMethod, LbpParams, LpqMode, LpqParams, degrees_to_radians,
};
