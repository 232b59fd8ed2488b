//! Image preprocessing and output postprocessing.
//!
//! # Modules
//!
//! * `decode` - Reading and decoding image files
//! * `color` - Color-management policy derived from model metadata
//! * `normalization` - Packing decoded images into model input tensors
//! * `ranking` - Top-N ranking of classifier output
//! * `types` - Channel order, pixel range and resize filter types

pub mod color;
pub mod decode;
pub mod normalization;
pub mod ranking;
pub mod types;

pub use color::{
    ColorManagementPolicy, ColorPolicyDecision, ColorPolicyReason, apply_color_management,
    color_management_mode,
};
pub use decode::{RawBitmap, decode};
pub use normalization::{NormalizeImage, TensorLayout, normalize};
pub use ranking::{RankedResult, rank};
pub use types::*;
