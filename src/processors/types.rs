//! Types used by the image preprocessing stages.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Order of the color planes in the packed input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelOrder {
    /// Blue, green, red planes (`Bgr8`).
    #[default]
    Bgr,
    /// Red, green, blue planes (`Rgb8`).
    Rgb,
}

impl ChannelOrder {
    /// Parses the value of the `Image.BitmapPixelFormat` model metadata key.
    ///
    /// Returns `None` for formats that are not three-channel color.
    pub fn from_pixel_format(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bgr8" | "bgra8" => Some(ChannelOrder::Bgr),
            "rgb8" | "rgba8" => Some(ChannelOrder::Rgb),
            _ => None,
        }
    }

    /// Source indices into an RGBA pixel, in tensor plane order.
    pub fn plane_indices(self) -> [usize; 3] {
        match self {
            ChannelOrder::Bgr => [2, 1, 0],
            ChannelOrder::Rgb => [0, 1, 2],
        }
    }
}

/// Numeric range the model expects its input pixels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelRange {
    /// Raw 8-bit values, `[0, 255]`.
    #[default]
    NominalRange0To255,
    /// Scaled to `[0, 1]`.
    Normalized0To1,
    /// Scaled to `[-1, 1]`.
    NormalizedMinus1To1,
}

impl PixelRange {
    /// Parses the value of the `Image.NominalPixelRange` model metadata key.
    pub fn from_metadata_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nominalrange_0_255" => Some(PixelRange::NominalRange0To255),
            "normalized_0_1" => Some(PixelRange::Normalized0To1),
            "normalized_1_1" => Some(PixelRange::NormalizedMinus1To1),
            _ => None,
        }
    }

    /// `(scale, offset)` mapping an 8-bit value `v` to `v * scale + offset`.
    pub fn scale_offset(self) -> (f32, f32) {
        match self {
            PixelRange::NominalRange0To255 => (1.0, 0.0),
            PixelRange::Normalized0To1 => (1.0 / 255.0, 0.0),
            PixelRange::NormalizedMinus1To1 => (2.0 / 255.0, -1.0),
        }
    }
}

/// Resampling filter used when fitting the image to the model input size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResizeFilter {
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_order_from_pixel_format() {
        assert_eq!(ChannelOrder::from_pixel_format("Bgr8"), Some(ChannelOrder::Bgr));
        assert_eq!(ChannelOrder::from_pixel_format("RGB8"), Some(ChannelOrder::Rgb));
        assert_eq!(ChannelOrder::from_pixel_format("Gray8"), None);
    }

    #[test]
    fn test_pixel_range_scale_offset() {
        assert_eq!(
            PixelRange::from_metadata_value("Normalized_1_1"),
            Some(PixelRange::NormalizedMinus1To1)
        );
        let (scale, offset) = PixelRange::NormalizedMinus1To1.scale_offset();
        assert!((255.0 * scale + offset - 1.0).abs() < 1e-6);
        assert!((0.0 * scale + offset + 1.0).abs() < 1e-6);
        assert_eq!(PixelRange::from_metadata_value("unknown"), None);
    }
}
