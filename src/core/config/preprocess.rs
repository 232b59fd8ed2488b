//! Image preprocessing configuration.

use crate::core::errors::ClassifyError;
use crate::processors::{ChannelOrder, PixelRange, ResizeFilter};
use serde::{Deserialize, Serialize};

/// Controls how a decoded image is packed into the model input tensor.
///
/// Channel order and pixel range are normally taken from the model metadata
/// (`Image.BitmapPixelFormat`, `Image.NominalPixelRange`); the fields here
/// override it when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Input size `(height, width)` used for dynamic spatial dimensions.
    pub default_input_size: (u32, u32),
    /// Resampling filter.
    pub resize_filter: ResizeFilter,
    /// Channel order override.
    pub channel_order: Option<ChannelOrder>,
    /// Pixel range override.
    pub pixel_range: Option<PixelRange>,
    /// Per-channel mean subtracted after range scaling, in RGB order.
    pub mean: Option<[f32; 3]>,
    /// Per-channel standard deviation divided after mean subtraction, in RGB order.
    pub std: Option<[f32; 3]>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            default_input_size: (224, 224),
            resize_filter: ResizeFilter::default(),
            channel_order: None,
            pixel_range: None,
            mean: None,
            std: None,
        }
    }
}

impl PreprocessConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback input size `(height, width)`.
    pub fn with_default_input_size(mut self, height: u32, width: u32) -> Self {
        self.default_input_size = (height, width);
        self
    }

    /// Sets the resampling filter.
    pub fn with_resize_filter(mut self, filter: ResizeFilter) -> Self {
        self.resize_filter = filter;
        self
    }

    /// Forces a channel order regardless of model metadata.
    pub fn with_channel_order(mut self, order: ChannelOrder) -> Self {
        self.channel_order = Some(order);
        self
    }

    /// Forces a pixel range regardless of model metadata.
    pub fn with_pixel_range(mut self, range: PixelRange) -> Self {
        self.pixel_range = Some(range);
        self
    }

    /// Sets mean/std normalization (RGB order).
    pub fn with_mean_std(mut self, mean: [f32; 3], std: [f32; 3]) -> Self {
        self.mean = Some(mean);
        self.std = Some(std);
        self
    }

    /// Validates sizes and normalization parameters.
    pub fn validate(&self) -> Result<(), ClassifyError> {
        let (height, width) = self.default_input_size;
        if height == 0 || width == 0 {
            return Err(ClassifyError::config_error_with_context(
                "preprocess.default_input_size",
                &format!("{height}x{width}"),
                "dimensions must be greater than 0",
            ));
        }
        if let Some(std) = self.std {
            for (i, &s) in std.iter().enumerate() {
                if !(s.is_finite() && s > 0.0) {
                    return Err(ClassifyError::config_error(format!(
                        "Standard deviation at index {i} must be greater than 0, got {s}"
                    )));
                }
            }
        }
        if self.mean.is_some_and(|mean| mean.iter().any(|m| !m.is_finite())) {
            return Err(ClassifyError::config_error("Mean values must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PreprocessConfig::default();
        assert_eq!(config.default_input_size, (224, 224));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_size_and_bad_std() {
        assert!(
            PreprocessConfig::new()
                .with_default_input_size(0, 224)
                .validate()
                .is_err()
        );
        assert!(
            PreprocessConfig::new()
                .with_mean_std([0.5; 3], [0.2, 0.0, 0.2])
                .validate()
                .is_err()
        );
    }
}
