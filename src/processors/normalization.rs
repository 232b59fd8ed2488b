//! Packing decoded images into model input tensors.
//!
//! The sequence is fixed: color management, EXIF orientation, conversion to
//! premultiplied 8-bit RGBA, resampling to the declared spatial size, then
//! NCHW packing with the model's channel order and numeric range.

use super::color::{ColorManagementPolicy, apply_color_management};
use super::decode::RawBitmap;
use super::types::{ChannelOrder, PixelRange};
use crate::core::config::PreprocessConfig;
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::inference::{FeatureDescriptor, ModelMetadata};
use crate::core::tensor::Tensor4D;
use image::RgbaImage;
use image::imageops;
use tracing::{debug, warn};

/// Model metadata key naming the expected pixel format.
pub const PIXEL_FORMAT_KEY: &str = "Image.BitmapPixelFormat";
/// Model metadata key naming the expected numeric pixel range.
pub const PIXEL_RANGE_KEY: &str = "Image.NominalPixelRange";

/// Resolved layout of an image input: spatial size, channel order and range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorLayout {
    pub height: u32,
    pub width: u32,
    pub channel_order: ChannelOrder,
    pub pixel_range: PixelRange,
}

impl TensorLayout {
    /// Resolves the layout of an image input.
    ///
    /// The input must be a rank-4 `[N, C, H, W]` tensor with three channels;
    /// anything else is a `Binding` error. Dynamic `H`/`W` fall back to
    /// `config.default_input_size`. Channel order and range come from the
    /// model metadata unless the config overrides them.
    pub fn resolve(
        input: &FeatureDescriptor,
        metadata: &ModelMetadata,
        config: &PreprocessConfig,
    ) -> ClassifyResult<Self> {
        let shape = input.shape().ok_or_else(|| {
            ClassifyError::binding_error(&input.name, "image input must be a tensor")
        })?;
        if shape.len() != 4 {
            return Err(ClassifyError::binding_error(
                &input.name,
                format!("image input must be [N, C, H, W], declared {shape:?}"),
            ));
        }
        if shape[1] > 0 && shape[1] != 3 {
            return Err(ClassifyError::binding_error(
                &input.name,
                format!("image input must have 3 channels, declared {shape:?}"),
            ));
        }

        let (default_height, default_width) = config.default_input_size;
        let dim = |value: i64, fallback: u32| {
            if value > 0 {
                u32::try_from(value).unwrap_or(fallback)
            } else {
                fallback
            }
        };

        let channel_order = config.channel_order.unwrap_or_else(|| {
            metadata
                .get(PIXEL_FORMAT_KEY)
                .map(|value| {
                    ChannelOrder::from_pixel_format(value).unwrap_or_else(|| {
                        warn!("Unsupported {} '{}', using Bgr8", PIXEL_FORMAT_KEY, value);
                        ChannelOrder::default()
                    })
                })
                .unwrap_or_default()
        });
        let pixel_range = config.pixel_range.unwrap_or_else(|| {
            metadata
                .get(PIXEL_RANGE_KEY)
                .map(|value| {
                    PixelRange::from_metadata_value(value).unwrap_or_else(|| {
                        warn!(
                            "Unsupported {} '{}', using NominalRange_0_255",
                            PIXEL_RANGE_KEY, value
                        );
                        PixelRange::default()
                    })
                })
                .unwrap_or_default()
        });

        Ok(Self {
            height: dim(shape[2], default_height),
            width: dim(shape[3], default_width),
            channel_order,
            pixel_range,
        })
    }
}

/// Per-plane affine packing of premultiplied RGBA pixels.
///
/// Each output value is `v * alpha[p] + beta[p]`, where `alpha` folds the
/// range scale and the standard deviation and `beta` folds the range offset
/// and the mean.
#[derive(Debug)]
pub struct NormalizeImage {
    pub alpha: [f32; 3],
    pub beta: [f32; 3],
    pub order: ChannelOrder,
}

impl NormalizeImage {
    /// Builds the packing coefficients. `mean` and `std` are in RGB order.
    pub fn new(
        range: PixelRange,
        mean: Option<[f32; 3]>,
        std: Option<[f32; 3]>,
        order: ChannelOrder,
    ) -> ClassifyResult<Self> {
        let (scale, offset) = range.scale_offset();
        let mean = mean.unwrap_or([0.0; 3]);
        let std = std.unwrap_or([1.0; 3]);
        for (i, &s) in std.iter().enumerate() {
            if !(s.is_finite() && s > 0.0) {
                return Err(ClassifyError::config_error(format!(
                    "Standard deviation at index {i} must be greater than 0, got {s}"
                )));
            }
        }

        let mut alpha = [0.0; 3];
        let mut beta = [0.0; 3];
        for (plane, &src) in order.plane_indices().iter().enumerate() {
            alpha[plane] = scale / std[src];
            beta[plane] = (offset - mean[src]) / std[src];
        }
        Ok(Self { alpha, beta, order })
    }

    /// Packs an image into a `[1, 3, H, W]` tensor.
    pub fn apply(&self, img: &RgbaImage) -> Tensor4D {
        let (width, height) = img.dimensions();
        let planes = self.order.plane_indices();
        let mut tensor = Tensor4D::zeros((1, 3, height as usize, width as usize));
        for (x, y, pixel) in img.enumerate_pixels() {
            for (plane, &src) in planes.iter().enumerate() {
                tensor[[0, plane, y as usize, x as usize]] =
                    pixel[src] as f32 * self.alpha[plane] + self.beta[plane];
            }
        }
        tensor
    }
}

/// Converts a decoded bitmap into the model's input tensor.
pub fn normalize(
    raw: RawBitmap,
    policy: ColorManagementPolicy,
    layout: &TensorLayout,
    config: &PreprocessConfig,
) -> ClassifyResult<Tensor4D> {
    let (source_width, source_height) = raw.dimensions();
    let (image, orientation, icc_profile) = raw.into_parts();

    let mut image = apply_color_management(image, icc_profile.as_deref(), policy)?;
    image.apply_orientation(orientation);

    let mut rgba = image.to_rgba8();
    premultiply_alpha(&mut rgba);

    let resized = if rgba.dimensions() == (layout.width, layout.height) {
        rgba
    } else {
        imageops::resize(
            &rgba,
            layout.width,
            layout.height,
            config.resize_filter.into(),
        )
    };

    let packer = NormalizeImage::new(
        layout.pixel_range,
        config.mean,
        config.std,
        layout.channel_order,
    )?;
    let tensor = packer.apply(&resized);
    debug!(
        "Normalized {}x{} image to {:?} ({:?}, {:?}, {})",
        source_width,
        source_height,
        tensor.shape(),
        layout.channel_order,
        layout.pixel_range,
        policy
    );
    Ok(tensor)
}

/// Multiplies color channels by alpha, rounding to nearest.
pub fn premultiply_alpha(img: &mut RgbaImage) {
    for pixel in img.pixels_mut() {
        let alpha = pixel[3] as u16;
        if alpha == 255 {
            continue;
        }
        for c in &mut pixel.0[..3] {
            *c = ((*c as u16 * alpha + 127) / 255) as u8;
        }
    }
}
