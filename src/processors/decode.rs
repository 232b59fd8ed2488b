//! Image decoding.

use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::utils::blocking;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A decoded image with its embedded color and orientation metadata.
///
/// Neither the orientation nor the ICC profile has been applied to the
/// pixels yet; [`super::normalize`] does that under the run's color policy.
#[derive(Debug, Clone)]
pub struct RawBitmap {
    image: DynamicImage,
    orientation: Orientation,
    icc_profile: Option<Vec<u8>>,
    path: PathBuf,
}

impl RawBitmap {
    /// Wraps already-decoded pixels.
    pub fn new(image: DynamicImage, path: impl Into<PathBuf>) -> Self {
        Self {
            image,
            orientation: Orientation::NoTransforms,
            icc_profile: None,
            path: path.into(),
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_icc_profile(mut self, profile: Vec<u8>) -> Self {
        self.icc_profile = Some(profile);
        self
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn icc_profile(&self) -> Option<&[u8]> {
        self.icc_profile.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    pub(crate) fn into_parts(self) -> (DynamicImage, Orientation, Option<Vec<u8>>) {
        (self.image, self.orientation, self.icc_profile)
    }
}

/// Reads and decodes an image file.
///
/// The container format is sniffed from the file content. Fails with
/// `ImageDecode` when the file cannot be read or the codec rejects it.
pub fn decode(path: impl AsRef<Path>) -> ClassifyResult<RawBitmap> {
    let path = path.as_ref();
    let bytes = blocking::read_file_blocking(path)
        .map_err(|e| ClassifyError::image_decode(path, "failed to read image file", e))?;

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ClassifyError::image_decode(path, "failed to sniff image format", e))?;
    let format = reader.format();
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| ClassifyError::image_decode(path, "unsupported image format", e))?;

    let orientation = decoder
        .orientation()
        .map_err(|e| ClassifyError::image_decode(path, "failed to read orientation", e))?;
    let icc_profile = decoder
        .icc_profile()
        .map_err(|e| ClassifyError::image_decode(path, "failed to read ICC profile", e))?;
    let image = DynamicImage::from_decoder(decoder)
        .map_err(|e| ClassifyError::image_decode(path, "failed to decode image", e))?;

    debug!(
        "Decoded '{}' ({:?}, {}x{}, {:?}, orientation {:?}, icc: {})",
        path.display(),
        format,
        image.width(),
        image.height(),
        image.color(),
        orientation,
        icc_profile.as_ref().map_or(0, Vec::len)
    );

    Ok(RawBitmap {
        image,
        orientation,
        icc_profile,
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_decode_sniffs_format_from_content() {
        let dir = TempDir::new().unwrap();
        // Deliberately misleading extension.
        let path = dir.path().join("kitten.jpg");
        RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let raw = decode(&path).unwrap();
        assert_eq!(raw.dimensions(), (3, 2));
        assert_eq!(raw.orientation(), Orientation::NoTransforms);
        assert!(raw.icc_profile().is_none());
        assert_eq!(raw.path(), path.as_path());
    }

    #[test]
    fn test_missing_file_is_image_decode_error() {
        let err = decode("/nonexistent/kitten.png").unwrap_err();
        assert!(matches!(err, ClassifyError::ImageDecode { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_corrupt_file_is_image_decode_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG\r\n\x1a\nnot really a png").unwrap();
        let err = decode(file.path()).unwrap_err();
        assert!(matches!(err, ClassifyError::ImageDecode { .. }));
    }
}
