//! Color-management policy and its application to decoded pixels.

use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::inference::ModelMetadata;
use image::{DynamicImage, Rgba32FImage, RgbaImage};
use qcms::{DataType, Intent, Profile, Transform};
use tracing::debug;

/// Model metadata key declaring the color space the model was trained in.
pub const COLOR_SPACE_GAMMA_KEY: &str = "Image.ColorSpaceGamma";

/// Minimum length of a well-formed ICC profile (the fixed header).
const ICC_HEADER_LEN: usize = 128;

/// Whether decoded pixels are brought into sRGB before tensor packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorManagementPolicy {
    ManageToSrgb,
    DoNotManage,
}

impl std::fmt::Display for ColorManagementPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorManagementPolicy::ManageToSrgb => write!(f, "manage to sRGB"),
            ColorManagementPolicy::DoNotManage => write!(f, "do not manage"),
        }
    }
}

/// Why a [`ColorManagementPolicy`] was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorPolicyReason {
    /// The model carries no color space declaration.
    MetadataAbsent,
    /// The model declares sRGB.
    DeclaredSrgb,
    /// The model declares some other color space.
    DeclaredOther(String),
}

/// A color policy together with the metadata that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPolicyDecision {
    pub policy: ColorManagementPolicy,
    pub reason: ColorPolicyReason,
}

impl ColorPolicyDecision {
    /// Derives the policy from `Image.ColorSpaceGamma`.
    ///
    /// An absent or blank value and a case-insensitive `SRGB` select
    /// [`ColorManagementPolicy::ManageToSrgb`]; anything else disables
    /// management.
    pub fn from_metadata(metadata: &ModelMetadata) -> Self {
        match metadata.get(COLOR_SPACE_GAMMA_KEY).map(str::trim) {
            None | Some("") => Self {
                policy: ColorManagementPolicy::ManageToSrgb,
                reason: ColorPolicyReason::MetadataAbsent,
            },
            Some(gamma) if gamma.eq_ignore_ascii_case("srgb") => Self {
                policy: ColorManagementPolicy::ManageToSrgb,
                reason: ColorPolicyReason::DeclaredSrgb,
            },
            Some(gamma) => Self {
                policy: ColorManagementPolicy::DoNotManage,
                reason: ColorPolicyReason::DeclaredOther(gamma.to_string()),
            },
        }
    }

    /// The user-facing log line for this decision, if it warrants one.
    pub fn log_line(&self) -> Option<String> {
        match &self.reason {
            ColorPolicyReason::MetadataAbsent => Some(
                "    Model does not have color space gamma information. Will color manage to sRGB by default..."
                    .to_string(),
            ),
            ColorPolicyReason::DeclaredSrgb => None,
            ColorPolicyReason::DeclaredOther(gamma) => Some(format!(
                "    Model metadata indicates that color gamma space is : {gamma}. Will not manage color space to sRGB..."
            )),
        }
    }
}

/// Derives the color-management policy for a model.
pub fn color_management_mode(metadata: &ModelMetadata) -> ColorManagementPolicy {
    ColorPolicyDecision::from_metadata(metadata).policy
}

/// Brings decoded pixels into the color space selected by `policy`.
///
/// Under `ManageToSrgb`, 8- and 16-bit sources with an embedded RGB ICC
/// profile are transformed from that profile to sRGB (the result is 8-bit
/// RGBA); without a profile they are taken as sRGB-encoded and kept. Gray
/// profiles keep their values. Floating-point sources are linear light and
/// get the sRGB transfer function. `DoNotManage` leaves everything as is.
pub fn apply_color_management(
    image: DynamicImage,
    icc_profile: Option<&[u8]>,
    policy: ColorManagementPolicy,
) -> ClassifyResult<DynamicImage> {
    if policy == ColorManagementPolicy::DoNotManage {
        return Ok(image);
    }
    let data_space = icc_profile.map(check_icc_profile).transpose()?;

    match image {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            let mut linear: Rgba32FImage = image.into_rgba32f();
            for pixel in linear.pixels_mut() {
                for c in &mut pixel.0[..3] {
                    *c = linear_to_srgb(*c);
                }
            }
            Ok(DynamicImage::ImageRgba32F(linear))
        }
        other => match (icc_profile, data_space) {
            (Some(profile), Some(IccDataSpace::Rgb)) => {
                let mut rgba = other.into_rgba8();
                transform_to_srgb(profile, &mut rgba)?;
                Ok(DynamicImage::ImageRgba8(rgba))
            }
            _ => Ok(other),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IccDataSpace {
    Rgb,
    Gray,
}

fn check_icc_profile(profile: &[u8]) -> ClassifyResult<IccDataSpace> {
    if profile.len() < ICC_HEADER_LEN {
        return Err(ClassifyError::color_conversion_msg(format!(
            "embedded ICC profile is truncated ({} bytes, header needs {ICC_HEADER_LEN})",
            profile.len()
        )));
    }
    let data_space = &profile[16..20];
    match data_space {
        b"RGB " => Ok(IccDataSpace::Rgb),
        b"GRAY" => Ok(IccDataSpace::Gray),
        other => Err(ClassifyError::color_conversion_msg(format!(
            "cannot transform ICC data color space '{}' to sRGB",
            String::from_utf8_lossy(other).trim_end()
        ))),
    }
}

/// Converts RGBA pixels in place from `profile` to sRGB.
fn transform_to_srgb(profile: &[u8], rgba: &mut RgbaImage) -> ClassifyResult<()> {
    let source = Profile::new_from_slice(profile, false).ok_or_else(|| {
        ClassifyError::color_conversion_msg("embedded ICC profile could not be parsed")
    })?;
    let mut srgb = Profile::new_sRGB();
    srgb.precache_output_transform();
    let transform = Transform::new(&source, &srgb, DataType::RGBA8, Intent::Perceptual)
        .ok_or_else(|| {
            ClassifyError::color_conversion_msg(
                "no transform from the embedded ICC profile to sRGB",
            )
        })?;
    transform.apply(&mut **rgba);
    debug!(
        "Applied embedded ICC profile ({} bytes) to {}x{} pixels",
        profile.len(),
        rgba.width(),
        rgba.height()
    );
    Ok(())
}

/// sRGB opto-electronic transfer function, clamped to `[0, 1]`.
pub fn linear_to_srgb(value: f32) -> f32 {
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgb32FImage};

    fn metadata_with_gamma(gamma: &str) -> ModelMetadata {
        ModelMetadata::from_entries([(COLOR_SPACE_GAMMA_KEY, gamma)])
    }

    fn icc_with_space(space: &[u8; 4]) -> Vec<u8> {
        let mut profile = vec![0u8; ICC_HEADER_LEN];
        profile[16..20].copy_from_slice(space);
        profile
    }

    #[test]
    fn test_policy_defaults_to_srgb() {
        assert_eq!(
            color_management_mode(&ModelMetadata::default()),
            ColorManagementPolicy::ManageToSrgb
        );
        assert_eq!(
            color_management_mode(&metadata_with_gamma("")),
            ColorManagementPolicy::ManageToSrgb
        );
        let decision = ColorPolicyDecision::from_metadata(&ModelMetadata::default());
        assert_eq!(decision.reason, ColorPolicyReason::MetadataAbsent);
        assert!(decision.log_line().unwrap().contains("sRGB by default"));
    }

    #[test]
    fn test_policy_srgb_is_case_insensitive() {
        for gamma in ["SRGB", "srgb", "SrGb"] {
            let decision = ColorPolicyDecision::from_metadata(&metadata_with_gamma(gamma));
            assert_eq!(decision.policy, ColorManagementPolicy::ManageToSrgb, "{gamma}");
            assert_eq!(decision.reason, ColorPolicyReason::DeclaredSrgb);
            assert!(decision.log_line().is_none());
        }
    }

    #[test]
    fn test_policy_other_gamma_disables_management() {
        let decision = ColorPolicyDecision::from_metadata(&metadata_with_gamma("AdobeRGB"));
        assert_eq!(decision.policy, ColorManagementPolicy::DoNotManage);
        assert_eq!(
            decision.log_line().unwrap(),
            "    Model metadata indicates that color gamma space is : AdobeRGB. Will not manage color space to sRGB..."
        );
    }

    fn be_u32(out: &mut Vec<u8>, value: u32) {
        out.extend_from_slice(&value.to_be_bytes());
    }

    fn s15_fixed16(value: f64) -> u32 {
        ((value * 65536.0).round() as i32) as u32
    }

    /// A v2 display profile with sRGB primaries and a linear (gamma 1.0) TRC.
    pub(crate) fn linear_rgb_profile() -> Vec<u8> {
        let xyz = |x: f64, y: f64, z: f64| {
            let mut tag = b"XYZ \0\0\0\0".to_vec();
            for v in [x, y, z] {
                be_u32(&mut tag, s15_fixed16(v));
            }
            tag
        };
        // curv with one entry: gamma 1.0 as u8Fixed8, padded to 16 bytes.
        let curv = b"curv\0\0\0\0\0\0\0\x01\x01\x00\0\0".to_vec();
        let tags: Vec<(&[u8; 4], Vec<u8>)> = vec![
            (b"wtpt", xyz(0.9642, 1.0, 0.8249)),
            (b"rXYZ", xyz(0.4361, 0.2225, 0.0139)),
            (b"gXYZ", xyz(0.3851, 0.7169, 0.0971)),
            (b"bXYZ", xyz(0.1431, 0.0606, 0.7141)),
            (b"rTRC", curv.clone()),
            (b"gTRC", curv.clone()),
            (b"bTRC", curv),
        ];

        let mut table = Vec::new();
        let mut data = Vec::new();
        let mut offset = ICC_HEADER_LEN + 4 + tags.len() * 12;
        be_u32(&mut table, tags.len() as u32);
        for (sig, body) in &tags {
            table.extend_from_slice(*sig);
            be_u32(&mut table, offset as u32);
            be_u32(&mut table, body.len() as u32);
            offset += body.len();
            data.extend_from_slice(body);
        }

        let mut header = vec![0u8; ICC_HEADER_LEN];
        header[0..4].copy_from_slice(&(offset as u32).to_be_bytes());
        header[8..12].copy_from_slice(&0x0210_0000u32.to_be_bytes());
        header[12..16].copy_from_slice(b"mntr");
        header[16..20].copy_from_slice(b"RGB ");
        header[20..24].copy_from_slice(b"XYZ ");
        header[36..40].copy_from_slice(b"acsp");
        header[68..72].copy_from_slice(&s15_fixed16(0.9642).to_be_bytes());
        header[72..76].copy_from_slice(&s15_fixed16(1.0).to_be_bytes());
        header[76..80].copy_from_slice(&s15_fixed16(0.8249).to_be_bytes());

        [header, table, data].concat()
    }

    #[test]
    fn test_plain_integer_pixels_pass_through() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([12, 128, 250])));
        let managed =
            apply_color_management(image.clone(), None, ColorManagementPolicy::ManageToSrgb)
                .unwrap();
        assert_eq!(managed, image);
    }

    #[test]
    fn test_embedded_rgb_profile_is_converted_to_srgb() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([200, 40, 40])));
        let profile = linear_rgb_profile();

        let managed = apply_color_management(
            image.clone(),
            Some(&profile),
            ColorManagementPolicy::ManageToSrgb,
        )
        .unwrap()
        .to_rgba8();
        let unmanaged =
            apply_color_management(image, Some(&profile), ColorManagementPolicy::DoNotManage)
                .unwrap()
                .to_rgba8();

        let [r, g, b, a] = managed.get_pixel(0, 0).0;
        assert_eq!(unmanaged.get_pixel(0, 0).0, [200, 40, 40, 255]);
        assert_ne!(managed.get_pixel(0, 0).0, unmanaged.get_pixel(0, 0).0);
        // Linear-light values brighten when encoded with the sRGB curve.
        assert!(r > 215, "r = {r}");
        assert!(g > 80 && b > 80, "g = {g}, b = {b}");
        assert_eq!(a, 255);
    }

    #[test]
    fn test_linear_float_pixels_are_encoded() {
        let image = DynamicImage::ImageRgb32F(Rgb32FImage::from_pixel(1, 1, Rgb([0.0, 0.5, 1.0])));

        let managed =
            apply_color_management(image.clone(), None, ColorManagementPolicy::ManageToSrgb)
                .unwrap()
                .into_rgba32f();
        let px = managed.get_pixel(0, 0).0;
        assert_eq!(px[0], 0.0);
        assert!((px[1] - 0.735_356_7).abs() < 1e-4);
        assert!((px[2] - 1.0).abs() < 1e-6);

        let unmanaged = apply_color_management(image, None, ColorManagementPolicy::DoNotManage)
            .unwrap()
            .into_rgba32f();
        assert_eq!(unmanaged.get_pixel(0, 0).0[1], 0.5);
    }

    #[test]
    fn test_untransformable_icc_profiles() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(1, 1));
        // The last one has an RGB header but no tags to build a transform from.
        for profile in [
            vec![0u8; 40],
            icc_with_space(b"CMYK"),
            icc_with_space(b"Lab "),
            icc_with_space(b"RGB "),
        ] {
            let err = apply_color_management(
                image.clone(),
                Some(&profile),
                ColorManagementPolicy::ManageToSrgb,
            )
            .unwrap_err();
            assert!(matches!(err, ClassifyError::ColorConversion { .. }));
        }

        // Ignored entirely when not managing.
        assert!(
            apply_color_management(image, Some(&[0u8; 4]), ColorManagementPolicy::DoNotManage)
                .is_ok()
        );
    }
}
