//! Output format selection and raster encoding.

use std::fmt;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use jpeg_encoder::{ColorType, Encoder, SamplingFactor};

use crate::HillChartError;

/// JPEG output is progressive with 4:2:0 chroma subsampling at this quality.
pub const JPEG_QUALITY: u8 = 85;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    #[default]
    Jpeg,
    Svg,
}

impl ImageFormat {
    /// Case-insensitive match against `png`, `jpg`, `jpeg` and `svg`.
    /// Anything else, including an empty token, selects JPEG.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "png" => ImageFormat::Png,
            "svg" => ImageFormat::Svg,
            _ => ImageFormat::Jpeg,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Svg => "svg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encodes a packed RGB8 buffer as PNG or JPEG.
pub fn encode_rgb(
    format: ImageFormat,
    rgb: &[u8],
    width: u32,
    height: u32,
) -> Result<Vec<u8>, HillChartError> {
    let mut out = Vec::new();
    match format {
        ImageFormat::Png => PngEncoder::new(&mut out)
            .write_image(rgb, width, height, ExtendedColorType::Rgb8)
            .map_err(|e| HillChartError::Encode(format!("PNG encode: {}", e)))?,
        ImageFormat::Jpeg => encode_jpeg(&mut out, rgb, width, height)?,
        ImageFormat::Svg => {
            return Err(HillChartError::Encode(
                "SVG output is not a raster encoding".to_string(),
            ))
        }
    }
    Ok(out)
}

fn encode_jpeg(
    out: &mut Vec<u8>,
    rgb: &[u8],
    width: u32,
    height: u32,
) -> Result<(), HillChartError> {
    // JPEG frame headers hold 16-bit dimensions
    let (w, h) = match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(HillChartError::Encode(format!(
                "JPEG encode: {}x{} exceeds the 65535px limit",
                width, height
            )))
        }
    };
    let mut encoder = Encoder::new(out, JPEG_QUALITY);
    encoder.set_progressive(true);
    encoder.set_sampling_factor(SamplingFactor::R_4_2_0);
    encoder
        .encode(rgb, w, h, ColorType::Rgb)
        .map_err(|e| HillChartError::Encode(format!("JPEG encode: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_normalization() {
        assert_eq!(ImageFormat::from_token("png"), ImageFormat::Png);
        assert_eq!(ImageFormat::from_token("PNG"), ImageFormat::Png);
        assert_eq!(ImageFormat::from_token("Svg"), ImageFormat::Svg);
        assert_eq!(ImageFormat::from_token("jpg"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_token("JPEG"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_token("bogus-format"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_token(""), ImageFormat::Jpeg);
    }

    #[test]
    fn test_mime_and_extension() {
        assert_eq!(ImageFormat::Png.mime_type(), "image/png");
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(ImageFormat::Svg.mime_type(), "image/svg+xml");
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::default(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_encode_signatures() {
        let rgb = vec![200u8; 4 * 2 * 3];
        let png = encode_rgb(ImageFormat::Png, &rgb, 4, 2).unwrap();
        assert_eq!(&png[..4], &[0x89, 0x50, 0x4E, 0x47]);
        let jpg = encode_rgb(ImageFormat::Jpeg, &rgb, 4, 2).unwrap();
        assert_eq!(&jpg[..2], &[0xFF, 0xD8]);
        assert!(encode_rgb(ImageFormat::Svg, &rgb, 4, 2).is_err());
    }

    #[test]
    fn test_jpeg_is_progressive_with_subsampled_chroma() {
        let (w, h) = (32u32, 16u32);
        let rgb: Vec<u8> = (0..w * h * 3).map(|i| (i % 251) as u8).collect();
        let jpg = encode_rgb(ImageFormat::Jpeg, &rgb, w, h).unwrap();

        let sof = jpg
            .windows(2)
            .position(|m| m == [0xFF, 0xC2])
            .expect("progressive frame header");
        assert!(!jpg.windows(2).any(|m| m == [0xFF, 0xC0]));
        // SOF: length(2) precision(1) height(2) width(2) components(1),
        // then id/sampling/table per component
        let header = &jpg[sof + 2..];
        assert_eq!(u16::from_be_bytes([header[3], header[4]]), h as u16);
        assert_eq!(u16::from_be_bytes([header[5], header[6]]), w as u16);
        assert_eq!(header[7], 3);
        assert_eq!(header[9], 0x22, "luma is sampled 2x2");
        assert_eq!(header[12], 0x11);
        assert_eq!(header[15], 0x11);

        let decoded = image::load_from_memory(&jpg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (w, h));
    }

    #[test]
    fn test_jpeg_rejects_oversized_dimensions() {
        let err = encode_rgb(ImageFormat::Jpeg, &[], 70_000, 1).unwrap_err();
        assert!(matches!(err, HillChartError::Encode(_)));
    }
}
