//! Rendering the stylized tensor and encoding exports.

use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageBuffer, Rgb, RgbImage};

use crate::error::{Error, Result};
use crate::tensor::StylizedTensor;

/// Container format for exported avatars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg,
}

impl ExportFormat {
    #[must_use]
    pub const fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Fixed download name for the export surface.
    #[must_use]
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::Png => "stylized-avatar.png",
            Self::Jpeg => "stylized-avatar.jpg",
        }
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            other => Err(format!("unknown format {other:?}, expected png or jpeg")),
        }
    }
}

/// A pixel buffer sized from the tensor it was rendered from.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    pixels: RgbImage,
}

impl RasterSurface {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Encode the surface into the requested container.
    ///
    /// `jpeg_quality` (1-100) applies to JPEG only.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder rejects the pixel data.
    pub fn encode(&self, format: ExportFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        match format {
            ExportFormat::Png => {
                let encoder = PngEncoder::new(std::io::Cursor::new(&mut bytes));
                self.pixels
                    .write_with_encoder(encoder)
                    .map_err(|source| Error::Encode {
                        format: format.label(),
                        source,
                    })?;
            }
            ExportFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut bytes, jpeg_quality);
                self.pixels
                    .write_with_encoder(encoder)
                    .map_err(|source| Error::Encode {
                        format: format.label(),
                        source,
                    })?;
            }
        }
        Ok(bytes)
    }
}

/// An encoded export with its fixed download name.
#[derive(Debug, Clone)]
pub struct ExportedImage {
    format: ExportFormat,
    bytes: Vec<u8>,
}

impl ExportedImage {
    pub(crate) fn new(format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    #[must_use]
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// `stylized-avatar.png` or `stylized-avatar.jpg`.
    #[must_use]
    pub fn file_name(&self) -> &'static str {
        self.format.file_name()
    }

    /// Wrap the payload as an embeddable `data:` URI.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{encoded}", self.format.mime())
    }
}

/// Convert a stylized tensor into a displayable raster.
///
/// The surface dimensions come from the tensor's own shape, the batch axis
/// is dropped, and values are scaled from `[0, 1]` back to 8-bit with
/// clamping.
#[allow(clippy::cast_possible_truncation)]
pub fn render(tensor: &StylizedTensor) -> RasterSurface {
    let (height, width) = (tensor.height(), tensor.width());
    let view = tensor.view();

    let mut pixels: RgbImage = ImageBuffer::new(width as u32, height as u32);
    for y in 0..height {
        for x in 0..width {
            let r = denormalize(view[[0, y, x, 0]]);
            let g = denormalize(view[[0, y, x, 1]]);
            let b = denormalize(view[[0, y, x, 2]]);
            // Safe: x and y are bounded by the tensor shape read above
            pixels.put_pixel(x as u32, y as u32, Rgb([r, g, b]));
        }
    }

    RasterSurface { pixels }
}

/// Scale a value from [0, 1] to [0, 255] with clamping.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn denormalize(value: f32) -> u8 {
    // Safe: clamped to [0, 255] range before casting
    (value * 255.0).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::TensorTracker;
    use ndarray::Array4;

    fn stylized(height: usize, width: usize) -> StylizedTensor {
        let tracker = TensorTracker::new();
        StylizedTensor::new(
            Array4::from_shape_fn((1, height, width, 3), |(_, y, x, c)| {
                (y + x + c) as f32 / (height + width + 3) as f32
            }),
            &tracker,
        )
    }

    #[test]
    fn test_denormalize() {
        assert_eq!(denormalize(0.0), 0);
        assert_eq!(denormalize(0.5), 127);
        assert_eq!(denormalize(1.0), 255);
    }

    #[test]
    fn test_denormalize_clamp() {
        assert_eq!(denormalize(-1.0), 0);
        assert_eq!(denormalize(2.0), 255);
    }

    #[test]
    fn surface_is_sized_from_the_tensor() {
        let surface = render(&stylized(8, 4));
        assert_eq!(surface.width(), 4);
        assert_eq!(surface.height(), 8);
    }

    #[test]
    fn png_and_jpeg_carry_their_signatures() {
        let surface = render(&stylized(16, 16));

        let png = surface.encode(ExportFormat::Png, 95).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let jpeg = surface.encode(ExportFormat::Jpeg, 95).unwrap();
        assert_eq!(&jpeg[..2], [0xFF, 0xD8]);
    }

    #[test]
    fn encoded_dimensions_match_the_surface() {
        let surface = render(&stylized(12, 20));

        for format in [ExportFormat::Png, ExportFormat::Jpeg] {
            let bytes = surface.encode(format, 95).unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!(decoded.width(), 20);
            assert_eq!(decoded.height(), 12);
        }
    }

    #[test]
    fn export_names_follow_the_format() {
        assert_eq!(ExportFormat::Png.file_name(), "stylized-avatar.png");
        assert_eq!(ExportFormat::Jpeg.file_name(), "stylized-avatar.jpg");
    }

    #[test]
    fn data_uri_carries_the_mime_type() {
        let surface = render(&stylized(4, 4));
        let export = ExportedImage::new(
            ExportFormat::Png,
            surface.encode(ExportFormat::Png, 95).unwrap(),
        );
        assert!(export.to_data_uri().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn format_parses_from_common_spellings() {
        assert_eq!("png".parse::<ExportFormat>().unwrap(), ExportFormat::Png);
        assert_eq!("JPEG".parse::<ExportFormat>().unwrap(), ExportFormat::Jpeg);
        assert_eq!("jpg".parse::<ExportFormat>().unwrap(), ExportFormat::Jpeg);
        assert!("webp".parse::<ExportFormat>().is_err());
    }
}
