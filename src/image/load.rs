//! Image decoding and preprocessing.

use std::path::PathBuf;

use image::{imageops::FilterType, DynamicImage};
use ndarray::Array4;

use crate::error::{Error, Result};
use crate::tensor::{ImageTensor, TensorTracker};

use super::RGB_CHANNELS;

/// Where an input image comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Raw encoded image bytes, e.g. from an upload.
    Bytes(Vec<u8>),
    /// A local file.
    Path(PathBuf),
    /// A remote image, fetched over HTTP(S).
    Url(String),
}

/// Decode a source into a normalized `[1, size, size, 3]` tensor.
///
/// The raster is:
/// 1. Decoded from bytes, a file, or a URL
/// 2. Stretched to `target_size` on both axes, without preserving aspect
///    ratio (non-square inputs distort; this matches the reference renderer
///    and is required for output parity)
/// 3. Converted to RGB, dropping any alpha channel
/// 4. Normalized to `[0, 1]` by dividing each channel by 255
/// 5. Given a leading batch axis of size 1
///
/// # Errors
///
/// Returns `Error::Decode` if the source is not a readable image, and
/// `Error::Fetch` if a URL source cannot be retrieved.
pub fn preprocess(
    source: &ImageSource,
    target_size: u32,
    tracker: &TensorTracker,
) -> Result<ImageTensor> {
    let img = decode(source)?;
    Ok(ImageTensor::new(
        to_normalized_array(&img, target_size),
        tracker,
    ))
}

fn decode(source: &ImageSource) -> Result<DynamicImage> {
    match source {
        ImageSource::Bytes(bytes) => {
            image::load_from_memory(bytes).map_err(|source| Error::Decode { source })
        }
        ImageSource::Path(path) => {
            image::open(path).map_err(|source| Error::Decode { source })
        }
        ImageSource::Url(url) => {
            let bytes = fetch_bytes(url)?;
            image::load_from_memory(&bytes).map_err(|source| Error::Decode { source })
        }
    }
}

/// Fetch a remote image. Non-success statuses are failures; a host that
/// refuses cross-origin access surfaces here rather than being dropped.
fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    let response = reqwest::blocking::get(url)
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|source| Error::Fetch {
            url: url.to_string(),
            source,
        })?;

    let bytes = response.bytes().map_err(|source| Error::Fetch {
        url: url.to_string(),
        source,
    })?;

    Ok(bytes.to_vec())
}

/// Convert a decoded image to a normalized NHWC tensor.
#[allow(clippy::cast_possible_truncation)]
fn to_normalized_array(img: &DynamicImage, target_size: u32) -> Array4<f32> {
    let resized = img.resize_exact(target_size, target_size, FilterType::Lanczos3);
    let rgb = resized.to_rgb8();

    let size = target_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, size, size, RGB_CHANNELS));

    for y in 0..size {
        for x in 0..size {
            // Safe: x and y are bounded by target_size which fits in u32
            let pixel = rgb.get_pixel(x as u32, y as u32);
            tensor[[0, y, x, 0]] = f32::from(pixel[0]) / 255.0;
            tensor[[0, y, x, 1]] = f32::from(pixel[1]) / 255.0;
            tensor[[0, y, x, 2]] = f32::from(pixel[2]) / 255.0;
        }
    }

    tensor
}
