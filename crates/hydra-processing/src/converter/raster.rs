//! Raster operations on in-memory images. All functions are CPU bound and are
//! called from blocking tasks.

use hydra_core::{GifMeta, ImageMeta};
use image::codecs::gif::GifDecoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, GenericImageView, ImageDecoder, ImageReader};
use std::io::Cursor;

use super::ConvertError;

const JPEG_QUALITY: u8 = 85;

/// Encoded JPEG and its dimensions
pub(crate) struct Encoded {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub(crate) fn decode(data: &[u8]) -> Result<DynamicImage, ConvertError> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    Ok(reader.decode()?)
}

pub(crate) fn encode_jpeg(img: &DynamicImage) -> Result<Encoded, ConvertError> {
    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut bytes = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY))?;
    Ok(Encoded {
        width: rgb.width(),
        height: rgb.height(),
        bytes,
    })
}

/// Shrink to fit within the bounds, keeping aspect ratio. Never enlarges.
pub(crate) fn fit(
    img: DynamicImage,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> DynamicImage {
    let (width, height) = img.dimensions();
    let bound_w = max_width.unwrap_or(width).max(1);
    let bound_h = max_height.unwrap_or(height).max(1);
    if width <= bound_w && height <= bound_h {
        return img;
    }
    img.resize(bound_w, bound_h, FilterType::Triangle)
}

/// Center crop to the target box, scaled down first. Never enlarges.
pub(crate) fn crop_fill(img: &DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let target_w = max_width.min(width).max(1);
    let target_h = max_height.min(height).max(1);
    img.resize_to_fill(target_w, target_h, FilterType::Triangle)
}

pub(crate) fn to_jpeg(
    data: &[u8],
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> Result<Encoded, ConvertError> {
    let img = fit(decode(data)?, max_width, max_height);
    encode_jpeg(&img)
}

pub(crate) fn thumbnail(
    data: &[u8],
    max_width: u32,
    max_height: u32,
) -> Result<Encoded, ConvertError> {
    let img = decode(data)?;
    encode_jpeg(&crop_fill(&img, max_width, max_height))
}

pub(crate) fn resized(
    data: &[u8],
    max_width: u32,
    max_height: Option<u32>,
) -> Result<Encoded, ConvertError> {
    let img = fit(decode(data)?, Some(max_width), max_height);
    encode_jpeg(&img)
}

/// Dimensions and format without decoding pixel data
pub(crate) fn image_meta(data: &[u8]) -> Result<ImageMeta, ConvertError> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    let format = reader
        .format()
        .and_then(|f| f.extensions_str().first().copied())
        .map(String::from);
    let (width, height) = reader.into_dimensions()?;
    Ok(ImageMeta {
        width,
        height,
        format,
    })
}

/// Dimensions, frame count and total display time of an animated GIF
pub(crate) fn gif_meta(data: &[u8]) -> Result<GifMeta, ConvertError> {
    let decoder = GifDecoder::new(Cursor::new(data))?;
    let (width, height) = decoder.dimensions();

    let mut frame_count: u32 = 0;
    let mut duration_ms: f64 = 0.0;
    for frame in decoder.into_frames() {
        let frame = frame?;
        let (numer, denom) = frame.delay().numer_denom_ms();
        if denom > 0 {
            duration_ms += f64::from(numer) / f64::from(denom);
        }
        frame_count += 1;
    }

    Ok(GifMeta {
        width,
        height,
        frame_count,
        duration_ms: duration_ms.round() as u64,
    })
}
