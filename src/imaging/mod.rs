// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Image materialization.
//!
//! Turns decoded image messages into [`DynamicImage`] buffers ready for
//! encoding to disk:
//!
//! - raw `Image` payloads are reinterpreted per their [`PixelEncoding`]
//! - compressed payloads are decoded keeping the codec's channel layout
//! - `compressedDepth` payloads are decoded, min-max normalized and
//!   rendered through a jet colormap

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, RgbImage};

use crate::core::{ExtractError, Result};
use crate::encoding::{ChannelLayout, CompressedImageMsg, DecodedMessage, ImageMsg};

/// Bytes of configuration header in front of a `compressedDepth` payload.
pub const DEPTH_HEADER_LEN: usize = 12;

/// Produce a pixel buffer from any decoded image message.
pub fn materialize(message: &DecodedMessage) -> Result<DynamicImage> {
    match message {
        DecodedMessage::Image(msg) => raw_to_image(msg),
        DecodedMessage::CompressedImage(msg) if msg.is_compressed_depth() => {
            decode_compressed_depth(&msg.data)
        }
        DecodedMessage::CompressedImage(msg) => decode_compressed(msg),
    }
}

/// Reinterpret raw pixel bytes.
///
/// Row padding (`step` larger than `width * channels`) is dropped.
pub fn raw_to_image(msg: &ImageMsg) -> Result<DynamicImage> {
    let layout = msg.encoding.layout();
    let channels = layout.channels();
    let (width, height) = (msg.width as usize, msg.height as usize);
    let row_len = width * channels;
    let step = msg.step as usize;

    if width == 0 || height == 0 {
        return Err(ExtractError::decode(
            "Image",
            format!("empty image {}x{}", msg.width, msg.height),
        ));
    }
    if step < row_len {
        return Err(ExtractError::decode(
            "Image",
            format!("step {step} shorter than row of {row_len} bytes"),
        ));
    }
    let needed = step * (height - 1) + row_len;
    if msg.data.len() < needed {
        return Err(ExtractError::decode(
            "Image",
            format!(
                "{} bytes of pixel data, {needed} needed for {}x{} {}",
                msg.data.len(),
                msg.width,
                msg.height,
                msg.encoding
            ),
        ));
    }

    let mut pixels = Vec::with_capacity(row_len * height);
    for row in msg.data.chunks(step).take(height) {
        pixels.extend_from_slice(&row[..row_len]);
    }
    if msg.encoding.swaps_red_blue() {
        for px in pixels.chunks_exact_mut(channels) {
            px.swap(0, 2);
        }
    }

    let image = match layout {
        ChannelLayout::Rgb => ImageBuffer::from_raw(msg.width, msg.height, pixels)
            .map(DynamicImage::ImageRgb8),
        ChannelLayout::Rgba => ImageBuffer::from_raw(msg.width, msg.height, pixels)
            .map(DynamicImage::ImageRgba8),
        ChannelLayout::L => ImageBuffer::from_raw(msg.width, msg.height, pixels)
            .map(DynamicImage::ImageLuma8),
    };
    image.ok_or_else(|| ExtractError::decode("Image", "pixel buffer does not match dimensions"))
}

/// Decode a generically compressed payload (JPEG, PNG, ...).
pub fn decode_compressed(msg: &CompressedImageMsg) -> Result<DynamicImage> {
    image::load_from_memory(&msg.data).map_err(|e| {
        ExtractError::decode(
            "CompressedImage",
            format!("cannot decode '{}' payload: {e}", msg.format),
        )
    })
}

/// Decode a `compressedDepth` payload into a jet-colored RGB image.
pub fn decode_compressed_depth(data: &[u8]) -> Result<DynamicImage> {
    if data.len() <= DEPTH_HEADER_LEN {
        return Err(ExtractError::decode(
            "compressedDepth",
            format!("payload of {} bytes has no image after header", data.len()),
        ));
    }
    let decoded = image::load_from_memory(&data[DEPTH_HEADER_LEN..])
        .map_err(|e| ExtractError::decode("compressedDepth", e.to_string()))?;

    let gray = match decoded {
        DynamicImage::ImageLuma8(buf) => {
            let (w, h) = buf.dimensions();
            normalize_depth(w, h, buf.pixels().map(|p| p.0[0] as u32))
        }
        DynamicImage::ImageLuma16(buf) => {
            let (w, h) = buf.dimensions();
            normalize_depth(w, h, buf.pixels().map(|p| p.0[0] as u32))
        }
        other => {
            let buf = other.to_luma16();
            let (w, h) = buf.dimensions();
            normalize_depth(w, h, buf.pixels().map(|p| p.0[0] as u32))
        }
    };

    Ok(DynamicImage::ImageRgb8(colorize_jet(&gray)))
}

/// Linearly map depth values onto 0..=255.
///
/// A constant image maps to all zeros.
pub fn normalize_depth<I>(width: u32, height: u32, values: I) -> GrayImage
where
    I: Iterator<Item = u32> + Clone,
{
    let (min, max) = values
        .clone()
        .fold((u32::MAX, 0u32), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let range = max.saturating_sub(min);

    let pixels: Vec<u8> = values
        .map(|v| {
            if range == 0 {
                0
            } else {
                ((v - min) as f64 * 255.0 / range as f64).round() as u8
            }
        })
        .collect();

    GrayImage::from_raw(width, height, pixels).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Jet colormap entry for an 8-bit intensity, as RGB.
pub fn jet(value: u8) -> [u8; 3] {
    let v = value as f64 / 255.0;
    let channel = |center: f64| {
        let c = (1.5 - (4.0 * v - center).abs()).clamp(0.0, 1.0);
        (c * 255.0).round() as u8
    };
    [channel(3.0), channel(2.0), channel(1.0)]
}

/// Apply the jet colormap to a grayscale image.
pub fn colorize_jet(gray: &GrayImage) -> RgbImage {
    let lut: Vec<[u8; 3]> = (0..=255u8).map(jet).collect();
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        image::Rgb(lut[gray.get_pixel(x, y).0[0] as usize])
    })
}

/// Scale to exactly `(width, height)` with Lanczos3 resampling.
pub fn resize(image: &DynamicImage, (width, height): (u32, u32)) -> DynamicImage {
    image.resize_exact(width, height, FilterType::Lanczos3)
}

/// Encode and write an image.
///
/// JPEG cannot hold alpha or 16-bit samples, so such buffers are reduced
/// to 8-bit RGB or L before encoding.
pub fn save_image(image: &DynamicImage, path: &Path, format: ImageFormat) -> Result<()> {
    if format == ImageFormat::Jpeg {
        let prepared = match image {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => None,
            other if other.color().channel_count() <= 2 => {
                Some(DynamicImage::ImageLuma8(other.to_luma8()))
            }
            other => Some(DynamicImage::ImageRgb8(other.to_rgb8())),
        };
        if let Some(prepared) = prepared {
            prepared.save_with_format(path, format)?;
            return Ok(());
        }
    }
    image.save_with_format(path, format)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{Header, PixelEncoding};
    use std::io::Cursor;

    fn raw(encoding: PixelEncoding, width: u32, height: u32, step: u32, data: Vec<u8>) -> ImageMsg {
        ImageMsg {
            header: Header::default(),
            height,
            width,
            encoding,
            is_bigendian: 0,
            step,
            data,
        }
    }

    #[test]
    fn test_jet_endpoints() {
        assert_eq!(jet(0), [0, 0, 128]);
        assert_eq!(jet(255), [128, 0, 0]);
        let mid = jet(128);
        assert!(mid[1] > 200, "green dominates mid range: {mid:?}");
    }

    #[test]
    fn test_normalize_constant_is_zero() {
        let gray = normalize_depth(2, 2, [500u32; 4].into_iter());
        assert!(gray.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_normalize_spans_full_range() {
        let gray = normalize_depth(3, 1, [1000u32, 1500, 2000].into_iter());
        let values: Vec<u8> = gray.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 128, 255]);
    }

    #[test]
    fn test_bgra_is_swapped() {
        let msg = raw(PixelEncoding::Bgra8, 1, 1, 4, vec![10, 20, 30, 40]);
        let img = raw_to_image(&msg).unwrap();
        assert_eq!(img.to_rgba8().get_pixel(0, 0).0, [30, 20, 10, 40]);
    }

    #[test]
    fn test_bgr8_is_kept() {
        let msg = raw(PixelEncoding::Bgr8, 1, 1, 3, vec![10, 20, 30]);
        let img = raw_to_image(&msg).unwrap();
        assert_eq!(img.to_rgb8().get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_row_padding_stripped() {
        // 2x2 mono with step 4
        let msg = raw(PixelEncoding::Mono8, 2, 2, 4, vec![1, 2, 0, 0, 3, 4, 0, 0]);
        let img = raw_to_image(&msg).unwrap();
        assert_eq!(img.to_luma8().into_raw(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let msg = raw(PixelEncoding::Rgb8, 2, 2, 6, vec![0; 10]);
        assert!(matches!(
            raw_to_image(&msg),
            Err(ExtractError::DecodeError { .. })
        ));
    }

    #[test]
    fn test_depth_roundtrip_through_png() {
        let depth = ImageBuffer::<image::Luma<u16>, _>::from_raw(2, 1, vec![100u16, 900]).unwrap();
        let mut png = Vec::new();
        DynamicImage::ImageLuma16(depth)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        let mut payload = vec![0u8; DEPTH_HEADER_LEN];
        payload.extend(png);

        let colored = decode_compressed_depth(&payload).unwrap().to_rgb8();
        assert_eq!(colored.dimensions(), (2, 1));
        assert_eq!(colored.get_pixel(0, 0).0, jet(0));
        assert_eq!(colored.get_pixel(1, 0).0, jet(255));
    }

    #[test]
    fn test_depth_garbage_is_decode_error() {
        let payload = vec![7u8; 40];
        assert!(matches!(
            decode_compressed_depth(&payload),
            Err(ExtractError::DecodeError { .. })
        ));
    }

    #[test]
    fn test_resize_exact() {
        let img = DynamicImage::new_rgb8(8, 4);
        let out = resize(&img, (3, 5));
        assert_eq!((out.width(), out.height()), (3, 5));
    }

    #[test]
    fn test_save_jpeg_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        save_image(&DynamicImage::new_rgba8(4, 4), &path, ImageFormat::Jpeg).unwrap();
        let back = image::open(&path).unwrap();
        assert_eq!(back.color().channel_count(), 3);
    }
}
