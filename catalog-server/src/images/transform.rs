//! Pixel work: decode, resize, watermark, encode

use super::ImageError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

/// Thumbnail height in pixels
const THUMB_HEIGHT: u32 = 8;

const THUMB_QUALITY: u8 = 75;

const PAD_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// How a source is brought to a target size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    /// Fit inside, center on a white canvas
    Pad,
    /// Cover the target, cropping the overflow around the center
    Fill,
}

/// Decode using the extension hint, falling back to content sniffing
pub fn decode(bytes: &[u8], hint: Option<&str>) -> Result<DynamicImage, ImageError> {
    let hinted = hint
        .and_then(ImageFormat::from_extension)
        .and_then(|format| image::load_from_memory_with_format(bytes, format).ok());
    match hinted {
        Some(img) => Ok(img),
        None => image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string())),
    }
}

pub fn resize(img: &DynamicImage, size: ImageSize, geometry: Geometry) -> RgbaImage {
    let (width, height) = (size.width.max(1), size.height.max(1));
    match geometry {
        Geometry::Fill => img
            .resize_to_fill(width, height, FilterType::Lanczos3)
            .to_rgba8(),
        Geometry::Pad => {
            let fitted = img.resize(width, height, FilterType::Lanczos3).to_rgba8();
            let mut canvas = RgbaImage::from_pixel(width, height, PAD_COLOR);
            let x = (width - fitted.width()) / 2;
            let y = (height - fitted.height()) / 2;
            imageops::overlay(&mut canvas, &fitted, i64::from(x), i64::from(y));
            canvas
        }
    }
}

/// Scale the asset to `size` and multiply its alpha by `opacity` percent
pub fn prepare_watermark(asset: &DynamicImage, size: ImageSize, opacity: u8) -> RgbaImage {
    let mut mark = asset
        .resize_exact(size.width.max(1), size.height.max(1), FilterType::Lanczos3)
        .to_rgba8();
    let opacity = u32::from(opacity.min(100));
    for pixel in mark.pixels_mut() {
        pixel[3] = (u32::from(pixel[3]) * opacity / 100) as u8;
    }
    mark
}

/// Composite `mark` at the bottom-right corner, `margin` pixels in
pub fn apply_watermark(canvas: &mut RgbaImage, mark: &RgbaImage, margin: u32) {
    let x = i64::from(canvas.width()) - i64::from(mark.width()) - i64::from(margin);
    let y = i64::from(canvas.height()) - i64::from(mark.height()) - i64::from(margin);
    imageops::overlay(canvas, mark, x, y);
}

/// Base64 (unpadded) JPEG, `THUMB_HEIGHT` pixels tall
pub fn thumbnail(img: &DynamicImage) -> Result<String, ImageError> {
    let (w, h) = (img.width().max(1), img.height().max(1));
    let width = ((u64::from(w) * u64::from(THUMB_HEIGHT) + u64::from(h) / 2) / u64::from(h)).max(1) as u32;
    let small = img.resize_exact(width, THUMB_HEIGHT, FilterType::Triangle).to_rgb8();

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, THUMB_QUALITY);
    small
        .write_with_encoder(encoder)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(STANDARD_NO_PAD.encode(&buffer))
}

pub fn encode_webp(img: &RgbaImage) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Vec::new();
    let encoder = WebPEncoder::new_lossless(&mut buffer);
    img.write_with_encoder(encoder)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
        out
    }

    #[test]
    fn test_decode_with_wrong_hint_falls_back() {
        let bytes = png_bytes(&solid(4, 4, [0, 0, 255, 255]));
        assert_eq!(decode(&bytes, Some("jpg")).unwrap().width(), 4);
        assert_eq!(decode(&bytes, None).unwrap().height(), 4);
        assert!(matches!(decode(b"not an image", Some("png")), Err(ImageError::Decode(_))));
    }

    #[test]
    fn test_pad_centers_on_white() {
        let img = solid(200, 100, [255, 0, 0, 255]);
        let out = resize(&img, ImageSize::new(100, 100), Geometry::Pad);
        assert_eq!(out.dimensions(), (100, 100));
        assert_eq!(*out.get_pixel(50, 5), PAD_COLOR);
        assert!(out.get_pixel(50, 50)[0] > 245);
        assert!(out.get_pixel(50, 50)[1] < 10);
    }

    #[test]
    fn test_fill_covers_target() {
        let img = solid(300, 100, [0, 255, 0, 255]);
        let out = resize(&img, ImageSize::new(128, 72), Geometry::Fill);
        assert_eq!(out.dimensions(), (128, 72));
        assert!(out.get_pixel(0, 0)[1] > 245);
    }

    #[test]
    fn test_watermark_lands_bottom_right() {
        let mut canvas = RgbaImage::from_pixel(100, 80, Rgba([255, 255, 255, 255]));
        let mark = prepare_watermark(&solid(10, 10, [0, 0, 0, 255]), ImageSize::new(10, 10), 100);
        apply_watermark(&mut canvas, &mark, 5);
        assert!(canvas.get_pixel(90, 70)[0] < 10);
        assert_eq!(canvas.get_pixel(10, 10)[0], 255);
        assert_eq!(canvas.get_pixel(96, 76)[0], 255);
    }

    #[test]
    fn test_watermark_opacity_scales_alpha() {
        let mark = prepare_watermark(&solid(4, 4, [0, 0, 0, 200]), ImageSize::new(2, 2), 50);
        assert_eq!(mark.dimensions(), (2, 2));
        assert!((98..=100).contains(&mark.get_pixel(0, 0)[3]));
    }

    #[test]
    fn test_thumbnail_is_unpadded_base64_jpeg() {
        let thumb = thumbnail(&solid(64, 32, [10, 20, 30, 255])).unwrap();
        assert!(!thumb.ends_with('='));
        let bytes = STANDARD_NO_PAD.decode(&thumb).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn test_webp_is_lossless() {
        let img = solid(6, 6, [1, 2, 3, 255]).to_rgba8();
        let bytes = encode_webp(&img).unwrap();
        let back = image::load_from_memory_with_format(&bytes, ImageFormat::WebP)
            .unwrap()
            .to_rgba8();
        assert_eq!(back.get_pixel(3, 3), img.get_pixel(3, 3));
    }
}
