use image::{
    codecs::jpeg::JpegEncoder, imageops::FilterType, ColorType, DynamicImage, ExtendedColorType,
    GenericImageView, ImageFormat, ImageReader,
};
use std::io::Cursor;

use crate::error::TransformError;
use crate::params::{OutputFormat, TransformParams};

/// Encoded result of a transform.
#[derive(Debug, Clone)]
pub struct TransformedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

/// Decode, optionally resize, and re-encode an uploaded image.
pub fn transform(data: &[u8], params: &TransformParams) -> Result<TransformedImage, TransformError> {
    let (img, source_format) = decode(data)?;
    let (source_width, source_height) = img.dimensions();

    tracing::debug!(
        "Decoded image: format={:?}, {}x{}, {} bytes",
        source_format,
        source_width,
        source_height,
        data.len()
    );

    let img = if params.wants_resize() {
        fit_inside(img, params.width, params.height)
    } else {
        img
    };

    // Sources we can't write back out (GIF, BMP, TIFF, ...) fall back to PNG
    let format = params
        .format
        .or_else(|| source_format.and_then(OutputFormat::from_image_format))
        .unwrap_or(OutputFormat::Png);

    let encoded = encode(&img, format, params.effective_quality())?;
    let (width, height) = img.dimensions();

    tracing::debug!(
        "Encoded image: format={}, {}x{} -> {}x{}, {} bytes",
        format,
        source_width,
        source_height,
        width,
        height,
        encoded.len()
    );

    Ok(TransformedImage {
        data: encoded,
        format,
        width,
        height,
    })
}

/// Decode bytes, sniffing the container format from the content.
pub(crate) fn decode(data: &[u8]) -> Result<(DynamicImage, Option<ImageFormat>), TransformError> {
    if data.is_empty() {
        return Err(TransformError::EmptyInput);
    }

    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    let format = reader.format();
    let img = reader.decode().map_err(TransformError::Decode)?;

    Ok((img, format))
}

/// Scale down to fit inside the box, keeping aspect ratio. Never enlarges.
/// A missing side is unconstrained.
pub fn fit_inside(img: DynamicImage, max_width: Option<u32>, max_height: Option<u32>) -> DynamicImage {
    let box_width = max_width.unwrap_or(u32::MAX);
    let box_height = max_height.unwrap_or(u32::MAX);
    let (width, height) = img.dimensions();

    if width <= box_width && height <= box_height {
        return img;
    }

    img.resize(box_width, box_height, FilterType::Lanczos3)
}

pub fn encode(img: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>, TransformError> {
    match format {
        OutputFormat::Jpeg => encode_jpeg(img, quality),
        OutputFormat::Png => encode_png(img),
        OutputFormat::Webp => encode_webp(img, quality),
    }
}

pub(crate) fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut buffer = Cursor::new(Vec::new());

    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| TransformError::Encode {
            format: "JPEG",
            message: e.to_string(),
        })?;

    Ok(buffer.into_inner())
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, TransformError> {
    let mut buffer = Cursor::new(Vec::new());

    // The PNG encoder has no float formats
    let result = match img.color() {
        ColorType::Rgb32F | ColorType::Rgba32F => {
            DynamicImage::ImageRgba16(img.to_rgba16()).write_to(&mut buffer, ImageFormat::Png)
        }
        _ => img.write_to(&mut buffer, ImageFormat::Png),
    };

    result.map_err(|e| TransformError::Encode {
        format: "PNG",
        message: e.to_string(),
    })?;

    Ok(buffer.into_inner())
}

fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    let (width, height) = img.dimensions();

    let encoded = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        webp::Encoder::from_rgba(&rgba, width, height).encode_simple(false, f32::from(quality))
    } else {
        let rgb = img.to_rgb8();
        webp::Encoder::from_rgb(&rgb, width, height).encode_simple(false, f32::from(quality))
    };

    let memory = encoded.map_err(|e| TransformError::Encode {
        format: "WebP",
        message: format!("{e:?}"),
    })?;

    Ok(memory.to_vec())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    pub(crate) fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    pub(crate) fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
        encode_jpeg(&gradient(width, height), 90).unwrap()
    }

    fn sample_png_with_alpha(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([200, (x % 256) as u8, (y % 256) as u8, if x < width / 2 { 255 } else { 64 }])
        }));
        encode_png(&img).unwrap()
    }

    fn sniff(data: &[u8]) -> ImageFormat {
        image::guess_format(data).unwrap()
    }

    #[test]
    fn test_width_only_resize_keeps_aspect() {
        let out = transform(
            &sample_jpeg(400, 200),
            &TransformParams {
                width: Some(100),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(out.format, OutputFormat::Jpeg);
        assert_eq!((out.width, out.height), (100, 50));
        assert_eq!(sniff(&out.data), ImageFormat::Jpeg);

        let decoded = image::load_from_memory(&out.data).unwrap();
        assert_eq!(decoded.dimensions(), (100, 50));
    }

    #[test]
    fn test_box_resize_fits_inside() {
        let out = transform(
            &sample_jpeg(400, 200),
            &TransformParams {
                width: Some(300),
                height: Some(50),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!((out.width, out.height), (100, 50));
    }

    #[test]
    fn test_never_enlarges() {
        let out = transform(
            &sample_jpeg(80, 60),
            &TransformParams {
                width: Some(1000),
                height: Some(1000),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!((out.width, out.height), (80, 60));
    }

    #[test]
    fn test_no_params_keeps_format_and_size() {
        let png = sample_png_with_alpha(32, 16);
        let out = transform(&png, &TransformParams::default()).unwrap();

        assert_eq!(out.format, OutputFormat::Png);
        assert_eq!((out.width, out.height), (32, 16));
        assert_eq!(sniff(&out.data), ImageFormat::Png);
    }

    #[test]
    fn test_convert_to_webp_with_quality() {
        let out = transform(
            &sample_jpeg(64, 48),
            &TransformParams {
                quality: Some(50),
                format: Some(OutputFormat::Webp),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(out.format, OutputFormat::Webp);
        assert_eq!(&out.data[0..4], b"RIFF");
        assert_eq!(&out.data[8..12], b"WEBP");
    }

    #[test]
    fn test_webp_keeps_alpha_source() {
        let out = transform(
            &sample_png_with_alpha(20, 20),
            &TransformParams {
                format: Some(OutputFormat::Webp),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(sniff(&out.data), ImageFormat::WebP);
        let decoded = image::load_from_memory(&out.data).unwrap();
        assert_eq!(decoded.dimensions(), (20, 20));
    }

    #[test]
    fn test_webp_source_keeps_format() {
        let webp = encode_webp(&gradient(40, 30), 90).unwrap();
        assert_eq!(sniff(&webp), ImageFormat::WebP);

        let out = transform(&webp, &TransformParams::default()).unwrap();

        assert_eq!(out.format, OutputFormat::Webp);
        assert_eq!((out.width, out.height), (40, 30));
        assert_eq!(sniff(&out.data), ImageFormat::WebP);
    }

    #[test]
    fn test_alpha_to_jpeg_drops_alpha() {
        let out = transform(
            &sample_png_with_alpha(24, 24),
            &TransformParams {
                format: Some(OutputFormat::Jpeg),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(sniff(&out.data), ImageFormat::Jpeg);
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let source = sample_jpeg(256, 256);
        let high = transform(
            &source,
            &TransformParams {
                quality: Some(95),
                ..Default::default()
            },
        )
        .unwrap();
        let low = transform(
            &source,
            &TransformParams {
                quality: Some(10),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(low.data.len() < high.data.len());
    }

    #[test]
    fn test_unwritable_source_falls_back_to_png() {
        let mut bmp = Cursor::new(Vec::new());
        gradient(10, 10).write_to(&mut bmp, ImageFormat::Bmp).unwrap();

        let out = transform(bmp.get_ref(), &TransformParams::default()).unwrap();
        assert_eq!(out.format, OutputFormat::Png);
        assert_eq!(sniff(&out.data), ImageFormat::Png);
    }

    #[test]
    fn test_empty_input() {
        let err = transform(&[], &TransformParams::default()).unwrap_err();
        assert!(matches!(err, TransformError::EmptyInput));
    }

    #[test]
    fn test_garbage_input() {
        let err = transform(b"definitely not an image", &TransformParams::default()).unwrap_err();
        assert!(matches!(err, TransformError::Decode(_)));
        assert!(err.is_client_error());
    }
}
