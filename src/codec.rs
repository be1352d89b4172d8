//! Platform seam between the compression policy and pixel work.
//!
//! [`ImageCompressor`](crate::processing::ImageCompressor) only talks to
//! [`ImageCodec`] and [`Surface`]; the raster implementation here backs them
//! with the `image` crate, and PNG output is further squeezed with `oxipng`.
//! Tests swap in their own codec to exercise the fallback policy without
//! real pixels.

use crate::constants::{
    LIBDEFLATER_HIGH_LEVEL, LIBDEFLATER_LOW_LEVEL, MAX_DECODE_ALLOC_BYTES, MAX_IMAGE_DIMENSION,
    ZOPFLI_ITERATIONS,
};
use crate::dimensions::Dimensions;
use crate::error::{CompressionError, Result};
use crate::formats::OutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, Limits};
use oxipng::{Deflaters, Options};
use std::io::Cursor;
use std::num::NonZeroU8;

/// Decoded pixels that can be redrawn at another size and re-encoded.
pub trait Surface: Send + Sized {
    fn dimensions(&self) -> Dimensions;

    /// Render onto a new surface of `target` size.
    fn draw(self, target: Dimensions) -> Result<Self>;

    /// Encode to `format`; `quality` is in `0.0..=1.0`.
    fn encode(&self, format: OutputFormat, quality: f32) -> Result<Vec<u8>>;
}

/// Turns encoded bytes into a [`Surface`].
pub trait ImageCodec: Send + Sync {
    type Surface: Surface;

    /// Fails with `CodecUnavailable` when the host cannot draw at all.
    fn check_available(&self) -> Result<()> {
        Ok(())
    }

    fn decode(&self, data: &[u8]) -> Result<Self::Surface>;

    /// Read the natural size from the header without decoding pixels.
    fn probe(&self, data: &[u8]) -> Result<Dimensions>;

    /// Sniff the container format, if recognisable.
    fn detect_format(&self, _data: &[u8]) -> Option<String> {
        None
    }
}

/// `image`-crate backed codec with decoder limits.
#[derive(Debug, Clone, Default)]
pub struct RasterCodec;

impl RasterCodec {
    pub fn new() -> Self {
        Self
    }

    fn reader<'a>(&self, data: &'a [u8]) -> Result<ImageReader<Cursor<&'a [u8]>>> {
        let mut reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| CompressionError::DecodeFailed(e.to_string()))?;

        let mut limits = Limits::default();
        limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
        limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
        limits.max_alloc = Some(MAX_DECODE_ALLOC_BYTES);
        reader.limits(limits);

        Ok(reader)
    }
}

impl ImageCodec for RasterCodec {
    type Surface = RasterSurface;

    fn decode(&self, data: &[u8]) -> Result<RasterSurface> {
        let image = self
            .reader(data)?
            .decode()
            .map_err(|e| CompressionError::DecodeFailed(e.to_string()))?;
        Ok(RasterSurface { image })
    }

    fn probe(&self, data: &[u8]) -> Result<Dimensions> {
        let (width, height) = self
            .reader(data)?
            .into_dimensions()
            .map_err(|e| CompressionError::DecodeFailed(e.to_string()))?;
        Ok(Dimensions::new(width, height))
    }

    fn detect_format(&self, data: &[u8]) -> Option<String> {
        image::guess_format(data)
            .ok()
            .map(|format| format!("{:?}", format))
    }
}

/// A decoded image held in memory for one pipeline run.
#[derive(Debug)]
pub struct RasterSurface {
    image: DynamicImage,
}

impl RasterSurface {
    pub fn from_image(image: DynamicImage) -> Self {
        Self { image }
    }
}

impl Surface for RasterSurface {
    fn dimensions(&self) -> Dimensions {
        let (width, height) = self.image.dimensions();
        Dimensions::new(width, height)
    }

    fn draw(self, target: Dimensions) -> Result<Self> {
        if target == self.dimensions() {
            return Ok(self);
        }
        if target.width == 0 || target.height == 0 {
            return Err(CompressionError::CompressionFailed(format!(
                "cannot draw onto an empty {} surface",
                target
            )));
        }

        let image = self
            .image
            .resize_exact(target.width, target.height, FilterType::Lanczos3);
        Ok(Self { image })
    }

    fn encode(&self, format: OutputFormat, quality: f32) -> Result<Vec<u8>> {
        let bytes = match format {
            OutputFormat::Jpeg => encode_jpeg(&self.image, quality)?,
            OutputFormat::Png => encode_png(&self.image, quality)?,
            OutputFormat::WebP => encode_webp(&self.image)?,
        };

        if bytes.is_empty() {
            return Err(CompressionError::CompressionFailed(format!(
                "{} encoder produced no data",
                format
            )));
        }
        Ok(bytes)
    }
}

/// Map `0.0..=1.0` onto the JPEG encoder's `1..=100` scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

fn encode_jpeg(image: &DynamicImage, quality: f32) -> Result<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = image.to_rgb8();
    let mut buffer = Vec::with_capacity(rgb.as_raw().len() / 8);
    let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality(quality));
    rgb.write_with_encoder(encoder)
        .map_err(|e| CompressionError::CompressionFailed(e.to_string()))?;
    Ok(buffer)
}

fn encode_png(image: &DynamicImage, quality: f32) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut raw), ImageFormat::Png)
        .map_err(|e| CompressionError::CompressionFailed(e.to_string()))?;

    let mut options = Options::from_preset(4);
    options.deflate = png_deflater(quality);

    oxipng::optimize_from_memory(&raw, &options)
        .map_err(|e| CompressionError::CompressionFailed(format!("PNG optimization: {}", e)))
}

/// Higher quality buys more optimisation effort; PNG stays lossless.
fn png_deflater(quality: f32) -> Deflaters {
    if quality >= 0.9 {
        if let Some(iterations) = NonZeroU8::new(ZOPFLI_ITERATIONS) {
            return Deflaters::Zopfli { iterations };
        }
    }
    if quality >= 0.7 {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_HIGH_LEVEL,
        }
    } else {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_LOW_LEVEL,
        }
    }
}

fn encode_webp(image: &DynamicImage) -> Result<Vec<u8>> {
    // The bundled WebP encoder is lossless and only takes 8-bit RGB(A)
    let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
    let mut buffer = Vec::new();
    rgba.write_to(&mut Cursor::new(&mut buffer), ImageFormat::WebP)
        .map_err(|e| CompressionError::CompressionFailed(e.to_string()))?;
    Ok(buffer)
}
