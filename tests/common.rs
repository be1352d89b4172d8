#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use upload_squeeze::{
    CompressionError, Dimensions, ImageCodec, ImageFile, OutputFormat, Result, Surface,
};

/// Pseudo-random RGB noise; PNG cannot shrink it, so a 480x360 image
/// encodes well above the 300 KiB skip threshold.
pub fn noise_png(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    let image = RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        };
        Rgb([next(), next(), next()])
    });
    encode(DynamicImage::ImageRgb8(image), ImageFormat::Png)
}

/// Flat image; encodes to a few hundred bytes.
pub fn flat_png(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([20, 90, 160]))),
        ImageFormat::Png,
    )
}

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
    buffer
}

pub fn large_photo(name: &str, seed: u32) -> ImageFile {
    ImageFile::new(name, "image/png", noise_png(480, 360, seed))
}

pub fn corrupt_photo(name: &str, size: usize) -> ImageFile {
    ImageFile::new(name, "image/jpeg", vec![0xAB; size])
}

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}

pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

/// Fake content understood by [`FakeCodec`]: a tag, the pixel size, then
/// padding up to `size` bytes.
pub fn fake_image(name: &str, width: u32, height: u32, size: usize) -> ImageFile {
    let mut data = Vec::with_capacity(size.max(12));
    data.extend_from_slice(b"FAKE");
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&height.to_le_bytes());
    data.resize(size.max(12), 0);
    ImageFile::new(name, "image/jpeg", data)
}

/// Codec without pixels, for exercising the policy around the pipeline.
///
/// Encoded output is one byte per eight pixels.
#[derive(Debug, Clone, Default)]
pub struct FakeCodec {
    pub unavailable: bool,
    pub fail_encode: bool,
}

#[derive(Debug)]
pub struct FakeSurface {
    dimensions: Dimensions,
    fail_encode: bool,
}

impl ImageCodec for FakeCodec {
    type Surface = FakeSurface;

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(CompressionError::CodecUnavailable("no drawing surface".to_string()));
        }
        Ok(())
    }

    fn decode(&self, data: &[u8]) -> Result<FakeSurface> {
        Ok(FakeSurface {
            dimensions: self.probe(data)?,
            fail_encode: self.fail_encode,
        })
    }

    fn probe(&self, data: &[u8]) -> Result<Dimensions> {
        if data.len() < 12 || &data[..4] != b"FAKE" {
            return Err(CompressionError::DecodeFailed("missing FAKE header".to_string()));
        }
        let width = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        let height = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
        Ok(Dimensions::new(width, height))
    }
}

impl Surface for FakeSurface {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn draw(self, target: Dimensions) -> Result<Self> {
        Ok(FakeSurface {
            dimensions: target,
            fail_encode: self.fail_encode,
        })
    }

    fn encode(&self, _format: OutputFormat, _quality: f32) -> Result<Vec<u8>> {
        if self.fail_encode {
            return Err(CompressionError::CompressionFailed("encoder refused".to_string()));
        }
        Ok(vec![0u8; (self.dimensions.pixel_count() / 8).max(1) as usize])
    }
}
