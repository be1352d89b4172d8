use crate::codec::ImageCodec;
use crate::dimensions::Dimensions;
use crate::error::Result;
use crate::processing::{is_supported_image, CompressionOptions, ImageCompressor};
use crate::source::ImageFile;
use crate::utils::format_file_size;

/// What `compress` would do with a file, without doing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub dimensions: Dimensions,
    /// Container format sniffed from the content
    pub detected_format: Option<String>,
    pub supported: bool,
    /// At or below the skip threshold
    pub would_skip: bool,
    /// Size `compress` would draw at; `None` when skipped
    pub target: Option<Dimensions>,
}

impl ImageInfo {
    pub fn would_resize(&self) -> bool {
        self.target.is_some_and(|target| target != self.dimensions)
    }
}

impl<C: ImageCodec> ImageCompressor<C> {
    /// Read the header of `file` and report how it would be compressed.
    pub fn inspect(&self, file: &ImageFile, options: &CompressionOptions) -> Result<ImageInfo> {
        let dimensions = self.image_dimensions(file)?;
        let would_skip = file.size() <= options.skip_threshold_bytes;

        Ok(ImageInfo {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size_bytes: file.size(),
            dimensions,
            detected_format: self.codec().detect_format(&file.data),
            supported: is_supported_image(file),
            would_skip,
            target: (!would_skip).then(|| options.target_dimensions(dimensions)),
        })
    }
}

pub fn print_image_info(info: &ImageInfo, options: &CompressionOptions) {
    println!("📋 Basic Information:");
    println!("  📁 File: {}", info.name);
    println!("  🏷️  Declared type: {}", info.mime_type);
    println!(
        "  🎭 Detected format: {}",
        info.detected_format.as_deref().unwrap_or("unknown")
    );
    println!("  📏 Dimensions: {} pixels", info.dimensions);
    println!(
        "  📦 File size: {} bytes ({})",
        info.size_bytes,
        format_file_size(info.size_bytes)
    );
    println!("  📐 Aspect ratio: {:.2}:1", info.dimensions.aspect_ratio());

    println!("\n💡 Upload Compression:");
    if !info.supported {
        println!("  ⚠️  {} is not on the upload allow-list", info.mime_type);
    }

    match info.target {
        None => println!(
            "  ✅ At or below {}, uploaded as is",
            format_file_size(options.skip_threshold_bytes)
        ),
        Some(target) if info.would_resize() => println!(
            "  🎯 Would resize {} → {} and re-encode as {} (quality {:.2})",
            info.dimensions, target, options.output_format, options.quality
        ),
        Some(_) => println!(
            "  🎯 Within bounds; would re-encode as {} (quality {:.2})",
            options.output_format, options.quality
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_file(width: u32, height: u32) -> ImageFile {
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        ImageFile::new("slip.png", "image/png", buffer)
    }

    #[test]
    fn test_inspect_small_file() {
        let compressor = ImageCompressor::new();
        let info = compressor
            .inspect(&png_file(500, 400), &CompressionOptions::default())
            .unwrap();

        assert_eq!(info.dimensions, Dimensions::new(500, 400));
        assert_eq!(info.detected_format.as_deref(), Some("Png"));
        assert!(info.supported);
        assert!(info.would_skip);
        assert_eq!(info.target, None);
        assert!(!info.would_resize());
    }

    #[test]
    fn test_inspect_reports_target() {
        let compressor = ImageCompressor::new();
        let options = CompressionOptions::new(Some(250), None, None, None, None)
            .unwrap()
            .with_skip_threshold(0);

        let info = compressor.inspect(&png_file(500, 400), &options).unwrap();
        assert!(!info.would_skip);
        assert_eq!(info.target, Some(Dimensions::new(250, 200)));
        assert!(info.would_resize());
    }

    #[test]
    fn test_inspect_undecodable() {
        let compressor = ImageCompressor::new();
        let file = ImageFile::new("junk.png", "image/png", vec![1u8; 64]);
        assert!(compressor
            .inspect(&file, &CompressionOptions::default())
            .is_err());
    }
}
