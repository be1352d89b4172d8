use crate::cancel::CancelToken;
use crate::codec::{ImageCodec, RasterCodec, Surface};
use crate::constants::{
    COMPRESSED_FILE_PREFIX, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, DEFAULT_SKIP_THRESHOLD_BYTES,
    MAX_QUALITY, MIN_AVAILABLE_MEMORY_MIB, MIN_QUALITY, RANDOM_SUFFIX_LEN,
};
use crate::dimensions::{calculate_dimensions, Dimensions};
use crate::error::{CompressionError, Result};
use crate::formats::{is_supported_mime, OutputFormat};
use crate::source::ImageFile;
use crate::utils::calculate_reduction_percentage;
use bytes::Bytes;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct CompressionOptions {
    pub max_width: u32,
    pub max_height: Option<u32>,
    pub quality: f32,
    pub output_format: OutputFormat,
    pub maintain_aspect_ratio: bool,
    pub skip_threshold_bytes: u64,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: None,
            quality: DEFAULT_QUALITY,
            output_format: OutputFormat::Jpeg,
            maintain_aspect_ratio: true,
            skip_threshold_bytes: DEFAULT_SKIP_THRESHOLD_BYTES,
        }
    }
}

impl CompressionOptions {
    /// Build validated options; `None` picks the default for that field.
    ///
    /// `output_format` accepts a MIME type (`image/webp`) or a short name
    /// (`webp`). A `max_height` of zero means no height bound.
    pub fn new(
        max_width: Option<u32>,
        max_height: Option<u32>,
        quality: Option<f32>,
        output_format: Option<&str>,
        maintain_aspect_ratio: Option<bool>,
    ) -> Result<Self> {
        let defaults = Self::default();

        let max_width = max_width.unwrap_or(defaults.max_width);
        if max_width == 0 {
            return Err(CompressionError::InvalidDimensions(
                "max width must be greater than zero".to_string(),
            ));
        }

        let quality = quality.unwrap_or(defaults.quality);
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
            return Err(CompressionError::InvalidQuality(quality));
        }

        let output_format = match output_format {
            Some(format) => format.parse()?,
            None => defaults.output_format,
        };

        Ok(Self {
            max_width,
            max_height: max_height.filter(|&h| h > 0),
            quality,
            output_format,
            maintain_aspect_ratio: maintain_aspect_ratio.unwrap_or(true),
            skip_threshold_bytes: defaults.skip_threshold_bytes,
        })
    }

    pub fn with_skip_threshold(mut self, bytes: u64) -> Self {
        self.skip_threshold_bytes = bytes;
        self
    }

    pub fn output_mime(&self) -> &'static str {
        self.output_format.mime_type()
    }

    /// Size `compress` would draw an image of `original` size at.
    pub fn target_dimensions(&self, original: Dimensions) -> Dimensions {
        calculate_dimensions(
            original.width,
            original.height,
            self.max_width,
            self.max_height,
            self.maintain_aspect_ratio,
        )
    }
}

/// Which path produced a [`CompressionResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionOutcome {
    /// Decoded, redrawn and re-encoded
    Compressed,
    /// At or below the skip threshold, passed through
    Skipped,
    /// Compression failed and the original was substituted
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    pub file: ImageFile,
    pub original_size: u64,
    pub compressed_size: u64,
    pub reduction_percentage: f64,
    /// Zero unless `outcome` is `Compressed`
    pub width: u32,
    /// Zero unless `outcome` is `Compressed`
    pub height: u32,
    pub outcome: CompressionOutcome,
}

impl CompressionResult {
    /// Echo the original file with zero reduction and unset dimensions.
    pub fn passthrough(file: ImageFile, outcome: CompressionOutcome) -> Self {
        let size = file.size();
        Self {
            file,
            original_size: size,
            compressed_size: size,
            reduction_percentage: 0.0,
            width: 0,
            height: 0,
            outcome,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn is_compressed(&self) -> bool {
        self.outcome == CompressionOutcome::Compressed
    }
}

/// Shrinks oversized images before upload.
///
/// Every call is a straight pipeline: decode, compute the target size,
/// draw, encode, wrap. All intermediate buffers belong to the call and are
/// dropped on every exit path.
#[derive(Debug, Clone)]
pub struct ImageCompressor<C = RasterCodec> {
    codec: C,
    cancel: Option<CancelToken>,
    pub(crate) max_parallelism: Option<usize>,
    pub(crate) memory_headroom_mib: u64,
}

impl ImageCompressor<RasterCodec> {
    pub fn new() -> Self {
        Self::with_codec(RasterCodec::new())
    }
}

impl Default for ImageCompressor<RasterCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ImageCodec> ImageCompressor<C> {
    pub fn with_codec(codec: C) -> Self {
        Self {
            codec,
            cancel: None,
            max_parallelism: None,
            memory_headroom_mib: MIN_AVAILABLE_MEMORY_MIB,
        }
    }

    /// Stop between pipeline stages once `token` is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Upper bound on concurrent compressions in `compress_all`.
    pub fn with_max_parallelism(mut self, threads: usize) -> Self {
        self.max_parallelism = Some(threads.max(1));
        self
    }

    /// Memory kept free when sizing the batch worker pool.
    pub fn with_memory_headroom_mib(mut self, mib: u64) -> Self {
        self.memory_headroom_mib = mib;
        self
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Compress a single image.
    ///
    /// Small files come back untouched as `Skipped`. Errors propagate:
    /// `InvalidInput` for non-image types, `DecodeFailed` for unreadable
    /// content, `CompressionFailed` when drawing or encoding fails.
    pub fn compress(
        &self,
        file: &ImageFile,
        options: &CompressionOptions,
    ) -> Result<CompressionResult> {
        if !file.declares_image() {
            return Err(CompressionError::InvalidInput(format!(
                "{} is not an image (declared type {:?})",
                file.name, file.mime_type
            )));
        }

        let original_size = file.size();
        if original_size <= options.skip_threshold_bytes {
            debug!(
                file = %file.name,
                size = original_size,
                threshold = options.skip_threshold_bytes,
                "below threshold, skipping compression"
            );
            return Ok(CompressionResult::passthrough(
                file.clone(),
                CompressionOutcome::Skipped,
            ));
        }

        self.codec
            .check_available()
            .map_err(|e| CompressionError::CompressionFailed(e.to_string()))?;

        self.checkpoint()?;
        let surface = self.codec.decode(&file.data)?;
        let original = surface.dimensions();
        let target = options.target_dimensions(original);
        debug!(file = %file.name, %original, %target, "decoded");

        self.checkpoint()?;
        let surface = surface.draw(target)?;

        self.checkpoint()?;
        let encoded = surface.encode(options.output_format, options.quality)?;
        let drawn = surface.dimensions();
        drop(surface);

        let compressed = ImageFile {
            name: generate_file_name(&file.name, options.output_format),
            mime_type: options.output_mime().to_string(),
            data: Bytes::from(encoded),
            last_modified: SystemTime::now(),
        };
        let compressed_size = compressed.size();
        let reduction_percentage = calculate_reduction_percentage(original_size, compressed_size);

        debug!(
            file = %file.name,
            output = %compressed.name,
            original_size,
            compressed_size,
            reduction_percentage,
            "compressed"
        );

        Ok(CompressionResult {
            file: compressed,
            original_size,
            compressed_size,
            reduction_percentage,
            width: drawn.width,
            height: drawn.height,
            outcome: CompressionOutcome::Compressed,
        })
    }

    /// Natural pixel size, read from the header only.
    pub fn image_dimensions(&self, file: &ImageFile) -> Result<Dimensions> {
        self.codec.probe(&file.data)
    }

    /// See [`is_supported_image`].
    pub fn is_supported_image(&self, file: &ImageFile) -> bool {
        is_supported_image(file)
    }

    fn checkpoint(&self) -> Result<()> {
        match &self.cancel {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }
}

/// True iff the declared MIME type is on the upload allow-list.
/// Content is not inspected.
pub fn is_supported_image(file: &ImageFile) -> bool {
    is_supported_mime(&file.mime_type)
}

/// `compressed_<stem>_<unix-ms>_<suffix>.<ext>`, extension taken from the
/// output format.
pub fn generate_file_name(original_name: &str, format: OutputFormat) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(RANDOM_SUFFIX_LEN)
        .collect();

    format!(
        "{}_{}_{}_{}.{}",
        COMPRESSED_FILE_PREFIX,
        file_stem(original_name),
        timestamp,
        suffix,
        format.extension()
    )
}

/// Drop the last extension; path separators become underscores.
fn file_stem(name: &str) -> String {
    let stem = match name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && !ext.contains(['/', '\\']) => stem,
        _ => name,
    };
    stem.replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
        });
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn eager() -> CompressionOptions {
        CompressionOptions::default().with_skip_threshold(0)
    }

    #[test]
    fn test_compression_options_default() {
        let options = CompressionOptions::new(None, None, None, None, None).unwrap();
        assert_eq!(options.max_width, 1920);
        assert_eq!(options.max_height, None);
        assert_eq!(options.quality, 0.8);
        assert_eq!(options.output_format, OutputFormat::Jpeg);
        assert!(options.maintain_aspect_ratio);
        assert_eq!(options.skip_threshold_bytes, 300 * 1024);
        assert_eq!(options, CompressionOptions::default());
    }

    #[test]
    fn test_compression_options_creation() {
        let options = CompressionOptions::new(
            Some(800),
            Some(600),
            Some(0.5),
            Some("image/webp"),
            Some(false),
        )
        .unwrap();
        assert_eq!(options.max_width, 800);
        assert_eq!(options.max_height, Some(600));
        assert_eq!(options.quality, 0.5);
        assert_eq!(options.output_format, OutputFormat::WebP);
        assert!(!options.maintain_aspect_ratio);
        assert_eq!(options.output_mime(), "image/webp");
    }

    #[test]
    fn test_compression_options_invalid_values() {
        assert!(matches!(
            CompressionOptions::new(None, None, Some(1.5), None, None),
            Err(CompressionError::InvalidQuality(_))
        ));
        assert!(matches!(
            CompressionOptions::new(None, None, Some(f32::NAN), None, None),
            Err(CompressionError::InvalidQuality(_))
        ));
        assert!(matches!(
            CompressionOptions::new(Some(0), None, None, None, None),
            Err(CompressionError::InvalidDimensions(_))
        ));
        assert!(matches!(
            CompressionOptions::new(None, None, None, Some("image/tiff"), None),
            Err(CompressionError::UnsupportedFormat(_))
        ));

        let options = CompressionOptions::new(None, Some(0), None, None, None).unwrap();
        assert_eq!(options.max_height, None);
    }

    #[test]
    fn test_rejects_non_image_type() {
        let compressor = ImageCompressor::new();
        let file = ImageFile::new("brochure.pdf", "application/pdf", vec![0u8; 10]);
        let result = compressor.compress(&file, &CompressionOptions::default());
        assert!(matches!(result, Err(CompressionError::InvalidInput(_))));
    }

    #[test]
    fn test_small_file_is_skipped_unchanged() {
        let compressor = ImageCompressor::new();
        let file = ImageFile::new("dock.png", "image/png", png_bytes(50, 40));

        let result = compressor.compress(&file, &CompressionOptions::default()).unwrap();
        assert_eq!(result.outcome, CompressionOutcome::Skipped);
        assert_eq!(result.file, file);
        assert_eq!(result.reduction_percentage, 0.0);
        assert_eq!(result.compressed_size, result.original_size);
        assert_eq!(result.dimensions(), Dimensions::default());
    }

    #[test]
    fn test_slow_path_resizes_and_renames() {
        let compressor = ImageCompressor::new();
        let file = ImageFile::new("yacht.deck.png", "image/png", png_bytes(400, 300));
        let options = CompressionOptions::new(Some(200), None, None, None, None)
            .unwrap()
            .with_skip_threshold(0);

        let result = compressor.compress(&file, &options).unwrap();
        assert!(result.is_compressed());
        assert_eq!(result.dimensions(), Dimensions::new(200, 150));
        assert_eq!(result.file.mime_type, "image/jpeg");
        assert!(result.file.name.starts_with("compressed_yacht.deck_"));
        assert!(result.file.name.ends_with(".jpg"));
        assert_eq!(result.compressed_size, result.file.size());

        let probed = compressor.image_dimensions(&result.file).unwrap();
        assert_eq!(probed, Dimensions::new(200, 150));
    }

    #[test]
    fn test_corrupt_content_fails_decode() {
        let compressor = ImageCompressor::new();
        let file = ImageFile::new("broken.jpg", "image/jpeg", vec![0xAB; 4096]);
        let result = compressor.compress(&file, &eager());
        assert!(matches!(result, Err(CompressionError::DecodeFailed(_))));
        assert!(matches!(
            compressor.image_dimensions(&file),
            Err(CompressionError::DecodeFailed(_))
        ));
    }

    #[test]
    fn test_cancelled_token_stops_pipeline() {
        let token = CancelToken::new();
        token.cancel();
        let compressor = ImageCompressor::new().with_cancel_token(token);
        let file = ImageFile::new("sunset.png", "image/png", png_bytes(20, 20));

        let result = compressor.compress(&file, &eager());
        assert!(matches!(result, Err(CompressionError::Cancelled)));
    }

    #[test]
    fn test_generate_file_name_shape() {
        let name = generate_file_name("catamaran.jpeg", OutputFormat::WebP);
        let parts: Vec<&str> = name.trim_end_matches(".webp").split('_').collect();
        assert_eq!(parts[0], "compressed");
        assert_eq!(parts[1], "catamaran");
        assert!(parts[2].parse::<u128>().is_ok());
        assert_eq!(parts[3].len(), RANDOM_SUFFIX_LEN);
        assert!(name.ends_with(".webp"));

        assert_ne!(
            generate_file_name("a.jpg", OutputFormat::Jpeg),
            generate_file_name("a.jpg", OutputFormat::Jpeg)
        );
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("photo.jpg"), "photo");
        assert_eq!(file_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(file_stem("noext"), "noext");
        assert_eq!(file_stem("trailing."), "trailing.");
        assert_eq!(file_stem("dir/boat.png"), "dir_boat");
    }

    #[test]
    fn test_is_supported_image() {
        let png = ImageFile::new("x.png", "image/png", Vec::new());
        let bmp = ImageFile::new("x.bmp", "image/bmp", Vec::new());
        assert!(is_supported_image(&png));
        assert!(!is_supported_image(&bmp));
        assert!(ImageCompressor::new().is_supported_image(&png));
    }
}
