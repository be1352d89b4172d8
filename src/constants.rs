/// Default upper bound on output width, in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 1920;
/// Default lossy re-encode quality, in `0.0..=1.0`.
pub const DEFAULT_QUALITY: f32 = 0.8;
pub const MIN_QUALITY: f32 = 0.0;
pub const MAX_QUALITY: f32 = 1.0;

/// Files at or below this size are passed through untouched.
pub const DEFAULT_SKIP_THRESHOLD_BYTES: u64 = 300 * 1024;

/// MIME types accepted by `is_supported_image`.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
];

pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

pub const COMPRESSED_FILE_PREFIX: &str = "compressed";
pub const RANDOM_SUFFIX_LEN: usize = 6;

/// Results above this reduction get a per-file line in the batch summary.
pub const NOTABLE_REDUCTION_PERCENT: f64 = 20.0;

// Decoder guards
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 16_384;
pub const MAX_DECODE_ALLOC_BYTES: u64 = 1024 * 1024 * 1024;

// PNG optimisation levels, picked from the requested quality
pub const ZOPFLI_ITERATIONS: u8 = 15;
pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;
pub const LIBDEFLATER_LOW_LEVEL: u8 = 8;

// Batch memory budgeting
pub const MIN_AVAILABLE_MEMORY_MIB: u64 = 512;
pub const LARGE_IMAGE_THRESHOLD_MIB: f64 = 50.0;
pub const MAX_CONCURRENT_LARGE_IMAGES: usize = 2;

pub const PROGRESS_SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
