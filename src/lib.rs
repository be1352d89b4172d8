pub mod batch;
pub mod cancel;
pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod dimensions;
pub mod error;
pub mod formats;
pub mod info;
pub mod logger;
pub mod processing;
pub mod source;
pub mod utils;
pub mod validation;

pub use batch::{collect_image_files, is_image_file, plan_parallelism, BatchSummary};
pub use cancel::CancelToken;
pub use codec::{ImageCodec, RasterCodec, RasterSurface, Surface};
pub use config::CompressorConfig;
pub use dimensions::{calculate_dimensions, Dimensions};
pub use error::{CompressionError, Result};
pub use formats::OutputFormat;
pub use info::{print_image_info, ImageInfo};
pub use processing::{
    generate_file_name, is_supported_image, CompressionOptions, CompressionOutcome,
    CompressionResult, ImageCompressor,
};
pub use source::ImageFile;
