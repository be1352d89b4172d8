use crate::config::CompressorConfig;
use crate::error::Result;
use crate::processing::CompressionOptions;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "upload-squeeze",
    about = "Shrink listing photos before they are uploaded",
    long_about = "upload-squeeze downscales and re-encodes images that are too large to upload comfortably. \
                  Files at or below the skip threshold (300 KiB by default) are passed through untouched, \
                  and any file that cannot be compressed is kept as is, so an upload is never blocked.",
    version,
    after_help = "EXAMPLES:\n  \
    upload-squeeze compress hull.jpg ./out -w 1920 -q 0.8\n  \
    upload-squeeze batch \"./photos/*.jpg\" ./out -r -f webp\n  \
    upload-squeeze info deck.png"
)]
pub struct Args {
    #[arg(
        short = 'c',
        long,
        global = true,
        help = "TOML configuration file",
        long_help = "Read defaults from a TOML file with [compression] and [batch] sections. \
                     Command-line flags override values from the file."
    )]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Only print errors")]
    pub quiet: bool,

    #[arg(short = 'v', long, global = true, help = "Log every pipeline stage")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Compress a single image file",
        long_about = "Compress one image and write the result into the output directory. \
                      Compressed files get a generated name; skipped files keep their own."
    )]
    Compress {
        #[arg(help = "Input image file path")]
        input: PathBuf,

        #[arg(help = "Output directory")]
        output: PathBuf,

        #[command(flatten)]
        options: OptionArgs,
    },

    #[command(
        about = "Compress multiple images in parallel",
        long_about = "Compress every supported image found in a file, directory or glob. \
                      One bad image never stops the batch: it is copied through unchanged."
    )]
    Batch {
        #[arg(
            help = "Input file, directory, or glob",
            long_help = "Input can be a single file, a directory, or a glob expression. \
                         Examples: './photos', './photos/*.jpg'"
        )]
        input: String,

        #[arg(help = "Output directory")]
        output: PathBuf,

        #[arg(short = 'r', long, help = "Process subdirectories recursively")]
        recursive: bool,

        #[arg(
            short = 'j',
            long,
            help = "Maximum parallel compressions (default: CPU count)",
            long_help = "Upper bound on concurrent compressions. The actual number may be lower \
                         when available memory is tight."
        )]
        threads: Option<usize>,

        #[command(flatten)]
        options: OptionArgs,
    },

    #[command(
        about = "Show image information and what compression would do",
        long_about = "Read the image header and report dimensions, format, size, and the \
                      dimensions compression would produce with the current options."
    )]
    Info {
        #[arg(help = "Image file path to analyze")]
        input: PathBuf,

        #[command(flatten)]
        options: OptionArgs,
    },
}

/// Flags shared by every subcommand; unset flags fall back to the config.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct OptionArgs {
    #[arg(short = 'w', long, help = "Maximum width in pixels (default: 1920)")]
    pub max_width: Option<u32>,

    #[arg(short = 'H', long, help = "Maximum height in pixels")]
    pub max_height: Option<u32>,

    #[arg(
        short = 'q',
        long,
        help = "Quality from 0.0 to 1.0 (default: 0.8)",
        long_help = "Lossy quality factor. For JPEG it maps to encoder quality 1-100; \
                     for PNG it selects optimisation effort; WebP output is lossless."
    )]
    pub quality: Option<f32>,

    #[arg(
        short = 'f',
        long,
        help = "Output format: jpeg, png, webp or a MIME type (default: image/jpeg)"
    )]
    pub format: Option<String>,

    #[arg(long, help = "Clamp width and height independently (may distort)")]
    pub stretch: bool,

    #[arg(
        long,
        value_name = "KIB",
        help = "Pass files at or below this size through (default: 300)"
    )]
    pub skip_threshold: Option<u64>,
}

impl OptionArgs {
    /// Layer these flags over `config` and validate.
    pub fn resolve(&self, config: &CompressorConfig) -> Result<CompressionOptions> {
        let mut config = config.clone();
        let section = &mut config.compression;

        if self.max_width.is_some() {
            section.max_width = self.max_width;
        }
        if self.max_height.is_some() {
            section.max_height = self.max_height;
        }
        if self.quality.is_some() {
            section.quality = self.quality;
        }
        if self.format.is_some() {
            section.output_format = self.format.clone();
        }
        if self.stretch {
            section.maintain_aspect_ratio = Some(false);
        }
        if self.skip_threshold.is_some() {
            section.skip_threshold_kib = self.skip_threshold;
        }

        config.compression_options()
    }
}
