use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use upload_squeeze::cli::{Args, Commands, OptionArgs};
use upload_squeeze::logger::{self, is_quiet};
use upload_squeeze::utils::{create_progress_bar, create_progress_spinner, format_file_size};
use upload_squeeze::validation::{output_path_for, prepare_output_dir, OutputNames};
use upload_squeeze::{
    collect_image_files, is_supported_image, print_image_info, status, BatchSummary,
    CompressionOutcome, CompressionResult, CompressorConfig, ImageCompressor, ImageFile,
};

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_logging(args.quiet, args.verbose);

    let config = CompressorConfig::load_or_default(args.config.as_deref())
        .context("failed to load configuration")?;

    match args.command {
        Commands::Compress {
            input,
            output,
            options,
        } => compress_one(&input, &output, &options, &config),
        Commands::Batch {
            input,
            output,
            recursive,
            threads,
            options,
        } => compress_batch(&input, &output, recursive, threads, &options, &config),
        Commands::Info { input, options } => show_info(&input, &options, &config),
    }
}

fn compress_one(
    input: &Path,
    output_dir: &Path,
    flags: &OptionArgs,
    config: &CompressorConfig,
) -> Result<()> {
    let options = flags.resolve(config)?;
    let file = ImageFile::from_path(input)?;
    if !is_supported_image(&file) {
        bail!("{} is not a supported image type ({})", file.name, file.mime_type);
    }

    status!("🗜️  Compressing image: {:?}", input);
    let pb = if is_quiet() {
        ProgressBar::hidden()
    } else {
        create_progress_spinner("Compressing...")
    };

    let compressor = config.configure(ImageCompressor::new());
    let result = compressor.compress(&file, &options)?;
    pb.finish_and_clear();

    let output_dir = prepare_output_dir(output_dir)?;
    let written = write_result(&output_dir, &result, &mut OutputNames::new())?;

    status!(
        "📊 Original size: {} ({})",
        result.original_size,
        format_file_size(result.original_size)
    );
    report_result(&result);
    status!("📁 Output: {:?}", written);
    Ok(())
}

fn compress_batch(
    input: &str,
    output_dir: &Path,
    recursive: bool,
    threads: Option<usize>,
    flags: &OptionArgs,
    config: &CompressorConfig,
) -> Result<()> {
    let options = flags.resolve(config)?;
    let start_time = Instant::now();

    status!("🚀 Starting batch compression...");
    let paths = collect_image_files(input, recursive)?;
    if paths.is_empty() {
        status!("⚠️  No image files found in the input path");
        return Ok(());
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        match ImageFile::from_path(path) {
            Ok(file) if is_supported_image(&file) => files.push(file),
            Ok(file) => tracing::warn!(
                file = %file.name,
                mime = %file.mime_type,
                "unsupported type, skipping"
            ),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "unreadable, skipping"),
        }
    }
    status!("📊 Found {} image files to process", files.len());

    let mut compressor = config.configure(ImageCompressor::new());
    if let Some(threads) = threads {
        compressor = compressor.with_max_parallelism(threads);
    }

    let pb = if is_quiet() {
        ProgressBar::hidden()
    } else {
        create_progress_bar(files.len() as u64)
    };
    let results = compressor.compress_all_with_progress(&files, &options, Some(&pb))?;
    pb.finish_with_message("✅ Batch compression complete");

    let output_dir = prepare_output_dir(output_dir)?;
    let mut names = OutputNames::new();
    for result in &results {
        write_result(&output_dir, result, &mut names)?;
    }

    let summary = BatchSummary::from_results(&results);
    let elapsed = start_time.elapsed();
    status!("\n📊 Batch Compression Summary:");
    status!("  📁 Total files: {}", summary.files);
    status!(
        "  🗜️  Compressed: {}, skipped: {}, kept original after failure: {}",
        summary.compressed,
        summary.skipped,
        summary.fallback
    );
    status!(
        "  📊 Total original size: {}",
        format_file_size(summary.total_original_bytes)
    );
    status!(
        "  📊 Total compressed size: {}",
        format_file_size(summary.total_compressed_bytes)
    );
    status!("  🎯 Overall reduction: {:.1}%", summary.reduction_percentage);
    status!("  ⏱️  Total time: {:?}", elapsed);
    Ok(())
}

fn show_info(input: &Path, flags: &OptionArgs, config: &CompressorConfig) -> Result<()> {
    let options = flags.resolve(config)?;
    let file = ImageFile::from_path(input)?;
    let info = ImageCompressor::new().inspect(&file, &options)?;

    print_image_info(&info, &options);
    Ok(())
}

fn write_result(
    output_dir: &Path,
    result: &CompressionResult,
    names: &mut OutputNames,
) -> Result<PathBuf> {
    let name = names.claim(&result.file.name);
    if name != result.file.name {
        tracing::warn!(file = %result.file.name, renamed = %name, "output name already used");
    }
    let path = output_path_for(output_dir, &name)?;
    fs::write(&path, &result.file.data).with_context(|| format!("failed to write {:?}", path))?;
    Ok(path)
}

fn report_result(result: &CompressionResult) {
    match result.outcome {
        CompressionOutcome::Skipped => {
            status!("✅ Already small enough, kept as is");
        }
        CompressionOutcome::Fallback => {
            status!("⚠️  Compression failed, kept the original");
        }
        CompressionOutcome::Compressed => {
            status!(
                "📈 Compressed size: {} ({}) at {}x{}",
                result.compressed_size,
                format_file_size(result.compressed_size),
                result.width,
                result.height
            );
            status!("🎯 Reduction: {:.1}%", result.reduction_percentage);
            if result.reduction_percentage < 0.0 {
                status!(
                    "⚠️  File size increased by {:.1}%",
                    result.reduction_percentage.abs()
                );
            }
        }
    }
}
