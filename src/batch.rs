use crate::codec::ImageCodec;
use crate::constants::{
    LARGE_IMAGE_THRESHOLD_MIB, MAX_CONCURRENT_LARGE_IMAGES, NOTABLE_REDUCTION_PERCENT,
    SUPPORTED_IMAGE_EXTENSIONS,
};
use crate::error::{CompressionError, Result};
use crate::processing::{CompressionOptions, CompressionOutcome, CompressionResult, ImageCompressor};
use crate::source::ImageFile;
use crate::utils::round_one_decimal;
use glob::glob;
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Aggregate statistics over one `compress_all` run. Diagnostic only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub files: usize,
    pub compressed: usize,
    pub skipped: usize,
    pub fallback: usize,
    pub total_original_bytes: u64,
    pub total_compressed_bytes: u64,
    pub reduction_percentage: f64,
}

impl BatchSummary {
    pub fn from_results(results: &[CompressionResult]) -> Self {
        let mut summary = BatchSummary {
            files: results.len(),
            ..Default::default()
        };

        for result in results {
            match result.outcome {
                CompressionOutcome::Compressed => summary.compressed += 1,
                CompressionOutcome::Skipped => summary.skipped += 1,
                CompressionOutcome::Fallback => summary.fallback += 1,
            }
            summary.total_original_bytes += result.original_size;
            summary.total_compressed_bytes += result.compressed_size;
        }

        summary.reduction_percentage = if summary.total_original_bytes > 0 {
            round_one_decimal(
                (1.0 - summary.total_compressed_bytes as f64 / summary.total_original_bytes as f64)
                    * 100.0,
            )
        } else {
            0.0
        };
        summary
    }

    fn log(&self, results: &[CompressionResult]) {
        info!(
            files = self.files,
            compressed = self.compressed,
            skipped = self.skipped,
            fallback = self.fallback,
            total_original_bytes = self.total_original_bytes,
            total_compressed_bytes = self.total_compressed_bytes,
            reduction_percentage = self.reduction_percentage,
            "batch compression complete"
        );

        for result in results
            .iter()
            .filter(|r| r.reduction_percentage > NOTABLE_REDUCTION_PERCENT)
        {
            debug!(
                file = %result.file.name,
                reduction_percentage = result.reduction_percentage,
                "notable reduction"
            );
        }
    }
}

impl<C: ImageCodec> ImageCompressor<C> {
    /// Compress every file concurrently.
    ///
    /// Always yields one result per input, in input order. Per-file
    /// failures are logged and replaced by the original file
    /// (`CompressionOutcome::Fallback`); only an unusable codec or worker
    /// pool fails the whole batch.
    pub fn compress_all(
        &self,
        files: &[ImageFile],
        options: &CompressionOptions,
    ) -> Result<Vec<CompressionResult>> {
        self.compress_all_with_progress(files, options, None)
    }

    /// [`compress_all`](Self::compress_all), ticking `progress` once per file.
    pub fn compress_all_with_progress(
        &self,
        files: &[ImageFile],
        options: &CompressionOptions,
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<CompressionResult>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        self.codec().check_available().map_err(|e| match e {
            CompressionError::CodecUnavailable(_) => e,
            other => CompressionError::CodecUnavailable(other.to_string()),
        })?;

        let threads = plan_parallelism(files, self.max_parallelism, self.memory_headroom_mib);
        info!(files = files.len(), threads, "compressing batch");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| CompressionError::WorkerPool(e.to_string()))?;

        let results: Vec<CompressionResult> = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    let attempt = self.compress(file, options);
                    if let Some(pb) = progress {
                        pb.inc(1);
                    }
                    settle(file, attempt)
                })
                .collect()
        });

        BatchSummary::from_results(&results).log(&results);
        Ok(results)
    }
}

/// Turn a per-file attempt into a guaranteed result.
fn settle(file: &ImageFile, attempt: Result<CompressionResult>) -> CompressionResult {
    match attempt {
        Ok(result) => result,
        Err(e) => {
            warn!(file = %file.name, error = %e, "compression failed, using original");
            CompressionResult::passthrough(file.clone(), CompressionOutcome::Fallback)
        }
    }
}

/// Estimate decoded memory for a file without decoding it, in MiB.
///
/// Encoded images typically expand several times once decoded; the
/// multiplier depends on the declared format.
pub fn estimate_decode_memory_mib(file: &ImageFile) -> f64 {
    let size_mib = file.size() as f64 / (1024.0 * 1024.0);
    let multiplier = match file.mime_type.as_str() {
        "image/jpeg" | "image/jpg" => 4.0,
        "image/png" => 3.0,
        "image/webp" => 3.5,
        "image/gif" => 2.0,
        _ => 3.0,
    };
    size_mib * multiplier
}

fn available_memory_mib() -> u64 {
    let mut sys =
        System::new_with_specifics(RefreshKind::new().with_memory(MemoryRefreshKind::new()));
    sys.refresh_memory();
    // sysinfo reports bytes
    sys.available_memory() / (1024 * 1024)
}

/// Pick the worker count for a batch from the requested limit, the CPU
/// count and the memory the host has available.
pub fn plan_parallelism(files: &[ImageFile], requested: Option<usize>, headroom_mib: u64) -> usize {
    if files.is_empty() {
        return 1;
    }
    let baseline = requested.unwrap_or_else(num_cpus::get).max(1).min(files.len());
    let estimates: Vec<f64> = files.iter().map(estimate_decode_memory_mib).collect();
    parallelism_for(&estimates, baseline, available_memory_mib(), headroom_mib)
}

fn parallelism_for(
    estimates_mib: &[f64],
    baseline: usize,
    available_mib: u64,
    headroom_mib: u64,
) -> usize {
    if estimates_mib.is_empty() {
        return 1;
    }
    let baseline = baseline.max(1);

    let large_images = estimates_mib
        .iter()
        .filter(|&&mib| mib > LARGE_IMAGE_THRESHOLD_MIB)
        .count();
    let large_cap = if large_images >= MAX_CONCURRENT_LARGE_IMAGES {
        MAX_CONCURRENT_LARGE_IMAGES
    } else {
        baseline
    };

    let total_mib: f64 = estimates_mib.iter().sum();
    let avg_per_file_mib = ((total_mib / estimates_mib.len() as f64).ceil() as u64).max(1);
    let mem_cap = (available_mib.saturating_sub(headroom_mib) / avg_per_file_mib)
        .clamp(1, baseline as u64) as usize;

    large_cap.min(mem_cap).max(1)
}

/// Collect image paths from a file, a directory or a glob pattern.
///
/// Hidden entries below a directory root are skipped. Paths come back
/// canonicalised and sorted.
pub fn collect_image_files(input: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();
    let input_path = Path::new(input);

    if input_path.is_file() {
        image_files.push(input_path.canonicalize()?);
    } else if input_path.is_dir() {
        let walker = if recursive {
            WalkDir::new(input_path)
        } else {
            WalkDir::new(input_path).max_depth(1)
        };

        for entry in walker
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && is_image_file(path) {
                if let Ok(canonical_path) = path.canonicalize() {
                    image_files.push(canonical_path);
                }
            }
        }
    } else {
        let pattern =
            glob(input).map_err(|_| CompressionError::NoImageFilesFound(input.to_string()))?;
        for entry in pattern.flatten() {
            if entry.is_file() && is_image_file(&entry) {
                if let Ok(canonical_path) = entry.canonicalize() {
                    image_files.push(canonical_path);
                }
            }
        }
    }

    image_files.sort();
    image_files.dedup();
    Ok(image_files)
}

/// Extension check used when scanning directories.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
