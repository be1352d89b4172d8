use crate::constants::MAX_FILE_SIZE;
use crate::error::{CompressionError, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Validate an input path before its bytes are read into memory.
///
/// Rejects missing paths, directories and files above [`MAX_FILE_SIZE`].
pub fn validate_input_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CompressionError::FileNotFound(path.to_path_buf()));
    }

    if !path.is_file() {
        return Err(CompressionError::InvalidInput(format!(
            "{} is not a file",
            path.display()
        )));
    }

    let metadata =
        fs::metadata(path).map_err(|_| CompressionError::FileNotFound(path.to_path_buf()))?;
    if metadata.len() > MAX_FILE_SIZE {
        return Err(CompressionError::FileTooLarge(metadata.len(), MAX_FILE_SIZE));
    }

    Ok(())
}

/// Ensure the output directory exists and return its canonical path.
pub fn prepare_output_dir(path: &Path) -> Result<PathBuf> {
    fs::create_dir_all(path)
        .map_err(|_| CompressionError::DirectoryCreationFailed(path.to_path_buf()))?;

    path.canonicalize()
        .map_err(|_| CompressionError::DirectoryCreationFailed(path.to_path_buf()))
}

/// Join a generated file name onto the output directory, refusing names
/// that would escape it.
pub fn output_path_for(output_dir: &Path, file_name: &str) -> Result<PathBuf> {
    let candidate = Path::new(file_name);
    let mut components = candidate.components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(name)), None) => Ok(output_dir.join(name)),
        _ => Err(CompressionError::InvalidInput(format!(
            "refusing to write outside the output directory: {}",
            file_name
        ))),
    }
}

/// Output file names handed out during one run.
///
/// A name that was already claimed gets `_<n>` inserted before its
/// extension, so two inputs sharing a base name never land on the same
/// output path.
#[derive(Debug, Default)]
pub struct OutputNames {
    taken: HashSet<String>,
}

impl OutputNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, name: &str) -> String {
        if self.taken.insert(name.to_string()) {
            return name.to_string();
        }

        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (name, None),
        };
        let mut n: u64 = 1;
        loop {
            let candidate = match ext {
                Some(ext) => format!("{}_{}.{}", stem, n, ext),
                None => format!("{}_{}", stem, n),
            };
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
