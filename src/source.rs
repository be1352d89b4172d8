use crate::error::Result;
use crate::formats::mime_from_path;
use crate::validation::validate_input_path;
use bytes::Bytes;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// An in-memory image as handed over by an upload form: name, declared
/// MIME type and content.
///
/// The declared type is trusted for routing decisions (is this an image at
/// all?) but decoding always sniffs the actual content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
    pub last_modified: SystemTime,
}

impl ImageFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
            last_modified: SystemTime::now(),
        }
    }

    /// Read a file from disk, declaring its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        validate_input_path(path)?;

        let data = fs::read(path)?;
        let last_modified = fs::metadata(path)?
            .modified()
            .unwrap_or_else(|_| SystemTime::now());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            name,
            mime_type: mime_from_path(path).to_string(),
            data: Bytes::from(data),
            last_modified,
        })
    }

    /// Byte length of the content
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn declares_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}
