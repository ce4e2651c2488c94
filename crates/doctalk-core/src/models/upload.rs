use std::path::Path;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::content_type;
use crate::error::CoreError;

/// A local file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    /// Declared MIME type; sent verbatim as the `Content-Type` of the transfer.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, declaring its content type from the extension.
    ///
    /// Unknown extensions are declared as `application/octet-stream`, which
    /// the upload allow-list rejects.
    pub fn from_path(path: &Path) -> Result<Self, CoreError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CoreError::MissingField("file name".to_string()))?
            .to_string();

        let content_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(content_type::for_extension)
            .unwrap_or(content_type::OCTET_STREAM);

        let bytes = std::fs::read(path)?;

        Ok(Self::new(name, content_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Lifecycle of the upload task held by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum UploadState {
    #[default]
    Idle,
    Validated,
    Uploading,
    Succeeded,
    Failed,
}
