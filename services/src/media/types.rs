//! File storage types.

/// Request to store a file at `path`.
#[derive(Debug, Clone)]
pub struct FileUploadRequest {
    pub path: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

impl FileUploadRequest {
    pub fn new(path: impl Into<String>, content: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content,
            content_type: content_type.into(),
        }
    }
}

/// Error type for file storage operations.
#[derive(Debug, thiserror::Error)]
pub enum FileStorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}
