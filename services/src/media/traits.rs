//! Storage trait definitions.

use super::types::{FileStorageError, FileUploadRequest};
use std::future::Future;

/// Generic interface for media file storage.
///
/// Paths are relative, `/`-separated, e.g. `recipes/images/{uuid}.png`.
pub trait FileStorage: Clone + Send + Sync + 'static {
    fn upload_file(
        &self,
        request: FileUploadRequest,
    ) -> impl Future<Output = Result<(), FileStorageError>> + Send;

    fn download_file(&self, path: &str)
    -> impl Future<Output = Result<Vec<u8>, FileStorageError>> + Send;

    /// Returns `true` when a file was removed.
    fn delete_file(&self, path: &str) -> impl Future<Output = Result<bool, FileStorageError>> + Send;

    fn file_exists(&self, path: &str) -> impl Future<Output = Result<bool, FileStorageError>> + Send;
}
