//! Mock file storage for testing.

use super::traits::FileStorage;
use super::types::{FileStorageError, FileUploadRequest};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory implementation of `FileStorage` for testing.
#[derive(Clone, Default)]
pub struct MockFileStorage {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MockFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .files
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        paths.sort();
        paths
    }
}

impl FileStorage for MockFileStorage {
    async fn upload_file(&self, request: FileUploadRequest) -> Result<(), FileStorageError> {
        let mut files = self.files.write().expect("lock poisoned");
        files.insert(request.path, request.content);
        Ok(())
    }

    async fn download_file(&self, path: &str) -> Result<Vec<u8>, FileStorageError> {
        let files = self.files.read().expect("lock poisoned");
        files
            .get(path)
            .cloned()
            .ok_or_else(|| FileStorageError::NotFound(path.to_owned()))
    }

    async fn delete_file(&self, path: &str) -> Result<bool, FileStorageError> {
        let mut files = self.files.write().expect("lock poisoned");
        Ok(files.remove(path).is_some())
    }

    async fn file_exists(&self, path: &str) -> Result<bool, FileStorageError> {
        let files = self.files.read().expect("lock poisoned");
        Ok(files.contains_key(path))
    }
}
