//! Local-disk storage through OpenDAL's `fs` service.

use super::traits::FileStorage;
use super::types::{FileStorageError, FileUploadRequest};
use opendal::Operator;

#[derive(Clone)]
pub struct FsFileStorage {
    operator: Operator,
}

impl FsFileStorage {
    /// Opens (and lazily creates) a store rooted at `root`.
    pub fn new(root: &str) -> Result<Self, FileStorageError> {
        let builder = opendal::services::Fs::default().root(root);
        let operator = Operator::new(builder)
            .map(|op| op.finish())
            .map_err(|e| FileStorageError::StorageError(e.to_string()))?;
        Ok(Self { operator })
    }
}

/// Rejects empty, absolute and parent-relative paths.
fn checked_path(path: &str) -> Result<&str, FileStorageError> {
    if path.is_empty()
        || path.starts_with('/')
        || path.ends_with('/')
        || path.split('/').any(|segment| segment.is_empty() || segment == "..")
    {
        return Err(FileStorageError::InvalidPath(path.to_owned()));
    }
    Ok(path)
}

fn storage_error(path: &str, err: &opendal::Error) -> FileStorageError {
    if err.kind() == opendal::ErrorKind::NotFound {
        FileStorageError::NotFound(path.to_owned())
    } else {
        FileStorageError::StorageError(err.to_string())
    }
}

impl FileStorage for FsFileStorage {
    async fn upload_file(&self, request: FileUploadRequest) -> Result<(), FileStorageError> {
        let path = checked_path(&request.path)?;
        self.operator
            .write(path, request.content)
            .await
            .map_err(|e| storage_error(path, &e))?;
        tracing::debug!(path, content_type = %request.content_type, "stored media file");
        Ok(())
    }

    async fn download_file(&self, path: &str) -> Result<Vec<u8>, FileStorageError> {
        let path = checked_path(path)?;
        self.operator
            .read(path)
            .await
            .map(|buf| buf.to_vec())
            .map_err(|e| storage_error(path, &e))
    }

    async fn delete_file(&self, path: &str) -> Result<bool, FileStorageError> {
        let path = checked_path(path)?;
        let exists = self
            .operator
            .exists(path)
            .await
            .map_err(|e| storage_error(path, &e))?;

        if exists {
            self.operator
                .delete(path)
                .await
                .map_err(|e| storage_error(path, &e))?;
        }
        Ok(exists)
    }

    async fn file_exists(&self, path: &str) -> Result<bool, FileStorageError> {
        let path = checked_path(path)?;
        self.operator
            .exists(path)
            .await
            .map_err(|e| storage_error(path, &e))
    }
}
