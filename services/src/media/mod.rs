//! Recipe image storage.
//!
//! Images arrive as base64 data URLs ([`decode_data_url`]), are written
//! through a [`FileStorage`] backend under `recipes/images/`, and are served
//! back from `GET /media/{*path}`.

mod data_url;
mod fs;
mod mock;
mod traits;
mod types;

pub use data_url::{DecodedImage, ImageError, MAX_IMAGE_BYTES, decode_data_url};
pub use fs::FsFileStorage;
pub use mock::MockFileStorage;
pub use traits::FileStorage;
pub use types::{FileStorageError, FileUploadRequest};

/// Storage path for a new recipe image with the given extension.
pub fn recipe_image_path(extension: &str) -> String {
    format!("recipes/images/{}.{extension}", uuid::Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_image_paths_are_unique() {
        let a = recipe_image_path("png");
        let b = recipe_image_path("png");
        assert!(a.starts_with("recipes/images/"));
        assert!(a.ends_with(".png"));
        assert_ne!(a, b);
    }

    async fn generic_upload<S: FileStorage>(storage: &S, path: &str) -> Result<(), FileStorageError> {
        storage
            .upload_file(FileUploadRequest::new(path, b"bytes".to_vec(), "image/png"))
            .await
    }

    #[tokio::test]
    async fn generic_file_storage_trait() {
        let storage = MockFileStorage::new();
        generic_upload(&storage, "recipes/images/a.png").await.unwrap();
        assert!(storage.file_exists("recipes/images/a.png").await.unwrap());
    }
}
