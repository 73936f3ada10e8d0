use crate::errors::ServiceError;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// Image formats accepted for product pictures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Resolves the format from an upload's file name, falling back to its content type.
    pub fn detect(file_name: Option<&str>, content_type: Option<&str>) -> Option<Self> {
        let by_extension = file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_ascii_lowercase().as_str() {
                "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
                "png" => Some(ImageFormat::Png),
                _ => None,
            });

        by_extension.or_else(|| match content_type? {
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            _ => None,
        })
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }
}

/// A validated upload waiting to be stored
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub format: ImageFormat,
    pub data: Bytes,
}

/// Where product images live. `put` returns the public URL of the stored file.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put(&self, upload: ImageUpload) -> Result<String, ServiceError>;

    /// Removes a stored image. URLs this store does not own are left alone.
    async fn delete(&self, url: &str) -> Result<(), ServiceError>;

    /// True when `url` points at a file this store wrote.
    fn owns(&self, url: &str) -> bool;
}

/// Stores images under `<root>/products/` and serves them below `url_prefix`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    url_prefix: String,
}

const PRODUCTS_DIR: &str = "products";

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let url_prefix = url_prefix.into().trim_end_matches('/').to_string();
        Self {
            root: root.into(),
            url_prefix,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a public URL back to a path under the root, refusing traversal.
    fn path_for(&self, url: &str) -> Option<PathBuf> {
        let relative = url.strip_prefix(&self.url_prefix)?.strip_prefix('/')?;
        let relative = Path::new(relative);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || relative.as_os_str().is_empty() {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    #[instrument(skip(self, upload), fields(bytes = upload.data.len()))]
    async fn put(&self, upload: ImageUpload) -> Result<String, ServiceError> {
        let dir = self.root.join(PRODUCTS_DIR);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            error!(dir = %dir.display(), error = %e, "failed to create image directory");
            ServiceError::StorageError(e.to_string())
        })?;

        let file_name = format!("{}.{}", Uuid::new_v4(), upload.format.extension());
        let path = dir.join(&file_name);
        tokio::fs::write(&path, &upload.data).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to write image");
            ServiceError::StorageError(e.to_string())
        })?;

        debug!(path = %path.display(), "image stored");
        Ok(format!("{}/{}/{}", self.url_prefix, PRODUCTS_DIR, file_name))
    }

    #[instrument(skip(self))]
    async fn delete(&self, url: &str) -> Result<(), ServiceError> {
        let Some(path) = self.path_for(url) else {
            debug!("not a stored image, leaving it");
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "image removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to remove image");
                Err(ServiceError::StorageError(e.to_string()))
            }
        }
    }

    fn owns(&self, url: &str) -> bool {
        self.path_for(url).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_format_from_name_then_content_type() {
        assert_eq!(
            ImageFormat::detect(Some("Photo.JPEG"), None),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::detect(Some("blob"), Some("image/png")),
            Some(ImageFormat::Png)
        );
        assert_eq!(ImageFormat::detect(Some("anim.gif"), Some("image/gif")), None);
        assert_eq!(ImageFormat::detect(None, None), None);
    }

    #[test]
    fn only_urls_under_prefix_are_owned() {
        let store = LocalImageStore::new("/tmp/storage", "/storage/");
        assert!(store.owns("/storage/products/a.png"));
        assert!(!store.owns("https://cdn.example.com/pizza.jpg"));
        assert!(!store.owns("/storage/../etc/passwd"));
        assert!(!store.owns("/storage/"));
        assert!(!store.owns("/storagex/products/a.png"));
    }

    #[tokio::test]
    async fn put_then_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "/storage");

        let url = store
            .put(ImageUpload {
                format: ImageFormat::Png,
                data: Bytes::from_static(b"\x89PNG fake"),
            })
            .await
            .unwrap();
        assert!(url.starts_with("/storage/products/"));
        assert!(url.ends_with(".png"));

        let path = store.path_for(&url).unwrap();
        assert!(path.exists());

        store.delete(&url).await.unwrap();
        assert!(!path.exists());
        // Already gone is fine.
        store.delete(&url).await.unwrap();
    }

    #[tokio::test]
    async fn external_urls_are_never_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "/storage");
        store
            .delete("https://cdn.example.com/pizza.jpg")
            .await
            .unwrap();
    }
}
