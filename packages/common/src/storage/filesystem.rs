use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;
use url::Url;

use super::error::StorageError;
use super::name::{validate_blob_name, validate_container_name};
use super::traits::{BlobStore, PublicAccess, StoredBlob};

/// Directory holding content-type sidecars inside each container.
const META_DIR: &str = ".meta";

/// Filesystem-backed blob store for local development.
///
/// Layout: `{base_path}/{container}/{name}` with the uploaded content type in
/// `{base_path}/{container}/.meta/{name}`. Blob URIs are built from
/// `public_base_url` and are expected to be served by the application.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    public_base_url: Url,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(
        base_path: PathBuf,
        public_base_url: Url,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        if public_base_url.cannot_be_a_base() {
            return Err(StorageError::InvalidConfiguration(format!(
                "public base URL '{public_base_url}' cannot be a base"
            )));
        }
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            public_base_url,
            max_size,
        })
    }

    fn container_path(&self, container: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base_path.join(validate_container_name(container)?))
    }

    fn blob_path(&self, container: &str, name: &str) -> Result<PathBuf, StorageError> {
        Ok(self.container_path(container)?.join(validate_blob_name(name)?))
    }

    fn meta_path(&self, container: &str, name: &str) -> Result<PathBuf, StorageError> {
        Ok(self
            .container_path(container)?
            .join(META_DIR)
            .join(validate_blob_name(name)?))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn require_container(&self, container: &str) -> Result<PathBuf, StorageError> {
        let path = self.container_path(container)?;
        if !fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(format!("container '{container}'")));
        }
        Ok(path)
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn create_container_if_not_exists(&self, container: &str) -> Result<bool, StorageError> {
        let path = self.container_path(container)?;
        if fs::try_exists(&path).await? {
            return Ok(false);
        }
        fs::create_dir_all(path.join(META_DIR)).await?;
        debug!(container, "Created container directory");
        Ok(true)
    }

    async fn set_public_access(
        &self,
        container: &str,
        access: PublicAccess,
    ) -> Result<(), StorageError> {
        // Blobs under the base URL are always served; only the container's
        // existence is checked.
        self.require_container(container).await?;
        debug!(container, ?access, "Public access is implicit for filesystem containers");
        Ok(())
    }

    async fn put(
        &self,
        container: &str,
        name: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<Url, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        self.require_container(container).await?;
        let blob_path = self.blob_path(container, name)?;
        let meta_path = self.meta_path(container, name)?;

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, &data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = meta_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        match content_type {
            Some(ct) => fs::write(&meta_path, ct).await?,
            None => match fs::remove_file(&meta_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }

        self.blob_url(container, name)
    }

    async fn get(&self, container: &str, name: &str) -> Result<StoredBlob, StorageError> {
        let blob_path = self.blob_path(container, name)?;
        let data = match fs::read(&blob_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!("{container}/{name}")));
            }
            Err(e) => return Err(e.into()),
        };

        let content_type = match fs::read_to_string(self.meta_path(container, name)?).await {
            Ok(ct) => Some(ct),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        Ok(StoredBlob {
            data: Bytes::from(data),
            content_type,
        })
    }

    async fn delete_if_exists(&self, container: &str, name: &str) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(container, name)?;
        let deleted = match fs::remove_file(&blob_path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        match fs::remove_file(self.meta_path(container, name)?).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(deleted)
    }

    fn blob_url(&self, container: &str, name: &str) -> Result<Url, StorageError> {
        let container = validate_container_name(container)?;
        let name = validate_blob_name(name)?;
        let mut url = self.public_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidConfiguration("public base URL".into()))?
            .pop_if_empty()
            .push(container)
            .push(name);
        Ok(url)
    }
}
