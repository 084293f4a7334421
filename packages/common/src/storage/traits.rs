use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use super::error::StorageError;

/// Anonymous read access granted on a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicAccess {
    /// No anonymous access.
    None,
    /// Anonymous reads of individual blobs.
    Blob,
    /// Anonymous reads of blobs and container listings.
    Container,
}

impl PublicAccess {
    /// Value of the `x-ms-blob-public-access` header, if any.
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Blob => Some("blob"),
            Self::Container => Some("container"),
        }
    }
}

/// Bytes of a stored blob with the content type it was uploaded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Bytes,
    pub content_type: Option<String>,
}

/// Named-container blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create the container. Returns `true` if it was created by this call.
    async fn create_container_if_not_exists(&self, container: &str) -> Result<bool, StorageError>;

    /// Set the anonymous access level of a container.
    async fn set_public_access(
        &self,
        container: &str,
        access: PublicAccess,
    ) -> Result<(), StorageError>;

    /// Store a blob, replacing any existing blob of the same name, and return its URI.
    async fn put(
        &self,
        container: &str,
        name: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<Url, StorageError>;

    /// Retrieve all bytes of a blob.
    async fn get(&self, container: &str, name: &str) -> Result<StoredBlob, StorageError>;

    /// Delete a blob and its snapshots.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete_if_exists(&self, container: &str, name: &str) -> Result<bool, StorageError>;

    /// Stable URI under which a blob is exposed.
    fn blob_url(&self, container: &str, name: &str) -> Result<Url, StorageError>;
}
