use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use common::storage::{
    BlobStore, ConnectionString, FilesystemBlobStore, HttpBlobStore, PublicAccess, StorageError,
};
use common::{FaultInjectionTransport, HttpTransport, ReqwestTransport};
use tracing::{info, warn};
use url::Url;

use crate::config::{StorageBackend, StorageConfig};

/// Build the configured blob store.
///
/// For the HTTP backend the real transport is wrapped in a
/// [`FaultInjectionTransport`] when `storage.fault_injection.enabled` is set.
pub async fn build_blob_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    if config.fault_injection.enabled && config.backend == StorageBackend::Filesystem {
        warn!("Fault injection only applies to the http storage backend");
    }

    match config.backend {
        StorageBackend::Filesystem => {
            let public_base_url = Url::parse(&config.filesystem.public_base_url)
                .context("Invalid storage.filesystem.public_base_url")?;
            let store = FilesystemBlobStore::new(
                PathBuf::from(&config.filesystem.root),
                public_base_url,
                config.max_blob_size,
            )
            .await
            .context("Failed to initialize filesystem blob store")?;
            info!(root = %config.filesystem.root, "Using filesystem blob store");
            Ok(Arc::new(store))
        }
        StorageBackend::Http => {
            let Some(raw) = config.connection_string.as_deref() else {
                bail!("storage.connection_string is required for the http backend");
            };
            let connection = ConnectionString::parse(raw)?;
            let retry = config.retry.to_options();
            let transfer = config.transfer.to_options();

            let real = ReqwestTransport::new(retry.network_timeout)
                .context("Failed to build HTTP client")?;
            let transport: Arc<dyn HttpTransport> = if config.fault_injection.enabled {
                let policy = config.fault_injection.to_policy();
                info!(
                    rate = policy.rate(),
                    windows = ?policy.windows(),
                    "Storage fault injection enabled"
                );
                match config.fault_injection.seed {
                    Some(seed) => Arc::new(FaultInjectionTransport::with_seed(real, policy, seed)),
                    None => Arc::new(FaultInjectionTransport::new(real, policy)),
                }
            } else {
                Arc::new(real)
            };

            info!(
                endpoint = %connection.blob_endpoint,
                max_retries = retry.max_retries,
                mode = ?retry.mode,
                "Using HTTP blob store"
            );
            Ok(Arc::new(HttpBlobStore::new(
                transport,
                connection,
                retry,
                transfer,
                config.max_blob_size,
            )))
        }
    }
}

/// Create the container if needed; a freshly created container is opened for
/// anonymous blob reads.
pub async fn ensure_container(store: &dyn BlobStore, container: &str) -> Result<(), StorageError> {
    if store.create_container_if_not_exists(container).await? {
        info!(container, "Created blob container");
        store
            .set_public_access(container, PublicAccess::Blob)
            .await?;
    }
    Ok(())
}
