use std::sync::Arc;

use common::storage::BlobStore;

use crate::config::AppConfig;
use crate::services::image::ImageRepository;

#[derive(Clone)]
pub struct AppState {
    pub images: Arc<dyn ImageRepository>,
    pub blob_store: Arc<dyn BlobStore>,
    pub config: Arc<AppConfig>,
}
