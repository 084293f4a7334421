use common::storage::BlobStore;
use tracing::info;

use crate::services::image::ImageRepository;

/// Sample records inserted into an empty gallery: (title, tags, blob name).
const SAMPLE_IMAGES: &[(&str, &str, &str)] = &[
    ("Sunset", "beach, evening", "sunset.jpg"),
    ("Mountain Lake", "mountains, water", "mountain-lake.jpg"),
    ("City Lights", "city, night", "city-lights.jpg"),
    ("Forest Path", "forest, morning", "forest-path.jpg"),
];

/// Seed sample images when the gallery is empty. Returns how many were added.
pub async fn seed_images(
    images: &dyn ImageRepository,
    store: &dyn BlobStore,
    container: &str,
) -> anyhow::Result<usize> {
    if !images.range(0, 1).await?.is_empty() {
        return Ok(0);
    }

    for &(title, tags, name) in SAMPLE_IMAGES {
        let uri = store.blob_url(container, name)?;
        images.set_image(title, tags, &uri).await?;
    }

    info!("Seeded {} sample images", SAMPLE_IMAGES.len());
    Ok(SAMPLE_IMAGES.len())
}
