use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::*;
use tracing::{debug, instrument};
use url::Url;

use crate::entity::{gallery_image, image_tag};
use crate::models::image::GalleryImage;

/// Delimiter between tags in user-entered tag text.
pub const TAG_DELIMITER: &str = ", ";

/// Split tag text on `", "`. Segments are kept as-is: no trimming, no
/// deduplication, empty segments included.
pub fn parse_tags(text: &str) -> Vec<String> {
    text.split(TAG_DELIMITER).map(str::to_string).collect()
}

/// Image records and their tags.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Every image, newest first, tags loaded.
    async fn get_all(&self) -> Result<Vec<GalleryImage>, DbErr>;

    /// Page `page_number` (1-based; 0 is treated as 1) of the newest-first
    /// order. Pages past the end are empty.
    async fn get_all_with_paging(
        &self,
        page_number: u64,
        page_size: u64,
    ) -> Result<Vec<GalleryImage>, DbErr> {
        let skip = page_size.saturating_mul(page_number.saturating_sub(1));
        self.range(skip, page_size).await
    }

    /// Raw window over the newest-first order.
    async fn range(&self, skip: u64, take: u64) -> Result<Vec<GalleryImage>, DbErr>;

    async fn get_by_id(&self, id: i32) -> Result<Option<GalleryImage>, DbErr>;

    /// Images carrying `tag` exactly, in `get_all` order.
    async fn get_with_tag(&self, tag: &str) -> Result<Vec<GalleryImage>, DbErr> {
        let images = self.get_all().await?;
        Ok(images.into_iter().filter(|i| i.has_tag(tag)).collect())
    }

    fn parse_tags(&self, text: &str) -> Vec<String> {
        parse_tags(text)
    }

    /// Create an image stamped with the current time.
    async fn set_image(&self, title: &str, tags_text: &str, uri: &Url)
    -> Result<GalleryImage, DbErr>;

    /// Overwrite every field and the tag set. `None` if the id is unknown.
    async fn update_image(&self, image: &GalleryImage) -> Result<Option<GalleryImage>, DbErr>;

    /// Remove an image and its tags, returning what was removed.
    async fn delete_image(&self, id: i32) -> Result<Option<GalleryImage>, DbErr>;
}

/// [`ImageRepository`] over a SeaORM connection.
#[derive(Clone)]
pub struct ImageService {
    db: DatabaseConnection,
}

impl ImageService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn newest_first() -> Select<gallery_image::Entity> {
        gallery_image::Entity::find()
            .order_by_desc(gallery_image::Column::Created)
            .order_by_desc(gallery_image::Column::Id)
    }
}

/// Attach tags to already-ordered image rows.
async fn with_tags<C: ConnectionTrait>(
    conn: &C,
    images: Vec<gallery_image::Model>,
) -> Result<Vec<GalleryImage>, DbErr> {
    if images.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = images.iter().map(|i| i.id).collect();
    let mut tags_by_image: HashMap<i32, Vec<image_tag::Model>> = HashMap::new();
    for tag in image_tag::Entity::find()
        .filter(image_tag::Column::GalleryImageId.is_in(ids))
        .order_by_asc(image_tag::Column::Id)
        .all(conn)
        .await?
    {
        tags_by_image
            .entry(tag.gallery_image_id)
            .or_default()
            .push(tag);
    }

    Ok(images
        .into_iter()
        .map(|image| {
            let tags = tags_by_image.remove(&image.id).unwrap_or_default();
            GalleryImage::from_models(image, tags)
        })
        .collect())
}

async fn find_image<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<Option<GalleryImage>, DbErr> {
    match gallery_image::Entity::find_by_id(id).one(conn).await? {
        Some(model) => Ok(with_tags(conn, vec![model]).await?.pop()),
        None => Ok(None),
    }
}

async fn insert_tags<C: ConnectionTrait>(
    conn: &C,
    image_id: i32,
    descriptions: &[String],
) -> Result<(), DbErr> {
    for description in descriptions {
        image_tag::ActiveModel {
            description: Set(description.clone()),
            gallery_image_id: Set(image_id),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl ImageRepository for ImageService {
    #[instrument(skip(self))]
    async fn get_all(&self) -> Result<Vec<GalleryImage>, DbErr> {
        let images = Self::newest_first().all(&self.db).await?;
        with_tags(&self.db, images).await
    }

    #[instrument(skip(self))]
    async fn range(&self, skip: u64, take: u64) -> Result<Vec<GalleryImage>, DbErr> {
        let images = Self::newest_first()
            .offset(Some(skip))
            .limit(Some(take))
            .all(&self.db)
            .await?;
        with_tags(&self.db, images).await
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: i32) -> Result<Option<GalleryImage>, DbErr> {
        find_image(&self.db, id).await
    }

    #[instrument(skip(self, uri), fields(uri = %uri))]
    async fn set_image(
        &self,
        title: &str,
        tags_text: &str,
        uri: &Url,
    ) -> Result<GalleryImage, DbErr> {
        let txn = self.db.begin().await?;

        let image = gallery_image::ActiveModel {
            title: Set(title.to_string()),
            url: Set(uri.to_string()),
            created: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        insert_tags(&txn, image.id, &parse_tags(tags_text)).await?;

        let stored = find_image(&txn, image.id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("gallery_image {}", image.id)))?;
        txn.commit().await?;

        debug!(id = stored.id, tags = stored.tags.len(), "Stored image");
        Ok(stored)
    }

    #[instrument(skip(self, image), fields(id = image.id))]
    async fn update_image(&self, image: &GalleryImage) -> Result<Option<GalleryImage>, DbErr> {
        let txn = self.db.begin().await?;

        if gallery_image::Entity::find_by_id(image.id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Ok(None);
        }

        gallery_image::ActiveModel {
            id: Unchanged(image.id),
            title: Set(image.title.clone()),
            url: Set(image.url.clone()),
            created: Set(image.created),
            ..Default::default()
        }
        .update(&txn)
        .await?;

        image_tag::Entity::delete_many()
            .filter(image_tag::Column::GalleryImageId.eq(image.id))
            .exec(&txn)
            .await?;
        let descriptions: Vec<String> = image.tags.iter().map(|t| t.description.clone()).collect();
        insert_tags(&txn, image.id, &descriptions).await?;

        let updated = find_image(&txn, image.id).await?;
        txn.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_image(&self, id: i32) -> Result<Option<GalleryImage>, DbErr> {
        let txn = self.db.begin().await?;

        let Some(image) = find_image(&txn, id).await? else {
            return Ok(None);
        };

        image_tag::Entity::delete_many()
            .filter(image_tag::Column::GalleryImageId.eq(id))
            .exec(&txn)
            .await?;
        gallery_image::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(Some(image))
    }
}
