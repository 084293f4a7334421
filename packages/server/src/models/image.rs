use chrono::{DateTime, Utc};

use crate::entity::{gallery_image, image_tag};

/// An image record with its tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImage {
    pub id: i32,
    pub title: String,
    pub url: String,
    pub created: DateTime<Utc>,
    pub tags: Vec<ImageTag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTag {
    pub id: i32,
    pub description: String,
}

impl GalleryImage {
    pub fn from_models(image: gallery_image::Model, tags: Vec<image_tag::Model>) -> Self {
        Self {
            id: image.id,
            title: image.title,
            url: image.url,
            created: image.created,
            tags: tags.into_iter().map(ImageTag::from).collect(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.description == tag)
    }

    /// Tag descriptions joined back into the form they are typed in.
    pub fn tags_text(&self) -> String {
        self.tags
            .iter()
            .map(|t| t.description.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<image_tag::Model> for ImageTag {
    fn from(m: image_tag::Model) -> Self {
        Self {
            id: m.id,
            description: m.description,
        }
    }
}

/// What the detail and list views show for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryDetailModel {
    pub id: i32,
    pub title: String,
    pub created: DateTime<Utc>,
    pub url: String,
    pub tags: Vec<String>,
}

impl From<GalleryImage> for GalleryDetailModel {
    fn from(image: GalleryImage) -> Self {
        Self {
            id: image.id,
            title: image.title,
            created: image.created,
            url: image.url,
            tags: image.tags.into_iter().map(|t| t.description).collect(),
        }
    }
}
