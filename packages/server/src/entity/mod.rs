pub mod gallery_image;
pub mod image_tag;
