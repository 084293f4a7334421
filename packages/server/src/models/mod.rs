pub mod gallery;
pub mod image;
pub mod paging;
