pub mod blobs;
pub mod gallery;
pub mod home;
pub mod upload;
