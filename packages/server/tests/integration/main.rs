mod common;
mod gallery;
mod upload;
