mod error;
mod traits;

pub mod connection;
pub mod filesystem;
pub mod http;
pub mod name;

pub use connection::ConnectionString;
pub use error::StorageError;
pub use filesystem::FilesystemBlobStore;
pub use http::{HttpBlobStore, TransferOptions};
pub use traits::{BlobStore, PublicAccess, StoredBlob};
