pub mod local_store;
pub mod store;

pub use local_store::LocalFileBlobStore;
pub use store::{
    blob_url, BlobItem, BlobStore, Download, StoreError, StoreResult, UploadOptions,
    DEFAULT_BLOCK_SIZE, DEFAULT_UPLOAD_CONCURRENCY,
};
