use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

pub type StoreResult<T> = Result<T, StoreError>;

/// Default block size used when staging a block blob (4 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Default number of blocks staged concurrently.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 20;

/// Errors returned by a [`BlobStore`].
///
/// Service-side failures carry the service error code (`ContainerNotFound`,
/// `AuthenticationFailed`, ...) when the service sent one.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found ({})", display_code(.code))]
    NotFound { code: Option<String> },

    #[error("authentication failed ({})", display_code(.code))]
    AuthFailed { code: Option<String> },

    #[error("conflict ({})", display_code(.code))]
    Conflict { code: Option<String> },

    #[error("request rejected ({}): {message}", display_code(.code))]
    Rejected { code: Option<String>, message: String },

    #[error("service unavailable ({}): {message}", display_code(.code))]
    Unavailable { code: Option<String>, message: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed response: {0}")]
    Malformed(String),
}

fn display_code(code: &Option<String>) -> &str {
    code.as_deref().unwrap_or("no error code")
}

impl StoreError {
    pub fn not_found(code: &str) -> Self {
        StoreError::NotFound { code: Some(code.to_string()) }
    }

    pub fn conflict(code: &str) -> Self {
        StoreError::Conflict { code: Some(code.to_string()) }
    }

    /// The service error code, if the failure came with one.
    pub fn code(&self) -> Option<&str> {
        match self {
            StoreError::NotFound { code }
            | StoreError::AuthFailed { code }
            | StoreError::Conflict { code }
            | StoreError::Rejected { code, .. }
            | StoreError::Unavailable { code, .. } => code.as_deref(),
            StoreError::Timeout(_) | StoreError::Io(_) | StoreError::Malformed(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound { .. } => true,
            StoreError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Unavailable { .. } | StoreError::Timeout(_) => true,
            StoreError::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            ),
            _ => false,
        }
    }
}

/// One entry of a container listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    pub name: String,
    pub content_length: u64,
}

/// The result of reading a blob.
#[derive(Debug, Clone)]
pub struct Download {
    /// URL of the request that actually served the read.
    pub url: Url,
    pub data: Vec<u8>,
}

/// Parameters for staging a block blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    /// Size of each staged block in bytes.
    pub block_size: usize,
    /// Maximum number of blocks in flight at once.
    pub concurrency: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            concurrency: DEFAULT_UPLOAD_CONCURRENCY,
        }
    }
}

/// Builds the URL of `blob` inside `container` under `endpoint`.
pub fn blob_url(endpoint: &Url, container: &str, blob: &str) -> StoreResult<Url> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|_| StoreError::Malformed(format!("{endpoint} cannot carry a path")))?
        .pop_if_empty()
        .push(container)
        .push(blob);
    Ok(url)
}

/// Capability surface of a single storage endpoint (primary or secondary replica).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Base URL of the endpoint this store talks to.
    fn endpoint(&self) -> &Url;

    async fn create_container(&self, container: &str) -> StoreResult<()>;

    /// Uploads `data` as a block blob named `blob` inside `container`.
    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StoreResult<()>;

    /// Lists the blobs of `container`. One call issues exactly one listing request.
    async fn list_blobs(&self, container: &str) -> StoreResult<Vec<BlobItem>>;

    async fn download_blob(&self, container: &str, blob: &str) -> StoreResult<Download>;

    /// Deletes `container` together with every blob it owns.
    async fn delete_container(&self, container: &str) -> StoreResult<()>;
}
