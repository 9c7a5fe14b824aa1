use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use url::Url;

use crate::store::{blob_url, BlobItem, BlobStore, Download, StoreError, StoreResult, UploadOptions};

/// A `BlobStore` that keeps containers as directories and blobs as files under `root`.
///
/// `endpoint` is only used to label downloads; two stores sharing one root behave
/// like an account whose secondary has already caught up with its primary.
#[derive(Clone, Debug)]
pub struct LocalFileBlobStore {
    root: PathBuf,
    endpoint: Url,
}

impl LocalFileBlobStore {
    pub fn new(root: PathBuf, endpoint: Url) -> Self {
        Self { root, endpoint }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_path(&self, container: &str) -> PathBuf {
        self.root.join(container)
    }

    async fn require_container(&self, container: &str) -> StoreResult<PathBuf> {
        let path = self.container_path(container);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Ok(path),
            Ok(_) => Err(StoreError::not_found("ContainerNotFound")),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::not_found("ContainerNotFound")),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobStore for LocalFileBlobStore {
    fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn create_container(&self, container: &str) -> StoreResult<()> {
        fs::create_dir_all(&self.root).await?;
        match fs::create_dir(self.container_path(container)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::conflict("ContainerAlreadyExists")),
            Err(e) => Err(e.into()),
        }
    }

    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        data: Vec<u8>,
        _options: &UploadOptions,
    ) -> StoreResult<()> {
        let path = self.require_container(container).await?.join(blob);
        tracing::debug!("writing {} bytes to {}", data.len(), path.display());
        fs::write(path, data).await?;
        Ok(())
    }

    async fn list_blobs(&self, container: &str) -> StoreResult<Vec<BlobItem>> {
        let path = self.require_container(container).await?;
        let mut entries = fs::read_dir(path).await?;
        let mut items = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            items.push(BlobItem {
                name: entry.file_name().to_string_lossy().into_owned(),
                content_length: meta.len(),
            });
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn download_blob(&self, container: &str, blob: &str) -> StoreResult<Download> {
        let path = self.require_container(container).await?.join(blob);
        let data = match fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::not_found("BlobNotFound")),
            Err(e) => return Err(e.into()),
        };
        Ok(Download {
            url: blob_url(&self.endpoint, container, blob)?,
            data,
        })
    }

    async fn delete_container(&self, container: &str) -> StoreResult<()> {
        let path = self.require_container(container).await?;
        fs::remove_dir_all(path).await?;
        Ok(())
    }
}
