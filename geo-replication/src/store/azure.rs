use std::fmt;
use std::ops::Range;

use async_trait::async_trait;
use azure_core::error::ErrorKind;
use azure_core::{Body, StatusCode};
use azure_storage::{CloudLocation, StorageCredentials};
use azure_storage_blobs::prelude::*;
use blob_store::{blob_url, BlobItem, BlobStore, Download, StoreError, StoreResult, UploadOptions};
use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};
use url::Url;

/// A `BlobStore` backed by one Azure Blob Storage endpoint.
///
/// The primary and the read-only secondary endpoint of an RA-GRS account are two
/// separate instances signed with the same shared key.
#[derive(Clone)]
pub struct AzureBlobStore {
    service: BlobServiceClient,
    endpoint: Url,
}

impl AzureBlobStore {
    pub fn new(account: &str, access_key: &str, endpoint: Url) -> Self {
        let credentials = StorageCredentials::access_key(account.to_string(), access_key.to_string());
        let location = CloudLocation::Custom {
            account: account.to_string(),
            uri: endpoint.as_str().trim_end_matches('/').to_string(),
        };
        let service = ClientBuilder::with_location(location, credentials).blob_service_client();
        Self { service, endpoint }
    }

    fn blob_client(&self, container: &str, blob: &str) -> BlobClient {
        self.service.container_client(container).blob_client(blob)
    }
}

impl fmt::Debug for AzureBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureBlobStore")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

/// Splits `len` bytes into consecutive ranges of at most `block_size` bytes.
pub(crate) fn block_ranges(len: usize, block_size: usize) -> Vec<Range<usize>> {
    let block_size = block_size.max(1);
    (0..len)
        .step_by(block_size)
        .map(|start| start..(start + block_size).min(len))
        .collect()
}

/// Block ids must all have the same length within one blob.
fn block_id(index: usize) -> String {
    format!("block-{index:08}")
}

pub(crate) fn map_azure_error(err: azure_core::Error) -> StoreError {
    match err.kind() {
        ErrorKind::HttpResponse { status, error_code } => {
            let code = error_code.clone();
            match status {
                StatusCode::NotFound => StoreError::NotFound { code },
                StatusCode::Unauthorized | StatusCode::Forbidden => StoreError::AuthFailed { code },
                StatusCode::Conflict => StoreError::Conflict { code },
                StatusCode::RequestTimeout | StatusCode::TooManyRequests => StoreError::Unavailable {
                    code,
                    message: err.to_string(),
                },
                s if s.is_server_error() => StoreError::Unavailable {
                    code,
                    message: err.to_string(),
                },
                _ => StoreError::Rejected {
                    code,
                    message: err.to_string(),
                },
            }
        }
        ErrorKind::Credential => StoreError::AuthFailed { code: None },
        ErrorKind::DataConversion => StoreError::Malformed(err.to_string()),
        _ => StoreError::Unavailable {
            code: None,
            message: err.to_string(),
        },
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn create_container(&self, container: &str) -> StoreResult<()> {
        self.service
            .container_client(container)
            .create()
            .await
            .map_err(map_azure_error)?;
        Ok(())
    }

    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StoreResult<()> {
        let blob_client = self.blob_client(container, blob);
        let data = Bytes::from(data);

        if data.len() <= options.block_size {
            tracing::debug!("uploading {} bytes to {blob} in a single request", data.len());
            blob_client
                .put_block_blob(Body::from(data))
                .await
                .map_err(map_azure_error)?;
            return Ok(());
        }

        let ranges = block_ranges(data.len(), options.block_size);
        tracing::debug!(
            "staging {} blocks of {} bytes for {blob}, {} at a time",
            ranges.len(),
            options.block_size,
            options.concurrency
        );

        // `buffered` keeps the ids in block order for the commit below.
        let block_ids: Vec<String> = stream::iter(ranges.into_iter().enumerate())
            .map(|(index, range)| {
                let blob_client = blob_client.clone();
                let chunk = data.slice(range);
                async move {
                    let id = block_id(index);
                    blob_client
                        .put_block(id.clone(), Body::from(chunk))
                        .await
                        .map_err(map_azure_error)?;
                    Ok::<_, StoreError>(id)
                }
            })
            .buffered(options.concurrency.max(1))
            .try_collect()
            .await?;

        let block_list = BlockList {
            blocks: block_ids
                .into_iter()
                .map(|id| BlobBlockType::Latest(BlockId::from(id)))
                .collect(),
        };
        blob_client
            .put_block_list(block_list)
            .await
            .map_err(map_azure_error)?;
        Ok(())
    }

    async fn list_blobs(&self, container: &str) -> StoreResult<Vec<BlobItem>> {
        let mut pages = self.service.container_client(container).list_blobs().into_stream();
        let Some(page) = pages.next().await else {
            return Ok(Vec::new());
        };
        let page = page.map_err(map_azure_error)?;
        Ok(page
            .blobs
            .blobs()
            .map(|blob| BlobItem {
                name: blob.name.clone(),
                content_length: blob.properties.content_length,
            })
            .collect())
    }

    async fn download_blob(&self, container: &str, blob: &str) -> StoreResult<Download> {
        let data = self
            .blob_client(container, blob)
            .get_content()
            .await
            .map_err(map_azure_error)?;
        Ok(Download {
            url: blob_url(&self.endpoint, container, blob)?,
            data,
        })
    }

    async fn delete_container(&self, container: &str) -> StoreResult<()> {
        self.service
            .container_client(container)
            .delete()
            .await
            .map_err(map_azure_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_ranges() {
        assert_eq!(block_ranges(10, 4), vec![0..4, 4..8, 8..10]);
        assert_eq!(block_ranges(8, 4), vec![0..4, 4..8]);
        assert_eq!(block_ranges(3, 4), vec![0..3]);
        assert!(block_ranges(0, 4).is_empty());
    }

    #[test]
    fn test_block_ids_have_equal_length() {
        assert_eq!(block_id(0).len(), block_id(12_345).len());
        assert!(block_id(1) < block_id(2));
    }

    #[test]
    fn test_map_http_errors() {
        let not_found = azure_core::Error::new(
            ErrorKind::HttpResponse {
                status: StatusCode::NotFound,
                error_code: Some("ContainerNotFound".to_string()),
            },
            "container missing",
        );
        let mapped = map_azure_error(not_found);
        assert!(mapped.is_not_found());
        assert_eq!(mapped.code(), Some("ContainerNotFound"));

        let forbidden = azure_core::Error::new(
            ErrorKind::HttpResponse {
                status: StatusCode::Forbidden,
                error_code: Some("AuthenticationFailed".to_string()),
            },
            "bad key",
        );
        assert!(matches!(map_azure_error(forbidden), StoreError::AuthFailed { .. }));

        let busy = azure_core::Error::new(
            ErrorKind::HttpResponse {
                status: StatusCode::ServiceUnavailable,
                error_code: Some("ServerBusy".to_string()),
            },
            "busy",
        );
        assert!(map_azure_error(busy).is_retryable());

        let bad_request = azure_core::Error::new(
            ErrorKind::HttpResponse {
                status: StatusCode::BadRequest,
                error_code: Some("InvalidQueryParameterValue".to_string()),
            },
            "bad request",
        );
        assert!(matches!(map_azure_error(bad_request), StoreError::Rejected { .. }));
    }

    #[test]
    fn test_map_transport_errors() {
        let io = azure_core::Error::new(ErrorKind::Io, "connection reset");
        assert!(map_azure_error(io).is_retryable());

        let garbled = azure_core::Error::new(ErrorKind::DataConversion, "not xml");
        assert!(matches!(map_azure_error(garbled), StoreError::Malformed(_)));
    }
}
