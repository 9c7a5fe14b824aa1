use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use blob_store::{blob_url, BlobItem, BlobStore, Download, StoreError, StoreResult, UploadOptions};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use url::Url;

use crate::store::endpoints::AccountEndpoints;

pub(crate) const ACCOUNT: &str = "myaccount";

pub(crate) fn endpoints() -> AccountEndpoints {
    AccountEndpoints::public(ACCOUNT).unwrap()
}

pub(crate) fn item(name: &str) -> BlobItem {
    BlobItem {
        name: name.to_string(),
        content_length: 42,
    }
}

pub(crate) fn container_not_found() -> StoreError {
    StoreError::not_found("ContainerNotFound")
}

pub(crate) fn server_busy() -> StoreError {
    StoreError::Unavailable {
        code: Some("ServerBusy".to_string()),
        message: "503 Service Unavailable".to_string(),
    }
}

/// A `BlobStore` that replays scripted responses and records every call.
///
/// Once a script runs dry, listings return an empty container and downloads
/// succeed with a fixed payload.
pub(crate) struct ScriptedStore {
    endpoint: Url,
    listings: Mutex<VecDeque<StoreResult<Vec<BlobItem>>>>,
    downloads: Mutex<VecDeque<StoreResult<Vec<u8>>>>,
    create_error: Mutex<Option<StoreError>>,
    upload_error: Mutex<Option<StoreError>>,
    delete_error: Mutex<Option<StoreError>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedStore {
    pub(crate) fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            listings: Mutex::new(VecDeque::new()),
            downloads: Mutex::new(VecDeque::new()),
            create_error: Mutex::new(None),
            upload_error: Mutex::new(None),
            delete_error: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn primary() -> Self {
        Self::new(endpoints().primary)
    }

    pub(crate) fn secondary() -> Self {
        Self::new(endpoints().secondary)
    }

    pub(crate) fn with_listing(self, result: StoreResult<Vec<BlobItem>>) -> Self {
        self.listings.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn with_download(self, result: StoreResult<Vec<u8>>) -> Self {
        self.downloads.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn failing_create(self, err: StoreError) -> Self {
        *self.create_error.lock().unwrap() = Some(err);
        self
    }

    pub(crate) fn failing_upload(self, err: StoreError) -> Self {
        *self.upload_error.lock().unwrap() = Some(err);
        self
    }

    pub(crate) fn failing_delete(self, err: StoreError) -> Self {
        *self.delete_error.lock().unwrap() = Some(err);
        self
    }

    pub(crate) fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|call| call.starts_with(op)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BlobStore for ScriptedStore {
    fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn create_container(&self, container: &str) -> StoreResult<()> {
        self.record(format!("create:{container}"));
        match self.create_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        data: Vec<u8>,
        _options: &UploadOptions,
    ) -> StoreResult<()> {
        self.record(format!("upload:{container}/{blob}:{}", data.len()));
        match self.upload_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn list_blobs(&self, container: &str) -> StoreResult<Vec<BlobItem>> {
        self.record(format!("list:{container}"));
        self.listings.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn download_blob(&self, container: &str, blob: &str) -> StoreResult<Download> {
        self.record(format!("download:{container}/{blob}"));
        let data = self
            .downloads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(b"payload".to_vec()))?;
        Ok(Download {
            url: blob_url(&self.endpoint, container, blob)?,
            data,
        })
    }

    async fn delete_container(&self, container: &str) -> StoreResult<()> {
        self.record(format!("delete:{container}"));
        match self.delete_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Log lines emitted on the current thread while the guard is alive.
#[derive(Clone, Default)]
pub(crate) struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub(crate) fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub(crate) fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_level(false)
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}

/// A console whose reads and writes all fail.
pub(crate) struct BrokenPipe;

impl AsyncRead for BrokenPipe {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::ErrorKind::ConnectionReset.into()))
    }
}

impl AsyncWrite for BrokenPipe {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
