use std::path::{Path, PathBuf};
use std::sync::Arc;

use blob_store::{BlobStore, UploadOptions};
use chrono::Utc;

use crate::failover::ReadPolicy;
use crate::monitor::MonitorPolicy;
use crate::store::endpoints::AccountEndpoints;
use crate::workflow::FailurePolicy;

/// How the uploaded blob is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BlobNaming {
    /// Same name as the source file.
    #[default]
    Fixed,
    /// `newblob<unix-millis>`.
    Timestamped,
}

impl BlobNaming {
    pub fn blob_name(&self, source: &Path, now_millis: i64) -> String {
        match self {
            BlobNaming::Fixed => source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| source.display().to_string()),
            BlobNaming::Timestamped => format!("newblob{now_millis}"),
        }
    }
}

pub fn container_name(now_millis: i64) -> String {
    format!("newcontainer{now_millis}")
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// Representation of one demo run. Built once and threaded through every workflow
// instead of living in globals.
pub struct WorkflowContext {
    pub primary: Arc<dyn BlobStore>,
    pub secondary: Arc<dyn BlobStore>,
    pub endpoints: AccountEndpoints,
    pub container: String,
    pub blob: String,
    pub source: PathBuf,
    pub upload_options: UploadOptions,
    pub read_policy: ReadPolicy,
    pub monitor_policy: MonitorPolicy,
    pub on_upload_failure: FailurePolicy,
}

impl WorkflowContext {
    /// A context with default policies whose container and blob names derive from `now_millis`.
    pub fn new(
        primary: Arc<dyn BlobStore>,
        secondary: Arc<dyn BlobStore>,
        endpoints: AccountEndpoints,
        source: PathBuf,
        naming: BlobNaming,
        now_millis: i64,
    ) -> Self {
        Self {
            primary,
            secondary,
            endpoints,
            container: container_name(now_millis),
            blob: naming.blob_name(&source, now_millis),
            source,
            upload_options: UploadOptions::default(),
            read_policy: ReadPolicy::default(),
            monitor_policy: MonitorPolicy::default(),
            on_upload_failure: FailurePolicy::default(),
        }
    }

    pub fn with_upload_options(mut self, options: UploadOptions) -> Self {
        self.upload_options = options;
        self
    }

    pub fn with_read_policy(mut self, policy: ReadPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    pub fn with_monitor_policy(mut self, policy: MonitorPolicy) -> Self {
        self.monitor_policy = policy;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_upload_failure = policy;
        self
    }
}
