use std::path::PathBuf;
use std::time::Duration;

use blob_store::{UploadOptions, DEFAULT_BLOCK_SIZE, DEFAULT_UPLOAD_CONCURRENCY};
use clap::{Parser, ValueEnum};
use geo_replication::retry::Backoff;
use geo_replication::{AccountEndpoints, BackendConfig, BlobNaming, FailurePolicy, MonitorPolicy, ReadPolicy};
use url::Url;

use crate::errors::DemoErr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Azure,
    Local,
}

/// Uploads a blob to an RA-GRS storage account, waits for it to reach the
/// secondary region and reads it back.
#[derive(Parser, Debug)]
#[clap(version)]
pub struct Args {
    #[clap(long, env = "AZURE_STORAGE_ACCOUNT_NAME")]
    pub(crate) account_name: Option<String>,
    #[clap(long, env = "AZURE_STORAGE_ACCOUNT_ACCESS_KEY", hide_env_values = true)]
    pub(crate) account_key: Option<String>,

    /// File to upload.
    #[clap(long, default_value = "HelloWorld.png")]
    pub(crate) file: PathBuf,
    #[clap(long, value_enum, default_value_t = Backend::Azure)]
    pub(crate) backend: Backend,
    /// Directory backing both endpoints when `--backend local` is used.
    #[clap(long)]
    pub(crate) local_root: Option<PathBuf>,
    /// Overrides the primary blob endpoint, e.g. for an emulator.
    #[clap(long)]
    pub(crate) blob_endpoint: Option<Url>,
    #[clap(long)]
    pub(crate) secondary_blob_endpoint: Option<Url>,
    #[clap(long, value_enum, default_value_t = BlobNaming::Fixed)]
    pub(crate) blob_naming: BlobNaming,
    #[clap(long, value_enum, default_value_t = FailurePolicy::BestEffort)]
    pub(crate) on_upload_failure: FailurePolicy,

    #[clap(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    pub(crate) block_size: usize,
    #[clap(long, default_value_t = DEFAULT_UPLOAD_CONCURRENCY)]
    pub(crate) concurrency: usize,

    #[clap(long, default_value_t = 250)]
    pub(crate) poll_initial_delay_ms: u64,
    #[clap(long, default_value_t = 5000)]
    pub(crate) poll_max_delay_ms: u64,
    #[clap(long)]
    pub(crate) max_attempts: Option<u32>,
    /// 0 polls until the blob shows up.
    #[clap(long, default_value_t = 1800)]
    pub(crate) replication_timeout_secs: u64,

    #[clap(long, default_value_t = 3)]
    pub(crate) max_tries: u32,
    #[clap(long, default_value_t = 10_000)]
    pub(crate) try_timeout_ms: u64,
    #[clap(long, default_value_t = 500)]
    pub(crate) retry_delay_ms: u64,
    #[clap(long, default_value_t = 1000)]
    pub(crate) max_retry_delay_ms: u64,
}

impl Args {
    fn account(&self) -> Result<String, DemoErr> {
        match (self.backend, &self.account_name) {
            (_, Some(name)) if !name.is_empty() => Ok(name.clone()),
            (Backend::Azure, _) => Err(DemoErr::MissingSetting("AZURE_STORAGE_ACCOUNT_NAME")),
            (Backend::Local, _) => Ok("devstoreaccount1".to_string()),
        }
    }

    pub(crate) fn endpoints(&self) -> Result<AccountEndpoints, DemoErr> {
        let account = self.account()?;
        let endpoints = AccountEndpoints::public(&account).map_err(|source| DemoErr::Endpoint { account, source })?;
        Ok(endpoints.with_overrides(self.blob_endpoint.clone(), self.secondary_blob_endpoint.clone()))
    }

    pub(crate) fn backend_config(&self) -> Result<BackendConfig, DemoErr> {
        match self.backend {
            Backend::Azure => match &self.account_key {
                Some(key) if !key.is_empty() => Ok(BackendConfig::Azure { access_key: key.clone() }),
                _ => Err(DemoErr::MissingSetting("AZURE_STORAGE_ACCOUNT_ACCESS_KEY")),
            },
            Backend::Local => Ok(BackendConfig::Local {
                root: self
                    .local_root
                    .clone()
                    .unwrap_or_else(|| std::env::temp_dir().join("ragrs-demo")),
            }),
        }
    }

    pub(crate) fn upload_options(&self) -> Result<UploadOptions, DemoErr> {
        if self.block_size == 0 {
            return Err(DemoErr::Invalid("--block-size must be greater than zero"));
        }
        if self.concurrency == 0 {
            return Err(DemoErr::Invalid("--concurrency must be greater than zero"));
        }
        Ok(UploadOptions {
            block_size: self.block_size,
            concurrency: self.concurrency,
        })
    }

    pub(crate) fn monitor_policy(&self) -> Result<MonitorPolicy, DemoErr> {
        if self.max_attempts == Some(0) {
            return Err(DemoErr::Invalid("--max-attempts must be greater than zero"));
        }
        Ok(MonitorPolicy {
            backoff: Backoff {
                initial: Duration::from_millis(self.poll_initial_delay_ms),
                max: Duration::from_millis(self.poll_max_delay_ms),
                multiplier: 2,
            },
            max_attempts: self.max_attempts,
            timeout: match self.replication_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        })
    }

    pub(crate) fn read_policy(&self) -> Result<ReadPolicy, DemoErr> {
        if self.max_tries == 0 {
            return Err(DemoErr::Invalid("--max-tries must be greater than zero"));
        }
        Ok(ReadPolicy {
            max_tries: self.max_tries,
            try_timeout: Duration::from_millis(self.try_timeout_ms),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_retry_delay: Duration::from_millis(self.max_retry_delay_ms),
        })
    }
}
