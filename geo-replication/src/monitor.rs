use std::sync::Arc;
use std::time::Duration;

use blob_store::{BlobItem, BlobStore, StoreError, StoreResult};
use futures::{stream, Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::errors::MonitorError;
use crate::retry::Backoff;

/// Why the secondary does not show the upload yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    /// The container is visible but lists no blobs.
    BlobMissing,
    /// The listing failed because the container itself is not visible yet.
    ContainerMissing { code: Option<String> },
}

/// Outcome of one listing against the secondary endpoint.
#[derive(Debug)]
pub enum Probe {
    Replicated { blobs: usize },
    NotYetReplicated(Pending),
    /// The listing failed in a way that may clear up on its own.
    Transient(StoreError),
    /// The listing failed in a way no amount of polling will fix.
    Fatal(StoreError),
}

impl Probe {
    pub fn classify(result: StoreResult<Vec<BlobItem>>) -> Self {
        match result {
            Ok(items) if !items.is_empty() => Probe::Replicated { blobs: items.len() },
            Ok(_) => Probe::NotYetReplicated(Pending::BlobMissing),
            Err(e) if e.is_not_found() => Probe::NotYetReplicated(Pending::ContainerMissing {
                code: e.code().map(str::to_string),
            }),
            Err(e) if e.is_retryable() => Probe::Transient(e),
            Err(e) => Probe::Fatal(e),
        }
    }

    /// Whether polling stops after this probe.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Probe::Replicated { .. } | Probe::Fatal(_))
    }
}

/// One numbered poll of the secondary endpoint. Numbering starts at 0.
#[derive(Debug)]
pub struct Attempt {
    pub index: u32,
    pub probe: Probe,
}

impl Attempt {
    pub fn describe(&self, container: &str) -> String {
        let index = self.index;
        match &self.probe {
            Probe::Replicated { .. } => format!("[{index}] Blob has replicated to secondary region."),
            Probe::NotYetReplicated(Pending::BlobMissing) => {
                format!("[{index}] Container found, but blob has not replicated to secondary region yet.")
            }
            Probe::NotYetReplicated(Pending::ContainerMissing { code }) => format!(
                "[{index}] Container has not replicated to secondary region yet: {container} : {}",
                code.as_deref().unwrap_or("unknown")
            ),
            Probe::Transient(e) => format!("[{index}] Listing secondary region failed, retrying: {e}"),
            Probe::Fatal(e) => format!("[{index}] Listing secondary region failed permanently: {e}"),
        }
    }
}

/// How long and how hard to poll the secondary endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorPolicy {
    /// Delay between consecutive polls. `Backoff::none()` busy-polls.
    pub backoff: Backoff,
    pub max_attempts: Option<u32>,
    pub timeout: Option<Duration>,
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self {
            backoff: Backoff {
                initial: Duration::from_millis(250),
                max: Duration::from_secs(5),
                multiplier: 2,
            },
            max_attempts: None,
            timeout: Some(Duration::from_secs(30 * 60)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationReport {
    /// Number of listings issued, including the successful one.
    pub attempts: u32,
    pub blobs: usize,
}

/// Polls the secondary endpoint until an uploaded blob shows up there.
pub struct ReplicationMonitor {
    secondary: Arc<dyn BlobStore>,
    container: String,
    policy: MonitorPolicy,
}

impl ReplicationMonitor {
    pub fn new(secondary: Arc<dyn BlobStore>, container: impl Into<String>, policy: MonitorPolicy) -> Self {
        Self {
            secondary,
            container: container.into(),
            policy,
        }
    }

    /// Stream of poll attempts. Issues one listing per item, waits the policy's backoff
    /// between items and ends after a terminal probe.
    ///
    /// The stream is unbounded otherwise; cap it with `take` or a timeout.
    pub fn attempts(&self) -> impl Stream<Item = Attempt> + Send + '_ {
        stream::unfold((0u32, false), move |(index, finished)| async move {
            if finished {
                return None;
            }
            if index > 0 {
                self.policy.backoff.wait(index - 1).await;
            }
            let probe = Probe::classify(self.secondary.list_blobs(&self.container).await);
            let finished = probe.is_terminal();
            Some((Attempt { index, probe }, (index + 1, finished)))
        })
    }

    /// Polls until the blob is visible on the secondary, a fatal error occurs, or the
    /// policy's attempt cap or timeout is reached.
    pub async fn check_replication(&self) -> Result<ReplicationReport, MonitorError> {
        self.check_replication_to(&mut tokio::io::sink()).await
    }

    /// Like [`Self::check_replication`], and also writes each attempt's `[n]` line to
    /// `console` regardless of the log filter.
    pub async fn check_replication_to<W>(&self, console: &mut W) -> Result<ReplicationReport, MonitorError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let run = async {
            let cap = self.policy.max_attempts.map_or(usize::MAX, |max| max as usize);
            let attempts = self.attempts().take(cap);
            futures::pin_mut!(attempts);

            let mut made = 0;
            while let Some(attempt) = attempts.next().await {
                made += 1;
                self.report(&attempt, &mut *console).await;
                match attempt.probe {
                    Probe::Replicated { blobs } => return Ok(ReplicationReport { attempts: made, blobs }),
                    Probe::Fatal(source) => {
                        return Err(MonitorError::Fatal {
                            attempt: attempt.index,
                            source,
                        })
                    }
                    Probe::NotYetReplicated(_) | Probe::Transient(_) => {}
                }
            }
            Err(MonitorError::AttemptsExhausted { attempts: made })
        };

        match self.policy.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| MonitorError::TimedOut(limit))?,
            None => run.await,
        }
    }

    async fn report<W>(&self, attempt: &Attempt, console: &mut W)
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut line = attempt.describe(&self.container);
        match attempt.probe {
            Probe::Fatal(_) => tracing::error!("{line}"),
            Probe::Transient(_) => tracing::warn!("{line}"),
            _ => tracing::info!("{line}"),
        }
        line.push('\n');
        let echoed = async {
            console.write_all(line.as_bytes()).await?;
            console.flush().await
        };
        if let Err(e) = echoed.await {
            tracing::warn!("failed to echo replication progress: {e}");
        }
    }
}
