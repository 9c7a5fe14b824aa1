use std::time::Duration;

use blob_store::{BlobStore, Download, StoreError, StoreResult};

use crate::retry::Backoff;

/// Retry options applied to reads against an RA-GRS account.
///
/// Odd-numbered tries go to the primary endpoint and even-numbered tries to the
/// secondary one. A secondary `NotFound` takes the secondary out of rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    pub max_tries: u32,
    pub try_timeout: Duration,
    pub retry_delay: Duration,
    pub max_retry_delay: Duration,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            max_tries: 3,
            try_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(1),
        }
    }
}

impl ReadPolicy {
    fn backoff(&self) -> Backoff {
        Backoff {
            initial: self.retry_delay,
            max: self.max_retry_delay,
            multiplier: 2,
        }
    }
}

/// Downloads `blob`, alternating between the primary and the secondary endpoint on failure.
pub async fn read_with_failover(
    primary: &dyn BlobStore,
    secondary: &dyn BlobStore,
    container: &str,
    blob: &str,
    policy: &ReadPolicy,
) -> StoreResult<Download> {
    let backoff = policy.backoff();
    let mut secondary_has_404 = false;
    let mut primary_retries = 0;
    let mut last_error = None;

    for attempt in 1..=policy.max_tries.max(1) {
        let use_primary = secondary_has_404 || attempt % 2 == 1;
        let store = if use_primary {
            if attempt > 1 {
                backoff.wait(primary_retries).await;
                primary_retries += 1;
            }
            primary
        } else {
            secondary
        };

        let result = tokio::time::timeout(policy.try_timeout, store.download_blob(container, blob))
            .await
            .unwrap_or_else(|_| Err(StoreError::Timeout(policy.try_timeout)));

        match result {
            Ok(download) => return Ok(download),
            Err(e) if !use_primary && e.is_not_found() => {
                tracing::warn!("blob {container}/{blob} not on secondary yet, reading from primary only");
                secondary_has_404 = true;
                last_error = Some(e);
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    "read {attempt}/{} from {} failed: {e}",
                    policy.max_tries,
                    store.endpoint()
                );
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or(StoreError::Timeout(policy.try_timeout)))
}
