use tokio::io::AsyncWrite;
use url::Url;

use crate::app::WorkflowContext;
use crate::errors::{MonitorError, WorkflowError};
use crate::failover::read_with_failover;
use crate::monitor::{ReplicationMonitor, ReplicationReport};
use crate::store::endpoints::Endpoint;

/// What to do when creating the container or uploading the blob fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FailurePolicy {
    /// Log the failure and go on to the replication check anyway.
    #[default]
    BestEffort,
    /// Stop the run.
    FailFast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadReport {
    pub container_created: bool,
    pub blob_uploaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub served_by: Endpoint,
    pub url: Url,
    pub bytes: usize,
}

/// Creates the container on the primary endpoint and uploads the source file into it.
///
/// Under `FailurePolicy::BestEffort` failures are logged and reported as `Ok` with the
/// corresponding flag unset; under `FailFast` they are returned.
pub async fn upload_blob(ctx: &WorkflowContext) -> Result<UploadReport, WorkflowError> {
    let mut report = UploadReport::default();

    if let Err(e) = ctx.primary.create_container(&ctx.container).await {
        tracing::error!("failed to create container {}: {e}", ctx.container);
        return best_effort(
            ctx,
            report,
            WorkflowError::CreateContainer {
                container: ctx.container.clone(),
                source: e,
            },
        );
    }
    report.container_created = true;
    tracing::info!("Created container successfully: {}", ctx.container);

    let data = match tokio::fs::read(&ctx.source).await {
        Ok(data) => data,
        Err(e) => {
            tracing::error!("failed to read {}: {e}", ctx.source.display());
            return best_effort(
                ctx,
                report,
                WorkflowError::Source {
                    path: ctx.source.clone(),
                    source: e,
                },
            );
        }
    };

    if let Err(e) = ctx
        .primary
        .upload_blob(&ctx.container, &ctx.blob, data, &ctx.upload_options)
        .await
    {
        tracing::error!("failed to upload blob {}: {e}", ctx.blob);
        return best_effort(
            ctx,
            report,
            WorkflowError::Upload {
                blob: ctx.blob.clone(),
                source: e,
            },
        );
    }
    report.blob_uploaded = true;
    tracing::info!("Uploaded blob: {}", ctx.blob);

    Ok(report)
}

fn best_effort(
    ctx: &WorkflowContext,
    report: UploadReport,
    err: WorkflowError,
) -> Result<UploadReport, WorkflowError> {
    match ctx.on_upload_failure {
        FailurePolicy::BestEffort => Ok(report),
        FailurePolicy::FailFast => Err(err),
    }
}

/// Blocks until the blob is listed by the secondary endpoint or the monitor gives up.
///
/// Each attempt's progress line is also written to `console`.
pub async fn confirm_replication<W>(ctx: &WorkflowContext, console: &mut W) -> Result<ReplicationReport, MonitorError>
where
    W: AsyncWrite + Unpin + Send,
{
    tracing::info!("Checking to see if container and blob have replicated to secondary region.");
    ReplicationMonitor::new(ctx.secondary.clone(), ctx.container.clone(), ctx.monitor_policy)
        .check_replication_to(console)
        .await
}

/// Reads the blob through the failover policy and reports which endpoint served it.
pub async fn download_blob(ctx: &WorkflowContext) -> Result<DownloadReport, WorkflowError> {
    let download = read_with_failover(
        ctx.primary.as_ref(),
        ctx.secondary.as_ref(),
        &ctx.container,
        &ctx.blob,
        &ctx.read_policy,
    )
    .await
    .map_err(|source| WorkflowError::Download {
        blob: ctx.blob.clone(),
        source,
    })?;

    let served_by = ctx.endpoints.served_by(&download.url);
    tracing::debug!("read {} bytes from {}", download.data.len(), download.url);
    Ok(DownloadReport {
        served_by,
        bytes: download.data.len(),
        url: download.url,
    })
}

/// Deletes the container, and with it the blob, from the primary endpoint.
pub async fn delete_container(ctx: &WorkflowContext) -> Result<(), WorkflowError> {
    match ctx.primary.delete_container(&ctx.container).await {
        Ok(()) => {
            tracing::info!("Deleted container {}", ctx.container);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Unable to delete storage container: {e}");
            Err(WorkflowError::Teardown {
                container: ctx.container.clone(),
                source: e,
            })
        }
    }
}
