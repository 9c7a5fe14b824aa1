use std::path::PathBuf;
use std::time::Duration;

use blob_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("listing the secondary region failed permanently on attempt {attempt}")]
    Fatal {
        attempt: u32,
        #[source]
        source: StoreError,
    },

    #[error("blob did not replicate to the secondary region within {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    #[error("blob did not replicate to the secondary region within {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("failed to read upload source {}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create container {container}")]
    CreateContainer {
        container: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to upload blob {blob}")]
    Upload {
        blob: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to download blob {blob}")]
    Download {
        blob: String,
        #[source]
        source: StoreError,
    },

    #[error("unable to delete storage container {container}")]
    Teardown {
        container: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is not ready for commands yet")]
    NotReady,

    #[error("session has terminated")]
    Closed,

    #[error("failed to write to the console")]
    Console(#[from] std::io::Error),

    #[error("failed to read commands")]
    Input(#[source] std::io::Error),
}

/// Renders an error followed by each of its sources, separated by `": "`.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
