use thiserror::Error;
use tokio::task::JoinError;

use geo_replication::SessionError;

#[derive(Debug, Error)]
pub enum DemoErr {
    #[error("{0} must be set")]
    MissingSetting(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(&'static str),

    #[error("cannot derive blob endpoints for account {account}")]
    Endpoint {
        account: String,
        #[source]
        source: url::ParseError,
    },

    #[error("interactive session failed")]
    Session(#[from] SessionError),

    #[error("session worker stopped unexpectedly")]
    Worker(#[from] JoinError),
}
