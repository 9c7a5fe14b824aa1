#![allow(clippy::uninlined_format_args)]
#![deny(unused_qualifications)]

//! Walks an RA-GRS storage account through upload, replication check, failover
//! reads and teardown.

pub mod app;
pub mod errors;
pub mod failover;
pub mod monitor;
pub mod retry;
pub mod session;
pub mod store;
pub mod workflow;

#[cfg(test)]
mod test_support;

pub use app::{BlobNaming, WorkflowContext};
pub use errors::{MonitorError, SessionError, WorkflowError};
pub use failover::ReadPolicy;
pub use monitor::{MonitorPolicy, ReplicationReport};
pub use session::{forward_lines, spawn_session, Command, SessionController, SessionHandle, SessionOutcome, SessionState};
pub use store::endpoints::{AccountEndpoints, Endpoint};
pub use store::{BackendConfig, ReplicaPair};
pub use workflow::FailurePolicy;
