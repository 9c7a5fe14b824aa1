mod errors;
mod params;

use std::process::ExitCode;

use clap::Parser;
use dotenv::dotenv;
use geo_replication::app::now_millis;
use geo_replication::errors::error_chain;
use geo_replication::{
    forward_lines, spawn_session, ReplicaPair, SessionController, SessionOutcome, SessionState, WorkflowContext,
};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use crate::errors::DemoErr;
use crate::params::Args;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(outcome) if outcome.is_success() => ExitCode::SUCCESS,
        Ok(outcome) => {
            tracing::warn!(
                "finished without a clean run (replicated: {}, container deleted: {})",
                outcome.replication.is_some(),
                outcome.torn_down
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("{}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<SessionOutcome, DemoErr> {
    let endpoints = args.endpoints()?;
    let replicas = ReplicaPair::connect(&args.backend_config()?, &endpoints);

    let ctx = WorkflowContext::new(
        replicas.primary.into_shared(),
        replicas.secondary.into_shared(),
        endpoints,
        args.file.clone(),
        args.blob_naming,
        now_millis(),
    )
    .with_upload_options(args.upload_options()?)
    .with_read_policy(args.read_policy()?)
    .with_monitor_policy(args.monitor_policy()?)
    .with_failure_policy(args.on_upload_failure);

    let mut controller = SessionController::new(ctx, tokio::io::stdout());
    if controller.start().await? == SessionState::Terminating {
        let (outcome, _) = controller.into_parts();
        return Ok(outcome);
    }

    let (handle, worker) = spawn_session(controller);
    let forwarded = forward_lines(BufReader::new(tokio::io::stdin()), &handle).await;
    // the worker tears down on its own once the last handle is gone
    drop(handle);
    let (outcome, _) = worker.await?.into_parts();
    forwarded?;
    Ok(outcome)
}
