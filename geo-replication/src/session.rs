use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::app::WorkflowContext;
use crate::errors::{error_chain, SessionError, WorkflowError};
use crate::monitor::ReplicationReport;
use crate::store::endpoints::Endpoint;
use crate::workflow::{self, DownloadReport, UploadReport};

pub const READY_PROMPT: &str = "Ready for blob download. Enter (D) to download or (Q) to quit, followed by ENTER.";
pub const USAGE_HINT: &str = "Invalid input. (D) for download (Q) to quit.";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Download,
    Quit,
    Unknown(String),
}

impl Command {
    /// Matches `line` without its line terminator. Any other whitespace makes it unknown.
    pub fn parse(line: &str) -> Self {
        match line.trim_end_matches(&['\r', '\n'][..]) {
            "d" | "D" => Command::Download,
            "q" | "Q" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingUpload,
    Ready,
    Terminating,
}

/// Everything a finished (or running) session did.
#[derive(Debug, Default)]
pub struct SessionOutcome {
    pub upload: Option<UploadReport>,
    pub replication: Option<ReplicationReport>,
    pub downloads: Vec<DownloadReport>,
    pub torn_down: bool,
}

impl SessionOutcome {
    /// Replication was confirmed and the container is gone.
    pub fn is_success(&self) -> bool {
        self.replication.is_some() && self.torn_down
    }
}

/// Drives one demo run: upload, replication check, then user commands until quit.
pub struct SessionController<W> {
    ctx: WorkflowContext,
    out: W,
    state: SessionState,
    outcome: SessionOutcome,
}

impl<W> SessionController<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(ctx: WorkflowContext, out: W) -> Self {
        Self {
            ctx,
            out,
            state: SessionState::AwaitingUpload,
            outcome: SessionOutcome::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> &WorkflowContext {
        &self.ctx
    }

    pub fn outcome(&self) -> &SessionOutcome {
        &self.outcome
    }

    pub fn into_parts(self) -> (SessionOutcome, W) {
        (self.outcome, self.out)
    }

    /// Runs the upload and waits for the secondary to catch up.
    ///
    /// Ends in `Ready` unless a fail-fast upload failure terminated the session.
    pub async fn start(&mut self) -> Result<SessionState, SessionError> {
        if self.state != SessionState::AwaitingUpload {
            return Ok(self.state);
        }

        match workflow::upload_blob(&self.ctx).await {
            Ok(report) => self.outcome.upload = Some(report),
            Err(e) => {
                tracing::error!("aborting run: {}", error_chain(&e));
                self.state = SessionState::Terminating;
                if !matches!(e, WorkflowError::CreateContainer { .. }) {
                    self.teardown().await;
                }
                return Ok(self.state);
            }
        }

        match workflow::confirm_replication(&self.ctx, &mut self.out).await {
            Ok(report) => self.outcome.replication = Some(report),
            Err(e) => tracing::error!("{}", error_chain(&e)),
        }

        self.state = SessionState::Ready;
        if let Err(e) = self.say(READY_PROMPT).await {
            self.state = SessionState::Terminating;
            self.teardown().await;
            return Err(e);
        }
        Ok(self.state)
    }

    pub async fn handle(&mut self, command: Command) -> Result<SessionState, SessionError> {
        match self.state {
            SessionState::AwaitingUpload => return Err(SessionError::NotReady),
            SessionState::Terminating => return Err(SessionError::Closed),
            SessionState::Ready => {}
        }

        match command {
            Command::Download => {
                self.say("Attempting to download blob...").await?;
                match workflow::download_blob(&self.ctx).await {
                    Ok(report) => {
                        self.say(match report.served_by {
                            Endpoint::Secondary => "Blob downloaded from secondary endpoint.",
                            Endpoint::Primary => "Blob downloaded from primary endpoint.",
                        })
                        .await?;
                        self.outcome.downloads.push(report);
                    }
                    Err(e) => {
                        let message = error_chain(&e);
                        tracing::error!("{message}");
                        self.say(&format!("Unable to download blob: {message}")).await?;
                    }
                }
            }
            Command::Quit => {
                let said = self.say("Exiting...").await;
                self.state = SessionState::Terminating;
                self.teardown().await;
                said?;
            }
            Command::Unknown(_) => self.say(USAGE_HINT).await?,
        }
        Ok(self.state)
    }

    async fn teardown(&mut self) {
        self.outcome.torn_down = workflow::delete_container(&self.ctx).await.is_ok();
    }

    async fn say(&mut self, line: &str) -> Result<(), SessionError> {
        self.out.write_all(line.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }
}

type Request = (Command, oneshot::Sender<Result<SessionState, SessionError>>);

/// Submits commands to a session running on its own task.
///
/// Commands from every clone of the handle are applied one at a time, in arrival order.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Request>,
}

impl SessionHandle {
    pub async fn submit(&self, command: Command) -> Result<SessionState, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((command, reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)?
    }
}

/// Moves a started controller onto a worker task.
///
/// The worker stops after a quit. If every handle is dropped while the session is still
/// ready, it tears the container down as if a quit had been sent. The join handle yields
/// the controller back.
pub fn spawn_session<W>(controller: SessionController<W>) -> (SessionHandle, JoinHandle<SessionController<W>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    let worker = tokio::spawn(run_worker(controller, rx));
    (SessionHandle { tx }, worker)
}

async fn run_worker<W>(mut controller: SessionController<W>, mut rx: mpsc::Receiver<Request>) -> SessionController<W>
where
    W: AsyncWrite + Unpin + Send,
{
    while let Some((command, reply)) = rx.recv().await {
        let result = controller.handle(command).await;
        let finished = controller.state() == SessionState::Terminating;
        _ = reply.send(result);
        if finished {
            break;
        }
    }

    if controller.state() == SessionState::Ready {
        tracing::info!("input closed, cleaning up");
        if let Err(e) = controller.handle(Command::Quit).await {
            tracing::error!("{}", error_chain(&e));
        }
    }
    controller
}

/// Feeds each input line to the session until it terminates or the input ends.
pub async fn forward_lines<R>(input: R, handle: &SessionHandle) -> Result<(), SessionError>
where
    R: AsyncBufRead + Unpin,
{
    let mut input = input;
    let mut line = Vec::new();
    loop {
        line.clear();
        if input.read_until(b'\n', &mut line).await.map_err(SessionError::Input)? == 0 {
            return Ok(());
        }
        let command = Command::parse(&String::from_utf8_lossy(&line));
        if handle.submit(command).await? == SessionState::Terminating {
            return Ok(());
        }
    }
}
