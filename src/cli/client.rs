//! Client side of the owner socket.
//!
//! Used by the controller to look for an owner and forward commands, and by
//! overlay instances to hold a `subscribe` connection open.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::daemon::ipc::IpcError;
use crate::types::{
    IpcRequest, IpcResponse, Navigation, NavigationVerdict, ObserverEvent, PageInfo,
    StartRequest, StateSnapshot, SurfaceId,
};

// ============================================================================
// Limits
// ============================================================================

/// Bound on each connect, write and read.
const IO_WAIT: Duration = Duration::from_secs(5);

/// Largest response body accepted from the owner.
const RESPONSE_LIMIT: u64 = 64 * 1024;

/// Attempts for commands that change timer state.
const COMMAND_ATTEMPTS: u32 = 3;

/// Backoff step between attempts; attempt `n` waits `n` steps.
const BACKOFF_STEP: Duration = Duration::from_millis(500);

// ============================================================================
// IpcClient
// ============================================================================

/// Handle on the owner socket. Each call opens its own connection.
#[derive(Debug, Clone)]
pub struct IpcClient {
    socket_path: PathBuf,
}

impl IpcClient {
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    /// Asks the owner for its state with `getState`.
    ///
    /// A single attempt bounded by `deadline` as a whole. Any error means
    /// "no owner present"; [`IpcError::is_unreachable`] tells a missing owner
    /// apart from a misbehaving one.
    pub async fn get_state(&self, deadline: Duration) -> Result<StateSnapshot, IpcError> {
        let query = async {
            let mut stream = UnixStream::connect(&self.socket_path)
                .await
                .map_err(|e| IpcError::ConnectionError(e.to_string()))?;
            let response = round_trip(&mut stream, &IpcRequest::GetState)
                .await
                .map_err(|e| IpcError::ReadError(format!("{:#}", e)))?;
            if !response.is_success() {
                return Err(IpcError::ReadError(response.message));
            }
            Ok(response.data.unwrap_or_default())
        };

        timeout(deadline, query)
            .await
            .unwrap_or(Err(IpcError::Timeout))
    }

    /// Sends a `startTimer` command.
    pub async fn start(&self, request: StartRequest) -> Result<IpcResponse> {
        self.command(&IpcRequest::StartTimer(request)).await
    }

    /// Sends a `stopTimer` command.
    pub async fn stop(&self) -> Result<IpcResponse> {
        self.command(&IpcRequest::StopTimer).await
    }

    /// Asks the owner whether a navigation may proceed.
    pub async fn check_navigation(&self, navigation: Navigation) -> Result<NavigationVerdict> {
        self.request_once(&IpcRequest::CheckNavigation(navigation))
            .await?
            .verdict
            .context("daemon response carried no verdict")
    }

    /// Opens a `subscribe` connection.
    ///
    /// The write half stays open for the lifetime of the subscription; the
    /// owner treats its closure as the page going away.
    pub async fn subscribe(&self, page: Option<PageInfo>) -> Result<Subscription> {
        let mut stream = self.connect().await?;
        send_body(&mut stream, &IpcRequest::Subscribe { page }).await?;

        let (reader, writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        let first = timeout(IO_WAIT, lines.next_line())
            .await
            .context("timed out waiting for the subscription reply")?
            .context("cannot receive the subscription reply")?
            .context("daemon sent no response")?;
        let response: IpcResponse =
            serde_json::from_str(&first).context("cannot parse the subscription reply")?;
        if !response.is_success() {
            anyhow::bail!("{}", response.message);
        }

        let surface_id = response
            .surface_id
            .context("daemon response carried no surface id")?;
        Ok(Subscription {
            surface_id,
            snapshot: response.data.unwrap_or_default(),
            lines,
            _writer: writer,
        })
    }

    /// Sends a state-changing command, retrying with a linear backoff.
    async fn command(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut attempt = 1;
        loop {
            let err = match self.request_once(request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };
            tracing::warn!(attempt, of = COMMAND_ATTEMPTS, "command send failed: {:#}", err);
            if attempt == COMMAND_ATTEMPTS {
                return Err(err);
            }
            tokio::time::sleep(BACKOFF_STEP * attempt).await;
            attempt += 1;
        }
    }

    /// One connection, one request. An error response becomes an `Err`.
    async fn request_once(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut stream = self.connect().await?;
        let response = round_trip(&mut stream, request).await?;
        if !response.is_success() {
            anyhow::bail!("{}", response.message);
        }
        Ok(response)
    }

    async fn connect(&self) -> Result<UnixStream> {
        timeout(IO_WAIT, UnixStream::connect(&self.socket_path))
            .await
            .context("timed out connecting to the daemon")?
            .context("cannot connect to the daemon; start it with 'focus-timer daemon'")
    }
}

/// Writes the request document without closing the stream.
async fn send_body(stream: &mut UnixStream, request: &IpcRequest) -> Result<()> {
    let body = serde_json::to_vec(request).context("cannot serialize request")?;
    timeout(IO_WAIT, async {
        stream.write_all(&body).await?;
        stream.flush().await
    })
    .await
    .context("timed out sending request")?
    .context("cannot send request")
}

/// Sends `request`, closes the write side and decodes whatever comes back.
async fn round_trip(stream: &mut UnixStream, request: &IpcRequest) -> Result<IpcResponse> {
    send_body(stream, request).await?;
    stream
        .shutdown()
        .await
        .context("cannot close the write side")?;

    let mut body = Vec::new();
    timeout(IO_WAIT, stream.take(RESPONSE_LIMIT).read_to_end(&mut body))
        .await
        .context("timed out waiting for a response")?
        .context("cannot receive response")?;

    anyhow::ensure!(!body.is_empty(), "daemon sent no response");
    serde_json::from_slice(&body).context("cannot parse response")
}

// ============================================================================
// Subscription
// ============================================================================

/// An open `subscribe` connection.
#[derive(Debug)]
pub struct Subscription {
    surface_id: SurfaceId,
    snapshot: StateSnapshot,
    lines: Lines<BufReader<OwnedReadHalf>>,
    _writer: OwnedWriteHalf,
}

impl Subscription {
    /// Surface id the owner assigned to this connection.
    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    /// Owner state at the time of subscribing.
    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    /// Waits for the next event. `None` means the owner closed the stream.
    ///
    /// Lines that do not decode are skipped.
    pub async fn next_event(&mut self) -> Result<Option<ObserverEvent>> {
        loop {
            let Some(line) = self
                .lines
                .next_line()
                .await
                .context("failed to receive event")?
            else {
                return Ok(None);
            };
            match serde_json::from_str(&line) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => tracing::debug!("Skipping undecodable event {:?}: {}", line, e),
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
