//! Owner-side socket endpoint.
//!
//! A client opens a connection, writes one JSON request and reads the
//! answer. Timer commands are answered with a single JSON document and the
//! connection ends. `subscribe` answers with a JSON line and then keeps the
//! connection open, writing one observer event per line until the page goes
//! away or the owner closes it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::bus::{Broadcaster, ChannelSurface, Surface};
use crate::types::{IpcRequest, IpcResponse, ObserverEvent, PageInfo};

use super::timer::TimerEngine;

// ============================================================================
// Limits
// ============================================================================

/// Largest request a client may send.
const REQUEST_LIMIT: usize = 64 * 1024;

/// Bytes read per socket read while assembling a request.
const READ_CHUNK: usize = 4096;

/// How long the owner waits for a connected client to send its request.
const REQUEST_WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// IpcError
// ============================================================================

/// Transport failures between a client and the owner.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// The socket could not be reached (no owner, or a stale socket file).
    #[error("owner socket unreachable: {0}")]
    ConnectionError(String),

    #[error("could not read from socket: {0}")]
    ReadError(String),

    #[error("could not write to socket: {0}")]
    WriteError(String),

    /// The peer stayed silent past the deadline.
    #[error("socket peer did not answer in time")]
    Timeout,

    #[error("request exceeds {REQUEST_LIMIT} bytes")]
    RequestTooLarge,
}

impl IpcError {
    /// Whether the failure means there is no usable owner on the other side.
    ///
    /// Owner lookups treat this as "run standalone" instead of reporting an error.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::ConnectionError(_) | Self::Timeout)
    }
}

// ============================================================================
// IpcServer
// ============================================================================

/// Listening socket owned by the background owner.
///
/// The socket file is removed again when the server is dropped.
pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl IpcServer {
    /// Binds the owner socket at `socket_path`.
    ///
    /// A leftover socket file from an earlier owner is replaced, and the
    /// containing directory is created when missing.
    ///
    /// # Errors
    ///
    /// Fails when the stale file cannot be removed or the bind is refused.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if let Some(dir) = socket_path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create socket directory: {}", dir.display()))?;
        }
        match std::fs::remove_file(socket_path) {
            Ok(()) => debug!(path = %socket_path.display(), "removed stale socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("cannot remove stale socket: {}", socket_path.display())
                })
            }
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("cannot bind socket: {}", socket_path.display()))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Waits for the next client.
    ///
    /// # Errors
    ///
    /// Propagates listener failures.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _) = self.listener.accept().await.context("cannot accept connection")?;
        Ok(stream)
    }

    /// Reads the single request a client sends after connecting.
    ///
    /// The request may arrive over several reads and may or may not end in a
    /// newline. Reading stops as soon as the bytes so far form a complete
    /// JSON document, so a `subscribe` client can keep its side open.
    ///
    /// # Errors
    ///
    /// Fails when the client hangs up first, stays silent past the wait,
    /// sends more than the request limit, or sends something that is not a
    /// request document.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        timeout(REQUEST_WAIT, read_request(stream))
            .await
            .map_err(|_| IpcError::Timeout)?
    }

    /// Writes a one-shot response and flushes it.
    ///
    /// # Errors
    ///
    /// Fails when the client is already gone.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let body = serde_json::to_vec(response).context("cannot serialize response")?;
        stream
            .write_all(&body)
            .await
            .map_err(|e| IpcError::WriteError(e.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|e| IpcError::WriteError(e.to_string()))?;
        Ok(())
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Accumulates reads until they hold one complete request document.
async fn read_request<R>(reader: &mut R) -> Result<IpcRequest>
where
    R: AsyncRead + Unpin,
{
    let mut body = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|e| IpcError::ReadError(e.to_string()))?;
        if n == 0 {
            if body.iter().all(u8::is_ascii_whitespace) {
                anyhow::bail!("client closed the connection before sending a request");
            }
            return serde_json::from_slice(&body).context("incomplete request");
        }

        body.extend_from_slice(&chunk[..n]);
        if body.len() > REQUEST_LIMIT {
            return Err(IpcError::RequestTooLarge.into());
        }

        match serde_json::from_slice::<IpcRequest>(&body) {
            Ok(request) => return Ok(request),
            Err(e) if e.is_eof() => continue,
            Err(e) => return Err(e).context("malformed request"),
        }
    }
}

/// Writes one value as a JSON line.
async fn write_line<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let mut line = serde_json::to_vec(value).context("Failed to serialize message")?;
    line.push(b'\n');
    writer
        .write_all(&line)
        .await
        .map_err(|e| IpcError::WriteError(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| IpcError::WriteError(e.to_string()))?;
    Ok(())
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to TimerEngine.
pub struct RequestHandler {
    /// Shared reference to the timer engine
    engine: Arc<Mutex<TimerEngine>>,
    /// Registry `subscribe` connections join
    broadcaster: Arc<Broadcaster>,
}

impl RequestHandler {
    /// Creates a new request handler with the given timer engine.
    pub fn new(engine: Arc<Mutex<TimerEngine>>, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            engine,
            broadcaster,
        }
    }

    /// Serves one accepted connection to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be read or the response
    /// cannot be written.
    pub async fn serve(&self, mut stream: UnixStream) -> Result<()> {
        let request = IpcServer::receive_request(&mut stream).await?;
        debug!("Received request: {:?}", request);

        match request {
            IpcRequest::Subscribe { page } => self.serve_subscription(stream, page).await,
            request => {
                let response = self.handle(request).await;
                IpcServer::send_response(&mut stream, &response).await
            }
        }
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::StartTimer(start) => {
                let mut engine = self.engine.lock().await;
                match engine.start(start) {
                    Ok(snapshot) => IpcResponse::success("Timer started", Some(snapshot)),
                    Err(e) => IpcResponse::error(e.to_string()),
                }
            }
            IpcRequest::StopTimer => {
                let mut engine = self.engine.lock().await;
                match engine.stop() {
                    Ok(snapshot) => IpcResponse::success("Timer stopped", Some(snapshot)),
                    Err(e) => IpcResponse::error(e.to_string()),
                }
            }
            IpcRequest::GetState => {
                let engine = self.engine.lock().await;
                IpcResponse::success("", Some(engine.snapshot()))
            }
            IpcRequest::CheckNavigation(navigation) => {
                let engine = self.engine.lock().await;
                IpcResponse::verdict(engine.check_navigation(&navigation))
            }
            IpcRequest::Subscribe { .. } => {
                IpcResponse::error("subscribe needs a dedicated connection")
            }
        }
    }

    /// Registers the connection as an observer surface and streams events
    /// until the client disconnects or its page is closed.
    async fn serve_subscription(&self, stream: UnixStream, page: Option<PageInfo>) -> Result<()> {
        let (surface, mut events) = ChannelSurface::new();
        let surface_id = surface.id();

        let snapshot = self.engine.lock().await.snapshot();
        self.broadcaster.register(Arc::new(surface), page);
        debug!("Surface {} subscribed", surface_id);

        let (mut reader, mut writer) = stream.into_split();
        let result = async {
            write_line(&mut writer, &IpcResponse::subscribed(surface_id, snapshot)).await?;

            let mut scratch = [0u8; 64];
            loop {
                tokio::select! {
                    event = events.recv() => {
                        let Some(event) = event else { break };
                        write_line(&mut writer, &event).await?;
                        if event == ObserverEvent::ClosePage {
                            break;
                        }
                    }
                    read = reader.read(&mut scratch) => {
                        // Subscribers never send after the request; EOF or
                        // an error means the page went away.
                        if matches!(read, Ok(0) | Err(_)) {
                            break;
                        }
                    }
                }
            }
            Ok::<(), anyhow::Error>(())
        }
        .await;

        self.broadcaster.unregister(surface_id);
        debug!("Surface {} unsubscribed", surface_id);
        result
    }
}

// ============================================================================
// Tests
// ============================================================================
