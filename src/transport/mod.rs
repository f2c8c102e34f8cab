//! Command/event boundary for an interactive front end.
//!
//! Every request is served on its own task, so a long `scanFolder` never
//! holds up `cancelScan`, `getFilePreview` or `deleteFiles`.

pub mod protocol;

pub use protocol::{CancelReply, Command, Outgoing, Request, Response};

use crate::cleaner::DeletionService;
use crate::error::ScanError;
use crate::opener::open_file;
use crate::preview::load_preview;
use crate::scanner::{event_channel, DirectoryScanner, EventReceiver, EventSender};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("serialization failure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stream failure: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::Scan(err) => err.code(),
            TransportError::Json(_) => "bad_request",
            TransportError::Io(_) => "io",
        }
    }
}

/// Routes commands to the scanner and the file services.
pub struct Dispatcher {
    scanner: Arc<DirectoryScanner>,
    deleter: DeletionService,
    events: EventSender,
}

impl Dispatcher {
    pub fn new(scanner: Arc<DirectoryScanner>, deleter: DeletionService, events: EventSender) -> Self {
        Self {
            scanner,
            deleter,
            events,
        }
    }

    pub fn scanner(&self) -> &Arc<DirectoryScanner> {
        &self.scanner
    }

    pub async fn respond(&self, request: Request) -> Response {
        let name = request.command.name();
        debug!(id = request.id, command = name, "request");
        match self.handle(request.command).await {
            Ok(result) => Response::success(request.id, result),
            Err(err) => {
                warn!(id = request.id, command = name, error = %err, "request failed");
                Response::failure(Some(request.id), err.code(), err.to_string())
            }
        }
    }

    pub async fn handle(&self, command: Command) -> Result<Value, TransportError> {
        let value = match command {
            Command::SelectFolder { path } => {
                let chosen = match path {
                    Some(path) => resolve_folder(&path).await,
                    None => None,
                };
                serde_json::to_value(chosen)?
            }
            Command::ScanFolder {
                path,
                threshold_days,
            } => {
                let summary = self
                    .scanner
                    .scan(path, threshold_days, self.events.clone())
                    .await?;
                serde_json::to_value(summary)?
            }
            Command::CancelScan => {
                let reply = if self.scanner.cancel_active() {
                    CancelReply {
                        success: true,
                        message: None,
                    }
                } else {
                    CancelReply {
                        success: false,
                        message: Some("No scan in progress".to_string()),
                    }
                };
                serde_json::to_value(reply)?
            }
            Command::DeleteFiles { paths } => {
                let report = self.deleter.delete_files(&paths).await;
                serde_json::to_value(report.outcomes)?
            }
            Command::GetFilePreview { path } => serde_json::to_value(load_preview(&path).await)?,
            Command::OpenFile { path } => serde_json::to_value(open_file(&path).await)?,
        };
        Ok(value)
    }
}

/// The folder picker lives in the front end; this only confirms its choice
/// is an existing directory and canonicalizes it.
async fn resolve_folder(path: &Path) -> Option<String> {
    let canonical = tokio::fs::canonicalize(path).await.ok()?;
    let meta = tokio::fs::metadata(&canonical).await.ok()?;
    meta.is_dir()
        .then(|| canonical.to_string_lossy().to_string())
}

fn parse_request(line: &str) -> Result<Request, Response> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| Response::failure(None, "bad_request", e.to_string()))?;
    let id = value.get("id").and_then(Value::as_u64);
    serde_json::from_value(value).map_err(|e| Response::failure(id, "bad_request", e.to_string()))
}

/// Serve requests from `input` until it closes, writing responses and scan
/// events to `output`. A scan still running at end of input is cancelled.
pub async fn serve<R, W>(input: R, output: W, scanner: Arc<DirectoryScanner>, deleter: DeletionService) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (event_tx, event_rx) = event_channel();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel::<Response>();
    let writer = tokio::spawn(write_loop(output, event_rx, reply_rx));

    let dispatcher = Arc::new(Dispatcher::new(scanner, deleter, event_tx));
    let mut tasks = JoinSet::new();
    let mut lines = BufReader::new(input).lines();

    info!("transport ready");
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match parse_request(&line) {
            Ok(request) => {
                let dispatcher = Arc::clone(&dispatcher);
                let reply_tx = reply_tx.clone();
                tasks.spawn(async move {
                    let response = dispatcher.respond(request).await;
                    let _ = reply_tx.send(response);
                });
            }
            Err(response) => {
                let _ = reply_tx.send(response);
            }
        }

        while tasks.try_join_next().is_some() {}
    }

    if dispatcher.scanner().cancel_active() {
        info!("input closed, cancelling running scan");
    }
    while tasks.join_next().await.is_some() {}

    drop(dispatcher);
    drop(reply_tx);
    writer
        .await
        .map_err(|e| TransportError::Io(std::io::Error::other(e)))??;
    Ok(())
}

/// Single writer for the output stream. Pending events are always written
/// before pending replies, so a scan's `complete` precedes its response.
async fn write_loop<W>(
    mut output: W,
    mut events: EventReceiver,
    mut replies: mpsc::UnboundedReceiver<Response>,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let message = tokio::select! {
            biased;
            Some(event) = events.recv() => Outgoing::Event(event),
            Some(reply) = replies.recv() => Outgoing::Response(reply),
            else => break,
        };

        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');
        output.write_all(&line).await?;
        output.flush().await?;
    }

    output.shutdown().await?;
    Ok(())
}
