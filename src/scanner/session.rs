use super::cutoff_for;
use super::event::EventSender;
use super::walk::run_session;
use crate::error::{Result, ScanError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::debug;

/// Caller-side reference to a session: its id and its cancellation flag.
#[derive(Debug, Clone)]
pub struct ScanHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl ScanHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

/// State for one scan from start to completion or cancellation.
///
/// Owned by the walking task. The cutoff is fixed at construction so every
/// record in the session is judged against the same instant.
#[derive(Debug)]
pub struct ScanSession {
    id: u64,
    root: PathBuf,
    threshold_days: u32,
    cutoff: DateTime<Utc>,
    total_files_found: u64,
    files_processed: u64,
    cancelled: Arc<AtomicBool>,
    slot: Option<ActiveGuard>,
}

impl ScanSession {
    pub fn new(id: u64, root: PathBuf, threshold_days: u32, now: DateTime<Utc>) -> Self {
        Self {
            id,
            root,
            threshold_days,
            cutoff: cutoff_for(now, threshold_days),
            total_files_found: 0,
            files_processed: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
            slot: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn threshold_days(&self) -> u32 {
        self.threshold_days
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    pub fn total_files_found(&self) -> u64 {
        self.total_files_found
    }

    pub fn files_processed(&self) -> u64 {
        self.files_processed
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn handle(&self) -> ScanHandle {
        ScanHandle {
            id: self.id,
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub(crate) fn set_total_files_found(&mut self, total: u64) {
        self.total_files_found = total;
    }

    /// Bump the processed counter and return the new value.
    pub(crate) fn record_processed(&mut self) -> u64 {
        self.files_processed += 1;
        self.files_processed
    }

    /// Give up the scanner's active slot. Called before `complete` goes out
    /// so a consumer reacting to it can start the next scan straight away.
    pub(crate) fn deactivate(&mut self) {
        self.slot = None;
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            session: self.id,
            started: true,
            total_files: self.total_files_found,
            total_files_processed: self.files_processed,
            cancelled: self.is_cancelled(),
        }
    }
}

/// What `scanFolder` resolves with once the walk is over. The records
/// themselves travel as `batch` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub session: u64,
    pub started: bool,
    pub total_files: u64,
    pub total_files_processed: u64,
    pub cancelled: bool,
}

/// A walk running on the tokio runtime.
pub struct ScanTask {
    handle: ScanHandle,
    root: PathBuf,
    join: JoinHandle<Result<ScanSummary>>,
}

impl ScanTask {
    pub fn handle(&self) -> &ScanHandle {
        &self.handle
    }

    /// Canonical root every record path of this scan starts with.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn wait(self) -> Result<ScanSummary> {
        self.join.await?
    }
}

/// Starts scans and enforces that at most one is active at a time.
///
/// A second `start` while a session is active is rejected with
/// [`ScanError::AlreadyRunning`]; the caller has to cancel first.
#[derive(Debug, Default)]
pub struct DirectoryScanner {
    next_id: AtomicU64,
    active: Mutex<Option<ScanHandle>>,
}

impl DirectoryScanner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn active_slot(&self) -> MutexGuard<'_, Option<ScanHandle>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_active(&self) -> bool {
        self.active_slot().is_some()
    }

    /// Validate and canonicalize the root, register a session and spawn its
    /// walk.
    ///
    /// Errors here are path-level failures; once this returns `Ok` the
    /// session always ends with exactly one `complete` event unless the root
    /// vanishes before it is listed.
    pub async fn start(
        self: &Arc<Self>,
        root: impl Into<PathBuf>,
        threshold_days: u32,
        events: EventSender,
    ) -> Result<ScanTask> {
        let given = root.into();
        let root = tokio::fs::canonicalize(&given)
            .await
            .map_err(|e| ScanError::root_unreadable(&given, e))?;

        let meta = tokio::fs::metadata(&root)
            .await
            .map_err(|e| ScanError::root_unreadable(&root, e))?;
        if !meta.is_dir() {
            return Err(ScanError::NotADirectory { path: root });
        }
        tokio::fs::read_dir(&root)
            .await
            .map_err(|e| ScanError::root_unreadable(&root, e))?;

        let mut session = self.begin(root.clone(), threshold_days)?;
        let handle = session.handle();
        session.slot = Some(ActiveGuard {
            scanner: Arc::clone(self),
            id: handle.id(),
        });

        let join = tokio::spawn(run_session(session, events));

        Ok(ScanTask { handle, root, join })
    }

    /// `start` and wait for the walk to finish or be cancelled.
    pub async fn scan(
        self: &Arc<Self>,
        root: impl Into<PathBuf>,
        threshold_days: u32,
        events: EventSender,
    ) -> Result<ScanSummary> {
        self.start(root, threshold_days, events).await?.wait().await
    }

    fn begin(&self, root: PathBuf, threshold_days: u32) -> Result<ScanSession> {
        let mut slot = self.active_slot();
        if slot.is_some() {
            return Err(ScanError::AlreadyRunning);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let session = ScanSession::new(id, root, threshold_days, Utc::now());
        *slot = Some(session.handle());
        Ok(session)
    }

    /// Cancel `handle` if it is the active session.
    pub fn cancel(&self, handle: &ScanHandle) -> bool {
        match self.active_slot().as_ref() {
            Some(active) if active.id() == handle.id() => {
                active.cancel();
                debug!(session = active.id(), "cancellation requested");
                true
            }
            _ => false,
        }
    }

    /// Cancel whichever session is active.
    pub fn cancel_active(&self) -> bool {
        match self.active_slot().as_ref() {
            Some(active) => {
                active.cancel();
                debug!(session = active.id(), "cancellation requested");
                true
            }
            None => false,
        }
    }

    fn release(&self, id: u64) {
        let mut slot = self.active_slot();
        if slot.as_ref().map(ScanHandle::id) == Some(id) {
            *slot = None;
        }
    }
}

/// Frees the active slot when the session gives it up, or when the walk
/// task ends early by panic or abort.
#[derive(Debug)]
struct ActiveGuard {
    scanner: Arc<DirectoryScanner>,
    id: u64,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.scanner.release(self.id);
    }
}
