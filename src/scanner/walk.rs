//! The recursive walk behind a scan session.

use super::counter::count_files_async;
use super::event::{percent, EventSender, ScanEvent};
use super::session::{ScanSession, ScanSummary};
use super::{is_excluded_dir_name, FileRecord, BATCH_SIZE, PROGRESS_INTERVAL};
use crate::error::{Result, ScanError};
use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::{debug, info, warn};

type WalkFuture<'a> = Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>>;

struct ListedEntry {
    path: PathBuf,
    name: OsString,
    is_dir: bool,
}

/// Mutable state threaded through one walk. Owns the pending batch; the
/// session owns the counters and the cancellation flag.
struct Walker<'a> {
    session: &'a mut ScanSession,
    events: &'a EventSender,
    pending: Vec<FileRecord>,
}

/// Count, then walk, then report. Fails only when the root itself cannot be
/// listed; everything below the root degrades to "log and skip".
pub(crate) async fn run_session(
    mut session: ScanSession,
    events: EventSender,
) -> Result<ScanSummary> {
    info!(
        session = session.id(),
        root = %session.root().display(),
        threshold_days = session.threshold_days(),
        "scan started"
    );

    let total = count_files_async(session.root().to_path_buf(), session.cancel_flag()).await;
    session.set_total_files_found(total);

    if !session.is_cancelled() {
        let _ = events.send(ScanEvent::Progress {
            session: session.id(),
            processed: 0,
            total,
            percent: 0,
        });
    }

    let root = session.root().to_path_buf();
    let mut walker = Walker {
        session: &mut session,
        events: &events,
        pending: Vec::with_capacity(BATCH_SIZE),
    };

    if let Err(err) = walker.walk_dir(root.clone()).await {
        walker.session.deactivate();
        return Err(ScanError::root_unreadable(&root, err));
    }
    walker.finish();

    let summary = session.summary();
    info!(
        session = summary.session,
        processed = summary.total_files_processed,
        cancelled = summary.cancelled,
        "scan finished"
    );
    Ok(summary)
}

impl Walker<'_> {
    fn should_cancel(&self) -> bool {
        self.session.is_cancelled()
    }

    fn send(&self, event: ScanEvent) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.events.send(event);
    }

    fn walk_dir(&mut self, dir: PathBuf) -> WalkFuture<'_> {
        Box::pin(async move {
            if self.should_cancel() {
                return Ok(());
            }

            let entries = read_sorted(&dir).await?;

            for entry in entries {
                if self.should_cancel() {
                    return Ok(());
                }

                if entry.is_dir {
                    if is_excluded_dir_name(&entry.name) {
                        debug!(path = %entry.path.display(), "skipping system directory");
                        continue;
                    }
                    if let Err(err) = self.walk_dir(entry.path.clone()).await {
                        warn!(
                            path = %entry.path.display(),
                            error = %err,
                            "skipping unreadable directory"
                        );
                    }
                } else {
                    self.visit_file(&entry.path).await;
                }
            }

            Ok(())
        })
    }

    async fn visit_file(&mut self, path: &Path) {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => {
                debug!(path = %path.display(), "skipping linked directory");
            }
            Ok(meta) => match FileRecord::from_metadata(path, &meta, self.session.cutoff()) {
                Some(record) => self.pending.push(record),
                None => warn!(path = %path.display(), "no timestamps available, skipping"),
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot stat file, skipping");
            }
        }

        let processed = self.session.record_processed();
        if processed % PROGRESS_INTERVAL == 0 {
            self.emit_progress();
        }
        if self.pending.len() >= BATCH_SIZE {
            self.flush();
        }
    }

    fn emit_progress(&self) {
        if self.should_cancel() {
            return;
        }
        let processed = self.session.files_processed();
        let total = self.session.total_files_found();
        self.send(ScanEvent::Progress {
            session: self.session.id(),
            processed,
            total,
            percent: percent(processed, total),
        });
    }

    /// Hand the pending records to the collaborator. Records gathered after
    /// cancellation are dropped rather than sent.
    fn flush(&mut self) {
        let files = mem::take(&mut self.pending);
        if self.should_cancel() || files.is_empty() {
            return;
        }
        self.send(ScanEvent::Batch {
            session: self.session.id(),
            files,
        });
    }

    fn finish(&mut self) {
        let cancelled = self.should_cancel();
        if cancelled {
            self.pending.clear();
        } else {
            self.flush();
        }

        self.session.deactivate();
        self.send(ScanEvent::Complete {
            session: self.session.id(),
            success: !cancelled,
            total_files: self.session.total_files_found(),
            cancelled,
        });
    }
}

async fn read_sorted(dir: &Path) -> io::Result<Vec<ListedEntry>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut listed = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let is_dir = entry
            .file_type()
            .await
            .map(|ft| ft.is_dir())
            .unwrap_or(false);
        listed.push(ListedEntry {
            path: entry.path(),
            name: entry.file_name(),
            is_dir,
        });
    }

    listed.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listed)
}
