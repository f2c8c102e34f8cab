use super::FileRecord;
use serde::Serialize;
use tokio::sync::mpsc;

/// Everything a running scan pushes to its collaborator.
///
/// Each event carries the id of the session that produced it so a consumer
/// can drop anything left over from an abandoned session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ScanEvent {
    Progress {
        session: u64,
        processed: u64,
        total: u64,
        percent: u8,
    },
    Batch {
        session: u64,
        files: Vec<FileRecord>,
    },
    Complete {
        session: u64,
        success: bool,
        total_files: u64,
        cancelled: bool,
    },
}

impl ScanEvent {
    pub fn session(&self) -> u64 {
        match self {
            ScanEvent::Progress { session, .. }
            | ScanEvent::Batch { session, .. }
            | ScanEvent::Complete { session, .. } => *session,
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<ScanEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ScanEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// `min(round(processed / total * 100), 100)`.
///
/// An empty count reports 0 until something is processed and 100 after.
pub fn percent(processed: u64, total: u64) -> u8 {
    if processed == 0 {
        return 0;
    }
    if total == 0 {
        return 100;
    }
    let pct = (processed as f64 / total as f64 * 100.0).round();
    pct.min(100.0) as u8
}
