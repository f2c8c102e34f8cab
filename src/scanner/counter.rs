use super::is_excluded_dir_name;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Count the non-directory entries under `root`.
///
/// Excluded system directories are pruned at any depth and unreadable
/// subtrees are logged and skipped. When `cancelled` flips mid-walk the
/// count stops early and is only a lower bound.
pub fn count_files(root: &Path, cancelled: &AtomicBool) -> u64 {
    let mut count = 0u64;

    let entries = WalkDir::new(root).into_iter().filter_entry(|e| {
        if cancelled.load(Ordering::Relaxed) {
            return false;
        }
        !(e.depth() > 0 && e.file_type().is_dir() && is_excluded_dir_name(e.file_name()))
    });

    for entry in entries {
        if cancelled.load(Ordering::Relaxed) {
            debug!(root = %root.display(), counted = count, "count cancelled");
            break;
        }

        match entry {
            Ok(e) if !e.file_type().is_dir() => count += 1,
            Ok(_) => {}
            Err(err) => {
                warn!(
                    path = ?err.path(),
                    error = %err,
                    "skipping unreadable subtree while counting"
                );
            }
        }
    }

    count
}

/// Run [`count_files`] on the blocking pool so the async walk stays responsive.
pub async fn count_files_async(root: PathBuf, cancelled: Arc<AtomicBool>) -> u64 {
    let task = tokio::task::spawn_blocking(move || count_files(&root, &cancelled));
    match task.await {
        Ok(count) => count,
        Err(err) => {
            warn!(error = %err, "file count task failed");
            0
        }
    }
}
