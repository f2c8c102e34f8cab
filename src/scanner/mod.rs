//! Directory scanner: counting pre-pass, cancellable recursive walk, and the
//! session bookkeeping that ties them to one caller.

pub mod counter;
pub mod event;
pub mod session;
mod walk;

pub use counter::count_files;
pub use event::{event_channel, percent, EventReceiver, EventSender, ScanEvent};
pub use session::{DirectoryScanner, ScanHandle, ScanSession, ScanSummary, ScanTask};

use crate::utils::{file_name_of, format_size, parent_dir_of};
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::ffi::OsStr;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

/// Records accumulated before a `batch` event is pushed.
pub const BATCH_SIZE: usize = 500;

/// A `progress` event goes out every this many processed files.
pub const PROGRESS_INTERVAL: u64 = 50;

/// Windows system directories that are never descended into.
pub const EXCLUDED_DIR_NAMES: [&str; 2] = ["$RECYCLE.BIN", "System Volume Information"];

pub fn is_excluded_dir_name(name: &OsStr) -> bool {
    EXCLUDED_DIR_NAMES.iter().any(|excluded| name == *excluded)
}

/// Instant before which a last access makes a file old.
///
/// Saturates to the earliest representable instant for absurd thresholds.
pub fn cutoff_for(now: DateTime<Utc>, threshold_days: u32) -> DateTime<Utc> {
    chrono::Duration::try_days(i64::from(threshold_days))
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn is_old(last_accessed: DateTime<Utc>, cutoff: DateTime<Utc>) -> bool {
    last_accessed < cutoff
}

/// One scanned file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub last_accessed: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub is_old: bool,
    pub parent_dir: PathBuf,
}

impl FileRecord {
    /// Build a record from a stat result, or `None` when the platform reports
    /// neither an access nor a modification time.
    pub fn from_metadata(path: &Path, metadata: &Metadata, cutoff: DateTime<Utc>) -> Option<Self> {
        let accessed = metadata.accessed().or_else(|_| metadata.modified()).ok()?;
        let modified = metadata.modified().or_else(|_| metadata.accessed()).ok()?;
        let last_accessed: DateTime<Utc> = accessed.into();

        Some(Self {
            path: path.to_path_buf(),
            name: file_name_of(path),
            size: metadata.len(),
            last_accessed,
            last_modified: modified.into(),
            is_old: is_old(last_accessed, cutoff),
            parent_dir: parent_dir_of(path),
        })
    }

    pub fn size_formatted(&self) -> String {
        format_size(self.size)
    }
}

impl Serialize for FileRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FileRecord", 8)?;
        state.serialize_field("path", &self.path)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("size", &self.size)?;
        state.serialize_field("sizeFormatted", &self.size_formatted())?;
        state.serialize_field("lastAccessed", &self.last_accessed)?;
        state.serialize_field("lastModified", &self.last_modified)?;
        state.serialize_field("isOld", &self.is_old)?;
        state.serialize_field("parentDir", &self.parent_dir)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(accessed: DateTime<Utc>, cutoff: DateTime<Utc>) -> FileRecord {
        FileRecord {
            path: PathBuf::from("/data/a.txt"),
            name: "a.txt".into(),
            size: 1536,
            last_accessed: accessed,
            last_modified: accessed,
            is_old: is_old(accessed, cutoff),
            parent_dir: PathBuf::from("/data"),
        }
    }

    #[test]
    fn cutoff_is_threshold_days_before_now() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        let cutoff = cutoff_for(now, 30);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        assert_eq!(cutoff_for(now, 0), now);
    }

    #[test]
    fn huge_thresholds_saturate() {
        let now = Utc::now();
        assert_eq!(cutoff_for(now, u32::MAX), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn old_is_strictly_before_cutoff() {
        let cutoff = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert!(is_old(cutoff - chrono::Duration::milliseconds(1), cutoff));
        assert!(!is_old(cutoff, cutoff));
        assert!(!is_old(cutoff + chrono::Duration::days(1), cutoff));
    }

    #[test]
    fn excluded_names_match_exactly() {
        assert!(is_excluded_dir_name(OsStr::new("$RECYCLE.BIN")));
        assert!(is_excluded_dir_name(OsStr::new("System Volume Information")));
        assert!(!is_excluded_dir_name(OsStr::new("$recycle.bin")));
        assert!(!is_excluded_dir_name(OsStr::new("System")));
    }

    #[test]
    fn serializes_derived_size_string() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let rec = record(now - chrono::Duration::days(100), cutoff_for(now, 30));
        let json = serde_json::to_value(&rec).unwrap();

        assert_eq!(json["sizeFormatted"], "1.5 KB");
        assert_eq!(json["isOld"], true);
        assert_eq!(json["parentDir"], "/data");

        let back: FileRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, rec);
    }
}
