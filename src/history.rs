use crate::config::Config;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One line of the deletion log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub path: PathBuf,
    pub size: Option<u64>,
}

impl HistoryEntry {
    pub fn new(action: impl Into<String>, path: PathBuf) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.into(),
            path,
            size: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Tab separated so paths with spaces survive the round trip.
    pub fn to_log_line(&self) -> String {
        let size_str = self.size.map(|s| s.to_string()).unwrap_or_default();
        format!(
            "{}\t{}\t{}\t{}\n",
            self.timestamp.to_rfc3339(),
            self.action,
            self.path.display(),
            size_str
        )
    }

    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split('\t');
        let timestamp = DateTime::parse_from_rfc3339(parts.next()?)
            .ok()?
            .with_timezone(&Utc);
        let action = parts.next()?.to_string();
        let path = PathBuf::from(parts.next()?);
        let size = parts.next().and_then(|s| s.parse::<u64>().ok());

        Some(Self {
            timestamp,
            action,
            path,
            size,
        })
    }
}

/// Append-only record of deletions, kept under the data directory.
#[derive(Debug, Clone)]
pub struct HistoryLogger {
    log_path: PathBuf,
}

impl HistoryLogger {
    pub fn new() -> Self {
        Self::at(Config::data_dir().join("history.log"))
    }

    pub fn at(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    pub fn log(&self, entry: &HistoryEntry) -> Result<()> {
        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        write!(file, "{}", entry.to_log_line())?;
        Ok(())
    }

    pub fn log_delete(&self, path: &Path, size: Option<u64>) -> Result<()> {
        let mut entry = HistoryEntry::new("DELETE", path.to_path_buf());
        if let Some(s) = size {
            entry = entry.with_size(s);
        }
        self.log(&entry)
    }

    /// Most recent first when `limit` is given, file order otherwise.
    pub fn read_history(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.log_path)?;
        let entries: Vec<HistoryEntry> = content.lines().filter_map(HistoryEntry::parse).collect();

        let result = if let Some(n) = limit {
            entries.into_iter().rev().take(n).collect()
        } else {
            entries
        };

        Ok(result)
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

impl Default for HistoryLogger {
    fn default() -> Self {
        Self::new()
    }
}
