use crate::history::HistoryLogger;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct DeleteConfig {
    pub dry_run: bool,
    pub log_history: bool,
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            log_history: true,
        }
    }
}

/// Result for one requested path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub path: PathBuf,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl DeleteOutcome {
    pub fn deleted(path: PathBuf) -> Self {
        Self {
            path,
            success: true,
            error: None,
        }
    }

    pub fn failed(path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            path,
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct DeleteReport {
    pub outcomes: Vec<DeleteOutcome>,
    pub freed_bytes: u64,
    pub duration: Duration,
}

impl DeleteReport {
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }
}

/// Deletes files one by one. A failure on one path never stops the rest and
/// nothing is rolled back: partial success is a normal outcome.
pub struct DeletionService {
    config: DeleteConfig,
    history: Option<HistoryLogger>,
}

impl DeletionService {
    pub fn new(config: DeleteConfig) -> Self {
        let history = config.log_history.then(HistoryLogger::new);
        Self { config, history }
    }

    pub fn with_history(mut self, history: HistoryLogger) -> Self {
        self.history = Some(history);
        self
    }

    pub fn without_history(mut self) -> Self {
        self.history = None;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.config.dry_run
    }

    /// One outcome per input path, in input order.
    pub async fn delete_files(&self, paths: &[PathBuf]) -> DeleteReport {
        let start = Instant::now();
        let mut report = DeleteReport::default();

        for path in paths {
            match self.delete_path(path).await {
                Ok(size) => {
                    report.freed_bytes += size;
                    report.outcomes.push(DeleteOutcome::deleted(path.clone()));
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "delete failed");
                    report
                        .outcomes
                        .push(DeleteOutcome::failed(path.clone(), err.to_string()));
                }
            }
        }

        report.duration = start.elapsed();
        report
    }

    async fn delete_path(&self, path: &Path) -> std::io::Result<u64> {
        let size = tokio::fs::symlink_metadata(path).await?.len();

        if self.config.dry_run {
            info!(path = %path.display(), "[DRY-RUN] would delete");
            return Ok(size);
        }

        tokio::fs::remove_file(path).await?;
        info!(path = %path.display(), "deleted");

        if let Some(history) = &self.history {
            if let Err(err) = history.log_delete(path, Some(size)) {
                warn!(error = %err, "failed to record deletion history");
            }
        }
        Ok(size)
    }
}

impl Default for DeletionService {
    fn default() -> Self {
        Self::new(DeleteConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn live() -> DeletionService {
        DeletionService::new(DeleteConfig {
            dry_run: false,
            log_history: false,
        })
    }

    #[tokio::test]
    async fn mixed_paths_get_one_outcome_each_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let missing = dir.path().join("missing.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, b"aaaa").unwrap();
        fs::write(&b, b"bb").unwrap();

        let report = live()
            .delete_files(&[a.clone(), missing.clone(), b.clone()])
            .await;

        let paths: Vec<_> = report.outcomes.iter().map(|o| o.path.clone()).collect();
        assert_eq!(paths, vec![a.clone(), missing, b.clone()]);
        assert!(report.outcomes[0].success);
        assert!(!report.outcomes[1].success);
        assert!(report.outcomes[1].error.is_some());
        assert!(report.outcomes[2].success);
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.freed_bytes, 6);
        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[tokio::test]
    async fn directories_are_reported_not_removed() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        let report = live().delete_files(&[sub.clone()]).await;

        assert!(!report.outcomes[0].success);
        assert!(sub.exists());
    }

    #[tokio::test]
    async fn dry_run_keeps_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        fs::write(&a, b"x").unwrap();

        let service = DeletionService::default().without_history();
        assert!(service.is_dry_run());
        let report = service.delete_files(&[a.clone()]).await;

        assert!(report.outcomes[0].success);
        assert!(a.exists());
    }

    #[tokio::test]
    async fn successful_deletes_are_logged_to_history() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        fs::write(&a, b"12345").unwrap();
        let history = HistoryLogger::at(dir.path().join("history.log"));

        let service = live().with_history(history.clone());
        service
            .delete_files(&[a.clone(), dir.path().join("nope")])
            .await;

        let entries = history.read_history(None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, a);
        assert_eq!(entries[0].size, Some(5));
    }

    #[test]
    fn outcome_json_omits_missing_error() {
        let json = serde_json::to_value(DeleteOutcome::deleted(PathBuf::from("/x"))).unwrap();
        assert_eq!(json, serde_json::json!({"path": "/x", "success": true}));
    }
}
