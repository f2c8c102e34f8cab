use staleclean::cleaner::{DeleteConfig, DeletionService};
use staleclean::results::collect;
use staleclean::scanner::{event_channel, DirectoryScanner, ScanEvent};
use staleclean::ScanError;
use std::fs::{self, File, FileTimes};
use std::path::Path;
use std::time::{Duration, SystemTime};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

fn write_aged(path: &Path, body: &[u8], days_ago: u64) {
    fs::write(path, body).unwrap();
    let when = SystemTime::now() - DAY * days_ago as u32;
    let file = File::options().write(true).open(path).unwrap();
    file.set_times(FileTimes::new().set_accessed(when).set_modified(when))
        .unwrap();
}

#[tokio::test]
async fn old_files_are_flagged_against_the_threshold() {
    let dir = tempfile::tempdir().unwrap();
    write_aged(&dir.path().join("a.txt"), b"stale", 100);
    write_aged(&dir.path().join("b.jpg"), b"fresh!", 1);

    let scanner = DirectoryScanner::new();
    let (tx, rx) = event_channel();
    let task = scanner.start(dir.path(), 30, tx).await.unwrap();
    let mut seen = Vec::new();
    let (summary, results) = collect(task, rx, |e| seen.push(e.clone()))
        .await
        .unwrap();

    assert!(!summary.cancelled);
    assert_eq!(summary.total_files, 2);
    assert!(!scanner.is_active());

    let flags: Vec<(String, bool)> = results
        .files()
        .iter()
        .map(|f| (f.name.clone(), f.is_old))
        .collect();
    assert_eq!(
        flags,
        vec![("a.txt".to_string(), true), ("b.jpg".to_string(), false)]
    );

    let stats = results.stats();
    assert_eq!(stats.total_files, 2);
    assert_eq!(stats.total_size, 11);
    assert_eq!(stats.old_files, 1);
    assert_eq!(stats.old_files_size, 5);

    assert!(matches!(
        seen.last(),
        Some(ScanEvent::Complete {
            success: true,
            total_files: 2,
            cancelled: false,
            ..
        })
    ));
}

#[tokio::test]
async fn records_serialize_for_the_front_end() {
    let dir = tempfile::tempdir().unwrap();
    write_aged(&dir.path().join("report.pdf"), &[0u8; 1536], 45);

    let scanner = DirectoryScanner::new();
    let (tx, rx) = event_channel();
    let task = scanner.start(dir.path(), 30, tx).await.unwrap();
    let (_, results) = collect(task, rx, |_| {}).await.unwrap();

    let json = serde_json::to_value(&results.files()[0]).unwrap();
    assert_eq!(json["name"], "report.pdf");
    assert_eq!(json["size"], 1536);
    assert_eq!(json["sizeFormatted"], "1.5 KB");
    assert_eq!(json["isOld"], true);
    assert!(json["lastAccessed"].is_string());
    assert!(json["parentDir"].is_string());
}

#[tokio::test]
async fn second_scan_is_rejected_until_the_first_is_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..2000 {
        fs::write(dir.path().join(format!("f{i:04}.txt")), b"x").unwrap();
    }

    let scanner = DirectoryScanner::new();
    let (tx, rx) = event_channel();
    let first = scanner.start(dir.path(), 30, tx).await.unwrap();

    let (tx2, _rx2) = event_channel();
    let second = scanner.start(dir.path(), 30, tx2).await;
    assert!(matches!(second, Err(ScanError::AlreadyRunning)));

    assert!(scanner.cancel(first.handle()));
    let mut completions = Vec::new();
    let (summary, _) = collect(first, rx, |e| {
        if let ScanEvent::Complete {
            success, cancelled, ..
        } = e
        {
            completions.push((*success, *cancelled));
        }
    })
    .await
    .unwrap();

    assert!(summary.cancelled);
    assert_eq!(completions, vec![(false, true)]);
    assert!(!scanner.is_active());

    let (tx3, rx3) = event_channel();
    let again = scanner.start(dir.path(), 30, tx3).await.unwrap();
    let (summary, results) = collect(again, rx3, |_| {}).await.unwrap();
    assert!(!summary.cancelled);
    assert_eq!(results.files().len(), 2000);
}

#[tokio::test]
async fn unusable_roots_fail_without_events() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    fs::write(&file, b"x").unwrap();
    let scanner = DirectoryScanner::new();

    let (tx, mut rx) = event_channel();
    let missing = scanner.start(dir.path().join("missing"), 30, tx).await;
    assert!(matches!(missing, Err(ScanError::RootUnreadable { .. })));
    assert!(rx.recv().await.is_none());

    let (tx, _rx) = event_channel();
    let not_dir = scanner.start(&file, 30, tx).await;
    assert!(matches!(not_dir, Err(ScanError::NotADirectory { .. })));
    assert!(!scanner.is_active());
}

#[tokio::test]
async fn deleting_a_selection_updates_the_results() {
    let dir = tempfile::tempdir().unwrap();
    write_aged(&dir.path().join("old1.txt"), b"aaaa", 90);
    fs::create_dir(dir.path().join("nested")).unwrap();
    write_aged(&dir.path().join("nested/old2.txt"), b"bb", 90);
    write_aged(&dir.path().join("new.txt"), b"c", 0);

    let scanner = DirectoryScanner::new();
    let (tx, rx) = event_channel();
    let task = scanner.start(dir.path(), 30, tx).await.unwrap();
    let (_, mut results) = collect(task, rx, |_| {}).await.unwrap();
    assert_eq!(results.stats().old_files, 2);

    let mut selection: Vec<_> = results.old_files().map(|f| f.path.clone()).collect();
    selection.push(dir.path().join("never-existed.txt"));

    let service = DeletionService::new(DeleteConfig {
        dry_run: false,
        log_history: false,
    });
    let report = service.delete_files(&selection).await;
    assert_eq!(report.success_count(), 2);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.freed_bytes, 6);

    assert_eq!(results.remove_deleted(&report.outcomes), 2);
    let stats = results.stats();
    assert_eq!(stats.total_files, 1);
    assert_eq!(stats.old_files, 0);
    assert_eq!(results.tree().total_size(), 1);
    assert!(!dir.path().join("nested/old2.txt").exists());
}

#[tokio::test]
async fn relative_roots_produce_absolute_records() {
    let cwd = std::env::current_dir().unwrap();
    let dir = tempfile::tempdir_in(&cwd).unwrap();
    let relative = dir.path().strip_prefix(&cwd).unwrap().to_path_buf();
    assert!(relative.is_relative());
    fs::create_dir(relative.join("sub")).unwrap();
    fs::write(relative.join("sub/a.txt"), b"x").unwrap();

    let scanner = DirectoryScanner::new();
    let (tx, rx) = event_channel();
    let task = scanner.start(&relative, 30, tx).await.unwrap();
    assert!(task.root().is_absolute());
    let (_, results) = collect(task, rx, |_| {}).await.unwrap();

    let record = &results.files()[0];
    assert!(record.path.is_absolute());
    assert!(record.parent_dir.is_absolute());
    assert_eq!(record.path, fs::canonicalize(relative.join("sub/a.txt")).unwrap());
    assert_eq!(results.tree().sub_folders["sub"].files.len(), 1);
}

#[tokio::test]
async fn next_scan_can_start_as_soon_as_complete_arrives() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..3 {
        fs::write(dir.path().join(format!("f{i}.txt")), b"x").unwrap();
    }

    let scanner = DirectoryScanner::new();
    let (tx, mut rx) = event_channel();
    let first = scanner.start(dir.path(), 30, tx).await.unwrap();

    while let Some(event) = rx.recv().await {
        if matches!(event, ScanEvent::Complete { .. }) {
            break;
        }
    }
    assert!(!scanner.is_active());

    let (tx2, rx2) = event_channel();
    let second = scanner.start(dir.path(), 30, tx2).await.unwrap();
    let (summary, results) = collect(second, rx2, |_| {}).await.unwrap();
    assert_eq!(summary.session, 2);
    assert_eq!(results.files().len(), 3);
    assert_eq!(first.wait().await.unwrap().session, 1);
}
