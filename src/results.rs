//! Collaborator-side view of a scan: the flat file list, the folder tree
//! built from it, and summary figures.

use crate::cleaner::DeleteOutcome;
use crate::error::Result;
use crate::scanner::{
    is_excluded_dir_name, EventReceiver, FileRecord, ScanEvent, ScanSummary, ScanTask,
};
use crate::utils::{file_name_of, format_size};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

/// A directory in the tree view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    pub path: PathBuf,
    pub name: String,
    pub sub_folders: BTreeMap<String, FolderNode>,
    pub files: Vec<FileRecord>,
}

impl FolderNode {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: file_name_of(&path),
            path,
            sub_folders: BTreeMap::new(),
            files: Vec::new(),
        }
    }

    /// File the record under its parent directory, creating intermediate
    /// folders as needed. Returns `false` for records outside this folder or
    /// under an excluded system directory.
    pub fn insert(&mut self, record: FileRecord) -> bool {
        let Ok(relative) = record.parent_dir.strip_prefix(&self.path) else {
            return false;
        };

        let mut names = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(name) if !is_excluded_dir_name(name) => {
                    names.push(name.to_string_lossy().to_string());
                }
                _ => return false,
            }
        }

        let mut node = self;
        for name in names {
            let child_path = node.path.join(&name);
            node = node
                .sub_folders
                .entry(name)
                .or_insert_with(|| FolderNode::new(child_path));
        }
        node.files.push(record);
        true
    }

    /// A copy of this tree without the given file paths. Folders left empty
    /// are kept, matching what is still on disk.
    pub fn without_paths(&self, removed: &HashSet<PathBuf>) -> FolderNode {
        FolderNode {
            path: self.path.clone(),
            name: self.name.clone(),
            sub_folders: self
                .sub_folders
                .iter()
                .map(|(name, child)| (name.clone(), child.without_paths(removed)))
                .collect(),
            files: self
                .files
                .iter()
                .filter(|f| !removed.contains(&f.path))
                .cloned()
                .collect(),
        }
    }

    pub fn find(&self, path: &Path) -> Option<&FolderNode> {
        let relative = path.strip_prefix(&self.path).ok()?;
        let mut node = self;
        for component in relative.components() {
            let name = component.as_os_str().to_string_lossy();
            node = node.sub_folders.get(name.as_ref())?;
        }
        Some(node)
    }

    /// Files in this folder and below, depth first, sub folders in name order.
    pub fn iter_files(&self) -> Box<dyn Iterator<Item = &FileRecord> + '_> {
        Box::new(
            self.files
                .iter()
                .chain(self.sub_folders.values().flat_map(|c| c.iter_files())),
        )
    }

    pub fn total_size(&self) -> u64 {
        self.iter_files().map(|f| f.size).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub total_files: usize,
    pub total_size: u64,
    pub old_files: usize,
    pub old_files_size: u64,
}

impl ScanStats {
    pub fn from_files<'a>(files: impl IntoIterator<Item = &'a FileRecord>) -> Self {
        files.into_iter().fold(Self::default(), |mut stats, f| {
            stats.total_files += 1;
            stats.total_size += f.size;
            if f.is_old {
                stats.old_files += 1;
                stats.old_files_size += f.size;
            }
            stats
        })
    }

    pub fn total_size_formatted(&self) -> String {
        format_size(self.total_size)
    }

    pub fn old_files_size_formatted(&self) -> String {
        format_size(self.old_files_size)
    }
}

/// Accumulates `batch` events for one scan root.
#[derive(Debug, Clone)]
pub struct ScanResults {
    files: Vec<FileRecord>,
    tree: FolderNode,
}

impl ScanResults {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            files: Vec::new(),
            tree: FolderNode::new(root),
        }
    }

    pub fn absorb(&mut self, batch: Vec<FileRecord>) {
        for record in batch {
            if self.tree.insert(record.clone()) {
                self.files.push(record);
            }
        }
    }

    /// Drop every successfully deleted path; failed deletions stay listed.
    pub fn remove_deleted(&mut self, outcomes: &[DeleteOutcome]) -> usize {
        let removed: HashSet<PathBuf> = outcomes
            .iter()
            .filter(|o| o.success)
            .map(|o| o.path.clone())
            .collect();
        if removed.is_empty() {
            return 0;
        }

        let before = self.files.len();
        self.files.retain(|f| !removed.contains(&f.path));
        self.tree = self.tree.without_paths(&removed);
        before - self.files.len()
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn old_files(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.iter().filter(|f| f.is_old)
    }

    pub fn tree(&self) -> &FolderNode {
        &self.tree
    }

    pub fn stats(&self) -> ScanStats {
        ScanStats::from_files(&self.files)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Drain `events` until the walk drops its sender, folding this task's
/// batches into a [`ScanResults`] rooted at the task's canonical root, then
/// await the summary. Events left over from other sessions are skipped.
///
/// The caller must not keep a clone of the sender, or this never returns.
pub async fn collect(
    task: ScanTask,
    mut events: EventReceiver,
    mut observe: impl FnMut(&ScanEvent),
) -> Result<(ScanSummary, ScanResults)> {
    let session = task.handle().id();
    let mut results = ScanResults::new(task.root());
    while let Some(event) = events.recv().await {
        if event.session() != session {
            continue;
        }
        observe(&event);
        if let ScanEvent::Batch { files, .. } = event {
            results.absorb(files);
        }
    }

    let summary = task.wait().await?;
    Ok((summary, results))
}
