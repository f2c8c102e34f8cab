//! Small display and path helpers shared by the scanner and the front ends.

use std::path::{Path, PathBuf};

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Render a byte count as `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`...
///
/// Base 1024, at most two decimals, trailing zeros dropped.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut exp = 0usize;
    while exp + 1 < SIZE_UNITS.len() && bytes >= 1024u64.pow(exp as u32 + 1) {
        exp += 1;
    }

    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');

    format!("{} {}", trimmed, SIZE_UNITS[exp])
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

pub fn parent_dir_of(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.to_path_buf())
}

/// Lowercased extension without the dot, empty when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
