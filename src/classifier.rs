use serde::{Deserialize, Serialize};

/// Coarse content kind used to pick a preview strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Video,
    Audio,
    Text,
    Other,
}

impl FileKind {
    /// Image, video and audio are embedded as data URLs.
    pub fn is_media(self) -> bool {
        matches!(self, FileKind::Image | FileKind::Video | FileKind::Audio)
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileKind::Image => write!(f, "image"),
            FileKind::Video => write!(f, "video"),
            FileKind::Audio => write!(f, "audio"),
            FileKind::Text => write!(f, "text"),
            FileKind::Other => write!(f, "other"),
        }
    }
}

pub const DEFAULT_MIME: &str = "application/octet-stream";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "mov", "avi", "wmv", "mkv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "ogg", "flac", "aac"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "js", "html", "css", "json", "md", "log", "csv"];

const MIME_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("ogg", "video/ogg"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("wmv", "video/x-ms-wmv"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("m4a", "audio/mp4"),
    ("txt", "text/plain"),
    ("js", "text/javascript"),
    ("html", "text/html"),
    ("css", "text/css"),
    ("json", "application/json"),
    ("md", "text/markdown"),
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
];

fn normalize(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}

/// Map an extension (`"png"`, `".PNG"`) to its content kind.
///
/// Categories are checked image, video, audio, text in that order, so an
/// extension listed twice (`ogg`) resolves to the first match.
pub fn classify(extension: &str) -> FileKind {
    let ext = normalize(extension);
    let ext = ext.as_str();

    if IMAGE_EXTENSIONS.contains(&ext) {
        FileKind::Image
    } else if VIDEO_EXTENSIONS.contains(&ext) {
        FileKind::Video
    } else if AUDIO_EXTENSIONS.contains(&ext) {
        FileKind::Audio
    } else if TEXT_EXTENSIONS.contains(&ext) {
        FileKind::Text
    } else {
        FileKind::Other
    }
}

pub fn mime_type(extension: &str) -> &'static str {
    let ext = normalize(extension);
    MIME_TYPES
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME)
}
