//! Size-capped content loading for the preview pane.

use crate::classifier::{classify, mime_type, FileKind};
use crate::utils::extension_of;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// Largest image, video or audio file embedded as a data URL.
pub const MAX_MEDIA_BYTES: u64 = 10 * 1024 * 1024;

/// Largest text file returned inline.
pub const MAX_TEXT_BYTES: u64 = 100 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPreview {
    pub path: PathBuf,
    pub mime_type: String,
    pub size: u64,
    pub too_large: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPreview {
    pub path: PathBuf,
    pub mime_type: String,
    pub size: u64,
    pub too_large: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherPreview {
    pub path: PathBuf,
    pub mime_type: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPreview {
    pub path: PathBuf,
    pub error: String,
}

/// Exactly one of these comes back per preview request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PreviewPayload {
    Image(MediaPreview),
    Video(MediaPreview),
    Audio(MediaPreview),
    Text(TextPreview),
    Other(OtherPreview),
    Error(ErrorPreview),
}

impl PreviewPayload {
    pub fn kind(&self) -> Option<FileKind> {
        match self {
            PreviewPayload::Image(_) => Some(FileKind::Image),
            PreviewPayload::Video(_) => Some(FileKind::Video),
            PreviewPayload::Audio(_) => Some(FileKind::Audio),
            PreviewPayload::Text(_) => Some(FileKind::Text),
            PreviewPayload::Other(_) => Some(FileKind::Other),
            PreviewPayload::Error(_) => None,
        }
    }

    pub fn is_too_large(&self) -> bool {
        match self {
            PreviewPayload::Image(m) | PreviewPayload::Video(m) | PreviewPayload::Audio(m) => {
                m.too_large
            }
            PreviewPayload::Text(t) => t.too_large,
            _ => false,
        }
    }

    fn media(kind: FileKind, preview: MediaPreview) -> Self {
        match kind {
            FileKind::Video => PreviewPayload::Video(preview),
            FileKind::Audio => PreviewPayload::Audio(preview),
            _ => PreviewPayload::Image(preview),
        }
    }
}

/// Load a preview for `path`. I/O failures become the `error` variant.
pub async fn load_preview(path: &Path) -> PreviewPayload {
    match try_load(path).await {
        Ok(payload) => payload,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "preview failed");
            PreviewPayload::Error(ErrorPreview {
                path: path.to_path_buf(),
                error: err.to_string(),
            })
        }
    }
}

/// Read at most `cap` bytes of `path`. `None` when the file holds more,
/// whatever its size was when it was stat'ed.
async fn read_capped(path: &Path, cap: u64) -> std::io::Result<Option<Vec<u8>>> {
    let file = tokio::fs::File::open(path).await?;
    let mut data = Vec::new();
    file.take(cap + 1).read_to_end(&mut data).await?;
    Ok((data.len() as u64 <= cap).then_some(data))
}

async fn load_within(path: &Path, size: u64, cap: u64) -> std::io::Result<Option<Vec<u8>>> {
    if size > cap {
        return Ok(None);
    }
    read_capped(path, cap).await
}

async fn try_load(path: &Path) -> std::io::Result<PreviewPayload> {
    let meta = tokio::fs::metadata(path).await?;
    let size = meta.len();
    let ext = extension_of(path);
    let kind = classify(&ext);
    let mime = mime_type(&ext).to_string();
    debug!(path = %path.display(), kind = %kind, size, "loading preview");

    let payload = match kind {
        kind if kind.is_media() => {
            let data_url = load_within(path, size, MAX_MEDIA_BYTES)
                .await?
                .map(|data| format!("data:{};base64,{}", mime, STANDARD.encode(data)));
            PreviewPayload::media(
                kind,
                MediaPreview {
                    path: path.to_path_buf(),
                    mime_type: mime,
                    size,
                    too_large: data_url.is_none(),
                    data_url,
                },
            )
        }
        FileKind::Text => {
            let content = load_within(path, size, MAX_TEXT_BYTES)
                .await?
                .map(|data| String::from_utf8_lossy(&data).into_owned());
            PreviewPayload::Text(TextPreview {
                path: path.to_path_buf(),
                mime_type: mime,
                size,
                too_large: content.is_none(),
                content,
            })
        }
        _ => PreviewPayload::Other(OtherPreview {
            path: path.to_path_buf(),
            mime_type: mime,
            size,
        }),
    };

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn large_png_is_flagged_without_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        let file = fs::File::create(&path).unwrap();
        file.set_len(15 * 1024 * 1024).unwrap();

        let payload = load_preview(&path).await;

        let PreviewPayload::Image(media) = &payload else {
            panic!("expected image, got {payload:?}");
        };
        assert!(media.too_large);
        assert_eq!(media.size, 15_728_640);
        assert!(media.data_url.is_none());

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["tooLarge"], true);
        assert!(json.get("dataUrl").is_none());
    }

    #[tokio::test]
    async fn small_media_becomes_a_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.MP3");
        fs::write(&path, b"abc").unwrap();

        let PreviewPayload::Audio(media) = load_preview(&path).await else {
            panic!("expected audio");
        };
        assert!(!media.too_large);
        assert_eq!(media.data_url.as_deref(), Some("data:audio/mpeg;base64,YWJj"));
    }

    #[tokio::test]
    async fn media_exactly_at_the_cap_is_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edge.mp4");
        fs::File::create(&path)
            .unwrap()
            .set_len(MAX_MEDIA_BYTES)
            .unwrap();

        let payload = load_preview(&path).await;
        assert_eq!(payload.kind(), Some(FileKind::Video));
        assert!(!payload.is_too_large());
    }

    #[tokio::test]
    async fn small_text_is_returned_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let body: String = "0123456789\n".repeat(18) + "01";
        assert_eq!(body.len(), 200);
        fs::write(&path, &body).unwrap();

        let payload = load_preview(&path).await;

        let PreviewPayload::Text(text) = &payload else {
            panic!("expected text");
        };
        assert!(!text.too_large);
        assert_eq!(text.content.as_deref(), Some(body.as_str()));
        assert_eq!(text.mime_type, "text/plain");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["tooLarge"], false);
    }

    #[tokio::test]
    async fn large_text_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.log");
        fs::write(&path, vec![b'a'; (MAX_TEXT_BYTES + 1) as usize]).unwrap();

        let PreviewPayload::Text(text) = load_preview(&path).await else {
            panic!("expected text");
        };
        assert!(text.too_large);
        assert!(text.content.is_none());
        assert_eq!(text.size, MAX_TEXT_BYTES + 1);
    }

    #[tokio::test]
    async fn capped_reads_refuse_files_that_outgrow_the_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("growing.log");
        fs::write(&path, vec![b'a'; 64]).unwrap();

        assert_eq!(read_capped(&path, 64).await.unwrap().map(|d| d.len()), Some(64));
        assert!(read_capped(&path, 63).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_size_does_not_lift_the_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grew.txt");
        fs::write(&path, vec![b'a'; 200]).unwrap();

        // Size as stat'ed before the file grew past the cap.
        let data = load_within(&path, 10, 100).await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn other_kinds_carry_metadata_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        fs::write(&path, b"%PDF").unwrap();

        let payload = load_preview(&path).await;
        assert_eq!(
            payload,
            PreviewPayload::Other(OtherPreview {
                path: path.clone(),
                mime_type: "application/pdf".into(),
                size: 4,
            })
        );
    }

    #[tokio::test]
    async fn missing_file_is_an_error_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.png");

        let payload = load_preview(&path).await;

        assert_eq!(payload.kind(), None);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "error");
        assert!(json["error"].as_str().unwrap().len() > 0);
    }
}
