use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Hand `path` to the desktop's default application.
pub async fn open_file(path: &Path) -> OpenOutcome {
    if let Err(err) = tokio::fs::metadata(path).await {
        return failure(path, err.to_string());
    }

    let target: PathBuf = path.to_path_buf();
    match tokio::task::spawn_blocking(move || open::that(&target)).await {
        Ok(Ok(())) => OpenOutcome {
            success: true,
            error: None,
        },
        Ok(Err(err)) => failure(path, err.to_string()),
        Err(err) => failure(path, err.to_string()),
    }
}

fn failure(path: &Path, error: String) -> OpenOutcome {
    warn!(path = %path.display(), error = %error, "open failed");
    OpenOutcome {
        success: false,
        error: Some(error),
    }
}
