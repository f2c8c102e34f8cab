//! Wire shapes for the JSON-lines command/event stream.
//!
//! One JSON object per line in each direction. Requests carry an `id` and a
//! `command`; responses echo the `id`; scan events carry an `event` tag and
//! no `id`.

use crate::scanner::ScanEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    pub id: u64,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    SelectFolder {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    ScanFolder {
        path: PathBuf,
        threshold_days: u32,
    },
    CancelScan,
    DeleteFiles {
        paths: Vec<PathBuf>,
    },
    GetFilePreview {
        path: PathBuf,
    },
    OpenFile {
        path: PathBuf,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SelectFolder { .. } => "selectFolder",
            Command::ScanFolder { .. } => "scanFolder",
            Command::CancelScan => "cancelScan",
            Command::DeleteFiles { .. } => "deleteFiles",
            Command::GetFilePreview { .. } => "getFilePreview",
            Command::OpenFile { .. } => "openFile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub id: Option<u64>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl Response {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id: Some(id),
            ok: true,
            result: Some(result),
            error: None,
            code: None,
        }
    }

    pub fn failure(id: Option<u64>, code: &'static str, error: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(error.into()),
            code: Some(code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Anything written to the output stream.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Outgoing {
    Response(Response),
    Event(ScanEvent),
}
