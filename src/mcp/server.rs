use crate::cleaner::{DeleteConfig, DeleteOutcome, DeletionService};
use crate::config::Config;
use crate::error::ScanError;
use crate::history::HistoryLogger;
use crate::preview::{load_preview, PreviewPayload};
use crate::results::collect;
use crate::scanner::{event_channel, DirectoryScanner};
use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars::{self, JsonSchema},
    tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScanFolderInput {
    pub path: String,
    #[serde(default)]
    pub threshold_days: Option<u32>,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_max_files() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PreviewFileInput {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteFilesInput {
    pub paths: Vec<String>,
    #[serde(default)]
    pub execute: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HistoryInput {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScanFolderOutput {
    pub path: String,
    pub threshold_days: u32,
    pub cancelled: bool,
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub old_files: usize,
    pub old_files_size_bytes: u64,
    pub oldest: Vec<OldFileOutput>,
    pub cli_command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OldFileOutput {
    pub path: String,
    pub size_bytes: u64,
    pub last_accessed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteOutput {
    pub dry_run: bool,
    pub deleted: usize,
    pub failed: usize,
    pub freed_bytes: u64,
    pub outcomes: Vec<DeleteOutcomeOutput>,
    pub cli_command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteOutcomeOutput {
    pub path: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<DeleteOutcome> for DeleteOutcomeOutput {
    fn from(outcome: DeleteOutcome) -> Self {
        Self {
            path: outcome.path.to_string_lossy().to_string(),
            success: outcome.success,
            error: outcome.error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HistoryOutput {
    pub entries: Vec<HistoryEntryOutput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HistoryEntryOutput {
    pub timestamp: String,
    pub action: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

fn scan_error(err: ScanError) -> McpError {
    match err {
        ScanError::Task { .. } => McpError::internal_error(err.to_string(), None),
        _ => McpError::invalid_params(err.to_string(), None),
    }
}

#[derive(Debug, Clone)]
pub struct StaleCleanServer {
    config: Config,
    scanner: Arc<DirectoryScanner>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl StaleCleanServer {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            scanner: DirectoryScanner::new(),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Scan a folder and list files that have not been accessed within the threshold")]
    pub async fn scan_folder(
        &self,
        input: Parameters<ScanFolderInput>,
    ) -> Result<CallToolResult, McpError> {
        let output = self.scan(input.0).await.map_err(scan_error)?;
        Ok(CallToolResult::success(vec![Content::json(output)?]))
    }

    #[tool(description = "Describe a file's preview: type, MIME type, size and text content. Media data is omitted")]
    pub async fn preview_file(
        &self,
        input: Parameters<PreviewFileInput>,
    ) -> Result<CallToolResult, McpError> {
        let mut payload = load_preview(&PathBuf::from(&input.0.path)).await;
        if let PreviewPayload::Image(m) | PreviewPayload::Video(m) | PreviewPayload::Audio(m) =
            &mut payload
        {
            m.data_url = None;
        }
        Ok(CallToolResult::success(vec![Content::json(payload)?]))
    }

    #[tool(description = "Delete files (dry-run unless execute is true) and get the CLI command to execute")]
    pub async fn delete_files(
        &self,
        input: Parameters<DeleteFilesInput>,
    ) -> Result<CallToolResult, McpError> {
        let output = self.delete(input.0).await;
        Ok(CallToolResult::success(vec![Content::json(output)?]))
    }

    #[tool(description = "Get deletion history")]
    pub async fn get_history(
        &self,
        input: Parameters<HistoryInput>,
    ) -> Result<CallToolResult, McpError> {
        let logger = HistoryLogger::new();
        let entries = logger
            .read_history(Some(input.0.limit))
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        let output = HistoryOutput {
            entries: entries
                .into_iter()
                .map(|e| HistoryEntryOutput {
                    timestamp: e.timestamp.to_rfc3339(),
                    action: e.action,
                    path: e.path.to_string_lossy().to_string(),
                    size: e.size,
                })
                .collect(),
        };

        Ok(CallToolResult::success(vec![Content::json(output)?]))
    }
}

impl StaleCleanServer {
    async fn scan(&self, input: ScanFolderInput) -> Result<ScanFolderOutput, ScanError> {
        let days = input
            .threshold_days
            .unwrap_or(self.config.scan.default_threshold_days);
        let root = PathBuf::from(&input.path);

        let (tx, rx) = event_channel();
        let task = self.scanner.start(root, days, tx).await?;
        let scanned = task.root().to_string_lossy().to_string();
        let (summary, results) = collect(task, rx, |_| {}).await?;

        let stats = results.stats();
        let mut old: Vec<_> = results.old_files().collect();
        old.sort_by(|a, b| a.last_accessed.cmp(&b.last_accessed));

        Ok(ScanFolderOutput {
            cli_command: format!("staleclean scan {:?} --days {} --format json", scanned, days),
            path: scanned,
            threshold_days: days,
            cancelled: summary.cancelled,
            total_files: stats.total_files,
            total_size_bytes: stats.total_size,
            old_files: stats.old_files,
            old_files_size_bytes: stats.old_files_size,
            oldest: old
                .into_iter()
                .take(input.max_files)
                .map(|f| OldFileOutput {
                    path: f.path.to_string_lossy().to_string(),
                    size_bytes: f.size,
                    last_accessed: f.last_accessed.to_rfc3339(),
                })
                .collect(),
        })
    }

    async fn delete(&self, input: DeleteFilesInput) -> DeleteOutput {
        let service = DeletionService::new(DeleteConfig {
            dry_run: !input.execute,
            log_history: self.config.clean.log_history,
        });
        let paths: Vec<PathBuf> = input.paths.iter().map(PathBuf::from).collect();
        let report = service.delete_files(&paths).await;

        let quoted: Vec<String> = input.paths.iter().map(|p| format!("{:?}", p)).collect();
        DeleteOutput {
            dry_run: service.is_dry_run(),
            deleted: report.success_count(),
            failed: report.failed_count(),
            freed_bytes: report.freed_bytes,
            outcomes: report.outcomes.into_iter().map(Into::into).collect(),
            cli_command: format!("staleclean delete {} --execute", quoted.join(" ")),
        }
    }
}

#[tool_handler]
impl ServerHandler for StaleCleanServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_mcp_server(config: Config) -> anyhow::Result<()> {
    use rmcp::transport::stdio;

    let server = StaleCleanServer::new(config);
    let service = server.serve(stdio()).await?;

    service.waiting().await?;

    Ok(())
}
