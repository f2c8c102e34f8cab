mod cli;

use anyhow::{Context, Result};
use cli::{Cli, Commands, ConfigActions, OutputFormat};
use serde::Serialize;
use staleclean::cleaner::{DeleteConfig, DeletionService};
use staleclean::config::Config;
use staleclean::history::HistoryLogger;
use staleclean::opener::open_file;
use staleclean::preview::{load_preview, PreviewPayload};
use staleclean::results::{collect, ScanStats};
use staleclean::scanner::{event_channel, DirectoryScanner, FileRecord, ScanEvent, ScanSummary};
use staleclean::utils::format_size;
use staleclean::{logging, mcp, transport};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let result = match Config::load() {
        Ok(config) => {
            logging::init(&config.log);
            run(cli, config)
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create tokio runtime")
}

fn run(cli: Cli, config: Config) -> Result<ExitCode> {
    match cli.command {
        Commands::Scan {
            path,
            days,
            format,
            out,
            limit,
        } => {
            let days = days.unwrap_or(config.scan.default_threshold_days);
            runtime()?.block_on(run_scan(path, days, format, out.as_deref(), limit))
        }
        Commands::Preview { path } => runtime()?.block_on(run_preview(&path)),
        Commands::Delete { paths, execute } => {
            runtime()?.block_on(run_delete(&paths, execute, &config))
        }
        Commands::Open { path } => runtime()?.block_on(run_open(&path)),
        Commands::Serve => {
            runtime()?.block_on(run_serve(&config))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Mcp => {
            runtime()?.block_on(mcp::run_mcp_server(config))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::History { limit } => {
            run_history(limit)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { action } => {
            run_config(action, config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanReport<'a> {
    root: &'a Path,
    threshold_days: u32,
    summary: &'a ScanSummary,
    stats: ScanStats,
    files: &'a [FileRecord],
}

async fn run_scan(
    root: PathBuf,
    days: u32,
    format: OutputFormat,
    out: Option<&Path>,
    limit: usize,
) -> Result<ExitCode> {
    let scanner = DirectoryScanner::new();
    let (tx, rx) = event_channel();
    let task = scanner.start(root, days, tx).await?;
    let root = task.root().to_path_buf();

    let interrupt = {
        let scanner = scanner.clone();
        let handle = task.handle().clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted, cancelling scan");
                scanner.cancel(&handle);
            }
        })
    };

    let show_progress = format == OutputFormat::Human && out.is_none();
    let (summary, results) = collect(task, rx, |event| {
        if !show_progress {
            return;
        }
        if let ScanEvent::Progress {
            processed,
            total,
            percent,
            ..
        } = event
        {
            eprint!("\rScanning... {}/{} ({}%)", processed, total, percent);
            let _ = std::io::stderr().flush();
        }
    })
    .await?;
    interrupt.abort();
    if show_progress {
        eprintln!();
    }

    let stats = results.stats();
    match format {
        OutputFormat::Json => {
            let report = ScanReport {
                root: &root,
                threshold_days: days,
                summary: &summary,
                stats,
                files: results.files(),
            };
            let json = serde_json::to_string_pretty(&report)?;
            if let Some(path) = out {
                fs::write(path, &json)?;
            } else {
                println!("{}", json);
            }
        }
        OutputFormat::Human => {
            if summary.cancelled {
                println!("Scan cancelled; results are partial.\n");
            }
            println!("Folder: {}", root.display());
            println!("  Files: {}", stats.total_files);
            println!("  Size: {}", stats.total_size_formatted());
            println!(
                "  Not accessed in {} days: {} ({})",
                days,
                stats.old_files,
                stats.old_files_size_formatted()
            );

            let mut old: Vec<&FileRecord> = results.old_files().collect();
            old.sort_by(|a, b| a.last_accessed.cmp(&b.last_accessed));
            if !old.is_empty() {
                println!();
                for file in old.iter().take(limit) {
                    println!(
                        "  - {} ({}, last accessed {})",
                        file.path.display(),
                        file.size_formatted(),
                        file.last_accessed.format("%Y-%m-%d")
                    );
                }
                if old.len() > limit {
                    println!("  ... and {} more", old.len() - limit);
                }
            }
        }
    }

    Ok(if summary.cancelled {
        ExitCode::from(130)
    } else {
        ExitCode::SUCCESS
    })
}

async fn run_preview(path: &Path) -> Result<ExitCode> {
    let payload = load_preview(path).await;
    match &payload {
        PreviewPayload::Image(m) | PreviewPayload::Video(m) | PreviewPayload::Audio(m) => {
            println!("{} ({}, {})", path.display(), m.mime_type, format_size(m.size));
            if m.too_large {
                println!("  Too large to preview");
            } else {
                println!("  Data URL: {} bytes", m.data_url.as_ref().map_or(0, String::len));
            }
        }
        PreviewPayload::Text(t) => {
            println!("{} ({}, {})", path.display(), t.mime_type, format_size(t.size));
            match &t.content {
                Some(content) => println!("\n{}", content),
                None => println!("  Too large to preview"),
            }
        }
        PreviewPayload::Other(o) => {
            println!("{} ({}, {})", path.display(), o.mime_type, format_size(o.size));
            println!("  No preview available");
        }
        PreviewPayload::Error(e) => {
            println!("Cannot preview {}: {}", path.display(), e.error);
            return Ok(ExitCode::from(1));
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_delete(paths: &[PathBuf], execute: bool, config: &Config) -> Result<ExitCode> {
    let service = DeletionService::new(DeleteConfig {
        dry_run: !execute && config.clean.dry_run_by_default,
        log_history: config.clean.log_history,
    });

    println!(
        "{} mode\n",
        if service.is_dry_run() { "Dry-run" } else { "Execute" }
    );

    let report = service.delete_files(paths).await;

    println!("Results:");
    println!("  Deleted: {} items", report.success_count());
    println!("  Failed: {} items", report.failed_count());
    println!("  Freed: {}", format_size(report.freed_bytes));
    println!("  Duration: {:?}", report.duration);

    let failed: Vec<_> = report.outcomes.iter().filter(|o| !o.success).collect();
    if !failed.is_empty() {
        println!("\nFailed items:");
        for outcome in &failed {
            println!(
                "  - {}: {}",
                outcome.path.display(),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
        return Ok(ExitCode::from(1));
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_open(path: &Path) -> Result<ExitCode> {
    let outcome = open_file(path).await;
    if outcome.success {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "Cannot open {}: {}",
            path.display(),
            outcome.error.as_deref().unwrap_or("unknown error")
        );
        Ok(ExitCode::from(1))
    }
}

/// The front end owns the confirmation dialog, so requests delete for real.
async fn run_serve(config: &Config) -> Result<()> {
    let deleter = DeletionService::new(DeleteConfig {
        dry_run: false,
        log_history: config.clean.log_history,
    });
    transport::serve(
        tokio::io::stdin(),
        tokio::io::stdout(),
        DirectoryScanner::new(),
        deleter,
    )
    .await?;
    Ok(())
}

fn run_config(action: ConfigActions, mut config: Config) -> Result<()> {
    match action {
        ConfigActions::Show => {
            println!("Current configuration ({}):", Config::config_path().display());
            println!("  Threshold days: {}", config.scan.default_threshold_days);
            println!("  Dry run by default: {}", config.clean.dry_run_by_default);
            println!("  Log history: {}", config.clean.log_history);
            println!("  Log level: {}", config.log.level);
        }
        ConfigActions::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            println!("Set {} to {}", key, value);
        }
    }

    Ok(())
}

fn run_history(limit: usize) -> Result<()> {
    let logger = HistoryLogger::new();
    let entries = logger.read_history(Some(limit))?;

    if entries.is_empty() {
        println!("No history found.");
        return Ok(());
    }

    println!("Last {} deletion(s):\n", entries.len());

    for entry in entries {
        println!(
            "{} {} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.path.display()
        );
        if let Some(size) = entry.size {
            println!("    Size: {}", format_size(size));
        }
    }

    Ok(())
}
