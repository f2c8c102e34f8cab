use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "staleclean")]
#[command(about = "Find files nobody has opened in a while and clean them up", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Scan a folder and report files not accessed recently")]
    Scan {
        path: PathBuf,
        #[arg(short, long, help = "Age threshold in days (defaults to config)")]
        days: Option<u32>,
        #[arg(short = 'F', long, default_value = "human")]
        format: OutputFormat,
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(short, long, default_value = "20", help = "Old files listed in human output")]
        limit: usize,
    },
    #[command(about = "Show what the preview pane would load for a file")]
    Preview {
        path: PathBuf,
    },
    #[command(about = "Delete files (dry-run unless --execute)")]
    Delete {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long)]
        execute: bool,
    },
    #[command(about = "Open a file with the default application")]
    Open {
        path: PathBuf,
    },
    #[command(about = "Serve the JSON-lines command protocol on stdin/stdout")]
    Serve,
    #[command(about = "Run as MCP server (for AI integration)")]
    Mcp,
    #[command(about = "View deletion history")]
    History {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: ConfigActions,
    },
}

#[derive(Subcommand)]
pub enum ConfigActions {
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Set a configuration value")]
    Set {
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        value: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}
