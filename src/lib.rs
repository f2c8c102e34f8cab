//! Find files under a folder that have not been accessed for a configurable
//! number of days, preview them, and delete the ones the user picks.
//!
//! The scanner streams results as [`scanner::ScanEvent`]s; [`transport`]
//! exposes the whole workflow as a JSON-lines command protocol and [`mcp`]
//! as MCP tools.

pub mod classifier;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod mcp;
pub mod opener;
pub mod preview;
pub mod results;
pub mod scanner;
pub mod transport;
pub mod utils;

pub use error::{Result, ScanError};
